//! Expert distribution model: per-point statistics over several expert
//! performances, aligned onto one base expert with DTW.

use std::collections::HashMap;
use std::str::FromStr;

use log::info;
use serde::Serialize;

use crate::alignment::Aligner;
use crate::geometry::{SamplePoint, Trace};
use crate::util::{mean, std_dev};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Feature {
    X,
    Y,
    Pressure,
    Tilt,
}

impl Feature {
    pub const ALL: [Feature; 4] = [Feature::X, Feature::Y, Feature::Pressure, Feature::Tilt];

    pub fn value(&self, sample: &SamplePoint) -> Option<f64> {
        match self {
            Feature::X => Some(sample.x),
            Feature::Y => Some(sample.y),
            Feature::Pressure => Some(sample.pressure),
            Feature::Tilt => sample.tilt,
        }
    }
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "x" => Ok(Feature::X),
            "y" => Ok(Feature::Y),
            "pressure" => Ok(Feature::Pressure),
            "tilt" => Ok(Feature::Tilt),
            _ => Err(Error::UnknownFeature(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureStat {
    pub mean: f64,
    pub std_dev: f64,
    /// Number of experts contributing a value
    pub samples: usize,
}

#[derive(Debug, Clone)]
pub struct ExpertDistributionModel {
    base: Trace,
    aligner: Aligner,
    expert_count: usize,
    stats: HashMap<Feature, Vec<Option<FeatureStat>>>,
}

impl ExpertDistributionModel {
    /// `others` are aligned onto `base`; when several of their points match
    /// one base point their values are averaged first.
    pub fn build(base: &Trace, others: &[Trace], aligner: Aligner) -> Result<Self> {
        let base_samples: Vec<SamplePoint> = base.samples().copied().collect();
        if base_samples.is_empty() {
            return Err(Error::EmptySequence);
        }
        let n = base_samples.len();

        // per feature, per base point: one value per expert
        let mut values: HashMap<Feature, Vec<Vec<f64>>> = Feature::ALL
            .iter()
            .map(|f| {
                let own = base_samples
                    .iter()
                    .map(|s| f.value(s).into_iter().collect())
                    .collect();
                (*f, own)
            })
            .collect();

        for other in others {
            let other_samples: Vec<SamplePoint> = other.samples().copied().collect();
            let alignment = aligner.align(base, other)?;
            let partners = alignment.path.partners_of_first(n);
            for (feature, per_point) in values.iter_mut() {
                for (i, matched) in partners.iter().enumerate() {
                    let vals: Vec<f64> = matched
                        .iter()
                        .filter_map(|&j| feature.value(&other_samples[j]))
                        .collect();
                    if let Some(m) = mean(&vals) {
                        per_point[i].push(m);
                    }
                }
            }
        }

        let stats = values
            .into_iter()
            .map(|(feature, per_point)| {
                let summary = per_point
                    .iter()
                    .map(|vals| {
                        Some(FeatureStat {
                            mean: mean(vals)?,
                            std_dev: std_dev(vals)?,
                            samples: vals.len(),
                        })
                    })
                    .collect();
                (feature, summary)
            })
            .collect();

        info!("built expert model from {} experts over {} points", others.len() + 1, n);
        Ok(Self {
            base: base.clone(),
            aligner,
            expert_count: others.len() + 1,
            stats,
        })
    }

    pub fn base(&self) -> &Trace {
        &self.base
    }

    pub fn expert_count(&self) -> usize {
        self.expert_count
    }

    pub fn feature(&self, name: &str) -> Result<&[Option<FeatureStat>]> {
        let feature: Feature = name.parse()?;
        Ok(self
            .stats
            .get(&feature)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Statistics of the aligned base point for every student point
    pub fn transfer(&self, student: &Trace, feature_name: &str) -> Result<Vec<Option<FeatureStat>>> {
        let stats = self.feature(feature_name)?;
        let alignment = self.aligner.align(student, &self.base)?;
        let partners = alignment.path.partners_of_first(student.point_count());
        Ok(partners
            .iter()
            .map(|matched| matched.first().and_then(|&j| stats[j]))
            .collect())
    }
}
