use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::geometry::SamplePoint;
use crate::trace_index::TraceIndex;

/// Tolerance band around an expert value. Inside `[expert - low_start,
/// expert + high_start]` the ratio is zero; it reaches ±1 at the cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low_start: f64,
    pub low_cutoff: f64,
    pub high_start: f64,
    pub high_cutoff: f64,
}

/// Signed deviation ratio of `student` from `expert`. Not clamped: beyond ±1
/// the student is past the cutoff.
pub fn ratio(student: f64, expert: f64, t: &Thresholds) -> f64 {
    let rel_low = expert - t.low_start;
    let rel_high = expert + t.high_start;

    if student < rel_low {
        if t.low_cutoff == t.low_start {
            return -1.0;
        }
        -(rel_low - student) / (t.low_cutoff - t.low_start)
    } else if student > rel_high {
        if t.high_cutoff == t.high_start {
            return 1.0;
        }
        (student - rel_high) / (t.high_cutoff - t.high_start)
    } else {
        0.0
    }
}

/// Clamp a ratio to [-1, 1] for gradient consumers
pub fn saturate(r: f64) -> f64 {
    r.clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedbackSample {
    pub distance: f64,
    pub distance_ratio: f64,
    pub pressure_ratio: f64,
    /// Only present when both the student and the matched expert sample carry tilt
    pub tilt_ratio: Option<f64>,
}

/// Per-sample feedback against one expert trace. Constructed by the caller
/// and shared (e.g. behind an `Arc`) by whichever threads render feedback.
#[derive(Debug, Clone)]
pub struct FeedbackService {
    index: Arc<TraceIndex>,
    distance: Thresholds,
    pressure: Thresholds,
    tilt: Thresholds,
}

impl FeedbackService {
    pub fn new(index: Arc<TraceIndex>, config: &Config) -> Self {
        Self {
            index,
            distance: config.distance_feedback,
            pressure: config.pressure_feedback,
            tilt: config.tilt_feedback,
        }
    }

    pub fn index(&self) -> &TraceIndex {
        &self.index
    }

    /// `None` when no expert point lies within the scan diameter
    pub fn evaluate(&self, sample: &SamplePoint) -> Option<FeedbackSample> {
        let closest = self.index.closest_point(sample.point());
        if !closest.is_in_range() {
            return None;
        }
        let expert = closest.point;
        Some(FeedbackSample {
            distance: closest.distance,
            // ideal deviation is zero
            distance_ratio: ratio(closest.distance, 0.0, &self.distance),
            pressure_ratio: ratio(sample.pressure, expert.pressure, &self.pressure),
            tilt_ratio: match (sample.tilt, expert.tilt) {
                (Some(s), Some(e)) => Some(ratio(s, e, &self.tilt)),
                _ => None,
            },
        })
    }

    pub fn evaluate_batch(&self, samples: &[SamplePoint]) -> Vec<Option<FeedbackSample>> {
        samples.iter().map(|s| self.evaluate(s)).collect()
    }
}
