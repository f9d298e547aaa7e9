use std::sync::Arc;

use log::info;
use serde::Serialize;

use crate::alignment::Aligner;
use crate::config::Config;
use crate::coverage::CoverageScorer;
use crate::feedback::FeedbackService;
use crate::geometry::Trace;
use crate::progress::{distance_over_progress, summarize, SeriesSummary};
use crate::trace_index::TraceIndex;
use crate::Result;

/// Batched result of comparing one student trace with the expert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub accuracy: i32,
    /// Accuracy after each section, in drawing order
    pub progressive_accuracy: Vec<i32>,
    /// Deviation statistics over the in-range student samples
    pub deviation: Option<SeriesSummary>,
    pub out_of_range: usize,
    /// Total DTW cost; `None` when either trace is empty
    pub dtw_cost: Option<f64>,
    pub student_points: usize,
    pub expert_points: usize,
}

/// Owns the per-expert engines for a run of comparisons
#[derive(Debug, Clone)]
pub struct Comparison {
    config: Config,
    index: Arc<TraceIndex>,
    aligner: Aligner,
}

impl Comparison {
    pub fn new(expert: Trace, config: Config) -> Self {
        Self {
            index: Arc::new(TraceIndex::from_config(expert, &config)),
            aligner: Aligner::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn expert(&self) -> &Trace {
        self.index.trace()
    }

    pub fn index(&self) -> Arc<TraceIndex> {
        Arc::clone(&self.index)
    }

    pub fn aligner(&self) -> Aligner {
        self.aligner
    }

    /// Real-time feedback service sharing this comparison's index
    pub fn feedback(&self) -> FeedbackService {
        FeedbackService::new(self.index(), &self.config)
    }

    pub fn report(&self, student: &Trace) -> Result<ComparisonReport> {
        let expert = self.expert();
        let sections = student.split(self.config.sections);
        let mut scorer = CoverageScorer::from_config(&self.config);
        let mut progressive_accuracy = Vec::with_capacity(sections.len());
        for (ix, section) in sections.iter().enumerate() {
            progressive_accuracy.push(scorer.accuracy(section, expert, sections.len(), ix)?);
        }
        let accuracy = match scorer.cached_final_accuracy() {
            Some(acc) => acc,
            None => scorer.final_accuracy(student, expert)?,
        };

        let deviations = distance_over_progress(student, &self.index);
        let dtw_cost = if student.is_empty() || expert.is_empty() {
            None
        } else {
            Some(self.aligner.align(student, expert)?.cost)
        };

        info!(
            "compared {} student points with {} expert points: {}% accuracy",
            student.point_count(),
            expert.point_count(),
            accuracy
        );

        Ok(ComparisonReport {
            accuracy,
            progressive_accuracy,
            deviation: summarize(&deviations),
            out_of_range: student.point_count() - deviations.len(),
            dtw_cost,
            student_points: student.point_count(),
            expert_points: expert.point_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{SamplePoint, Stroke};

    fn dotted(y: f64, n: usize) -> Trace {
        let pts = (0..n).map(|i| SamplePoint::new(i as f64 * 5.0, y)).collect();
        Trace::new(vec![Stroke::new(pts).unwrap()])
    }

    #[test]
    fn identical_attempt_is_perfect() {
        let cmp = Comparison::new(dotted(0.0, 20), Config::default());
        let report = cmp.report(&dotted(0.0, 20)).unwrap();
        assert_eq!(report.accuracy, 100);
        assert_eq!(report.progressive_accuracy.len(), 10);
        assert_eq!(report.progressive_accuracy.last(), Some(&100));
        assert_eq!(report.dtw_cost, Some(0.0));
        assert_eq!(report.out_of_range, 0);
        assert_eq!(report.deviation.unwrap().max, 0.0);
    }

    #[test]
    fn progressive_accuracy_rises_while_drawing() {
        let cmp = Comparison::new(dotted(0.0, 20), Config::default());
        let report = cmp.report(&dotted(0.0, 20)).unwrap();
        assert!(report
            .progressive_accuracy
            .windows(2)
            .all(|w| w[0] <= w[1]));
        assert!(report.progressive_accuracy[0] < 100);
    }

    #[test]
    fn empty_student_reports_zero() {
        let cmp = Comparison::new(dotted(0.0, 5), Config::default());
        let report = cmp.report(&Trace::default()).unwrap();
        assert_eq!(report.accuracy, 0);
        assert!(report.progressive_accuracy.is_empty());
        assert_eq!(report.dtw_cost, None);
        assert_eq!(report.deviation, None);
    }

    #[test]
    fn feedback_shares_the_index() {
        let cmp = Comparison::new(dotted(0.0, 5), Config::default());
        let fb = cmp.feedback();
        assert!(fb.evaluate(&SamplePoint::new(5.0, 1.0)).is_some());
        assert_eq!(cmp.index().cache_len(), 1);
    }
}
