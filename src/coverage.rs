use std::collections::HashSet;
use std::thread;

use log::debug;

use crate::config::Config;
use crate::geometry::{distance_to_trace, Trace};
use crate::{Error, Result};

/// Returned for the final accuracy before any comparison finished
pub const NOT_COMPUTED: i32 = -1;

/// Bidirectional, section-wise accuracy between a candidate and a reference.
///
/// One scorer serves one comparison. Sections are fed in increasing order
/// starting at 0; section 0 resets the running state. The score is the
/// smaller of two hit fractions:
///
/// * candidate points lying within `2 × max_deviation_radius` of the reference
///   polyline, over all candidate points seen so far;
/// * reference points lying within the same distance of the candidate seen so
///   far, over the reference point count. A reference point is credited once.
#[derive(Debug, Clone)]
pub struct CoverageScorer {
    max_deviation_radius: f64,
    parallel: bool,
    total_sections: usize,
    next_section: usize,
    student_points: usize,
    hits_on_student: Vec<usize>,
    hits_on_expert: Vec<usize>,
    credited: HashSet<(usize, usize)>,
    final_accuracy: Option<i32>,
}

impl CoverageScorer {
    pub fn new(max_deviation_radius: f64) -> Self {
        Self {
            max_deviation_radius,
            parallel: false,
            total_sections: 0,
            next_section: 0,
            student_points: 0,
            hits_on_student: Vec::new(),
            hits_on_expert: Vec::new(),
            credited: HashSet::new(),
            final_accuracy: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_deviation_radius).parallel(config.parallel)
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn hit_distance(&self) -> f64 {
        2.0 * self.max_deviation_radius
    }

    /// Running candidate hit totals, one slot per section
    pub fn hits_on_student(&self) -> &[usize] {
        &self.hits_on_student
    }

    /// Running reference hit totals, one slot per section
    pub fn hits_on_expert(&self) -> &[usize] {
        &self.hits_on_expert
    }

    pub fn cached_final_accuracy(&self) -> Option<i32> {
        self.final_accuracy
    }

    /// Progressive accuracy (0..=100) after scoring `section`.
    ///
    /// `current >= total_sections` returns the cached final accuracy, or
    /// [`NOT_COMPUTED`]. Skipping or repeating a section is an
    /// [`Error::InvalidSequence`].
    pub fn accuracy(
        &mut self,
        section: &Trace,
        reference: &Trace,
        total_sections: usize,
        current: usize,
    ) -> Result<i32> {
        if current >= total_sections {
            return Ok(self.final_accuracy.unwrap_or(NOT_COMPUTED));
        }
        if current == 0 {
            self.reset(total_sections);
        } else if current != self.next_section || total_sections != self.total_sections {
            return Err(Error::InvalidSequence {
                expected: self.next_section,
                got: current,
            });
        }

        let threshold = self.hit_distance();
        let (student_hits, expert_hits) = if self.parallel {
            let credited = &mut self.credited;
            thread::scope(|s| {
                let student = s.spawn(|| count_section_hits(section, reference, threshold));
                let expert = credit_reference_hits(reference, section, threshold, credited);
                match student.join() {
                    Ok(student) => (student, expert),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            })
        } else {
            (
                count_section_hits(section, reference, threshold),
                credit_reference_hits(reference, section, threshold, &mut self.credited),
            )
        };

        let previous = |v: &[usize]| if current > 0 { v[current - 1] } else { 0 };
        let student_running = previous(&self.hits_on_student) + student_hits;
        let expert_running = previous(&self.hits_on_expert) + expert_hits;
        self.hits_on_student[current] = student_running;
        self.hits_on_expert[current] = expert_running;
        self.student_points += section.point_count();

        let on_reference = fraction(student_running, self.student_points);
        // reference point count is taken from this call's reference
        let covered = fraction(expert_running, reference.point_count());
        let accuracy = (on_reference.min(covered) * 100.0).round() as i32;

        debug!(
            "section {}/{}: {}/{} candidate hits, {}/{} reference hits -> {}%",
            current + 1,
            total_sections,
            student_running,
            self.student_points,
            expert_running,
            reference.point_count(),
            accuracy
        );

        self.next_section = current + 1;
        if current == total_sections - 1 {
            self.final_accuracy = Some(accuracy);
        }
        Ok(accuracy)
    }

    /// Cached final accuracy, or a single-section comparison of the full traces
    pub fn final_accuracy(&mut self, candidate: &Trace, reference: &Trace) -> Result<i32> {
        match self.final_accuracy {
            Some(acc) => Ok(acc),
            None => self.accuracy(candidate, reference, 1, 0),
        }
    }

    /// Drops all running state and prepares for `total_sections` sections
    pub fn reset(&mut self, total_sections: usize) {
        self.total_sections = total_sections;
        self.next_section = 0;
        self.student_points = 0;
        self.hits_on_student = vec![0; total_sections];
        self.hits_on_expert = vec![0; total_sections];
        self.credited.clear();
        self.final_accuracy = None;
    }
}

fn fraction(hits: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    debug_assert!(hits <= total, "{hits} hits counted over {total} points");
    hits as f64 / total as f64
}

fn count_section_hits(section: &Trace, reference: &Trace, threshold: f64) -> usize {
    section
        .samples()
        .filter(|s| distance_to_trace(&s.point(), reference) <= threshold)
        .count()
}

// Points credited by earlier sections are skipped, so testing only the new
// section is the same as testing the whole candidate seen so far.
fn credit_reference_hits(
    reference: &Trace,
    section: &Trace,
    threshold: f64,
    credited: &mut HashSet<(usize, usize)>,
) -> usize {
    let mut fresh = 0;
    for (stroke_ix, stroke) in reference.strokes.iter().enumerate() {
        for (point_ix, sample) in stroke.points().iter().enumerate() {
            let id = (stroke_ix, point_ix);
            if credited.contains(&id) {
                continue;
            }
            if distance_to_trace(&sample.point(), section) <= threshold {
                credited.insert(id);
                fresh += 1;
            }
        }
    }
    fresh
}
