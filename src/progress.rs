//! Per-point series over drawing progress, for distance, pressure and speed graphs.

use itertools::Itertools;
use serde::Serialize;

use crate::geometry::Trace;
use crate::trace_index::TraceIndex;
use crate::util::{max, mean, normalize_to_max, std_dev};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressPoint {
    /// Fraction of the drawn length, 0..=1
    pub progress: f64,
    pub value: f64,
}

impl ProgressPoint {
    pub fn new(progress: f64, value: f64) -> Self {
        Self { progress, value }
    }
}

impl From<(f64, f64)> for ProgressPoint {
    fn from(v: (f64, f64)) -> Self {
        ProgressPoint {
            progress: v.0,
            value: v.1,
        }
    }
}

impl From<ProgressPoint> for (f64, f64) {
    fn from(p: ProgressPoint) -> Self {
        (p.progress, p.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
}

pub fn summarize(series: &[ProgressPoint]) -> Option<SeriesSummary> {
    let values: Vec<f64> = series.iter().map(|p| p.value).collect();
    Some(SeriesSummary {
        mean: mean(&values)?,
        std_dev: std_dev(&values)?,
        max: max(&values)?,
    })
}

/// Progress of every sample, measured as cumulative pen-down length. Pen-up
/// jumps between strokes do not count. Falls back to the sample index when the
/// trace has no length.
pub fn progress_positions(trace: &Trace) -> Vec<f64> {
    let mut travelled = Vec::with_capacity(trace.point_count());
    let mut total = 0.0;
    for stroke in &trace.strokes {
        let pts = stroke.points();
        travelled.push(total);
        for (a, b) in pts.iter().tuple_windows() {
            total += a.point().distance(&b.point());
            travelled.push(total);
        }
    }

    let n = travelled.len();
    if total > 0.0 {
        travelled.iter().map(|d| d / total).collect()
    } else if n > 1 {
        (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
    } else {
        vec![0.0; n]
    }
}

/// Deviation of each student sample from the reference. Samples out of the
/// index's scan range are left out.
pub fn distance_over_progress(student: &Trace, index: &TraceIndex) -> Vec<ProgressPoint> {
    progress_positions(student)
        .into_iter()
        .zip(student.samples())
        .filter_map(|(progress, sample)| {
            let closest = index.closest_point(sample.point());
            closest
                .is_in_range()
                .then(|| ProgressPoint::new(progress, closest.distance))
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PressureProgress {
    pub student: Vec<ProgressPoint>,
    /// Interpolated reference pressure at the nearest point, where in range
    pub expert: Vec<ProgressPoint>,
}

pub fn pressure_over_progress(student: &Trace, index: &TraceIndex) -> PressureProgress {
    let mut out = PressureProgress::default();
    for (progress, sample) in progress_positions(student).into_iter().zip(student.samples()) {
        out.student.push(ProgressPoint::new(progress, sample.pressure));
        let closest = index.closest_point(sample.point());
        if closest.is_in_range() {
            out.expert.push(ProgressPoint::new(progress, closest.point.pressure));
        }
    }
    out
}

/// Pen speed (px/ms) between consecutive timestamped samples of a stroke,
/// scaled so the fastest movement is 1.
pub fn speed_over_progress(trace: &Trace) -> Vec<ProgressPoint> {
    let positions = progress_positions(trace);
    let mut at = 0;
    let mut progress = Vec::new();
    let mut speeds = Vec::new();

    for stroke in &trace.strokes {
        for (ix, (a, b)) in stroke.points().iter().tuple_windows().enumerate() {
            if let (Some(ta), Some(tb)) = (a.timestamp, b.timestamp) {
                let dt = (tb - ta) as f64;
                if dt > 0.0 {
                    progress.push(positions[at + ix + 1]);
                    speeds.push(a.point().distance(&b.point()) / dt);
                }
            }
        }
        at += stroke.len();
    }

    normalize_to_max(&mut speeds);
    progress
        .into_iter()
        .zip(speeds)
        .map(ProgressPoint::from)
        .collect()
}
