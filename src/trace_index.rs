use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::RwLock;

use crate::config::Config;
use crate::geometry::{distance_to_segment, scalar_projection, Point, SamplePoint, Trace};

pub const DEFAULT_SEGMENT_SIZE: usize = 100;
pub const DEFAULT_SCAN_DIAMETER: f64 = 100.0;
pub const DEFAULT_MAX_DEVIATION_RADIUS: f64 = 5.0;

/// Axis-aligned bounds of a segment, used to reject it before touching its points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    fn from_samples(samples: &[SamplePoint]) -> Self {
        samples.iter().fold(
            BoundingBox {
                min_x: f64::INFINITY,
                min_y: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                max_y: f64::NEG_INFINITY,
            },
            |b, s| BoundingBox {
                min_x: b.min_x.min(s.x),
                min_y: b.min_y.min(s.y),
                max_x: b.max_x.max(s.x),
                max_y: b.max_y.max(s.y),
            },
        )
    }

    /// Distance from `p` to the box; zero inside
    pub fn distance_to(&self, p: &Point) -> f64 {
        let dx = (self.min_x - p.x).max(0.0).max(p.x - self.max_x);
        let dy = (self.min_y - p.y).max(0.0).max(p.y - self.max_y);
        (dx * dx + dy * dy).sqrt()
    }
}

/// A run of at most `segment_size` consecutive points of one stroke
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub stroke_index: usize,
    /// Index of the segment's first point within its stroke
    pub offset: usize,
    pub points: Vec<SamplePoint>,
    pub bounds: BoundingBox,
}

impl Segment {
    /// (stroke index, point index) in the original trace for a segment-local index
    pub fn original_index(&self, local: usize) -> (usize, usize) {
        (self.stroke_index, self.offset + local)
    }

    /// Distance from `p` to the segment's polyline
    pub fn distance_to(&self, p: &Point) -> f64 {
        if let [only] = self.points.as_slice() {
            return only.point().distance(p);
        }
        self.points
            .windows(2)
            .map(|w| distance_to_segment(p, &w[0].point(), &w[1].point()))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Trace view with long strokes cut into bounded segments. Consecutive
/// segments of a stroke share their boundary point so the polyline is unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentedTrace {
    segment_size: usize,
    segments: Vec<Segment>,
}

impl SegmentedTrace {
    pub fn new(trace: &Trace, segment_size: usize) -> Self {
        // a chunk has to hold the repeated boundary point plus one new point
        let size = segment_size.max(2);
        let mut segments = Vec::new();

        for (stroke_index, stroke) in trace.strokes.iter().enumerate() {
            let pts = stroke.points();
            let mut start = 0;
            loop {
                let end = (start + size).min(pts.len());
                let chunk = pts[start..end].to_vec();
                segments.push(Segment {
                    stroke_index,
                    offset: start,
                    bounds: BoundingBox::from_samples(&chunk),
                    points: chunk,
                });
                if end == pts.len() {
                    break;
                }
                start = end - 1;
            }
        }

        Self {
            segment_size: size,
            segments,
        }
    }

    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Nearest location on the reference trace. Out of range queries carry the
/// negative-infinity sentinel point and an infinite distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPointResult {
    pub point: SamplePoint,
    pub distance: f64,
}

impl ClosestPointResult {
    pub fn out_of_range() -> Self {
        Self {
            point: SamplePoint::negative_infinity(),
            distance: f64::INFINITY,
        }
    }

    pub fn is_in_range(&self) -> bool {
        self.distance.is_finite()
    }
}

/// Nearest-point engine over one immutable reference trace.
///
/// Segmentations are built once per segment size and then only read; the
/// result cache is keyed by the rounded query point. Both live behind
/// read-write locks so one index can serve several feedback threads.
#[derive(Debug)]
pub struct TraceIndex {
    trace: Trace,
    max_deviation_radius: f64,
    scan_diameter: f64,
    segment_size: usize,
    segmentations: RwLock<HashMap<usize, Arc<SegmentedTrace>>>,
    cache: RwLock<HashMap<(i64, i64), ClosestPointResult>>,
}

impl TraceIndex {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            max_deviation_radius: DEFAULT_MAX_DEVIATION_RADIUS,
            scan_diameter: DEFAULT_SCAN_DIAMETER,
            segment_size: DEFAULT_SEGMENT_SIZE,
            segmentations: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(trace: Trace, config: &Config) -> Self {
        Self::new(trace)
            .with_max_deviation_radius(config.max_deviation_radius)
            .with_scan_diameter(config.scan_diameter)
            .with_segment_size(config.segment_size)
    }

    pub fn with_max_deviation_radius(mut self, radius: f64) -> Self {
        self.max_deviation_radius = radius;
        self
    }

    pub fn with_scan_diameter(mut self, diameter: f64) -> Self {
        self.scan_diameter = diameter;
        self
    }

    pub fn with_segment_size(mut self, size: usize) -> Self {
        self.segment_size = size;
        self
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn max_deviation_radius(&self) -> f64 {
        self.max_deviation_radius
    }

    pub fn effective_scan_diameter(&self) -> f64 {
        self.scan_diameter.max(4.0 * self.max_deviation_radius)
    }

    /// Memoized segmentation of the reference trace
    pub fn segmented(&self, segment_size: usize) -> Arc<SegmentedTrace> {
        if let Some(existing) = self.segmentations.read().get(&segment_size) {
            return Arc::clone(existing);
        }
        let built = SegmentedTrace::new(&self.trace, segment_size);
        debug!(
            "segmented reference trace into {} segments (size {})",
            built.segments().len(),
            segment_size
        );
        let mut guard = self.segmentations.write();
        Arc::clone(
            guard
                .entry(segment_size)
                .or_insert_with(|| Arc::new(built)),
        )
    }

    pub fn closest_point(&self, point: Point) -> ClosestPointResult {
        if !point.x.is_finite() || !point.y.is_finite() {
            return ClosestPointResult::out_of_range();
        }
        let key = point.rounded();
        if let Some(hit) = self.cache.read().get(&key) {
            return *hit;
        }
        let result = self.compute_closest(&point);
        self.cache.write().insert(key, result);
        result
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    fn compute_closest(&self, query: &Point) -> ClosestPointResult {
        let radius = self.effective_scan_diameter() / 2.0;
        let segmented = self.segmented(self.segment_size);

        // (segment, local index, distance); strict comparison keeps the first hit on ties
        let mut best: Option<(usize, usize, f64)> = None;
        for (seg_ix, segment) in segmented.segments().iter().enumerate() {
            // every point of a segment whose line crosses the circle is a candidate
            if segment.bounds.distance_to(query) > radius || segment.distance_to(query) > radius {
                continue;
            }
            for (local, sample) in segment.points.iter().enumerate() {
                let d = sample.point().distance(query);
                if best.map_or(true, |(_, _, bd)| d < bd) {
                    best = Some((seg_ix, local, d));
                }
            }
        }

        let Some((seg_ix, local, _)) = best else {
            trace!("no reference point within {radius} of ({}, {})", query.x, query.y);
            return ClosestPointResult::out_of_range();
        };

        let (stroke_ix, point_ix) = segmented.segments()[seg_ix].original_index(local);
        let pts = self.trace.strokes[stroke_ix].points();
        let closest = &pts[point_ix];
        let previous = &pts[point_ix.saturating_sub(1)];
        let next = &pts[(point_ix + 1).min(pts.len() - 1)];

        let left = project(query, closest, previous);
        let right = project(query, closest, next);
        if right.distance < left.distance {
            right
        } else {
            left
        }
    }
}

/// Projects `query` onto the segment starting at `start`; falls back to the
/// start sample when the projection leaves the segment.
fn project(query: &Point, start: &SamplePoint, end: &SamplePoint) -> ClosestPointResult {
    let (t, valid) = scalar_projection(query, &start.point(), &end.point());
    if !valid {
        return ClosestPointResult {
            point: *start,
            distance: query.distance(&start.point()),
        };
    }
    let point = start.interpolate(end, t);
    ClosestPointResult {
        distance: query.distance(&point.point()),
        point,
    }
}
