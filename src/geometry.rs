use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const PRESSURE_RANGE: (f64, f64) = (0.0, 1.0);
pub const TILT_RANGE: (f64, f64) = (0.0, 90.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Sentinel used for "no point in range" results
    pub fn negative_infinity() -> Self {
        Self {
            x: f64::NEG_INFINITY,
            y: f64::NEG_INFINITY,
        }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Integer grid cell the point rounds to; used as a cache key
    pub fn rounded(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }
}

impl From<(f64, f64)> for Point {
    fn from(v: (f64, f64)) -> Self {
        Point { x: v.0, y: v.1 }
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// One captured stylus sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_pressure")]
    pub pressure: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

fn default_pressure() -> f64 {
    0.5
}

impl SamplePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            pressure: default_pressure(),
            tilt: None,
            timestamp: None,
        }
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = pressure;
        self
    }

    pub fn with_tilt(mut self, tilt: f64) -> Self {
        self.tilt = Some(tilt);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn negative_infinity() -> Self {
        let p = Point::negative_infinity();
        Self::new(p.x, p.y).with_pressure(0.0)
    }

    /// Linear blend towards `other` at ratio `t`, every attribute clamped to
    /// its legal range. Optional attributes only blend when both ends carry them.
    pub fn interpolate(&self, other: &SamplePoint, t: f64) -> SamplePoint {
        let lerp = |a: f64, b: f64| a + (b - a) * t;
        let tilt = match (self.tilt, other.tilt) {
            (Some(a), Some(b)) => Some(lerp(a, b).clamp(TILT_RANGE.0, TILT_RANGE.1)),
            (a, _) => a,
        };
        let timestamp = match (self.timestamp, other.timestamp) {
            (Some(a), Some(b)) => Some(lerp(a as f64, b as f64).round().max(0.0) as i64),
            (a, _) => a,
        };
        SamplePoint {
            x: lerp(self.x, other.x),
            y: lerp(self.y, other.y),
            pressure: lerp(self.pressure, other.pressure).clamp(PRESSURE_RANGE.0, PRESSURE_RANGE.1),
            tilt,
            timestamp,
        }
    }
}

impl From<Point> for SamplePoint {
    fn from(p: Point) -> Self {
        SamplePoint::new(p.x, p.y)
    }
}

/// Continuous pen-down to pen-up gesture. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SamplePoint>", into = "Vec<SamplePoint>")]
pub struct Stroke {
    points: Vec<SamplePoint>,
}

impl Stroke {
    pub fn new(points: Vec<SamplePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidGeometry("stroke has no points".into()));
        }
        Ok(Self { points })
    }

    /// Convenience constructor from bare coordinates
    pub fn from_coords(coords: &[(f64, f64)]) -> Result<Self> {
        Self::new(coords.iter().map(|&(x, y)| SamplePoint::new(x, y)).collect())
    }

    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].point().distance(&w[1].point()))
            .sum()
    }
}

impl TryFrom<Vec<SamplePoint>> for Stroke {
    type Error = Error;

    fn try_from(points: Vec<SamplePoint>) -> Result<Self> {
        Stroke::new(points)
    }
}

impl From<Stroke> for Vec<SamplePoint> {
    fn from(s: Stroke) -> Self {
        s.points
    }
}

/// Full multi-stroke performance of one actor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub strokes: Vec<Stroke>,
}

impl Trace {
    pub fn new(strokes: Vec<Stroke>) -> Self {
        Self { strokes }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Stroke::len).sum()
    }

    /// All samples in stroke order, then point order
    pub fn samples(&self) -> impl Iterator<Item = &SamplePoint> + '_ {
        self.strokes.iter().flat_map(|s| s.points().iter())
    }

    pub fn coordinates(&self) -> Vec<Point> {
        self.samples().map(SamplePoint::point).collect()
    }

    pub fn length(&self) -> f64 {
        self.strokes.iter().map(Stroke::length).sum()
    }

    /// Cuts the trace into `sections` consecutive sub-traces of near-equal
    /// point count. A stroke crossing a section boundary is cut there; strokes
    /// never merge. Produces fewer sections when there are fewer points.
    pub fn split(&self, sections: usize) -> Vec<Trace> {
        let total = self.point_count();
        if sections == 0 || total == 0 {
            return vec![];
        }
        let sections = sections.min(total);
        let mut out: Vec<Trace> = Vec::with_capacity(sections);
        let mut current: Vec<Stroke> = Vec::new();
        let mut taken = 0usize;
        let mut section = 0usize;
        // exclusive point index at which the current section ends
        let boundary = |k: usize| (k + 1) * total / sections;

        for stroke in &self.strokes {
            let mut chunk: Vec<SamplePoint> = Vec::new();
            for sample in stroke.points() {
                chunk.push(*sample);
                taken += 1;
                if taken == boundary(section) {
                    current.push(Stroke {
                        points: std::mem::take(&mut chunk),
                    });
                    out.push(Trace::new(std::mem::take(&mut current)));
                    section += 1;
                }
            }
            if !chunk.is_empty() {
                current.push(Stroke { points: chunk });
            }
        }
        out
    }
}

/// Distance from `p` to the segment `a`-`b`
pub fn distance_to_segment(p: &Point, a: &Point, b: &Point) -> f64 {
    let (t, valid) = scalar_projection(p, a, b);
    if !valid {
        return p.distance(a).min(p.distance(b));
    }
    let proj = Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
    p.distance(&proj)
}

/// Scalar projection of `p` onto the segment `a`-`b`. The flag is false for
/// zero-length segments and for projections outside `[0, 1]`.
pub fn scalar_projection(p: &Point, a: &Point, b: &Point) -> (f64, bool) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return (0.0, false);
    }
    let t = ((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq;
    (t, (0.0..=1.0).contains(&t))
}

/// Distance from `p` to the nearest part of any stroke polyline of `trace`.
/// Single-point strokes count as points.
pub fn distance_to_trace(p: &Point, trace: &Trace) -> f64 {
    let mut best = f64::INFINITY;
    for stroke in &trace.strokes {
        let pts = stroke.points();
        if pts.len() == 1 {
            best = best.min(p.distance(&pts[0].point()));
            continue;
        }
        for w in pts.windows(2) {
            best = best.min(distance_to_segment(p, &w[0].point(), &w[1].point()));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn line(coords: &[(f64, f64)]) -> Stroke {
        Stroke::from_coords(coords).unwrap()
    }

    #[test]
    fn empty_stroke_is_rejected() {
        assert_matches!(Stroke::new(vec![]), Err(Error::InvalidGeometry(_)));
    }

    #[test]
    fn empty_stroke_is_rejected_when_deserializing() {
        let res = Trace::from_json(br#"{"strokes": [[]]}"#);
        assert!(res.is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let trace =
            Trace::from_json(br#"{"strokes": [[{"x": 1, "y": 2}, {"x": 3, "y": 4, "pressure": 0.9, "tilt": 30}]]}"#)
                .unwrap();
        assert_eq!(trace.point_count(), 2);
        let s = trace.strokes[0].points();
        assert_eq!(s[0].pressure, 0.5);
        assert_eq!(s[1].tilt, Some(30.0));
        assert_eq!(s[1].timestamp, None);
    }

    #[test]
    fn interpolation_clamps_attributes() {
        let a = SamplePoint::new(0.0, 0.0).with_pressure(0.8).with_tilt(80.0);
        let b = SamplePoint::new(10.0, 0.0).with_pressure(1.0).with_tilt(90.0);
        let over = a.interpolate(&b, 2.0);
        assert_eq!(over.pressure, 1.0);
        assert_eq!(over.tilt, Some(90.0));
        let mid = a.interpolate(&b, 0.5);
        assert_eq!(mid.x, 5.0);
        assert!((mid.pressure - 0.9).abs() < 1e-12);
    }

    #[test]
    fn interpolation_keeps_timestamps_integral() {
        let a = SamplePoint::new(0.0, 0.0).with_timestamp(100);
        let b = SamplePoint::new(1.0, 0.0).with_timestamp(111);
        assert_eq!(a.interpolate(&b, 0.5).timestamp, Some(106));
        assert_eq!(a.interpolate(&SamplePoint::new(1.0, 0.0), 0.5).timestamp, Some(100));
    }

    #[test]
    fn projection_outside_segment_is_invalid() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(scalar_projection(&Point::new(5.0, 3.0), &a, &b), (0.5, true));
        assert!(!scalar_projection(&Point::new(-1.0, 3.0), &a, &b).1);
        assert!(!scalar_projection(&Point::new(1.0, 1.0), &a, &a).1);
    }

    #[test]
    fn distance_to_trace_uses_polylines() {
        let trace = Trace::new(vec![line(&[(0.0, 2.0), (20.0, 2.0)]), line(&[(50.0, 50.0)])]);
        assert_eq!(distance_to_trace(&Point::new(10.0, 2.0), &trace), 0.0);
        assert_eq!(distance_to_trace(&Point::new(10.0, 5.0), &trace), 3.0);
        assert_eq!(distance_to_trace(&Point::new(50.0, 54.0), &trace), 4.0);
        assert_eq!(distance_to_trace(&Point::new(0.0, 0.0), &Trace::default()), f64::INFINITY);
    }

    #[test]
    fn split_preserves_points_and_counts() {
        let trace = Trace::new(vec![
            line(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]),
            line(&[(0.0, 1.0), (1.0, 1.0), (2.0, 1.0), (3.0, 1.0)]),
        ]);
        let parts = trace.split(3);
        assert_eq!(parts.len(), 3);
        let counts: Vec<usize> = parts.iter().map(Trace::point_count).collect();
        assert_eq!(counts, vec![2, 2, 3]);
        // second section holds the tail of stroke 0 and the head of stroke 1
        assert_eq!(parts[1].strokes.len(), 2);
        let rejoined: Vec<Point> = parts.iter().flat_map(|t| t.coordinates()).collect();
        assert_eq!(rejoined, trace.coordinates());
    }

    #[test]
    fn split_degenerate_inputs() {
        assert!(Trace::default().split(4).is_empty());
        let trace = Trace::new(vec![line(&[(0.0, 0.0), (1.0, 0.0)])]);
        assert!(trace.split(0).is_empty());
        assert_eq!(trace.split(5).len(), 2);
    }
}
