// Trace data types
// Points, stroke-break samples, and the per-attempt trace buffer

use serde::{Deserialize, Serialize};

/// A coordinate in canvas pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }

    /// Squared Euclidean distance to another point
    /// Comparisons against NaN results are always false, so malformed
    /// points never fall inside a tolerance radius
    pub fn distance_sq(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One element of a trace: a sampled coordinate or a pen-up/pen-down marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceSample {
    /// Sampled pointer position
    Point(Point),

    /// Pen lifted between strokes of the same attempt
    /// (crossing a "t", dotting an "i")
    StrokeBreak,
}

/// Ordered samples from one drawing attempt
///
/// Stroke breaks are kept explicit rather than encoded in coordinates.
/// Leading and repeated breaks are dropped on insert, and `strokes()`
/// never yields an empty stroke.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    samples: Vec<TraceSample>,
}

impl Trace {
    /// Create an empty trace
    pub fn new() -> Self {
        Trace {
            samples: Vec::new(),
        }
    }

    /// Build a trace from already-grouped strokes
    pub fn from_strokes(strokes: &[Vec<Point>]) -> Self {
        let mut trace = Trace::new();
        for stroke in strokes {
            trace.break_stroke();
            for point in stroke {
                trace.push_point(*point);
            }
        }
        trace
    }

    /// Build a trace from raw samples, normalizing redundant breaks
    pub fn from_samples(samples: impl IntoIterator<Item = TraceSample>) -> Self {
        let mut trace = Trace::new();
        for sample in samples {
            match sample {
                TraceSample::Point(p) => trace.push_point(p),
                TraceSample::StrokeBreak => trace.break_stroke(),
            }
        }
        trace
    }

    /// Append a sampled point to the current stroke
    pub fn push_point(&mut self, point: Point) {
        self.samples.push(TraceSample::Point(point));
    }

    /// Mark a pen-up; ignored if there is no open stroke
    pub fn break_stroke(&mut self) {
        if matches!(self.samples.last(), Some(TraceSample::Point(_))) {
            self.samples.push(TraceSample::StrokeBreak);
        }
    }

    /// Discard everything drawn so far
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn samples(&self) -> &[TraceSample] {
        &self.samples
    }

    /// Flattened points with stroke breaks stripped, in drawing order
    pub fn points(&self) -> Vec<Point> {
        self.samples
            .iter()
            .filter_map(|s| match s {
                TraceSample::Point(p) => Some(*p),
                TraceSample::StrokeBreak => None,
            })
            .collect()
    }

    /// Points grouped per stroke
    pub fn strokes(&self) -> Vec<Vec<Point>> {
        let mut strokes = Vec::new();
        let mut current = Vec::new();

        for sample in &self.samples {
            match sample {
                TraceSample::Point(p) => current.push(*p),
                TraceSample::StrokeBreak => {
                    if !current.is_empty() {
                        strokes.push(std::mem::take(&mut current));
                    }
                }
            }
        }

        if !current.is_empty() {
            strokes.push(current);
        }

        strokes
    }

    pub fn point_count(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| matches!(s, TraceSample::Point(_)))
            .count()
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_strip_stroke_breaks() {
        let trace = Trace::from_samples(vec![
            TraceSample::Point(Point::new(1.0, 1.0)),
            TraceSample::Point(Point::new(2.0, 2.0)),
            TraceSample::StrokeBreak,
            TraceSample::Point(Point::new(3.0, 3.0)),
        ]);

        assert_eq!(
            trace.points(),
            vec![
                Point::new(1.0, 1.0),
                Point::new(2.0, 2.0),
                Point::new(3.0, 3.0)
            ]
        );
        assert_eq!(trace.stroke_count(), 2);
    }

    #[test]
    fn test_redundant_breaks_collapse() {
        let trace = Trace::from_samples(vec![
            TraceSample::StrokeBreak,
            TraceSample::Point(Point::new(1.0, 1.0)),
            TraceSample::StrokeBreak,
            TraceSample::StrokeBreak,
            TraceSample::Point(Point::new(2.0, 2.0)),
            TraceSample::StrokeBreak,
        ]);

        assert_eq!(trace.samples().len(), 4);
        assert_eq!(trace.strokes().len(), 2);
        assert_eq!(trace.point_count(), 2);
    }

    #[test]
    fn test_from_strokes() {
        let trace = Trace::from_strokes(&[
            vec![Point::new(0.0, 0.0), Point::new(0.0, 10.0)],
            vec![],
            vec![Point::new(5.0, 5.0)],
        ]);

        let strokes = trace.strokes();
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0].len(), 2);
        assert_eq!(strokes[1], vec![Point::new(5.0, 5.0)]);
    }

    #[test]
    fn test_clear() {
        let mut trace = Trace::new();
        trace.push_point(Point::new(1.0, 1.0));
        assert!(!trace.is_empty());

        trace.clear();
        assert!(trace.is_empty());
        assert_eq!(trace.stroke_count(), 0);
    }

    #[test]
    fn test_nan_distance_never_within_radius() {
        let bad = Point::new(f32::NAN, 10.0);
        let target = Point::new(10.0, 10.0);
        assert!(!(bad.distance_sq(&target) <= 100.0));
        assert!(!bad.is_finite());
    }

    #[test]
    fn test_sample_serialization_is_tagged() {
        let json = serde_json::to_string(&TraceSample::StrokeBreak).unwrap();
        assert_eq!(json, r#"{"kind":"stroke_break"}"#);

        let point: TraceSample =
            serde_json::from_str(r#"{"kind":"point","x":1.0,"y":2.0}"#).unwrap();
        assert_eq!(point, TraceSample::Point(Point::new(1.0, 2.0)));
    }
}
