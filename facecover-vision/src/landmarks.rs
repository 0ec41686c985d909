//! Landmark geometry and the landmark provider seam.
//!
//! Landmarks follow the 68-point iBUG layout. Left and right are always the
//! subject's own: [`region::RIGHT_EYE`] is the eye that appears on the
//! viewer's left.

use std::ops::Range;
use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{FaceError, Result};

pub const NUM_LANDMARKS: usize = 68;

/// Contiguous index ranges of the anatomical regions.
pub mod region {
    use std::ops::Range;

    pub const JAW: Range<usize> = 0..17;
    pub const RIGHT_BROW: Range<usize> = 17..22;
    pub const LEFT_BROW: Range<usize> = 22..27;
    pub const NOSE: Range<usize> = 27..35;
    pub const RIGHT_EYE: Range<usize> = 36..42;
    pub const LEFT_EYE: Range<usize> = 42..48;
    pub const MOUTH: Range<usize> = 48..61;
    pub const ALL: Range<usize> = 0..68;
}

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// Face rectangle reported by the detector: top-left corner, width, height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Tight box around a set of points.
    pub fn enclosing(points: &[Point]) -> Self {
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if points.is_empty() {
            return Self::new(0.0, 0.0, 0.0, 0.0);
        }
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

/// The 68 ordered landmark points of one face.
///
/// Order is fixed by the detector and never re-sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    points: Vec<Point>,
}

impl Landmarks {
    pub fn new(points: Vec<Point>) -> Result<Self> {
        if points.len() != NUM_LANDMARKS {
            return Err(FaceError::LandmarkCount(points.len()));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn region(&self, range: Range<usize>) -> &[Point] {
        &self.points[range]
    }

    /// Concatenates several regions, keeping each region's order.
    pub fn select(&self, ranges: &[Range<usize>]) -> Vec<Point> {
        ranges
            .iter()
            .flat_map(|r| self.points[r.clone()].iter().copied())
            .collect()
    }

    pub fn centroid(&self, range: Range<usize>) -> Point {
        let pts = &self.points[range];
        let n = pts.len().max(1) as f32;
        let sum = pts.iter().fold(Point::new(0.0, 0.0), |acc, p| acc + *p);
        Point::new(sum.x / n, sum.y / n)
    }

    /// Applies `f` to every point, keeping the order.
    pub fn map(&self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            points: self.points.iter().map(|p| f(*p)).collect(),
        }
    }
}

impl std::ops::Index<usize> for Landmarks {
    type Output = Point;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

/// One face as reported by a [`LandmarkProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub landmarks: Landmarks,
}

/// Face detector plus 68-point shape predictor.
///
/// The host constructs and owns the provider and lends it to each call.
pub trait LandmarkProvider {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct LandmarkFile {
    faces: Vec<FaceEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FaceEntry {
    #[serde(default)]
    bbox: Option<BoundingBox>,
    points: Vec<[f32; 2]>,
}

/// Provider that answers every query with a fixed, pre-computed set of faces.
///
/// Used for template assets whose landmarks are computed once offline, and
/// as a fake in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticLandmarks {
    faces: Vec<DetectedFace>,
}

impl StaticLandmarks {
    pub fn new(faces: Vec<DetectedFace>) -> Self {
        Self { faces }
    }

    pub fn single(landmarks: Landmarks) -> Self {
        let bbox = BoundingBox::enclosing(landmarks.points());
        Self::new(vec![DetectedFace { bbox, landmarks }])
    }

    /// Parses `{"faces": [{"bbox": {..}, "points": [[x, y], ..]}]}`.
    ///
    /// `bbox` is optional and defaults to the box enclosing the points.
    pub fn from_json_str(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        let file: LandmarkFile = serde_json::from_str(raw)?;
        let mut faces = Vec::with_capacity(file.faces.len());
        for entry in file.faces {
            let points: Vec<Point> = entry.points.iter().map(|[x, y]| Point::new(*x, *y)).collect();
            let landmarks = Landmarks::new(points)
                .map_err(<serde_json::Error as serde::de::Error>::custom)?;
            let bbox = entry
                .bbox
                .unwrap_or_else(|| BoundingBox::enclosing(landmarks.points()));
            faces.push(DetectedFace { bbox, landmarks });
        }
        Ok(Self { faces })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw).map_err(|source| FaceError::LandmarkFile {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_json_string(&self) -> std::result::Result<String, serde_json::Error> {
        let file = LandmarkFile {
            faces: self
                .faces
                .iter()
                .map(|f| FaceEntry {
                    bbox: Some(f.bbox),
                    points: f.landmarks.points().iter().map(|p| [p.x, p.y]).collect(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&file)
    }

    pub fn faces(&self) -> &[DetectedFace] {
        &self.faces
    }
}

impl LandmarkProvider for StaticLandmarks {
    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<DetectedFace>> {
        Ok(self.faces.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Landmarks {
        Landmarks::new((0..68).map(|i| Point::new(i as f32, 2.0 * i as f32)).collect()).unwrap()
    }

    #[test]
    fn rejects_wrong_landmark_count() {
        let err = Landmarks::new(vec![Point::new(0.0, 0.0); 5]).unwrap_err();
        assert!(matches!(err, FaceError::LandmarkCount(5)));
    }

    #[test]
    fn regions_cover_expected_indices() {
        let lm = grid();
        assert_eq!(lm.region(region::JAW).len(), 17);
        assert_eq!(lm.region(region::MOUTH)[0], Point::new(48.0, 96.0));
        assert_eq!(lm.region(region::RIGHT_EYE).len(), 6);
        assert_eq!(lm.region(region::LEFT_EYE)[0], lm[42]);

        let sel = lm.select(&[region::RIGHT_EYE, region::NOSE]);
        assert_eq!(sel.len(), 6 + 8);
        assert_eq!(sel[0], lm[36]);
        assert_eq!(sel[6], lm[27]);
    }

    #[test]
    fn centroid_of_region() {
        let lm = grid();
        let c = lm.centroid(region::RIGHT_EYE);
        assert!((c.x - 38.5).abs() < 1e-5);
        assert!((c.y - 77.0).abs() < 1e-5);
    }

    #[test]
    fn static_provider_parses_json() {
        let points: Vec<[f32; 2]> = (0..68).map(|i| [i as f32, 1.0]).collect();
        let raw = serde_json::json!({ "faces": [{ "points": points }] }).to_string();
        let mut provider = StaticLandmarks::from_json_str(&raw).unwrap();
        let faces = provider.detect(&RgbImage::new(1, 1)).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].bbox, BoundingBox::new(0.0, 1.0, 67.0, 0.0));

        let short = serde_json::json!({ "faces": [{ "points": [[0.0, 0.0]] }] }).to_string();
        assert!(StaticLandmarks::from_json_str(&short).is_err());
    }
}
