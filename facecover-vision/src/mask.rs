//! Soft region masks built from landmark subsets.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::geometry::convex_hull;
use imageproc::morphology::{grayscale_dilate, Mask as StructuringElement};
use imageproc::point::Point as HullPoint;
use ndarray::{Array2, Zip};

use crate::filter::{gaussian_blur, to_u8};
use crate::landmarks::Point;

/// Feather kernel applied to every organ mask.
pub const REGION_FEATHER: usize = 15;

/// Rounds a feather amount up to the next odd kernel size (minimum 1).
pub fn odd_kernel(amount: u32) -> usize {
    let k = amount.max(1) as usize;
    if k % 2 == 0 {
        k + 1
    } else {
        k
    }
}

/// Single-channel weight map in `(height, width)` layout with peak `1.0`.
///
/// Feathered masks may slightly exceed the peak; use [`Mask::clamped`] before
/// treating values as blend weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask(Array2<f32>);

impl Mask {
    pub fn zeros(width: u32, height: u32) -> Self {
        Self(Array2::zeros((height as usize, width as usize)))
    }

    pub fn from_array(data: Array2<f32>) -> Self {
        Self(data)
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.0
    }

    pub fn into_array(self) -> Array2<f32> {
        self.0
    }

    pub fn width(&self) -> u32 {
        self.0.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.0.nrows() as u32
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.0[[y as usize, x as usize]]
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|v| *v <= 0.0)
    }

    /// Elementwise maximum.
    pub fn union(&self, other: &Mask) -> Mask {
        let mut out = self.0.clone();
        Zip::from(&mut out)
            .and(&other.0)
            .for_each(|a, &b| *a = a.max(b));
        Mask(out)
    }

    pub fn union_all<'a>(width: u32, height: u32, masks: impl IntoIterator<Item = &'a Mask>) -> Mask {
        masks
            .into_iter()
            .fold(Mask::zeros(width, height), |acc, m| acc.union(m))
    }

    /// Zeros every pixel covered by `other`.
    pub fn zero_where(&self, other: &Mask) -> Mask {
        let mut out = self.0.clone();
        Zip::from(&mut out).and(&other.0).for_each(|a, &b| {
            if b > 0.0 {
                *a = 0.0;
            }
        });
        Mask(out)
    }

    /// Grayscale dilation with a `size x size` square structuring element.
    ///
    /// Runs on the 8-bit rendering, so values are quantized to 1/255 steps
    /// and clamped to the peak.
    pub fn dilate(&self, size: usize) -> Mask {
        let radius = (size / 2).min(u8::MAX as usize) as u8;
        let element = StructuringElement::square(radius);
        Mask::from_gray(&grayscale_dilate(&self.to_gray(), &element))
    }

    /// Gaussian feathering with an odd kernel size.
    pub fn feather(&self, ksize: usize) -> Mask {
        Mask(gaussian_blur(self.0.view(), ksize))
    }

    /// `1.0` wherever the mask is positive, `0.0` elsewhere.
    pub fn threshold(&self) -> Mask {
        Mask(self.0.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }))
    }

    pub fn clamped(&self) -> Mask {
        Mask(self.0.mapv(|v| v.clamp(0.0, 1.0)))
    }

    pub fn scaled(&self, factor: f32) -> Mask {
        Mask(self.0.mapv(|v| v * factor))
    }

    /// 8-bit rendering on the 0..=255 scale.
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            Luma([to_u8(self.get(x, y) * 255.0)])
        })
    }

    pub fn from_gray(image: &GrayImage) -> Mask {
        let (w, h) = image.dimensions();
        Mask(Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
            image.get_pixel(x as u32, y as u32)[0] as f32 / 255.0
        }))
    }
}

/// Fills the convex hull of `points` with `1.0`, without feathering.
///
/// Fewer than three points, or a hull that collapses to a line, contributes
/// nothing.
pub fn fill_hull(width: u32, height: u32, points: &[Point]) -> Mask {
    let mut canvas = GrayImage::new(width, height);
    draw_hull(&mut canvas, points);
    Mask::from_gray(&canvas)
}

pub(crate) fn draw_hull(canvas: &mut GrayImage, points: &[Point]) {
    if points.len() < 3 {
        return;
    }
    let pts: Vec<HullPoint<i32>> = points
        .iter()
        .map(|p| HullPoint::new(p.x.round() as i32, p.y.round() as i32))
        .collect();
    let hull = convex_hull(pts.as_slice());
    if hull.len() < 3 || hull.first() == hull.last() {
        return;
    }
    draw_polygon_mut(canvas, &hull, Luma([255u8]));
}

/// Convex hull of `points`, filled and feathered with [`REGION_FEATHER`].
pub fn build_mask(width: u32, height: u32, points: &[Point]) -> Mask {
    fill_hull(width, height, points).feather(REGION_FEATHER)
}

/// Vertices of the convex hull of integer pixel coordinates.
pub fn hull_points(points: &[(i32, i32)]) -> Vec<Point> {
    let pts: Vec<HullPoint<i32>> = points.iter().map(|&(x, y)| HullPoint::new(x, y)).collect();
    convex_hull(pts.as_slice())
        .into_iter()
        .map(|p| Point::new(p.x as f32, p.y as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f32, y0: f32, side: f32) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + side, y0),
            Point::new(x0 + side, y0 + side),
            Point::new(x0, y0 + side),
        ]
    }

    #[test]
    fn few_points_give_empty_mask() {
        let m = build_mask(32, 24, &[Point::new(1.0, 1.0), Point::new(10.0, 10.0)]);
        assert_eq!((m.width(), m.height()), (32, 24));
        assert!(m.is_empty());
        assert!(build_mask(8, 8, &[]).is_empty());
    }

    #[test]
    fn collinear_points_give_empty_mask() {
        let line: Vec<Point> = (0..5).map(|i| Point::new(i as f32, i as f32)).collect();
        assert!(build_mask(16, 16, &line).is_empty());
    }

    #[test]
    fn hull_is_peaked_inside_and_zero_far_away() {
        let m = build_mask(100, 100, &square(30.0, 30.0, 40.0)).clamped();
        assert!(m.get(50, 50) > 0.99);
        assert_eq!(m.get(2, 2), 0.0);
        assert_eq!(m.get(97, 97), 0.0);
        assert!(m.as_array().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn feather_is_monotonic_across_edge() {
        let m = build_mask(100, 100, &square(30.0, 30.0, 40.0));
        let row: Vec<f32> = (15..50).map(|x| m.get(x, 50)).collect();
        assert!(row.windows(2).all(|w| w[1] >= w[0] - 1e-6));
    }

    #[test]
    fn union_dominates_inputs() {
        let a = build_mask(64, 64, &square(5.0, 5.0, 20.0));
        let b = build_mask(64, 64, &square(20.0, 20.0, 30.0));
        let u = a.union(&b);
        for ((ua, aa), ba) in u.as_array().iter().zip(a.as_array()).zip(b.as_array()) {
            assert!(ua >= aa && ua >= ba);
        }
    }

    #[test]
    fn dilate_grows_support() {
        let mut raw = Array2::zeros((9, 9));
        raw[[4, 4]] = 1.0;
        raw[[0, 8]] = 0.4;
        let d = Mask::from_array(raw).dilate(5);
        assert_eq!(d.get(2, 2), 1.0);
        assert_eq!(d.get(6, 6), 1.0);
        assert_eq!(d.get(1, 4), 0.0);
        // Quantized to the 8-bit scale.
        assert!((d.get(7, 1) - 102.0 / 255.0).abs() < 1e-6);
        assert_eq!(d.get(8, 8), 0.0);
    }

    #[test]
    fn zero_where_excludes() {
        let a = fill_hull(20, 20, &square(0.0, 0.0, 19.0));
        let b = fill_hull(20, 20, &square(5.0, 5.0, 5.0));
        let z = a.zero_where(&b);
        assert_eq!(z.get(7, 7), 0.0);
        assert_eq!(z.get(15, 15), 1.0);
    }

    #[test]
    fn odd_kernel_sizes() {
        assert_eq!(odd_kernel(11), 11);
        assert_eq!(odd_kernel(10), 11);
        assert_eq!(odd_kernel(0), 1);
    }
}
