//! Similarity alignment between two landmark sets, and the inverse-mapped
//! warps that move pixels and masks through it.

use std::ops::Range;

use log::debug;
use nalgebra::{Matrix2, Matrix3, Vector2};
use ndarray::{Array2, Array3};

use crate::error::{FaceError, Result};
use crate::landmarks::{region, Landmarks, Point};
use crate::mask::Mask;

/// Regions used for alignment. Jaw and brows are left out so differences in
/// head shape do not pull the fit.
pub const ALIGN_REGIONS: [Range<usize>; 4] = [
    region::RIGHT_EYE,
    region::LEFT_EYE,
    region::NOSE,
    region::MOUTH,
];

/// 2D similarity (uniform scale, rotation, translation) in homogeneous form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform {
    matrix: Matrix3<f64>,
}

impl SimilarityTransform {
    /// Builds `translate * rotate(angle) * scale`.
    pub fn from_parts(scale: f64, angle: f64, tx: f64, ty: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            matrix: Matrix3::new(
                scale * cos,
                -scale * sin,
                tx,
                scale * sin,
                scale * cos,
                ty,
                0.0,
                0.0,
                1.0,
            ),
        }
    }

    /// Least-squares similarity mapping `from` onto `to`.
    ///
    /// Both sets are centred on their centroids and divided by their
    /// standard deviation; the rotation is the orthogonal Procrustes solution
    /// from the SVD of the cross-covariance, restricted to proper rotations.
    pub fn estimate(from: &[Point], to: &[Point]) -> Result<Self> {
        if from.len() != to.len() {
            return Err(FaceError::DegenerateGeometry(format!(
                "point sets differ in length ({} vs {})",
                from.len(),
                to.len()
            )));
        }
        if from.len() < 2 {
            return Err(FaceError::DegenerateGeometry(
                "need at least two points to align".into(),
            ));
        }

        let (c1, s1, a) = normalize(from)?;
        let (c2, s2, b) = normalize(to)?;

        let mut h = Matrix2::<f64>::zeros();
        for (p, q) in a.iter().zip(&b) {
            h += p * q.transpose();
        }

        let svd = h.svd(true, true);
        let (u, v_t) = match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => (u, v_t),
            _ => {
                return Err(FaceError::DegenerateGeometry(
                    "SVD of cross-covariance did not converge".into(),
                ))
            }
        };
        let v = v_t.transpose();
        let mut rotation = v * u.transpose();
        if rotation.determinant() < 0.0 {
            let flip = Matrix2::new(1.0, 0.0, 0.0, -1.0);
            rotation = v * flip * u.transpose();
        }

        let scale = s2 / s1;
        let linear = rotation * scale;
        let t = c2 - linear * c1;
        debug!(
            "similarity: scale {scale:.4}, angle {:.4} rad, translation ({:.2}, {:.2})",
            rotation[(1, 0)].atan2(rotation[(0, 0)]),
            t.x,
            t.y
        );

        let mut matrix = Matrix3::identity();
        matrix.fixed_view_mut::<2, 2>(0, 0).copy_from(&linear);
        matrix[(0, 2)] = t.x;
        matrix[(1, 2)] = t.y;
        Ok(Self { matrix })
    }

    /// Transform mapping `source` landmarks into `template` space, using
    /// [`ALIGN_REGIONS`].
    pub fn between(source: &Landmarks, template: &Landmarks) -> Result<Self> {
        Self::estimate(&source.select(&ALIGN_REGIONS), &template.select(&ALIGN_REGIONS))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn scale(&self) -> f64 {
        let a = self.matrix.fixed_view::<2, 2>(0, 0);
        a.determinant().abs().sqrt()
    }

    /// Rotation angle in radians.
    pub fn rotation(&self) -> f64 {
        self.matrix[(1, 0)].atan2(self.matrix[(0, 0)])
    }

    pub fn translation(&self) -> (f64, f64) {
        (self.matrix[(0, 2)], self.matrix[(1, 2)])
    }

    pub fn apply(&self, p: Point) -> Point {
        let (x, y) = self.apply_f64(p.x as f64, p.y as f64);
        Point::new(x as f32, y as f32)
    }

    fn apply_f64(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.matrix;
        (
            m[(0, 0)] * x + m[(0, 1)] * y + m[(0, 2)],
            m[(1, 0)] * x + m[(1, 1)] * y + m[(1, 2)],
        )
    }

    /// Inverse similarity. The scale of an estimated transform is always
    /// positive, so this never fails.
    pub fn inverse(&self) -> Self {
        let linear: Matrix2<f64> = self.matrix.fixed_view::<2, 2>(0, 0).into_owned();
        let s2 = linear.determinant().abs();
        let inv = linear.transpose() / s2;
        let t = -(inv * Vector2::new(self.matrix[(0, 2)], self.matrix[(1, 2)]));
        let mut matrix = Matrix3::identity();
        matrix.fixed_view_mut::<2, 2>(0, 0).copy_from(&inv);
        matrix[(0, 2)] = t.x;
        matrix[(1, 2)] = t.y;
        Self { matrix }
    }

    /// `self` applied after `first`.
    pub fn compose(&self, first: &SimilarityTransform) -> Self {
        Self {
            matrix: self.matrix * first.matrix,
        }
    }
}

/// Centroid, standard deviation over all coordinates, and normalized points.
fn normalize(points: &[Point]) -> Result<(Vector2<f64>, f64, Vec<Vector2<f64>>)> {
    let n = points.len() as f64;
    let pts: Vec<Vector2<f64>> = points
        .iter()
        .map(|p| Vector2::new(p.x as f64, p.y as f64))
        .collect();
    let centroid = pts.iter().fold(Vector2::zeros(), |acc, p| acc + p) / n;
    let centered: Vec<Vector2<f64>> = pts.iter().map(|p| p - centroid).collect();
    let var = centered.iter().map(|p| p.norm_squared()).sum::<f64>() / (2.0 * n);
    let std = var.sqrt();
    if !std.is_finite() || std < 1e-9 {
        return Err(FaceError::DegenerateGeometry(
            "landmark set has zero spread".into(),
        ));
    }
    Ok((centroid, std, centered.into_iter().map(|p| p / std).collect()))
}

/// Bilinear taps for a source position, or `None` outside the source.
fn taps(x: f64, y: f64, width: usize, height: usize) -> Option<[(usize, usize, f32); 4]> {
    if !(x >= 0.0 && y >= 0.0 && x < width as f64 && y < height as f64) {
        return None;
    }
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;
    Some([
        (y0, x0, (1.0 - fx) * (1.0 - fy)),
        (y0, x1, fx * (1.0 - fy)),
        (y1, x0, (1.0 - fx) * fy),
        (y1, x1, fx * fy),
    ])
}

/// Warps a working image into a `width x height` destination.
///
/// `transform` maps source coordinates to destination coordinates; each
/// destination pixel samples the source at the inverse position. Positions
/// outside the source stay transparent (zero).
pub fn warp_rgb(
    src: &Array3<f32>,
    transform: &SimilarityTransform,
    width: u32,
    height: u32,
) -> Array3<f32> {
    let (src_h, src_w, channels) = src.dim();
    let inverse = transform.inverse();
    let mut out = Array3::<f32>::zeros((height as usize, width as usize, channels));
    for y in 0..height as usize {
        for x in 0..width as usize {
            let (sx, sy) = inverse.apply_f64(x as f64, y as f64);
            let Some(samples) = taps(sx, sy, src_w, src_h) else {
                continue;
            };
            for c in 0..channels {
                out[[y, x, c]] = samples.iter().map(|&(ty, tx, w)| src[[ty, tx, c]] * w).sum();
            }
        }
    }
    out
}

/// Same as [`warp_rgb`] for a single-channel mask.
pub fn warp_mask(mask: &Mask, transform: &SimilarityTransform, width: u32, height: u32) -> Mask {
    let src = mask.as_array();
    let (src_h, src_w) = src.dim();
    let inverse = transform.inverse();
    let mut out = Array2::<f32>::zeros((height as usize, width as usize));
    for y in 0..height as usize {
        for x in 0..width as usize {
            let (sx, sy) = inverse.apply_f64(x as f64, y as f64);
            if let Some(samples) = taps(sx, sy, src_w, src_h) {
                out[[y, x]] = samples.iter().map(|&(ty, tx, w)| src[[ty, tx]] * w).sum();
            }
        }
    }
    Mask::from_array(out)
}
