//! Forehead outline inference.
//!
//! The 68-point layout stops at the brows, so the forehead is estimated from
//! a half-disc above the jaw line, trimmed to pixels whose colour resembles
//! the skin on the nose.

use std::f32::consts::{FRAC_PI_2, PI};

use image::RgbImage;
use log::{debug, warn};

use crate::landmarks::{region, Landmarks, Point};
use crate::mask::{hull_points, Mask};

/// Half-width of the accepted colour band, in standard deviations.
const SKIN_BAND: f32 = 0.5;

/// Per-channel colour band sampled from the nose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinBand {
    /// `(low, high)` per channel; `None` when the nose mask is empty.
    pub channels: [Option<(f32, f32)>; 3],
}

impl SkinBand {
    pub fn sample(image: &RgbImage, nose: &Mask) -> Self {
        let mut channels = [None; 3];
        for (c, slot) in channels.iter_mut().enumerate() {
            let values: Vec<f32> = image
                .enumerate_pixels()
                .filter(|(x, y, _)| nose.get(*x, *y) > 0.0)
                .map(|(_, _, p)| p[c] as f32)
                .collect();
            if values.is_empty() {
                continue;
            }
            let n = values.len() as f32;
            let mean = values.iter().sum::<f32>() / n;
            let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
            let std = var.sqrt();
            *slot = Some((mean - SKIN_BAND * std, mean + SKIN_BAND * std));
        }
        Self { channels }
    }

    /// A pixel is rejected only when every channel falls outside its band.
    pub fn is_outlier(&self, rgb: [u8; 3]) -> bool {
        self.channels.iter().zip(rgb).all(|(band, v)| match band {
            Some((low, high)) => (v as f32) < *low || (v as f32) > *high,
            None => false,
        })
    }
}

/// Half-disc on the brow side of the line joining the jaw corners.
pub fn upper_half_disc(width: u32, height: u32, landmarks: &Landmarks) -> Mask {
    let left = landmarks[region::JAW.start];
    let right = landmarks[region::JAW.end - 1];
    let radius = (left.distance(&right) / 2.0).trunc();
    let center = left.midpoint(&right);
    let (cx, cy) = (center.x.trunc(), center.y.trunc());

    let mut angle = (right.y - left.y).atan2(right.x - left.x);
    if angle > FRAC_PI_2 {
        angle -= PI;
    } else if angle <= -FRAC_PI_2 {
        angle += PI;
    }
    let (sin, cos) = angle.sin_cos();

    let mut mask = Mask::zeros(width, height).into_array();
    if radius <= 0.0 {
        return Mask::from_array(mask);
    }
    let x0 = (cx - radius).floor().max(0.0) as usize;
    let y0 = (cy - radius).floor().max(0.0) as usize;
    let x1 = ((cx + radius).ceil().max(0.0) as usize).min(width as usize);
    let y1 = ((cy + radius).ceil().max(0.0) as usize).min(height as usize);
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let u = dx * cos + dy * sin;
            let v = -dx * sin + dy * cos;
            if v <= 0.0 && u * u + v * v <= radius * radius {
                mask[[y, x]] = 1.0;
            }
        }
    }
    Mask::from_array(mask)
}

/// Candidate forehead pixels: the upper half-disc with known organs zeroed
/// out and colour outliers rejected.
///
/// `excluded` is the union of the mouth, nose, eye and brow masks; `nose` is
/// the nose mask used to sample skin colour.
pub fn forehead_region(
    image: &RgbImage,
    landmarks: &Landmarks,
    excluded: &Mask,
    nose: &Mask,
) -> Mask {
    let (width, height) = image.dimensions();
    let mut candidate = upper_half_disc(width, height, landmarks)
        .zero_where(excluded)
        .into_array();
    let band = SkinBand::sample(image, nose);
    debug!("forehead skin band: {:?}", band.channels);

    for (x, y, pixel) in image.enumerate_pixels() {
        let slot = &mut candidate[[y as usize, x as usize]];
        if *slot > 0.0 && band.is_outlier(pixel.0) {
            *slot = 0.0;
        }
    }
    Mask::from_array(candidate)
}

/// Estimates the forehead outline of one face as the convex hull of
/// [`forehead_region`].
///
/// Always returns a non-empty set: when no candidate pixel survives, the
/// brows shifted upward by half their vertical span are used instead.
pub fn estimate_forehead(
    image: &RgbImage,
    landmarks: &Landmarks,
    excluded: &Mask,
    nose: &Mask,
) -> Vec<Point> {
    let region = forehead_region(image, landmarks, excluded, nose);
    let survivors: Vec<(i32, i32)> = region
        .as_array()
        .indexed_iter()
        .filter(|(_, v)| **v > 0.0)
        .map(|((y, x), _)| (x as i32, y as i32))
        .collect();

    if survivors.is_empty() {
        warn!("no forehead skin found, falling back to raised brow outline");
        return brow_fallback(landmarks);
    }
    debug!("forehead candidate pixels: {}", survivors.len());
    hull_points(&survivors)
}

fn brow_fallback(landmarks: &Landmarks) -> Vec<Point> {
    let brows = landmarks.select(&[region::RIGHT_BROW, region::LEFT_BROW]);
    let (min_y, max_y) = brows
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.y), hi.max(p.y))
        });
    let shift = (max_y - min_y) * 0.5;
    brows.into_iter().map(|p| Point::new(p.x, p.y - shift)).collect()
}
