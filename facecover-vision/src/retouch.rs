//! Mask-gated cosmetic adjustments.
//!
//! Every effect blends an adjusted copy of the image into the working buffer
//! with weight `mask * intensity / 100`, clamping each result to 0..=255.
//! Pixels with zero weight are never rewritten.

use image::RgbImage;
use log::debug;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{FaceError, Result};
use crate::face::FaceRecord;
use crate::filter::{bilateral_filter, hsv_to_rgb, rgb_to_hsv, to_array, to_image};
use crate::mask::Mask;

const WHITEN_GAIN: f32 = 0.3;
/// Kernel that pushes the brow masks up into the forehead seam.
const BROW_SEAM_DILATION: usize = 5;
const SMOOTH_DIAMETER: usize = 9;
const SMOOTH_SIGMA_COLOR: f32 = 75.0;
const SMOOTH_SIGMA_SPACE: f32 = 75.0;
const EYE_GAIN: f32 = 0.3;
const EYE_OFFSET: f32 = 10.0;
const LIP_GAIN: f32 = 0.5;

/// Effect intensities, each within `[0, 100]`. Zero disables an effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetouchParams {
    pub whitening: f32,
    pub smoothing: f32,
    pub bright_eyes: f32,
    pub red_lips: f32,
}

impl RetouchParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("whitening", self.whitening),
            ("smoothing", self.smoothing),
            ("bright_eyes", self.bright_eyes),
            ("red_lips", self.red_lips),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(FaceError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        self.whitening == 0.0
            && self.smoothing == 0.0
            && self.bright_eyes == 0.0
            && self.red_lips == 0.0
    }
}

/// Applies the enabled effects to every face, in the order whitening,
/// smoothing, bright eyes, red lips. Each effect sees the previous one's
/// output.
///
/// Every record must have been built from an image of the same size.
pub fn retouch(image: &RgbImage, faces: &[FaceRecord], params: &RetouchParams) -> Result<RgbImage> {
    params.validate()?;
    let (w, h) = image.dimensions();
    for face in faces {
        let (mw, mh) = (face.masks.face.width(), face.masks.face.height());
        if (mw, mh) != (w, h) {
            return Err(FaceError::DegenerateGeometry(format!(
                "face {} was built for a {mw}x{mh} image, got {w}x{h}",
                face.index
            )));
        }
    }
    if params.is_identity() || faces.is_empty() {
        return Ok(image.clone());
    }

    let mut buf = to_array(image);
    for face in faces {
        debug!("retouching face {} with {:?}", face.index, params);
        if params.whitening > 0.0 {
            apply_whitening(&mut buf, face, params.whitening);
        }
        if params.smoothing > 0.0 {
            apply_smoothing(&mut buf, face, params.smoothing);
        }
        if params.bright_eyes > 0.0 {
            apply_bright_eyes(&mut buf, face, params.bright_eyes);
        }
        if params.red_lips > 0.0 {
            apply_red_lips(&mut buf, face, params.red_lips);
        }
    }
    Ok(to_image(&buf))
}

fn weights(mask: &Mask, intensity: f32) -> Array2<f32> {
    mask.clamped().scaled(intensity / 100.0).into_array()
}

/// Per-pixel `orig * (1 - w) + adjusted * w` over pixels with `w > 0`.
fn blend_with(
    buf: &mut Array3<f32>,
    weights: &Array2<f32>,
    adjust: impl Fn(usize, usize, [f32; 3]) -> [f32; 3],
) {
    for ((y, x), &w) in weights.indexed_iter() {
        if w <= 0.0 {
            continue;
        }
        let orig = [buf[[y, x, 0]], buf[[y, x, 1]], buf[[y, x, 2]]];
        let adjusted = adjust(y, x, orig);
        for c in 0..3 {
            buf[[y, x, c]] = (orig[c] * (1.0 - w) + adjusted[c] * w).clamp(0.0, 255.0);
        }
    }
}

/// Brightens the value channel over face, forehead and the brow seam.
///
/// `buf` must have the size the record was built for.
pub fn apply_whitening(buf: &mut Array3<f32>, face: &FaceRecord, intensity: f32) {
    let masks = &face.masks;
    let combined = masks
        .face
        .union(&masks.forehead)
        .union(&masks.brows().dilate(BROW_SEAM_DILATION));
    let weights = weights(&combined, intensity);

    for ((y, x), &w) in weights.indexed_iter() {
        if w <= 0.0 {
            continue;
        }
        let (h, s, v) = rgb_to_hsv(buf[[y, x, 0]], buf[[y, x, 1]], buf[[y, x, 2]]);
        let brightened = (v + v * w * WHITEN_GAIN).min(255.0);
        let v = (v * (1.0 - w) + brightened * w).clamp(0.0, 255.0);
        let (r, g, b) = hsv_to_rgb(h, s, v);
        buf[[y, x, 0]] = r.clamp(0.0, 255.0);
        buf[[y, x, 1]] = g.clamp(0.0, 255.0);
        buf[[y, x, 2]] = b.clamp(0.0, 255.0);
    }
}

/// Bilateral smoothing over the face, then again over the forehead.
pub fn apply_smoothing(buf: &mut Array3<f32>, face: &FaceRecord, intensity: f32) {
    for mask in [&face.masks.face, &face.masks.forehead] {
        let weights = weights(mask, intensity);
        let smoothed = bilateral_filter(
            buf,
            weights.view(),
            SMOOTH_DIAMETER,
            SMOOTH_SIGMA_COLOR,
            SMOOTH_SIGMA_SPACE,
        );
        blend_with(buf, &weights, |y, x, _| {
            [smoothed[[y, x, 0]], smoothed[[y, x, 1]], smoothed[[y, x, 2]]]
        });
    }
}

/// Contrast and brightness boost inside each eye.
pub fn apply_bright_eyes(buf: &mut Array3<f32>, face: &FaceRecord, intensity: f32) {
    let i = intensity / 100.0;
    let gain = 1.0 + EYE_GAIN * i;
    let offset = EYE_OFFSET * i;
    for mask in [&face.masks.left_eye, &face.masks.right_eye] {
        let weights = weights(mask, intensity);
        blend_with(buf, &weights, |_, _, px| {
            px.map(|v| (v * gain + offset).clamp(0.0, 255.0))
        });
    }
}

/// Red channel boost inside the mouth.
pub fn apply_red_lips(buf: &mut Array3<f32>, face: &FaceRecord, intensity: f32) {
    let gain = 1.0 + LIP_GAIN * intensity / 100.0;
    let weights = weights(&face.masks.mouth, intensity);
    blend_with(buf, &weights, |_, _, [r, g, b]| [(r * gain).min(255.0), g, b]);
}
