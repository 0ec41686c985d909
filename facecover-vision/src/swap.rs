//! Landmark-aligned face transplanting.
//!
//! The source face is fitted onto the template with a similarity transform,
//! its large-scale colour is replaced with the template's, and the result is
//! alpha-blended over the template through a feathered organ mask.

use image::{GrayImage, RgbImage};
use log::{debug, info};
use ndarray::{Array3, Zip};
use serde::{Deserialize, Serialize};

use crate::align::{warp_mask, warp_rgb, SimilarityTransform};
use crate::error::{FaceError, Result};
use crate::filter::{gaussian_blur_rgb, to_array, to_image};
use crate::landmarks::{region, DetectedFace, Landmarks};
use crate::mask::{draw_hull, odd_kernel, Mask};

/// Offset added to near-black blurred source values before dividing.
const DIVISION_GUARD: f32 = 128.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapParams {
    /// Feather kernel for the swap mask, rounded up to odd.
    pub feather_amount: u32,
    /// Colour-correction blur as a fraction of the template's eye distance.
    pub colour_blur_fraction: f32,
}

impl Default for SwapParams {
    fn default() -> Self {
        Self {
            feather_amount: 11,
            colour_blur_fraction: 0.6,
        }
    }
}

/// Mask over the eyes, nose and mouth of one face.
///
/// Each region's hull is filled, the union feathered, thresholded back to a
/// hard edge that now reaches slightly past the hulls, and feathered again.
pub fn swap_mask(width: u32, height: u32, landmarks: &Landmarks, feather: usize) -> Mask {
    let mut canvas = GrayImage::new(width, height);
    for group in [region::LEFT_EYE, region::RIGHT_EYE, region::NOSE, region::MOUTH] {
        draw_hull(&mut canvas, landmarks.region(group));
    }
    Mask::from_gray(&canvas)
        .feather(feather)
        .threshold()
        .feather(feather)
}

/// Blur kernel for colour correction: `fraction` of the eye-centre distance,
/// truncated and bumped to the next odd size.
pub fn colour_blur_kernel(landmarks: &Landmarks, fraction: f32) -> Result<usize> {
    let left = landmarks.centroid(region::LEFT_EYE);
    let right = landmarks.centroid(region::RIGHT_EYE);
    let distance = left.distance(&right);
    if !distance.is_finite() || distance < 1e-6 {
        return Err(FaceError::DegenerateGeometry(
            "eye centres coincide".into(),
        ));
    }
    let amount = (fraction * distance).max(0.0) as usize;
    let k = if amount % 2 == 0 { amount + 1 } else { amount };
    Ok(k.max(1))
}

/// Transfers the template's low-frequency colour onto the warped source:
/// `warped * blur(template) / blur(warped)`.
pub fn correct_colours(
    template: &Array3<f32>,
    warped: &Array3<f32>,
    template_landmarks: &Landmarks,
    fraction: f32,
) -> Result<Array3<f32>> {
    let ksize = colour_blur_kernel(template_landmarks, fraction)?;
    debug!("colour correction kernel: {ksize}");
    let template_blur = gaussian_blur_rgb(template, ksize);
    let warped_blur = gaussian_blur_rgb(warped, ksize);

    let mut out = Array3::<f32>::zeros(warped.dim());
    Zip::from(&mut out)
        .and(warped)
        .and(&template_blur)
        .and(&warped_blur)
        .for_each(|o, &w, &tb, &wb| {
            let wb = if wb <= 1.0 { wb + DIVISION_GUARD } else { wb };
            *o = w * tb / wb;
        });
    Ok(out)
}

/// Transplants the source face onto the template.
///
/// The output has the template's dimensions and is a pure function of the
/// inputs.
pub fn swap(
    template: &RgbImage,
    template_landmarks: &Landmarks,
    source: &RgbImage,
    source_landmarks: &Landmarks,
    params: &SwapParams,
) -> Result<RgbImage> {
    let (tw, th) = template.dimensions();
    let (sw, sh) = source.dimensions();
    let transform = SimilarityTransform::between(source_landmarks, template_landmarks)?;
    let feather = odd_kernel(params.feather_amount);

    let source_mask = swap_mask(sw, sh, source_landmarks, feather);
    let warped_mask = warp_mask(&source_mask, &transform, tw, th);
    let template_mask = swap_mask(tw, th, template_landmarks, feather);
    let combined = template_mask.union(&warped_mask).clamped();

    let template_px = to_array(template);
    let warped = warp_rgb(&to_array(source), &transform, tw, th);
    let corrected = correct_colours(
        &template_px,
        &warped,
        template_landmarks,
        params.colour_blur_fraction,
    )?;

    let mut out = template_px;
    for ((y, x), &m) in combined.as_array().indexed_iter() {
        if m <= 0.0 {
            continue;
        }
        for c in 0..3 {
            let blended = out[[y, x, c]] * (1.0 - m) + corrected[[y, x, c]] * m;
            out[[y, x, c]] = blended.clamp(0.0, 255.0);
        }
    }
    info!(
        "swapped face into {tw}x{th} template (scale {:.3}, rotation {:.3} rad)",
        transform.scale(),
        transform.rotation()
    );
    Ok(to_image(&out))
}

/// [`swap`] for raw detector output. Each image must contain exactly one
/// face; the engine never picks one on the caller's behalf.
pub fn swap_detected(
    template: &RgbImage,
    template_faces: &[DetectedFace],
    source: &RgbImage,
    source_faces: &[DetectedFace],
    params: &SwapParams,
) -> Result<RgbImage> {
    let template_face = single_face("template", template_faces)?;
    let source_face = single_face("source", source_faces)?;
    swap(
        template,
        &template_face.landmarks,
        source,
        &source_face.landmarks,
        params,
    )
}

fn single_face<'a>(role: &'static str, faces: &'a [DetectedFace]) -> Result<&'a DetectedFace> {
    match faces {
        [face] => Ok(face),
        _ => Err(FaceError::AmbiguousFaceCount {
            role,
            count: faces.len(),
        }),
    }
}
