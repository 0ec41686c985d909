use image::RgbImage;
use log::debug;

use crate::forehead::estimate_forehead;
use crate::landmarks::{region, BoundingBox, DetectedFace, Landmarks, Point};
use crate::mask::{build_mask, Mask};

/// Feathered masks of every named face region.
#[derive(Debug, Clone)]
pub struct RegionMasks {
    pub jaw: Mask,
    pub mouth: Mask,
    pub nose: Mask,
    pub left_eye: Mask,
    pub right_eye: Mask,
    pub left_brow: Mask,
    pub right_brow: Mask,
    pub forehead: Mask,
    /// Hull of all 68 landmarks.
    pub face: Mask,
}

impl RegionMasks {
    /// Union of mouth, nose, eyes and brows.
    pub fn organs(&self) -> Mask {
        organ_union(
            &self.mouth,
            &self.nose,
            &self.left_eye,
            &self.right_eye,
            &self.left_brow,
            &self.right_brow,
        )
    }

    pub fn brows(&self) -> Mask {
        self.left_brow.union(&self.right_brow)
    }
}

fn organ_union(
    mouth: &Mask,
    nose: &Mask,
    left_eye: &Mask,
    right_eye: &Mask,
    left_brow: &Mask,
    right_brow: &Mask,
) -> Mask {
    Mask::union_all(
        mouth.width(),
        mouth.height(),
        [mouth, nose, left_eye, right_eye, left_brow, right_brow],
    )
}

/// Everything known about one detected face.
#[derive(Debug, Clone)]
pub struct FaceRecord {
    pub index: usize,
    pub bbox: BoundingBox,
    pub landmarks: Landmarks,
    /// Estimated forehead outline.
    pub forehead: Vec<Point>,
    pub masks: RegionMasks,
}

impl FaceRecord {
    pub fn build(image: &RgbImage, index: usize, detected: &DetectedFace) -> Self {
        let (w, h) = image.dimensions();
        let lm = &detected.landmarks;
        let organ = |r| build_mask(w, h, lm.region(r));

        let jaw = organ(region::JAW);
        let mouth = organ(region::MOUTH);
        let nose = organ(region::NOSE);
        let left_eye = organ(region::LEFT_EYE);
        let right_eye = organ(region::RIGHT_EYE);
        let left_brow = organ(region::LEFT_BROW);
        let right_brow = organ(region::RIGHT_BROW);

        let excluded = organ_union(&mouth, &nose, &left_eye, &right_eye, &left_brow, &right_brow);
        let forehead_points = estimate_forehead(image, lm, &excluded, &nose);
        debug!("face {index}: forehead outline has {} points", forehead_points.len());
        let forehead = build_mask(w, h, &forehead_points);
        let face = organ(region::ALL);

        Self {
            index,
            bbox: detected.bbox,
            landmarks: lm.clone(),
            forehead: forehead_points,
            masks: RegionMasks {
                jaw,
                mouth,
                nose,
                left_eye,
                right_eye,
                left_brow,
                right_brow,
                forehead,
                face,
            },
        }
    }
}
