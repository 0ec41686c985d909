use std::path::Path;

use image::RgbImage;
use log::info;

use crate::error::{FaceError, Result};
use crate::face::FaceRecord;
use crate::landmarks::LandmarkProvider;
use crate::retouch::{retouch, RetouchParams};
use crate::swap::{swap_detected, SwapParams};

/// Full pipeline: detect landmarks → build face records → retouch or swap.
pub struct Pipeline<P> {
    pub provider: P,
}

impl<P: LandmarkProvider> Pipeline<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Decodes an image file as 8-bit RGB.
    pub fn load_image(path: &Path) -> Result<RgbImage> {
        let img = image::open(path).map_err(|source| FaceError::UnreadableImage {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(img.to_rgb8())
    }

    /// Detects every face and builds its masks.
    pub fn analyze(&mut self, image: &RgbImage) -> Result<Vec<FaceRecord>> {
        let detections = self.provider.detect(image)?;
        if detections.is_empty() {
            return Err(FaceError::NoFace);
        }
        info!("detected {} face(s)", detections.len());
        Ok(detections
            .iter()
            .enumerate()
            .map(|(i, d)| FaceRecord::build(image, i, d))
            .collect())
    }

    /// Analyzes and retouches in one go.
    pub fn beautify(&mut self, image: &RgbImage, params: &RetouchParams) -> Result<RgbImage> {
        params.validate()?;
        if params.is_identity() {
            return Ok(image.clone());
        }
        let faces = self.analyze(image)?;
        retouch(image, &faces, params)
    }

    /// Detects one face in each image and transplants the source face onto
    /// the template.
    pub fn swap_images(
        &mut self,
        template: &RgbImage,
        source: &RgbImage,
        params: &SwapParams,
    ) -> Result<RgbImage> {
        let template_faces = self.provider.detect(template)?;
        let source_faces = self.provider.detect(source)?;
        swap_detected(template, &template_faces, source, &source_faces, params)
    }
}
