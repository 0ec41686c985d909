use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use facecover_vision::{
    swap_detected, DetectedFace, LandmarkProvider, Pipeline, StaticLandmarks, SwapParams,
};
use image::RgbImage;
use log::{info, warn};

use crate::config::{Config, TemplateAsset};

/// Result of rendering one template of a theme.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverOutcome {
    /// The user's face was swapped into the template.
    Generated { index: usize, path: PathBuf },
    /// Swapping failed and the user image was copied in its place.
    Fallback {
        index: usize,
        path: PathBuf,
        reason: String,
    },
}

impl CoverOutcome {
    pub fn path(&self) -> &Path {
        match self {
            CoverOutcome::Generated { path, .. } | CoverOutcome::Fallback { path, .. } => path,
        }
    }
}

/// Swaps the user's face into every template of a theme.
///
/// Covers land in `<output_dir>/<theme>/cover_<n>.jpg`, numbered from 1 in
/// template order. Templates whose image is missing are skipped. When a swap
/// fails the user image is copied to `default_<n>.<ext>` instead, so a theme
/// always yields something to show.
pub fn generate_covers(
    cfg: &Config,
    theme_id: &str,
    source_image: &Path,
    source_landmarks: &Path,
) -> Result<Vec<CoverOutcome>> {
    let theme = cfg
        .theme(theme_id)
        .ok_or_else(|| anyhow!("unknown theme: {theme_id}"))?;

    let out_dir = cfg.covers.output_dir.join(&theme.id);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output dir {}", out_dir.display()))?;

    let source = Pipeline::<StaticLandmarks>::load_image(source_image)?;
    let source_faces = StaticLandmarks::from_json_file(source_landmarks)?.detect(&source)?;

    info!(
        "Generating {} cover(s) for theme {} ({})",
        theme.templates.len(),
        theme.name,
        theme.id
    );

    let ext = source_image
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg");

    let mut outcomes = Vec::with_capacity(theme.templates.len());
    for (i, template) in theme.templates.iter().enumerate() {
        let index = i + 1;
        if !template.image.exists() {
            warn!("Template {} is missing, skipping", template.image.display());
            continue;
        }

        let cover_path = out_dir.join(format!("cover_{index}.jpg"));
        match render_cover(template, &source, &source_faces, &cfg.swap, &cover_path) {
            Ok(()) => {
                info!("✓ Cover {} written to {}", index, cover_path.display());
                outcomes.push(CoverOutcome::Generated {
                    index,
                    path: cover_path,
                });
            }
            Err(e) => {
                let fallback = out_dir.join(format!("default_{index}.{ext}"));
                warn!("Cover {}: {:#}; using the original photo", index, e);
                std::fs::copy(source_image, &fallback).with_context(|| {
                    format!("copying fallback cover to {}", fallback.display())
                })?;
                outcomes.push(CoverOutcome::Fallback {
                    index,
                    path: fallback,
                    reason: format!("{e:#}"),
                });
            }
        }
    }

    Ok(outcomes)
}

fn render_cover(
    template: &TemplateAsset,
    source: &RgbImage,
    source_faces: &[DetectedFace],
    params: &SwapParams,
    out_path: &Path,
) -> Result<()> {
    let image = Pipeline::<StaticLandmarks>::load_image(&template.image)?;
    let template_faces = StaticLandmarks::from_json_file(&template.landmarks)
        .with_context(|| format!("template {}", template.image.display()))?
        .detect(&image)?;
    let cover = swap_detected(&image, &template_faces, source, source_faces, params)?;
    cover
        .save(out_path)
        .with_context(|| format!("writing {}", out_path.display()))?;
    Ok(())
}
