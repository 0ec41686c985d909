mod common;

use anyhow::Result;
use facecover_vision::{
    FaceError, LandmarkProvider, Pipeline, RetouchParams, StaticLandmarks, SwapParams,
};

use common::{synthetic_face, synthetic_landmarks};

#[test]
fn test_files_end_to_end() -> Result<()> {
    env_logger::try_init().ok();
    let dir = std::env::temp_dir().join(format!("facecover-pipeline-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;

    let template_path = dir.join("template.png");
    let source_path = dir.join("source.png");
    synthetic_face(160, 180, 80.0, 90.0, 50.0).save(&template_path)?;
    synthetic_face(120, 120, 60.0, 60.0, 38.0).save(&source_path)?;

    let template_json = dir.join("template.json");
    let source_json = dir.join("source.json");
    std::fs::write(
        &template_json,
        StaticLandmarks::single(synthetic_landmarks(80.0, 90.0, 50.0)).to_json_string()?,
    )?;
    std::fs::write(
        &source_json,
        StaticLandmarks::single(synthetic_landmarks(60.0, 60.0, 38.0)).to_json_string()?,
    )?;

    let template = Pipeline::<StaticLandmarks>::load_image(&template_path)?;
    let source = Pipeline::<StaticLandmarks>::load_image(&source_path)?;

    let mut template_pipeline = Pipeline::new(StaticLandmarks::from_json_file(&template_json)?);
    let template_faces = template_pipeline.provider.detect(&template)?;
    let mut source_pipeline = Pipeline::new(StaticLandmarks::from_json_file(&source_json)?);
    let source_faces = source_pipeline.provider.detect(&source)?;

    let out = facecover_vision::swap_detected(
        &template,
        &template_faces,
        &source,
        &source_faces,
        &SwapParams::default(),
    )?;
    assert_eq!(out.dimensions(), (160, 180));

    let retouched = source_pipeline.beautify(
        &source,
        &RetouchParams {
            whitening: 30.0,
            smoothing: 30.0,
            ..Default::default()
        },
    )?;
    assert_eq!(retouched.dimensions(), source.dimensions());

    let out_path = dir.join("cover.png");
    out.save(&out_path)?;
    let reloaded = Pipeline::<StaticLandmarks>::load_image(&out_path)?;
    assert_eq!(reloaded, out);

    std::fs::remove_dir_all(&dir)?;
    println!("✓ Pipeline round trip through files");
    Ok(())
}

#[test]
fn test_bad_landmark_file() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("facecover-badlm-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("broken.json");
    std::fs::write(&path, r#"{"faces": [{"points": [[1.0, 2.0]]}]}"#)?;

    let err = StaticLandmarks::from_json_file(&path).unwrap_err();
    assert!(matches!(err, FaceError::LandmarkFile { .. }));

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
