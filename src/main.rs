use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facecover::covers::{self, CoverOutcome};
use facecover::{config, FaceError, Pipeline, RetouchParams, StaticLandmarks};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "facecover")]
#[command(version, about = "Face retouching and album-cover face swapping")]
struct Cli {
    /// Config file (defaults to the built-in path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Beautify every face in a photo
    Retouch {
        /// Input photo
        image: PathBuf,
        /// Landmark JSON for the photo
        #[arg(short, long)]
        landmarks: PathBuf,
        /// Output path
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        whitening: Option<f32>,
        #[arg(long)]
        smoothing: Option<f32>,
        #[arg(long)]
        bright_eyes: Option<f32>,
        #[arg(long)]
        red_lips: Option<f32>,
    },
    /// Put the face from one photo into another
    Swap {
        /// Image whose face is replaced
        template: PathBuf,
        #[arg(long)]
        template_landmarks: PathBuf,
        /// Image providing the face
        source: PathBuf,
        #[arg(long)]
        source_landmarks: PathBuf,
        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Generate every album cover of a theme
    Covers {
        /// Theme id, see `themes`
        theme: String,
        /// User photo
        image: PathBuf,
        #[arg(short, long)]
        landmarks: PathBuf,
    },
    /// List configured themes
    Themes,
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Retouch {
            image,
            landmarks,
            output,
            whitening,
            smoothing,
            bright_eyes,
            red_lips,
        } => {
            let params = RetouchParams {
                whitening: whitening.unwrap_or(cfg.retouch.whitening),
                smoothing: smoothing.unwrap_or(cfg.retouch.smoothing),
                bright_eyes: bright_eyes.unwrap_or(cfg.retouch.bright_eyes),
                red_lips: red_lips.unwrap_or(cfg.retouch.red_lips),
            };
            retouch(&image, &landmarks, &output, &params)
        }
        Commands::Swap {
            template,
            template_landmarks,
            source,
            source_landmarks,
            output,
        } => swap(
            &cfg,
            &template,
            &template_landmarks,
            &source,
            &source_landmarks,
            &output,
        ),
        Commands::Covers {
            theme,
            image,
            landmarks,
        } => generate(&cfg, &theme, &image, &landmarks),
        Commands::Themes => {
            for theme in &cfg.themes {
                println!("{:<10} {}", theme.id, theme.name);
            }
            Ok(())
        }
        Commands::Config => open_config(cli.config.as_deref()),
    }
}

fn retouch(image: &Path, landmarks: &Path, output: &Path, params: &RetouchParams) -> Result<()> {
    info!("Retouching {} with {:?}", image.display(), params);

    let img = Pipeline::<StaticLandmarks>::load_image(image)?;
    let provider = StaticLandmarks::from_json_file(landmarks)?;
    let mut pipeline = Pipeline::new(provider);

    let result = match pipeline.beautify(&img, params) {
        Ok(out) => out,
        Err(FaceError::NoFace) => {
            warn!("No face found, writing the photo unchanged");
            img
        }
        Err(e) => return Err(e).context("Retouch failed"),
    };

    result
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("✓ Saved {}", output.display());
    Ok(())
}

fn swap(
    cfg: &config::Config,
    template: &Path,
    template_landmarks: &Path,
    source: &Path,
    source_landmarks: &Path,
    output: &Path,
) -> Result<()> {
    info!("Swapping {} into {}", source.display(), template.display());

    let template_img = Pipeline::<StaticLandmarks>::load_image(template)?;
    let source_img = Pipeline::<StaticLandmarks>::load_image(source)?;
    let template_faces = StaticLandmarks::from_json_file(template_landmarks)?;
    let source_faces = StaticLandmarks::from_json_file(source_landmarks)?;

    let out = facecover_vision::swap_detected(
        &template_img,
        template_faces.faces(),
        &source_img,
        source_faces.faces(),
        &cfg.swap,
    )
    .context("Face swap failed")?;

    out.save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("✓ Saved {}", output.display());
    Ok(())
}

fn generate(cfg: &config::Config, theme: &str, image: &Path, landmarks: &Path) -> Result<()> {
    let outcomes = covers::generate_covers(cfg, theme, image, landmarks)?;
    if outcomes.is_empty() {
        anyhow::bail!("Theme {} has no usable templates", theme);
    }

    let fallbacks = outcomes
        .iter()
        .filter(|o| matches!(o, CoverOutcome::Fallback { .. }))
        .count();
    for outcome in &outcomes {
        println!("{}", outcome.path().display());
    }
    info!(
        "✓ {} cover(s), {} fallback(s)",
        outcomes.len() - fallbacks,
        fallbacks
    );
    Ok(())
}

fn open_config(path: Option<&Path>) -> Result<()> {
    let config_path = path.unwrap_or(&config::CONFIG_PATH);
    if !config_path.exists() {
        config::save_config(&config::Config::default(), Some(config_path))
            .context("Failed to write default config")?;
    }
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
