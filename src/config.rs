use anyhow::{Context, Result};
use facecover_vision::{RetouchParams, SwapParams};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACECOVER_CONFIG_PATH").unwrap_or("resources/config.toml"))
});

pub static RESOURCE_PREFIX: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACECOVER_RESOURCE_PREFIX").unwrap_or("resources"))
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default intensities for `retouch` when none are given.
    pub retouch: RetouchParams,
    pub swap: SwapParams,
    pub covers: CoverSettings,
    pub themes: Vec<Theme>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverSettings {
    pub output_dir: PathBuf,
}

/// An artist theme: the album-cover templates a user face is swapped into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub name: String,
    pub templates: Vec<TemplateAsset>,
}

/// A template image and the landmark file computed for it offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateAsset {
    pub image: PathBuf,
    pub landmarks: PathBuf,
}

impl Theme {
    /// Four numbered templates under `templates/<id>/`; the first one may use
    /// a different file extension.
    fn standard(id: &str, name: &str, first_ext: &str) -> Self {
        let dir = RESOURCE_PREFIX.join("templates").join(id);
        let templates = (1..=4)
            .map(|n| {
                let ext = if n == 1 { first_ext } else { "jpg" };
                TemplateAsset {
                    image: dir.join(format!("{n}.{ext}")),
                    landmarks: dir.join(format!("{n}.json")),
                }
            })
            .collect();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            templates,
        }
    }
}

impl Default for CoverSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("temp"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retouch: RetouchParams::default(),
            swap: SwapParams::default(),
            covers: CoverSettings::default(),
            themes: vec![
                Theme::standard("adam", "Adam Lambert", "jpg"),
                Theme::standard("angela", "Angela Chang", "jpg"),
                Theme::standard("faye", "Faye Wong", "png"),
                Theme::standard("eason", "Eason Chan", "jpg"),
                Theme::standard("michael", "Zheng Jun", "jpg"),
                Theme::standard("mj", "Michael Jackson", "jpg"),
                Theme::standard("gem", "G.E.M.", "jpg"),
                Theme::standard("vae", "Vae Xu", "png"),
            ],
        }
    }
}

impl Config {
    pub fn theme(&self, id: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.id == id)
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.retouch
        .validate()
        .with_context(|| format!("invalid retouch defaults in {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
