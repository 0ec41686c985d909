use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaceError {
    #[error("cannot read image {path}: {source}")]
    UnreadableImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no face detected")]
    NoFace,

    #[error("expected exactly one face in {role} image, found {count}")]
    AmbiguousFaceCount { role: &'static str, count: usize },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("expected 68 landmarks, got {0}")]
    LandmarkCount(usize),

    #[error("{name} must be within [0, 100], got {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    #[error("cannot parse landmark file {path}: {source}")]
    LandmarkFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FaceError>;
