pub mod config;
pub mod covers;

// Re-export vision types for convenience
pub use facecover_vision::{
    FaceError, FaceRecord, LandmarkProvider, Landmarks, Pipeline, Point, RetouchParams,
    StaticLandmarks, SwapParams,
};
