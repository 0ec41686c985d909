pub mod align;
pub mod error;
pub mod face;
pub mod filter;
pub mod forehead;
pub mod landmarks;
pub mod mask;
pub mod pipeline;
pub mod retouch;
pub mod swap;

// Re-export commonly used types
pub use align::SimilarityTransform;
pub use error::{FaceError, Result};
pub use face::{FaceRecord, RegionMasks};
pub use landmarks::{BoundingBox, DetectedFace, LandmarkProvider, Landmarks, Point, StaticLandmarks};
pub use mask::{build_mask, Mask};
pub use pipeline::Pipeline;
pub use retouch::{retouch, RetouchParams};
pub use swap::{swap, swap_detected, SwapParams};
