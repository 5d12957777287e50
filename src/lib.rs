pub mod config;
pub mod error;
pub mod face;
pub mod face_detection;
pub mod face_landmarks;
pub mod mesh;
pub mod overlay;
pub mod pipeline;
pub mod raster;
pub mod scaling;
pub mod session;
pub mod utils;

pub use config::OverlayConfig;
pub use error::{Error, Result};
pub use pipeline::{FrameOutput, FramePipeline};
