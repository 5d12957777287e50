pub mod recorded;

use image::DynamicImage;

use crate::face::FaceDetectionResult;

#[derive(Debug, Clone, PartialEq)]
pub enum DetectorError {
    /// The detector produced output that could not be interpreted.
    Malformed(String),
    /// The detection engine itself failed.
    Backend(String),
    /// The detection call panicked and was contained at the frame boundary.
    Panicked(String),
}

impl std::fmt::Display for DetectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorError::Malformed(msg) => write!(f, "malformed detector output: {}", msg),
            DetectorError::Backend(msg) => write!(f, "detector backend failed: {}", msg),
            DetectorError::Panicked(msg) => write!(f, "detector panicked: {}", msg),
        }
    }
}

impl std::error::Error for DetectorError {}

/// External face detector, called once per displayed frame.
pub trait FaceDetectionModel {
    fn run(&mut self, image: &DynamicImage) -> Result<FaceDetectionResult, DetectorError>;
}

impl<F> FaceDetectionModel for F
where
    F: FnMut(&DynamicImage) -> Result<FaceDetectionResult, DetectorError>,
{
    fn run(&mut self, image: &DynamicImage) -> Result<FaceDetectionResult, DetectorError> {
        self(image)
    }
}
