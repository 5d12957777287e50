use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::mesh::MeshGeometry;
use crate::overlay::OverlayStyle;
use crate::scaling::Resolution;
use crate::session::SessionConfig;

/// Detector input size used by the live camera screens (portrait 480x640).
pub const DEFAULT_DETECTOR_RESOLUTION: Resolution = Resolution::new(480.0, 640.0);

/// Everything the frame pipeline needs, loadable from a JSON file.
///
/// Missing fields fall back to their defaults. `detector_resolution: null`
/// leaves the resolution unset, in which case every frame is skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub detector_resolution: Option<Resolution>,
    pub geometry: MeshGeometry,
    pub style: OverlayStyle,
    pub session: SessionConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            detector_resolution: Some(DEFAULT_DETECTOR_RESOLUTION),
            geometry: MeshGeometry::default(),
            style: OverlayStyle::default(),
            session: SessionConfig::default(),
        }
    }
}

impl OverlayConfig {
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(Error::Config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
