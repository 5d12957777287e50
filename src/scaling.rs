//! Mapping from detector-frame coordinates onto the render surface.
//!
//! The mapping is a per-axis scale with no aspect correction: when the render
//! surface and the detector frame have different aspect ratios the overlay is
//! stretched along one axis rather than letterboxed.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Width and height of a coordinate space, in that space's own units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: f32,
    pub height: f32,
}

impl Resolution {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Render surface measured by the layout collaborator.
pub type RenderSize = Resolution;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleError {
    ZeroRenderSurface,
    InvalidRenderSurface,
    DetectorResolutionUnset,
}

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::ZeroRenderSurface => write!(f, "render surface has a zero dimension"),
            ScaleError::InvalidRenderSurface => {
                write!(f, "render surface dimensions are negative or not finite")
            }
            ScaleError::DetectorResolutionUnset => {
                write!(f, "detector resolution is unset or not positive")
            }
        }
    }
}

impl std::error::Error for ScaleError {}

/// Per-axis scale. Both factors are finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    sx: f32,
    sy: f32,
}

impl ScaleFactors {
    pub fn new(sx: f32, sy: f32) -> Option<Self> {
        if sx.is_finite() && sy.is_finite() && sx > 0.0 && sy > 0.0 {
            Some(Self { sx, sy })
        } else {
            None
        }
    }

    pub fn identity() -> Self {
        Self { sx: 1.0, sy: 1.0 }
    }

    pub fn sx(&self) -> f32 {
        self.sx
    }

    pub fn sy(&self) -> f32 {
        self.sy
    }

    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        Point2::new(p.x * self.sx, p.y * self.sy)
    }

    // offsets are authored in detector pixels and scale like positions
    pub fn apply_offset(&self, dx: f32, dy: f32) -> Vector2<f32> {
        Vector2::new(dx * self.sx, dy * self.sy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateScaler {
    detector_resolution: Option<Resolution>,
}

impl CoordinateScaler {
    pub fn new(detector_resolution: Option<Resolution>) -> Self {
        Self {
            detector_resolution,
        }
    }

    pub fn detector_resolution(&self) -> Option<Resolution> {
        self.detector_resolution
    }

    pub fn scale_for(&self, render: RenderSize) -> Result<ScaleFactors, ScaleError> {
        let detector = self
            .detector_resolution
            .filter(Resolution::is_usable)
            .ok_or(ScaleError::DetectorResolutionUnset)?;

        if render.width == 0.0 || render.height == 0.0 {
            return Err(ScaleError::ZeroRenderSurface);
        }
        if !render.is_usable() {
            return Err(ScaleError::InvalidRenderSurface);
        }

        ScaleFactors::new(render.width / detector.width, render.height / detector.height)
            .ok_or(ScaleError::InvalidRenderSurface)
    }
}
