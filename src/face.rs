use std::collections::BTreeMap;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::scaling::ScaleFactors;

// named landmarks reported by the detector, in drawing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LandmarkName {
    LeftEye,
    RightEye,
    NoseBase,
    LeftMouth,
    RightMouth,
    BottomMouth,
    LeftCheek,
    RightCheek,
}

impl LandmarkName {
    pub const ALL: [LandmarkName; 8] = [
        LandmarkName::LeftEye,
        LandmarkName::RightEye,
        LandmarkName::NoseBase,
        LandmarkName::LeftMouth,
        LandmarkName::RightMouth,
        LandmarkName::BottomMouth,
        LandmarkName::LeftCheek,
        LandmarkName::RightCheek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LandmarkName::LeftEye => "LEFT_EYE",
            LandmarkName::RightEye => "RIGHT_EYE",
            LandmarkName::NoseBase => "NOSE_BASE",
            LandmarkName::LeftMouth => "LEFT_MOUTH",
            LandmarkName::RightMouth => "RIGHT_MOUTH",
            LandmarkName::BottomMouth => "BOTTOM_MOUTH",
            LandmarkName::LeftCheek => "LEFT_CHEEK",
            LandmarkName::RightCheek => "RIGHT_CHEEK",
        }
    }
}

impl std::fmt::Display for LandmarkName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn eye(&self) -> LandmarkName {
        match self {
            Side::Left => LandmarkName::LeftEye,
            Side::Right => LandmarkName::RightEye,
        }
    }

    pub fn mouth_corner(&self) -> LandmarkName {
        match self {
            Side::Left => LandmarkName::LeftMouth,
            Side::Right => LandmarkName::RightMouth,
        }
    }

    pub fn cheek(&self) -> LandmarkName {
        match self {
            Side::Left => LandmarkName::LeftCheek,
            Side::Right => LandmarkName::RightCheek,
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub x: f32,
    pub y: f32,
}

impl RawPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn to_point(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// Axis-aligned face rectangle, in whatever space its coordinates were taken from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub origin: RawPoint,
    pub size: Size,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: RawPoint::new(x, y),
            size: Size { width, height },
        }
    }

    pub fn is_valid(&self) -> bool {
        self.origin.is_finite()
            && self.size.width.is_finite()
            && self.size.height.is_finite()
            && self.size.width >= 0.0
            && self.size.height >= 0.0
    }

    /// Corners clockwise from the origin: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point2<f32>; 4] {
        let (x, y) = (self.origin.x, self.origin.y);
        let (w, h) = (self.size.width, self.size.height);
        [
            Point2::new(x, y),
            Point2::new(x + w, y),
            Point2::new(x + w, y + h),
            Point2::new(x, y + h),
        ]
    }

    pub fn scaled(&self, scale: ScaleFactors) -> Bounds {
        Bounds::new(
            self.origin.x * scale.sx(),
            self.origin.y * scale.sy(),
            self.size.width * scale.sx(),
            self.size.height * scale.sy(),
        )
    }

    pub fn to_tuple(&self) -> (f32, f32, f32, f32) {
        (self.origin.x, self.origin.y, self.size.width, self.size.height)
    }
}

// one detected face as delivered by the detector callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLandmarkFrame {
    pub bounds: Bounds,
    #[serde(default)]
    pub landmarks: BTreeMap<LandmarkName, Option<RawPoint>>,
    #[serde(default)]
    pub roll_angle: f32,
    #[serde(default)]
    pub yaw_angle: f32,
    #[serde(default)]
    pub smiling_probability: Option<f32>,
    #[serde(default)]
    pub left_eye_open_probability: Option<f32>,
    #[serde(default)]
    pub right_eye_open_probability: Option<f32>,
    #[serde(default, rename = "faceID")]
    pub face_id: Option<i64>,
}

impl RawLandmarkFrame {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            landmarks: BTreeMap::new(),
            roll_angle: 0.0,
            yaw_angle: 0.0,
            smiling_probability: None,
            left_eye_open_probability: None,
            right_eye_open_probability: None,
            face_id: None,
        }
    }

    pub fn with_landmark(mut self, name: LandmarkName, x: f32, y: f32) -> Self {
        self.landmarks.insert(name, Some(RawPoint::new(x, y)));
        self
    }

    // a key mapped to null and a missing key both read as absent
    pub fn get_point(&self, name: LandmarkName) -> Option<RawPoint> {
        self.landmarks.get(&name).copied().flatten()
    }

    pub fn has_point(&self, name: LandmarkName) -> bool {
        self.get_point(name).is_some()
    }
}

// everything the detector reported for one callback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceDetectionResult {
    #[serde(default)]
    pub faces: Vec<RawLandmarkFrame>,
}

impl FaceDetectionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(face: RawLandmarkFrame) -> Self {
        Self { faces: vec![face] }
    }

    pub fn primary_face(&self) -> Option<&RawLandmarkFrame> {
        self.faces.first()
    }
}
