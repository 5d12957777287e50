use std::collections::BTreeMap;

use nalgebra::Point2;
use serde::Serialize;

use crate::face::{Bounds, FaceDetectionResult, LandmarkName, RawLandmarkFrame};

// landmarks without which no mesh work is attempted
pub const REQUIRED_LANDMARKS: [LandmarkName; 3] = [
    LandmarkName::LeftEye,
    LandmarkName::RightEye,
    LandmarkName::NoseBase,
];

/// Landmarks of one face that survived validation. Every stored point is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalLandmarks {
    bounds: Option<Bounds>,
    points: BTreeMap<LandmarkName, Point2<f32>>,
}

impl CanonicalLandmarks {
    pub fn get_landmark(&self, name: LandmarkName) -> Option<Point2<f32>> {
        self.points.get(&name).copied()
    }

    pub fn get_landmarks(&self) -> impl Iterator<Item = (LandmarkName, Point2<f32>)> + '_ {
        self.points.iter().map(|(name, p)| (*name, *p))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn contains(&self, name: LandmarkName) -> bool {
        self.points.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LandmarkNormalizer;

impl LandmarkNormalizer {
    pub fn new() -> Self {
        LandmarkNormalizer
    }

    /// Filters a raw face down to its usable landmarks.
    ///
    /// Returns `None` when there is no face or when any of
    /// [`REQUIRED_LANDMARKS`] is missing or not finite. Other landmarks that are
    /// missing are simply left out.
    pub fn normalize(&self, face: Option<&RawLandmarkFrame>) -> Option<CanonicalLandmarks> {
        let face = face?;

        let points: BTreeMap<LandmarkName, Point2<f32>> = LandmarkName::ALL
            .iter()
            .filter_map(|&name| {
                face.get_point(name)
                    .filter(|p| p.is_finite())
                    .map(|p| (name, p.to_point()))
            })
            .collect();

        if !REQUIRED_LANDMARKS.iter().all(|name| points.contains_key(name)) {
            return None;
        }

        let bounds = Some(face.bounds).filter(Bounds::is_valid);

        Some(CanonicalLandmarks { bounds, points })
    }

    pub fn normalize_result(&self, result: &FaceDetectionResult) -> Option<CanonicalLandmarks> {
        self.normalize(result.primary_face())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionDetails {
    pub has_bounds: bool,
    pub has_left_eye: bool,
    pub has_right_eye: bool,
    pub has_nose: bool,
    pub face_id: Option<i64>,
    pub roll_angle: f32,
    pub yaw_angle: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionAnalysis {
    pub detected: bool,
    pub complete: bool,
    pub message: &'static str,
    pub details: Option<DetectionDetails>,
}

// summarizes a detector callback for diagnostics
pub fn analyze_detection(result: Option<&FaceDetectionResult>) -> DetectionAnalysis {
    let Some(result) = result else {
        return DetectionAnalysis {
            detected: false,
            complete: false,
            message: "No face data received!",
            details: None,
        };
    };

    let Some(face) = result.primary_face() else {
        return DetectionAnalysis {
            detected: false,
            complete: false,
            message: "No faces detected in frame!",
            details: None,
        };
    };

    let details = DetectionDetails {
        has_bounds: face.bounds.is_valid(),
        has_left_eye: face.has_point(LandmarkName::LeftEye),
        has_right_eye: face.has_point(LandmarkName::RightEye),
        has_nose: face.has_point(LandmarkName::NoseBase),
        face_id: face.face_id,
        roll_angle: face.roll_angle,
        yaw_angle: face.yaw_angle,
    };
    let complete =
        details.has_bounds && details.has_left_eye && details.has_right_eye && details.has_nose;

    DetectionAnalysis {
        detected: true,
        complete,
        message: if complete {
            "Face with complete landmarks detected"
        } else {
            "Face detected but missing some landmarks"
        },
        details: Some(details),
    }
}

/// Pose and classification values formatted for a status panel.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceReadout {
    pub roll_degrees: f32,
    pub yaw_degrees: f32,
    pub smile_percent: Option<u8>,
    pub left_eye_open_percent: Option<u8>,
    pub right_eye_open_percent: Option<u8>,
}

fn to_percent(probability: Option<f32>) -> Option<u8> {
    probability
        .filter(|p| p.is_finite())
        .map(|p| (p.clamp(0.0, 1.0) * 100.0).round() as u8)
}

impl FaceReadout {
    pub fn from_face(face: &RawLandmarkFrame) -> Self {
        Self {
            roll_degrees: face.roll_angle,
            yaw_degrees: face.yaw_angle,
            smile_percent: to_percent(face.smiling_probability),
            left_eye_open_percent: to_percent(face.left_eye_open_probability),
            right_eye_open_percent: to_percent(face.right_eye_open_probability),
        }
    }
}

impl std::fmt::Display for FaceReadout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Roll: {:.2}°", self.roll_degrees)?;
        write!(f, "Yaw: {:.2}°", self.yaw_degrees)?;
        let percentages = [
            ("Smile", self.smile_percent),
            ("Left Eye", self.left_eye_open_percent),
            ("Right Eye", self.right_eye_open_percent),
        ];
        for (label, value) in percentages {
            if let Some(value) = value {
                write!(f, "\n{}: {}%", label, value)?;
            }
        }
        Ok(())
    }
}
