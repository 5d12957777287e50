//! Face presence tracking across frames.
//!
//! The session is the only value carried from one frame to the next. With the
//! default configuration a single frame with or without a face flips the state,
//! matching the live camera screens; `acquire_after_frames` and
//! `lose_after_frames` add optional hysteresis.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::utils::History;

pub const DETECTION_LOG_LENGTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionState {
    NoFace,
    FaceDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionEvent {
    FaceAcquired,
    FaceLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Consecutive frames with a face needed before the face counts as acquired.
    pub acquire_after_frames: u32,
    /// Consecutive frames without a face needed before the face counts as lost.
    pub lose_after_frames: u32,
    pub log_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            acquire_after_frames: 1,
            lose_after_frames: 1,
            log_length: DETECTION_LOG_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub frame: u64,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DetectionSession {
    config: SessionConfig,
    state: DetectionState,
    // consecutive frames disagreeing with the current state
    streak: u32,
    frame: u64,
    log: History<LogEntry>,
}

impl Default for DetectionSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl DetectionSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: DetectionState::NoFace,
            streak: 0,
            frame: 0,
            log: History::new(config.log_length),
        }
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn is_face_detected(&self) -> bool {
        self.state == DetectionState::FaceDetected
    }

    pub fn frames_observed(&self) -> u64 {
        self.frame
    }

    pub fn log(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.log.iter()
    }

    pub fn status_text(&self) -> &'static str {
        match self.state {
            DetectionState::FaceDetected => "Face Detected",
            DetectionState::NoFace => "No Face",
        }
    }

    /// Starts a new detector callback. Log entries recorded from here on are
    /// stamped with the returned frame index.
    pub fn begin_frame(&mut self) -> u64 {
        self.frame += 1;
        self.frame
    }

    /// Records whether the current frame produced usable landmarks.
    ///
    /// Returns an event only on the frame where the state actually changes.
    pub fn observe(&mut self, face_present: bool) -> Option<SessionEvent> {
        let agrees = face_present == self.is_face_detected();
        if agrees {
            self.streak = 0;
            return None;
        }

        self.streak += 1;
        let needed = match self.state {
            DetectionState::NoFace => self.config.acquire_after_frames,
            DetectionState::FaceDetected => self.config.lose_after_frames,
        }
        .max(1);
        if self.streak < needed {
            return None;
        }

        self.streak = 0;
        let event = match self.state {
            DetectionState::NoFace => {
                self.state = DetectionState::FaceDetected;
                self.record("Face detected! Starting real-time tracking...");
                SessionEvent::FaceAcquired
            }
            DetectionState::FaceDetected => {
                self.state = DetectionState::NoFace;
                self.record("Face lost from view");
                SessionEvent::FaceLost
            }
        };
        info!(frame = self.frame, ?event, "detection state changed");
        Some(event)
    }

    pub fn record(&mut self, message: impl Into<String>) {
        self.log.push(LogEntry {
            frame: self.frame,
            message: message.into(),
        });
    }

    // camera torn down: back to no face, silently
    pub fn reset(&mut self) {
        self.state = DetectionState::NoFace;
        self.streak = 0;
    }
}
