//! Per-frame driver: detector output in, primitive list out.
//!
//! Everything here runs synchronously inside one detection callback. The
//! stages are pure; only the [`DetectionSession`] survives between frames.

use std::panic::{self, AssertUnwindSafe};

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::OverlayConfig;
use crate::error::Error;
use crate::face::FaceDetectionResult;
use crate::face_detection::{DetectorError, FaceDetectionModel};
use crate::face_landmarks::{analyze_detection, FaceReadout, LandmarkNormalizer};
use crate::mesh::MeshSynthesizer;
use crate::overlay::{OverlayRenderer, Primitive};
use crate::scaling::{CoordinateScaler, RenderSize, ScaleError};
use crate::session::{DetectionSession, DetectionState, SessionEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub primitives: Vec<Primitive>,
    pub state: DetectionState,
    pub event: Option<SessionEvent>,
    pub readout: Option<FaceReadout>,
    /// Set when the frame was skipped because no scale could be computed.
    pub scale_error: Option<ScaleError>,
}

impl FrameOutput {
    fn skipped(state: DetectionState, err: ScaleError) -> Self {
        Self {
            primitives: Vec::new(),
            state,
            event: None,
            readout: None,
            scale_error: Some(err),
        }
    }
}

#[derive(Debug, Serialize)]
struct FrameSummary<'a> {
    state: DetectionState,
    primitives: &'a [Primitive],
}

pub struct FramePipeline {
    normalizer: LandmarkNormalizer,
    scaler: CoordinateScaler,
    synthesizer: MeshSynthesizer,
    renderer: OverlayRenderer,
    session: DetectionSession,
}

impl FramePipeline {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            normalizer: LandmarkNormalizer::new(),
            scaler: CoordinateScaler::new(config.detector_resolution),
            synthesizer: MeshSynthesizer::new(config.geometry, config.style.clone()),
            renderer: OverlayRenderer::new(config.style.clone()),
            session: DetectionSession::new(config.session),
        }
    }

    pub fn session(&self) -> &DetectionSession {
        &self.session
    }

    pub fn state(&self) -> DetectionState {
        self.session.state()
    }

    /// Computes the overlay for one detector callback.
    ///
    /// A detector error is always logged and recorded, then counts as "no face"
    /// for this frame. When the render surface cannot be scaled the frame is
    /// skipped and the session keeps its previous state.
    pub fn process(
        &mut self,
        detection: Result<FaceDetectionResult, DetectorError>,
        render: RenderSize,
    ) -> FrameOutput {
        let frame = self.session.begin_frame();

        let detection = match detection {
            Ok(detection) => Some(detection),
            Err(err) => {
                warn!(frame, "detection error: {err}");
                self.session.record(format!("Error: {err}"));
                None
            }
        };

        let scale = match self.scaler.scale_for(render) {
            Ok(scale) => scale,
            Err(err) => {
                debug!(frame, %err, width = render.width, height = render.height, "skipping frame");
                return FrameOutput::skipped(self.session.state(), err);
            }
        };

        let analysis = analyze_detection(detection.as_ref());
        debug!(
            frame,
            detected = analysis.detected,
            complete = analysis.complete,
            details = ?analysis.details,
            "{}",
            analysis.message
        );

        let face = detection.as_ref().and_then(FaceDetectionResult::primary_face);
        let landmarks = self.normalizer.normalize(face);
        let event = self.session.observe(landmarks.is_some());

        let (primitives, readout) = match (&landmarks, face) {
            (Some(landmarks), Some(face)) => {
                let mesh = self.synthesizer.synthesize(landmarks, scale);
                (self.renderer.render(&mesh), Some(FaceReadout::from_face(face)))
            }
            _ => (Vec::new(), None),
        };

        FrameOutput {
            primitives,
            state: self.session.state(),
            event,
            readout,
            scale_error: None,
        }
    }

    /// Runs the detector on `image` and processes its result. A panic inside
    /// the detector is contained and treated like any other detector error.
    pub fn process_image<D>(
        &mut self,
        detector: &mut D,
        image: &DynamicImage,
        render: RenderSize,
    ) -> FrameOutput
    where
        D: FaceDetectionModel + ?Sized,
    {
        let detection = panic::catch_unwind(AssertUnwindSafe(|| detector.run(image)))
            .unwrap_or_else(|payload| Err(DetectorError::Panicked(panic_message(payload.as_ref()))));
        self.process(detection, render)
    }

    // camera stopped; any in-flight output is simply dropped by the caller
    pub fn reset(&mut self) {
        self.session.reset();
    }
}

pub fn frame_summary_json(output: &FrameOutput) -> crate::Result<String> {
    let summary = FrameSummary {
        state: output.state,
        primitives: &output.primitives,
    };
    serde_json::to_string(&summary).map_err(Error::Serialize)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{Bounds, LandmarkName, RawLandmarkFrame};
    use crate::scaling::Resolution;

    fn identity_config() -> OverlayConfig {
        OverlayConfig {
            detector_resolution: Some(Resolution::new(480.0, 640.0)),
            ..OverlayConfig::default()
        }
    }

    fn render() -> RenderSize {
        Resolution::new(480.0, 640.0)
    }

    fn eyes_and_nose() -> FaceDetectionResult {
        FaceDetectionResult::single(
            RawLandmarkFrame::new(Bounds::new(50.0, 50.0, 200.0, 200.0))
                .with_landmark(LandmarkName::LeftEye, 100.0, 100.0)
                .with_landmark(LandmarkName::RightEye, 200.0, 100.0)
                .with_landmark(LandmarkName::NoseBase, 150.0, 160.0),
        )
    }

    fn has_line(primitives: &[Primitive], a: (f32, f32), b: (f32, f32)) -> bool {
        primitives.iter().any(|p| match *p {
            Primitive::Line { x1, y1, x2, y2, .. } => {
                ((x1, y1) == a && (x2, y2) == b) || ((x1, y1) == b && (x2, y2) == a)
            }
            _ => false,
        })
    }

    fn has_circle(primitives: &[Primitive], at: (f32, f32)) -> bool {
        primitives
            .iter()
            .any(|p| matches!(*p, Primitive::Circle { cx, cy, .. } if (cx, cy) == at))
    }

    #[test]
    fn test_zero_faces_yields_empty_list() {
        let mut pipeline = FramePipeline::new(&identity_config());
        let output = pipeline.process(Ok(FaceDetectionResult::empty()), render());
        assert!(output.primitives.is_empty());
        assert_eq!(output.state, DetectionState::NoFace);
        assert_eq!(output.event, None);
    }

    #[test]
    fn test_eyes_and_nose_scenario() {
        let mut pipeline = FramePipeline::new(&identity_config());
        let output = pipeline.process(Ok(eyes_and_nose()), render());

        for point in [(100.0, 100.0), (200.0, 100.0), (150.0, 160.0)] {
            assert!(has_circle(&output.primitives, point));
        }
        assert!(has_line(&output.primitives, (100.0, 100.0), (150.0, 160.0)));
        assert!(has_line(&output.primitives, (200.0, 100.0), (150.0, 160.0)));

        let mouth_style = identity_config().style.mouth_edges;
        assert!(!output.primitives.iter().any(|p| matches!(
            *p,
            Primitive::Line { stroke_color, .. } if stroke_color == mouth_style.color
        )));
        assert_eq!(output.event, Some(SessionEvent::FaceAcquired));
        assert!(output.readout.is_some());
    }

    #[test]
    fn test_degenerate_render_size_keeps_state() {
        let mut pipeline = FramePipeline::new(&identity_config());
        pipeline.process(Ok(eyes_and_nose()), render());
        assert_eq!(pipeline.state(), DetectionState::FaceDetected);

        let output = pipeline.process(Ok(FaceDetectionResult::empty()), Resolution::new(0.0, 0.0));
        assert!(output.primitives.is_empty());
        assert_eq!(output.scale_error, Some(ScaleError::ZeroRenderSurface));
        assert_eq!(output.state, DetectionState::FaceDetected);
        assert_eq!(pipeline.state(), DetectionState::FaceDetected);
        assert_eq!(output.event, None);
    }

    #[test]
    fn test_face_then_none_emits_one_acquisition() {
        let mut pipeline = FramePipeline::new(&identity_config());
        let first = pipeline.process(Ok(eyes_and_nose()), render());
        let second = pipeline.process(Ok(FaceDetectionResult::empty()), render());

        assert_eq!(first.event, Some(SessionEvent::FaceAcquired));
        assert_eq!(second.event, Some(SessionEvent::FaceLost));
        assert_eq!(second.state, DetectionState::NoFace);
        assert!(second.primitives.is_empty());
    }

    #[test]
    fn test_detector_error_counts_as_no_face() {
        let mut pipeline = FramePipeline::new(&identity_config());
        pipeline.process(Ok(eyes_and_nose()), render());

        let output = pipeline.process(
            Err(DetectorError::Backend("camera buffer lost".into())),
            render(),
        );
        assert!(output.primitives.is_empty());
        assert_eq!(output.event, Some(SessionEvent::FaceLost));

        let messages: Vec<_> = pipeline.session().log().map(|e| e.message.clone()).collect();
        assert!(messages
            .iter()
            .any(|m| m.contains("detector backend failed: camera buffer lost")));
    }

    #[test]
    fn test_detector_error_is_recorded_on_skipped_frame() {
        let mut pipeline = FramePipeline::new(&identity_config());
        pipeline.process(Ok(eyes_and_nose()), render());

        let output = pipeline.process(
            Err(DetectorError::Backend("boom".into())),
            Resolution::new(0.0, 0.0),
        );
        assert_eq!(output.scale_error, Some(ScaleError::ZeroRenderSurface));
        assert_eq!(output.event, None);
        assert_eq!(pipeline.state(), DetectionState::FaceDetected);

        let latest = pipeline.session().log().next().unwrap();
        assert_eq!(latest.message, "Error: detector backend failed: boom");
        assert_eq!(latest.frame, 2);
    }

    #[test]
    fn test_error_entries_carry_their_own_frame() {
        let mut pipeline = FramePipeline::new(&identity_config());
        pipeline.process(Err(DetectorError::Backend("x".into())), render());
        assert_eq!(pipeline.session().log().next().unwrap().frame, 1);
        pipeline.process(Err(DetectorError::Backend("y".into())), render());

        let stamps: Vec<_> = pipeline.session().log().map(|e| e.frame).collect();
        assert_eq!(stamps, vec![2, 1]);
        assert_eq!(pipeline.session().frames_observed(), 2);
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLog {
        type Writer = CapturedLog;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_frame_analysis_logs_details() {
        let captured = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(captured.clone())
            .finish();

        let mut detection = eyes_and_nose();
        detection.faces[0].roll_angle = 12.5;
        detection.faces[0].yaw_angle = -4.0;
        detection.faces[0].face_id = Some(7);

        tracing::subscriber::with_default(subscriber, || {
            let mut pipeline = FramePipeline::new(&identity_config());
            pipeline.process(Ok(detection), render());
        });

        let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("Face with complete landmarks detected"));
        assert!(text.contains("has_left_eye: true"));
        assert!(text.contains("roll_angle: 12.5"));
        assert!(text.contains("yaw_angle: -4.0"));
        assert!(text.contains("face_id: Some(7)"));
    }

    #[test]
    fn test_detector_panic_is_contained() {
        let mut pipeline = FramePipeline::new(&identity_config());
        let mut detector = |_: &DynamicImage| -> Result<FaceDetectionResult, DetectorError> {
            panic!("model exploded")
        };
        let image = DynamicImage::new_rgb8(4, 4);

        let output = pipeline.process_image(&mut detector, &image, render());
        assert!(output.primitives.is_empty());
        assert_eq!(output.state, DetectionState::NoFace);

        let mut working =
            |_: &DynamicImage| -> Result<FaceDetectionResult, DetectorError> { Ok(eyes_and_nose()) };
        let output = pipeline.process_image(&mut working, &image, render());
        assert_eq!(output.event, Some(SessionEvent::FaceAcquired));
    }

    #[test]
    fn test_output_is_deterministic() {
        let config = OverlayConfig {
            detector_resolution: Some(Resolution::new(480.0, 640.0)),
            ..OverlayConfig::default()
        };
        let run = || {
            let mut pipeline = FramePipeline::new(&config);
            pipeline
                .process(Ok(eyes_and_nose()), Resolution::new(1080.0, 1920.0))
                .primitives
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_summary_json_lists_primitives() {
        let mut pipeline = FramePipeline::new(&identity_config());
        let output = pipeline.process(Ok(eyes_and_nose()), render());
        let json = frame_summary_json(&output).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["state"], "FaceDetected");
        assert_eq!(
            value["primitives"].as_array().unwrap().len(),
            output.primitives.len()
        );
    }
}
