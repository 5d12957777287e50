use std::collections::VecDeque;
use std::io::BufRead;
use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use crate::face::FaceDetectionResult;
use crate::face_detection::{DetectorError, FaceDetectionModel};

// one recorded callback: either parsed output or the reason it could not be read
type RecordedFrame = Result<FaceDetectionResult, DetectorError>;

/// Replays detector output captured as JSON lines, one callback per line.
///
/// Blank lines are skipped. A line that does not parse is kept and replayed as
/// a [`DetectorError::Malformed`] so the frame loop sees the fault where it
/// happened.
pub struct RecordedDetections {
    frames: VecDeque<RecordedFrame>,
}

impl RecordedDetections {
    pub fn from_reader<R: BufRead>(reader: R) -> crate::Result<Self> {
        let mut frames = VecDeque::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let frame = serde_json::from_str::<FaceDetectionResult>(line)
                .map_err(|err| DetectorError::Malformed(format!("line {}: {}", index + 1, err)));
            frames.push_back(frame);
        }
        debug!(frames = frames.len(), "loaded recorded detections");
        Ok(Self { frames })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn next_frame(&mut self) -> Option<RecordedFrame> {
        self.frames.pop_front()
    }
}

impl FaceDetectionModel for RecordedDetections {
    // running past the end of the recording reads as an empty callback
    fn run(&mut self, _image: &DynamicImage) -> Result<FaceDetectionResult, DetectorError> {
        self.next_frame()
            .unwrap_or_else(|| Ok(FaceDetectionResult::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::LandmarkName;

    const RECORDING: &str = r#"
{"faces": [{"bounds": {"origin": {"x": 0, "y": 0}, "size": {"width": 10, "height": 10}}, "landmarks": {"LEFT_EYE": {"x": 1, "y": 2}}}]}

{"faces": []}
{"faces": [{"bounds": "oops"}]}
"#;

    #[test]
    fn test_replays_lines_in_order() {
        let mut recorded = RecordedDetections::from_reader(RECORDING.as_bytes()).unwrap();
        assert_eq!(recorded.remaining(), 3);

        let image = DynamicImage::new_rgb8(1, 1);
        let first = recorded.run(&image).unwrap();
        let face = first.primary_face().unwrap();
        assert!(face.has_point(LandmarkName::LeftEye));

        assert!(recorded.run(&image).unwrap().faces.is_empty());
        assert!(matches!(recorded.run(&image), Err(DetectorError::Malformed(msg)) if msg.starts_with("line 5")));
        assert!(recorded.is_exhausted());
        assert!(recorded.run(&image).unwrap().faces.is_empty());
    }
}
