use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use vigilcore::prelude::MonitorResult;
use vigilcore::sensor::{DetectionFilter, ObjectDetector, RawDetection, VideoFrame};

/// Per-frame detections replayed in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionScript {
    pub frames: Vec<Vec<RawDetection>>,
    /// Start over after the last frame instead of reporting nothing.
    pub repeat: bool,
}

/// Detector that replays a [`DetectionScript`].
pub struct ScriptedDetector {
    script: DetectionScript,
    cursor: usize,
}

impl ScriptedDetector {
    pub fn new(script: DetectionScript) -> Self {
        Self { script, cursor: 0 }
    }

    pub fn empty() -> Self {
        Self::new(DetectionScript::default())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading detection script {}", path.display()))?;
        let script: DetectionScript = serde_json::from_str(&contents)
            .with_context(|| format!("parsing detection script {}", path.display()))?;
        log::info!(
            "Loaded {} scripted frames from {}",
            script.frames.len(),
            path.display()
        );
        Ok(Self::new(script))
    }

    fn next_scripted(&mut self) -> Vec<RawDetection> {
        if self.script.frames.is_empty() {
            return Vec::new();
        }
        if self.cursor >= self.script.frames.len() {
            if !self.script.repeat {
                return Vec::new();
            }
            self.cursor = 0;
        }
        let frame = self.script.frames[self.cursor].clone();
        self.cursor += 1;
        frame
    }
}

impl ObjectDetector for ScriptedDetector {
    fn detect(
        &mut self,
        _frame: &VideoFrame,
        filter: &DetectionFilter,
    ) -> MonitorResult<Vec<RawDetection>> {
        // Incomplete entries pass through so the stream sees them as malformed.
        Ok(self
            .next_scripted()
            .into_iter()
            .filter(|raw| {
                let class_ok = match raw.class_id {
                    Some(id) => filter.class_ids.is_empty() || filter.class_ids.contains(&id),
                    None => true,
                };
                let confidence_ok = raw
                    .confidence
                    .map_or(true, |confidence| confidence >= filter.confidence_floor);
                class_ok && confidence_ok
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn frame() -> VideoFrame {
        VideoFrame::new(2, 2, 1, vec![0; 4], Local::now())
    }

    fn open_filter() -> DetectionFilter {
        DetectionFilter {
            class_ids: Vec::new(),
            confidence_floor: 0.0,
        }
    }

    #[test]
    fn loads_script_from_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"frames": [[{{"class_id": 0, "confidence": 0.9, "bbox": [1, 2, 3, 4]}}], []]}}"#
        )
        .unwrap();

        let mut detector = ScriptedDetector::load(file.path()).unwrap();
        let first = detector.detect(&frame(), &open_filter()).unwrap();
        assert_eq!(first, vec![RawDetection::new(0, 0.9, [1, 2, 3, 4])]);
        assert!(detector.detect(&frame(), &open_filter()).unwrap().is_empty());
        assert!(detector.detect(&frame(), &open_filter()).unwrap().is_empty());
    }

    #[test]
    fn repeat_wraps_around() {
        let script = DetectionScript {
            frames: vec![vec![RawDetection::new(1, 0.7, [0, 0, 1, 1])]],
            repeat: true,
        };
        let mut detector = ScriptedDetector::new(script);
        for _ in 0..3 {
            assert_eq!(detector.detect(&frame(), &open_filter()).unwrap().len(), 1);
        }
    }

    #[test]
    fn filter_drops_other_classes_and_weak_scores() {
        let malformed = RawDetection {
            class_id: Some(0),
            ..Default::default()
        };
        let script = DetectionScript {
            frames: vec![vec![
                RawDetection::new(0, 0.9, [0, 0, 1, 1]),
                RawDetection::new(0, 0.2, [0, 0, 1, 1]),
                RawDetection::new(3, 0.9, [0, 0, 1, 1]),
                malformed.clone(),
            ]],
            repeat: false,
        };
        let filter = DetectionFilter {
            class_ids: vec![0],
            confidence_floor: 0.5,
        };
        let kept = ScriptedDetector::new(script).detect(&frame(), &filter).unwrap();
        assert_eq!(kept, vec![RawDetection::new(0, 0.9, [0, 0, 1, 1]), malformed]);
    }

    #[test]
    fn missing_script_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ScriptedDetector::load(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn bundled_demo_script_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/fall_script.json");
        let mut detector = ScriptedDetector::load(&path).unwrap();
        assert!(detector.detect(&frame(), &open_filter()).unwrap().is_empty());
        assert_eq!(detector.detect(&frame(), &open_filter()).unwrap().len(), 1);
    }
}
