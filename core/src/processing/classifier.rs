use crate::math::stats::StatsHelper;
use crate::sensor::detection::{Detection, DetectionClass};

/// Per-sample decision before debouncing. `strength` is the detection
/// confidence, the loudness in dB, or the bottom-edge delta, depending on the
/// producer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub is_candidate: bool,
    pub strength: f32,
}

impl Verdict {
    pub fn candidate(strength: f32) -> Self {
        Self {
            is_candidate: true,
            strength,
        }
    }

    pub fn rejected(strength: f32) -> Self {
        Self {
            is_candidate: false,
            strength,
        }
    }
}

/// Loudness of one audio block, derived from its peak amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessReading {
    pub peak: u16,
    pub db: f32,
}

/// Confidence/class gate for video detections.
#[derive(Debug, Clone)]
pub struct VideoClassifier {
    confidence_threshold: f32,
    target_classes: Vec<DetectionClass>,
}

impl VideoClassifier {
    /// An empty `target_classes` accepts every class.
    pub fn new(confidence_threshold: f32, target_classes: Vec<DetectionClass>) -> Self {
        Self {
            confidence_threshold,
            target_classes,
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn classify(&self, detection: &Detection) -> Verdict {
        let class_matches =
            self.target_classes.is_empty() || self.target_classes.contains(&detection.class);
        if class_matches && detection.confidence > self.confidence_threshold {
            Verdict::candidate(detection.confidence)
        } else {
            Verdict::rejected(detection.confidence)
        }
    }
}

/// Peak-amplitude loudness gate for audio blocks.
#[derive(Debug, Clone)]
pub struct LoudnessClassifier {
    threshold_db: f32,
    threshold_amplitude: f32,
}

impl LoudnessClassifier {
    pub fn new(threshold_db: f32) -> Self {
        Self {
            threshold_db,
            threshold_amplitude: StatsHelper::db_to_amplitude(threshold_db),
        }
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    pub fn reading(&self, samples: &[i16]) -> LoudnessReading {
        let peak = StatsHelper::peak_amplitude(samples);
        LoudnessReading {
            peak,
            db: StatsHelper::amplitude_to_db(peak as f32),
        }
    }

    pub fn classify(&self, samples: &[i16]) -> Verdict {
        self.verdict(&self.reading(samples))
    }

    pub fn verdict(&self, reading: &LoudnessReading) -> Verdict {
        if reading.peak as f32 > self.threshold_amplitude {
            Verdict::candidate(reading.db)
        } else {
            Verdict::rejected(reading.db)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::detection::BoundingBox;

    fn detection(class: DetectionClass, confidence: f32) -> Detection {
        Detection {
            class_id: 0,
            class,
            confidence,
            bbox: BoundingBox::new(0, 0, 10, 10),
            track_id: None,
        }
    }

    #[test]
    fn video_candidate_requires_class_and_confidence() {
        let classifier = VideoClassifier::new(0.8, vec![DetectionClass::Fall]);
        assert!(classifier.classify(&detection(DetectionClass::Fall, 0.95)).is_candidate);
        assert!(!classifier.classify(&detection(DetectionClass::Fall, 0.8)).is_candidate);
        assert!(!classifier.classify(&detection(DetectionClass::NotFall, 0.99)).is_candidate);
    }

    #[test]
    fn video_strength_is_confidence() {
        let classifier = VideoClassifier::new(0.5, vec![]);
        let verdict = classifier.classify(&detection(DetectionClass::Child, 0.6));
        assert!(verdict.is_candidate);
        assert_eq!(verdict.strength, 0.6);
    }

    #[test]
    fn classification_is_repeatable() {
        let classifier = VideoClassifier::new(0.8, vec![DetectionClass::Fall]);
        let sample = detection(DetectionClass::Fall, 0.9);
        assert_eq!(classifier.classify(&sample), classifier.classify(&sample));

        let loudness = LoudnessClassifier::new(60.0);
        let block = [10, -2000, 30];
        assert_eq!(loudness.classify(&block), loudness.classify(&block));
    }

    #[test]
    fn loudness_threshold_compares_peak_amplitude() {
        // 60 dB corresponds to an amplitude of 1000.
        let classifier = LoudnessClassifier::new(60.0);
        assert!(!classifier.classify(&[0, 999, -998]).is_candidate);
        let verdict = classifier.classify(&[0, -1001, 20]);
        assert!(verdict.is_candidate);
        assert!((verdict.strength - 60.0).abs() < 0.01);
    }

    #[test]
    fn silence_reads_negative_infinity() {
        let classifier = LoudnessClassifier::new(60.0);
        let reading = classifier.reading(&[0, 0, 0]);
        assert_eq!(reading.peak, 0);
        assert_eq!(reading.db, f32::NEG_INFINITY);
    }
}
