use crate::config::{VideoConfig, VideoMode};
use crate::evidence::codec::{self, ALERT_COLOR};
use crate::evidence::record::{Evidence, EvidenceKind, MediaType};
use crate::evidence::writer::EvidenceWriter;
use crate::prelude::{CycleReport, MonitorError, MonitorResult, SensorStream};
use crate::processing::classifier::VideoClassifier;
use crate::processing::debounce::{
    BottomDropTest, EntityId, EntityTracker, RunLengthDebouncer, Transition,
};
use crate::processing::sampler::BackgroundSampler;
use crate::sensor::adapter::{DetectionFilter, ObjectDetector, VideoSource};
use crate::sensor::detection::{BoundingBox, ClassCatalog, Detection, RawDetection};
use crate::sensor::sample::{SourceStream, VideoFrame};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of running one frame's detections through classifier and debouncer.
#[derive(Debug, Default)]
struct FrameEvaluation {
    candidates: usize,
    confirmed: Vec<BoundingBox>,
}

/// Camera -> detector -> classifier -> debounce -> evidence loop body.
pub struct VideoStream {
    config: VideoConfig,
    source: Box<dyn VideoSource>,
    detector: Box<dyn ObjectDetector>,
    catalog: ClassCatalog,
    classifier: VideoClassifier,
    filter: DetectionFilter,
    tracker: EntityTracker,
    bottom_drop: BottomDropTest,
    sampler: BackgroundSampler,
    writer: EvidenceWriter,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
    frames_captured: u64,
    started: bool,
}

impl VideoStream {
    pub fn new(
        config: VideoConfig,
        source: Box<dyn VideoSource>,
        detector: Box<dyn ObjectDetector>,
        metrics: Arc<MetricsRecorder>,
    ) -> MonitorResult<Self> {
        config.validate()?;
        let catalog = ClassCatalog::from_preset(config.effective_catalog());
        let threshold = config.effective_confidence_threshold();
        // Non-target classes must reach the debouncer so they can break a run.
        let filter = DetectionFilter {
            class_ids: catalog.ids(),
            confidence_floor: config.detector_confidence_floor.min(threshold),
        };
        let classifier = VideoClassifier::new(threshold, config.effective_target_classes());
        let tracker = EntityTracker::new(
            RunLengthDebouncer::new(config.effective_run_length(), config.cooldown_cycles),
            config.entity_idle_timeout_secs,
        );
        let sampler = BackgroundSampler::new(config.cadence()?);
        let writer = EvidenceWriter::new(config.evidence.clone());

        Ok(Self {
            bottom_drop: BottomDropTest::new(config.delta_threshold),
            config,
            source,
            detector,
            catalog,
            classifier,
            filter,
            tracker,
            sampler,
            writer,
            metrics,
            logger: LogManager::new(SourceStream::Video.as_str()),
            frames_captured: 0,
            started: false,
        })
    }

    pub fn tracker(&self) -> &EntityTracker {
        &self.tracker
    }

    pub fn writer(&self) -> &EvidenceWriter {
        &self.writer
    }

    fn evaluate(&mut self, frame: &VideoFrame, detections: Vec<RawDetection>) -> FrameEvaluation {
        let now = frame.captured_at;
        let mut evaluation = FrameEvaluation::default();

        for raw in detections {
            let detection = match Detection::from_raw(&raw, &self.catalog) {
                Ok(Some(detection)) => detection,
                Ok(None) => {
                    self.logger
                        .debug(&format!("Ignoring detection with unknown class {:?}", raw.class_id));
                    continue;
                }
                Err(err) => {
                    self.metrics.record_malformed();
                    self.logger.warn(&format!("Dropping detection: {}", err));
                    continue;
                }
            };

            let verdict = self.classifier.classify(&detection);
            let entity = EntityId::for_track(detection.track_id);
            let transition = match self.config.mode {
                VideoMode::ClassMatch => {
                    if verdict.is_candidate {
                        evaluation.candidates += 1;
                    }
                    self.tracker.observe(entity, verdict, now)
                }
                VideoMode::BottomDrop => {
                    if !verdict.is_candidate {
                        continue;
                    }
                    let (drop, transition) = self.tracker.observe_bottom(
                        entity,
                        &detection.bbox,
                        &self.bottom_drop,
                        now,
                    );
                    if drop.is_candidate {
                        evaluation.candidates += 1;
                    }
                    transition
                }
            };

            if transition == Transition::Confirmed {
                self.logger.record(&format!(
                    "Fall confirmed: {} {:.2} at {:?} ({:?})",
                    detection.class_name(),
                    detection.confidence,
                    detection.bbox,
                    entity
                ));
                evaluation.confirmed.push(detection.bbox);
            }
        }
        evaluation
    }

    fn persist(&self, kind: EvidenceKind, frame: &VideoFrame) -> Option<PathBuf> {
        let payload = match codec::encode_jpeg(frame, self.config.jpeg_quality) {
            Ok(payload) => payload,
            Err(err) => {
                self.metrics.record_persistence_failure();
                self.logger.error(&format!("Dropping {} evidence: {}", kind.as_str(), err));
                return None;
            }
        };
        let evidence = Evidence::new(
            kind,
            MediaType::Jpeg,
            payload,
            frame.captured_at,
            SourceStream::Video,
        );
        match self.writer.persist(&evidence) {
            Ok(path) => {
                self.logger
                    .record(&format!("Saved {} evidence {}", kind.as_str(), path.display()));
                Some(path)
            }
            Err(err) => {
                self.metrics.record_persistence_failure();
                self.logger.error(&format!("Dropping {} evidence: {}", kind.as_str(), err));
                None
            }
        }
    }
}

impl SensorStream for VideoStream {
    fn name(&self) -> &'static str {
        SourceStream::Video.as_str()
    }

    fn initialize(&mut self) -> MonitorResult<()> {
        self.writer.prepare()?;
        self.source.start()?;
        self.started = true;
        self.logger.record(&format!(
            "Camera started ({:?} mode, threshold {:.2}, run length {})",
            self.config.mode,
            self.classifier.confidence_threshold(),
            self.config.effective_run_length()
        ));
        Ok(())
    }

    fn run_cycle(&mut self) -> MonitorResult<CycleReport> {
        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(MonitorError::SourceExhausted) => return Err(MonitorError::SourceExhausted),
            Err(err) => {
                self.metrics.record_capture_failure();
                return Err(err);
            }
        };
        self.frames_captured += 1;
        if self.frames_captured % self.config.frame_skip as u64 != 0 {
            return Ok(CycleReport::skipped());
        }
        if let Err(err) = frame.validate() {
            self.metrics.record_capture_failure();
            return Err(err);
        }
        self.metrics.record_cycle();

        let detections = match self.detector.detect(&frame, &self.filter) {
            Ok(detections) => detections,
            Err(err) => {
                self.logger.warn(&format!("Detector failed, treating frame as empty: {}", err));
                Vec::new()
            }
        };
        self.logger
            .debug(&format!("Frame {}: {} detections", self.frames_captured, detections.len()));

        let evaluation = self.evaluate(&frame, detections);
        self.metrics.record_candidates(evaluation.candidates);
        let expired = self.tracker.expire(frame.captured_at);
        if expired > 0 {
            self.logger.debug(&format!("Expired {} idle entities", expired));
        }

        let mut report = CycleReport {
            candidates: evaluation.candidates,
            event_fired: !evaluation.confirmed.is_empty(),
            ..Default::default()
        };

        if report.event_fired {
            self.metrics.record_event();
            let mut annotated = frame.clone();
            if self.config.annotate {
                for bbox in &evaluation.confirmed {
                    codec::annotate(&mut annotated, bbox, ALERT_COLOR, 2);
                }
            }
            report.evidence.extend(self.persist(EvidenceKind::Event, &annotated));
        }

        if self.sampler.tick(frame.captured_at, report.event_fired) {
            if let Some(path) = self.persist(EvidenceKind::Background, &frame) {
                self.metrics.record_background();
                report.background_written = true;
                report.evidence.push(path);
            }
        }

        Ok(report)
    }

    fn cleanup(&mut self) {
        if self.started {
            self.source.stop();
            self.started = false;
            self.logger.record("Camera released");
        }
    }
}
