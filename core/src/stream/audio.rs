use crate::config::AudioConfig;
use crate::evidence::codec;
use crate::evidence::dispatch::{DispatchWorker, Dispatcher};
use crate::evidence::record::{Evidence, EvidenceKind, MediaType};
use crate::evidence::writer::EvidenceWriter;
use crate::math::filter::BandPass;
use crate::prelude::{CycleReport, MonitorError, MonitorResult, SensorStream};
use crate::processing::classifier::LoudnessClassifier;
use crate::processing::debounce::{EntityId, EntityTracker, RunLengthDebouncer, Transition};
use crate::processing::sampler::BackgroundSampler;
use crate::sensor::adapter::AudioSource;
use crate::sensor::sample::{AudioBlock, SourceStream};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

/// Channels are permanent entities, so their states never expire in practice.
const CHANNEL_IDLE_TIMEOUT_SECS: f64 = f64::MAX;

/// Microphone -> loudness gate -> debounce -> record, persist, dispatch.
pub struct AudioStream {
    config: AudioConfig,
    source: Box<dyn AudioSource>,
    classifier: LoudnessClassifier,
    tracker: EntityTracker,
    sampler: BackgroundSampler,
    writer: EvidenceWriter,
    filter: Option<BandPass>,
    dispatcher: Option<Box<dyn Dispatcher>>,
    worker: Option<DispatchWorker>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
    started: bool,
}

impl AudioStream {
    pub fn new(
        config: AudioConfig,
        source: Box<dyn AudioSource>,
        dispatcher: Option<Box<dyn Dispatcher>>,
        metrics: Arc<MetricsRecorder>,
    ) -> MonitorResult<Self> {
        config.validate()?;
        let filter = config
            .bandpass
            .map(|band| BandPass::new(band.low_hz, band.high_hz, config.sample_rate));
        Ok(Self {
            classifier: LoudnessClassifier::new(config.loudness_threshold_db),
            tracker: EntityTracker::new(
                RunLengthDebouncer::new(config.required_run_length, config.cooldown_cycles),
                CHANNEL_IDLE_TIMEOUT_SECS,
            ),
            sampler: BackgroundSampler::new(config.cadence()?),
            writer: EvidenceWriter::new(config.evidence.clone()),
            filter,
            config,
            source,
            dispatcher,
            worker: None,
            metrics,
            logger: LogManager::new(SourceStream::Audio.as_str()),
            started: false,
        })
    }

    pub fn writer(&self) -> &EvidenceWriter {
        &self.writer
    }

    /// Feeds every channel of `block` to its debouncer; returns the candidate
    /// count and the loudest confirming level, if any channel confirmed.
    fn evaluate(&mut self, block: &AudioBlock) -> (usize, Option<f32>) {
        let mut candidates = 0;
        let mut trigger: Option<f32> = None;

        for channel in 0..block.channels.max(1) {
            let mut samples = block.channel(channel);
            if let Some(filter) = self.filter.as_mut() {
                samples = filter.apply(&samples);
            }
            let reading = self.classifier.reading(&samples);
            if reading.peak > 0 {
                self.logger.debug(&format!(
                    "Current level: {:.2} dB (channel {})",
                    reading.db, channel
                ));
            }

            let verdict = self.classifier.verdict(&reading);
            if verdict.is_candidate {
                candidates += 1;
            }
            let transition =
                self.tracker
                    .observe(EntityId::Channel(channel), verdict, block.captured_at);
            if transition == Transition::Confirmed {
                trigger = Some(trigger.map_or(reading.db, |db: f32| db.max(reading.db)));
            }
        }
        (candidates, trigger)
    }

    /// Blocking fixed-duration recording, persisted as event evidence and
    /// queued for dispatch.
    fn record_clip(&mut self, triggered_at: DateTime<Local>) -> Option<PathBuf> {
        let duration = self.config.recording_duration();
        self.logger
            .record(&format!("Recording {:.1}s clip", duration.as_secs_f32()));
        let clip = match self.source.record_for(duration) {
            Ok(clip) => clip,
            Err(err) => {
                self.metrics.record_capture_failure();
                self.logger.error(&format!("Recording failed: {}", err));
                return None;
            }
        };

        let path = self.persist(EvidenceKind::Event, &clip, triggered_at)?;
        // A full upload queue only costs the forward; the clip stays on disk.
        if let Some(worker) = &self.worker {
            worker.submit(path.clone());
        }
        Some(path)
    }

    fn persist(
        &self,
        kind: EvidenceKind,
        block: &AudioBlock,
        captured_at: DateTime<Local>,
    ) -> Option<PathBuf> {
        let result = codec::encode_wav(block).and_then(|payload| {
            self.writer.persist(&Evidence::new(
                kind,
                MediaType::Wav,
                payload,
                captured_at,
                SourceStream::Audio,
            ))
        });
        match result {
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

impl SensorStream for AudioStream {
    fn name(&self) -> &'static str {
        SourceStream::Audio.as_str()
    }

    fn initialize(&mut self) -> MonitorResult<()> {
        self.writer.prepare()?;
        self.source.start()?;
        self.started = true;
        if let Some(dispatcher) = self.dispatcher.take() {
            self.worker = Some(DispatchWorker::spawn(
                dispatcher,
                self.metrics.clone(),
                self.logger.clone(),
            )?);
        }
        self.logger.record(&format!(
            "Microphone started ({} Hz, {} ch, threshold {:.1} dB)",
            self.config.sample_rate,
            self.config.channels,
            self.classifier.threshold_db()
        ));
        Ok(())
    }

    fn run_cycle(&mut self) -> MonitorResult<CycleReport> {
        let read = match self.source.read_block(self.config.block_frames()) {
            Ok(read) => read,
            Err(MonitorError::SourceExhausted) => return Err(MonitorError::SourceExhausted),
            Err(err) => {
                self.metrics.record_capture_failure();
                return Err(err);
            }
        };
        if read.overflowed || read.block.is_empty() {
            self.metrics.record_capture_failure();
            return Err(MonitorError::CaptureFailure(if read.overflowed {
                "audio buffer overflow".into()
            } else {
                "empty audio block".into()
            }));
        }
        self.metrics.record_cycle();

        let block = read.block;
        let (candidates, trigger) = self.evaluate(&block);
        self.metrics.record_candidates(candidates);

        let mut report = CycleReport {
            candidates,
            event_fired: trigger.is_some(),
            ..Default::default()
        };

        if let Some(db) = trigger {
            self.metrics.record_event();
            self.logger
                .record(&format!("Suspicious sound detected at {:.2} dB", db));
            report.evidence.extend(self.record_clip(block.captured_at));
            // Samples heard before the recording no longer count towards a new trigger.
            self.tracker.clear();
        }

        if self.sampler.tick(block.captured_at, report.event_fired) {
            if let Some(path) = self.persist(EvidenceKind::Background, &block, block.captured_at) {
                self.metrics.record_background();
                report.background_written = true;
                report.evidence.push(path);
            }
        }

        let pause = self.config.pause_between_blocks();
        if !pause.is_zero() {
            thread::sleep(pause);
        }
        Ok(report)
    }

    fn cleanup(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.finish();
        }
        if self.started {
            self.source.stop();
            self.started = false;
            self.logger.record("Microphone released");
        }
    }
}
