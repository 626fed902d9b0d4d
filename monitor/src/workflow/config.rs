use crate::generator::camera::CameraConfig;
use crate::generator::microphone::MicrophoneConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use vigilcore::config::{AudioConfig, VideoConfig, VideoMode};
use vigilcore::sensor::DetectionClass;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Prefix applied to every relative evidence directory.
    pub evidence_root: Option<PathBuf>,
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub camera: CameraConfig,
    pub microphone: MicrophoneConfig,
}

/// Values supplied on the command line or through `VIGIL_*` variables.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub mode: Option<VideoMode>,
    pub confidence_threshold: Option<f32>,
    pub target_classes: Option<Vec<DetectionClass>>,
    pub required_run_length: Option<u32>,
    pub delta_threshold: Option<f32>,
    pub loudness_threshold_db: Option<f32>,
    pub background_interval_frames: Option<u64>,
    pub background_interval_secs: Option<f64>,
    pub recording_duration_secs: Option<f32>,
    pub endpoint_url: Option<String>,
    pub evidence_root: Option<PathBuf>,
    pub disable_video: bool,
    pub disable_audio: bool,
    pub fast: bool,
    pub seed: Option<u64>,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading monitor config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing monitor config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        let video = &mut self.video;
        if let Some(mode) = overrides.mode {
            video.mode = mode;
        }
        if overrides.confidence_threshold.is_some() {
            video.confidence_threshold = overrides.confidence_threshold;
        }
        if overrides.target_classes.is_some() {
            video.target_classes = overrides.target_classes.clone();
        }
        if let Some(run_length) = overrides.required_run_length {
            video.required_run_length = Some(run_length);
        }
        if let Some(delta) = overrides.delta_threshold {
            video.delta_threshold = delta;
        }
        // Either interval on the command line replaces both from the file.
        if overrides.background_interval_frames.is_some()
            || overrides.background_interval_secs.is_some()
        {
            video.background_interval_frames = overrides.background_interval_frames;
            video.background_interval_secs = overrides.background_interval_secs;
        }

        let audio = &mut self.audio;
        if let Some(db) = overrides.loudness_threshold_db {
            audio.loudness_threshold_db = db;
        }
        if let Some(secs) = overrides.recording_duration_secs {
            audio.recording_duration_secs = secs;
        }
        if overrides.endpoint_url.is_some() {
            audio.endpoint_url = overrides.endpoint_url.clone();
        }

        if overrides.evidence_root.is_some() {
            self.evidence_root = overrides.evidence_root.clone();
        }
        if overrides.disable_video {
            self.video.enabled = false;
        }
        if overrides.disable_audio {
            self.audio.enabled = false;
        }
        if overrides.fast {
            self.camera.fps = 0.0;
            self.microphone.realtime = false;
            self.audio.pause_between_blocks_ms = 0;
        }
        if let Some(seed) = overrides.seed {
            self.camera.seed = seed;
            self.microphone.seed = seed;
        }
    }

    /// Applies `evidence_root` to both streams' evidence layouts.
    pub fn resolved(mut self) -> Self {
        if let Some(root) = self.evidence_root.take() {
            self.video.evidence = self.video.evidence.rooted_at(&root);
            self.audio.evidence = self.audio.evidence.rooted_at(&root);
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.video.enabled && !self.audio.enabled {
            anyhow::bail!("both video and audio streams are disabled");
        }
        if self.video.enabled {
            self.video.validate().context("video settings")?;
        }
        if self.audio.enabled {
            self.audio.validate().context("audio settings")?;
        }
        Ok(())
    }
}

pub fn parse_video_mode(value: &str) -> Result<VideoMode, String> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "class_match" => Ok(VideoMode::ClassMatch),
        "bottom_drop" => Ok(VideoMode::BottomDrop),
        other => Err(format!(
            "unknown mode '{}', expected class_match or bottom_drop",
            other
        )),
    }
}

pub fn parse_detection_class(value: &str) -> Result<DetectionClass, String> {
    match value.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
        "fall" => Ok(DetectionClass::Fall),
        "not_fall" => Ok(DetectionClass::NotFall),
        "person" => Ok(DetectionClass::Person),
        "child" => Ok(DetectionClass::Child),
        other => Err(format!("unknown detection class '{}'", other)),
    }
}
