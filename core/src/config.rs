//! Tunables for the video and audio streams.
//!
//! Several video defaults depend on [`VideoMode`]; those fields are optional
//! and resolved through the `effective_*` accessors.

use crate::evidence::writer::EvidenceLayout;
use crate::prelude::{MonitorError, MonitorResult};
use crate::processing::sampler::Cadence;
use crate::sensor::detection::{CatalogPreset, DetectionClass};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which definition of "fall" the video stream applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoMode {
    /// A fall-trained model reports class `Fall` with high confidence.
    #[default]
    ClassMatch,
    /// A person's box bottom drops sharply over consecutive frames.
    BottomDrop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub enabled: bool,
    pub mode: VideoMode,
    pub catalog: Option<CatalogPreset>,
    pub confidence_threshold: Option<f32>,
    pub detector_confidence_floor: f32,
    pub target_classes: Option<Vec<DetectionClass>>,
    pub required_run_length: Option<u32>,
    pub delta_threshold: f32,
    pub cooldown_cycles: u32,
    pub entity_idle_timeout_secs: f64,
    pub frame_skip: u32,
    pub background_interval_frames: Option<u64>,
    pub background_interval_secs: Option<f64>,
    pub annotate: bool,
    pub jpeg_quality: u8,
    pub evidence: EvidenceLayout,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: VideoMode::ClassMatch,
            catalog: None,
            confidence_threshold: None,
            detector_confidence_floor: 0.5,
            target_classes: None,
            required_run_length: None,
            delta_threshold: 0.5,
            cooldown_cycles: 0,
            entity_idle_timeout_secs: 3.0,
            frame_skip: 1,
            background_interval_frames: None,
            background_interval_secs: None,
            annotate: true,
            jpeg_quality: 90,
            evidence: EvidenceLayout::video_defaults(),
        }
    }
}

impl VideoConfig {
    pub fn effective_catalog(&self) -> CatalogPreset {
        self.catalog.unwrap_or(match self.mode {
            VideoMode::ClassMatch => CatalogPreset::FallModel,
            VideoMode::BottomDrop => CatalogPreset::PersonModel,
        })
    }

    pub fn effective_confidence_threshold(&self) -> f32 {
        self.confidence_threshold.unwrap_or(match self.mode {
            VideoMode::ClassMatch => 0.8,
            VideoMode::BottomDrop => 0.5,
        })
    }

    pub fn effective_target_classes(&self) -> Vec<DetectionClass> {
        self.target_classes.clone().unwrap_or_else(|| match self.mode {
            VideoMode::ClassMatch => vec![DetectionClass::Fall],
            VideoMode::BottomDrop => vec![DetectionClass::Person, DetectionClass::Child],
        })
    }

    pub fn effective_run_length(&self) -> u32 {
        self.required_run_length.unwrap_or(match self.mode {
            VideoMode::ClassMatch => 1,
            VideoMode::BottomDrop => 5,
        })
    }

    pub fn cadence(&self) -> MonitorResult<Cadence> {
        let fallback = match self.mode {
            VideoMode::ClassMatch => Cadence::Frames(30),
            VideoMode::BottomDrop => Cadence::Seconds(5.0),
        };
        resolve_cadence(
            self.background_interval_frames,
            self.background_interval_secs,
            fallback,
        )
    }

    pub fn validate(&self) -> MonitorResult<()> {
        check_unit_interval("confidence_threshold", self.effective_confidence_threshold())?;
        check_unit_interval("detector_confidence_floor", self.detector_confidence_floor)?;
        if self.effective_run_length() == 0 {
            return invalid("required_run_length must be at least 1");
        }
        if self.frame_skip == 0 {
            return invalid("frame_skip must be at least 1");
        }
        if !(self.delta_threshold.is_finite() && self.delta_threshold >= 0.0) {
            return invalid("delta_threshold must be a non-negative number");
        }
        if !(self.entity_idle_timeout_secs > 0.0) {
            return invalid("entity_idle_timeout_secs must be positive");
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return invalid("jpeg_quality must be within 1..=100");
        }
        self.cadence()?;
        self.evidence.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandPassConfig {
    pub low_hz: f32,
    pub high_hz: f32,
}

impl Default for BandPassConfig {
    fn default() -> Self {
        Self {
            low_hz: 500.0,
            high_hz: 4000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub sample_rate: u32,
    pub channels: u16,
    pub block_secs: f32,
    pub loudness_threshold_db: f32,
    pub required_run_length: u32,
    pub cooldown_cycles: u32,
    pub recording_duration_secs: f32,
    pub bandpass: Option<BandPassConfig>,
    pub endpoint_url: Option<String>,
    pub dispatch_timeout_secs: u64,
    pub pause_between_blocks_ms: u64,
    pub background_interval_frames: Option<u64>,
    pub background_interval_secs: Option<f64>,
    pub evidence: EvidenceLayout,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: 44_100,
            channels: 1,
            block_secs: 0.5,
            loudness_threshold_db: 60.0,
            required_run_length: 1,
            cooldown_cycles: 0,
            recording_duration_secs: 10.0,
            bandpass: None,
            endpoint_url: None,
            dispatch_timeout_secs: 30,
            pause_between_blocks_ms: 100,
            background_interval_frames: None,
            background_interval_secs: None,
            evidence: EvidenceLayout::audio_defaults(),
        }
    }
}

impl AudioConfig {
    /// Sample frames per block read.
    pub fn block_frames(&self) -> usize {
        (self.sample_rate as f32 * self.block_secs).round() as usize
    }

    pub fn recording_duration(&self) -> Duration {
        Duration::from_secs_f32(self.recording_duration_secs.max(0.0))
    }

    pub fn pause_between_blocks(&self) -> Duration {
        Duration::from_millis(self.pause_between_blocks_ms)
    }

    pub fn cadence(&self) -> MonitorResult<Cadence> {
        resolve_cadence(
            self.background_interval_frames,
            self.background_interval_secs,
            Cadence::Disabled,
        )
    }

    pub fn validate(&self) -> MonitorResult<()> {
        if self.sample_rate == 0 || self.channels == 0 {
            return invalid("sample_rate and channels must be positive");
        }
        if self.block_frames() == 0 {
            return invalid("block_secs yields an empty block");
        }
        if !self.loudness_threshold_db.is_finite() {
            return invalid("loudness_threshold_db must be finite");
        }
        if self.required_run_length == 0 {
            return invalid("required_run_length must be at least 1");
        }
        if !(self.recording_duration_secs.is_finite() && self.recording_duration_secs > 0.0) {
            return invalid("recording_duration_secs must be positive");
        }
        if let Some(band) = self.bandpass {
            let nyquist = self.sample_rate as f32 / 2.0;
            if !(band.low_hz >= 0.0 && band.low_hz < band.high_hz && band.high_hz <= nyquist) {
                return invalid("bandpass needs 0 <= low_hz < high_hz <= sample_rate / 2");
            }
        }
        if let Some(url) = &self.endpoint_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(MonitorError::InvalidConfig(format!(
                    "endpoint_url {} is not an http(s) URL",
                    url
                )));
            }
        }
        self.cadence()?;
        self.evidence.validate()
    }
}

fn resolve_cadence(frames: Option<u64>, secs: Option<f64>, fallback: Cadence) -> MonitorResult<Cadence> {
    match (frames, secs) {
        (Some(_), Some(_)) => invalid(
            "set only one of background_interval_frames and background_interval_secs",
        ),
        (Some(0), None) => Ok(Cadence::Disabled),
        (Some(every), None) => Ok(Cadence::Frames(every)),
        (None, Some(interval)) if interval.is_finite() && interval > 0.0 => {
            Ok(Cadence::Seconds(interval))
        }
        (None, Some(_)) => invalid("background_interval_secs must be positive"),
        (None, None) => Ok(fallback),
    }
}

fn check_unit_interval(name: &str, value: f32) -> MonitorResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(MonitorError::InvalidConfig(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

fn invalid<T>(message: &str) -> MonitorResult<T> {
    Err(MonitorError::InvalidConfig(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_match_defaults_follow_fall_model() {
        let config = VideoConfig::default();
        assert_eq!(config.effective_catalog(), CatalogPreset::FallModel);
        assert_eq!(config.effective_confidence_threshold(), 0.8);
        assert_eq!(config.effective_target_classes(), vec![DetectionClass::Fall]);
        assert_eq!(config.effective_run_length(), 1);
        assert_eq!(config.cadence().unwrap(), Cadence::Frames(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bottom_drop_defaults_follow_person_model() {
        let config = VideoConfig {
            mode: VideoMode::BottomDrop,
            ..Default::default()
        };
        assert_eq!(config.effective_catalog(), CatalogPreset::PersonModel);
        assert_eq!(config.effective_confidence_threshold(), 0.5);
        assert_eq!(config.effective_run_length(), 5);
        assert_eq!(config.cadence().unwrap(), Cadence::Seconds(5.0));
    }

    #[test]
    fn conflicting_background_intervals_are_rejected() {
        let config = VideoConfig {
            background_interval_frames: Some(30),
            background_interval_secs: Some(5.0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MonitorError::InvalidConfig(_))));
    }

    #[test]
    fn zero_frame_interval_disables_background() {
        let config = AudioConfig {
            background_interval_frames: Some(0),
            ..Default::default()
        };
        assert_eq!(config.cadence().unwrap(), Cadence::Disabled);
    }

    #[test]
    fn audio_defaults_match_half_second_blocks() {
        let config = AudioConfig::default();
        assert_eq!(config.block_frames(), 22_050);
        assert_eq!(config.recording_duration(), Duration::from_secs(10));
        assert_eq!(config.cadence().unwrap(), Cadence::Disabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn audio_rejects_bad_band_and_endpoint() {
        let band = AudioConfig {
            bandpass: Some(BandPassConfig {
                low_hz: 4000.0,
                high_hz: 500.0,
            }),
            ..Default::default()
        };
        assert!(band.validate().is_err());

        let endpoint = AudioConfig {
            endpoint_url: Some("ftp://example".into()),
            ..Default::default()
        };
        assert!(endpoint.validate().is_err());
    }
}
