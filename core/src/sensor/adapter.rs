//! Seams to the external collaborators: capture devices and the detector.

use crate::prelude::MonitorResult;
use crate::sensor::detection::RawDetection;
use crate::sensor::sample::{AudioBlock, VideoFrame};
use std::time::Duration;

/// Frame-producing capture device.
pub trait VideoSource: Send {
    /// Acquires the device. A failure here prevents the video loop from starting.
    fn start(&mut self) -> MonitorResult<()>;
    /// Blocks until the next frame is available.
    fn next_frame(&mut self) -> MonitorResult<VideoFrame>;
    fn stop(&mut self);
}

/// Hints passed to the detector; adapters may ignore them.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFilter {
    pub class_ids: Vec<u32>,
    pub confidence_floor: f32,
}

/// Object detection engine mapping a frame to zero or more detections.
pub trait ObjectDetector: Send {
    fn detect(
        &mut self,
        frame: &VideoFrame,
        filter: &DetectionFilter,
    ) -> MonitorResult<Vec<RawDetection>>;
}

/// Result of a blocking block read.
#[derive(Debug, Clone)]
pub struct AudioRead {
    pub block: AudioBlock,
    pub overflowed: bool,
}

/// Microphone capture device.
pub trait AudioSource: Send {
    fn start(&mut self) -> MonitorResult<()>;
    /// Blocks until `frames` sample frames have been read.
    fn read_block(&mut self, frames: usize) -> MonitorResult<AudioRead>;
    /// Blocks for `duration` while recording a clip.
    fn record_for(&mut self, duration: Duration) -> MonitorResult<AudioBlock>;
    fn stop(&mut self);
}
