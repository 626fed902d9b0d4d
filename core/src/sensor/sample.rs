use crate::prelude::{MonitorError, MonitorResult};
use chrono::{DateTime, Local};

/// Sensor modality a sample or piece of evidence originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceStream {
    Video,
    Audio,
}

impl SourceStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStream::Video => "video",
            SourceStream::Audio => "audio",
        }
    }
}

/// One captured frame. Pixels are row-major with `channels` bytes per pixel.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pixels: Vec<u8>,
    pub captured_at: DateTime<Local>,
}

impl VideoFrame {
    pub fn new(
        width: u32,
        height: u32,
        channels: u8,
        pixels: Vec<u8>,
        captured_at: DateTime<Local>,
    ) -> Self {
        Self {
            width,
            height,
            channels,
            pixels,
            captured_at,
        }
    }

    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    /// Rejects frames whose buffer does not match the declared geometry.
    pub fn validate(&self) -> MonitorResult<()> {
        if self.channels != 1 && self.channels != 3 {
            return Err(MonitorError::CaptureFailure(format!(
                "unsupported channel count {}",
                self.channels
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(MonitorError::CaptureFailure("empty frame".into()));
        }
        if self.pixels.len() != self.expected_len() {
            return Err(MonitorError::CaptureFailure(format!(
                "frame buffer holds {} bytes, expected {}",
                self.pixels.len(),
                self.expected_len()
            )));
        }
        Ok(())
    }
}

/// Block of interleaved 16-bit PCM samples.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    pub samples: Vec<i16>,
    pub channels: u16,
    pub sample_rate: u32,
    pub captured_at: DateTime<Local>,
}

impl AudioBlock {
    pub fn new(
        samples: Vec<i16>,
        channels: u16,
        sample_rate: u32,
        captured_at: DateTime<Local>,
    ) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            captured_at,
        }
    }

    /// Number of sample frames (one sample per channel each).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// De-interleaves a single channel.
    pub fn channel(&self, index: u16) -> Vec<i16> {
        let stride = self.channels.max(1) as usize;
        self.samples
            .iter()
            .skip(index as usize)
            .step_by(stride)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_validation_checks_buffer_length() {
        let frame = VideoFrame::new(2, 2, 3, vec![0; 12], Local::now());
        assert!(frame.validate().is_ok());

        let short = VideoFrame::new(2, 2, 3, vec![0; 11], Local::now());
        assert!(matches!(
            short.validate(),
            Err(MonitorError::CaptureFailure(_))
        ));
    }

    #[test]
    fn audio_block_splits_interleaved_channels() {
        let block = AudioBlock::new(vec![1, -1, 2, -2, 3, -3], 2, 8000, Local::now());
        assert_eq!(block.frames(), 3);
        assert_eq!(block.channel(0), vec![1, 2, 3]);
        assert_eq!(block.channel(1), vec![-1, -2, -3]);
    }
}
