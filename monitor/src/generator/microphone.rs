use chrono::Local;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use vigilcore::prelude::{MonitorError, MonitorResult};
use vigilcore::sensor::{AudioBlock, AudioRead, AudioSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrophoneConfig {
    pub noise_amplitude: i16,
    /// Chance that a block contains a loud burst.
    pub burst_probability: f64,
    pub burst_amplitude: i16,
    /// Sleep for the wall-clock length of each block and recording.
    pub realtime: bool,
    pub seed: u64,
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self {
            noise_amplitude: 200,
            burst_probability: 0.02,
            burst_amplitude: 12_000,
            realtime: true,
            seed: 0,
        }
    }
}

/// Low-level noise with occasional loud bursts.
pub struct SyntheticMicrophone {
    config: MicrophoneConfig,
    sample_rate: u32,
    channels: u16,
    rng: StdRng,
    limit: Option<u64>,
    reads: u64,
    running: bool,
}

impl SyntheticMicrophone {
    pub fn new(config: MicrophoneConfig, sample_rate: u32, channels: u16, limit: Option<u64>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            sample_rate,
            channels,
            limit,
            reads: 0,
            running: false,
        }
    }

    fn noise(&mut self, frames: usize) -> Vec<i16> {
        let amplitude = self.config.noise_amplitude.saturating_abs();
        (0..frames * self.channels as usize)
            .map(|_| self.rng.gen_range(-amplitude..=amplitude))
            .collect()
    }

    fn wait(&self, frames: usize) {
        if self.config.realtime && self.sample_rate > 0 {
            thread::sleep(Duration::from_secs_f64(frames as f64 / self.sample_rate as f64));
        }
    }
}

impl AudioSource for SyntheticMicrophone {
    fn start(&mut self) -> MonitorResult<()> {
        if self.sample_rate == 0 || self.channels == 0 {
            return Err(MonitorError::DeviceInit(format!(
                "unsupported microphone format {} Hz / {} ch",
                self.sample_rate, self.channels
            )));
        }
        self.running = true;
        log::info!(
            "Synthetic microphone streaming {} Hz, {} ch",
            self.sample_rate,
            self.channels
        );
        Ok(())
    }

    fn read_block(&mut self, frames: usize) -> MonitorResult<AudioRead> {
        if !self.running {
            return Err(MonitorError::CaptureFailure("microphone not started".into()));
        }
        if self.limit.is_some_and(|limit| self.reads >= limit) {
            return Err(MonitorError::SourceExhausted);
        }
        self.reads += 1;
        self.wait(frames);

        let mut samples = self.noise(frames);
        let probability = self.config.burst_probability.clamp(0.0, 1.0);
        if !samples.is_empty() && self.rng.gen_bool(probability) {
            let start = self.rng.gen_range(0..samples.len());
            let end = (start + samples.len() / 10 + 1).min(samples.len());
            for (offset, sample) in samples[start..end].iter_mut().enumerate() {
                let sign = if offset % 2 == 0 { 1 } else { -1 };
                *sample = sign * self.config.burst_amplitude;
            }
        }

        Ok(AudioRead {
            block: AudioBlock::new(samples, self.channels, self.sample_rate, Local::now()),
            overflowed: false,
        })
    }

    fn record_for(&mut self, duration: Duration) -> MonitorResult<AudioBlock> {
        if !self.running {
            return Err(MonitorError::CaptureFailure("microphone not started".into()));
        }
        let frames = (duration.as_secs_f64() * self.sample_rate as f64).round() as usize;
        self.wait(frames);
        let samples = self.noise(frames);
        Ok(AudioBlock::new(samples, self.channels, self.sample_rate, Local::now()))
    }

    fn stop(&mut self) {
        self.running = false;
    }
}
