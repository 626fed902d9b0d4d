use chrono::Local;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::{Duration, Instant};
use vigilcore::prelude::{MonitorError, MonitorResult};
use vigilcore::sensor::{VideoFrame, VideoSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    /// Frame pacing; 0 delivers frames as fast as they are requested.
    pub fps: f32,
    pub seed: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 15.0,
            seed: 0,
        }
    }
}

/// RGB noise camera.
pub struct SyntheticCamera {
    config: CameraConfig,
    rng: StdRng,
    limit: Option<u64>,
    produced: u64,
    last_frame: Option<Instant>,
    running: bool,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig, limit: Option<u64>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            limit,
            produced: 0,
            last_frame: None,
            running: false,
        }
    }

    fn pace(&mut self) {
        if self.config.fps > 0.0 {
            let interval = Duration::from_secs_f32(1.0 / self.config.fps);
            if let Some(last) = self.last_frame {
                let elapsed = last.elapsed();
                if elapsed < interval {
                    thread::sleep(interval - elapsed);
                }
            }
        }
        self.last_frame = Some(Instant::now());
    }
}

impl VideoSource for SyntheticCamera {
    fn start(&mut self) -> MonitorResult<()> {
        if self.config.width == 0 || self.config.height == 0 {
            return Err(MonitorError::DeviceInit(format!(
                "invalid camera resolution {}x{}",
                self.config.width, self.config.height
            )));
        }
        self.running = true;
        log::info!(
            "Synthetic camera streaming {}x{} at {} fps",
            self.config.width,
            self.config.height,
            self.config.fps
        );
        Ok(())
    }

    fn next_frame(&mut self) -> MonitorResult<VideoFrame> {
        if !self.running {
            return Err(MonitorError::CaptureFailure("camera not started".into()));
        }
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            return Err(MonitorError::SourceExhausted);
        }
        self.pace();
        self.produced += 1;

        let len = self.config.width as usize * self.config.height as usize * 3;
        let mut pixels = vec![0u8; len];
        self.rng.fill(&mut pixels[..]);
        for pixel in &mut pixels {
            *pixel = 96 + (*pixel >> 3);
        }
        Ok(VideoFrame::new(
            self.config.width,
            self.config.height,
            3,
            pixels,
            Local::now(),
        ))
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CameraConfig {
        CameraConfig {
            width: 4,
            height: 2,
            fps: 0.0,
            seed: 7,
        }
    }

    #[test]
    fn camera_stops_at_limit() {
        let mut camera = SyntheticCamera::new(fast_config(), Some(2));
        camera.start().unwrap();
        let frame = camera.next_frame().unwrap();
        assert!(frame.validate().is_ok());
        camera.next_frame().unwrap();
        assert!(matches!(
            camera.next_frame(),
            Err(MonitorError::SourceExhausted)
        ));
    }

    #[test]
    fn camera_requires_start_and_resolution() {
        let mut idle = SyntheticCamera::new(fast_config(), None);
        assert!(idle.next_frame().is_err());

        let mut broken = SyntheticCamera::new(
            CameraConfig {
                width: 0,
                ..fast_config()
            },
            None,
        );
        assert!(matches!(broken.start(), Err(MonitorError::DeviceInit(_))));
    }
}
