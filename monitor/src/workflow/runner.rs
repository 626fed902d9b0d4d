use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use vigilcore::evidence::{Dispatcher, HttpDispatcher};
use vigilcore::sensor::{AudioSource, ObjectDetector, VideoSource};
use vigilcore::stream::{self, AudioStream, StopSignal, StreamHandle, VideoStream};
use vigilcore::telemetry::{MetricsRecorder, MetricsSnapshot};

/// Devices handed to the runner. A stream whose config is disabled ignores
/// its sources.
pub struct Sources {
    pub camera: Box<dyn VideoSource>,
    pub detector: Box<dyn ObjectDetector>,
    pub microphone: Box<dyn AudioSource>,
}

/// Totals for one stream after its loop exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub cycles: u64,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub video: Option<StreamSummary>,
    pub audio: Option<StreamSummary>,
}

struct Running {
    handle: StreamHandle,
    metrics: Arc<MetricsRecorder>,
}

impl Running {
    fn join(self) -> anyhow::Result<StreamSummary> {
        let name = self.handle.name();
        let cycles = self
            .handle
            .join()
            .with_context(|| format!("joining {} loop", name))?;
        Ok(StreamSummary {
            cycles,
            metrics: self.metrics.snapshot(),
        })
    }
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Starts every enabled stream and blocks until all of them exit. If a
    /// stream fails to start, the ones already running are stopped and joined
    /// before the error is returned.
    pub fn run(&self, sources: Sources, stop: StopSignal) -> anyhow::Result<RunSummary> {
        let Sources {
            camera,
            detector,
            microphone,
        } = sources;

        let video = if self.config.video.enabled {
            match self.start_video(camera, detector, &stop) {
                Ok(running) => Some(running),
                Err(err) => {
                    stop.trigger();
                    return Err(err);
                }
            }
        } else {
            log::info!("Video stream disabled");
            None
        };

        let audio = if self.config.audio.enabled {
            match self.start_audio(microphone, &stop) {
                Ok(running) => Some(running),
                Err(err) => {
                    stop.trigger();
                    if let Some(running) = video {
                        if let Err(join_err) = running.join() {
                            log::error!("{:#}", join_err);
                        }
                    }
                    return Err(err);
                }
            }
        } else {
            log::info!("Audio stream disabled");
            None
        };

        let video = video.map(Running::join).transpose()?;
        let audio = audio.map(Running::join).transpose()?;
        Ok(RunSummary { video, audio })
    }

    fn start_video(
        &self,
        camera: Box<dyn VideoSource>,
        detector: Box<dyn ObjectDetector>,
        stop: &StopSignal,
    ) -> anyhow::Result<Running> {
        let metrics = Arc::new(MetricsRecorder::new());
        let stream = VideoStream::new(
            self.config.video.clone(),
            camera,
            detector,
            Arc::clone(&metrics),
        )
        .context("configuring video stream")?;
        let handle = stream::start(stream, stop.clone()).context("starting video stream")?;
        Ok(Running { handle, metrics })
    }

    fn start_audio(
        &self,
        microphone: Box<dyn AudioSource>,
        stop: &StopSignal,
    ) -> anyhow::Result<Running> {
        let audio = &self.config.audio;
        let dispatcher = match &audio.endpoint_url {
            Some(url) => {
                let http = HttpDispatcher::new(
                    url.clone(),
                    Duration::from_secs(audio.dispatch_timeout_secs),
                )
                .context("building audio dispatcher")?;
                log::info!("Forwarding audio clips to {}", http.endpoint());
                Some(Box::new(http) as Box<dyn Dispatcher>)
            }
            None => None,
        };

        let metrics = Arc::new(MetricsRecorder::new());
        let stream = AudioStream::new(audio.clone(), microphone, dispatcher, Arc::clone(&metrics))
            .context("configuring audio stream")?;
        let handle = stream::start(stream, stop.clone()).context("starting audio stream")?;
        Ok(Running { handle, metrics })
    }
}
