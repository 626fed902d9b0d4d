use anyhow::Context;
use clap::Parser;
use generator::camera::SyntheticCamera;
use generator::microphone::SyntheticMicrophone;
use generator::script::ScriptedDetector;
use std::path::PathBuf;
use std::thread;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use vigilcore::config::VideoMode;
use vigilcore::sensor::DetectionClass;
use vigilcore::stream::StopSignal;
use workflow::config::{parse_detection_class, parse_video_mode, Overrides, WorkflowConfig};
use workflow::runner::{Runner, RunSummary, Sources, StreamSummary};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Fall and suspicious-sound monitor")]
struct Args {
    /// Load monitor settings from YAML
    #[arg(long, env = "VIGIL_CONFIG")]
    config: Option<PathBuf>,
    /// Fall definition: class_match or bottom_drop
    #[arg(long, env = "VIGIL_MODE", value_parser = parse_video_mode)]
    mode: Option<VideoMode>,
    #[arg(long, env = "VIGIL_CONFIDENCE_THRESHOLD")]
    confidence_threshold: Option<f32>,
    #[arg(long, env = "VIGIL_TARGET_CLASSES", value_delimiter = ',', value_parser = parse_detection_class)]
    target_classes: Option<Vec<DetectionClass>>,
    /// Consecutive candidate cycles needed to confirm an event
    #[arg(long, env = "VIGIL_REQUIRED_RUN_LENGTH")]
    required_run_length: Option<u32>,
    /// Bottom-edge drop, as a fraction of the current bottom, for bottom_drop
    #[arg(long, env = "VIGIL_DELTA_THRESHOLD")]
    delta_threshold: Option<f32>,
    #[arg(long, env = "VIGIL_LOUDNESS_THRESHOLD_DB", allow_hyphen_values = true)]
    loudness_threshold_db: Option<f32>,
    #[arg(long, env = "VIGIL_BACKGROUND_INTERVAL_FRAMES", conflicts_with = "background_interval_secs")]
    background_interval_frames: Option<u64>,
    #[arg(long, env = "VIGIL_BACKGROUND_INTERVAL_SECS")]
    background_interval_secs: Option<f64>,
    #[arg(long, env = "VIGIL_RECORDING_DURATION_SECS")]
    recording_duration_secs: Option<f32>,
    /// Where recorded audio clips are POSTed
    #[arg(long, env = "VIGIL_ENDPOINT_URL")]
    endpoint_url: Option<String>,
    #[arg(long, env = "VIGIL_EVIDENCE_ROOT")]
    evidence_root: Option<PathBuf>,
    /// JSON detection script replayed by the stand-in detector
    #[arg(long, env = "VIGIL_DETECTIONS")]
    detections: Option<PathBuf>,
    /// Stop each stream after this many captures
    #[arg(long)]
    cycles: Option<u64>,
    #[arg(long, default_value_t = false)]
    no_video: bool,
    #[arg(long, default_value_t = false)]
    no_audio: bool,
    /// Disable frame pacing and real-time audio waits
    #[arg(long, default_value_t = false)]
    fast: bool,
    #[arg(long, env = "VIGIL_SEED")]
    seed: Option<u64>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            mode: self.mode,
            confidence_threshold: self.confidence_threshold,
            target_classes: self.target_classes.clone(),
            required_run_length: self.required_run_length,
            delta_threshold: self.delta_threshold,
            loudness_threshold_db: self.loudness_threshold_db,
            background_interval_frames: self.background_interval_frames,
            background_interval_secs: self.background_interval_secs,
            recording_duration_secs: self.recording_duration_secs,
            endpoint_url: self.endpoint_url.clone(),
            evidence_root: self.evidence_root.clone(),
            disable_video: self.no_video,
            disable_audio: self.no_audio,
            fast: self.fast,
            seed: self.seed,
        }
    }
}

fn spawn_interrupt_listener(stop: StopSignal) -> anyhow::Result<()> {
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    thread::Builder::new()
        .name("vigil-signal".into())
        .spawn(move || {
            let result = runtime.block_on(signal::ctrl_c());
            match result {
                Ok(()) => log::info!("Interrupt received, stopping streams"),
                Err(err) => log::error!("Awaiting Ctrl+C failed: {}", err),
            }
            stop.trigger();
        })
        .context("spawning signal listener")?;
    Ok(())
}

fn print_stream(name: &str, summary: Option<StreamSummary>) {
    match summary {
        Some(StreamSummary { cycles, metrics }) => println!(
            "{} -> cycles {}, candidates {}, events {}, background {}, capture failures {}, malformed {}, dispatched {}/{} (dropped {})",
            name,
            cycles,
            metrics.candidates,
            metrics.events,
            metrics.background_samples,
            metrics.capture_failures,
            metrics.malformed_detections,
            metrics.dispatch_attempts - metrics.dispatch_failures,
            metrics.dispatch_attempts,
            metrics.dispatches_dropped
        ),
        None => println!("{} -> disabled", name),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };
    config.apply(&args.overrides());
    let config = config.resolved();
    config.validate().context("validating monitor config")?;

    let detector = match &args.detections {
        Some(path) => ScriptedDetector::load(path)?,
        None => ScriptedDetector::empty(),
    };
    let sources = Sources {
        camera: Box::new(SyntheticCamera::new(config.camera.clone(), args.cycles)),
        detector: Box::new(detector),
        microphone: Box::new(SyntheticMicrophone::new(
            config.microphone.clone(),
            config.audio.sample_rate,
            config.audio.channels,
            args.cycles,
        )),
    };

    let stop = StopSignal::new();
    spawn_interrupt_listener(stop.clone())?;

    let runner = Runner::new(config);
    let RunSummary { video, audio } = runner.run(sources, stop)?;
    print_stream("video", video);
    print_stream("audio", audio);
    Ok(())
}
