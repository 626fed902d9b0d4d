//! Debounced multi-stream event detection for the Vigil monitor.
//!
//! A video stream turns per-frame detections into confirmed fall events, an
//! audio stream turns loudness readings into recorded and forwarded clips, and
//! both keep a background archive of ordinary activity. Capture devices, the
//! detector and the downstream HTTP consumer sit behind the traits in
//! [`sensor::adapter`] and [`evidence::dispatch`].

pub mod config;
pub mod evidence;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod sensor;
pub mod stream;
pub mod telemetry;

pub use prelude::{CycleReport, MonitorError, MonitorResult, SensorStream};
