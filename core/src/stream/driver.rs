//! Polling loop shared by every sensor stream.

use crate::prelude::{MonitorError, MonitorResult, SensorStream};
use crate::telemetry::log::LogManager;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Process-wide cancellation flag, checked after every completed cycle.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Calls `cleanup` when dropped, including during unwinding.
struct CleanupGuard<'a, S: SensorStream>(&'a mut S);

impl<S: SensorStream> Deref for CleanupGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &*self.0
    }
}

impl<S: SensorStream> DerefMut for CleanupGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.0
    }
}

impl<S: SensorStream> Drop for CleanupGuard<'_, S> {
    fn drop(&mut self) {
        self.0.cleanup();
    }
}

/// Running stream loop.
pub struct StreamHandle {
    name: &'static str,
    handle: JoinHandle<u64>,
}

impl StreamHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Waits for the loop to exit and returns the number of cycles it ran.
    pub fn join(self) -> MonitorResult<u64> {
        self.handle
            .join()
            .map_err(|_| MonitorError::StreamPanicked(self.name))
    }
}

/// Initializes `stream` on the calling thread and, if that succeeds, runs its
/// loop on a dedicated thread until `stop` is triggered or the source is
/// exhausted. An initialization failure is returned and no loop is started.
pub fn start<S>(mut stream: S, stop: StopSignal) -> MonitorResult<StreamHandle>
where
    S: SensorStream + 'static,
{
    let name = stream.name();
    if let Err(err) = stream.initialize() {
        stream.cleanup();
        return Err(err);
    }

    let handle = thread::Builder::new()
        .name(format!("vigil-{}", name))
        .spawn(move || run(&mut stream, &stop))
        .map_err(|err| MonitorError::DeviceInit(format!("spawning {} loop: {}", name, err)))?;
    Ok(StreamHandle { name, handle })
}

/// Consecutive capture failures tolerated before the loop starts pausing.
const CAPTURE_BACKOFF_AFTER: u32 = 3;
/// Pause between attempts once a device keeps failing.
const CAPTURE_BACKOFF: Duration = Duration::from_millis(250);

/// Drives an already initialized stream; `cleanup` runs on every exit path.
pub fn run<S: SensorStream>(stream: &mut S, stop: &StopSignal) -> u64 {
    run_with_backoff(stream, stop, CAPTURE_BACKOFF)
}

fn run_with_backoff<S: SensorStream>(stream: &mut S, stop: &StopSignal, backoff: Duration) -> u64 {
    let logger = LogManager::new(stream.name());
    let mut guard = CleanupGuard(stream);
    let mut cycles = 0;
    let mut failures: u32 = 0;

    logger.record("Loop started");
    while !stop.is_triggered() {
        match guard.run_cycle() {
            Ok(report) => {
                cycles += 1;
                if failures >= CAPTURE_BACKOFF_AFTER {
                    logger.record(&format!("Capture recovered after {} failures", failures));
                }
                failures = 0;
                for path in &report.evidence {
                    logger.debug(&format!("Cycle {} wrote {}", cycles, path.display()));
                }
            }
            Err(MonitorError::SourceExhausted) => {
                logger.record("Signal source exhausted");
                break;
            }
            Err(err) => {
                cycles += 1;
                failures = failures.saturating_add(1);
                if failures <= CAPTURE_BACKOFF_AFTER {
                    logger.warn(&format!("Cycle skipped: {}", err));
                } else {
                    logger.debug(&format!("Cycle skipped ({} in a row): {}", failures, err));
                }
                if failures == CAPTURE_BACKOFF_AFTER {
                    logger.warn(&format!(
                        "Source keeps failing; retrying every {} ms",
                        backoff.as_millis()
                    ));
                }
                if failures >= CAPTURE_BACKOFF_AFTER && !stop.is_triggered() {
                    thread::sleep(backoff);
                }
            }
        }
    }
    logger.record(&format!("Loop exiting after {} cycles", cycles));
    cycles
}
