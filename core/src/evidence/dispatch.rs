use crate::evidence::record::MediaType;
use crate::prelude::{MonitorError, MonitorResult};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Status and body text returned by the downstream consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub status: u16,
    pub body: String,
}

/// Forwards a persisted evidence file to a downstream consumer.
pub trait Dispatcher: Send {
    fn dispatch(&self, path: &Path) -> MonitorResult<DispatchReceipt>;
}

/// Uploads evidence as a multipart `file` field. One attempt, no retries.
pub struct HttpDispatcher {
    client: Client,
    endpoint: String,
}

impl HttpDispatcher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> MonitorResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| MonitorError::DispatchFailure(format!("building client: {}", err)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Dispatcher for HttpDispatcher {
    fn dispatch(&self, path: &Path) -> MonitorResult<DispatchReceipt> {
        let bytes = fs::read(path).map_err(|err| {
            MonitorError::DispatchFailure(format!("reading {}: {}", path.display(), err))
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "evidence".to_string());
        let mime = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(MediaType::from_extension)
            .map(|media| media.mime())
            .unwrap_or("application/octet-stream");

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|err| MonitorError::DispatchFailure(err.to_string()))?;
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(Form::new().part("file", part))
            .send()
            .map_err(|err| MonitorError::DispatchFailure(format!("POST {}: {}", self.endpoint, err)))?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        if status.is_success() {
            Ok(DispatchReceipt {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(MonitorError::DispatchFailure(format!(
                "POST {} returned {}: {}",
                self.endpoint, status, body
            )))
        }
    }
}

/// Uploads allowed to wait behind the one in flight.
pub const DISPATCH_QUEUE_DEPTH: usize = 4;

/// Background thread that performs uploads so the capture loop never waits
/// on the network. Outcomes are only logged and counted. The queue is
/// bounded; on shutdown only the upload in flight is allowed to finish.
pub struct DispatchWorker {
    sender: Option<SyncSender<PathBuf>>,
    handle: Option<JoinHandle<()>>,
    stopping: Arc<AtomicBool>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl DispatchWorker {
    pub fn spawn(
        dispatcher: Box<dyn Dispatcher>,
        metrics: Arc<MetricsRecorder>,
        logger: LogManager,
    ) -> MonitorResult<Self> {
        let (sender, receiver) = mpsc::sync_channel::<PathBuf>(DISPATCH_QUEUE_DEPTH);
        let stopping = Arc::new(AtomicBool::new(false));
        let worker_stopping = stopping.clone();
        let worker_metrics = metrics.clone();
        let worker_logger = logger.clone();
        let handle = thread::Builder::new()
            .name(format!("{}-dispatch", logger.stream()))
            .spawn(move || {
                let mut discarded = 0;
                for path in receiver {
                    if worker_stopping.load(Ordering::SeqCst) {
                        discarded += 1;
                        continue;
                    }
                    match dispatcher.dispatch(&path) {
                        Ok(receipt) => {
                            worker_metrics.record_dispatch(true);
                            worker_logger.record(&format!(
                                "Dispatched {} -> {} {}",
                                path.display(),
                                receipt.status,
                                receipt.body
                            ));
                        }
                        Err(err) => {
                            worker_metrics.record_dispatch(false);
                            worker_logger
                                .error(&format!("Dispatch of {} failed: {}", path.display(), err));
                        }
                    }
                }
                if discarded > 0 {
                    worker_metrics.record_dispatch_dropped(discarded);
                    worker_logger.warn(&format!(
                        "Shutdown discarded {} pending uploads; files remain on disk",
                        discarded
                    ));
                }
            })
            .map_err(|err| MonitorError::DispatchFailure(format!("spawning worker: {}", err)))?;
        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            stopping,
            metrics,
            logger,
        })
    }

    /// Queues `path` for upload without blocking. Returns false, after
    /// logging and counting the drop, if the queue is full or the worker is
    /// gone.
    pub fn submit(&self, path: PathBuf) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        let reason = match sender.try_send(path) {
            Ok(()) => return true,
            Err(TrySendError::Full(path)) => format!("queue full, {} not sent", path.display()),
            Err(TrySendError::Disconnected(path)) => {
                format!("worker gone, {} not sent", path.display())
            }
        };
        self.metrics.record_dispatch_dropped(1);
        self.logger.error(&format!("Dispatch dropped: {}", reason));
        false
    }

    /// Waits for the upload in flight, discards the backlog and joins.
    pub fn finish(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("dispatch worker panicked");
            }
        }
    }
}

impl Drop for DispatchWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
