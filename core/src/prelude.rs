use std::path::PathBuf;

/// Error taxonomy shared by every stream and stage.
#[derive(thiserror::Error, Debug)]
pub enum MonitorError {
    #[error("capture failure: {0}")]
    CaptureFailure(String),
    #[error("signal source exhausted")]
    SourceExhausted,
    #[error("device initialization failed: {0}")]
    DeviceInit(String),
    #[error("malformed detection: {0}")]
    DetectionMalformed(String),
    #[error("failed to persist {path}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encoding failure: {0}")]
    Encoding(String),
    #[error("dispatch failure: {0}")]
    DispatchFailure(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{0} stream thread panicked")]
    StreamPanicked(&'static str),
}

pub type MonitorResult<T> = Result<T, MonitorError>;

/// Summary of one pass through a stream's capture/classify/debounce/write pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub candidates: usize,
    pub event_fired: bool,
    pub background_written: bool,
    pub evidence: Vec<PathBuf>,
}

impl CycleReport {
    /// A cycle whose sample was discarded before classification.
    pub fn skipped() -> Self {
        Self::default()
    }
}

/// A single sensor modality driven by its own polling loop.
///
/// `initialize` acquires the capture device and prepares evidence storage; a
/// failure there is fatal for the stream. `run_cycle` pulls exactly one sample
/// and carries it through the pipeline. `cleanup` releases the device and is
/// always called once the loop exits, whatever the exit path.
pub trait SensorStream: Send {
    fn name(&self) -> &'static str;
    fn initialize(&mut self) -> MonitorResult<()>;
    fn run_cycle(&mut self) -> MonitorResult<CycleReport>;
    fn cleanup(&mut self);
}
