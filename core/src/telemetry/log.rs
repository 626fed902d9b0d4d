use log::{debug, error, info, warn};

/// Logging handle that tags every record with the owning stream.
#[derive(Debug, Clone)]
pub struct LogManager {
    stream: &'static str,
}

impl LogManager {
    pub fn new(stream: &'static str) -> Self {
        Self { stream }
    }

    pub fn stream(&self) -> &'static str {
        self.stream
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.stream, message);
    }

    pub fn debug(&self, message: &str) {
        debug!("[{}] {}", self.stream, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.stream, message);
    }

    pub fn error(&self, message: &str) {
        error!("[{}] {}", self.stream, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("vigil")
    }
}
