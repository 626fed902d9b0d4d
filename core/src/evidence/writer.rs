use crate::evidence::record::{Evidence, EvidenceKind, MediaType};
use crate::prelude::{MonitorError, MonitorResult};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Upper bound on `_N` suffixes tried when a name is already taken.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Directory namespaces and file prefixes for one stream's evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceLayout {
    pub event_dir: PathBuf,
    pub background_dir: PathBuf,
    pub event_prefix: String,
    pub background_prefix: String,
}

impl EvidenceLayout {
    pub fn video_defaults() -> Self {
        Self {
            event_dir: PathBuf::from("fall_detected"),
            background_dir: PathBuf::from("captured_images"),
            event_prefix: "fall".into(),
            background_prefix: "frame".into(),
        }
    }

    pub fn audio_defaults() -> Self {
        Self {
            event_dir: PathBuf::from("suspicious_sounds"),
            background_dir: PathBuf::from("ambient_sounds"),
            event_prefix: "suspicious_sound".into(),
            background_prefix: "ambient".into(),
        }
    }

    /// Places both namespaces under `root`, keeping their relative names.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        self.event_dir = root.join(&self.event_dir);
        self.background_dir = root.join(&self.background_dir);
        self
    }

    pub fn validate(&self) -> MonitorResult<()> {
        if self.event_dir == self.background_dir {
            return Err(MonitorError::InvalidConfig(format!(
                "event and background evidence share directory {}",
                self.event_dir.display()
            )));
        }
        if self.event_prefix.is_empty() || self.background_prefix.is_empty() {
            return Err(MonitorError::InvalidConfig(
                "evidence prefixes must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EvidenceLayout {
    fn default() -> Self {
        Self::video_defaults()
    }
}

/// Writes evidence files into per-kind namespaces, never overwriting.
#[derive(Debug, Clone)]
pub struct EvidenceWriter {
    layout: EvidenceLayout,
}

impl EvidenceWriter {
    pub fn new(layout: EvidenceLayout) -> Self {
        Self { layout }
    }

    /// Creates both namespace directories.
    pub fn prepare(&self) -> MonitorResult<()> {
        for dir in [&self.layout.event_dir, &self.layout.background_dir] {
            fs::create_dir_all(dir).map_err(|source| MonitorError::PersistenceFailure {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn directory(&self, kind: EvidenceKind) -> &Path {
        match kind {
            EvidenceKind::Event => &self.layout.event_dir,
            EvidenceKind::Background => &self.layout.background_dir,
        }
    }

    /// `<prefix>_<YYYYMMDD_HHMMSS>[_<attempt>].<ext>`
    pub fn file_name(
        &self,
        kind: EvidenceKind,
        captured_at: DateTime<Local>,
        media: MediaType,
        attempt: u32,
    ) -> String {
        let prefix = match kind {
            EvidenceKind::Event => &self.layout.event_prefix,
            EvidenceKind::Background => &self.layout.background_prefix,
        };
        let stamp = captured_at.format("%Y%m%d_%H%M%S");
        if attempt == 0 {
            format!("{}_{}.{}", prefix, stamp, media.extension())
        } else {
            format!("{}_{}_{}.{}", prefix, stamp, attempt, media.extension())
        }
    }

    /// Writes `evidence` once and returns its path.
    pub fn persist(&self, evidence: &Evidence) -> MonitorResult<PathBuf> {
        let dir = self.directory(evidence.kind());
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = dir.join(self.file_name(
                evidence.kind(),
                evidence.captured_at(),
                evidence.media(),
                attempt,
            ));
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(MonitorError::PersistenceFailure { path, source }),
            };
            if let Err(source) = file.write_all(evidence.payload()).and_then(|_| file.flush()) {
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(MonitorError::PersistenceFailure { path, source });
            }
            log::debug!(
                "[{}] wrote {} bytes to {}",
                evidence.source().as_str(),
                evidence.payload().len(),
                path.display()
            );
            return Ok(path);
        }
        Err(MonitorError::PersistenceFailure {
            path: dir.to_path_buf(),
            source: std::io::Error::new(
                ErrorKind::AlreadyExists,
                "no free evidence file name for this timestamp",
            ),
        })
    }
}
