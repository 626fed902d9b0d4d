use crate::sensor::sample::SourceStream;
use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvidenceKind {
    Event,
    Background,
}

impl EvidenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceKind::Event => "event",
            EvidenceKind::Background => "background",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Wav,
}

impl MediaType {
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "jpg",
            MediaType::Wav => "wav",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Wav => "audio/wav",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "wav" => Some(MediaType::Wav),
            _ => None,
        }
    }
}

/// Encoded artifact selected for archival. Immutable once built.
#[derive(Debug, Clone)]
pub struct Evidence {
    kind: EvidenceKind,
    media: MediaType,
    payload: Vec<u8>,
    captured_at: DateTime<Local>,
    source: SourceStream,
}

impl Evidence {
    pub fn new(
        kind: EvidenceKind,
        media: MediaType,
        payload: Vec<u8>,
        captured_at: DateTime<Local>,
        source: SourceStream,
    ) -> Self {
        Self {
            kind,
            media,
            payload,
            captured_at,
            source,
        }
    }

    pub fn kind(&self) -> EvidenceKind {
        self.kind
    }

    pub fn media(&self) -> MediaType {
        self.media
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    pub fn source(&self) -> SourceStream {
        self.source
    }
}
