//! Persistence and forwarding of confirmed-event and background evidence.

pub mod codec;
pub mod dispatch;
pub mod record;
pub mod writer;

pub use dispatch::{DispatchReceipt, DispatchWorker, Dispatcher, HttpDispatcher};
pub use record::{Evidence, EvidenceKind, MediaType};
pub use writer::{EvidenceLayout, EvidenceWriter};
