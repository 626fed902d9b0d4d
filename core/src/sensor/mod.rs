pub mod adapter;
pub mod detection;
pub mod sample;

pub use adapter::{AudioRead, AudioSource, DetectionFilter, ObjectDetector, VideoSource};
pub use detection::{
    BoundingBox, CatalogPreset, ClassCatalog, Detection, DetectionClass, RawDetection,
};
pub use sample::{AudioBlock, SourceStream, VideoFrame};
