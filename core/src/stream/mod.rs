pub mod audio;
pub mod driver;
pub mod video;

pub use audio::AudioStream;
pub use driver::{start, StopSignal, StreamHandle};
pub use video::VideoStream;
