pub mod fft;
pub mod filter;
pub mod stats;

pub use fft::FftHelper;
pub use filter::BandPass;
pub use stats::StatsHelper;
