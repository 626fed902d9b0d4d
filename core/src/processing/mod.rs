pub mod classifier;
pub mod debounce;
pub mod sampler;

pub use classifier::{LoudnessClassifier, LoudnessReading, Verdict, VideoClassifier};
pub use debounce::{
    BottomDropTest, DebounceState, EntityId, EntityTracker, Phase, RunLengthDebouncer, Transition,
};
pub use sampler::{BackgroundSampler, Cadence};
