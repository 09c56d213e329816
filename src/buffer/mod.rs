//! Growable mirrored sequence buffers

pub mod config;
pub mod growable;

pub use config::GrowthConfig;
pub use growable::GrowableMirroredBuffer;
