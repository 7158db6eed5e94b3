//! Audio output for oxidized-retro

pub mod sink;

pub use sink::{AudioSink, Sample, CHANNELS};
