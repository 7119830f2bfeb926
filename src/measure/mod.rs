//! Loudness, peak and stereo-share measurement over streamed audio

pub mod accumulate;
pub mod finalize;
pub mod reduce;
pub mod stream;
