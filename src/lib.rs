//! Zema Player: audio transport and waveform scrubbing for recorded chant

pub mod audio;
pub mod config;
pub mod error;
pub mod render;
pub mod timefmt;
pub mod track;
pub mod transport;
pub mod ui;
pub mod waveform;

#[cfg(test)]
mod testing;
