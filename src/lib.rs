#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod bank;
mod channel;
mod clock;
mod config;
mod engine;
mod error;
mod mixer;
mod output;
mod utils;

// public, flat re-exports
pub use error::Error;

pub use channel::{ChannelState, WaveBuffer};
pub use clock::EngineCallback;
pub use config::{
    EngineConfig, DEFAULT_FRAGMENT_COUNT, DEFAULT_FRAGMENT_SIZE, DEFAULT_RATE_MULTIPLIER,
    DEFAULT_SAMPLE_RATE,
};
pub use engine::ChipEngine;

#[cfg(feature = "wav-output")]
pub use output::wav::WavOutput;

// public mods
pub mod noise;
