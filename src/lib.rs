//! Two-voice oscillator synthesizer streaming 16-bit PCM to an audio device.

pub mod back_end;
pub mod buffer;
pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod oscillator;
pub mod pcm;
pub mod streaming;

pub use config::SessionConfig;
pub use control::{ChannelSelector, Command};
pub use error::{ConfigError, SinkError, SynthError};
pub use streaming::{AudioSink, StreamingController};
