use thiserror::Error;

/// Problems found while building or loading a session. These are reported before any audio
/// is produced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Sample rate {0} Hz out of range [8000, 48000]")]
    SampleRate(u32),
    #[error("Invalid channel count {0}, only mono (1) and stereo (2) are supported")]
    Channels(i64),
    #[error("Buffer size must hold at least one frame")]
    EmptyBuffer,
    #[error("Low-water mark must be at least 1")]
    LowWaterMark,
    #[error("Parameter {name} out of range: {value}")]
    Parameter { name: &'static str, value: f64 },
    #[error("Unknown wave shape '{0}'")]
    UnknownWave(String),
    #[error("Unsupported session version {found}, expected {expected}")]
    Version { found: f64, expected: f64 },
    #[error("Invalid value for key '{0}'")]
    InvalidKey(&'static str),
    #[error("Malformed YAML: {0}")]
    Yaml(#[from] yaml_rust::ScanError),
    #[error("Empty session document")]
    EmptyDocument,
    #[error("Could not read session file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by the audio device. The core holds no retry logic, they travel up to
/// the host as they are.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SinkError {
    #[error("No output device available")]
    Unavailable,
    #[error("No device configuration matches {channels} channel(s) at {sample_rate} Hz")]
    NoMatchingConfig { channels: u16, sample_rate: u32 },
    #[error("Device queue full: {requested} bytes requested, {free} free")]
    Overflow { requested: usize, free: usize },
    #[error("Buffer rejected by device: {0}")]
    Rejected(String),
    #[error("Stream error: {0}")]
    Stream(String),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SynthError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}
