use crate::error::ConfigError;
use crate::oscillator::WaveShape;
use crate::pcm::ByteOrder;
use crate::streaming::DEFAULT_LOW_WATER_MARK;
use log::LevelFilter;
use simplelog::{info, warn};
use std::fs;
use std::path::Path;
use yaml_rust::{Yaml, YamlLoader};

/// Session file version understood by this build.
pub const SESSION_VERSION: f64 = 0.1;

pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 48_000;

/// An enumeration for specifying an amount of channels. Only mono and stereo are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    /// A single channel, fed by the left voice
    Mono,
    /// Two channels
    Stereo,
}

impl Channels {
    /// Translates the `enum` to a value for ease.
    /// # Example
    /// ```
    /// use dual_scope::config::Channels;
    ///
    /// let x: u16 = Channels::Stereo.get_amt(); // returns 2
    /// assert_eq!(x, 2);
    /// ```
    pub fn get_amt(&self) -> u16 {
        match *self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

impl TryFrom<i64> for Channels {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Mono),
            2 => Ok(Self::Stereo),
            other => Err(ConfigError::Channels(other)),
        }
    }
}

/// Starting values for one voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    pub wave: WaveShape,
    pub amplitude: f64,
    /// Semitones relative to A4 (440 Hz).
    pub note: i32,
    pub duty_cycle: f64,
    /// Noise seed. Entropy is used when absent.
    pub seed: Option<u64>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            wave: WaveShape::Sine,
            amplitude: 0.5,
            note: 0,
            duty_cycle: 0.5,
            seed: None,
        }
    }
}

/// Everything fixed at session start. The sample rate, the channel count and the buffer
/// size never change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub sample_rate: u32,
    pub channels: Channels,
    /// Frames per generated buffer.
    pub buffer_size: usize,
    /// Minimum number of buffers kept queued in the device.
    pub low_water_mark: usize,
    /// Period of the host update loop.
    pub tick_ms: u64,
    pub byte_order: ByteOrder,
    pub log_level: LevelFilter,
    pub left: VoiceConfig,
    pub right: VoiceConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: Channels::Stereo,
            buffer_size: 512,
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            tick_ms: 10,
            byte_order: ByteOrder::native(),
            log_level: LevelFilter::Info,
            left: VoiceConfig::default(),
            right: VoiceConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Checks the ranges the rest of the crate relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }

        if self.buffer_size == 0 {
            return Err(ConfigError::EmptyBuffer);
        }

        if self.low_water_mark == 0 {
            return Err(ConfigError::LowWaterMark);
        }

        if self.tick_ms == 0 {
            return Err(ConfigError::InvalidKey("tick-ms"));
        }

        for voice in [&self.left, &self.right] {
            if !(0.0..=1.0).contains(&voice.amplitude) {
                return Err(ConfigError::Parameter {
                    name: "amplitude",
                    value: voice.amplitude,
                });
            }
            if !(0.0..=1.0).contains(&voice.duty_cycle) {
                return Err(ConfigError::Parameter {
                    name: "duty-cycle",
                    value: voice.duty_cycle,
                });
            }
        }

        Ok(())
    }

    /// Reads a session file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("<b>Loading session from <red>{}</><b>.</>", path.display());
        let yaml = fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Parses a session document. Missing keys keep their default value.
    ///
    /// ```yaml
    /// version: 0.1
    /// sample-rate: 44100
    /// channels: 2
    /// buffer-size: 512
    /// low-water-mark: 3
    /// tick-ms: 10
    /// byte-order: native
    /// log-level: info
    /// left:
    ///   wave: sine
    ///   amplitude: 0.5
    ///   note: 0
    ///   duty-cycle: 0.5
    /// right:
    ///   wave: pulse
    ///   note: -12
    ///   seed: 7
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let docs = YamlLoader::load_from_str(yaml)?;
        let doc = docs.first().ok_or(ConfigError::EmptyDocument)?;

        let version = number(&doc["version"], "version")?.unwrap_or(0.0);
        if version != SESSION_VERSION {
            return Err(ConfigError::Version {
                found: version,
                expected: SESSION_VERSION,
            });
        }
        info!(
            "<b>Using <magenta>session parsing</> <b>version: <b><cyan>{}</>",
            version
        );

        let mut config = Self::default();

        if let Some(rate) = integer(&doc["sample-rate"], "sample-rate")? {
            config.sample_rate =
                u32::try_from(rate).map_err(|_| ConfigError::InvalidKey("sample-rate"))?;
        }
        if let Some(channels) = integer(&doc["channels"], "channels")? {
            config.channels = Channels::try_from(channels)?;
        }
        if let Some(size) = integer(&doc["buffer-size"], "buffer-size")? {
            config.buffer_size =
                usize::try_from(size).map_err(|_| ConfigError::InvalidKey("buffer-size"))?;
        }
        if let Some(mark) = integer(&doc["low-water-mark"], "low-water-mark")? {
            config.low_water_mark =
                usize::try_from(mark).map_err(|_| ConfigError::InvalidKey("low-water-mark"))?;
        }
        if let Some(tick) = integer(&doc["tick-ms"], "tick-ms")? {
            config.tick_ms = u64::try_from(tick).map_err(|_| ConfigError::InvalidKey("tick-ms"))?;
        }
        if let Some(order) = text(&doc["byte-order"], "byte-order")? {
            config.byte_order = match order.to_ascii_lowercase().as_str() {
                "native" => ByteOrder::native(),
                "little" | "le" => ByteOrder::LittleEndian,
                "big" | "be" => ByteOrder::BigEndian,
                _ => return Err(ConfigError::InvalidKey("byte-order")),
            };
        }
        if let Some(level) = text(&doc["log-level"], "log-level")? {
            config.log_level = level
                .parse()
                .map_err(|_| ConfigError::InvalidKey("log-level"))?;
        }

        config.left = voice(&doc["left"], "left")?;
        config.right = voice(&doc["right"], "right")?;

        config.validate()?;
        Ok(config)
    }
}

fn voice(yaml: &Yaml, key: &'static str) -> Result<VoiceConfig, ConfigError> {
    let mut voice = VoiceConfig::default();

    match yaml {
        Yaml::Hash(_) => {}
        Yaml::BadValue => {
            info!("No configuration found for the {} voice", key);
            return Ok(voice);
        }
        _ => return Err(ConfigError::InvalidKey(key)),
    }

    if let Some(wave) = text(&yaml["wave"], "wave")? {
        voice.wave = wave.parse()?;
    }
    if let Some(amplitude) = number(&yaml["amplitude"], "amplitude")? {
        voice.amplitude = amplitude;
    }
    if let Some(note) = integer(&yaml["note"], "note")? {
        voice.note = i32::try_from(note).map_err(|_| ConfigError::InvalidKey("note"))?;
    }
    if let Some(duty) = number(&yaml["duty-cycle"], "duty-cycle")? {
        voice.duty_cycle = duty;
    }
    if let Some(seed) = integer(&yaml["seed"], "seed")? {
        voice.seed = Some(seed as u64);
    }

    Ok(voice)
}

/// Reals and integers are both accepted where a number is expected.
fn number(yaml: &Yaml, key: &'static str) -> Result<Option<f64>, ConfigError> {
    match yaml {
        Yaml::Real(_) => yaml.as_f64().map(Some).ok_or(ConfigError::InvalidKey(key)),
        Yaml::Integer(x) => Ok(Some(*x as f64)),
        Yaml::BadValue => Ok(None), // not found
        _ => {
            warn!("<b>Invalid format for <yellow>{}</> <b>value.</>", key);
            Err(ConfigError::InvalidKey(key))
        }
    }
}

fn integer(yaml: &Yaml, key: &'static str) -> Result<Option<i64>, ConfigError> {
    match yaml {
        Yaml::Integer(x) => Ok(Some(*x)),
        Yaml::BadValue => Ok(None),
        _ => {
            warn!("<b>Invalid format for <yellow>{}</> <b>value.</>", key);
            Err(ConfigError::InvalidKey(key))
        }
    }
}

fn text(yaml: &Yaml, key: &'static str) -> Result<Option<String>, ConfigError> {
    match yaml {
        Yaml::String(s) => Ok(Some(s.clone())),
        Yaml::BadValue => Ok(None),
        _ => {
            warn!("<b>Invalid format for <yellow>{}</> <b>value.</>", key);
            Err(ConfigError::InvalidKey(key))
        }
    }
}
