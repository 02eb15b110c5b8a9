use crate::error::ConfigError;
use rand::Rng;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Every shape an [Oscillator](struct@crate::oscillator::Oscillator) can take.
///
/// The declaration order is the cycling order used by [`next`](fn@WaveShape::next): after
/// `Noise` it wraps back to `Sine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveShape {
    #[default]
    Sine,
    Triangle,
    Square,
    Sawtooth,
    Pulse,
    Noise,
}

impl WaveShape {
    pub const ALL: [WaveShape; 6] = [
        WaveShape::Sine,
        WaveShape::Triangle,
        WaveShape::Square,
        WaveShape::Sawtooth,
        WaveShape::Pulse,
        WaveShape::Noise,
    ];

    /// The shape following this one, wrapping after the last.
    pub fn next(self) -> Self {
        match self {
            Self::Sine => Self::Triangle,
            Self::Triangle => Self::Square,
            Self::Square => Self::Sawtooth,
            Self::Sawtooth => Self::Pulse,
            Self::Pulse => Self::Noise,
            Self::Noise => Self::Sine,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Triangle => "triangle",
            Self::Square => "square",
            Self::Sawtooth => "sawtooth",
            Self::Pulse => "pulse",
            Self::Noise => "noise",
        }
    }

    /// Unit-amplitude value of the shape at `time` seconds.
    ///
    /// # Arguments
    /// * `time` - position in seconds. Negative values are valid.
    /// * `frequency` - in Hz. Must be greater than zero, the output is meaningless otherwise.
    /// * `duty_cycle` - fraction of the period spent high. Only read by `Pulse`.
    /// * `rng` - random source. Only read by `Noise`, which draws twice per call.
    pub fn sample<R: Rng + ?Sized>(
        self,
        time: f64,
        frequency: f64,
        duty_cycle: f64,
        rng: &mut R,
    ) -> f64 {
        match self {
            Self::Sine => (2.0 * PI * frequency * time).sin(),
            Self::Square => {
                if (2.0 * PI * frequency * time).sin() >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Pulse => {
                let period = 1.0 / frequency;
                let phase = (time - (time / period).floor() * period) / period;
                if phase <= duty_cycle {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Sawtooth => 2.0 * saw_core(time * frequency),
            Self::Triangle => (2.0 * saw_core(time * frequency)).abs() * 2.0 - 1.0,
            // Difference of two uniforms: zero mean, triangular distribution in (-1, 1)
            Self::Noise => rng.gen::<f64>() - rng.gen::<f64>(),
        }
    }
}

/// Distance from `cycles` to the nearest whole cycle, in [-0.5, 0.5).
fn saw_core(cycles: f64) -> f64 {
    cycles - (cycles + 0.5).floor()
}

impl fmt::Display for WaveShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WaveShape {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" | "sin" => Ok(Self::Sine),
            "triangle" | "tri" => Ok(Self::Triangle),
            "square" | "sqr" => Ok(Self::Square),
            "sawtooth" | "saw" => Ok(Self::Sawtooth),
            "pulse" => Ok(Self::Pulse),
            "noise" => Ok(Self::Noise),
            _ => Err(ConfigError::UnknownWave(s.to_string())),
        }
    }
}
