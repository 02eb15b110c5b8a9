use super::WaveShape;
use crate::error::ConfigError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Maps a note index, in semitones relative to A4, to its frequency in Hz.
///
/// `440 · 2^(note / 12)`, so note 0 is 440 Hz and note 12 is 880 Hz.
pub fn note_to_frequency(note: i32) -> f64 {
    440.0 * 2f64.powf(note as f64 / 12.0)
}

/// A copy of the four values that define what an oscillator sounds like.
///
/// Evaluation through a snapshot never touches the audio clock nor the oscillator's own
/// random source, which makes it the right tool for anything that wants to look at the
/// wave without disturbing playback (a scope, a plot, a test).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorParams {
    pub wave: WaveShape,
    pub amplitude: f64,
    pub frequency: f64,
    pub duty_cycle: f64,
}

impl OscillatorParams {
    /// `A · shape(t)`. Deterministic for every shape but `Noise`, which draws from `rng`.
    pub fn evaluate<R: Rng + ?Sized>(&self, time: f64, rng: &mut R) -> f64 {
        self.wave
            .sample(time, self.frequency, self.duty_cycle, rng)
            * self.amplitude
    }
}

/// The oscillator is the voice of one channel. It does generate a raw signal following the
/// shape and values held in its parameters.
///
/// # Usage
/// To generate a **new oscillator**, use the [OscillatorBuilder] instead.
///
/// An oscillator lives as long as the session does. It is reconfigured in place with the
/// setters, never recreated.
///
/// # Parameters
/// * **Amplitude (A)**: translates to volume. Ranges from 0 to 1.
/// * **Frequency (f)**: translates to tone. Any positive value in Hz.
/// * **Duty cycle**: portion of the period a pulse wave spends high. Ranges from 0 to 1.
/// * **Wave**: one of the six [WaveShape]s.
///
/// The setters do not validate. Callers clamp amplitude and duty cycle before applying them
/// and keep the frequency positive.
pub struct Oscillator {
    params: OscillatorParams,
    /// Randomness for the noise shape. Seedable for reproducible output.
    rng: StdRng,
    /// Name of the oscillator (debugging)
    name: String,
}

impl Oscillator {
    /// Value of the wave at `time` seconds.
    pub fn evaluate(&mut self, time: f64) -> f64 {
        self.params.evaluate(time, &mut self.rng)
    }

    /// Snapshot of the current parameters.
    pub fn params(&self) -> OscillatorParams {
        self.params
    }

    pub fn set_amplitude(&mut self, amp: f64) {
        self.params.amplitude = amp;
    }

    pub fn set_frequency(&mut self, freq: f64) {
        self.params.frequency = freq;
    }

    pub fn set_duty_cycle(&mut self, duty: f64) {
        self.params.duty_cycle = duty;
    }

    pub fn set_wave(&mut self, wave: WaveShape) {
        self.params.wave = wave;
    }

    /// Moves on to the next wave shape, wrapping after the last one.
    pub fn next_wave(&mut self) -> WaveShape {
        self.params.wave = self.params.wave.next();
        self.params.wave
    }

    pub fn get_amplitude(&self) -> f64 {
        self.params.amplitude
    }

    pub fn get_frequency(&self) -> f64 {
        self.params.frequency
    }

    pub fn get_duty_cycle(&self) -> f64 {
        self.params.duty_cycle
    }

    pub fn get_wave(&self) -> WaveShape {
        self.params.wave
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }
}

/// The [OscillatorBuilder] is the proper way of generating an [Oscillator].
/// # Usage
/// ```rust
/// use dual_scope::oscillator::{OscillatorBuilder, WaveShape};
///
/// let osc = OscillatorBuilder::new().build().unwrap(); // Default oscillator
///
/// let osc = OscillatorBuilder::new() // With most values
///     .with_wave(WaveShape::Pulse)
///     .with_amplitude(0.5)
///     .with_frequency(220.0)
///     .with_duty_cycle(0.25)
///     .with_seed(42)
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct OscillatorBuilder {
    wave: Option<WaveShape>,
    amplitude: Option<f64>,
    frequency: Option<f64>,
    duty_cycle: Option<f64>,
    seed: Option<u64>,
    name: Option<String>,
}

impl OscillatorBuilder {
    /// Sets the defaults for the oscillator (no values).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wave(mut self, wave: WaveShape) -> Self {
        self.wave = Some(wave);
        self
    }

    pub fn with_amplitude(mut self, amp: f64) -> Self {
        self.amplitude = Some(amp);
        self
    }

    pub fn with_frequency(mut self, freq: f64) -> Self {
        self.frequency = Some(freq);
        self
    }

    pub fn with_duty_cycle(mut self, duty: f64) -> Self {
        self.duty_cycle = Some(duty);
        self
    }

    /// Seeds the noise source. Without a seed the oscillator draws from system entropy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Tries to generate an Oscillator from the given configuration.
    ///
    /// # Default values:
    /// * Wave: sine
    /// * Frequency: 440 Hz
    /// * Amplitude: 1.0
    /// * Duty cycle: 0.5
    ///
    /// # Expected errors
    /// * Amplitude or duty cycle outside [0, 1].
    /// * Frequency not greater than zero.
    pub fn build(self) -> Result<Oscillator, ConfigError> {
        let name = format!("{} {}", self.name.unwrap_or_default(), "Oscillator")
            .trim()
            .to_string();
        let wave = self.wave.unwrap_or_default();
        let amplitude = self.amplitude.unwrap_or(1.0);
        let frequency = self.frequency.unwrap_or(440.0);
        let duty_cycle = self.duty_cycle.unwrap_or(0.5);

        if !(0.0..=1.0).contains(&amplitude) {
            return Err(ConfigError::Parameter {
                name: "amplitude",
                value: amplitude,
            });
        }

        if !(0.0..=1.0).contains(&duty_cycle) {
            return Err(ConfigError::Parameter {
                name: "duty-cycle",
                value: duty_cycle,
            });
        }

        if !(frequency > 0.0 && frequency.is_finite()) {
            return Err(ConfigError::Parameter {
                name: "frequency",
                value: frequency,
            });
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Oscillator {
            params: OscillatorParams {
                wave,
                amplitude,
                frequency,
                duty_cycle,
            },
            rng,
            name,
        })
    }
}
