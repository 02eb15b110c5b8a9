mod oscillator;
mod wave_shape;

pub use oscillator::{note_to_frequency, Oscillator, OscillatorBuilder, OscillatorParams};
pub use wave_shape::WaveShape;
