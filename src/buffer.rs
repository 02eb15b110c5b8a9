use crate::clock::SampleClock;
use crate::oscillator::Oscillator;

/// Index of the left voice inside a [WorkingBuffer].
pub const LEFT: usize = 0;
/// Index of the right voice inside a [WorkingBuffer].
pub const RIGHT: usize = 1;

/// Per-channel float samples for one block, before encoding.
///
/// Always two rows (left, right) of `frames` samples each. Values are conceptually within
/// [-1, 1] but they are not clamped here, that is the encoder's job. The buffer is reused from
/// block to block, every fill overwrites all of it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingBuffer {
    channels: [Vec<f32>; 2],
}

impl WorkingBuffer {
    pub fn new(frames: usize) -> Self {
        Self {
            channels: [vec![0.0; frames], vec![0.0; frames]],
        }
    }

    /// Builds a buffer from already generated rows. Both rows must be equally long.
    pub fn from_channels(left: Vec<f32>, right: Vec<f32>) -> Self {
        assert_eq!(
            left.len(),
            right.len(),
            "Working buffer channels must have the same length"
        );
        Self {
            channels: [left, right],
        }
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels[LEFT].len()
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }
}

/// Renders one block: for every frame both voices are evaluated at the *same* clock time,
/// then the clock moves forward one sample period.
///
/// This is the only place where the session clock advances.
pub fn fill(
    buffer: &mut WorkingBuffer,
    left: &mut Oscillator,
    right: &mut Oscillator,
    clock: &mut SampleClock,
    sample_rate: u32,
) {
    let [left_samples, right_samples] = &mut buffer.channels;

    for (l, r) in left_samples.iter_mut().zip(right_samples.iter_mut()) {
        let time = clock.get_time();
        *l = left.evaluate(time) as f32;
        *r = right.evaluate(time) as f32;
        clock.advance(sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oscillator::{OscillatorBuilder, WaveShape};

    const SAMPLE_RATE: u32 = 44_100;

    fn voice(wave: WaveShape, frequency: f64) -> Oscillator {
        OscillatorBuilder::new()
            .with_wave(wave)
            .with_frequency(frequency)
            .with_seed(5)
            .build()
            .unwrap()
    }

    #[test]
    fn test_fill_matches_direct_evaluation() {
        let mut left = voice(WaveShape::Sine, 440.0);
        let mut right = voice(WaveShape::Triangle, 330.0);
        let mut clock = SampleClock::new();
        let mut buffer = WorkingBuffer::new(64);

        fill(&mut buffer, &mut left, &mut right, &mut clock, SAMPLE_RATE);

        let mut reference_clock = SampleClock::new();
        let mut l_ref = voice(WaveShape::Sine, 440.0);
        let mut r_ref = voice(WaveShape::Triangle, 330.0);
        for i in 0..64 {
            let time = reference_clock.get_time();
            assert_eq!(
                buffer.channel(LEFT)[i],
                l_ref.evaluate(time) as f32,
                "Left mismatch at {}",
                i
            );
            assert_eq!(
                buffer.channel(RIGHT)[i],
                r_ref.evaluate(time) as f32,
                "Right mismatch at {}",
                i
            );
            reference_clock.advance(SAMPLE_RATE);
        }
        assert_eq!(clock.get_time(), reference_clock.get_time());
    }

    #[test]
    fn test_channels_share_time() {
        // Same configuration on both sides must give identical rows
        let mut left = voice(WaveShape::Sawtooth, 123.0);
        let mut right = voice(WaveShape::Sawtooth, 123.0);
        let mut clock = SampleClock::new();
        let mut buffer = WorkingBuffer::new(256);

        fill(&mut buffer, &mut left, &mut right, &mut clock, SAMPLE_RATE);

        assert_eq!(buffer.channel(LEFT), buffer.channel(RIGHT));
    }

    #[test]
    fn test_consecutive_fills_continue_the_wave() {
        let mut left = voice(WaveShape::Sine, 440.0);
        let mut right = voice(WaveShape::Sine, 440.0);
        let mut clock = SampleClock::new();

        let mut whole = WorkingBuffer::new(200);
        fill(&mut whole, &mut left, &mut right, &mut clock, SAMPLE_RATE);

        let mut clock = SampleClock::new();
        let mut first = WorkingBuffer::new(100);
        let mut second = WorkingBuffer::new(100);
        fill(&mut first, &mut left, &mut right, &mut clock, SAMPLE_RATE);
        fill(&mut second, &mut left, &mut right, &mut clock, SAMPLE_RATE);

        let joined: Vec<f32> = first
            .channel(LEFT)
            .iter()
            .chain(second.channel(LEFT))
            .copied()
            .collect();
        assert_eq!(joined, whole.channel(LEFT));
    }

    #[test]
    #[should_panic]
    fn test_uneven_rows() {
        WorkingBuffer::from_channels(vec![0.0; 3], vec![0.0; 4]);
    }
}
