/// A structure to keep both voices synchronized with the playback time.
///
/// There is a single clock per session. It starts at zero, only moves forward and is never
/// reset. The [buffer filler](fn@crate::buffer::fill) is the only place allowed to advance it,
/// one sample period per emitted frame.
#[derive(Debug, Default)]
pub struct SampleClock {
    time: f64,
}

impl SampleClock {
    pub fn new() -> Self {
        Self { time: 0.0 }
    }

    /// Elapsed playback time in seconds.
    pub fn get_time(&self) -> f64 {
        self.time
    }

    /// Moves the clock forward by one sample period, `1 / sample_rate` seconds.
    pub fn advance(&mut self, sample_rate: u32) {
        self.time += 1.0 / sample_rate as f64;
    }
}
