use crate::buffer::{self, WorkingBuffer};
use crate::clock::SampleClock;
use crate::config::{SessionConfig, VoiceConfig};
use crate::control::{route, Command, Voice};
use crate::error::{ConfigError, SinkError, SynthError};
use crate::oscillator::{OscillatorBuilder, OscillatorParams};
use crate::pcm::PcmEncoder;
use crossbeam::channel::{unbounded, Receiver, Sender};
#[cfg(feature = "verbose_buffers")]
use simplelog::debug;
use simplelog::{info, warn};

/// Queue depth the controller keeps in the device unless told otherwise.
pub const DEFAULT_LOW_WATER_MARK: usize = 3;

/// What the synthesizer needs from an audio output device.
///
/// The device consumes buffers on its own timeline. The synthesizer only looks at how many
/// buffers are still waiting and submits new ones, in generation order.
pub trait AudioSink {
    /// Buffers submitted but not yet fully played.
    fn pending_buffer_count(&self) -> usize;

    /// Hands a complete PCM buffer over to the device. May block; it is the only point where
    /// generation can be suspended.
    fn submit(&mut self, bytes: Vec<u8>) -> Result<(), SinkError>;

    fn play(&mut self) -> Result<(), SinkError>;

    fn pause(&mut self) -> Result<(), SinkError>;

    fn is_playing(&self) -> bool;

    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;
}

/// Keeps the device queue topped up.
///
/// Owns both voices, the session clock and the reusable working buffer. Every host tick
/// it generates buffers until the device holds at least `low_water_mark` of them.
///
/// Parameter changes come in through the [Command] channel (see
/// [`controls`](fn@StreamingController::controls)). They are drained before each buffer is
/// generated, so one buffer never mixes old and new values.
pub struct StreamingController {
    left: Voice,
    right: Voice,
    clock: SampleClock,
    working: WorkingBuffer,
    encoder: PcmEncoder,
    sample_rate: u32,
    low_water_mark: usize,
    commands_tx: Sender<Command>,
    commands_rx: Receiver<Command>,
    buffers_generated: u64,
}

impl StreamingController {
    /// Builds the voices described by `config` and an idle controller around them.
    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let left = build_voice("Left", &config.left)?;
        let right = build_voice("Right", &config.right)?;

        let controller = Self::new(left, right, config);

        info!("<b>Streaming controller ready</>");
        info!("  |_ sample rate: {} Hz", controller.sample_rate);
        info!("  |_ channels: {}", controller.encoder.channels());
        info!("  |_ byte order: {:?}", controller.encoder.byte_order());
        info!("  |_ buffer size: {} frames", controller.working.frames());
        info!("  |_ low-water mark: {} buffers", controller.low_water_mark);

        Ok(controller)
    }

    /// Uses already built voices. Frequencies follow the voices' notes.
    pub fn new(left: Voice, right: Voice, config: &SessionConfig) -> Self {
        let (commands_tx, commands_rx) = unbounded();
        Self {
            left,
            right,
            clock: SampleClock::new(),
            working: WorkingBuffer::new(config.buffer_size),
            encoder: PcmEncoder::new(config.channels.get_amt() as usize, config.byte_order),
            sample_rate: config.sample_rate,
            low_water_mark: config.low_water_mark,
            commands_tx,
            commands_rx,
            buffers_generated: 0,
        }
    }

    /// A sender for parameter changes. It can be moved to another thread.
    pub fn controls(&self) -> Sender<Command> {
        self.commands_tx.clone()
    }

    /// One host update: tops the device queue up to the low-water mark.
    ///
    /// Returns how many buffers were submitted. Device errors are returned as they are, the
    /// buffer that failed is not retried.
    ///
    /// # Panics
    /// If the sink's channel count or sample rate differs from the session's.
    pub fn tick<S: AudioSink + ?Sized>(&mut self, sink: &mut S) -> Result<usize, SynthError> {
        assert_eq!(
            sink.channels() as usize,
            self.encoder.channels(),
            "Audio sink channel count differs from the session"
        );
        assert_eq!(
            sink.sample_rate(),
            self.sample_rate,
            "Audio sink sample rate differs from the session"
        );

        let mut submitted = 0;
        self.apply_pending(sink)?;

        while sink.pending_buffer_count() < self.low_water_mark {
            let bytes = self.next_buffer();

            #[cfg(feature = "verbose_buffers")]
            {
                debug!(
                    "<b>Buffer <cyan>#{}</> <b>({} bytes), queue: {}</>",
                    self.buffers_generated,
                    bytes.len(),
                    sink.pending_buffer_count()
                );
            }

            sink.submit(bytes)?;
            submitted += 1;
            self.apply_pending(sink)?;
        }

        Ok(submitted)
    }

    /// Renders and encodes the next buffer, advancing the clock by one buffer length.
    pub fn next_buffer(&mut self) -> Vec<u8> {
        buffer::fill(
            &mut self.working,
            self.left.oscillator_mut(),
            self.right.oscillator_mut(),
            &mut self.clock,
            self.sample_rate,
        );
        self.buffers_generated += 1;
        self.encoder.encode(&self.working)
    }

    /// Applies a single command right away. Playback toggling goes to `sink`.
    pub fn apply<S: AudioSink + ?Sized>(
        &mut self,
        command: &Command,
        sink: &mut S,
    ) -> Result<(), SinkError> {
        match command {
            Command::TogglePlayback => {
                if sink.is_playing() {
                    info!("<b>Playback <yellow>paused</>");
                    sink.pause()
                } else {
                    info!("<b>Playback <green>resumed</>");
                    sink.play()
                }
            }
            _ => {
                route(command, &mut self.left, &mut self.right);
                Ok(())
            }
        }
    }

    fn apply_pending<S: AudioSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SinkError> {
        while let Ok(command) = self.commands_rx.try_recv() {
            if let Err(err) = self.apply(&command, sink) {
                warn!("<b>Command <yellow>failed</><b>: {}</>", err);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Parameters of the left voice, for displays sampling the wave on their own timeline.
    pub fn left_params(&self) -> OscillatorParams {
        self.left.oscillator().params()
    }

    /// Parameters of the right voice, for displays sampling the wave on their own timeline.
    pub fn right_params(&self) -> OscillatorParams {
        self.right.oscillator().params()
    }

    /// Playback time reached by the generated audio, in seconds.
    pub fn clock_time(&self) -> f64 {
        self.clock.get_time()
    }

    pub fn buffers_generated(&self) -> u64 {
        self.buffers_generated
    }
}

fn build_voice(name: &str, voice: &VoiceConfig) -> Result<Voice, ConfigError> {
    let mut builder = OscillatorBuilder::new()
        .with_name(name)
        .with_wave(voice.wave)
        .with_amplitude(voice.amplitude)
        .with_duty_cycle(voice.duty_cycle);
    if let Some(seed) = voice.seed {
        builder = builder.with_seed(seed);
    }
    Ok(Voice::new(builder.build()?, voice.note))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Channels;
    use crate::control::ChannelSelector;
    use crate::oscillator::WaveShape;
    use crate::pcm::{encoded_len, ByteOrder};
    use std::collections::VecDeque;

    /// In-memory device: a queue of buffers that only shrinks when told to.
    struct MockSink {
        queue: VecDeque<Vec<u8>>,
        played: Vec<Vec<u8>>,
        playing: bool,
        reject: bool,
        channels: u16,
    }

    impl MockSink {
        fn new(channels: u16) -> Self {
            Self {
                queue: VecDeque::new(),
                played: vec![],
                playing: true,
                reject: false,
                channels,
            }
        }

        fn consume(&mut self, buffers: usize) {
            for _ in 0..buffers {
                if let Some(buffer) = self.queue.pop_front() {
                    self.played.push(buffer);
                }
            }
        }
    }

    impl AudioSink for MockSink {
        fn pending_buffer_count(&self) -> usize {
            self.queue.len()
        }

        fn submit(&mut self, bytes: Vec<u8>) -> Result<(), SinkError> {
            if self.reject {
                return Err(SinkError::Rejected("mock".to_string()));
            }
            self.queue.push_back(bytes);
            Ok(())
        }

        fn play(&mut self) -> Result<(), SinkError> {
            self.playing = true;
            Ok(())
        }

        fn pause(&mut self) -> Result<(), SinkError> {
            self.playing = false;
            Ok(())
        }

        fn is_playing(&self) -> bool {
            self.playing
        }

        fn sample_rate(&self) -> u32 {
            44_100
        }

        fn channels(&self) -> u16 {
            self.channels
        }
    }

    fn config(buffer_size: usize) -> SessionConfig {
        SessionConfig {
            buffer_size,
            byte_order: ByteOrder::LittleEndian,
            left: VoiceConfig {
                seed: Some(1),
                ..VoiceConfig::default()
            },
            right: VoiceConfig {
                wave: WaveShape::Square,
                seed: Some(2),
                ..VoiceConfig::default()
            },
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_tick_fills_to_low_water_mark() {
        let mut controller = StreamingController::from_config(&config(128)).unwrap();
        let mut sink = MockSink::new(2);

        assert_eq!(controller.tick(&mut sink).unwrap(), DEFAULT_LOW_WATER_MARK);
        assert_eq!(sink.pending_buffer_count(), DEFAULT_LOW_WATER_MARK);
        assert!(sink.queue.iter().all(|b| b.len() == encoded_len(2, 128)));

        // Nothing consumed, nothing to do
        assert_eq!(controller.tick(&mut sink).unwrap(), 0);

        sink.consume(2);
        assert_eq!(controller.tick(&mut sink).unwrap(), 2);
        assert!(sink.pending_buffer_count() >= DEFAULT_LOW_WATER_MARK);
    }

    #[test]
    fn test_queue_never_below_mark_after_tick() {
        let mut controller = StreamingController::from_config(&config(64)).unwrap();
        let mut sink = MockSink::new(2);

        for round in 0..50 {
            sink.consume(round % 4);
            controller.tick(&mut sink).unwrap();
            assert!(
                sink.pending_buffer_count() >= DEFAULT_LOW_WATER_MARK,
                "Queue below mark after round {}",
                round
            );
        }
    }

    #[test]
    fn test_clock_follows_submitted_frames() {
        let frames = 441;
        let mut controller = StreamingController::from_config(&config(frames)).unwrap();
        let mut sink = MockSink::new(2);

        let mut submitted = 0;
        for _ in 0..20 {
            submitted += controller.tick(&mut sink).unwrap();
            sink.consume(3);
        }

        let expected = (submitted * frames) as f64 / 44_100.0;
        assert_eq!(controller.buffers_generated(), submitted as u64);
        assert!(
            (controller.clock_time() - expected).abs() < 1e-9,
            "Clock at {}, expected {}",
            controller.clock_time(),
            expected
        );
    }

    #[test]
    fn test_buffers_submitted_in_order() {
        let mut controller = StreamingController::from_config(&config(32)).unwrap();
        let mut reference = StreamingController::from_config(&config(32)).unwrap();
        let mut sink = MockSink::new(2);

        for _ in 0..5 {
            controller.tick(&mut sink).unwrap();
            sink.consume(3);
        }

        let expected: Vec<Vec<u8>> = (0..sink.played.len())
            .map(|_| reference.next_buffer())
            .collect();
        assert_eq!(sink.played, expected);
    }

    #[test]
    fn test_commands_apply_at_buffer_boundary() {
        let mut controller = StreamingController::from_config(&config(64)).unwrap();
        let mut sink = MockSink::new(2);
        let controls = controller.controls();

        controls
            .send(Command::ChangeAmplitude {
                target: ChannelSelector::Both,
                delta: -1.0,
            })
            .unwrap();
        controller.tick(&mut sink).unwrap();

        // Silenced before the first buffer was generated
        for buffer in sink.queue.iter() {
            assert!(buffer.iter().all(|b| *b == 0), "Buffer is not silent");
        }
        assert_eq!(controller.left_params().amplitude, 0.0);
        assert_eq!(controller.right_params().amplitude, 0.0);
    }

    #[test]
    fn test_command_from_other_thread() {
        let mut controller = StreamingController::from_config(&config(64)).unwrap();
        let mut sink = MockSink::new(2);
        let controls = controller.controls();

        std::thread::spawn(move || {
            controls
                .send(Command::CycleWave {
                    target: ChannelSelector::Left,
                })
                .unwrap();
        })
        .join()
        .unwrap();

        controller.tick(&mut sink).unwrap();
        assert_eq!(controller.left_params().wave, WaveShape::Triangle);
        assert_eq!(controller.right_params().wave, WaveShape::Square);
    }

    #[test]
    fn test_toggle_playback() {
        let mut controller = StreamingController::from_config(&config(16)).unwrap();
        let mut sink = MockSink::new(2);

        controller.apply(&Command::TogglePlayback, &mut sink).unwrap();
        assert!(!sink.is_playing());
        controller.apply(&Command::TogglePlayback, &mut sink).unwrap();
        assert!(sink.is_playing());
    }

    #[test]
    fn test_sink_errors_propagate() {
        let mut controller = StreamingController::from_config(&config(16)).unwrap();
        let mut sink = MockSink::new(2);
        sink.reject = true;

        let result = controller.tick(&mut sink);
        assert!(matches!(
            result,
            Err(SynthError::Sink(SinkError::Rejected(_)))
        ));
    }

    #[test]
    fn test_mono_session() {
        let session = SessionConfig {
            channels: Channels::Mono,
            ..config(100)
        };
        let mut controller = StreamingController::from_config(&session).unwrap();
        let mut sink = MockSink::new(1);

        controller.tick(&mut sink).unwrap();
        assert!(sink.queue.iter().all(|b| b.len() == encoded_len(1, 100)));
    }

    #[test]
    #[should_panic]
    fn test_channel_mismatch_is_fatal() {
        let mut controller = StreamingController::from_config(&config(16)).unwrap();
        let mut sink = MockSink::new(1);
        let _ = controller.tick(&mut sink);
    }

    #[test]
    #[should_panic(expected = "sample rate differs")]
    fn test_sample_rate_mismatch_is_fatal() {
        let session = SessionConfig {
            sample_rate: 8_000,
            ..config(100)
        };
        let mut controller = StreamingController::from_config(&session).unwrap();
        let mut sink = MockSink::new(2);
        let _ = controller.tick(&mut sink);
    }

    #[test]
    fn test_renderer_does_not_touch_clock() {
        let mut controller = StreamingController::from_config(&config(16)).unwrap();
        let mut sink = MockSink::new(2);
        controller.tick(&mut sink).unwrap();
        let time = controller.clock_time();

        let params = controller.left_params();
        let mut rng = rand::thread_rng();
        for i in 0..1_000 {
            params.evaluate(i as f64 * 0.001, &mut rng);
        }

        assert_eq!(controller.clock_time(), time);
    }
}
