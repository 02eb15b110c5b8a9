// This files contains the cpal side of the synthesizer: device negotiation and the sink
// feeding the output stream.

use crate::config::{Channels, SessionConfig};
use crate::error::SinkError;
use crate::pcm::{encoded_len, ByteOrder, BYTES_PER_SAMPLE};
use crate::streaming::AudioSink;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    Device, FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig,
    SupportedStreamConfig, SupportedStreamConfigRange,
};
use ringbuf::{Consumer, HeapRb, Producer, SharedRb};
use simplelog::{debug, error, info};
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Alias for the ring buffer consumer read by the device callback
pub type PcmConsumer = Consumer<u8, Arc<SharedRb<u8, Vec<MaybeUninit<u8>>>>>;
/// Alias for the ring buffer producer written by the synthesizer
pub type PcmProducer = Producer<u8, Arc<SharedRb<u8, Vec<MaybeUninit<u8>>>>>;

/// How many buffers fit in the ring between the synthesizer and the device, unless the
/// low-water mark asks for more.
pub const QUEUE_CAPACITY: usize = 8;

/// Looks up for a supported config able to play the session as it is.
///
/// # Arguments
/// * `device` - a `Device` from which to get the **supported configurations**.
/// * `sample_rate` - the session's `SampleRate`. It must fall inside the config's range.
/// * `channels` - the exact amount of channels of the session.
///
/// # Return
/// The matching `SupportedStreamConfig`, preferring float output, then 16-bit integers.
pub fn get_preferred_config(
    device: &Device,
    sample_rate: SampleRate,
    channels: Channels,
) -> Result<SupportedStreamConfig, SinkError> {
    let mut supported_configs = query_configurations(device, channels, sample_rate)?;
    supported_configs.sort_by_key(|config| format_rank(config.sample_format()));

    let range = supported_configs
        .into_iter()
        .next()
        .ok_or(SinkError::NoMatchingConfig {
            channels: channels.get_amt(),
            sample_rate: sample_rate.0,
        })?;
    let config = range.with_sample_rate(sample_rate);

    info!(
        "<b>Preferred config for <cyan>{}</>",
        device.name().unwrap_or_else(|_| "unknown device".to_string())
    );
    info!("  |_ channels: {}", config.channels());
    info!("  |_ sample_rate: {}", config.sample_rate().0);
    info!("  |_ buffer size: {:?}", config.buffer_size());
    info!("  |_ sample format: {:?}", config.sample_format());

    Ok(config)
}

/// Every output configuration of `device` with exactly `channels` channels whose range
/// contains `sample_rate`.
pub fn query_configurations(
    device: &Device,
    channels: Channels,
    sample_rate: SampleRate,
) -> Result<Vec<SupportedStreamConfigRange>, SinkError> {
    let supported_configs: Vec<SupportedStreamConfigRange> = device
        .supported_output_configs()
        .map_err(|err| SinkError::Stream(err.to_string()))?
        // Check the channel amount
        .filter(|config| config.channels() == channels.get_amt())
        // Check the sample rate
        .filter(|config| {
            config.min_sample_rate() <= sample_rate && sample_rate <= config.max_sample_rate()
        })
        .collect();

    debug!("<b>Configuration matches</>");
    for item in supported_configs.iter() {
        debug!("  |_ {:?}", item);
    }

    Ok(supported_configs)
}

fn format_rank(format: SampleFormat) -> u8 {
    match format {
        SampleFormat::F32 => 0,
        SampleFormat::I16 => 1,
        SampleFormat::U16 => 2,
        _ => u8::MAX,
    }
}

/// Producer half of the byte ring, counted in whole session buffers.
///
/// Only complete buffers go in. A buffer the device has started playing still counts as
/// pending until its last byte is gone.
pub struct PcmQueue {
    producer: PcmProducer,
    buffer_bytes: usize,
}

impl PcmQueue {
    /// A ring holding `capacity` buffers of `buffer_bytes` each, plus the consumer the device
    /// callback reads from.
    pub fn new(buffer_bytes: usize, capacity: usize) -> (Self, PcmConsumer) {
        let ring_buffer: HeapRb<u8> = HeapRb::new(buffer_bytes * capacity);
        let (producer, consumer) = ring_buffer.split();
        (
            Self {
                producer,
                buffer_bytes,
            },
            consumer,
        )
    }

    pub fn pending_buffer_count(&self) -> usize {
        self.producer.len().div_ceil(self.buffer_bytes)
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        if bytes.len() != self.buffer_bytes {
            return Err(SinkError::Rejected(format!(
                "expected {} bytes, got {}",
                self.buffer_bytes,
                bytes.len()
            )));
        }

        // All or nothing, a buffer is never queued partially
        let free = self.producer.free_len();
        if free < bytes.len() {
            return Err(SinkError::Overflow {
                requested: bytes.len(),
                free,
            });
        }

        self.producer.push_slice(bytes);
        Ok(())
    }
}

/// Audio sink backed by the default cpal output device.
///
/// Submitted PCM goes into a byte ring that the device callback drains two bytes at a time.
/// While paused the callback writes silence and leaves the ring untouched, so playback
/// resumes where it stopped. When the ring runs dry the callback writes silence too.
pub struct CpalSink {
    stream: Stream,
    queue: PcmQueue,
    playing: Arc<AtomicBool>,
    started: bool,
    sample_rate: u32,
    channels: u16,
}

impl CpalSink {
    /// Opens the default output device with the session's sample rate and channel count.
    /// The stream is created paused.
    pub fn open(session: &SessionConfig) -> Result<Self, SinkError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(SinkError::Unavailable)?;

        let supported = get_preferred_config(
            &device,
            SampleRate(session.sample_rate),
            session.channels,
        )?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        let buffer_bytes = encoded_len(session.channels.get_amt() as usize, session.buffer_size);
        let capacity = QUEUE_CAPACITY.max(session.low_water_mark + 1);
        let (queue, consumer) = PcmQueue::new(buffer_bytes, capacity);
        let playing = Arc::new(AtomicBool::new(false));

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(
                &device,
                &config,
                consumer,
                playing.clone(),
                session.byte_order,
            ),
            SampleFormat::I16 => build_stream::<i16>(
                &device,
                &config,
                consumer,
                playing.clone(),
                session.byte_order,
            ),
            SampleFormat::U16 => build_stream::<u16>(
                &device,
                &config,
                consumer,
                playing.clone(),
                session.byte_order,
            ),
            other => {
                return Err(SinkError::Stream(format!(
                    "Unsupported sample format {:?}",
                    other
                )))
            }
        }?;

        Ok(Self {
            stream,
            queue,
            playing,
            started: false,
            sample_rate: session.sample_rate,
            channels: session.channels.get_amt(),
        })
    }
}

impl AudioSink for CpalSink {
    fn pending_buffer_count(&self) -> usize {
        self.queue.pending_buffer_count()
    }

    fn submit(&mut self, bytes: Vec<u8>) -> Result<(), SinkError> {
        self.queue.push(&bytes)
    }

    fn play(&mut self) -> Result<(), SinkError> {
        if !self.started {
            self.stream
                .play()
                .map_err(|err| SinkError::Stream(err.to_string()))?;
            self.started = true;
        }
        self.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), SinkError> {
        self.playing.store(false, Ordering::Release);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut consumer: PcmConsumer,
    playing: Arc<AtomicBool>,
    byte_order: ByteOrder,
) -> Result<Stream, SinkError>
where
    T: SizedSample + FromSample<i16>,
{
    let err_fn = |err| error!("an error occurred on stream: {}", err);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if playing.load(Ordering::Acquire) {
                    write_pcm(data, &mut consumer, byte_order)
                } else {
                    write_silence(data)
                }
            },
            err_fn,
            None,
        )
        .map_err(|err| SinkError::Stream(err.to_string()))
}

/// Converts queued PCM into device samples. Missing data turns into silence.
fn write_pcm<T>(output: &mut [T], consumer: &mut PcmConsumer, byte_order: ByteOrder)
where
    T: Sample + FromSample<i16>,
{
    let mut pair = [0u8; BYTES_PER_SAMPLE];
    for sample in output.iter_mut() {
        *sample = if consumer.len() >= BYTES_PER_SAMPLE {
            consumer.pop_slice(&mut pair);
            T::from_sample(byte_order.from_bytes(pair))
        } else {
            T::EQUILIBRIUM
        };
    }
}

fn write_silence<T: Sample>(data: &mut [T]) {
    for sample in data.iter_mut() {
        *sample = Sample::EQUILIBRIUM;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(bytes: &[u8]) -> PcmConsumer {
        let ring_buffer: HeapRb<u8> = HeapRb::new(64);
        let (mut producer, consumer) = ring_buffer.split();
        producer.push_slice(bytes);
        consumer
    }

    #[test]
    fn test_write_pcm_decodes_samples() {
        let mut consumer = ring(&[0xFF, 0x7F, 0x00, 0x80, 0x00, 0x00]);
        let mut output = [1i16; 5];

        write_pcm(&mut output, &mut consumer, ByteOrder::LittleEndian);

        assert_eq!(output, [i16::MAX, i16::MIN, 0, 0, 0]);
        assert_eq!(consumer.len(), 0);
    }

    #[test]
    fn test_write_pcm_to_float() {
        let mut consumer = ring(&[0x7F, 0xFF, 0x80, 0x00]);
        let mut output = [0.5f32; 2];

        write_pcm(&mut output, &mut consumer, ByteOrder::BigEndian);

        assert!((output[0] - 1.0).abs() < 1e-4);
        assert_eq!(output[1], -1.0);
    }

    #[test]
    fn test_queue_counts_partly_played_buffers() {
        let (mut queue, mut consumer) = PcmQueue::new(4, 3);
        assert_eq!(queue.pending_buffer_count(), 0);

        queue.push(&[1, 2, 3, 4]).unwrap();
        queue.push(&[5, 6, 7, 8]).unwrap();
        assert_eq!(queue.pending_buffer_count(), 2);

        // Half of the first buffer played
        let mut played = [0u8; 2];
        consumer.pop_slice(&mut played);
        assert_eq!(queue.pending_buffer_count(), 2);

        consumer.pop_slice(&mut played);
        assert_eq!(queue.pending_buffer_count(), 1);
    }

    #[test]
    fn test_queue_overflow_queues_nothing() {
        let (mut queue, mut consumer) = PcmQueue::new(4, 2);
        queue.push(&[1, 2, 3, 4]).unwrap();
        queue.push(&[5, 6, 7, 8]).unwrap();

        let mut played = [0u8; 2];
        consumer.pop_slice(&mut played);

        let result = queue.push(&[9, 9, 9, 9]);
        assert!(matches!(
            result,
            Err(SinkError::Overflow {
                requested: 4,
                free: 2
            })
        ));
        assert_eq!(consumer.len(), 6, "Nothing from the rejected buffer was queued");
        assert_eq!(queue.pending_buffer_count(), 2);
    }

    #[test]
    fn test_queue_rejects_wrong_length() {
        let (mut queue, consumer) = PcmQueue::new(4, 2);

        assert!(matches!(
            queue.push(&[1, 2, 3]),
            Err(SinkError::Rejected(_))
        ));
        assert!(matches!(
            queue.push(&[1, 2, 3, 4, 5]),
            Err(SinkError::Rejected(_))
        ));
        assert_eq!(consumer.len(), 0);
    }

    #[test]
    fn test_silence() {
        let mut output = [0.3f32; 4];
        write_silence(&mut output);
        assert_eq!(output, [0.0; 4]);
    }

    #[test]
    fn test_format_preference() {
        assert!(format_rank(SampleFormat::F32) < format_rank(SampleFormat::I16));
        assert!(format_rank(SampleFormat::I16) < format_rank(SampleFormat::U16));
        assert_eq!(format_rank(SampleFormat::I8), u8::MAX);
    }
}
