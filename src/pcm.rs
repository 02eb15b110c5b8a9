use crate::buffer::WorkingBuffer;

/// Width of one encoded sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Order in which the two bytes of a 16-bit sample are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Low byte first.
    LittleEndian,
    /// High byte first.
    BigEndian,
}

impl ByteOrder {
    /// The order the running platform expects.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::BigEndian
        } else {
            Self::LittleEndian
        }
    }

    pub fn to_bytes(self, value: i16) -> [u8; BYTES_PER_SAMPLE] {
        match self {
            Self::LittleEndian => value.to_le_bytes(),
            Self::BigEndian => value.to_be_bytes(),
        }
    }

    pub fn from_bytes(self, bytes: [u8; BYTES_PER_SAMPLE]) -> i16 {
        match self {
            Self::LittleEndian => i16::from_le_bytes(bytes),
            Self::BigEndian => i16::from_be_bytes(bytes),
        }
    }
}

/// Byte length of an encoded block.
pub fn encoded_len(channels: usize, frames: usize) -> usize {
    channels * frames * BYTES_PER_SAMPLE
}

/// Clamps to [-1, 1] and scales to the signed 16-bit range.
///
/// Positive values scale by 32767 and negative ones by 32768, so both ends of the range are
/// reachable and -1.0 does not overflow.
pub fn quantize(sample: f32) -> i16 {
    let value = sample.clamp(-1.0, 1.0) as f64;
    if value >= 0.0 {
        (value * 32767.0).round() as i16
    } else {
        (value * 32768.0).round() as i16
    }
}

/// Inverse of [quantize], back to a normalized float.
pub fn dequantize(value: i16) -> f32 {
    if value >= 0 {
        value as f32 / 32767.0
    } else {
        value as f32 / 32768.0
    }
}

/// Turns working buffers into interleaved 16-bit PCM.
///
/// Stateless apart from the output layout, which is fixed for a session: the channel count
/// and the byte order. The byte order is a runtime value so the same build can serve either
/// kind of device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmEncoder {
    channels: usize,
    byte_order: ByteOrder,
}

impl PcmEncoder {
    /// # Panics
    /// If `channels` is not 1 or 2.
    pub fn new(channels: usize, byte_order: ByteOrder) -> Self {
        assert!(
            channels == 1 || channels == 2,
            "PCM encoder supports mono or stereo, got {} channels",
            channels
        );
        Self {
            channels,
            byte_order,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Encodes the first `channels` rows of `buffer` into a new byte vector.
    pub fn encode(&self, buffer: &WorkingBuffer) -> Vec<u8> {
        let mut out = vec![0u8; encoded_len(self.channels, buffer.frames())];
        self.encode_into(buffer, &mut out);
        out
    }

    /// Encodes into an existing slice. Sample `i` of channel `c` lands at byte
    /// `i * channels * 2 + c * 2`.
    ///
    /// # Panics
    /// If `out` is not exactly `channels * frames * 2` bytes long. A wrong size is a
    /// programming error, not something to recover from.
    pub fn encode_into(&self, buffer: &WorkingBuffer, out: &mut [u8]) {
        let frames = buffer.frames();
        assert_eq!(
            out.len(),
            encoded_len(self.channels, frames),
            "PCM buffer length mismatch for {} channel(s) x {} frames",
            self.channels,
            frames
        );

        for c in 0..self.channels {
            for (i, sample) in buffer.channel(c).iter().enumerate() {
                let offset = i * self.channels * BYTES_PER_SAMPLE + c * BYTES_PER_SAMPLE;
                out[offset..offset + BYTES_PER_SAMPLE]
                    .copy_from_slice(&self.byte_order.to_bytes(quantize(*sample)));
            }
        }
    }

    /// Splits interleaved PCM back into normalized per-channel samples.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Vec<f32>> {
        let frame_len = self.channels * BYTES_PER_SAMPLE;
        let mut channels = vec![Vec::with_capacity(bytes.len() / frame_len); self.channels];

        for frame in bytes.chunks_exact(frame_len) {
            for (c, pair) in frame.chunks_exact(BYTES_PER_SAMPLE).enumerate() {
                let value = self.byte_order.from_bytes([pair[0], pair[1]]);
                channels[c].push(dequantize(value));
            }
        }

        channels
    }
}
