//! Signed 16-bit little-endian PCM decoding.
//!
//! The speech collaborator returns raw, headerless PCM. Samples are
//! interleaved by channel and normalised into `[-1.0, 1.0]` by dividing by
//! 32768, so `i16::MIN` maps exactly to `-1.0`.

use std::time::Duration;

use crate::error::ChatError;

/// Sample rate of the speech collaborator's output.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;
/// Channel count of the speech collaborator's output.
pub const SPEECH_CHANNELS: u16 = 1;

const BYTES_PER_SAMPLE: usize = 2;

/// A decoded, playable buffer: one `Vec<f32>` per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    /// Average of all channels at `frame`. Out-of-range frames are silent.
    pub fn mono_sample(&self, frame: usize) -> f32 {
        if self.channels.is_empty() {
            return 0.0;
        }
        let sum: f32 = self
            .channels
            .iter()
            .map(|c| c.get(frame).copied().unwrap_or(0.0))
            .sum();
        sum / self.channels.len() as f32
    }
}

/// Decode interleaved s16le bytes into an [`AudioBuffer`].
///
/// Frame count is `bytes.len() / 2 / channel_count`. A byte length that is
/// not a whole number of frames is rejected rather than truncated.
pub fn decode(bytes: &[u8], sample_rate: u32, channel_count: u16) -> Result<AudioBuffer, ChatError> {
    if channel_count == 0 {
        return Err(ChatError::Decode("channel count must be at least 1".into()));
    }
    if sample_rate == 0 {
        return Err(ChatError::Decode("sample rate must be positive".into()));
    }

    let channel_count = channel_count as usize;
    let frame_bytes = BYTES_PER_SAMPLE * channel_count;
    if bytes.len() % frame_bytes != 0 {
        return Err(ChatError::Decode(format!(
            "{} bytes is not a whole number of {channel_count}-channel 16-bit frames",
            bytes.len()
        )));
    }

    let frame_count = bytes.len() / frame_bytes;
    let mut channels = vec![Vec::with_capacity(frame_count); channel_count];

    for frame in bytes.chunks_exact(frame_bytes) {
        for (channel, sample) in frame.chunks_exact(BYTES_PER_SAMPLE).enumerate() {
            let value = i16::from_le_bytes([sample[0], sample[1]]);
            channels[channel].push(value as f32 / 32768.0);
        }
    }

    Ok(AudioBuffer {
        sample_rate,
        channels,
    })
}
