//! Audio Buffer Management
//!
//! Provides the core audio buffer type used throughout Sonara: host
//! callback buffers, source sample storage, the renderer's scratch mix
//! buffer, and published modification buffers all use [`AudioBuffer`].
//!
//! Samples are stored channel-planar (one `Vec<f32>` per channel), which
//! matches how the renderer copies and mixes per channel.

use crate::error::{Result, SonaraError};

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero or negative input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Channel-planar audio buffer
///
/// # Example
/// ```
/// use sonara::engine::AudioBuffer;
///
/// let mut buffer = AudioBuffer::new(2, 512, 48000);
/// assert_eq!(buffer.num_channels(), 2);
/// assert_eq!(buffer.num_samples(), 512);
/// buffer.channel_mut(0)[0] = 0.5;
/// ```
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a zeroed buffer with the given channel count and length
    pub fn new(num_channels: usize, num_samples: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; num_channels],
            sample_rate,
        }
    }

    /// Create a buffer from existing per-channel sample data
    ///
    /// All channels must have the same length.
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if let Some(first) = samples.first() {
            let len = first.len();
            if samples.iter().any(|ch| ch.len() != len) {
                return Err(SonaraError::InvalidAudio {
                    reason: "channels have differing lengths".to_string(),
                    source: None,
                });
            }
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    /// Number of samples per channel
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_samples() as f64 / self.sample_rate as f64
    }

    /// Immutable access to one channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Mutable access to one channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds.
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Get a sample, or None if indices are out of bounds
    #[inline]
    pub fn get_sample(&self, channel: usize, index: usize) -> Option<f32> {
        self.samples
            .get(channel)
            .and_then(|ch| ch.get(index).copied())
    }

    /// Zero the whole buffer
    pub fn clear(&mut self) {
        for channel in &mut self.samples {
            channel.fill(0.0);
        }
    }

    /// Zero `len` samples of every channel starting at `start`
    ///
    /// The range is clamped to the buffer length.
    pub fn clear_range(&mut self, start: usize, len: usize) {
        let total = self.num_samples();
        let start = start.min(total);
        let end = start.saturating_add(len).min(total);
        for channel in &mut self.samples {
            channel[start..end].fill(0.0);
        }
    }

    /// Copy samples from one channel of another buffer into a channel of this one
    ///
    /// Copies `len` samples from `src` channel `src_channel` starting at
    /// `src_start` into this buffer's `dst_channel` starting at `dst_start`.
    /// The copy length is clamped to what both buffers can hold; returns the
    /// number of samples actually copied. Out-of-bounds channels copy nothing.
    pub fn copy_from(
        &mut self,
        dst_channel: usize,
        dst_start: usize,
        src: &AudioBuffer,
        src_channel: usize,
        src_start: usize,
        len: usize,
    ) -> usize {
        let n = self.clamp_span(dst_channel, dst_start, src, src_channel, src_start, len);
        if n > 0 {
            let src_slice = &src.samples[src_channel][src_start..src_start + n];
            self.samples[dst_channel][dst_start..dst_start + n].copy_from_slice(src_slice);
        }
        n
    }

    /// Add samples from one channel of another buffer into a channel of this one
    ///
    /// Same bounds behavior as [`AudioBuffer::copy_from`], but accumulates
    /// instead of overwriting.
    pub fn add_from(
        &mut self,
        dst_channel: usize,
        dst_start: usize,
        src: &AudioBuffer,
        src_channel: usize,
        src_start: usize,
        len: usize,
    ) -> usize {
        let n = self.clamp_span(dst_channel, dst_start, src, src_channel, src_start, len);
        if n > 0 {
            let src_slice = &src.samples[src_channel][src_start..src_start + n];
            let dst_slice = &mut self.samples[dst_channel][dst_start..dst_start + n];
            for (d, s) in dst_slice.iter_mut().zip(src_slice) {
                *d += *s;
            }
        }
        n
    }

    fn clamp_span(
        &self,
        dst_channel: usize,
        dst_start: usize,
        src: &AudioBuffer,
        src_channel: usize,
        src_start: usize,
        len: usize,
    ) -> usize {
        if dst_channel >= self.num_channels() || src_channel >= src.num_channels() {
            return 0;
        }
        let dst_avail = self.samples[dst_channel].len().saturating_sub(dst_start);
        let src_avail = src.samples[src_channel].len().saturating_sub(src_start);
        len.min(dst_avail).min(src_avail)
    }

    /// Apply gain to all samples
    pub fn apply_gain(&mut self, gain_db: f32) {
        let gain_linear = db_to_linear(gain_db);
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample *= gain_linear;
            }
        }
    }

    /// Check if all samples are finite (not NaN or Infinity)
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }
}
