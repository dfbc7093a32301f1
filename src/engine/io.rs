//! Audio file I/O for Sonara
//!
//! Handles importing audio sources and exchanging WAV files with
//! inference backends. Audio is kept at its native sample rate on
//! import; rate conversion happens in the render read chain, not here.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, SonaraError};

/// Import a WAV file as a channel-planar buffer at its native rate
///
/// # Errors
/// * `FileNotFound` - if the file does not exist
/// * `InvalidAudio` - if the file is not a valid WAV file
/// * `EmptyAudio` - if the file holds no samples
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(SonaraError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    let reader = WavReader::open(path).map_err(|e| SonaraError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    let sample_rate = spec.sample_rate;

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if interleaved.is_empty() {
        return Err(SonaraError::EmptyAudio);
    }

    let channel_data = deinterleave(&interleaved, channels);
    AudioBuffer::from_channels(channel_data, sample_rate)
}

/// Export a buffer to a WAV file at the buffer's own sample rate
///
/// `bit_depth` must be 16, 24, or 32 (32 is written as float).
pub fn export_audio(buffer: &AudioBuffer, path: &Path, bit_depth: u16) -> Result<()> {
    let spec = WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: bit_depth,
        sample_format: if bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let mut writer = WavWriter::create(path, spec).map_err(wav_to_io_error)?;

    let channels: Vec<&[f32]> = (0..buffer.num_channels())
        .map(|ch| buffer.channel(ch))
        .collect();
    let num_samples = buffer.num_samples();

    match bit_depth {
        16 => {
            for i in 0..num_samples {
                for ch in &channels {
                    let scaled = (ch[i] * 32767.0).clamp(-32768.0, 32767.0) as i16;
                    writer.write_sample(scaled).map_err(wav_to_io_error)?;
                }
            }
        }
        24 => {
            for i in 0..num_samples {
                for ch in &channels {
                    let scaled = (ch[i] * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                    writer.write_sample(scaled).map_err(wav_to_io_error)?;
                }
            }
        }
        32 => {
            for i in 0..num_samples {
                for ch in &channels {
                    writer.write_sample(ch[i]).map_err(wav_to_io_error)?;
                }
            }
        }
        _ => {
            return Err(SonaraError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", bit_depth),
            });
        }
    }

    writer.finalize().map_err(wav_to_io_error)?;
    Ok(())
}

fn wav_to_io_error(e: hound::Error) -> SonaraError {
    SonaraError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        e.to_string(),
    ))
}

/// Read all samples from a WAV reader as f32, normalizing integer formats
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let invalid = |e: hound::Error| SonaraError::InvalidAudio {
        reason: format!("Failed to read samples: {}", e),
        source: Some(Box::new(e)),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map_err(invalid))
            .collect(),
        SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale).map_err(invalid))
                .collect()
        }
    }
}

/// Split interleaved samples into per-channel vectors
pub fn deinterleave(interleaved: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = interleaved.len() / channels.max(1);
    let mut out = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (ch, &sample) in frame.iter().enumerate() {
            out[ch].push(sample);
        }
    }
    out
}

/// Join per-channel vectors into interleaved samples
pub fn interleave(channels: &[Vec<f32>]) -> Vec<f32> {
    let num_channels = channels.len();
    let frames = channels.first().map(|ch| ch.len()).unwrap_or(0);
    let mut out = Vec::with_capacity(num_channels * frames);
    for i in 0..frames {
        for ch in channels {
            out.push(ch[i]);
        }
    }
    out
}
