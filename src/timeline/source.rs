//! Audio sources
//!
//! An [`AudioSource`] is one imported audio file registered with the
//! host. The host owns the conceptual object; Sonara keeps the decoded
//! samples (at the file's native rate) plus a stable identity that keys
//! every per-source structure in the render path.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::buffer::AudioBuffer;
use crate::engine::io;
use crate::error::{Result, SonaraError};

/// Stable identity of an audio source, used as a map key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(Uuid);

impl SourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One imported audio file
#[derive(Debug)]
pub struct AudioSource {
    id: SourceId,
    name: String,
    samples: AudioBuffer,
}

impl AudioSource {
    /// Create a source from an in-memory buffer
    ///
    /// # Errors
    /// Returns `EmptyAudio` if the buffer holds no samples.
    pub fn from_buffer(name: impl Into<String>, samples: AudioBuffer) -> Result<Arc<Self>> {
        if samples.is_empty() || samples.num_channels() == 0 {
            return Err(SonaraError::EmptyAudio);
        }
        Ok(Arc::new(Self {
            id: SourceId::new(),
            name: name.into(),
            samples,
        }))
    }

    /// Import a WAV file as a new source
    pub fn from_file(path: &Path) -> Result<Arc<Self>> {
        let samples = io::import_audio(path)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio")
            .to_string();
        Self::from_buffer(name, samples)
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sample rate of the underlying file
    pub fn sample_rate(&self) -> u32 {
        self.samples.sample_rate()
    }

    pub fn num_channels(&self) -> usize {
        self.samples.num_channels()
    }

    /// Length in samples at the source's native rate
    pub fn length_samples(&self) -> i64 {
        self.samples.num_samples() as i64
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.duration_secs()
    }

    /// The decoded sample data
    pub fn samples(&self) -> &AudioBuffer {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_buffer() {
        let buffer = AudioBuffer::new(2, 4800, 48000);
        let source = AudioSource::from_buffer("clip", buffer).unwrap();
        assert_eq!(source.name(), "clip");
        assert_eq!(source.num_channels(), 2);
        assert_eq!(source.length_samples(), 4800);
        assert!((source.duration_secs() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_from_buffer_rejects_empty() {
        let buffer = AudioBuffer::new(2, 0, 48000);
        assert!(matches!(
            AudioSource::from_buffer("empty", buffer),
            Err(SonaraError::EmptyAudio)
        ));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = AudioSource::from_buffer("a", AudioBuffer::new(1, 10, 48000)).unwrap();
        let b = AudioSource::from_buffer("b", AudioBuffer::new(1, 10, 48000)).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
