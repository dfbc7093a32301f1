//! Playback regions and transport position
//!
//! A [`PlaybackRegion`] places an audio modification on the song
//! timeline. Regions are host-owned and ephemeral: the renderer walks
//! the current region list fresh on every callback and caches nothing
//! about them across calls.

use std::sync::Arc;

use super::modification::{AudioModification, ModificationId};
use super::range::SampleRange;
use super::source::SourceId;
use crate::error::{Result, SonaraError};

/// Transport state the host hands to every render callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackPosition {
    /// Playhead position on the song timeline, in render-rate samples
    pub time_in_samples: i64,
    /// Whether the transport is rolling
    pub is_playing: bool,
}

impl PlaybackPosition {
    pub fn playing_at(time_in_samples: i64) -> Self {
        Self {
            time_in_samples,
            is_playing: true,
        }
    }

    pub fn stopped() -> Self {
        Self::default()
    }
}

/// One placement of a modification on the song timeline
///
/// The region carries two ranges: where it sits in song time, and which
/// part of the modification it plays. Their starts establish the
/// song-to-modification sample offset used by the render-range mapper.
#[derive(Debug, Clone)]
pub struct PlaybackRegion {
    song_range: SampleRange,
    modification_range: SampleRange,
    modification: Arc<AudioModification>,
}

impl PlaybackRegion {
    /// Create a region
    ///
    /// # Errors
    /// Returns `InvalidConfig` if either range is inverted or empty.
    pub fn new(
        modification: Arc<AudioModification>,
        song_range: SampleRange,
        modification_range: SampleRange,
    ) -> Result<Arc<Self>> {
        if song_range.is_empty() || modification_range.is_empty() {
            return Err(SonaraError::InvalidConfig {
                reason: format!(
                    "playback region needs non-empty ranges (song {:?}, modification {:?})",
                    song_range, modification_range
                ),
            });
        }
        Ok(Arc::new(Self {
            song_range,
            modification_range,
            modification,
        }))
    }

    /// Convenience constructor for an untrimmed placement: the region
    /// plays modification samples `[0, length)` at song position `start`.
    pub fn untrimmed(
        modification: Arc<AudioModification>,
        start_in_song: i64,
        length: i64,
    ) -> Result<Arc<Self>> {
        Self::new(
            modification,
            SampleRange::with_start_and_length(start_in_song, length),
            SampleRange::with_start_and_length(0, length),
        )
    }

    /// The region's placement in song time
    ///
    /// `include_head_tail` is reserved for renderers that widen regions
    /// by processing head/tail time; this core does not, so the placed
    /// range is returned either way.
    pub fn song_range(&self, _include_head_tail: bool) -> SampleRange {
        self.song_range
    }

    /// The played part of the modification, in modification time
    pub fn modification_range(&self) -> SampleRange {
        self.modification_range
    }

    pub fn modification(&self) -> &Arc<AudioModification> {
        &self.modification
    }

    pub fn modification_id(&self) -> ModificationId {
        self.modification.id()
    }

    pub fn source_id(&self) -> SourceId {
        self.modification.source_id()
    }
}
