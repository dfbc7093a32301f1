//! Region sample mapping
//!
//! Pure coordinate math between the three sample spaces involved in a
//! render callback: song time (host timeline), playback-region time
//! (the region's placement) and modification/source time (the trimmed
//! audio behind the region).
//!
//! A region can be trimmed both on the timeline (song-time borders) and
//! at the modification (source trimming), so two independent clipping
//! passes are required; only their intersection is valid to render. An
//! empty result at either stage is not an error, it means the region
//! does not contribute to this block.

use crate::timeline::range::SampleRange;
use crate::timeline::region::PlaybackRegion;

/// Per-region, per-callback render assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRange {
    /// The contributing span, in song-time samples
    pub range: SampleRange,
    /// Song-to-modification sample offset
    /// (modification-time start minus song-time start of the region)
    pub modification_offset: i64,
}

impl RenderRange {
    /// Where reading starts in modification/source time
    #[inline]
    pub fn start_in_source(&self) -> i64 {
        self.range.start + self.modification_offset
    }

    /// Number of samples to render
    #[inline]
    pub fn len(&self) -> i64 {
        self.range.len()
    }
}

/// Compute the span of `block_range` a region contributes, if any
///
/// Two-stage clipping:
/// 1. intersect the block with the region's song-time placement;
/// 2. re-express the region's modification-time range in song time
///    (anchored at the region's song start) and intersect again.
pub fn compute_render_range(
    region: &PlaybackRegion,
    block_range: SampleRange,
    include_head_tail: bool,
) -> Option<RenderRange> {
    let playback_range = region.song_range(include_head_tail);

    let render_range = block_range.intersection(&playback_range);
    if render_range.is_empty() {
        return None;
    }

    let modification_range = region.modification_range();
    let modification_offset = modification_range.start - playback_range.start;

    let render_range =
        render_range.intersection(&modification_range.moved_to_start_at(playback_range.start));
    if render_range.is_empty() {
        return None;
    }

    Some(RenderRange {
        range: render_range,
        modification_offset,
    })
}
