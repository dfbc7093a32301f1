//! Playback renderer
//!
//! The per-callback orchestrator: walks the active playback regions,
//! maps each one onto the requested block, pulls samples from the
//! published modified buffer when one exists or from the source stream
//! otherwise, and mixes overlapping regions.
//!
//! The render path never blocks and never allocates: the store lock is
//! try-only, the scratch mix buffer is allocated in
//! [`prepare_to_play`](PlaybackRenderer::prepare_to_play), and every
//! degraded outcome (writer active, transport stopped, nothing to play)
//! is silence, not an error.

use std::sync::Arc;

use log::debug;

use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, SonaraError};
use crate::render::mapper::compute_render_range;
use crate::render::store::{ModifiedBufferStore, ModifiedRead};
use crate::render::stream::SourceStreamManager;
use crate::timeline::range::SampleRange;
use crate::timeline::region::{PlaybackPosition, PlaybackRegion};
use crate::timeline::source::AudioSource;

#[derive(Debug, Clone, Copy)]
struct RenderConfig {
    sample_rate: f64,
    max_block: usize,
    num_channels: usize,
    want_read_ahead: bool,
}

/// Region-aware block renderer over a shared modified-buffer store
pub struct PlaybackRenderer {
    store: Arc<ModifiedBufferStore>,
    regions: Vec<Arc<PlaybackRegion>>,
    streams: SourceStreamManager,
    config: Option<RenderConfig>,
    scratch: Option<AudioBuffer>,
}

impl PlaybackRenderer {
    pub fn new(store: Arc<ModifiedBufferStore>) -> Self {
        Self {
            store,
            regions: Vec::new(),
            streams: SourceStreamManager::new(),
            config: None,
            scratch: None,
        }
    }

    /// Assign a region to this renderer
    ///
    /// If the renderer is already prepared, the region's source gets its
    /// read chain immediately so playback can continue without a stop.
    pub fn add_region(&mut self, region: Arc<PlaybackRegion>) {
        if let Some(config) = self.config {
            self.streams.prepare(
                std::slice::from_ref(region.modification().source()),
                config.max_block,
                config.sample_rate,
                config.want_read_ahead,
            );
        }
        self.regions.push(region);
    }

    /// Withdraw a region from this renderer
    ///
    /// The source's read chain stays prepared; other regions may still
    /// use it, and `release_resources` tears everything down anyway.
    pub fn remove_region(&mut self, region: &Arc<PlaybackRegion>) {
        self.regions.retain(|r| !Arc::ptr_eq(r, region));
    }

    pub fn regions(&self) -> &[Arc<PlaybackRegion>] {
        &self.regions
    }

    /// Build read chains and the scratch mix buffer for a playback session
    ///
    /// Re-entrant: preparing again with the same rate keeps existing
    /// chains; a rate change rebuilds them. Read-ahead is used for
    /// realtime sessions and skipped when the host renders offline.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for a non-positive sample rate or a zero
    /// block size or channel count.
    pub fn prepare_to_play(
        &mut self,
        sample_rate: f64,
        max_block: usize,
        num_channels: usize,
        always_non_realtime: bool,
    ) -> Result<()> {
        if sample_rate <= 0.0 || max_block == 0 || num_channels == 0 {
            return Err(SonaraError::InvalidConfig {
                reason: format!(
                    "cannot prepare with {} Hz, block {}, {} channel(s)",
                    sample_rate, max_block, num_channels
                ),
            });
        }

        if let Some(previous) = self.config {
            if previous.sample_rate != sample_rate
                || previous.want_read_ahead == always_non_realtime
            {
                self.streams.release();
            }
        }

        let config = RenderConfig {
            sample_rate,
            max_block,
            num_channels,
            want_read_ahead: !always_non_realtime,
        };

        let sources: Vec<Arc<AudioSource>> = self
            .regions
            .iter()
            .map(|region| Arc::clone(region.modification().source()))
            .collect();
        self.streams
            .prepare(&sources, max_block, sample_rate, config.want_read_ahead);

        self.scratch = Some(AudioBuffer::new(
            num_channels,
            max_block,
            sample_rate as u32,
        ));
        self.config = Some(config);
        debug!(
            "prepared renderer: {} Hz, block {}, {} channel(s), {} region(s)",
            sample_rate,
            max_block,
            num_channels,
            self.regions.len()
        );
        Ok(())
    }

    /// Render one block
    ///
    /// `output` carries the block length; `position` carries the song
    /// playhead for its first frame. A stopped transport, a held write
    /// lock, or no contributing region all produce silence and count as
    /// success. The return value only goes `false` when a source stream
    /// underruns mid-block (the affected span is already silent).
    pub fn process_block(
        &mut self,
        output: &mut AudioBuffer,
        _realtime: bool,
        position: PlaybackPosition,
    ) -> bool {
        let num_samples = output.num_samples();

        if !position.is_playing {
            output.clear();
            return true;
        }

        // Non-blocking: a writer mid-publish costs us one silent block.
        let guard = match self.store.try_lock() {
            Some(guard) => guard,
            None => {
                output.clear();
                return true;
            }
        };

        let block_range =
            SampleRange::with_start_and_length(position.time_in_samples, num_samples as i64);

        let mut success = true;
        let mut did_render_first = false;

        for region in &self.regions {
            let render = match compute_render_range(region, block_range, false) {
                Some(render) => render,
                None => continue,
            };

            let len = render.len() as usize;
            let start_in_buffer = (render.range.start - block_range.start) as usize;
            let start_in_source = render.start_in_source();

            if !did_render_first {
                let read = self.store.read_range(
                    &guard,
                    region.modification_id(),
                    start_in_source,
                    output,
                    start_in_buffer,
                    len,
                );
                match read {
                    ModifiedRead::Rendered => {}
                    ModifiedRead::Incompatible => continue,
                    ModifiedRead::Unmodified => {
                        success &= self.streams.read(
                            region.source_id(),
                            start_in_source,
                            output,
                            start_in_buffer,
                            len,
                        );
                    }
                }
                output.clear_range(0, start_in_buffer);
                output.clear_range(start_in_buffer + len, num_samples - start_in_buffer - len);
                did_render_first = true;
            } else {
                let scratch = match self.scratch.as_mut() {
                    Some(scratch) => scratch,
                    None => {
                        output.clear();
                        return true;
                    }
                };
                let read = self.store.read_range(
                    &guard,
                    region.modification_id(),
                    start_in_source,
                    scratch,
                    start_in_buffer,
                    len,
                );
                match read {
                    ModifiedRead::Rendered => {}
                    ModifiedRead::Incompatible => continue,
                    ModifiedRead::Unmodified => {
                        success &= self.streams.read(
                            region.source_id(),
                            start_in_source,
                            scratch,
                            start_in_buffer,
                            len,
                        );
                    }
                }
                for ch in 0..output.num_channels() {
                    output.add_from(ch, start_in_buffer, scratch, ch, start_in_buffer, len);
                }
            }
        }

        if !did_render_first {
            output.clear();
        }
        success
    }

    /// Tear down read chains and the scratch buffer
    pub fn release_resources(&mut self) {
        self.streams.release();
        self.scratch = None;
        self.config = None;
    }

    pub fn is_prepared(&self) -> bool {
        self.config.is_some()
    }
}
