//! Modified-buffer store
//!
//! Shared state between the background processing job (writer) and the
//! render callback (reader): for every live modification, whether it
//! has been processed and, if so, the published replacement buffer.
//!
//! Publication is all-or-nothing. A job builds its output off to the
//! side and [`publish`](ModifiedBufferStore::publish) swaps it in under
//! the write lock in one step, so a reader either sees the previous
//! state or the complete new buffer, never a half-written one.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::engine::buffer::AudioBuffer;
use crate::render::lock::{ProcessingLock, ReadGuard, WriteGuard};
use crate::timeline::modification::ModificationId;

/// Processed state of one modification
#[derive(Debug, Default, Clone)]
pub struct ModificationState {
    /// True once a processing job has published output for this entry
    pub is_modified: bool,
    /// The published replacement buffer, render-rate samples indexed in
    /// modification time
    pub buffer: Option<Arc<AudioBuffer>>,
}

pub type StateMap = HashMap<ModificationId, ModificationState>;

/// Read guard over the whole store, held for the duration of one block
pub type StoreReadGuard<'a> = ReadGuard<'a, StateMap>;

/// Exclusive guard over the whole store
pub type StoreWriteGuard<'a> = WriteGuard<'a, StateMap>;

/// Outcome of a per-region read against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifiedRead {
    /// Samples were delivered from the published buffer
    Rendered,
    /// No published buffer; the caller should read the original source
    Unmodified,
    /// Published buffer's channel layout cannot be mapped to the
    /// destination; the region contributes nothing
    Incompatible,
}

/// Lock-guarded map of modification id to processed state
#[derive(Debug, Default)]
pub struct ModifiedBufferStore {
    states: ProcessingLock<StateMap>,
}

impl ModifiedBufferStore {
    pub fn new() -> Self {
        Self {
            states: ProcessingLock::new(HashMap::new()),
        }
    }

    /// Register a modification, starting unmodified
    pub fn insert(&self, id: ModificationId) {
        self.states.write().entry(id).or_default();
    }

    /// Drop a modification's entry entirely
    pub fn remove(&self, id: ModificationId) {
        self.states.write().remove(&id);
    }

    /// Atomically publish processed output for a modification
    ///
    /// Creates the entry if the modification was never registered.
    pub fn publish(&self, id: ModificationId, buffer: AudioBuffer) {
        let frames = buffer.num_samples();
        let shared = Arc::new(buffer);
        {
            let mut states = self.states.write();
            let state = states.entry(id).or_default();
            state.buffer = Some(shared);
            state.is_modified = true;
        }
        debug!("published {} processed frames for modification {}", frames, id);
    }

    /// Revert a modification to its unprocessed state
    pub fn clear(&self, id: ModificationId) {
        let mut states = self.states.write();
        if let Some(state) = states.get_mut(&id) {
            state.buffer = None;
            state.is_modified = false;
        }
    }

    /// Snapshot one modification's state, blocking if a writer is active
    ///
    /// Background/UI use only; the render path goes through
    /// [`try_lock`](Self::try_lock) instead.
    pub fn state_of(&self, id: ModificationId) -> Option<ModificationState> {
        self.states.read().get(&id).cloned()
    }

    /// Acquire the write lock directly, blocking until available
    ///
    /// For writers that batch several mutations into one exclusive
    /// section; readers observe none of it until the guard drops.
    pub fn write_lock(&self) -> StoreWriteGuard<'_> {
        self.states.write()
    }

    /// Try to take the block-wide read guard without blocking
    ///
    /// `None` means a writer is active; the caller renders silence for
    /// this block. Holding the guard across all per-region reads of one
    /// block gives them a single consistent snapshot.
    #[inline]
    pub fn try_lock(&self) -> Option<StoreReadGuard<'_>> {
        self.states.try_read()
    }

    /// Read `frames` frames of a published buffer, starting at
    /// modification-time position `start_in_source`, into `dest`
    ///
    /// Channel handling: matching counts copy per channel, a mono
    /// buffer broadcasts to every destination channel, anything else is
    /// [`ModifiedRead::Incompatible`]. A published buffer shorter than
    /// the requested span is clamped and the remainder zero-padded; a
    /// ready entry never falls back to the source mid-read.
    pub fn read_range(
        &self,
        guard: &StoreReadGuard<'_>,
        id: ModificationId,
        start_in_source: i64,
        dest: &mut AudioBuffer,
        dest_start: usize,
        frames: usize,
    ) -> ModifiedRead {
        let buffer = match guard.get(&id) {
            Some(state) if state.is_modified => match &state.buffer {
                Some(buffer) => buffer,
                None => return ModifiedRead::Unmodified,
            },
            _ => return ModifiedRead::Unmodified,
        };

        let dest_channels = dest.num_channels();
        let buffer_channels = buffer.num_channels();
        if buffer_channels != dest_channels && buffer_channels != 1 {
            return ModifiedRead::Incompatible;
        }

        dest.clear_range(dest_start, frames);

        let request = crate::timeline::range::SampleRange::with_start_and_length(
            start_in_source,
            frames as i64,
        );
        let available =
            crate::timeline::range::SampleRange::new(0, buffer.num_samples() as i64);
        let overlap = request.intersection(&available);
        if overlap.is_empty() {
            return ModifiedRead::Rendered;
        }

        let src_start = overlap.start as usize;
        let dst_offset = dest_start + (overlap.start - start_in_source) as usize;
        let n = overlap.len() as usize;
        for dest_ch in 0..dest_channels {
            let src_ch = if buffer_channels == 1 { 0 } else { dest_ch };
            dest.copy_from(dest_ch, dst_offset, buffer, src_ch, src_start, n);
        }
        ModifiedRead::Rendered
    }
}
