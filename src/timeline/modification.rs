//! Audio modifications
//!
//! An [`AudioModification`] is one instance of "this source, possibly
//! processed". The modification itself is immutable; its processed
//! state (the published buffer and ready flag) lives in the
//! [`ModifiedBufferStore`](crate::render::ModifiedBufferStore), keyed by
//! [`ModificationId`], so that the realtime reader and the background
//! publisher share a single lock discipline.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::source::{AudioSource, SourceId};

/// Stable identity of an audio modification, used as a map key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModificationId(Uuid);

impl ModificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ModificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ModificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One placement-independent processing instance of a source
#[derive(Debug)]
pub struct AudioModification {
    id: ModificationId,
    source: Arc<AudioSource>,
}

impl AudioModification {
    /// Create a fresh modification of a source
    pub fn new(source: Arc<AudioSource>) -> Arc<Self> {
        Arc::new(Self {
            id: ModificationId::new(),
            source,
        })
    }

    /// Create a modification cloned from another (same source, new identity)
    ///
    /// The host clones modifications when duplicating regions; processed
    /// state is not inherited, the clone starts unmodified.
    pub fn cloned_from(other: &AudioModification) -> Arc<Self> {
        Arc::new(Self {
            id: ModificationId::new(),
            source: Arc::clone(&other.source),
        })
    }

    pub fn id(&self) -> ModificationId {
        self.id
    }

    pub fn source(&self) -> &Arc<AudioSource> {
        &self.source
    }

    pub fn source_id(&self) -> SourceId {
        self.source.id()
    }
}
