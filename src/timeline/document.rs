//! Document state
//!
//! The document owns the session-wide registries: imported sources,
//! their modifications, the shared modified-buffer store, and the
//! wave-to-wave model used to process them. Renderers are created from
//! the document so they all observe the same store.
//!
//! Everything here runs on host/background threads; the only state the
//! render callback touches is the store, through its own lock.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::info;

use super::modification::{AudioModification, ModificationId};
use super::source::{AudioSource, SourceId};
use crate::error::{Result, SonaraError};
use crate::neural::{ModelParams, Wave2Wave};
use crate::render::job::ProcessingJob;
use crate::render::renderer::PlaybackRenderer;
use crate::render::store::ModifiedBufferStore;

/// Session-wide registry of sources, modifications and processing state
pub struct Document {
    sources: HashMap<SourceId, Arc<AudioSource>>,
    modifications: HashMap<ModificationId, Arc<AudioModification>>,
    store: Arc<ModifiedBufferStore>,
    model: Option<Arc<dyn Wave2Wave>>,
    jobs: Vec<ProcessingJob>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            modifications: HashMap::new(),
            store: Arc::new(ModifiedBufferStore::new()),
            model: None,
            jobs: Vec::new(),
        }
    }

    /// The store shared by this document's renderers and jobs
    pub fn store(&self) -> &Arc<ModifiedBufferStore> {
        &self.store
    }

    /// Assign the model used for subsequent processing runs
    ///
    /// All modifications of a document share one model; in-flight jobs
    /// keep the model they started with.
    pub fn set_model(&mut self, model: Arc<dyn Wave2Wave>) {
        info!("document model set to '{}'", model.name());
        self.model = Some(model);
    }

    pub fn model(&self) -> Option<&Arc<dyn Wave2Wave>> {
        self.model.as_ref()
    }

    /// Build a renderer backed by this document's store
    pub fn create_renderer(&self) -> PlaybackRenderer {
        PlaybackRenderer::new(Arc::clone(&self.store))
    }

    // -- sources -----------------------------------------------------------

    /// Register an already-loaded source
    pub fn add_source(&mut self, source: Arc<AudioSource>) -> SourceId {
        let id = source.id();
        self.sources.insert(id, source);
        id
    }

    /// Load a WAV file and register it as a source
    ///
    /// # Errors
    /// Propagates import failures (`FileNotFound`, `InvalidAudio`,
    /// `EmptyAudio`).
    pub fn import_source(&mut self, path: &Path) -> Result<Arc<AudioSource>> {
        let source = AudioSource::from_file(path)?;
        info!(
            "imported source '{}' ({:.2}s at {} Hz)",
            source.name(),
            source.duration_secs(),
            source.sample_rate()
        );
        self.sources.insert(source.id(), Arc::clone(&source));
        Ok(source)
    }

    pub fn source(&self, id: SourceId) -> Option<&Arc<AudioSource>> {
        self.sources.get(&id)
    }

    /// Drop a source and every modification built on it
    pub fn remove_source(&mut self, id: SourceId) {
        let dependent: Vec<ModificationId> = self
            .modifications
            .values()
            .filter(|m| m.source_id() == id)
            .map(|m| m.id())
            .collect();
        for modification_id in dependent {
            self.remove_modification(modification_id);
        }
        self.sources.remove(&id);
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    // -- modifications -----------------------------------------------------

    /// Create a fresh modification of a source and register it with the
    /// store (unmodified)
    ///
    /// # Errors
    /// Returns `SourceNotFound` for an unknown source id.
    pub fn create_modification(&mut self, source: SourceId) -> Result<Arc<AudioModification>> {
        let source = self
            .sources
            .get(&source)
            .ok_or_else(|| SonaraError::SourceNotFound {
                id: source.to_string(),
            })?;
        let modification = AudioModification::new(Arc::clone(source));
        self.store.insert(modification.id());
        self.modifications
            .insert(modification.id(), Arc::clone(&modification));
        Ok(modification)
    }

    /// Clone an existing modification (same source, new identity,
    /// starts unmodified)
    ///
    /// # Errors
    /// Returns `ModificationNotFound` for an unknown id.
    pub fn clone_modification(&mut self, id: ModificationId) -> Result<Arc<AudioModification>> {
        let original =
            self.modifications
                .get(&id)
                .ok_or_else(|| SonaraError::ModificationNotFound {
                    id: id.to_string(),
                })?;
        let clone = AudioModification::cloned_from(original);
        self.store.insert(clone.id());
        self.modifications.insert(clone.id(), Arc::clone(&clone));
        Ok(clone)
    }

    pub fn modification(&self, id: ModificationId) -> Option<&Arc<AudioModification>> {
        self.modifications.get(&id)
    }

    /// Drop a modification and its processed state
    pub fn remove_modification(&mut self, id: ModificationId) {
        self.store.remove(id);
        self.modifications.remove(&id);
    }

    pub fn num_modifications(&self) -> usize {
        self.modifications.len()
    }

    // -- processing --------------------------------------------------------

    /// Start a background processing run for a modification
    ///
    /// # Errors
    /// Returns `ModificationNotFound` for an unknown id and
    /// `InvalidConfig` when no model has been assigned.
    pub fn process_modification(
        &mut self,
        id: ModificationId,
        sample_rate: f64,
        params: ModelParams,
    ) -> Result<()> {
        let modification =
            self.modifications
                .get(&id)
                .ok_or_else(|| SonaraError::ModificationNotFound {
                    id: id.to_string(),
                })?;
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| SonaraError::InvalidConfig {
                reason: "no model assigned to document".to_string(),
            })?;

        self.jobs.retain(|job| !job.is_finished());
        self.jobs.push(ProcessingJob::spawn(
            Arc::clone(model),
            Arc::clone(modification),
            Arc::clone(&self.store),
            sample_rate,
            params,
        ));
        Ok(())
    }

    /// Revert a modification to its unprocessed state
    pub fn reset_modification(&mut self, id: ModificationId) {
        self.store.clear(id);
    }

    /// Block until all in-flight processing runs complete
    pub fn wait_for_processing(&mut self) {
        for job in self.jobs.drain(..) {
            job.join();
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
