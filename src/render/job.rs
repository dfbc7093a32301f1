//! Background processing job
//!
//! Runs a wave-to-wave model over a modification's source audio on a
//! worker thread and publishes the result into the shared store. The
//! render callback never sees an in-flight job: until `publish` runs
//! under the write lock, readers keep serving the previous state.
//!
//! Cancellation is cooperative and checked right before publication, so
//! a cancelled job finishes its inference silently and discards the
//! output instead of tearing the model down mid-run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};

use crate::neural::{ModelParams, Wave2Wave};
use crate::render::store::ModifiedBufferStore;
use crate::timeline::modification::AudioModification;

/// Handle to one in-flight processing run
pub struct ProcessingJob {
    cancel: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ProcessingJob {
    /// Start processing a modification on a worker thread
    ///
    /// The model runs over the modification's complete source buffer;
    /// on success the output replaces the modification's published
    /// state in `store` in one atomic step.
    pub fn spawn(
        model: Arc<dyn Wave2Wave>,
        modification: Arc<AudioModification>,
        store: Arc<ModifiedBufferStore>,
        sample_rate: f64,
        params: ModelParams,
    ) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_flag = Arc::clone(&cancel);

        let handle = thread::Builder::new()
            .name("sonara-processing".to_string())
            .spawn(move || {
                Self::run(model, modification, store, sample_rate, params, cancel_flag);
            })
            .ok();

        Self {
            cancel,
            handle,
        }
    }

    fn run(
        model: Arc<dyn Wave2Wave>,
        modification: Arc<AudioModification>,
        store: Arc<ModifiedBufferStore>,
        sample_rate: f64,
        params: ModelParams,
        cancel: Arc<AtomicBool>,
    ) {
        let id = modification.id();

        if !model.ready() {
            warn!(
                "model '{}' not ready, modification {} left unprocessed",
                model.name(),
                id
            );
            return;
        }

        let input = modification.source().samples();
        debug!(
            "processing modification {} ({} frames) with '{}'",
            id,
            input.num_samples(),
            model.name()
        );

        match model.process(input, sample_rate, &params) {
            Ok(output) => {
                if cancel.load(Ordering::Acquire) {
                    debug!("discarding cancelled processing run for modification {}", id);
                    return;
                }
                if !output.is_finite() {
                    warn!(
                        "model '{}' produced non-finite samples for modification {}, discarding",
                        model.name(),
                        id
                    );
                    return;
                }
                info!(
                    "publishing {} processed frames for modification {}",
                    output.num_samples(),
                    id
                );
                store.publish(id, output);
            }
            Err(e) => {
                warn!("processing failed for modification {}: {}", id, e);
            }
        }
    }

    /// Request that the job discard its output
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| h.is_finished())
            .unwrap_or(true)
    }

    /// Wait for the job to complete
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProcessingJob {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::AudioBuffer;
    use crate::error::Result;
    use crate::neural::{GainModel, ModelCard, PassthroughModel, UnavailableModel};
    use crate::timeline::source::AudioSource;
    use std::time::Duration;

    fn modification_with_constant(value: f32) -> Arc<AudioModification> {
        let data = vec![vec![value; 1000]];
        let buffer = AudioBuffer::from_channels(data, 48000).unwrap();
        let source = AudioSource::from_buffer("s", buffer).unwrap();
        AudioModification::new(source)
    }

    #[test]
    fn test_job_publishes_on_success() {
        let store = Arc::new(ModifiedBufferStore::new());
        let modification = modification_with_constant(0.5);
        store.insert(modification.id());

        let job = ProcessingJob::spawn(
            Arc::new(PassthroughModel::new()),
            Arc::clone(&modification),
            Arc::clone(&store),
            48000.0,
            ModelParams::new(),
        );
        job.join();

        let state = store.state_of(modification.id()).unwrap();
        assert!(state.is_modified);
        assert_eq!(state.buffer.unwrap().channel(0)[0], 0.5);
    }

    #[test]
    fn test_job_applies_params() {
        let store = Arc::new(ModifiedBufferStore::new());
        let modification = modification_with_constant(0.5);
        store.insert(modification.id());

        let job = ProcessingJob::spawn(
            Arc::new(GainModel::new(0.0)),
            Arc::clone(&modification),
            Arc::clone(&store),
            48000.0,
            ModelParams::new().with_param("gain_db", -20.0f32),
        );
        job.join();

        let state = store.state_of(modification.id()).unwrap();
        let buffer = state.buffer.unwrap();
        assert!((buffer.channel(0)[0] - 0.05).abs() < 1e-3);
    }

    #[test]
    fn test_unready_model_leaves_store_untouched() {
        let store = Arc::new(ModifiedBufferStore::new());
        let modification = modification_with_constant(0.5);
        store.insert(modification.id());

        let job = ProcessingJob::spawn(
            Arc::new(UnavailableModel::new()),
            Arc::clone(&modification),
            Arc::clone(&store),
            48000.0,
            ModelParams::new(),
        );
        job.join();

        let state = store.state_of(modification.id()).unwrap();
        assert!(!state.is_modified);
    }

    struct SlowModel {
        card: ModelCard,
    }

    impl Wave2Wave for SlowModel {
        fn card(&self) -> &ModelCard {
            &self.card
        }

        fn process(
            &self,
            input: &AudioBuffer,
            _sample_rate: f64,
            _params: &ModelParams,
        ) -> Result<AudioBuffer> {
            thread::sleep(Duration::from_millis(100));
            Ok(input.clone())
        }
    }

    #[test]
    fn test_cancelled_job_discards_output() {
        let store = Arc::new(ModifiedBufferStore::new());
        let modification = modification_with_constant(0.5);
        store.insert(modification.id());

        let job = ProcessingJob::spawn(
            Arc::new(SlowModel {
                card: ModelCard::new("Slow", "test", "sonara"),
            }),
            Arc::clone(&modification),
            Arc::clone(&store),
            48000.0,
            ModelParams::new(),
        );
        job.cancel();
        job.join();

        let state = store.state_of(modification.id()).unwrap();
        assert!(!state.is_modified);
    }
}
