//! Rendering
//!
//! Everything between the host's audio callback and the timeline model:
//! the try-read processing lock, the region-to-block sample mapper, the
//! per-source read chains, the shared modified-buffer store, the block
//! renderer, and the background processing job that feeds the store.

pub mod job;
pub mod lock;
pub mod mapper;
pub mod renderer;
pub mod store;
pub mod stream;

pub use job::ProcessingJob;
pub use lock::ProcessingLock;
pub use mapper::{compute_render_range, RenderRange};
pub use renderer::PlaybackRenderer;
pub use store::{ModificationState, ModifiedBufferStore, ModifiedRead};
pub use stream::{SampleSource, SourceStreamManager};
