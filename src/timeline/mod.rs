//! Timeline model
//!
//! The host-facing object graph: imported audio sources, the
//! modifications built on them, playback regions placing those
//! modifications in song time, and the document that owns the lot.

pub mod document;
pub mod modification;
pub mod range;
pub mod region;
pub mod source;

pub use document::Document;
pub use modification::{AudioModification, ModificationId};
pub use range::SampleRange;
pub use region::{PlaybackPosition, PlaybackRegion};
pub use source::{AudioSource, SourceId};
