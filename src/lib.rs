//! Sonara - Playback rendering core for AI-modified audio
//!
//! Sonara renders host-placed audio regions whose content may be
//! replaced, at any time, by the output of a wave-to-wave neural model
//! running in the background.
//!
//! # Architecture
//!
//! Three layers cooperate around one shared lock:
//! - Timeline: sources, modifications and regions owned by the host
//!   session ([`timeline`])
//! - Rendering: the realtime block renderer with its per-source read
//!   chains and the modified-buffer store ([`render`])
//! - Models: the `Wave2Wave` trait, mock models and the HTTP bridge
//!   backend ([`neural`])
//!
//! The render callback only ever try-reads; a block that collides with
//! a background publish comes out silent rather than late.

pub mod engine;
pub mod error;
pub mod neural;
pub mod render;
pub mod timeline;

pub use error::{Result, SonaraError};
