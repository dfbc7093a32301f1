//! Audio Engine Module
//!
//! Buffer management and audio file I/O shared by the timeline model,
//! the render path, and the inference boundary.

pub mod buffer;
pub mod io;

pub use buffer::{db_to_linear, linear_to_db, AudioBuffer};
pub use io::{deinterleave, export_audio, import_audio, interleave};
