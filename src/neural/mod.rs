//! Wave-to-wave model interfaces and implementations
//!
//! This module provides:
//! - `Wave2Wave` trait for all audio-to-audio processors
//! - Model cards and serializable processing parameters
//! - An HTTP bridge backend (feature `bridge`)
//! - Mock implementations for testing

#[cfg(feature = "bridge")]
mod bridge;
mod mock;
mod model;

#[cfg(feature = "bridge")]
pub use bridge::BridgeModel;
pub use mock::{GainModel, MonoFoldModel, PassthroughModel, UnavailableModel};
pub use model::{ModelCard, ModelParams, Wave2Wave};
