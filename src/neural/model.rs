//! Neural model trait and core types
//!
//! Defines the interface all wave-to-wave models must implement: a
//! model takes an audio buffer in, produces an audio buffer out, and
//! advertises itself through a model card.

use crate::engine::buffer::AudioBuffer;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters for a processing run
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelParams {
    /// Model-specific parameters as key-value pairs
    #[serde(flatten)]
    pub params: HashMap<String, serde_json::Value>,
}

impl ModelParams {
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
        }
    }

    pub fn with_param<V: Serialize>(mut self, key: &str, value: V) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.params.insert(key.to_string(), value);
        }
        self
    }

    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.params
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_f32(&self, key: &str) -> Option<f32> {
        self.get::<f64>(key).map(|v| v as f32)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)
    }
}

/// Descriptive card a model publishes about itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCard {
    /// Human-readable name
    pub name: String,

    /// Description of what the model does
    pub description: String,

    /// Author or organization
    pub author: String,

    /// Free-form capability tags
    pub tags: Vec<String>,

    /// Sample rate the model natively operates at (0 = any)
    pub sample_rate: u32,
}

impl ModelCard {
    pub fn new(name: &str, description: &str, author: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            author: author.to_string(),
            tags: Vec::new(),
            sample_rate: 0,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }
}

/// Trait that all wave-to-wave models must implement
///
/// Implementations run on a background thread; `process` may block for
/// as long as inference takes.
pub trait Wave2Wave: Send + Sync {
    /// Get the model card
    fn card(&self) -> &ModelCard;

    /// Check whether the model can process right now
    fn ready(&self) -> bool {
        true
    }

    /// Run the model over a complete buffer
    ///
    /// # Arguments
    /// * `input` - Source samples at `sample_rate`
    /// * `sample_rate` - Render sample rate of the session
    /// * `params` - Model-specific parameters
    ///
    /// # Returns
    /// The full replacement buffer. Its channel count must be 1 or
    /// match the input; its length should cover the input's range.
    ///
    /// # Errors
    /// `ModelNotReady` when called before the model can process,
    /// `InferenceError` (or a bridge error) when the run itself fails.
    fn process(
        &self,
        input: &AudioBuffer,
        sample_rate: f64,
        params: &ModelParams,
    ) -> Result<AudioBuffer>;

    /// Model name (convenience method)
    fn name(&self) -> &str {
        &self.card().name
    }
}
