//! Mock wave-to-wave models for testing
//!
//! These models don't do real inference but produce deterministic,
//! verifiable audio changes, so the processing pipeline and the render
//! path can be exercised without a backend.

use super::model::{ModelCard, ModelParams, Wave2Wave};
use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, SonaraError};

/// Returns the input unchanged
pub struct PassthroughModel {
    card: ModelCard,
}

impl PassthroughModel {
    pub fn new() -> Self {
        Self {
            card: ModelCard::new(
                "Passthrough",
                "Returns the input unchanged (MOCK)",
                "sonara",
            )
            .with_tags(&["identity", "testing"]),
        }
    }
}

impl Default for PassthroughModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Wave2Wave for PassthroughModel {
    fn card(&self) -> &ModelCard {
        &self.card
    }

    fn process(
        &self,
        input: &AudioBuffer,
        _sample_rate: f64,
        _params: &ModelParams,
    ) -> Result<AudioBuffer> {
        Ok(input.clone())
    }
}

/// Applies a fixed gain, configurable via the `gain_db` parameter
pub struct GainModel {
    card: ModelCard,
    default_gain_db: f32,
}

impl GainModel {
    pub fn new(default_gain_db: f32) -> Self {
        Self {
            card: ModelCard::new("Gain", "Applies a fixed gain (MOCK)", "sonara")
                .with_tags(&["gain", "testing"]),
            default_gain_db,
        }
    }
}

impl Wave2Wave for GainModel {
    fn card(&self) -> &ModelCard {
        &self.card
    }

    fn process(
        &self,
        input: &AudioBuffer,
        _sample_rate: f64,
        params: &ModelParams,
    ) -> Result<AudioBuffer> {
        let gain_db = params.get_f32("gain_db").unwrap_or(self.default_gain_db);
        let mut output = input.clone();
        output.apply_gain(gain_db);
        Ok(output)
    }
}

/// Folds any input down to a single averaged channel
///
/// Useful in tests for the mono-broadcast read path: the published
/// buffer has one channel regardless of the render layout.
pub struct MonoFoldModel {
    card: ModelCard,
}

impl MonoFoldModel {
    pub fn new() -> Self {
        Self {
            card: ModelCard::new("Mono Fold", "Averages channels to mono (MOCK)", "sonara")
                .with_tags(&["downmix", "testing"]),
        }
    }
}

impl Default for MonoFoldModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Wave2Wave for MonoFoldModel {
    fn card(&self) -> &ModelCard {
        &self.card
    }

    fn process(
        &self,
        input: &AudioBuffer,
        _sample_rate: f64,
        _params: &ModelParams,
    ) -> Result<AudioBuffer> {
        let channels = input.num_channels();
        if channels == 0 {
            return Err(SonaraError::EmptyAudio);
        }
        let scale = 1.0 / channels as f32;
        let mono: Vec<f32> = (0..input.num_samples())
            .map(|i| {
                (0..channels)
                    .map(|ch| input.channel(ch)[i])
                    .sum::<f32>()
                    * scale
            })
            .collect();
        AudioBuffer::from_channels(vec![mono], input.sample_rate())
    }
}

/// Always reports not ready and fails to process
///
/// Exercises the `ModelNotReady` path in job scheduling tests.
pub struct UnavailableModel {
    card: ModelCard,
}

impl UnavailableModel {
    pub fn new() -> Self {
        Self {
            card: ModelCard::new("Unavailable", "Never ready (MOCK)", "sonara"),
        }
    }
}

impl Default for UnavailableModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Wave2Wave for UnavailableModel {
    fn card(&self) -> &ModelCard {
        &self.card
    }

    fn ready(&self) -> bool {
        false
    }

    fn process(
        &self,
        _input: &AudioBuffer,
        _sample_rate: f64,
        _params: &ModelParams,
    ) -> Result<AudioBuffer> {
        Err(SonaraError::ModelNotReady {
            model: self.card.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn stereo_input() -> AudioBuffer {
        AudioBuffer::from_channels(vec![vec![0.5; 100], vec![-0.5; 100]], 48000).unwrap()
    }

    #[test]
    fn test_passthrough_is_identity() {
        let input = stereo_input();
        let output = PassthroughModel::new()
            .process(&input, 48000.0, &ModelParams::new())
            .unwrap();
        assert_eq!(output.num_channels(), 2);
        assert_eq!(output.channel(0), input.channel(0));
    }

    #[test]
    fn test_gain_model_uses_param() {
        let input = stereo_input();
        let params = ModelParams::new().with_param("gain_db", -6.0f32);
        let output = GainModel::new(0.0).process(&input, 48000.0, &params).unwrap();
        assert_abs_diff_eq!(output.channel(0)[0], 0.2506, epsilon = 1e-3);
    }

    #[test]
    fn test_mono_fold_averages() {
        let input = stereo_input();
        let output = MonoFoldModel::new()
            .process(&input, 48000.0, &ModelParams::new())
            .unwrap();
        assert_eq!(output.num_channels(), 1);
        assert_abs_diff_eq!(output.channel(0)[0], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_unavailable_model() {
        let model = UnavailableModel::new();
        assert!(!model.ready());
        let result = model.process(&stereo_input(), 48000.0, &ModelParams::new());
        assert!(matches!(result, Err(SonaraError::ModelNotReady { .. })));
    }
}
