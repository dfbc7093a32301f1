//! HTTP bridge model
//!
//! A [`Wave2Wave`] implementation that delegates inference to an
//! external bridge service over HTTP. Audio travels by file path: the
//! input buffer is written to a temp WAV, the bridge writes its result
//! next to it, and the output is read back in.
//!
//! Only compiled with the `bridge` feature.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{ModelCard, ModelParams, Wave2Wave};
use crate::engine::buffer::AudioBuffer;
use crate::engine::io::{export_audio, import_audio};
use crate::error::{Result, SonaraError};

const DEFAULT_BRIDGE_URL: &str = "http://localhost:8001";
const DEFAULT_TIMEOUT_MS: u64 = 300_000;
const HEALTH_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    input_path: String,
    output_path: String,
    sample_rate: f64,
    params: &'a ModelParams,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    success: bool,
    output_path: Option<String>,
    error_message: Option<String>,
}

/// Wave-to-wave model backed by a remote inference bridge
pub struct BridgeModel {
    card: ModelCard,
    bridge_url: String,
    timeout_ms: u64,
}

impl BridgeModel {
    /// Create a bridge model configured from the environment
    ///
    /// Reads `SONARA_BRIDGE_URL` and `SONARA_BRIDGE_TIMEOUT_MS`,
    /// falling back to localhost and five minutes.
    pub fn new() -> Self {
        let bridge_url =
            env::var("SONARA_BRIDGE_URL").unwrap_or_else(|_| DEFAULT_BRIDGE_URL.into());
        let timeout_ms = env::var("SONARA_BRIDGE_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Self::with_config(bridge_url, timeout_ms)
    }

    /// Create a bridge model with an explicit endpoint and timeout
    pub fn with_config(bridge_url: String, timeout_ms: u64) -> Self {
        Self {
            card: ModelCard::new(
                "Bridge",
                "Delegates wave-to-wave inference to an external bridge service",
                "sonara",
            )
            .with_tags(&["bridge", "remote"]),
            bridge_url,
            timeout_ms,
        }
    }

    fn client(&self, timeout: Duration) -> Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SonaraError::BridgeUnavailable {
                reason: e.to_string(),
            })
    }

    fn send_request(&self, request: &BridgeRequest<'_>) -> Result<BridgeResponse> {
        let client = self.client(Duration::from_millis(self.timeout_ms))?;
        let url = format!("{}/process", self.bridge_url);

        let response = client.post(&url).json(request).send().map_err(|e| {
            if e.is_timeout() {
                SonaraError::BridgeTimeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                SonaraError::BridgeUnavailable {
                    reason: format!("cannot reach bridge at {}: {}", self.bridge_url, e),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(SonaraError::BridgeUnavailable {
                reason: format!("bridge returned {}", response.status()),
            });
        }

        response
            .json::<BridgeResponse>()
            .map_err(|e| SonaraError::BridgeUnavailable {
                reason: format!("invalid response from bridge: {}", e),
            })
    }

    fn scratch_path(tag: &str) -> PathBuf {
        env::temp_dir().join(format!("sonara-{}-{}.wav", tag, Uuid::new_v4()))
    }
}

impl Default for BridgeModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Wave2Wave for BridgeModel {
    fn card(&self) -> &ModelCard {
        &self.card
    }

    fn ready(&self) -> bool {
        let client = match self.client(Duration::from_secs(HEALTH_TIMEOUT_SECS)) {
            Ok(client) => client,
            Err(_) => return false,
        };
        let url = format!("{}/health", self.bridge_url);
        match client.get(&url).send() {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn process(
        &self,
        input: &AudioBuffer,
        sample_rate: f64,
        params: &ModelParams,
    ) -> Result<AudioBuffer> {
        let input_path = Self::scratch_path("in");
        let output_path = Self::scratch_path("out");

        export_audio(input, &input_path, 32)?;
        debug!(
            "bridge request: {} frames at {} Hz via {}",
            input.num_samples(),
            sample_rate,
            self.bridge_url
        );

        let request = BridgeRequest {
            input_path: input_path.to_string_lossy().to_string(),
            output_path: output_path.to_string_lossy().to_string(),
            sample_rate,
            params,
        };
        let response = self.send_request(&request);

        if let Err(e) = std::fs::remove_file(&input_path) {
            warn!("could not remove bridge input {}: {}", input_path.display(), e);
        }
        let response = response?;

        if !response.success {
            return Err(SonaraError::InferenceError {
                reason: response
                    .error_message
                    .unwrap_or_else(|| "bridge reported failure".to_string()),
            });
        }

        let result_path = response
            .output_path
            .map(PathBuf::from)
            .unwrap_or(output_path);
        let output = import_audio(&result_path)?;
        if let Err(e) = std::fs::remove_file(&result_path) {
            warn!(
                "could not remove bridge output {}: {}",
                result_path.display(),
                e
            );
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_bridge_is_not_ready() {
        // Port 9 (discard) is never serving HTTP.
        let model = BridgeModel::with_config("http://127.0.0.1:9".to_string(), 1000);
        assert!(!model.ready());
    }

    #[test]
    fn test_process_against_dead_bridge_errors() {
        let model = BridgeModel::with_config("http://127.0.0.1:9".to_string(), 1000);
        let input = AudioBuffer::new(1, 64, 48000);
        let result = model.process(&input, 48000.0, &ModelParams::new());
        assert!(matches!(
            result,
            Err(SonaraError::BridgeUnavailable { .. }) | Err(SonaraError::BridgeTimeout { .. })
        ));
    }
}
