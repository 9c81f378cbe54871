//! Local WLED controller client.
//!
//! The controller receives a flat `/json/state` document and renders the
//! effect internally — the engine never choreographs pixels over the
//! network. One bounded-timeout attempt per firing; a failure is the
//! caller's to log, never to retry.

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Duration;

use lumina_core::config::ControllerConfig;
use lumina_core::error::{LuminaError, Result};
use lumina_core::traits::LightController;
use lumina_core::types::{Color, SyncCommand};

/// WLED `/json/state` payload.
#[derive(Debug, Clone, Serialize)]
pub struct WledState {
    pub on: bool,
    pub bri: u8,
    pub seg: Vec<WledSegment>,
}

/// One WLED segment descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct WledSegment {
    /// Effect id.
    pub fx: u16,
    /// Effect speed.
    pub sx: u8,
    /// Effect intensity.
    pub ix: u8,
    /// Palette id, when the effect uses one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pal: Option<u8>,
    /// Color slots as RGB triples.
    pub col: Vec<[u8; 3]>,
}

impl WledState {
    /// Build this member's payload from a command. A ColorHarmony
    /// assignment replaces the palette with the member's single color.
    pub fn from_command(command: &SyncCommand, color_override: Option<Color>) -> Self {
        let col = match color_override {
            Some(c) => vec![c.as_triple()],
            None => command
                .request
                .colors
                .iter()
                .map(Color::as_triple)
                .collect(),
        };
        Self {
            on: true,
            bri: command.request.brightness,
            seg: vec![WledSegment {
                fx: command.request.effect_id,
                sx: command.request.speed,
                ix: command.request.intensity,
                pal: None,
                col,
            }],
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// HTTP client for the member's own controller on the local network.
pub struct WledController {
    client: reqwest::Client,
    base_url: String,
}

impl WledController {
    pub fn new(config: &ControllerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LuminaError::ControllerUnreachable(format!("client build: {e}")))?;
        Ok(Self {
            client,
            base_url: format!("http://{}:{}", config.host, config.port),
        })
    }
}

#[async_trait]
impl LightController for WledController {
    async fn apply(&self, state: &serde_json::Value) -> Result<()> {
        let url = format!("{}/json/state", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(state)
            .send()
            .await
            .map_err(|e| LuminaError::ControllerUnreachable(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(LuminaError::ControllerUnreachable(format!(
                "{url}: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}
