// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// System prompt used when neither the config file nor the persisted
/// settings provide one.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. When tabular data helps, answer with a Markdown pipe table.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// `"openai"` for any OpenAI-compatible endpoint, `"mock"` for the
    /// offline echo provider.
    pub provider: String,
    /// Default model id; persisted settings may override it.
    pub name: String,
    /// Name of the environment variable read for the API key.
    pub api_key_env: Option<String>,
    /// Inline API key.  Takes precedence over `api_key_env`.
    pub api_key: Option<String>,
    /// Endpoint root such as `http://localhost:11434/v1`.
    pub base_url: Option<String>,
    /// Output token limit per reply; unset means the provider decides.
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            name: "gpt-4o-mini".into(),
            api_key_env: Some("OPENAI_API_KEY".into()),
            api_key: None,
            base_url: None,
            max_tokens: None,
            temperature: Some(0.7),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Prompt sent as the leading system message of every request.
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { system_prompt: DEFAULT_SYSTEM_PROMPT.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted `settings` and `sessions` snapshots.
    /// Defaults to `$XDG_DATA_HOME/parley`.
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// The effective data directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| {
                    dirs::home_dir()
                        .unwrap_or_else(|| PathBuf::from("."))
                        .join(".local")
                        .join("share")
                })
                .join("parley")
        })
    }
}

/// User-editable chat settings, persisted under the `settings` key.
///
/// Field names are part of the stored format and must stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub system_prompt: String,
    pub model: String,
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Settings {
    /// Seed settings from the file-based configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            system_prompt: config.chat.system_prompt.clone(),
            model: config.model.name.clone(),
            temperature: config.model.temperature.unwrap_or(0.7),
            max_tokens: config.model.max_tokens,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
