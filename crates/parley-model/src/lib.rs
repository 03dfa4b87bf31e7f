// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod types;
mod completer;
mod openai_compat;
mod mock;

pub use types::*;
pub use completer::ChatCompleter;
pub use openai_compat::OpenAiCompatCompleter;
pub use mock::{EchoCompleter, ScriptedCompleter};

use anyhow::bail;
use parley_config::ModelConfig;

/// Construct a boxed [`ChatCompleter`] from configuration.
///
/// Provider selection:
/// - `"openai"` → [`OpenAiCompatCompleter`] (any OpenAI-compatible endpoint)
/// - `"mock"` → [`EchoCompleter`]
pub fn from_config(cfg: &ModelConfig) -> anyhow::Result<Box<dyn ChatCompleter>> {
    match cfg.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiCompatCompleter::new(
            resolve_api_key(cfg),
            cfg.base_url.as_deref().unwrap_or("https://api.openai.com/v1"),
        ))),
        "mock" => Ok(Box::new(EchoCompleter)),
        other => bail!("unknown model provider: {other}"),
    }
}

fn resolve_api_key(cfg: &ModelConfig) -> Option<String> {
    if let Some(k) = &cfg.api_key {
        return Some(k.clone());
    }
    if let Some(env) = &cfg.api_key_env {
        return std::env::var(env).ok();
    }
    None
}
