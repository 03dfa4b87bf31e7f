// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use parley_config::Settings;
use tracing::warn;

use crate::{KvStore, Result};

/// Storage key holding the settings snapshot.
pub const SETTINGS_KEY: &str = "settings";

/// Read persisted settings, falling back to `defaults` when nothing is
/// stored or the stored blob cannot be read or parsed.
pub fn load_settings(kv: &dyn KvStore, defaults: Settings) -> Settings {
    match kv.get(SETTINGS_KEY) {
        Ok(Some(blob)) => match serde_json::from_str(&blob) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "stored settings are corrupt; using defaults");
                defaults
            }
        },
        Ok(None) => defaults,
        Err(e) => {
            warn!(error = %e, "could not read stored settings; using defaults");
            defaults
        }
    }
}

pub fn save_settings(kv: &dyn KvStore, settings: &Settings) -> Result<()> {
    let blob = serde_json::to_string(settings)?;
    kv.set(SETTINGS_KEY, &blob)
}
