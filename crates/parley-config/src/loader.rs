// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::Config;

/// Environment variable naming one more config file, applied just below an
/// explicit `--config` path.
pub const CONFIG_ENV: &str = "PARLEY_CONFIG";

/// One candidate config file.  Discovered layers are skipped when absent;
/// required ones must exist.
struct Layer {
    path: PathBuf,
    required: bool,
}

impl Layer {
    fn optional(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), required: false }
    }

    fn required(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), required: true }
    }
}

/// Every layer, lowest priority first.
fn layers(extra: Option<&Path>) -> Vec<Layer> {
    let mut layers = vec![Layer::optional("/etc/parley/config.toml")];
    layers.extend(dirs::home_dir().map(|h| Layer::optional(h.join(".config/parley/config.toml"))));
    layers.extend(dirs::config_dir().map(|c| Layer::optional(c.join("parley/config.toml"))));
    layers.push(Layer::optional(".parley/config.toml"));
    layers.push(Layer::optional("parley.toml"));
    layers.extend(
        std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(Layer::required),
    );
    layers.extend(extra.map(Layer::required));
    layers
}

/// Load configuration by deep-merging every config layer that exists.
///
/// `extra` is the `--config` path and wins over everything else.  A merged
/// tree that does not fit the schema yields the defaults.
pub fn load(extra: Option<&Path>) -> anyhow::Result<Config> {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    for layer in layers(extra) {
        if !layer.required && !layer.path.is_file() {
            continue;
        }
        debug!(path = %layer.path.display(), required = layer.required, "loading config layer");
        deep_merge(&mut merged, read_layer(&layer.path)?);
    }

    Ok(merged.try_into().unwrap_or_else(|e| {
        warn!(error = %e, "configuration does not match the schema; using defaults");
        Config::default()
    }))
}

fn read_layer(path: &Path) -> anyhow::Result<toml::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Tables merge key by key; any other value in `top` replaces `base`.
fn deep_merge(base: &mut toml::Value, top: toml::Value) {
    match (base, top) {
        (toml::Value::Table(b), toml::Value::Table(t)) => {
            for (key, value) in t {
                match b.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        b.insert(key, value);
                    }
                }
            }
        }
        (base, top) => *base = top,
    }
}
