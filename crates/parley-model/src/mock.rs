// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;

use crate::{ChatCompleter, ChatRequest, ChatRole};

/// Deterministic offline completer.  Echoes the last user message back as
/// the assistant reply.
#[derive(Default)]
pub struct EchoCompleter;

#[async_trait]
impl ChatCompleter for EchoCompleter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete_chat(&self, req: ChatRequest) -> anyhow::Result<String> {
        let last = req
            .history
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("[no input]");
        Ok(format!("MOCK: {last}"))
    }
}

/// A pre-scripted completer.  Each call pops the next scripted outcome;
/// `Err` entries simulate an unreachable upstream.
pub struct ScriptedCompleter {
    scripts: Arc<Mutex<Vec<Result<String, String>>>>,
    /// The last request seen, so tests can inspect what was sent.
    pub last_request: Arc<Mutex<Option<ChatRequest>>>,
}

impl ScriptedCompleter {
    pub fn new(scripts: Vec<Result<String, String>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Convenience: completer that always returns a single text reply.
    pub fn always_text(reply: impl Into<String>) -> Self {
        Self::new(vec![Ok(reply.into())])
    }

    /// Convenience: completer whose only call fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(vec![Err(message.into())])
    }
}

#[async_trait]
impl ChatCompleter for ScriptedCompleter {
    fn name(&self) -> &str {
        "scripted-mock"
    }

    async fn complete_chat(&self, req: ChatRequest) -> anyhow::Result<String> {
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(req);
        }
        let next = {
            let mut scripts = self
                .scripts
                .lock()
                .map_err(|_| anyhow!("script queue lock poisoned"))?;
            if scripts.is_empty() {
                Ok("[no more scripts]".to_string())
            } else {
                scripts.remove(0)
            }
        };
        next.map_err(|e| anyhow!(e))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
