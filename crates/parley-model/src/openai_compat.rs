// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Non-streaming client for OpenAI-compatible `/chat/completions` endpoints.
//!
//! Works against OpenAI itself and the many servers that copy its wire
//! format (Ollama, vLLM, LM Studio, OpenRouter, ...).  Local servers usually
//! need no key, so the bearer header is only sent when one is configured.

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::{ChatCompleter, ChatRequest, ChatRole};

pub struct OpenAiCompatCompleter {
    api_key: Option<String>,
    /// Full chat completions URL, e.g. `https://api.openai.com/v1/chat/completions`.
    chat_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatCompleter {
    /// `base_url` ends **before** `/chat/completions`, e.g.
    /// `https://api.openai.com/v1`.
    pub fn new(api_key: Option<String>, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            api_key,
            chat_url: format!("{base}/chat/completions"),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChatCompleter for OpenAiCompatCompleter {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete_chat(&self, req: ChatRequest) -> anyhow::Result<String> {
        let body = build_request_body(&req);

        debug!(
            model = %req.model,
            message_count = req.history.len(),
            "sending completion request"
        );
        tracing::trace!(request_body = ?body, "full completion request");

        let mut http_req = self.client.post(&self.chat_url).json(&body);
        if let Some(key) = &self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let resp = http_req.send().await.context("completion request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("completion error {status}: {text}");
        }

        let body: Value = resp.json().await.context("decoding completion response")?;
        parse_reply(&body)
    }
}

/// Request body: the system prompt leads, followed by the history as-is.
fn build_request_body(req: &ChatRequest) -> Value {
    let mut messages = Vec::with_capacity(req.history.len() + 1);
    if !req.system_prompt.trim().is_empty() {
        messages.push(json!({ "role": ChatRole::System.as_str(), "content": req.system_prompt }));
    }
    messages.extend(
        req.history
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content })),
    );

    let mut body = json!({
        "model": req.model,
        "messages": messages,
        "temperature": req.temperature,
        "stream": false,
    });
    if let Some(max) = req.max_tokens {
        body["max_tokens"] = json!(max);
    }
    body
}

/// Pull `choices[0].message.content` out of a completion response.
fn parse_reply(body: &Value) -> anyhow::Result<String> {
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        let msg = err["message"].as_str().unwrap_or("unknown error");
        bail!("provider returned an error: {msg}");
    }
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .context("completion response has no message content")
}
