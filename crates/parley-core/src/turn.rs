// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! One conversational turn: user message in, assistant message out.
//!
//! The user's message is stored before the provider is asked anything, so a
//! failed request never loses what the user typed.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use parley_config::Settings;
use parley_model::{ChatCompleter, ChatMessage, ChatRequest};
use parley_store::{Message, Result, Role, SessionStore, StoreError};

/// Assistant message recorded when the provider could not produce a reply.
pub const DIAGNOSTIC_REPLY: &str = "Sorry, the assistant could not be reached. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The assistant message that was appended (the diagnostic on failure).
    pub reply: String,
    pub upstream_failed: bool,
}

/// Run one turn against `session_id`.
///
/// Both messages are stamped by `clock`, which is read once per append.
/// Provider failures are absorbed into [`DIAGNOSTIC_REPLY`]; the only error
/// returned is [`StoreError::NotFound`] for an unknown session.
pub async fn run_turn(
    store: &mut SessionStore,
    completer: &dyn ChatCompleter,
    settings: &Settings,
    session_id: &str,
    input: &str,
    clock: impl Fn() -> DateTime<Utc>,
) -> Result<TurnOutcome> {
    store.append_message(session_id, Role::User, input, clock())?;

    let session = store
        .get(session_id)
        .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
    let request = build_request(settings, &session.messages);
    debug!(
        session = session_id,
        provider = completer.name(),
        history = request.history.len(),
        "requesting reply"
    );

    let (reply, upstream_failed) = match completer.complete_chat(request).await {
        Ok(text) => (text, false),
        Err(e) => {
            warn!(session = session_id, error = %e, "reply generation failed");
            (DIAGNOSTIC_REPLY.to_string(), true)
        }
    };

    store.append_message(session_id, Role::Assistant, &reply, clock())?;
    info!(session = session_id, upstream_failed, "turn complete");
    Ok(TurnOutcome { reply, upstream_failed })
}

/// Provider request for a stored conversation under the given settings.
pub fn build_request(settings: &Settings, messages: &[Message]) -> ChatRequest {
    let history = messages
        .iter()
        .map(|m| match m.role {
            Role::User => ChatMessage::user(m.content.clone()),
            Role::Assistant => ChatMessage::assistant(m.content.clone()),
        })
        .collect();
    ChatRequest {
        system_prompt: settings.system_prompt.clone(),
        history,
        model: settings.model.clone(),
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    }
}
