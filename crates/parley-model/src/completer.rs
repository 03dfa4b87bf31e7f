// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;

use crate::ChatRequest;

#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// Provider name for status display and logs.
    fn name(&self) -> &str;

    /// Produce the assistant's reply text.  Errors cover transport failures,
    /// non-success HTTP status and malformed responses alike.
    async fn complete_chat(&self, req: ChatRequest) -> anyhow::Result<String>;
}
