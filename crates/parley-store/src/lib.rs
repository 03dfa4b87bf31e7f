// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Persistent multi-session conversation store.
//!
//! [`SessionStore`] owns every conversation, keeps the "current" selection
//! valid and flushes a complete JSON snapshot to an injected [`KvStore`]
//! after each structural change.

mod error;
mod kv;
mod model;
mod settings;
mod store;

pub use error::{Result, StoreError};
pub use kv::{FileKv, KvStore, MemoryKv};
pub use model::{derive_title, Message, Role, Session, DEFAULT_TITLE, TITLE_MAX_CHARS};
pub use settings::{load_settings, save_settings, SETTINGS_KEY};
pub use store::{SearchOutcome, SessionStore, SESSIONS_KEY};
