// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Mixed-content segmentation of assistant replies.
//!
//! A reply is split into an ordered list of [`Segment`]s: free-form prose and
//! Markdown pipe tables.  Everything produced here is plain text; renderers
//! must never interpret it as markup.

mod inline;
mod plain;
mod row;
mod segmenter;

pub use inline::strip_inline;
pub use plain::to_plain_text;
pub use row::{is_separator_line, split_row};
pub use segmenter::{segment, Segment};
