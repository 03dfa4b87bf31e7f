// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use crate::strip_inline;

/// `true` for a header/body divider such as `|---|:--:|`.
///
/// The trimmed line must start with `|`, contain at least one `-`, and hold
/// nothing but pipes, hyphens, colons and whitespace.  Column count is not
/// compared with the header.
pub fn is_separator_line(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('|')
        && t.contains('-')
        && t.chars().all(|c| matches!(c, '|' | '-' | ':') || c.is_whitespace())
}

/// Split a table row into trimmed, inline-stripped cells.
///
/// One leading and one trailing pipe are dropped before splitting, so
/// `| a | b |` and `a | b` both yield `["a", "b"]`.
pub fn split_row(line: &str) -> Vec<String> {
    let t = line.trim();
    let t = t.strip_prefix('|').unwrap_or(t);
    let t = t.strip_suffix('|').unwrap_or(t);
    t.split('|').map(|cell| strip_inline(cell.trim())).collect()
}

/// A row that continues an open table body.
pub(crate) fn is_body_row(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && t.starts_with('|') && !is_separator_line(t)
}

/// A pipe-prefixed line immediately followed by a separator line.
pub(crate) fn is_table_start(line: &str, next: Option<&str>) -> bool {
    line.trim().starts_with('|') && next.is_some_and(is_separator_line)
}
