// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::OnceLock;

use regex::Regex;

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("static regex"))
}

fn code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("static regex"))
}

/// Remove `**bold**` and `` `code` `` markers, keeping the inner text.
///
/// One non-recursive pass per marker kind, leftmost-shortest matches only.
/// Markers never span lines.  Unpaired or malformed markers are left as-is.
pub fn strip_inline(text: &str) -> String {
    let unbolded = bold_re().replace_all(text, "$1");
    code_re().replace_all(&unbolded, "$1").into_owned()
}
