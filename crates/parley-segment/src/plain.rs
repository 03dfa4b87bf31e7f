// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use crate::Segment;

/// Render segments as plain text: prose verbatim, table rows as cells joined
/// by two spaces (no pipes), one blank line between segments.
///
/// Feeding the result back through [`segment`](crate::segment) yields no
/// table segments and the same text, provided inline stripping did not
/// expose fresh markup.  Stripping runs after lines are classified, so two
/// inputs are not stable: a code span hiding pipe syntax (`` `|a|` `` above
/// `|-|`) reads back as a table, and nested markers (`****x****`) lose
/// another layer on each pass.
pub fn to_plain_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|seg| match seg {
            Segment::Prose { text } => text.clone(),
            Segment::Table { header, rows } => std::iter::once(header)
                .chain(rows.iter())
                .map(|cells| cells.join("  "))
                // an all-empty row would read back as a paragraph break
                .filter(|line| !line.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        })
        .filter(|block| !block.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
