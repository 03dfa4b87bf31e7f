// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Plain-terminal presentation of segmented replies.
//!
//! Prose is printed exactly as segmented.  Tables get padded columns
//! measured in display cells, so wide (CJK, emoji) text still lines up.

use parley_segment::Segment;
use unicode_width::UnicodeWidthStr;

/// Render segments as terminal text, blocks separated by a blank line.
pub fn render_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|seg| match seg {
            Segment::Prose { text } => text.clone(),
            Segment::Table { header, rows } => render_table(header, rows),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Header, a rule, then body rows.  Rows may be shorter or longer than the
/// header; missing cells render blank.
pub fn render_table(header: &[String], rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).chain([header.len()]).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    let mut widths = vec![0usize; columns];
    for row in std::iter::once(header).chain(rows.iter().map(Vec::as_slice)) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(header, &widths));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat((*w).max(1)))
            .collect::<Vec<_>>()
            .join("  "),
    );
    lines.extend(rows.iter().map(|row| render_row(row, &widths)));
    lines.join("\n")
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        line.push_str(&" ".repeat(w.saturating_sub(cell.width())));
    }
    line.trim_end().to_string()
}
