// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::row::{is_body_row, is_table_start};
use crate::{split_row, strip_inline};

/// One classified block of an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Prose { text: String },
    /// Body rows keep whatever cell count they were written with; they are
    /// neither padded nor truncated to the header width.
    Table { header: Vec<String>, rows: Vec<Vec<String>> },
}

enum State {
    InProse,
    InTable { header: Vec<String>, rows: Vec<Vec<String>> },
}

/// Single forward pass over the lines with one line of lookahead.
struct Segmenter<'a> {
    state: State,
    prose: Vec<&'a str>,
    out: Vec<Segment>,
}

impl<'a> Segmenter<'a> {
    fn new() -> Self {
        Self { state: State::InProse, prose: Vec::new(), out: Vec::new() }
    }

    fn flush_prose(&mut self) {
        if self.prose.is_empty() {
            return;
        }
        let text = strip_inline(&self.prose.join("\n"));
        self.prose.clear();
        self.out.push(Segment::Prose { text });
    }

    fn close_table(&mut self) {
        if let State::InTable { header, rows } = std::mem::replace(&mut self.state, State::InProse) {
            trace!(columns = header.len(), rows = rows.len(), "table segment");
            self.out.push(Segment::Table { header, rows });
        }
    }

    /// Feed one line.  Returns how many lines were consumed (the separator
    /// line after a header is consumed together with it).
    fn feed(&mut self, line: &'a str, next: Option<&'a str>) -> usize {
        if let State::InTable { rows, .. } = &mut self.state {
            if is_body_row(line) {
                rows.push(split_row(line));
                return 1;
            }
            // The breaking line is handled again in prose mode.
            self.close_table();
        }

        if is_table_start(line, next) {
            self.flush_prose();
            self.state = State::InTable { header: split_row(line), rows: Vec::new() };
            return 2;
        }

        if line.trim().is_empty() {
            self.flush_prose();
        } else {
            self.prose.push(line);
        }
        1
    }

    fn finish(mut self) -> Vec<Segment> {
        self.close_table();
        self.flush_prose();
        self.out
    }
}

/// Split `text` into alternating prose and table segments.
///
/// Total: any input, including the empty string, yields a (possibly empty)
/// list of segments.  Line endings may be `\n`, `\r\n` or `\r`.
pub fn segment(text: &str) -> Vec<Segment> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();

    let mut segmenter = Segmenter::new();
    let mut i = 0;
    while i < lines.len() {
        i += segmenter.feed(lines[i], lines.get(i + 1).copied());
    }
    segmenter.finish()
}
