// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod turn;

pub use turn::{build_request, run_turn, TurnOutcome, DIAGNOSTIC_REPLY};
