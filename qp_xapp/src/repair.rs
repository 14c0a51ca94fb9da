//! Best-effort repair of truncated JSON payloads.
//!
//! Inbound payloads are sometimes cut off mid-stream. Repair closes what was
//! left open and strips dangling commas; it is not a general JSON recovery
//! algorithm. Anything it cannot fix comes back unchanged as
//! [`RepairOutcome::Failed`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Repair strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairMode {
    /// Close unterminated strings, objects and arrays in nesting order
    #[default]
    Nested,
    /// Count-based patching that assumes a truncated top-level array
    Legacy,
}

/// Result of a repair attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The (trimmed) payload already parsed
    Unchanged(String),
    /// The payload was patched into valid JSON
    Repaired(String),
    /// Repair did not produce valid JSON; holds the original payload
    Failed(String),
}

impl RepairOutcome {
    pub fn text(&self) -> &str {
        match self {
            RepairOutcome::Unchanged(text)
            | RepairOutcome::Repaired(text)
            | RepairOutcome::Failed(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            RepairOutcome::Unchanged(text)
            | RepairOutcome::Repaired(text)
            | RepairOutcome::Failed(text) => text,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RepairOutcome::Failed(_))
    }
}

/// Repair `text` using `mode`
pub fn repair(text: &str, mode: RepairMode) -> RepairOutcome {
    let candidate = match mode {
        RepairMode::Nested => {
            let trimmed = text.trim();
            if is_valid_json(trimmed) {
                return RepairOutcome::Unchanged(trimmed.to_string());
            }
            close_nested(trimmed)
        }
        RepairMode::Legacy => patch_legacy(text),
    };

    if is_valid_json(&candidate) {
        if candidate == text {
            RepairOutcome::Unchanged(candidate)
        } else {
            debug!(added = candidate.len().saturating_sub(text.trim().len()), "payload repaired");
            RepairOutcome::Repaired(candidate)
        }
    } else {
        warn!(?mode, "repaired payload is still invalid JSON");
        RepairOutcome::Failed(text.to_string())
    }
}

fn is_valid_json(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text).is_ok()
}

/// Unclosed delimiters and string state at the end of a payload
#[derive(Debug, Default)]
struct Scan {
    closers: Vec<char>,
    in_string: bool,
    escaped: bool,
    mismatched: bool,
}

fn scan(text: &str) -> Scan {
    let mut state = Scan::default();
    for c in text.chars() {
        if state.in_string {
            if state.escaped {
                state.escaped = false;
            } else if c == '\\' {
                state.escaped = true;
            } else if c == '"' {
                state.in_string = false;
            }
            continue;
        }
        match c {
            '"' => state.in_string = true,
            '{' => state.closers.push('}'),
            '[' => state.closers.push(']'),
            '}' | ']' => {
                if state.closers.pop() != Some(c) {
                    state.mismatched = true;
                }
            }
            _ => {}
        }
    }
    state
}

fn strip_trailing_commas(text: &mut String) {
    loop {
        let trimmed_len = text.trim_end().len();
        text.truncate(trimmed_len);
        if text.ends_with(',') {
            text.pop();
        } else {
            break;
        }
    }
}

fn close_nested(trimmed: &str) -> String {
    let state = scan(trimmed);
    let mut candidate = trimmed.to_string();
    if state.mismatched {
        return candidate;
    }

    if state.in_string {
        // A dangling escape would swallow the closing quote
        if state.escaped {
            candidate.pop();
        }
        candidate.push('"');
    }
    strip_trailing_commas(&mut candidate);
    candidate.extend(state.closers.iter().rev());
    candidate
}

fn patch_legacy(text: &str) -> String {
    let mut payload = text.trim().to_string();

    if payload.starts_with('[') && !payload.ends_with(']') {
        payload = payload.trim_end_matches(',').to_string();
        payload.push(']');
    }
    if payload.ends_with(',') {
        payload = payload.trim_end_matches(',').to_string();
    }

    payload.push(']');

    let open_braces = payload.matches('{').count();
    let close_braces = payload.matches('}').count();
    if open_braces > close_braces {
        payload.push_str(&"}".repeat(open_braces - close_braces));
    }

    let open_brackets = payload.matches('[').count();
    let close_brackets = payload.matches(']').count();
    if open_brackets > close_brackets {
        payload.push_str(&"]".repeat(open_brackets - close_brackets));
    }

    if payload.starts_with('[') && !payload.ends_with(']') {
        payload.push(']');
    }
    if payload.starts_with('{') && !payload.ends_with('}') {
        payload.push('}');
    }

    payload
}
