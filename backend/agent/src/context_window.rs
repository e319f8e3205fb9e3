//! Bounds the in-memory turn list.
//!
//! Index 0 (the system turn) always survives; of the rest only the newest
//! `max_keep` are retained. Log files are never touched here.

use qwen_core::Turn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow {
    max_keep: usize,
}

impl ContextWindow {
    pub fn new(max_keep: usize) -> Self {
        Self { max_keep }
    }

    pub fn max_keep(&self) -> usize {
        self.max_keep
    }

    /// Trimmed copy of `turns`.
    pub fn trim(&self, turns: &[Turn]) -> Vec<Turn> {
        trim(turns, self.max_keep)
    }

    /// Trim in place. Returns how many turns were dropped.
    pub fn trim_in_place(&self, turns: &mut Vec<Turn>) -> usize {
        let limit = 1 + self.max_keep;
        if turns.len() <= limit {
            return 0;
        }
        let excess = turns.len() - limit;
        turns.drain(1..1 + excess);
        excess
    }
}

/// `[turns[0]] + last max_keep of turns[1..]`.
pub fn trim(turns: &[Turn], max_keep: usize) -> Vec<Turn> {
    let Some((first, rest)) = turns.split_first() else {
        return Vec::new();
    };
    let start = rest.len().saturating_sub(max_keep);
    std::iter::once(first.clone())
        .chain(rest[start..].iter().cloned())
        .collect()
}
