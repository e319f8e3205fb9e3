//! In-memory state of one chat session.

use qwen_core::Turn;
use qwen_understanding::{Facts, render_facts};

/// Canonical turns plus the ephemeral session facts.
///
/// `turns[0]` is the system turn and is the only system turn in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    turns: Vec<Turn>,
    facts: Facts,
}

impl SessionState {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(system_prompt)],
            facts: Facts::new(),
        }
    }

    /// Start from a replayed session. Replayed system turns are dropped so
    /// the current system prompt stays the only one.
    pub fn with_history(
        system_prompt: impl Into<String>,
        history: impl IntoIterator<Item = Turn>,
    ) -> Self {
        let mut state = Self::new(system_prompt);
        state
            .turns
            .extend(history.into_iter().filter(|t| !t.is_system()));
        state
    }

    pub fn system(&self) -> &Turn {
        &self.turns[0]
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub(crate) fn turns_mut(&mut self) -> &mut Vec<Turn> {
        &mut self.turns
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn facts(&self) -> &Facts {
        &self.facts
    }

    /// Later values win per key.
    pub fn merge_facts(&mut self, facts: Facts) {
        self.facts.extend(facts);
    }

    /// Drop everything but the system turn and forget facts. Returns the
    /// number of turns dropped.
    pub fn reset(&mut self) -> usize {
        let dropped = self.turns.len() - 1;
        self.turns.truncate(1);
        self.facts.clear();
        dropped
    }

    /// Turns to send: system, then a facts turn when any are known, then the
    /// rest of the conversation.
    pub fn outbound(&self) -> Vec<Turn> {
        let mut out = Vec::with_capacity(self.turns.len() + 1);
        out.push(self.system().clone());
        if let Some(text) = render_facts(&self.facts) {
            out.push(Turn::system(text));
        }
        out.extend(self.turns[1..].iter().cloned());
        out
    }
}
