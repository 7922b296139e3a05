//! Transcript-driven session stand-in.
//!
//! A [`ScriptedSession`] replays a prerecorded command/reply transcript
//! through the same [`CommandExchange`] surface the live session exposes,
//! so dispatcher and grammar logic can be exercised without a reachable
//! unit. Transcripts are JSONL, one exchange per line, and double as
//! fixtures under `tests/fixtures/`.

use std::collections::VecDeque;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

use super::CommandExchange;

/// One prerecorded exchange.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScriptedExchange {
    /// Command text the caller is expected to send.
    pub command: String,

    /// Reply returned for a waited exchange.
    #[serde(default)]
    pub reply: String,

    /// Whether the recorded exchange waited for the prompt.
    #[serde(default = "default_wait")]
    pub wait: bool,
}

fn default_wait() -> bool {
    true
}

/// Replays a transcript in order, failing on any divergence.
#[derive(Debug)]
pub struct ScriptedSession {
    host: String,
    entries: VecDeque<ScriptedExchange>,
}

impl ScriptedSession {
    /// Build a session from explicit exchanges.
    pub fn new(host: impl Into<String>, entries: Vec<ScriptedExchange>) -> Self {
        Self {
            host: host.into(),
            entries: entries.into(),
        }
    }

    /// Build a waited-exchange session from `(command, reply)` pairs.
    pub fn from_pairs(host: impl Into<String>, pairs: Vec<(&str, &str)>) -> Self {
        Self::new(
            host,
            pairs
                .into_iter()
                .map(|(command, reply)| ScriptedExchange {
                    command: command.to_string(),
                    reply: reply.to_string(),
                    wait: true,
                })
                .collect(),
        )
    }

    /// Load a transcript from JSONL text (blank lines are skipped).
    pub fn from_jsonl(host: impl Into<String>, text: &str) -> Result<Self, EngineError> {
        let mut entries = VecDeque::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: ScriptedExchange = serde_json::from_str(line).map_err(|err| {
                EngineError::ReplayMismatch(format!("transcript line {}: {}", idx + 1, err))
            })?;
            entries.push_back(entry);
        }
        Ok(Self {
            host: host.into(),
            entries,
        })
    }

    /// Number of exchanges not yet replayed.
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }

    /// True when every recorded exchange has been consumed.
    pub fn is_drained(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_entry(&mut self, command: &str, wait: bool) -> Result<ScriptedExchange, EngineError> {
        let entry = self.entries.pop_front().ok_or_else(|| {
            EngineError::ReplayMismatch(format!("transcript exhausted before '{command}'"))
        })?;
        if entry.command != command {
            return Err(EngineError::ReplayMismatch(format!(
                "expected '{}', got '{}'",
                entry.command, command
            )));
        }
        if entry.wait != wait {
            return Err(EngineError::ReplayMismatch(format!(
                "'{command}' recorded with wait={}, replayed with wait={}",
                entry.wait, wait
            )));
        }
        Ok(entry)
    }
}

impl CommandExchange for ScriptedSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn send_command(&mut self, command: &str) -> Result<String, EngineError> {
        let entry = self.next_entry(command, true)?;
        Ok(entry.reply)
    }

    async fn send_command_no_wait(&mut self, command: &str) -> Result<(), EngineError> {
        self.next_entry(command, false)?;
        Ok(())
    }
}
