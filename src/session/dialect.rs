//! Literal CLI wording for a device family.
//!
//! The banners a unit prints during login are firmware constants, not
//! protocol. A mismatch between these strings and the firmware's actual
//! wording misclassifies outcomes as spurious timeouts, so every marker
//! is plain data that deployments can override per device family.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Prompt and banner wording for one device family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CliDialect {
    /// Substring of the host-key confirmation question.
    pub host_key_prompt: String,

    /// Answer sent when the host-key question appears.
    pub host_key_answer: String,

    /// Password prompt template; `{user}` and `{host}` are substituted
    /// before matching.
    pub password_prompt: String,

    /// Pattern matching the command prompt at the end of the stream
    /// buffer. The reappearance of this token delimits command replies.
    pub prompt_pattern: String,

    /// Substring the transport prints when the host is unreachable.
    pub unreachable_marker: String,

    /// Command that closes the remote shell.
    pub exit_command: String,
}

impl Default for CliDialect {
    fn default() -> Self {
        Self {
            host_key_prompt: "Are you sure you want to continue connecting".to_string(),
            host_key_answer: "yes".to_string(),
            password_prompt: "{user}@{host}'s password: ".to_string(),
            prompt_pattern: r">\s*$".to_string(),
            unreachable_marker: "No route to host".to_string(),
            exit_command: "exit".to_string(),
        }
    }
}

impl CliDialect {
    /// Password prompt with user/host substituted.
    pub fn password_prompt_for(&self, user: &str, host: &str) -> String {
        self.password_prompt
            .replace("{user}", user)
            .replace("{host}", host)
    }

    /// Compile the command-prompt pattern.
    pub fn prompt_regex(&self) -> Result<Regex, EngineError> {
        Regex::new(&self.prompt_pattern).map_err(|err| {
            EngineError::InvalidScreen(format!(
                "invalid prompt pattern '{}': {}",
                self.prompt_pattern, err
            ))
        })
    }
}
