//! Error type shared by every Blockwright crate.
//!
//! Compilation never degrades: any of these aborts the whole run and no
//! partial ruleset is returned.

use crate::priority::RuleFamily;

/// Error type for policy loading and ruleset compilation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A policy document is structurally wrong (missing keys, wrong types,
    /// empty identifiers).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A policy document could not be decoded.
    #[error("Malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// The regex capability probe failed or gave an unusable answer.
    #[error("Regex support probe failed for `{pattern}`: {reason}")]
    Probe { pattern: String, reason: String },

    /// A tracker entry has more rules than its priority band can rank.
    #[error("Tracker entry {domain} has {count} rules, the {family} band ranks at most {max}")]
    Capacity {
        domain: String,
        count: usize,
        max: usize,
        family: RuleFamily,
    },

    /// A resource type name that neither DNR nor the tracker dataset defines.
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn probe(pattern: &str, reason: impl Into<String>) -> Self {
        Self::Probe {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Blockwright operations.
pub type Result<T> = std::result::Result<T, Error>;
