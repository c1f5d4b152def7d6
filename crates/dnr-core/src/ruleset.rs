//! Compiled ruleset plus match details.
//!
//! Match details are provenance only: they map a rule ID back to the policy
//! entry that produced it and play no part in how the browser evaluates the
//! rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Rule;

/// Provenance of one compiled rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MatchDetails {
    /// Default action or sub-rule of a tracker entry.
    TrackerBlocking {
        domain: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rule: Option<String>,
    },
    /// Exception carved out of a tracker sub-rule.
    TrackerBlockingException { domain: String, rule: String },
    /// Tracker allowlist entry.
    TrackerAllowlist { domain: String, reason: String },
    /// Cookie header stripping for one or more entities.
    CookieBlocking { entities: Vec<String> },
    /// Surrogate script redirect.
    SurrogateScript { domain: String, rule: String },
    Gpc,
    SmarterEncryption,
}

/// Output of a generator or of the whole pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesetResult {
    pub ruleset: Vec<Rule>,
    pub match_details_by_rule_id: BTreeMap<u32, MatchDetails>,
}

impl RulesetResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ruleset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ruleset.is_empty()
    }

    /// Append a rule that already carries its ID.
    pub fn push(&mut self, rule: Rule, details: MatchDetails) {
        self.match_details_by_rule_id.insert(rule.id, details);
        self.ruleset.push(rule);
    }

    /// Append `other`, keeping its rule IDs.
    pub fn append(&mut self, other: RulesetResult) {
        self.ruleset.extend(other.ruleset);
        self.match_details_by_rule_id
            .extend(other.match_details_by_rule_id);
    }
}

/// Sequential rule IDs. Running past `u32::MAX` is an error, never a wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleIds {
    next: Option<u32>,
}

impl RuleIds {
    pub fn starting_at(first: u32) -> Self {
        Self { next: Some(first) }
    }

    /// The ID the next rule would get.
    pub fn peek(&self) -> Result<u32> {
        self.next.ok_or_else(exhausted)
    }

    /// Take the next ID.
    pub fn next_id(&mut self) -> Result<u32> {
        let id = self.peek()?;
        self.next = id.checked_add(1);
        Ok(id)
    }

    /// Skip over `count` IDs that were handed out elsewhere.
    pub fn advance(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let last = u32::try_from(count - 1)
            .ok()
            .and_then(|offset| self.peek().ok()?.checked_add(offset))
            .ok_or_else(exhausted)?;
        self.next = last.checked_add(1);
        Ok(())
    }
}

fn exhausted() -> Error {
    Error::invalid_input("rule IDs exhausted")
}
