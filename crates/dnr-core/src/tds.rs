//! Tracker Dataset (TDS) and surrogate mapping documents.
//!
//! All four top-level TDS keys are required; serde rejects a document that
//! lacks one or has the wrong JSON type. Maps keep document order, so rule
//! IDs follow the order entries appear in the input.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// =============================================================================
// Tracker Dataset
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tds {
    /// Alias (CNAME) domain -> the domain it resolves to.
    pub cnames: IndexMap<String, String>,
    /// Domain -> owning entity name.
    pub domains: IndexMap<String, String>,
    /// Entity name -> entity.
    pub entities: IndexMap<String, Entity>,
    /// Canonical tracker domain -> tracker entry.
    pub trackers: IndexMap<String, Tracker>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub prevalence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub owner: Owner,
    #[serde(rename = "default")]
    pub default_action: TrackerAction,
    #[serde(default)]
    pub rules: Vec<TrackerRule>,
    #[serde(default)]
    pub prevalence: f64,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A URL-matching sub-rule of a tracker entry. `rule` is a regular
/// expression, usually a plain escaped literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerRule {
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<TrackerAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exceptions: Option<RuleFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RuleFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surrogate: Option<String>,
}

impl TrackerRule {
    /// Sub-rules without an explicit action block.
    pub fn effective_action(&self) -> TrackerAction {
        self.action.unwrap_or(TrackerAction::Block)
    }
}

/// Initiator domain and resource type restriction. Both lists must match
/// when both are given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFilter {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl RuleFilter {
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.types.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackerAction {
    Block,
    Allow,
    Ignore,
    IgnoreUser,
}

impl TrackerAction {
    #[inline]
    pub fn is_block(self) -> bool {
        self == TrackerAction::Block
    }
}

impl Tds {
    /// Decode and validate a dataset from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decode and validate a dataset from an already parsed document.
    pub fn from_value(value: Value) -> Result<Self> {
        let tds: Tds = serde_json::from_value(value)
            .map_err(|e| Error::invalid_input(format!("tracker dataset: {e}")))?;
        tds.validate()?;
        Ok(tds)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        for (domain, tracker) in &self.trackers {
            if domain.trim().is_empty() {
                return Err(Error::invalid_input("tracker dataset: empty tracker domain"));
            }
            if tracker.owner.name.trim().is_empty() {
                return Err(Error::invalid_input(format!(
                    "tracker dataset: tracker {domain} has an empty owner name"
                )));
            }
            if !self.entities.contains_key(&tracker.owner.name) {
                log::debug!(
                    "tracker {} is owned by {} which has no entity entry",
                    domain,
                    tracker.owner.name
                );
            }
        }
        Ok(())
    }

    /// Domains the owning entity declares. Missing entities and entities
    /// without a domain list own nothing.
    pub fn owned_domains(&self, entity_name: &str) -> &[String] {
        self.entities
            .get(entity_name)
            .map(|entity| entity.domains.as_slice())
            .unwrap_or(&[])
    }
}

// =============================================================================
// Surrogates
// =============================================================================

/// Tracker (or alias) domain -> ordered `(match fragment, script path)` pairs.
pub type SurrogatesConfig = IndexMap<String, Vec<(String, String)>>;

/// Decode a surrogate mapping document.
pub fn parse_surrogates(value: Value) -> Result<SurrogatesConfig> {
    serde_json::from_value(value)
        .map_err(|e| Error::invalid_input(format!("surrogates mapping: {e}")))
}

/// Check that every surrogate entry names a fragment and a script.
pub fn validate_surrogates(surrogates: &SurrogatesConfig) -> Result<()> {
    for (domain, entries) in surrogates {
        if domain.trim().is_empty() {
            return Err(Error::invalid_input("surrogates mapping: empty domain"));
        }
        for (fragment, script) in entries {
            if fragment.is_empty() || script.is_empty() {
                return Err(Error::invalid_input(format!(
                    "surrogates mapping: incomplete entry for {domain}"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn minimal_tracker() -> Value {
        json!({
            "owner": { "name": "Tracker Co", "displayName": "Tracker" },
            "prevalence": 0.1,
            "fingerprinting": 2,
            "cookies": 0.05,
            "categories": ["Analytics"],
            "default": "ignore",
            "rules": [
                { "rule": "tracker\\.com\\/collect", "action": "block",
                  "exceptions": { "domains": ["site.com"], "types": ["image"] } },
                { "rule": "tracker\\.com\\/pixel" }
            ]
        })
    }

    #[test]
    fn decodes_dataset() {
        let tds = Tds::from_value(json!({
            "cnames": { "metrics.site.com": "tracker.com" },
            "domains": { "tracker.com": "Tracker Co" },
            "entities": { "Tracker Co": { "domains": ["tracker.com"], "prevalence": 1.5 } },
            "trackers": { "tracker.com": minimal_tracker() }
        }))
        .unwrap();

        let tracker = &tds.trackers["tracker.com"];
        assert_eq!(tracker.default_action, TrackerAction::Ignore);
        assert_eq!(tracker.rules.len(), 2);
        assert_eq!(tracker.rules[1].effective_action(), TrackerAction::Block);
        assert_eq!(
            tracker.rules[0].exceptions.as_ref().unwrap().domains,
            vec!["site.com".to_string()]
        );
        assert_eq!(tds.owned_domains("Tracker Co"), ["tracker.com".to_string()]);
    }

    #[test]
    fn rejects_every_incomplete_dataset() {
        let invalid = [
            Value::Null,
            json!(1),
            json!({}),
            json!({ "domains": {}, "entities": {}, "trackers": {} }),
            json!({ "cnames": {}, "entities": {}, "trackers": {} }),
            json!({ "cnames": {}, "domains": {}, "trackers": {} }),
            json!({ "cnames": {}, "domains": {}, "entities": {} }),
            json!({ "cnames": 1, "domains": 2, "entities": 3, "trackers": 4 }),
        ];

        for value in invalid {
            let result = Tds::from_value(value.clone());
            assert!(
                matches!(result, Err(Error::InvalidInput(_))),
                "accepted {value}"
            );
        }
    }

    #[test]
    fn syntax_errors_are_json_errors() {
        assert!(matches!(Tds::from_json("{\"cnames\":"), Err(Error::Json(_))));
    }

    #[test]
    fn missing_entity_owns_nothing() {
        let tds = Tds::from_value(json!({
            "cnames": {},
            "domains": {},
            "entities": { "Outbrain": { "prevalence": 79.9 } },
            "trackers": {}
        }))
        .unwrap();

        assert!(tds.owned_domains("Outbrain").is_empty());
        assert!(tds.owned_domains("comScore, Inc").is_empty());
    }

    #[test]
    fn rejects_empty_owner_name() {
        let mut tracker = minimal_tracker();
        tracker["owner"]["name"] = json!("");
        let result = Tds::from_value(json!({
            "cnames": {}, "domains": {}, "entities": {},
            "trackers": { "tracker.com": tracker }
        }));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn surrogate_mapping_shape() {
        let parsed = parse_surrogates(json!({
            "google-analytics.com": [["google-analytics.com/ga.js", "ga.js"]]
        }))
        .unwrap();
        assert_eq!(
            parsed["google-analytics.com"],
            vec![("google-analytics.com/ga.js".to_string(), "ga.js".to_string())]
        );

        assert!(parse_surrogates(Value::Null).is_err());
        assert!(parse_surrogates(json!(3)).is_err());
        assert!(parse_surrogates(json!({ "a.com": [["only-one"]] })).is_err());
    }

    #[test]
    fn surrogate_entries_must_be_complete() {
        let mut surrogates = SurrogatesConfig::new();
        surrogates.insert("a.com".to_string(), vec![("a.com/x.js".to_string(), String::new())]);
        assert!(validate_surrogates(&surrogates).is_err());
    }
}
