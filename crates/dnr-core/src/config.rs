//! Privacy configuration document.
//!
//! Only the features that produce rules are modeled; anything else in the
//! document is ignored.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Marker used in allowlist rules for "any initiator".
pub const ALL_INITIATORS: &str = "<all>";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyConfig {
    pub features: Features,
    /// Sites on which protections are switched off for now.
    #[serde(default)]
    pub unprotected_temporary: Vec<DomainException>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_allowlist: Option<TrackerAllowlistFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<CookieFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpc: Option<GpcFeature>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureState {
    Enabled,
    #[default]
    Disabled,
    /// Any other state (`internal`, `preview`, ...) counts as not enabled.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainException {
    pub domain: String,
    #[serde(default)]
    pub reason: String,
}

// =============================================================================
// Tracker Allowlist
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerAllowlistFeature {
    #[serde(default)]
    pub state: FeatureState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<TrackerAllowlistSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerAllowlistSettings {
    #[serde(default)]
    pub allowlisted_trackers: IndexMap<String, AllowlistEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistEntry {
    #[serde(default)]
    pub rules: Vec<AllowlistRule>,
}

/// One allowlist rule. Rules of an entry are matched top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistRule {
    /// Literal URL fragment.
    pub rule: String,
    /// Initiator domains, or `["<all>"]`.
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

impl AllowlistRule {
    /// Initiator restriction, with the "any initiator" marker normalized to
    /// no restriction at all.
    pub fn initiator_domains(&self) -> Option<&[String]> {
        match self.domains.first() {
            None => None,
            Some(first) if first == ALL_INITIATORS => None,
            Some(_) => Some(&self.domains),
        }
    }
}

// =============================================================================
// Cookie and GPC
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieFeature {
    #[serde(default)]
    pub state: FeatureState,
    /// Sites on which third-party cookies are not stripped.
    #[serde(default)]
    pub exceptions: Vec<DomainException>,
    #[serde(default)]
    pub settings: CookieSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieSettings {
    /// Third-party domains whose cookies are never stripped.
    #[serde(default)]
    pub excluded_cookie_domains: Vec<DomainException>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpcFeature {
    #[serde(default)]
    pub state: FeatureState,
    #[serde(default)]
    pub exceptions: Vec<DomainException>,
}

impl PrivacyConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::invalid_input(format!("privacy configuration: {e}")))
    }
}

impl FeatureState {
    #[inline]
    pub fn is_enabled(self) -> bool {
        self == FeatureState::Enabled
    }
}

/// Collect the `domain` of each exception.
pub fn exception_domains(exceptions: &[DomainException]) -> Vec<String> {
    exceptions.iter().map(|e| e.domain.clone()).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_features() {
        let config = PrivacyConfig::from_value(json!({
            "features": {
                "trackerAllowlist": {
                    "state": "enabled",
                    "settings": {
                        "allowlistedTrackers": {
                            "tracker.com": {
                                "rules": [
                                    { "rule": "tracker.com/a.js", "domains": ["<all>"], "reason": "breakage" },
                                    { "rule": "tracker.com/b.js", "domains": ["site.com"], "reason": "login" }
                                ]
                            }
                        }
                    }
                },
                "cookie": {
                    "state": "enabled",
                    "exceptions": [{ "domain": "shop.com", "reason": "cart" }],
                    "settings": { "excludedCookieDomains": [{ "domain": "sso.tracker.com", "reason": "" }] }
                },
                "gpc": { "state": "internal", "exceptions": [] },
                "autoconsent": { "state": "enabled" }
            },
            "unprotectedTemporary": [{ "domain": "broken.com", "reason": "site breakage" }]
        }))
        .unwrap();

        let allowlist = config.features.tracker_allowlist.as_ref().unwrap();
        assert!(allowlist.state.is_enabled());
        let rules = &allowlist.settings.as_ref().unwrap().allowlisted_trackers["tracker.com"].rules;
        assert_eq!(rules[0].initiator_domains(), None);
        assert_eq!(rules[1].initiator_domains(), Some(&["site.com".to_string()][..]));

        let cookie = config.features.cookie.as_ref().unwrap();
        assert_eq!(exception_domains(&cookie.settings.excluded_cookie_domains), vec!["sso.tracker.com"]);

        assert_eq!(config.features.gpc.as_ref().unwrap().state, FeatureState::Other);
        assert_eq!(exception_domains(&config.unprotected_temporary), vec!["broken.com"]);
    }

    #[test]
    fn missing_features_is_invalid() {
        assert!(matches!(
            PrivacyConfig::from_value(json!({ "unprotectedTemporary": [] })),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_domain_list_means_all_initiators() {
        let rule = AllowlistRule {
            rule: "tracker.com/x".to_string(),
            domains: vec![],
            reason: String::new(),
        };
        assert_eq!(rule.initiator_domains(), None);
    }
}
