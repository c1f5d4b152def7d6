//! declarativeNetRequest rule model
//!
//! These types serialize to exactly the JSON shape the browser's rule
//! schema accepts: camelCase keys, absent conditions omitted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

// =============================================================================
// Rule
// =============================================================================

/// A compiled rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique across the compiled ruleset. `0` until the combiner assigns it.
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

impl Rule {
    /// Return this rule with its ID set.
    pub fn with_id(self, id: u32) -> Self {
        Self { id, ..self }
    }
}

// =============================================================================
// Actions
// =============================================================================

/// Action taken when a rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleAction {
    /// Cancel the request
    Block,
    /// Let the request through, overriding lower priority rules
    Allow,
    /// Serve a different resource
    Redirect { redirect: Redirect },
    /// Rewrite request and/or response headers
    #[serde(rename_all = "camelCase")]
    ModifyHeaders {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        request_headers: Vec<HeaderInfo>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        response_headers: Vec<HeaderInfo>,
    },
    /// Upgrade http:// (and ws://) to the secure scheme
    UpgradeScheme,
}

impl RuleAction {
    pub fn redirect_to_extension_path(path: impl Into<String>) -> Self {
        RuleAction::Redirect {
            redirect: Redirect {
                extension_path: Some(path.into()),
                url: None,
            },
        }
    }

    /// Short name as used in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            RuleAction::Block => "block",
            RuleAction::Allow => "allow",
            RuleAction::Redirect { .. } => "redirect",
            RuleAction::ModifyHeaders { .. } => "modifyHeaders",
            RuleAction::UpgradeScheme => "upgradeScheme",
        }
    }
}

/// Redirect target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One header modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub header: String,
    pub operation: HeaderOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl HeaderInfo {
    pub fn remove(header: &str) -> Self {
        Self {
            header: header.to_string(),
            operation: HeaderOperation::Remove,
            value: None,
        }
    }

    pub fn set(header: &str, value: &str) -> Self {
        Self {
            header: header.to_string(),
            operation: HeaderOperation::Set,
            value: Some(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderOperation {
    Append,
    Set,
    Remove,
}

// =============================================================================
// Conditions
// =============================================================================

/// Which requests a rule applies to. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_url_filter_case_sensitive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_domains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_request_domains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator_domains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_initiator_domains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_types: Option<ResourceTypes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_resource_types: Option<ResourceTypes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_type: Option<DomainType>,
}

/// First/third party qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DomainType {
    FirstParty,
    ThirdParty,
}

// =============================================================================
// Resource Types
// =============================================================================

bitflags::bitflags! {
    /// Set of request resource types.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceTypes: u16 {
        const MAIN_FRAME = 1 << 0;
        const SUB_FRAME = 1 << 1;
        const STYLESHEET = 1 << 2;
        const SCRIPT = 1 << 3;
        const IMAGE = 1 << 4;
        const FONT = 1 << 5;
        const OBJECT = 1 << 6;
        const XMLHTTPREQUEST = 1 << 7;
        const PING = 1 << 8;
        const CSP_REPORT = 1 << 9;
        const MEDIA = 1 << 10;
        const WEBSOCKET = 1 << 11;
        const WEBTRANSPORT = 1 << 12;
        const WEBBUNDLE = 1 << 13;
        const OTHER = 1 << 14;

        /// Every resource type the rule schema knows
        const ALL = 0x7FFF;
    }
}

/// Canonical (serialization) order.
const RESOURCE_TYPE_NAMES: [(ResourceTypes, &str); 15] = [
    (ResourceTypes::MAIN_FRAME, "main_frame"),
    (ResourceTypes::SUB_FRAME, "sub_frame"),
    (ResourceTypes::STYLESHEET, "stylesheet"),
    (ResourceTypes::SCRIPT, "script"),
    (ResourceTypes::IMAGE, "image"),
    (ResourceTypes::FONT, "font"),
    (ResourceTypes::OBJECT, "object"),
    (ResourceTypes::XMLHTTPREQUEST, "xmlhttprequest"),
    (ResourceTypes::PING, "ping"),
    (ResourceTypes::CSP_REPORT, "csp_report"),
    (ResourceTypes::MEDIA, "media"),
    (ResourceTypes::WEBSOCKET, "websocket"),
    (ResourceTypes::WEBTRANSPORT, "webtransport"),
    (ResourceTypes::WEBBUNDLE, "webbundle"),
    (ResourceTypes::OTHER, "other"),
];

impl ResourceTypes {
    /// Parse a rule-schema name, or one of the names tracker datasets use.
    pub fn from_type_name(name: &str) -> Result<Self> {
        let lower = name.trim().to_ascii_lowercase();
        if let Some((types, _)) = RESOURCE_TYPE_NAMES.iter().find(|(_, n)| *n == lower) {
            return Ok(*types);
        }
        match lower.as_str() {
            "document" => Ok(Self::MAIN_FRAME),
            "subdocument" => Ok(Self::SUB_FRAME),
            "xhr" | "fetch" => Ok(Self::XMLHTTPREQUEST),
            "beacon" => Ok(Self::PING),
            "csp" => Ok(Self::CSP_REPORT),
            "imageset" => Ok(Self::IMAGE),
            _ => Err(Error::UnknownResourceType(name.to_string())),
        }
    }

    pub fn from_type_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        names
            .iter()
            .try_fold(Self::empty(), |acc, name| Ok(acc | Self::from_type_name(name.as_ref())?))
    }

    /// Names of the contained types in canonical order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        RESOURCE_TYPE_NAMES
            .iter()
            .filter(move |(types, _)| self.contains(*types))
            .map(|(_, name)| *name)
    }
}

impl Serialize for ResourceTypes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

impl<'de> Deserialize<'de> for ResourceTypes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Self::from_type_names(&names).map_err(serde::de::Error::custom)
    }
}
