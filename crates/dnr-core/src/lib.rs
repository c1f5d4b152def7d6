//! Blockwright Core Library
//!
//! Data model shared by the Blockwright ruleset compiler: the policy
//! documents it reads and the declarativeNetRequest rules it writes.
//!
//! # Modules
//!
//! - `tds`: Tracker Dataset and surrogate mapping documents
//! - `config`: Privacy configuration (allowlist, cookie, GPC features)
//! - `types`: declarativeNetRequest rule model
//! - `ruleset`: Compiled ruleset and per-rule match details
//! - `priority`: Priority band registry for every rule family
//! - `domain`: Entry-domain walk and hostname helpers
//! - `error`: Error type

pub mod config;
pub mod domain;
pub mod error;
pub mod priority;
pub mod ruleset;
pub mod tds;
pub mod types;

// Re-export commonly used types
pub use config::PrivacyConfig;
pub use error::{Error, Result};
pub use priority::{PriorityBand, RuleFamily};
pub use ruleset::{MatchDetails, RuleIds, RulesetResult};
pub use tds::{SurrogatesConfig, Tds};
pub use types::{DomainType, ResourceTypes, Rule, RuleAction, RuleCondition};
