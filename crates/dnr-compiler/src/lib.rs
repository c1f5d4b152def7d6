//! Blockwright Ruleset Compiler
//!
//! Compiles a tracker dataset and privacy configuration into a
//! declarativeNetRequest ruleset plus per-rule match details.
//!
//! Each rule family has its own generator; `pipeline` runs them in order
//! and numbers the rules.

pub mod allowlist;
pub mod builder;
pub mod capability;
pub mod combined;
pub mod cookies;
pub mod gpc;
pub mod pipeline;
pub mod resolver;
pub mod smarter_encryption;
pub mod surrogates;
pub mod tracker_blocking;
pub mod validate;

pub use allowlist::generate_tracker_allowlist_ruleset;
pub use capability::{EngineRegexChecker, RegexQuery, RegexSupport, RegexSupportChecker};
pub use combined::generate_combined_config_ruleset;
pub use cookies::generate_cookie_blocking_ruleset;
pub use pipeline::{compile_ruleset, generate_tds_ruleset, CompileInputs};
pub use smarter_encryption::{generate_smarter_encryption_ruleset, parse_domain_list};
pub use tracker_blocking::generate_tracker_blocking_ruleset;
pub use validate::{validate_ruleset, RulesetStats};
