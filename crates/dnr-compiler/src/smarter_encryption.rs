//! HTTPS upgrade rules for domains known to serve HTTPS.

use std::collections::BTreeSet;

use dnr_core::domain::normalize_domain;
use dnr_core::{Error, MatchDetails, ResourceTypes, Result, RuleAction, RuleFamily, RulesetResult};

use crate::builder::{build_rule, RuleParams};

/// Parse a domain list: one hostname per line, blank lines and `#` comments
/// ignored. Hostnames are normalized, sorted and de-duplicated.
pub fn parse_domain_list(text: &str) -> Result<Vec<String>> {
    let mut domains = BTreeSet::new();

    for (line_number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let domain = normalize_domain(line).ok_or_else(|| {
            Error::invalid_input(format!("domain list line {}: invalid hostname {line:?}", line_number + 1))
        })?;
        domains.insert(domain);
    }

    Ok(domains.into_iter().collect())
}

/// A single `upgradeScheme` rule covering every domain, numbered
/// `starting_rule_id`. An empty list yields an empty ruleset.
pub fn generate_smarter_encryption_ruleset(domains: &[String], starting_rule_id: u32) -> Result<RulesetResult> {
    let mut request_domains = BTreeSet::new();
    for domain in domains {
        let normalized = normalize_domain(domain)
            .ok_or_else(|| Error::invalid_input(format!("invalid HTTPS domain {domain:?}")))?;
        request_domains.insert(normalized);
    }

    let mut result = RulesetResult::new();
    if request_domains.is_empty() {
        return Ok(result);
    }

    log::debug!("smarter encryption: upgrading {} domains", request_domains.len());

    let rule = build_rule(
        RuleFamily::SmarterEncryption.band().priority(),
        RuleAction::UpgradeScheme,
        RuleParams {
            request_domains: request_domains.into_iter().collect(),
            resource_types: Some(ResourceTypes::ALL),
            ..Default::default()
        },
    );
    result.push(rule.with_id(starting_rule_id), MatchDetails::SmarterEncryption);
    Ok(result)
}
