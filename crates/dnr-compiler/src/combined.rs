//! Rules that depend on both the tracker dataset and the privacy
//! configuration: cookie stripping and the GPC header.

use dnr_core::config::exception_domains;
use dnr_core::{PrivacyConfig, Result, RuleIds, RulesetResult, Tds};

use crate::cookies::generate_cookie_blocking_ruleset;
use crate::gpc::generate_gpc_header_rules;

/// Sites on which cookies are left alone: cookie exceptions plus
/// temporarily unprotected sites, minus anything the user denylisted.
pub fn cookie_site_allowlist(config: &PrivacyConfig, denylisted_domains: &[String]) -> Vec<String> {
    let cookie_exceptions = config
        .features
        .cookie
        .as_ref()
        .map(|cookie| cookie.exceptions.as_slice())
        .unwrap_or_default();

    let mut allowlist: Vec<String> = Vec::new();
    for exception in cookie_exceptions.iter().chain(&config.unprotected_temporary) {
        let domain = &exception.domain;
        if denylisted_domains.contains(domain) || allowlist.contains(domain) {
            continue;
        }
        allowlist.push(domain.clone());
    }
    allowlist
}

/// Cookie rules for the configuration, or nothing when the cookie feature is
/// not enabled.
pub fn generate_config_cookie_ruleset(
    tds: &Tds,
    config: &PrivacyConfig,
    denylisted_domains: &[String],
    starting_rule_id: u32,
) -> Result<RulesetResult> {
    let Some(cookie) = config.features.cookie.as_ref().filter(|c| c.state.is_enabled()) else {
        return Ok(RulesetResult::new());
    };

    let excluded_cookie_domains = exception_domains(&cookie.settings.excluded_cookie_domains);
    let site_allowlist = cookie_site_allowlist(config, denylisted_domains);
    generate_cookie_blocking_ruleset(tds, &excluded_cookie_domains, &site_allowlist, starting_rule_id)
}

/// Cookie rules followed by GPC rules, numbered from `starting_rule_id`.
pub fn generate_combined_config_ruleset(
    tds: &Tds,
    config: &PrivacyConfig,
    denylisted_domains: &[String],
    starting_rule_id: u32,
) -> Result<RulesetResult> {
    let mut result = generate_config_cookie_ruleset(tds, config, denylisted_domains, starting_rule_id)?;

    let mut ids = RuleIds::starting_at(starting_rule_id);
    ids.advance(result.len())?;
    for (rule, details) in generate_gpc_header_rules(config) {
        result.push(rule.with_id(ids.next_id()?), details);
    }

    Ok(result)
}
