//! End-to-end compilation.
//!
//! Generators run in a fixed order and rule IDs continue from one to the
//! next, so the same inputs always produce the same ruleset. Any error
//! aborts the run without a partial result.

use dnr_core::tds::validate_surrogates;
use dnr_core::{Error, PrivacyConfig, Result, RuleIds, RulesetResult, SurrogatesConfig, Tds};

use crate::allowlist::generate_tracker_allowlist_ruleset;
use crate::capability::RegexSupportChecker;
use crate::combined::generate_config_cookie_ruleset;
use crate::gpc::generate_gpc_header_rules;
use crate::surrogates::generate_surrogate_rules;
use crate::tracker_blocking::generate_tracker_blocking_ruleset;
use crate::validate::validate_ruleset;

/// Policy documents for a full compilation.
#[derive(Debug, Clone, Copy)]
pub struct CompileInputs<'a> {
    pub tds: &'a Tds,
    pub surrogates: &'a SurrogatesConfig,
    pub surrogate_path_prefix: &'a str,
    pub privacy_config: Option<&'a PrivacyConfig>,
    /// Sites the user wants protected even if the configuration exempts them.
    pub denylisted_domains: &'a [String],
}

/// Tracker blocking rules followed by surrogate redirects.
pub fn generate_tds_ruleset(
    tds: &Tds,
    surrogates: &SurrogatesConfig,
    surrogate_path_prefix: &str,
    checker: &dyn RegexSupportChecker,
    starting_rule_id: u32,
) -> Result<RulesetResult> {
    validate_inputs(tds, surrogates, starting_rule_id)?;

    let mut ids = RuleIds::starting_at(starting_rule_id);
    let mut result = generate_tracker_blocking_ruleset(tds, checker, starting_rule_id)?;
    ids.advance(result.len())?;
    append_surrogates(&mut result, tds, surrogates, surrogate_path_prefix, &mut ids)?;

    validate_ruleset(&result.ruleset)?;
    Ok(result)
}

/// Compile every rule family, in this order: tracker blocking, tracker
/// allowlist, cookies, surrogates, GPC.
///
/// Configuration-driven families are skipped without a privacy
/// configuration; the allowlist is skipped when the configuration has no
/// `trackerAllowlist` feature.
pub fn compile_ruleset(
    inputs: &CompileInputs<'_>,
    checker: &dyn RegexSupportChecker,
    starting_rule_id: u32,
) -> Result<RulesetResult> {
    validate_inputs(inputs.tds, inputs.surrogates, starting_rule_id)?;

    let mut ids = RuleIds::starting_at(starting_rule_id);
    let mut result = generate_tracker_blocking_ruleset(inputs.tds, checker, starting_rule_id)?;
    ids.advance(result.len())?;

    if let Some(config) = inputs.privacy_config {
        if config.features.tracker_allowlist.is_some() {
            let allowlist = generate_tracker_allowlist_ruleset(config, ids.peek()?)?;
            ids.advance(allowlist.len())?;
            result.append(allowlist);
        }

        let cookies = generate_config_cookie_ruleset(inputs.tds, config, inputs.denylisted_domains, ids.peek()?)?;
        ids.advance(cookies.len())?;
        result.append(cookies);
    }

    append_surrogates(
        &mut result,
        inputs.tds,
        inputs.surrogates,
        inputs.surrogate_path_prefix,
        &mut ids,
    )?;

    if let Some(config) = inputs.privacy_config {
        for (rule, details) in generate_gpc_header_rules(config) {
            result.push(rule.with_id(ids.next_id()?), details);
        }
    }

    let stats = validate_ruleset(&result.ruleset)?;
    log::debug!(
        "compiled {} rules ({} block, {} allow, {} redirect, {} modifyHeaders)",
        stats.rules,
        stats.block,
        stats.allow,
        stats.redirect,
        stats.modify_headers
    );

    Ok(result)
}

fn validate_inputs(tds: &Tds, surrogates: &SurrogatesConfig, starting_rule_id: u32) -> Result<()> {
    if starting_rule_id == 0 {
        return Err(Error::invalid_input("starting rule ID must be at least 1"));
    }
    tds.validate()?;
    validate_surrogates(surrogates)
}

fn append_surrogates(
    result: &mut RulesetResult,
    tds: &Tds,
    surrogates: &SurrogatesConfig,
    surrogate_path_prefix: &str,
    ids: &mut RuleIds,
) -> Result<()> {
    for (rule, details) in generate_surrogate_rules(tds, surrogates, surrogate_path_prefix) {
        result.push(rule.with_id(ids.next_id()?), details);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::capability::EngineRegexChecker;

    fn empty_tds() -> Tds {
        Tds::from_value(json!({ "cnames": {}, "domains": {}, "entities": {}, "trackers": {} })).unwrap()
    }

    #[test]
    fn starting_rule_id_must_be_positive() {
        let tds = empty_tds();
        assert!(matches!(
            generate_tds_ruleset(&tds, &SurrogatesConfig::new(), "", &EngineRegexChecker::new(), 0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_inputs_give_empty_result() {
        let tds = empty_tds();
        let result = generate_tds_ruleset(&tds, &SurrogatesConfig::new(), "/prefix/", &EngineRegexChecker::new(), 1)
            .unwrap();
        assert!(result.is_empty());
        assert!(result.match_details_by_rule_id.is_empty());
    }

    #[test]
    fn families_follow_each_other() {
        let tds = Tds::from_value(json!({
            "cnames": {},
            "domains": {},
            "entities": { "Tracker Co": { "domains": ["tracker.com", "tracker.net"] } },
            "trackers": { "tracker.com": { "owner": { "name": "Tracker Co" }, "default": "block" } }
        }))
        .unwrap();
        let config = PrivacyConfig::from_value(json!({
            "features": {
                "trackerAllowlist": {
                    "state": "enabled",
                    "settings": { "allowlistedTrackers": {
                        "tracker.com": { "rules": [{ "rule": "tracker.com/ok.js", "domains": ["<all>"], "reason": "" }] }
                    } }
                },
                "cookie": { "state": "enabled", "exceptions": [] },
                "gpc": { "state": "enabled", "exceptions": [] }
            }
        }))
        .unwrap();
        let mut surrogates = SurrogatesConfig::new();
        surrogates.insert(
            "tracker.com".to_string(),
            vec![("tracker.com/lib.js".to_string(), "lib.js".to_string())],
        );

        let inputs = CompileInputs {
            tds: &tds,
            surrogates: &surrogates,
            surrogate_path_prefix: "/s/",
            privacy_config: Some(&config),
            denylisted_domains: &[],
        };
        let result = compile_ruleset(&inputs, &EngineRegexChecker::new(), 100).unwrap();

        let summary: Vec<(u32, u32, &str)> = result
            .ruleset
            .iter()
            .map(|r| (r.id, r.priority, r.action.kind()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (100, 10000, "block"),
                (101, 20000, "allow"),
                (102, 20200, "modifyHeaders"),
                (103, 100000, "redirect"),
                (104, 20300, "modifyHeaders"),
            ]
        );
        assert_eq!(result.match_details_by_rule_id.len(), 5);
    }

    #[test]
    fn rule_ids_never_wrap() {
        let tds = Tds::from_value(json!({
            "cnames": {},
            "domains": {},
            "entities": {},
            "trackers": { "tracker.com": { "owner": { "name": "Tracker Co" }, "default": "block" } }
        }))
        .unwrap();
        let mut surrogates = SurrogatesConfig::new();
        surrogates.insert(
            "tracker.com".to_string(),
            vec![("tracker.com/lib.js".to_string(), "lib.js".to_string())],
        );
        let checker = EngineRegexChecker::new();

        let last = generate_tds_ruleset(&tds, &surrogates, "/s/", &checker, u32::MAX - 1).unwrap();
        assert_eq!(last.ruleset[1].id, u32::MAX);
        assert!(matches!(
            generate_tds_ruleset(&tds, &surrogates, "/s/", &checker, u32::MAX),
            Err(Error::InvalidInput(_))
        ));
    }
}
