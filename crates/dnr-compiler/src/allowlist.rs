//! Tracker allowlist rules from the privacy configuration.

use dnr_core::{Error, MatchDetails, PrivacyConfig, Result, RuleAction, RuleFamily, RuleIds, RulesetResult};

use crate::builder::{anchored_url_filter, build_rule, RuleParams};
use crate::resolver::descendant_entries;

/// Generate allow rules for every allowlisted tracker, numbering rules from
/// `starting_rule_id`.
///
/// Rules of an entry are matched in listed order, so the first one gets the
/// highest priority. Entries have no default action: a more specific entry
/// is excluded from its ancestors so that they never apply in its place.
pub fn generate_tracker_allowlist_ruleset(config: &PrivacyConfig, starting_rule_id: u32) -> Result<RulesetResult> {
    let feature = config
        .features
        .tracker_allowlist
        .as_ref()
        .ok_or_else(|| Error::invalid_input("privacy configuration: missing trackerAllowlist feature"))?;

    let mut result = RulesetResult::new();
    if !feature.state.is_enabled() {
        return Ok(result);
    }
    let Some(settings) = feature.settings.as_ref() else {
        return Ok(result);
    };
    let allowlisted = &settings.allowlisted_trackers;

    let band = RuleFamily::TrackerAllowlist.band();
    let max_rules = band.max_rules_per_entry();
    let excluded_by_entry = descendant_entries(allowlisted);
    let mut ids = RuleIds::starting_at(starting_rule_id);

    for (tracker_domain, entry) in allowlisted {
        let count = entry.rules.len();
        if count == 0 {
            continue;
        }
        if count > max_rules {
            return Err(capacity_error(tracker_domain, count, max_rules));
        }

        let excluded_request_domains = excluded_by_entry
            .get(tracker_domain.as_str())
            .cloned()
            .unwrap_or_default();

        for (index, allowlist_rule) in entry.rules.iter().enumerate().rev() {
            if allowlist_rule.rule.is_empty() {
                return Err(Error::invalid_input(format!(
                    "privacy configuration: empty allowlist rule for {tracker_domain}"
                )));
            }
            let priority = band
                .descending_priority(index, count)
                .ok_or_else(|| capacity_error(tracker_domain, count, max_rules))?;

            let rule = build_rule(
                priority,
                RuleAction::Allow,
                RuleParams {
                    url_filter: Some(anchored_url_filter(tracker_domain, &allowlist_rule.rule)),
                    match_case: false,
                    request_domains: vec![tracker_domain.clone()],
                    excluded_request_domains: excluded_request_domains.clone(),
                    initiator_domains: allowlist_rule
                        .initiator_domains()
                        .map(<[String]>::to_vec)
                        .unwrap_or_default(),
                    ..Default::default()
                },
            );

            result.push(
                rule.with_id(ids.next_id()?),
                MatchDetails::TrackerAllowlist {
                    domain: tracker_domain.clone(),
                    reason: allowlist_rule.reason.clone(),
                },
            );
        }
    }

    log::debug!(
        "tracker allowlist: {} rules from {} entries",
        result.len(),
        allowlisted.len()
    );

    Ok(result)
}

fn capacity_error(domain: &str, count: usize, max: usize) -> Error {
    Error::Capacity {
        domain: domain.to_string(),
        count,
        max,
        family: RuleFamily::TrackerAllowlist,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn config(allowlisted: Value) -> PrivacyConfig {
        PrivacyConfig::from_value(json!({
            "features": {
                "trackerAllowlist": {
                    "state": "enabled",
                    "settings": { "allowlistedTrackers": allowlisted }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn missing_feature_is_invalid() {
        let config = PrivacyConfig::from_value(json!({ "features": {} })).unwrap();
        assert!(matches!(
            generate_tracker_allowlist_ruleset(&config, 1),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn disabled_or_empty_feature_yields_nothing() {
        for feature in [
            json!({ "state": "disabled", "settings": { "allowlistedTrackers": { "a.com": { "rules": [] } } } }),
            json!({ "state": "enabled" }),
            json!({ "state": "enabled", "settings": { "allowlistedTrackers": {} } }),
        ] {
            let config = PrivacyConfig::from_value(json!({ "features": { "trackerAllowlist": feature } })).unwrap();
            assert!(generate_tracker_allowlist_ruleset(&config, 1).unwrap().is_empty());
        }
    }

    #[test]
    fn first_rule_gets_highest_priority() {
        let config = config(json!({
            "tracker.com": {
                "rules": [
                    { "rule": "tracker.com/first.js", "domains": ["<all>"], "reason": "one" },
                    { "rule": "tracker.com/second.js", "domains": ["site.com"], "reason": "two" },
                    { "rule": "/third.js", "domains": [], "reason": "three" }
                ]
            }
        }));
        let result = generate_tracker_allowlist_ruleset(&config, 5).unwrap();

        let summary: Vec<(u32, u32, &str)> = result
            .ruleset
            .iter()
            .map(|r| (r.id, r.priority, r.condition.url_filter.as_deref().unwrap()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (5, 20000, "/third.js"),
                (6, 20001, "||tracker.com/second.js"),
                (7, 20002, "||tracker.com/first.js"),
            ]
        );

        assert_eq!(result.ruleset[0].condition.request_domains, Some(vec!["tracker.com".to_string()]));
        assert_eq!(result.ruleset[1].condition.initiator_domains, Some(vec!["site.com".to_string()]));
        assert_eq!(result.ruleset[2].condition.initiator_domains, None);
        assert!(result.ruleset.iter().all(|r| r.action == RuleAction::Allow));
        assert_eq!(
            result.match_details_by_rule_id[&7],
            MatchDetails::TrackerAllowlist { domain: "tracker.com".to_string(), reason: "one".to_string() }
        );
    }

    #[test]
    fn ancestors_exclude_more_specific_entries() {
        let config = config(json!({
            "tracker.com": { "rules": [{ "rule": "tracker.com/a.js", "domains": ["<all>"], "reason": "" }] },
            "cdn.tracker.com": { "rules": [{ "rule": "cdn.tracker.com/b.js", "domains": ["<all>"], "reason": "" }] }
        }));
        let result = generate_tracker_allowlist_ruleset(&config, 1).unwrap();

        let parent = &result.ruleset[0];
        assert_eq!(parent.condition.excluded_request_domains, Some(vec!["cdn.tracker.com".to_string()]));
        let cdn = &result.ruleset[1];
        assert_eq!(cdn.condition.excluded_request_domains, None);
    }

    #[test]
    fn entries_keep_document_order() {
        let config = config(json!({
            "zeta.com": { "rules": [{ "rule": "zeta.com/z.js", "domains": ["<all>"], "reason": "" }] },
            "alpha.com": { "rules": [{ "rule": "alpha.com/a.js", "domains": ["<all>"], "reason": "" }] }
        }));
        let result = generate_tracker_allowlist_ruleset(&config, 1).unwrap();
        assert_eq!(result.ruleset[0].condition.request_domains, Some(vec!["zeta.com".to_string()]));
        assert_eq!(result.ruleset[1].condition.request_domains, Some(vec!["alpha.com".to_string()]));
    }

    #[test]
    fn running_out_of_rule_ids_is_an_error() {
        let config = config(json!({
            "tracker.com": { "rules": [
                { "rule": "tracker.com/a.js", "domains": ["<all>"], "reason": "" },
                { "rule": "tracker.com/b.js", "domains": ["<all>"], "reason": "" }
            ] }
        }));
        assert_eq!(generate_tracker_allowlist_ruleset(&config, u32::MAX - 1).unwrap().len(), 2);
        assert!(matches!(
            generate_tracker_allowlist_ruleset(&config, u32::MAX),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn capacity_boundaries() {
        let rules = |n: usize| -> Vec<Value> {
            (0..n)
                .map(|i| json!({ "rule": format!("tracker.com/{i}"), "domains": ["<all>"], "reason": "" }))
                .collect()
        };

        let full = generate_tracker_allowlist_ruleset(&config(json!({ "tracker.com": { "rules": rules(100) } })), 1)
            .unwrap();
        assert_eq!(full.len(), 100);
        assert_eq!(full.ruleset.first().unwrap().priority, 20000);
        assert_eq!(full.ruleset.last().unwrap().priority, 20099);

        assert!(matches!(
            generate_tracker_allowlist_ruleset(&config(json!({ "tracker.com": { "rules": rules(101) } })), 1),
            Err(Error::Capacity { count: 101, .. })
        ));
    }
}
