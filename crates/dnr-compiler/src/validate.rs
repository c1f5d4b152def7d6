use std::collections::HashSet;

use dnr_core::priority::family_of;
use dnr_core::{Error, Result, Rule, RuleAction};

/// Per-action counts of a validated ruleset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RulesetStats {
    pub rules: usize,
    pub block: usize,
    pub allow: usize,
    pub redirect: usize,
    pub modify_headers: usize,
    pub upgrade_scheme: usize,
    pub regex_rules: usize,
}

/// Check the structural rules the browser enforces on a static ruleset.
///
/// IDs must be positive and strictly increasing, every priority must lie in
/// a registered band, URL and regex filters are mutually exclusive, and
/// domain lists present in a condition must not be empty.
pub fn validate_ruleset(rules: &[Rule]) -> Result<RulesetStats> {
    let mut stats = RulesetStats {
        rules: rules.len(),
        ..Default::default()
    };
    let mut previous_id = 0u32;
    let mut seen_filters: HashSet<(&str, u32)> = HashSet::new();

    for rule in rules {
        if rule.id == 0 || rule.id <= previous_id {
            return Err(Error::invalid_input(format!(
                "rule ID {} follows {}; IDs must be positive and increasing",
                rule.id, previous_id
            )));
        }
        previous_id = rule.id;

        if rule.priority == 0 || family_of(rule.priority).is_none() {
            return Err(Error::invalid_input(format!(
                "rule {} has priority {} outside every priority band",
                rule.id, rule.priority
            )));
        }

        let condition = &rule.condition;
        if condition.url_filter.is_some() && condition.regex_filter.is_some() {
            return Err(Error::invalid_input(format!(
                "rule {} has both urlFilter and regexFilter",
                rule.id
            )));
        }

        let lists = [
            ("requestDomains", &condition.request_domains),
            ("excludedRequestDomains", &condition.excluded_request_domains),
            ("initiatorDomains", &condition.initiator_domains),
            ("excludedInitiatorDomains", &condition.excluded_initiator_domains),
        ];
        for (name, list) in lists {
            if list.as_ref().is_some_and(Vec::is_empty) {
                return Err(Error::invalid_input(format!("rule {} has an empty {name}", rule.id)));
            }
        }

        if let Some(regex) = condition.regex_filter.as_deref() {
            stats.regex_rules += 1;
            if !seen_filters.insert((regex, rule.priority)) {
                log::debug!("rule {} repeats regex {:?} at priority {}", rule.id, regex, rule.priority);
            }
        }

        match rule.action {
            RuleAction::Block => stats.block += 1,
            RuleAction::Allow => stats.allow += 1,
            RuleAction::Redirect { .. } => stats.redirect += 1,
            RuleAction::ModifyHeaders { .. } => stats.modify_headers += 1,
            RuleAction::UpgradeScheme => stats.upgrade_scheme += 1,
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use dnr_core::RuleCondition;

    use super::*;

    fn rule(id: u32, priority: u32, action: RuleAction) -> Rule {
        Rule {
            id,
            priority,
            action,
            condition: RuleCondition {
                request_domains: Some(vec!["tracker.com".to_string()]),
                ..Default::default()
            },
        }
    }

    #[test]
    fn counts_actions() {
        let rules = vec![
            rule(1, 10000, RuleAction::Block),
            rule(2, 10001, RuleAction::Allow),
            rule(5, 20200, RuleAction::ModifyHeaders { request_headers: vec![], response_headers: vec![] }),
            rule(6, 100000, RuleAction::redirect_to_extension_path("/x.js")),
        ];
        let stats = validate_ruleset(&rules).unwrap();
        assert_eq!(stats.rules, 4);
        assert_eq!((stats.block, stats.allow, stats.modify_headers, stats.redirect), (1, 1, 1, 1));
        assert_eq!(stats.upgrade_scheme, 0);
    }

    #[test]
    fn rejects_bad_ids() {
        assert!(validate_ruleset(&[rule(0, 10000, RuleAction::Block)]).is_err());
        assert!(validate_ruleset(&[rule(2, 10000, RuleAction::Block), rule(2, 10000, RuleAction::Block)]).is_err());
        assert!(validate_ruleset(&[rule(3, 10000, RuleAction::Block), rule(1, 10000, RuleAction::Block)]).is_err());
    }

    #[test]
    fn rejects_unregistered_priorities() {
        assert!(validate_ruleset(&[rule(1, 15000, RuleAction::Block)]).is_err());
        assert!(validate_ruleset(&[rule(1, 0, RuleAction::Block)]).is_err());
    }

    #[test]
    fn rejects_malformed_conditions() {
        let mut both = rule(1, 10000, RuleAction::Block);
        both.condition.url_filter = Some("||tracker.com/a".to_string());
        both.condition.regex_filter = Some("tracker".to_string());
        assert!(validate_ruleset(&[both]).is_err());

        let mut empty = rule(1, 10000, RuleAction::Block);
        empty.condition.initiator_domains = Some(vec![]);
        assert!(validate_ruleset(&[empty]).is_err());
    }

    #[test]
    fn empty_ruleset_is_valid() {
        assert_eq!(validate_ruleset(&[]).unwrap(), RulesetStats::default());
    }
}
