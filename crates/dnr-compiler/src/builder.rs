//! Rule construction.
//!
//! Every generator funnels through `build_rule`, which applies the
//! condition conventions shared by all rule families.

use dnr_core::{DomainType, ResourceTypes, Rule, RuleAction, RuleCondition};

/// Condition inputs for `build_rule`. Empty lists are dropped.
#[derive(Debug, Clone, Default)]
pub struct RuleParams {
    pub url_filter: Option<String>,
    pub regex_filter: Option<String>,
    pub match_case: bool,
    pub resource_types: Option<ResourceTypes>,
    pub excluded_resource_types: Option<ResourceTypes>,
    pub request_domains: Vec<String>,
    pub excluded_request_domains: Vec<String>,
    pub initiator_domains: Vec<String>,
    pub excluded_initiator_domains: Vec<String>,
    /// Domains of the entity that owns the matched resource. A non-empty
    /// list is excluded as initiators; an empty one restricts the rule to
    /// third-party requests.
    pub owner_domains: Option<Vec<String>>,
    pub domain_type: Option<DomainType>,
}

/// Build a rule with ID 0. IDs are assigned when results are combined.
pub fn build_rule(priority: u32, action: RuleAction, params: RuleParams) -> Rule {
    let RuleParams {
        url_filter,
        regex_filter,
        match_case,
        resource_types,
        excluded_resource_types,
        request_domains,
        excluded_request_domains,
        initiator_domains,
        mut excluded_initiator_domains,
        owner_domains,
        mut domain_type,
    } = params;

    let has_filter = url_filter.is_some() || regex_filter.is_some();

    let request_domains = match (url_filter.as_deref(), request_domains.as_slice()) {
        (Some(filter), [domain]) if anchors_domain(filter, domain) => Vec::new(),
        _ => request_domains,
    };

    match owner_domains {
        Some(owned) if owned.is_empty() => {
            domain_type.get_or_insert(DomainType::ThirdParty);
        }
        Some(owned) => {
            let mut merged = owned;
            for domain in excluded_initiator_domains {
                if !merged.contains(&domain) {
                    merged.push(domain);
                }
            }
            excluded_initiator_domains = merged;
        }
        None => {}
    }

    Rule {
        id: 0,
        priority,
        action,
        condition: RuleCondition {
            url_filter,
            regex_filter,
            is_url_filter_case_sensitive: has_filter.then_some(match_case),
            request_domains: non_empty(request_domains),
            excluded_request_domains: non_empty(excluded_request_domains),
            initiator_domains: non_empty(initiator_domains),
            excluded_initiator_domains: non_empty(excluded_initiator_domains),
            resource_types: resource_types.filter(|types| !types.is_empty()),
            excluded_resource_types: excluded_resource_types.filter(|types| !types.is_empty()),
            domain_type,
        },
    }
}

/// URL filter for a plaintext rule of `tracker_domain`: anchored to the
/// domain when the text starts with it.
pub fn anchored_url_filter(tracker_domain: &str, text: &str) -> String {
    if text.starts_with(tracker_domain) {
        format!("||{text}")
    } else {
        text.to_string()
    }
}

/// Whether `filter` already pins requests to `domain` (`||domain` followed
/// by the end of the host).
fn anchors_domain(filter: &str, domain: &str) -> bool {
    filter
        .strip_prefix("||")
        .and_then(|rest| rest.strip_prefix(domain))
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '^', ':', '?']))
}

#[inline]
fn non_empty(domains: Vec<String>) -> Option<Vec<String>> {
    (!domains.is_empty()).then_some(domains)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn anchored_filter_drops_redundant_request_domain() {
        let rule = build_rule(
            100,
            RuleAction::Block,
            RuleParams {
                url_filter: Some(anchored_url_filter("tracker.com", "tracker.com/pixel")),
                request_domains: strings(&["tracker.com"]),
                ..Default::default()
            },
        );
        assert_eq!(rule.condition.url_filter.as_deref(), Some("||tracker.com/pixel"));
        assert_eq!(rule.condition.request_domains, None);
        assert_eq!(rule.condition.is_url_filter_case_sensitive, Some(false));
    }

    #[test]
    fn unanchored_filter_keeps_request_domain() {
        for filter in ["/pixel.gif", "||tracker.com.evil/x", "||other.com/tracker.com"] {
            let rule = build_rule(
                100,
                RuleAction::Block,
                RuleParams {
                    url_filter: Some(filter.to_string()),
                    request_domains: strings(&["tracker.com"]),
                    ..Default::default()
                },
            );
            assert_eq!(rule.condition.request_domains, Some(strings(&["tracker.com"])), "{filter}");
        }
    }

    #[test]
    fn owner_domains_become_initiator_exclusions() {
        let rule = build_rule(
            100,
            RuleAction::Block,
            RuleParams {
                request_domains: strings(&["tracker.com", "alias.site.com"]),
                excluded_initiator_domains: strings(&["partner.com", "tracker.com"]),
                owner_domains: Some(strings(&["tracker.com", "tracker.net"])),
                ..Default::default()
            },
        );
        assert_eq!(
            rule.condition.excluded_initiator_domains,
            Some(strings(&["tracker.com", "tracker.net", "partner.com"]))
        );
        assert_eq!(rule.condition.domain_type, None);
        assert_eq!(rule.condition.is_url_filter_case_sensitive, None);
    }

    #[test]
    fn unknown_owner_means_third_party_only() {
        let rule = build_rule(
            100,
            RuleAction::Block,
            RuleParams {
                request_domains: strings(&["tracker.com"]),
                owner_domains: Some(Vec::new()),
                ..Default::default()
            },
        );
        assert_eq!(rule.condition.domain_type, Some(DomainType::ThirdParty));
        assert_eq!(rule.condition.excluded_initiator_domains, None);
    }

    #[test]
    fn empty_lists_are_omitted() {
        let rule = build_rule(
            100,
            RuleAction::Allow,
            RuleParams {
                regex_filter: Some("a+".to_string()),
                resource_types: Some(ResourceTypes::empty()),
                ..Default::default()
            },
        );
        let value = serde_json::to_value(&rule.condition).unwrap();
        assert_eq!(value, serde_json::json!({ "regexFilter": "a+", "isUrlFilterCaseSensitive": false }));
    }
}
