//! Third-party cookie stripping rules.
//!
//! One rule per tracker-owning entity removes the `cookie` request header
//! and the `set-cookie` response header on requests to the entity's tracker
//! domains, except when the page itself belongs to the entity. Entities with
//! a single tracker domain (and nothing else) share one third-party rule.

use dnr_core::types::HeaderInfo;
use dnr_core::{DomainType, MatchDetails, Result, RuleAction, RuleFamily, RuleIds, RulesetResult, Tds};
use indexmap::{IndexMap, IndexSet};

use crate::builder::{build_rule, RuleParams};
use crate::resolver::DomainResolver;

#[derive(Default)]
struct EntityDomains<'a> {
    /// Every domain of the entity: declared ones plus tracker aliases.
    domains: IndexSet<&'a str>,
    /// Tracker domains and their aliases.
    tracker_domains: IndexSet<&'a str>,
}

fn cookie_action() -> RuleAction {
    RuleAction::ModifyHeaders {
        request_headers: vec![HeaderInfo::remove("cookie")],
        response_headers: vec![HeaderInfo::remove("set-cookie")],
    }
}

/// Generate cookie blocking rules, numbering them from `starting_rule_id`.
///
/// `excluded_cookie_domains` are third-party domains whose cookies are kept;
/// `site_allowlist` are first-party sites on which no cookies are stripped.
pub fn generate_cookie_blocking_ruleset(
    tds: &Tds,
    excluded_cookie_domains: &[String],
    site_allowlist: &[String],
    starting_rule_id: u32,
) -> Result<RulesetResult> {
    let resolver = DomainResolver::new(tds);
    let priority = RuleFamily::Cookie.band().priority();

    let mut exclusions: IndexMap<&str, Vec<String>> = IndexMap::new();
    for domain in excluded_cookie_domains {
        match resolver.tracker_entry_domain(domain) {
            Some(entry) => exclusions.entry(entry).or_default().push(domain.clone()),
            None => log::debug!("excluded cookie domain {} matches no tracker entry", domain),
        }
    }

    let mut entities: IndexMap<&str, EntityDomains<'_>> = IndexMap::new();
    for (tracker_domain, tracker) in &tds.trackers {
        let owner = tracker.owner.name.as_str();
        let entry = entities.entry(owner).or_default();
        for &alias in resolver.aliases(tracker_domain) {
            entry.domains.insert(alias);
            entry.tracker_domains.insert(alias);
        }
        entry
            .domains
            .extend(tds.owned_domains(owner).iter().map(String::as_str));
    }

    let mut result = RulesetResult::new();
    let mut ids = RuleIds::starting_at(starting_rule_id);
    let mut single_domains: Vec<String> = Vec::new();
    let mut single_entities: Vec<String> = Vec::new();

    for (entity, EntityDomains { domains, tracker_domains }) in &entities {
        let excluded_request_domains: Vec<String> = tracker_domains
            .iter()
            .filter_map(|domain| exclusions.get(domain))
            .flatten()
            .cloned()
            .collect();

        if domains.len() == 1 && tracker_domains.len() == 1 && excluded_request_domains.is_empty() {
            single_domains.extend(domains.iter().map(|d| d.to_string()));
            single_entities.push(entity.to_string());
            continue;
        }

        let mut excluded_initiator_domains: Vec<String> = domains.iter().map(|d| d.to_string()).collect();
        for site in site_allowlist {
            if !excluded_initiator_domains.contains(site) {
                excluded_initiator_domains.push(site.clone());
            }
        }

        let rule = build_rule(
            priority,
            cookie_action(),
            RuleParams {
                request_domains: tracker_domains.iter().map(|d| d.to_string()).collect(),
                excluded_request_domains,
                excluded_initiator_domains,
                ..Default::default()
            },
        );
        result.push(
            rule.with_id(ids.next_id()?),
            MatchDetails::CookieBlocking {
                entities: vec![entity.to_string()],
            },
        );
    }

    if !single_domains.is_empty() {
        let rule = build_rule(
            priority,
            cookie_action(),
            RuleParams {
                request_domains: single_domains,
                excluded_initiator_domains: site_allowlist.to_vec(),
                domain_type: Some(DomainType::ThirdParty),
                ..Default::default()
            },
        );
        result.push(
            rule.with_id(ids.next_id()?),
            MatchDetails::CookieBlocking {
                entities: single_entities,
            },
        );
    }

    log::debug!("cookie blocking: {} rules for {} entities", result.len(), entities.len());
    Ok(result)
}
