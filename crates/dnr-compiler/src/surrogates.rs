//! Surrogate script redirects.

use dnr_core::{MatchDetails, ResourceTypes, Rule, RuleAction, RuleFamily, SurrogatesConfig, Tds};

use crate::builder::{anchored_url_filter, build_rule, RuleParams};
use crate::resolver::DomainResolver;

/// Redirect rules, one per mapping entry in mapping order. Rules carry ID 0.
///
/// Each redirect serves `surrogate_path_prefix` + script path instead of the
/// matched tracker script, except on pages of the tracker's owner.
pub fn generate_surrogate_rules<'a>(
    tds: &'a Tds,
    surrogates: &'a SurrogatesConfig,
    surrogate_path_prefix: &'a str,
) -> impl Iterator<Item = (Rule, MatchDetails)> + 'a {
    let resolver = DomainResolver::new(tds);
    let priority = RuleFamily::Surrogate.band().priority();

    surrogates.iter().flat_map(move |(domain, entries)| {
        let tracker_domain = resolver
            .tracker_entry_domain(domain)
            .unwrap_or(domain.as_str())
            .to_string();
        let owner_domains = resolver.entity_domains(&tracker_domain);

        entries.iter().map(move |(fragment, script_path)| {
            let rule = build_rule(
                priority,
                RuleAction::redirect_to_extension_path(format!("{surrogate_path_prefix}{script_path}")),
                RuleParams {
                    url_filter: Some(anchored_url_filter(&tracker_domain, fragment)),
                    match_case: false,
                    resource_types: Some(ResourceTypes::SCRIPT),
                    request_domains: vec![tracker_domain.clone()],
                    owner_domains: Some(owner_domains.clone()),
                    ..Default::default()
                },
            );
            let details = MatchDetails::SurrogateScript {
                domain: tracker_domain.clone(),
                rule: fragment.clone(),
            };
            (rule, details)
        })
    })
}
