//! Tracker blocking rules from the tracker dataset.
//!
//! Each tracker entry becomes an optional default block rule at the band
//! baseline plus one rule per sub-rule. Sub-rules are matched first to last
//! in the dataset, so the first one gets the highest priority.

use dnr_core::domain::is_same_or_subdomain;
use dnr_core::tds::{RuleFilter, Tracker, TrackerRule};
use dnr_core::{Error, MatchDetails, ResourceTypes, Result, RuleAction, RuleFamily, RuleIds, RulesetResult, Tds};

use crate::builder::{anchored_url_filter, build_rule, RuleParams};
use crate::capability::{RegexQuery, RegexSupportChecker};
use crate::resolver::{descendant_entries, DomainResolver};

/// How a sub-rule's pattern is expressed in the compiled rule.
#[derive(Debug, Clone, PartialEq, Eq)]
enum UrlMatch {
    UrlFilter(String),
    RegexFilter(String),
}

/// Per-entry values shared by the rules of one tracker.
struct TrackerScope<'t> {
    domain: &'t str,
    excluded_request_domains: Vec<String>,
    owner_domains: Vec<String>,
}

/// Generate the tracker blocking ruleset, numbering rules from
/// `starting_rule_id`.
///
/// Sub-rules whose regex the checker rejects are skipped; a failing checker
/// aborts the run.
pub fn generate_tracker_blocking_ruleset(
    tds: &Tds,
    checker: &dyn RegexSupportChecker,
    starting_rule_id: u32,
) -> Result<RulesetResult> {
    let resolver = DomainResolver::new(tds);
    let descendants = descendant_entries(&tds.trackers);
    let band = RuleFamily::TrackerBlocking.band();
    let max_rules = band.max_rules_per_entry();

    let mut result = RulesetResult::new();
    let mut ids = RuleIds::starting_at(starting_rule_id);
    let mut skipped = 0usize;

    for (tracker_domain, tracker) in &tds.trackers {
        if tracker.rules.len() > max_rules {
            return Err(capacity_error(tracker_domain, tracker.rules.len(), max_rules));
        }

        let scope = TrackerScope {
            domain: tracker_domain,
            excluded_request_domains: descendants
                .get(tracker_domain.as_str())
                .cloned()
                .unwrap_or_default(),
            owner_domains: resolver.entity_domains(tracker_domain),
        };

        if tracker.default_action.is_block() {
            let rule = build_rule(
                band.baseline,
                RuleAction::Block,
                RuleParams {
                    request_domains: resolver
                        .aliases(tracker_domain)
                        .iter()
                        .map(|d| d.to_string())
                        .collect(),
                    excluded_request_domains: scope.excluded_request_domains.clone(),
                    owner_domains: Some(scope.owner_domains.clone()),
                    ..Default::default()
                },
            );
            result.push(
                rule.with_id(ids.next_id()?),
                MatchDetails::TrackerBlocking {
                    domain: tracker_domain.clone(),
                    rule: None,
                },
            );
        }

        skipped += push_sub_rules(&mut result, &mut ids, &scope, tracker, checker)?;
    }

    log::debug!(
        "tracker blocking: {} rules from {} trackers, {} sub-rules skipped",
        result.len(),
        tds.trackers.len(),
        skipped
    );

    Ok(result)
}

/// Emit the sub-rules of one tracker, last to first. Returns how many were
/// skipped for unsupported regexes.
fn push_sub_rules(
    result: &mut RulesetResult,
    ids: &mut RuleIds,
    scope: &TrackerScope<'_>,
    tracker: &Tracker,
    checker: &dyn RegexSupportChecker,
) -> Result<usize> {
    let band = RuleFamily::TrackerBlocking.band();
    let count = tracker.rules.len();
    let mut skipped = 0usize;

    for (index, tracker_rule) in tracker.rules.iter().enumerate().rev() {
        let priority = band
            .offset_priority(count - index)
            .ok_or_else(|| capacity_error(scope.domain, count, band.max_rules_per_entry()))?;

        let Some(url_match) = compile_url_match(scope.domain, &tracker_rule.rule, checker)? else {
            skipped += 1;
            continue;
        };

        let block = tracker_rule.effective_action().is_block();
        let options = tracker_rule.options.as_ref();
        let mut params = match_params(&url_match, scope);
        params.initiator_domains = options.map(|o| o.domains.clone()).unwrap_or_default();
        params.resource_types = filter_types(options)?;
        if block {
            params.owner_domains = Some(scope.owner_domains.clone());
        }

        let action = if block { RuleAction::Block } else { RuleAction::Allow };
        result.push(
            build_rule(priority, action, params).with_id(ids.next_id()?),
            MatchDetails::TrackerBlocking {
                domain: scope.domain.to_string(),
                rule: Some(tracker_rule.rule.clone()),
            },
        );

        if block {
            if let Some(exception) = exception_rule(priority, &url_match, scope, tracker_rule)? {
                result.push(
                    exception.with_id(ids.next_id()?),
                    MatchDetails::TrackerBlockingException {
                        domain: scope.domain.to_string(),
                        rule: tracker_rule.rule.clone(),
                    },
                );
            }
        }
    }

    Ok(skipped)
}

/// Allow rule carving a sub-rule's exceptions out of its block rule. Shares
/// the block rule's priority; `allow` wins the tie.
fn exception_rule(
    priority: u32,
    url_match: &UrlMatch,
    scope: &TrackerScope<'_>,
    tracker_rule: &TrackerRule,
) -> Result<Option<dnr_core::Rule>> {
    let Some(exceptions) = tracker_rule.exceptions.as_ref().filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    let options = tracker_rule.options.as_ref();

    let Some(initiator_domains) = intersect_domains(
        options.map(|o| o.domains.as_slice()).unwrap_or_default(),
        &exceptions.domains,
    ) else {
        return Ok(None);
    };

    let resource_types = match (filter_types(options)?, filter_types(Some(exceptions))?) {
        (Some(allowed), Some(excepted)) => {
            let both = allowed & excepted;
            if both.is_empty() {
                return Ok(None);
            }
            Some(both)
        }
        (allowed, excepted) => excepted.or(allowed),
    };

    let mut params = match_params(url_match, scope);
    params.initiator_domains = initiator_domains;
    params.resource_types = resource_types;
    Ok(Some(build_rule(priority, RuleAction::Allow, params)))
}

/// Initiators matching both lists (empty = any). `None` when no initiator
/// can satisfy both.
fn intersect_domains(options: &[String], exceptions: &[String]) -> Option<Vec<String>> {
    match (options.is_empty(), exceptions.is_empty()) {
        (true, _) => Some(exceptions.to_vec()),
        (false, true) => Some(options.to_vec()),
        (false, false) => {
            let mut both: Vec<String> = Vec::new();
            for domain in exceptions {
                if options.iter().any(|o| is_same_or_subdomain(domain, o)) && !both.contains(domain) {
                    both.push(domain.clone());
                }
            }
            for domain in options {
                if exceptions.iter().any(|e| is_same_or_subdomain(domain, e)) && !both.contains(domain) {
                    both.push(domain.clone());
                }
            }
            (!both.is_empty()).then_some(both)
        }
    }
}

fn filter_types(filter: Option<&RuleFilter>) -> Result<Option<ResourceTypes>> {
    match filter {
        Some(filter) if !filter.types.is_empty() => {
            Ok(Some(ResourceTypes::from_type_names(&filter.types)?))
        }
        _ => Ok(None),
    }
}

fn match_params(url_match: &UrlMatch, scope: &TrackerScope<'_>) -> RuleParams {
    let (url_filter, regex_filter) = match url_match {
        UrlMatch::UrlFilter(filter) => (Some(filter.clone()), None),
        UrlMatch::RegexFilter(regex) => (None, Some(regex.clone())),
    };
    RuleParams {
        url_filter,
        regex_filter,
        match_case: false,
        request_domains: vec![scope.domain.to_string()],
        excluded_request_domains: scope.excluded_request_domains.clone(),
        ..Default::default()
    }
}

/// Literal patterns become URL filters; anything else goes through the
/// checker. `None` means the engine rejected the regex.
fn compile_url_match(
    tracker_domain: &str,
    pattern: &str,
    checker: &dyn RegexSupportChecker,
) -> Result<Option<UrlMatch>> {
    if pattern.is_empty() {
        return Err(Error::invalid_input(format!(
            "tracker dataset: empty rule for tracker {tracker_domain}"
        )));
    }

    if let Some(literal) = regex_literal(pattern) {
        return Ok(Some(UrlMatch::UrlFilter(anchored_url_filter(tracker_domain, &literal))));
    }

    let query = RegexQuery {
        regex: pattern.to_string(),
        is_case_sensitive: false,
    };
    let support = checker.is_regex_supported(&query)?;
    if support.is_supported {
        Ok(Some(UrlMatch::RegexFilter(pattern.to_string())))
    } else {
        log::warn!(
            "Skipping rule {:?} of tracker {}: regex not supported ({:?})",
            pattern,
            tracker_domain,
            support.reason
        );
        Ok(None)
    }
}

/// The text a pattern matches when it is a plain literal: escaped
/// punctuation is unescaped, `.` is taken literally. Returns `None` for any
/// other regex syntax, or when the text would mean something to a URL
/// filter (`*`, `|`, `^`).
fn regex_literal(pattern: &str) -> Option<String> {
    let mut literal = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let escaped = chars.next()?;
                if !escaped.is_ascii_punctuation() {
                    return None;
                }
                literal.push(escaped);
            }
            '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' => return None,
            _ => literal.push(ch),
        }
    }

    if literal.contains(['*', '|', '^']) {
        return None;
    }
    Some(literal)
}

fn capacity_error(domain: &str, count: usize, max: usize) -> Error {
    Error::Capacity {
        domain: domain.to_string(),
        count,
        max,
        family: RuleFamily::TrackerBlocking,
    }
}
