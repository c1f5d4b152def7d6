//! Global Privacy Control request header.

use dnr_core::config::exception_domains;
use dnr_core::types::HeaderInfo;
use dnr_core::{MatchDetails, PrivacyConfig, ResourceTypes, Rule, RuleAction, RuleFamily};

use crate::builder::{build_rule, RuleParams};

/// Rules sending `Sec-GPC: 1` on every request, or nothing when the feature
/// is not enabled. Rules carry ID 0.
pub fn generate_gpc_header_rules(config: &PrivacyConfig) -> Vec<(Rule, MatchDetails)> {
    let Some(gpc) = config.features.gpc.as_ref().filter(|gpc| gpc.state.is_enabled()) else {
        return Vec::new();
    };

    let exceptions = exception_domains(&gpc.exceptions);
    let rule = build_rule(
        RuleFamily::Gpc.band().priority(),
        RuleAction::ModifyHeaders {
            request_headers: vec![HeaderInfo::set("Sec-GPC", "1")],
            response_headers: Vec::new(),
        },
        RuleParams {
            resource_types: Some(ResourceTypes::ALL),
            excluded_request_domains: exceptions.clone(),
            excluded_initiator_domains: exceptions,
            ..Default::default()
        },
    );

    vec![(rule, MatchDetails::Gpc)]
}
