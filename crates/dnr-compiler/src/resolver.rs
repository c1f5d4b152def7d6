//! Domain/entity resolution over a tracker dataset.

use dnr_core::domain::{entry_domain_for, walk_strict_ancestors};
use dnr_core::Tds;
use indexmap::IndexMap;

/// Alias and ownership lookups for one dataset, computed once per run.
pub struct DomainResolver<'a> {
    tds: &'a Tds,
    aliases: IndexMap<&'a str, Vec<&'a str>>,
    /// Entity name -> CNAME aliases of all its trackers.
    entity_aliases: IndexMap<&'a str, Vec<&'a str>>,
}

impl<'a> DomainResolver<'a> {
    pub fn new(tds: &'a Tds) -> Self {
        let aliases = aliases_of(tds);

        let mut entity_aliases: IndexMap<&'a str, Vec<&'a str>> = IndexMap::new();
        for (tracker_domain, tracker) in &tds.trackers {
            let owned = entity_aliases.entry(tracker.owner.name.as_str()).or_default();
            if let Some(domains) = aliases.get(tracker_domain.as_str()) {
                for alias in domains.iter().skip(1) {
                    if !owned.contains(alias) {
                        owned.push(alias);
                    }
                }
            }
        }

        Self {
            tds,
            aliases,
            entity_aliases,
        }
    }

    /// The tracker domain followed by its CNAME aliases. Empty for domains
    /// that are not tracker entries.
    pub fn aliases(&self, tracker_domain: &str) -> &[&'a str] {
        self.aliases
            .get(tracker_domain)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Nearest tracker entry governing `domain`.
    pub fn tracker_entry_domain(&self, domain: &str) -> Option<&'a str> {
        entry_domain_for(&self.tds.trackers, domain, None)
    }

    /// Owner of a tracker entry.
    pub fn owner_of(&self, tracker_domain: &str) -> Option<&'a str> {
        self.tds
            .trackers
            .get(tracker_domain)
            .map(|tracker| tracker.owner.name.as_str())
    }

    /// Domains belonging to the owner of `tracker_domain`: declared domains
    /// in their listed order, then CNAME aliases of the owner's trackers.
    pub fn entity_domains(&self, tracker_domain: &str) -> Vec<String> {
        let Some(owner) = self.owner_of(tracker_domain) else {
            return Vec::new();
        };

        let mut domains: Vec<String> = Vec::new();
        let declared = self.tds.owned_domains(owner).iter().map(String::as_str);
        let aliased = self
            .entity_aliases
            .get(owner)
            .into_iter()
            .flatten()
            .copied();

        for domain in declared.chain(aliased) {
            if !domains.iter().any(|d| d == domain) {
                domains.push(domain.to_string());
            }
        }
        domains
    }
}

/// Tracker domain -> itself plus every CNAME alias resolving to it.
///
/// An alias whose target is a subdomain of a tracker entry belongs to that
/// entry.
pub fn aliases_of(tds: &Tds) -> IndexMap<&str, Vec<&str>> {
    let mut aliases: IndexMap<&str, Vec<&str>> = tds
        .trackers
        .keys()
        .map(|domain| (domain.as_str(), vec![domain.as_str()]))
        .collect();

    for (alias, target) in &tds.cnames {
        let Some(tracker_domain) = entry_domain_for(&tds.trackers, target, None) else {
            continue;
        };
        let entry = aliases.entry(tracker_domain).or_default();
        if !entry.contains(&alias.as_str()) {
            entry.push(alias.as_str());
        }
    }

    aliases
}

/// For each key, the other keys that are its strict subdomains.
///
/// A more specific entry governs its own traffic, so rules generated for an
/// ancestor entry exclude these request domains.
pub fn descendant_entries<V>(entries: &IndexMap<String, V>) -> IndexMap<&str, Vec<String>> {
    let mut descendants: IndexMap<&str, Vec<String>> = IndexMap::new();

    for domain in entries.keys() {
        for ancestor in walk_strict_ancestors(domain) {
            if let Some((key, _)) = entries.get_key_value(ancestor) {
                descendants
                    .entry(key.as_str())
                    .or_default()
                    .push(domain.clone());
            }
        }
    }

    descendants
}
