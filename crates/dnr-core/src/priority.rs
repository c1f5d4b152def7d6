//! Rule priority registry
//!
//! declarativeNetRequest evaluates the highest priority matching rule first,
//! and at equal priority `allow` beats `block`. Every rule family owns a fixed
//! band in the table below so that one family can only ever override another
//! in the intended direction:
//!
//! ```text
//! TrackerBlocking   10000 ..= 10100   ranked, step 1
//! TrackerAllowlist  20000 ..= 20100   ranked, step 1
//! Cookie            20200
//! Gpc               20300
//! SmarterEncryption 30000
//! Surrogate         100000
//! ```
//!
//! Redirect and upgrade rules sit above every allow rule: once an allow rule
//! matches a request, redirects no longer get the chance to.

use std::fmt;

/// The rule families Blockwright generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleFamily {
    TrackerBlocking,
    TrackerAllowlist,
    Cookie,
    Gpc,
    SmarterEncryption,
    Surrogate,
}

impl RuleFamily {
    /// All families, lowest band first.
    pub const ALL: [RuleFamily; 6] = [
        RuleFamily::TrackerBlocking,
        RuleFamily::TrackerAllowlist,
        RuleFamily::Cookie,
        RuleFamily::Gpc,
        RuleFamily::SmarterEncryption,
        RuleFamily::Surrogate,
    ];

    /// The priority band reserved for this family.
    pub const fn band(self) -> PriorityBand {
        PRIORITY_TABLE[self as usize].1
    }

    pub const fn name(self) -> &'static str {
        match self {
            RuleFamily::TrackerBlocking => "tracker blocking",
            RuleFamily::TrackerAllowlist => "tracker allowlist",
            RuleFamily::Cookie => "cookie",
            RuleFamily::Gpc => "gpc",
            RuleFamily::SmarterEncryption => "smarter encryption",
            RuleFamily::Surrogate => "surrogate",
        }
    }
}

impl fmt::Display for RuleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An inclusive priority range owned by one rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityBand {
    pub baseline: u32,
    pub ceiling: u32,
    pub increment: u32,
}

impl PriorityBand {
    const fn ranked(baseline: u32, ceiling: u32, increment: u32) -> Self {
        Self {
            baseline,
            ceiling,
            increment,
        }
    }

    const fn fixed(priority: u32) -> Self {
        Self {
            baseline: priority,
            ceiling: priority,
            increment: 0,
        }
    }

    /// Priority of families that use a single value.
    #[inline]
    pub const fn priority(&self) -> u32 {
        self.baseline
    }

    /// How many ranked rules fit above the baseline of this band.
    pub const fn max_rules_per_entry(&self) -> usize {
        if self.increment == 0 {
            return 0;
        }
        ((self.ceiling - self.baseline) / self.increment) as usize
    }

    /// Priority for the rule at `index` of `count` source-ordered rules when
    /// the first rule must win: `baseline + (count - 1 - index) * increment`.
    ///
    /// Returns `None` when `index` is out of range or the result would leave
    /// the band.
    pub fn descending_priority(&self, index: usize, count: usize) -> Option<u32> {
        if index >= count {
            return None;
        }
        self.offset_priority(count - 1 - index)
    }

    /// `baseline + steps * increment`, if that stays inside the band.
    pub fn offset_priority(&self, steps: usize) -> Option<u32> {
        let steps = u32::try_from(steps).ok()?;
        let priority = self
            .baseline
            .checked_add(steps.checked_mul(self.increment)?)?;
        (priority <= self.ceiling).then_some(priority)
    }

    #[inline]
    pub const fn contains(&self, priority: u32) -> bool {
        priority >= self.baseline && priority <= self.ceiling
    }
}

/// The registry. Indexed by `RuleFamily as usize`, ascending and disjoint.
pub const PRIORITY_TABLE: [(RuleFamily, PriorityBand); 6] = [
    (RuleFamily::TrackerBlocking, PriorityBand::ranked(10000, 10100, 1)),
    (RuleFamily::TrackerAllowlist, PriorityBand::ranked(20000, 20100, 1)),
    (RuleFamily::Cookie, PriorityBand::fixed(20200)),
    (RuleFamily::Gpc, PriorityBand::fixed(20300)),
    (RuleFamily::SmarterEncryption, PriorityBand::fixed(30000)),
    (RuleFamily::Surrogate, PriorityBand::fixed(100000)),
];

/// Which family a priority value belongs to, if any.
pub fn family_of(priority: u32) -> Option<RuleFamily> {
    PRIORITY_TABLE
        .iter()
        .find(|(_, band)| band.contains(priority))
        .map(|(family, _)| *family)
}
