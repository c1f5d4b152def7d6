//! Regex capability probe.
//!
//! Whether the browser's regex engine accepts a pattern is only known to the
//! host, so the compiler asks through `RegexSupportChecker`. The extension
//! build passes the browser's own `isRegexSupported`; the CLI uses
//! `EngineRegexChecker`, which approximates it with the `regex` crate.

use dnr_core::{Error, Result};
use regex::bytes::RegexBuilder;
use serde::{Deserialize, Serialize};

/// Argument of a probe call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegexQuery {
    pub regex: String,
    pub is_case_sensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnsupportedReason {
    SyntaxError,
    MemoryLimitExceeded,
}

/// Answer of a probe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegexSupport {
    pub is_supported: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnsupportedReason>,
}

impl RegexSupport {
    pub const SUPPORTED: RegexSupport = RegexSupport {
        is_supported: true,
        reason: None,
    };

    pub fn unsupported(reason: UnsupportedReason) -> Self {
        Self {
            is_supported: false,
            reason: Some(reason),
        }
    }
}

/// Reports whether the target engine accepts a regex.
///
/// An `Err` means the probe itself failed, which aborts compilation.
pub trait RegexSupportChecker {
    fn is_regex_supported(&self, query: &RegexQuery) -> Result<RegexSupport>;
}

impl<F> RegexSupportChecker for F
where
    F: Fn(&RegexQuery) -> Result<RegexSupport>,
{
    fn is_regex_supported(&self, query: &RegexQuery) -> Result<RegexSupport> {
        self(query)
    }
}

/// Probe backed by the `regex` crate.
///
/// Patterns are compiled against bytes with Unicode classes off, the way
/// RE2 treats URLs, and rejected once the compiled program outgrows
/// `size_limit`.
#[derive(Debug, Clone, Copy)]
pub struct EngineRegexChecker {
    size_limit: usize,
}

impl EngineRegexChecker {
    pub const DEFAULT_SIZE_LIMIT: usize = 8 * 1024;

    pub fn new() -> Self {
        Self::with_size_limit(Self::DEFAULT_SIZE_LIMIT)
    }

    pub fn with_size_limit(size_limit: usize) -> Self {
        Self { size_limit }
    }
}

impl Default for EngineRegexChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl RegexSupportChecker for EngineRegexChecker {
    fn is_regex_supported(&self, query: &RegexQuery) -> Result<RegexSupport> {
        let built = RegexBuilder::new(&query.regex)
            .unicode(false)
            .case_insensitive(!query.is_case_sensitive)
            .size_limit(self.size_limit)
            .build();

        match built {
            Ok(_) => Ok(RegexSupport::SUPPORTED),
            Err(regex::Error::Syntax(_)) => Ok(RegexSupport::unsupported(UnsupportedReason::SyntaxError)),
            Err(regex::Error::CompiledTooBig(_)) => {
                Ok(RegexSupport::unsupported(UnsupportedReason::MemoryLimitExceeded))
            }
            Err(err) => Err(Error::probe(&query.regex, err.to_string())),
        }
    }
}
