//! WebAssembly bindings for Blockwright
//!
//! Lets the extension build compile rulesets in the browser, asking the
//! browser's own `isRegexSupported` which regexes its engine accepts.

use std::sync::Once;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use dnr_compiler::capability::UnsupportedReason;
use dnr_compiler::{
    generate_combined_config_ruleset, generate_tds_ruleset, generate_tracker_allowlist_ruleset, validate_ruleset,
    RegexQuery, RegexSupport, RegexSupportChecker,
};
use dnr_core::tds::parse_surrogates;
use dnr_core::{Error, PrivacyConfig, RulesetResult, Tds};

// =============================================================================
// Logging
// =============================================================================

/// Forwards `log` records to the browser console.
struct ConsoleLogger;

static CONSOLE_LOGGER: ConsoleLogger = ConsoleLogger;
static LOGGER_INIT: Once = Once::new();

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&message),
            log::Level::Warn => web_sys::console::warn_1(&message),
            log::Level::Info => web_sys::console::info_1(&message),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&message),
        }
    }

    fn flush(&self) {}
}

/// Route compiler logs to the console. `verbose` enables debug output.
#[wasm_bindgen]
pub fn init_logging(verbose: bool) {
    LOGGER_INIT.call_once(|| {
        let _ = log::set_logger(&CONSOLE_LOGGER);
    });
    log::set_max_level(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });
}

// =============================================================================
// Regex probe
// =============================================================================

/// Calls a synchronous JS function shaped like
/// `chrome.declarativeNetRequest.isRegexSupported`.
struct JsRegexChecker {
    function: js_sys::Function,
}

impl RegexSupportChecker for JsRegexChecker {
    fn is_regex_supported(&self, query: &RegexQuery) -> dnr_core::Result<RegexSupport> {
        let probe_error = |reason: &str| Error::probe(&query.regex, reason);

        let argument = js_sys::Object::new();
        js_sys::Reflect::set(&argument, &"regex".into(), &JsValue::from_str(&query.regex))
            .map_err(|_| probe_error("could not build the query"))?;
        js_sys::Reflect::set(
            &argument,
            &"isCaseSensitive".into(),
            &JsValue::from_bool(query.is_case_sensitive),
        )
        .map_err(|_| probe_error("could not build the query"))?;

        let answer = self
            .function
            .call1(&JsValue::NULL, &argument)
            .map_err(|e| probe_error(&describe(&e)))?;

        let supported = js_sys::Reflect::get(&answer, &"isSupported".into())
            .ok()
            .and_then(|value| value.as_bool())
            .ok_or_else(|| probe_error("answer has no boolean isSupported"))?;
        if supported {
            return Ok(RegexSupport::SUPPORTED);
        }

        let reason = js_sys::Reflect::get(&answer, &"reason".into())
            .ok()
            .and_then(|value| value.as_string());
        Ok(RegexSupport::unsupported(unsupported_reason(reason.as_deref())))
    }
}

fn unsupported_reason(reason: Option<&str>) -> UnsupportedReason {
    match reason {
        Some("memoryLimitExceeded") => UnsupportedReason::MemoryLimitExceeded,
        _ => UnsupportedReason::SyntaxError,
    }
}

fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| value.dyn_ref::<js_sys::Error>().map(|e| String::from(e.message())))
        .unwrap_or_else(|| "isRegexSupported threw".to_string())
}

// =============================================================================
// Compilation
// =============================================================================

fn to_js_error(err: Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_tds(tds_json: &str) -> Result<Tds, JsValue> {
    Tds::from_json(tds_json).map_err(to_js_error)
}

fn parse_config(config_json: &str) -> Result<PrivacyConfig, JsValue> {
    PrivacyConfig::from_json(config_json).map_err(to_js_error)
}

fn result_json(result: &RulesetResult) -> Result<String, JsValue> {
    serde_json::to_string(result).map_err(|e| JsValue::from_str(&format!("Failed to serialize result: {}", e)))
}

/// Tracker blocking and surrogate rules. Returns the
/// `{ ruleset, matchDetailsByRuleId }` document as JSON.
#[wasm_bindgen]
pub fn compile_tds_ruleset(
    tds_json: &str,
    surrogates_json: &str,
    surrogate_path_prefix: &str,
    is_regex_supported: JsValue,
    starting_rule_id: u32,
) -> Result<String, JsValue> {
    let function = is_regex_supported
        .dyn_into::<js_sys::Function>()
        .map_err(|_| JsValue::from_str("Missing isRegexSupported function"))?;
    let checker = JsRegexChecker { function };

    let tds = parse_tds(tds_json)?;
    let surrogates_value: serde_json::Value = serde_json::from_str(surrogates_json)
        .map_err(|e| JsValue::from_str(&format!("Malformed surrogates mapping: {}", e)))?;
    let surrogates = parse_surrogates(surrogates_value).map_err(to_js_error)?;

    let result = generate_tds_ruleset(&tds, &surrogates, surrogate_path_prefix, &checker, starting_rule_id)
        .map_err(to_js_error)?;
    result_json(&result)
}

/// Tracker allowlist rules from a privacy configuration.
#[wasm_bindgen]
pub fn compile_allowlist_ruleset(config_json: &str, starting_rule_id: u32) -> Result<String, JsValue> {
    if starting_rule_id == 0 {
        return Err(JsValue::from_str("Starting rule ID must be at least 1"));
    }
    let config = parse_config(config_json)?;
    let result = generate_tracker_allowlist_ruleset(&config, starting_rule_id).map_err(to_js_error)?;
    validate_ruleset(&result.ruleset).map_err(to_js_error)?;
    result_json(&result)
}

/// Cookie and GPC rules. `denylist` is an array of domain strings.
#[wasm_bindgen]
pub fn compile_extension_configuration(
    tds_json: &str,
    config_json: &str,
    denylist: JsValue,
    starting_rule_id: u32,
) -> Result<String, JsValue> {
    if starting_rule_id == 0 {
        return Err(JsValue::from_str("Starting rule ID must be at least 1"));
    }
    let tds = parse_tds(tds_json)?;
    let config = parse_config(config_json)?;

    let mut denylisted_domains = Vec::new();
    if !denylist.is_undefined() && !denylist.is_null() {
        for value in js_sys::Array::from(&denylist).iter() {
            let domain = value
                .as_string()
                .ok_or_else(|| JsValue::from_str("Denylisted domains must be strings"))?;
            denylisted_domains.push(domain);
        }
    }

    let result =
        generate_combined_config_ruleset(&tds, &config, &denylisted_domains, starting_rule_id).map_err(to_js_error)?;
    validate_ruleset(&result.ruleset).map_err(to_js_error)?;
    result_json(&result)
}
