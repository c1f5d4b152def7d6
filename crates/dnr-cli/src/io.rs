//! File helpers shared by the subcommands.

use std::fs;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Serializer;

pub fn read_text(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))
}

pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, String> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|e| format!("Failed to parse '{}': {}", path, e))
}

/// Tab-indented JSON, matching the checked-in rulesets.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));
    value
        .serialize(&mut serializer)
        .map_err(|e| format!("Failed to serialize output: {}", e))?;
    Ok(out)
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), String> {
    let bytes = to_pretty_json(value)?;
    fs::write(path, bytes).map_err(|e| format!("Failed to write '{}': {}", path, e))
}

/// One domain per line, `#` comments and blank lines skipped.
pub fn read_domain_lines(path: &str) -> Result<Vec<String>, String> {
    let text = read_text(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
