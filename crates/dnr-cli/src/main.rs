//! Blockwright CLI
//!
//! Compiles tracker policy documents into declarativeNetRequest rulesets.

mod io;

use std::time::Instant;

use clap::{Parser, Subcommand};
use serde_json::Value;

use dnr_compiler::{
    generate_combined_config_ruleset, generate_smarter_encryption_ruleset, generate_tds_ruleset,
    generate_tracker_allowlist_ruleset, parse_domain_list, validate_ruleset, EngineRegexChecker,
};
use dnr_core::tds::parse_surrogates;
use dnr_core::{PrivacyConfig, Rule, RulesetResult, SurrogatesConfig, Tds};

#[derive(Parser)]
#[command(name = "dnr-cli")]
#[command(about = "Tracker policy to declarativeNetRequest ruleset compiler")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the HTTPS upgrade ruleset from a domain list
    SmarterEncryption {
        /// Domain list, one hostname per line
        domains: String,
        /// Output ruleset file
        ruleset: String,
    },

    /// Build the tracker blocking ruleset from a tracker dataset
    TrackerBlocking {
        /// Tracker dataset (tds.json)
        tds: String,
        /// Output ruleset file
        ruleset: String,
        /// Output match details file
        match_details: Option<String>,

        /// Surrogate script mapping
        #[arg(long)]
        surrogates: Option<String>,

        /// Path prefix of the bundled surrogate scripts
        #[arg(long, default_value = "/")]
        surrogate_path_prefix: String,

        #[arg(long, default_value_t = 1)]
        starting_rule_id: u32,
    },

    /// Build the tracker allowlist ruleset from a privacy configuration
    TrackerBlockingAllowlist {
        /// Privacy configuration
        config: String,
        /// Output ruleset file
        ruleset: String,
        /// Output match details file
        match_details: Option<String>,

        #[arg(long, default_value_t = 1)]
        starting_rule_id: u32,
    },

    /// Build the cookie and GPC ruleset from a dataset and configuration
    ExtensionConfiguration {
        /// Tracker dataset (tds.json)
        tds: String,
        /// Privacy configuration
        config: String,
        /// Output ruleset file
        ruleset: String,
        /// Output match details file
        match_details: Option<String>,

        /// Domains the user denylisted, one per line
        #[arg(long)]
        denylist: Option<String>,

        #[arg(long, default_value_t = 1)]
        starting_rule_id: u32,
    },

    /// Check a compiled ruleset file
    Validate {
        /// Ruleset file to validate
        ruleset: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::SmarterEncryption { domains, ruleset } => cmd_smarter_encryption(&domains, &ruleset),
        Commands::TrackerBlocking {
            tds,
            ruleset,
            match_details,
            surrogates,
            surrogate_path_prefix,
            starting_rule_id,
        } => cmd_tracker_blocking(
            &tds,
            &ruleset,
            match_details.as_deref(),
            surrogates.as_deref(),
            &surrogate_path_prefix,
            starting_rule_id,
        ),
        Commands::TrackerBlockingAllowlist {
            config,
            ruleset,
            match_details,
            starting_rule_id,
        } => cmd_tracker_blocking_allowlist(&config, &ruleset, match_details.as_deref(), starting_rule_id),
        Commands::ExtensionConfiguration {
            tds,
            config,
            ruleset,
            match_details,
            denylist,
            starting_rule_id,
        } => cmd_extension_configuration(
            &tds,
            &config,
            &ruleset,
            match_details.as_deref(),
            denylist.as_deref(),
            starting_rule_id,
        ),
        Commands::Validate { ruleset } => cmd_validate(&ruleset),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_smarter_encryption(domains_path: &str, ruleset_path: &str) -> Result<(), String> {
    let text = io::read_text(domains_path)?;
    let domains = parse_domain_list(&text).map_err(|e| e.to_string())?;
    let result = generate_smarter_encryption_ruleset(&domains, 1).map_err(|e| e.to_string())?;

    io::write_json(ruleset_path, &result.ruleset)?;
    println!("Wrote {} rules for {} domains to '{}'", result.len(), domains.len(), ruleset_path);
    Ok(())
}

fn cmd_tracker_blocking(
    tds_path: &str,
    ruleset_path: &str,
    match_details_path: Option<&str>,
    surrogates_path: Option<&str>,
    surrogate_path_prefix: &str,
    starting_rule_id: u32,
) -> Result<(), String> {
    let start = Instant::now();

    let tds = load_tds(tds_path)?;
    let surrogates = match surrogates_path {
        Some(path) => parse_surrogates(io::read_json::<Value>(path)?).map_err(|e| e.to_string())?,
        None => SurrogatesConfig::new(),
    };

    let checker = EngineRegexChecker::new();
    let result = generate_tds_ruleset(&tds, &surrogates, surrogate_path_prefix, &checker, starting_rule_id)
        .map_err(|e| e.to_string())?;

    write_result(&result, ruleset_path, match_details_path)?;
    println!(
        "Compiled {} trackers to {} rules in {:.1}ms",
        tds.trackers.len(),
        result.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

fn cmd_tracker_blocking_allowlist(
    config_path: &str,
    ruleset_path: &str,
    match_details_path: Option<&str>,
    starting_rule_id: u32,
) -> Result<(), String> {
    let config = load_config(config_path)?;
    let result = generate_tracker_allowlist_ruleset(&config, starting_rule_id).map_err(|e| e.to_string())?;
    validate_ruleset(&result.ruleset).map_err(|e| e.to_string())?;

    write_result(&result, ruleset_path, match_details_path)?;
    println!("Wrote {} allowlist rules to '{}'", result.len(), ruleset_path);
    Ok(())
}

fn cmd_extension_configuration(
    tds_path: &str,
    config_path: &str,
    ruleset_path: &str,
    match_details_path: Option<&str>,
    denylist_path: Option<&str>,
    starting_rule_id: u32,
) -> Result<(), String> {
    if starting_rule_id == 0 {
        return Err("Starting rule ID must be at least 1".to_string());
    }

    let tds = load_tds(tds_path)?;
    let config = load_config(config_path)?;
    let denylist = match denylist_path {
        Some(path) => io::read_domain_lines(path)?,
        None => Vec::new(),
    };

    let result =
        generate_combined_config_ruleset(&tds, &config, &denylist, starting_rule_id).map_err(|e| e.to_string())?;
    validate_ruleset(&result.ruleset).map_err(|e| e.to_string())?;

    write_result(&result, ruleset_path, match_details_path)?;
    println!("Wrote {} configuration rules to '{}'", result.len(), ruleset_path);
    Ok(())
}

fn cmd_validate(ruleset_path: &str) -> Result<(), String> {
    let rules: Vec<Rule> = io::read_json(ruleset_path)?;
    let stats = validate_ruleset(&rules).map_err(|e| format!("Validation failed: {}", e))?;

    println!("Ruleset '{}' is valid", ruleset_path);
    println!("  Rules:          {}", stats.rules);
    println!("  Block:          {}", stats.block);
    println!("  Allow:          {}", stats.allow);
    println!("  Redirect:       {}", stats.redirect);
    println!("  ModifyHeaders:  {}", stats.modify_headers);
    println!("  UpgradeScheme:  {}", stats.upgrade_scheme);
    println!("  Regex filters:  {}", stats.regex_rules);
    Ok(())
}

fn load_tds(path: &str) -> Result<Tds, String> {
    let value: Value = io::read_json(path)?;
    Tds::from_value(value).map_err(|e| format!("'{}': {}", path, e))
}

fn load_config(path: &str) -> Result<PrivacyConfig, String> {
    let value: Value = io::read_json(path)?;
    PrivacyConfig::from_value(value).map_err(|e| format!("'{}': {}", path, e))
}

fn write_result(result: &RulesetResult, ruleset_path: &str, match_details_path: Option<&str>) -> Result<(), String> {
    io::write_json(ruleset_path, &result.ruleset)?;
    if let Some(path) = match_details_path {
        io::write_json(path, &result.match_details_by_rule_id)?;
    }
    Ok(())
}
