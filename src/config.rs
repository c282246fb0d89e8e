use crate::cli::Args;
use crate::error::{ErrorContext, Result};
use crate::resolver::parse_nameserver;
use crate::types::{
    Domain, OutputConfig, OutputFormat, PassiveConfig, ResolverConfig, ScanConfig, ScanMode,
    SubscoutError, DEFAULT_THREADS, MAX_THREADS,
};
use crate::utils;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Optional settings read from a TOML file. Every key may be omitted.
///
/// ```toml
/// threads = 50
///
/// [resolver]
/// timeout = 1.5
/// nameservers = ["8.8.8.8:53", "1.1.1.1"]
/// rate_limit = 200
///
/// [passive]
/// endpoint = "https://crt.sh/"
/// timeout = 20
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub threads: Option<usize>,
    pub resolver: FileResolverConfig,
    pub passive: FilePassiveConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileResolverConfig {
    pub timeout: Option<f64>,
    pub nameservers: Option<Vec<String>>,
    pub rate_limit: Option<u32>,
    pub filter_wildcards: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilePassiveConfig {
    pub endpoint: Option<String>,
    pub timeout: Option<f64>,
    pub user_agent: Option<String>,
    pub proxy: Option<String>,
}

pub fn load_config(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Builds the immutable scan configuration: defaults, then the config file,
/// then environment variables, then command line flags. Everything is
/// validated here, before any network activity.
pub fn build_scan_config(args: &Args) -> Result<ScanConfig> {
    build_scan_config_with_env(args, |key| env::var(key).ok())
}

pub fn build_scan_config_with_env<F>(args: &Args, lookup_env: F) -> Result<ScanConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let domain = Domain::parse(&args.domain)?;
    let mode = resolve_mode(args)?;

    let mut threads = DEFAULT_THREADS;
    let mut resolver = ResolverConfig::default();
    let mut passive = PassiveConfig::default();

    if let Some(path) = &args.config_path {
        apply_file_config(load_config(path)?, &mut threads, &mut resolver, &mut passive)?;
    }

    apply_env_overrides(&mut passive, lookup_env);

    if let Some(n) = args.threads {
        threads = n;
    }
    if let Some(raw) = &args.timeout {
        resolver.timeout = utils::parse_seconds(raw).map_err(SubscoutError::ConfigError)?;
    }
    if let Some(raw) = &args.passive_timeout {
        passive.timeout = utils::parse_seconds(raw).map_err(SubscoutError::ConfigError)?;
    }
    if let Some(nameservers) = &args.resolvers {
        resolver.nameservers = nameservers
            .iter()
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty())
            .collect();
    }
    if args.rate_limit.is_some() {
        resolver.rate_limit = args.rate_limit;
    }
    if args.filter_wildcards {
        resolver.filter_wildcards = true;
    }

    let output = OutputConfig {
        format: if args.json { OutputFormat::Json } else { OutputFormat::Text },
        file: args.output_file.clone(),
        silent: args.silent,
    };

    let config = ScanConfig {
        domain,
        wordlist: if mode.runs_active() { args.wordlist.clone() } else { None },
        threads,
        mode,
        output,
        resolver,
        passive,
    };

    validate_config(&config)?;
    Ok(config)
}

/// Mode selection: the passive source always runs unless `--active-only`;
/// the active source runs whenever a wordlist is given, unless
/// `--passive-only`.
fn resolve_mode(args: &Args) -> Result<ScanMode> {
    if args.passive_only && args.active_only {
        return Err(SubscoutError::ConfigError(
            "Cannot use --passive-only and --active-only together".to_string(),
        ));
    }
    if args.active_only && args.wordlist.is_none() {
        return Err(SubscoutError::ConfigError(
            "--wordlist is required for --active-only mode".to_string(),
        ));
    }

    Ok(if args.active_only {
        ScanMode::Active
    } else if args.passive_only || args.wordlist.is_none() {
        ScanMode::Passive
    } else {
        ScanMode::Combined
    })
}

fn seconds(value: f64, what: &str) -> Result<Duration> {
    utils::parse_seconds(&value.to_string())
        .map_err(|e| SubscoutError::ConfigError(format!("{}: {}", what, e)))
}

fn apply_file_config(
    file: FileConfig,
    threads: &mut usize,
    resolver: &mut ResolverConfig,
    passive: &mut PassiveConfig,
) -> Result<()> {
    if let Some(n) = file.threads {
        *threads = n;
    }

    if let Some(timeout) = file.resolver.timeout {
        resolver.timeout = seconds(timeout, "resolver.timeout")?;
    }
    if let Some(nameservers) = file.resolver.nameservers {
        resolver.nameservers = nameservers;
    }
    if file.resolver.rate_limit.is_some() {
        resolver.rate_limit = file.resolver.rate_limit;
    }
    if let Some(filter) = file.resolver.filter_wildcards {
        resolver.filter_wildcards = filter;
    }

    if let Some(endpoint) = file.passive.endpoint {
        passive.endpoint = endpoint;
    }
    if let Some(timeout) = file.passive.timeout {
        passive.timeout = seconds(timeout, "passive.timeout")?;
    }
    if let Some(user_agent) = file.passive.user_agent {
        passive.user_agent = user_agent;
    }
    if file.passive.proxy.is_some() {
        passive.proxy = file.passive.proxy;
    }

    Ok(())
}

fn apply_env_overrides<F>(passive: &mut PassiveConfig, lookup_env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = lookup_env("SUBSCOUT_CRTSH_URL") {
        passive.endpoint = endpoint;
    }
    if let Some(proxy) = lookup_env("SUBSCOUT_PROXY") {
        passive.proxy = Some(proxy);
    }
    if let Some(user_agent) = lookup_env("SUBSCOUT_USER_AGENT") {
        passive.user_agent = user_agent;
    }
}

fn validate_config(config: &ScanConfig) -> Result<()> {
    if config.threads == 0 || config.threads > MAX_THREADS {
        return Err(SubscoutError::ConfigError(format!(
            "Thread count must be between 1 and {}, got {}",
            MAX_THREADS, config.threads
        )));
    }
    if config.resolver.timeout.is_zero() || config.passive.timeout.is_zero() {
        return Err(SubscoutError::ConfigError("Timeouts must be greater than 0".to_string()));
    }
    if config.resolver.rate_limit == Some(0) {
        return Err(SubscoutError::ConfigError("Rate limit must be greater than 0".to_string()));
    }
    for ns in &config.resolver.nameservers {
        parse_nameserver(ns)?;
    }

    if config.mode.runs_active() {
        let path = config.wordlist.as_deref().ok_or_else(|| {
            SubscoutError::ConfigError("A wordlist is required for brute-forcing".to_string())
        })?;
        utils::ensure_readable(path)
            .with_context(|| format!("Wordlist {} is not readable", path.display()))?;
    }

    Ok(())
}
