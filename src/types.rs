// src/types.rs
use crate::utils;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_THREADS: usize = 10;
pub const MAX_THREADS: usize = 10_000;
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_PASSIVE_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_CRTSH_URL: &str = "https://crt.sh/";

/// A validated, lowercased root domain such as `example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    pub fn parse(raw: &str) -> Result<Self, SubscoutError> {
        let domain = raw.trim().to_lowercase();
        if !utils::is_valid_domain(&domain) {
            return Err(SubscoutError::InvalidDomain(raw.to_string()));
        }
        Ok(Self(domain))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the probe name for a wordlist entry. Entries are concatenated
    /// literally, even when they already look fully qualified.
    pub fn candidate(&self, word: &str) -> String {
        format!("{}.{}", word, self.0)
    }

    /// True when `name` is this domain or one of its subdomains.
    pub fn contains(&self, name: &str) -> bool {
        let name = utils::normalize_name(name);
        name == self.0
            || name
                .strip_suffix(self.0.as_str())
                .map_or(false, |prefix| prefix.ends_with('.'))
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Passive,
    Active,
    Combined,
}

impl ScanMode {
    pub fn runs_passive(self) -> bool {
        matches!(self, ScanMode::Passive | ScanMode::Combined)
    }

    pub fn runs_active(self) -> bool {
        matches!(self, ScanMode::Active | ScanMode::Combined)
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanMode::Passive => "passive",
            ScanMode::Active => "active",
            ScanMode::Combined => "combined",
        };
        f.write_str(name)
    }
}

/// Immutable scan configuration, built once by `config::build_scan_config`.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub domain: Domain,
    pub wordlist: Option<PathBuf>,
    pub threads: usize,
    pub mode: ScanMode,
    pub output: OutputConfig,
    pub resolver: ResolverConfig,
    pub passive: PassiveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub file: Option<PathBuf>,
    pub silent: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            file: None,
            silent: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub timeout: Duration,
    /// Explicit nameservers; empty means the system configuration.
    pub nameservers: Vec<String>,
    /// Queries per second across all workers; `None` means unlimited.
    pub rate_limit: Option<u32>,
    pub filter_wildcards: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DNS_TIMEOUT,
            nameservers: Vec::new(),
            rate_limit: None,
            filter_wildcards: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassiveConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub proxy: Option<String>,
}

impl Default for PassiveConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CRTSH_URL.to_string(),
            timeout: DEFAULT_PASSIVE_TIMEOUT,
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
            proxy: None,
        }
    }
}

/// Result of a single DNS probe. Only `Resolved` contributes to output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Resolved { name: String, addresses: Vec<IpAddr> },
    NotFound { name: String },
    TimedOut { name: String },
    Error { name: String, cause: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdomainResult {
    pub subdomain: String,
    pub sources: BTreeSet<String>,
    pub ip_addresses: BTreeSet<String>,
}

impl SubdomainResult {
    pub fn new(subdomain: impl Into<String>, source: &str) -> Self {
        let mut sources = BTreeSet::new();
        sources.insert(source.to_string());
        Self {
            subdomain: subdomain.into(),
            sources,
            ip_addresses: BTreeSet::new(),
        }
    }

    pub fn with_addresses<I>(mut self, addresses: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        self.ip_addresses
            .extend(addresses.into_iter().map(|ip| ip.to_string()));
        self
    }

    fn merge(&mut self, other: SubdomainResult) {
        self.sources.extend(other.sources);
        self.ip_addresses.extend(other.ip_addresses);
    }
}

/// Confirmed subdomains keyed by normalized name. Inserting a name that is
/// already present merges its sources and addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubdomainSet {
    entries: BTreeMap<String, SubdomainResult>,
}

impl SubdomainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the name normalizes to nothing.
    pub fn insert(&mut self, mut result: SubdomainResult) -> bool {
        let key = utils::normalize_name(&result.subdomain);
        if key.is_empty() {
            return false;
        }
        result.subdomain = key.clone();
        match self.entries.entry(key) {
            btree_map::Entry::Occupied(mut existing) => existing.get_mut().merge(result),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(result);
            }
        }
        true
    }

    pub fn extend(&mut self, other: SubdomainSet) {
        for result in other.entries.into_values() {
            self.insert(result);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&utils::normalize_name(name))
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&SubdomainResult) -> bool,
    {
        self.entries.retain(|_, result| keep(result));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubdomainResult> {
        self.entries.values()
    }

    /// Finalizes the set into an ordered sequence.
    pub fn into_sorted_vec(self) -> Vec<SubdomainResult> {
        self.entries.into_values().collect()
    }
}

impl FromIterator<SubdomainResult> for SubdomainSet {
    fn from_iter<T: IntoIterator<Item = SubdomainResult>>(iter: T) -> Self {
        let mut set = SubdomainSet::new();
        for result in iter {
            set.insert(result);
        }
        set
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStats {
    pub candidates_probed: usize,
    pub resolved_count: usize,
    pub passive_count: usize,
    pub unique_subdomains: usize,
    pub interrupted: bool,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub domain: Domain,
    pub mode: ScanMode,
    pub subdomains: Vec<SubdomainResult>,
    pub stats: ScanStats,
    pub timestamp: String,
}

#[derive(Debug, Error)]
pub enum SubscoutError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Source error in {source_name}: {message}")]
    SourceError {
        source_name: String,
        message: String,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Resolution error: {0}")]
    ResolutionError(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
}

impl SubscoutError {
    /// Configuration problems abort before any scan traffic is sent.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            SubscoutError::ConfigError(_) | SubscoutError::InvalidDomain(_)
        )
    }
}
