// src/resolver.rs
use crate::types::{ResolutionOutcome, ResolverConfig, SubscoutError};
use async_trait::async_trait;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use trust_dns_resolver::config::{
    NameServerConfig, Protocol, ResolverConfig as DnsResolverConfig, ResolverOpts,
};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::system_conf;
use trust_dns_resolver::TokioAsyncResolver;

/// A single DNS probe. Implementations hold no per-call mutable state and
/// are shared between workers behind an `Arc`.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, candidate: &str, timeout: Duration) -> ResolutionOutcome;
}

#[derive(Debug, PartialEq, Eq)]
pub enum LookupFailure {
    NotFound,
    TimedOut,
    Other(String),
}

/// Runs `lookup` for `name`, never taking longer than `timeout`.
pub async fn bounded_lookup<F>(name: &str, timeout: Duration, lookup: F) -> ResolutionOutcome
where
    F: Future<Output = Result<Vec<IpAddr>, LookupFailure>>,
{
    let name = name.to_string();
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(addresses)) if !addresses.is_empty() => ResolutionOutcome::Resolved { name, addresses },
        Ok(Ok(_)) | Ok(Err(LookupFailure::NotFound)) => ResolutionOutcome::NotFound { name },
        Ok(Err(LookupFailure::TimedOut)) | Err(_) => ResolutionOutcome::TimedOut { name },
        Ok(Err(LookupFailure::Other(cause))) => ResolutionOutcome::Error { name, cause },
    }
}

pub fn classify_error(err: &ResolveError) -> LookupFailure {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => LookupFailure::NotFound,
        ResolveErrorKind::Timeout => LookupFailure::TimedOut,
        _ => LookupFailure::Other(err.to_string()),
    }
}

pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self, SubscoutError> {
        let (resolver_config, mut opts) = if config.nameservers.is_empty() {
            system_conf::read_system_conf().map_err(|e| {
                SubscoutError::ResolutionError(format!("Failed to read system resolver configuration: {}", e))
            })?
        } else {
            let mut resolver_config = DnsResolverConfig::new();

            for ns in &config.nameservers {
                let socket_addr = parse_nameserver(ns)?;
                resolver_config.add_name_server(NameServerConfig {
                    socket_addr,
                    protocol: Protocol::Udp,
                    tls_dns_name: None,
                    trust_negative_responses: true,
                    bind_addr: None,
                });
            }

            (resolver_config, ResolverOpts::default())
        };

        opts.timeout = config.timeout;
        opts.attempts = 1;

        Ok(Self {
            resolver: TokioAsyncResolver::tokio(resolver_config, opts),
        })
    }
}

#[async_trait]
impl Resolve for DnsResolver {
    async fn resolve(&self, candidate: &str, timeout: Duration) -> ResolutionOutcome {
        // Absolute name, so search domains from resolv.conf are never appended.
        let fqdn = format!("{}.", candidate.trim_end_matches('.'));

        bounded_lookup(candidate, timeout, async {
            self.resolver
                .lookup_ip(fqdn.as_str())
                .await
                .map(|lookup| lookup.iter().collect())
                .map_err(|e| classify_error(&e))
        })
        .await
    }
}

/// Accepts `ip:port` or a bare IP, which gets port 53.
pub fn parse_nameserver(raw: &str) -> Result<SocketAddr, SubscoutError> {
    let raw = raw.trim();
    if let Ok(addr) = SocketAddr::from_str(raw) {
        return Ok(addr);
    }
    IpAddr::from_str(raw)
        .map(|ip| SocketAddr::new(ip, 53))
        .map_err(|e| SubscoutError::ConfigError(format!("Invalid nameserver address {}: {}", raw, e)))
}
