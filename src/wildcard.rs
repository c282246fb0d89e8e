// src/wildcard.rs
use crate::resolver::Resolve;
use crate::types::{Domain, ResolutionOutcome, SubdomainSet};
use log::{debug, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;

pub const WILDCARD_PROBES: usize = 3;

fn random_label() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// Probes random labels under `domain`; any address they resolve to is
/// treated as a wildcard answer.
pub async fn detect_wildcard(
    resolver: &dyn Resolve,
    domain: &Domain,
    attempts: usize,
    timeout: Duration,
) -> HashSet<String> {
    let mut ips = HashSet::new();
    for _ in 0..attempts {
        let probe = domain.candidate(&random_label());
        if let ResolutionOutcome::Resolved { addresses, .. } = resolver.resolve(&probe, timeout).await {
            debug!("Wildcard probe {} answered", probe);
            ips.extend(addresses.iter().map(|ip| ip.to_string()));
        }
    }

    if !ips.is_empty() {
        warn!(
            "Wildcard DNS detected for {}: {}",
            domain,
            ips.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    ips
}

/// True when every answer is a wildcard address.
pub fn is_wildcard(answers: &[String], wild_ips: &HashSet<String>) -> bool {
    if wild_ips.is_empty() || answers.is_empty() {
        return false;
    }
    answers.iter().all(|a| wild_ips.contains(a))
}

/// Drops brute-force hits that only point at wildcard addresses. Returns
/// the number of names removed.
pub fn filter_wildcards(found: &mut SubdomainSet, wild_ips: &HashSet<String>) -> usize {
    let before = found.len();
    found.retain(|result| {
        let answers: Vec<String> = result.ip_addresses.iter().cloned().collect();
        !is_wildcard(&answers, wild_ips)
    });
    before - found.len()
}
