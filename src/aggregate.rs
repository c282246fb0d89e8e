// src/aggregate.rs
use crate::types::{Domain, ScanMode, SubdomainResult, SubdomainSet};
use log::debug;

/// Merges the active and passive result sets for `mode`.
///
/// Names are collapsed case-insensitively, anything carrying passive data is
/// restricted to `domain` and its subdomains, and the output is sorted on the
/// normalized name.
pub fn aggregate(
    mode: ScanMode,
    active: &SubdomainSet,
    passive: &SubdomainSet,
    domain: &Domain,
) -> Vec<SubdomainResult> {
    let mut merged = SubdomainSet::new();

    if mode.runs_active() {
        merged.extend(active.clone());
    }
    if mode.runs_passive() {
        merged.extend(passive.clone());

        let before = merged.len();
        merged.retain(|result| domain.contains(&result.subdomain));
        let dropped = before - merged.len();
        if dropped > 0 {
            debug!("Discarded {} names outside {}", dropped, domain);
        }
    }

    merged.into_sorted_vec()
}
