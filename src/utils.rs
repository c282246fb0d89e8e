// src/utils.rs
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Check if a string is a valid domain
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() < 2 {
        return false;
    }

    for part in parts {
        if part.is_empty() || part.len() > 63 {
            return false;
        }

        if !part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }

        if part.starts_with('-') || part.ends_with('-') {
            return false;
        }
    }

    true
}

/// Normalize a hostname for comparison: trimmed, lowercased, no trailing dot.
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}

/// Clean a name reported by a certificate log. Returns `None` for entries
/// that cannot be a hostname (empty, e-mail addresses, or wildcards beyond a
/// leading `*.`).
pub fn clean_certificate_name(raw: &str) -> Option<String> {
    let mut cleaned = normalize_name(raw);
    while let Some(stripped) = cleaned.strip_prefix("*.") {
        cleaned = stripped.to_string();
    }

    // Drops e-mail SANs, leftover wildcards and anything else that is not a hostname.
    if !is_valid_domain(&cleaned) {
        return None;
    }

    Some(cleaned)
}

/// Parse a user supplied number of seconds (fractions allowed) into a duration.
pub fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let seconds: f64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("invalid number of seconds '{}': {}", raw, e))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("timeout must be greater than 0, got '{}'", raw));
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("timeout '{}' is out of range: {}", raw, e))
}

/// Fail early when a file cannot be opened for reading.
pub fn ensure_readable(path: &Path) -> io::Result<()> {
    File::open(path).map(|_| ())
}
