//! Hostname and IP canonicalization for identity comparison.
//!
//! Remote devices advertise themselves loosely: FQDNs with or without a
//! trailing dot, mixed case, bare labels, bracketed IPv6 literals. Everything
//! that compares a discovered name against the inventory goes through here.

use std::net::IpAddr;

use indexmap::IndexSet;

/// Canonicalize a hostname or address for exact comparison.
///
/// Trims whitespace, lowercases, strips trailing `.` and IPv6 brackets.
pub fn normalize_full(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    let stripped = lowered.trim_end_matches('.');
    strip_brackets(stripped).trim().to_string()
}

/// Canonicalize to a short comparison key.
///
/// IP literals become their canonical textual form; anything else is reduced
/// to its first DNS label.
pub fn normalize_short(s: &str) -> String {
    let full = normalize_full(s);
    if let Some(ip) = parse_ip_literal(&full) {
        return ip.to_string();
    }
    match full.split_once('.') {
        Some((label, _)) => label.to_string(),
        None => full,
    }
}

/// Check whether two names refer to the same device.
///
/// True if the full forms are equal or the short forms are equal. Empty
/// names never match anything.
pub fn matches(a: &str, b: &str) -> bool {
    let (full_a, full_b) = (normalize_full(a), normalize_full(b));
    if full_a.is_empty() || full_b.is_empty() {
        return false;
    }
    full_a == full_b || normalize_short(&full_a) == normalize_short(&full_b)
}

/// Parse an IP literal, tolerating surrounding whitespace and IPv6 brackets.
pub fn parse_ip_literal(s: &str) -> Option<IpAddr> {
    strip_brackets(s.trim()).parse().ok()
}

/// Build the identity-IP set for a host.
///
/// Returns the router id followed by the management IPs, keeping only valid
/// IP literals in canonical form, de-duplicated with first occurrence order
/// preserved. Invalid and empty tokens are dropped silently.
pub fn choose_identity_ips<S: AsRef<str>>(router_id: &str, mgmt_ips: &[S]) -> Vec<String> {
    let mut chosen = IndexSet::new();
    let candidates = std::iter::once(router_id).chain(mgmt_ips.iter().map(|ip| ip.as_ref()));
    for token in candidates {
        if let Some(ip) = parse_ip_literal(token) {
            chosen.insert(ip.to_string());
        }
    }
    chosen.into_iter().collect()
}

/// Split a persisted address list ("10.0.0.1, 10.0.0.2 fe80::1") into tokens.
pub fn split_ip_tokens(s: &str) -> Vec<&str> {
    s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect()
}

fn strip_brackets(s: &str) -> &str {
    s.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(s)
}
