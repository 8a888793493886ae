use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

/// Dotted-quad candidate pattern. Range-naive on purpose: every candidate is
/// validated through `Ipv4Addr` parsing, which enforces the 0-255 octet range
/// and rejects leading zeros.
static DOTTED_QUAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("valid pattern"));

/// A validated IPv4 address of one traversed network node.
///
/// Invariants: well-formed dotted-quad syntax, never the all-zeros address.
/// Uniqueness within a route is the extractor's job (first occurrence wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HopAddress(Ipv4Addr);

impl HopAddress {
    /// Parse a candidate string; `None` for anything that is not a valid,
    /// routable-looking IPv4 address (including `0.0.0.0`).
    pub fn parse(s: &str) -> Option<Self> {
        let ip: Ipv4Addr = s.parse().ok()?;
        if ip.is_unspecified() {
            return None;
        }
        Some(Self(ip))
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.0
    }

    /// Whether the address falls in a private or link-local range, which
    /// usually explains a failed geolocation lookup.
    pub fn is_private(&self) -> bool {
        self.0.is_private() || self.0.is_link_local() || self.0.is_loopback()
    }
}

impl fmt::Display for HopAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A line whose probes predominantly went unanswered (`* * *` markers);
/// such lines carry no hop address worth extracting.
fn is_silent_hop_line(line: &str) -> bool {
    line.matches('*').count() >= 2
}

/// Lazily extract hop addresses from raw traceroute output, in first-seen
/// order with duplicates dropped. Restartable: call again on the same text
/// for a fresh pass. Empty input yields an empty sequence.
pub fn hop_addresses(raw: &str) -> impl Iterator<Item = HopAddress> + '_ {
    let mut seen = HashSet::new();
    raw.lines()
        .filter(|line| !is_silent_hop_line(line))
        .flat_map(|line| DOTTED_QUAD.find_iter(line))
        .filter_map(|m| HopAddress::parse(m.as_str()))
        .filter(move |addr| seen.insert(*addr))
}

/// Eager form of [`hop_addresses`]
pub fn extract_hops(raw: &str) -> Vec<HopAddress> {
    hop_addresses(raw).collect()
}
