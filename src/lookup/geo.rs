//! Hop geolocation via the ip-api.com per-IP endpoint.
//!
//! Each address gets exactly one lookup and no retries. A failed address is
//! reported as unresolved; it never aborts resolution of its siblings.

use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::ResolveMode;
use crate::route::Coordinates;
use crate::trace::HopAddress;

/// Per-lookup request timeout
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Lookup status as reported by the geolocation service. Anything other
/// than a literal "success" is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoStatus {
    Success,
    Fail,
}

impl<'de> Deserialize<'de> for GeoStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let status = String::deserialize(deserializer)?;
        Ok(if status == "success" {
            Self::Success
        } else {
            Self::Fail
        })
    }
}

/// Geolocation result for one address.
///
/// Only populated fields are trusted; coordinates are unusable unless the
/// status is `success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    pub status: GeoStatus,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, rename = "regionName")]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl GeoRecord {
    pub fn is_success(&self) -> bool {
        self.status == GeoStatus::Success
    }

    /// Usable coordinates, present only on a successful lookup
    pub fn coordinates(&self) -> Option<Coordinates> {
        if !self.is_success() {
            return None;
        }
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
            _ => None,
        }
    }

    /// "City, Region, Country" with missing pieces dropped
    pub fn place(&self) -> String {
        [&self.city, &self.region, &self.country]
            .iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Why a single lookup produced no record
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("service returned HTTP {0}")]
    BadStatus(u16),
}

pub type GeoResult = Result<GeoRecord, ResolveError>;

/// Seam for hop geolocation, so resolution modes can be exercised against
/// fixed responses without the network.
pub trait GeoProvider {
    fn locate(&self, addr: HopAddress) -> impl Future<Output = GeoResult> + Send;
}

/// Production provider backed by ip-api.com
pub struct IpApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl IpApiClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .user_agent(concat!("georoute/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: "http://ip-api.com/json".to_string(),
        })
    }

    /// Point at a different endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl GeoProvider for IpApiClient {
    fn locate(&self, addr: HopAddress) -> impl Future<Output = GeoResult> + Send {
        async move {
            let url = format!("{}/{}", self.base_url, addr);
            let response = self.client.get(&url).send().await?;

            if !response.status().is_success() {
                return Err(ResolveError::BadStatus(response.status().as_u16()));
            }

            Ok(response.json::<GeoRecord>().await?)
        }
    }
}

/// Resolve every hop address to a geolocation record or a typed failure
/// marker, in the configured mode. The returned map has one entry per input
/// address; the caller re-imposes hop order from its own sequence, never from
/// completion order.
pub async fn resolve_hops<P: GeoProvider>(
    provider: &P,
    addrs: &[HopAddress],
    mode: ResolveMode,
) -> HashMap<HopAddress, GeoResult> {
    match mode {
        ResolveMode::Sequential { delay } => resolve_sequential(provider, addrs, delay).await,
        ResolveMode::Concurrent { workers } => resolve_concurrent(provider, addrs, workers).await,
    }
}

/// One lookup at a time, sleeping the configured delay before each request.
/// Crude outbound rate limiting, but dependable against per-IP quotas.
async fn resolve_sequential<P: GeoProvider>(
    provider: &P,
    addrs: &[HopAddress],
    delay: Duration,
) -> HashMap<HopAddress, GeoResult> {
    let mut results = HashMap::with_capacity(addrs.len());

    for &addr in addrs {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let result = provider.locate(addr).await;
        log_outcome(addr, &result);
        results.insert(addr, result);
    }

    results
}

/// Fixed-width worker pool fed from a shared deque. Each worker claims an
/// address, performs one lookup, and writes exactly one entry keyed by that
/// address, so the result map sees no write contention. Completion order is
/// unconstrained. No rate limiting beyond pool width.
async fn resolve_concurrent<P: GeoProvider>(
    provider: &P,
    addrs: &[HopAddress],
    workers: usize,
) -> HashMap<HopAddress, GeoResult> {
    let width = workers.clamp(1, addrs.len().max(1));
    let queue = Mutex::new(VecDeque::from(addrs.to_vec()));
    let results = Mutex::new(HashMap::with_capacity(addrs.len()));

    let mut pool = Vec::with_capacity(width);
    for _ in 0..width {
        pool.push(async {
            loop {
                // Guard dropped before the await; locks never span a lookup
                let Some(addr) = queue.lock().pop_front() else {
                    break;
                };
                let result = provider.locate(addr).await;
                log_outcome(addr, &result);
                results.lock().insert(addr, result);
            }
        });
    }
    futures::future::join_all(pool).await;

    results.into_inner()
}

fn log_outcome(addr: HopAddress, result: &GeoResult) {
    match result {
        Ok(record) if record.is_success() => {
            debug!("{} resolved to {}", addr, record.place());
        }
        Ok(_) => {
            debug!("{} unresolved by service (likely private/filtered)", addr);
        }
        Err(e) => {
            warn!("{} lookup failed: {}", addr, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> HopAddress {
        HopAddress::parse(s).unwrap()
    }

    fn success_record(city: &str, lat: f64, lon: f64) -> GeoRecord {
        GeoRecord {
            status: GeoStatus::Success,
            city: Some(city.to_string()),
            region: Some("Massachusetts".to_string()),
            country: Some("United States".to_string()),
            lat: Some(lat),
            lon: Some(lon),
        }
    }

    struct FixedProvider {
        records: HashMap<HopAddress, GeoRecord>,
    }

    impl GeoProvider for FixedProvider {
        fn locate(&self, addr: HopAddress) -> impl Future<Output = GeoResult> + Send {
            let result = self
                .records
                .get(&addr)
                .cloned()
                .ok_or(ResolveError::BadStatus(500));
            async move { result }
        }
    }

    #[test]
    fn test_parse_ip_api_success_payload() {
        let json = r#"{
            "status": "success",
            "country": "United States",
            "regionName": "Massachusetts",
            "city": "Norwell",
            "lat": 42.1591,
            "lon": -70.8163,
            "query": "93.184.216.34"
        }"#;

        let record: GeoRecord = serde_json::from_str(json).unwrap();
        assert!(record.is_success());
        assert_eq!(record.city.as_deref(), Some("Norwell"));
        assert_eq!(record.region.as_deref(), Some("Massachusetts"));
        let coords = record.coordinates().unwrap();
        assert!((coords.lat - 42.1591).abs() < 1e-9);
    }

    #[test]
    fn test_parse_ip_api_failure_payload() {
        let json = r#"{"status": "fail", "message": "private range", "query": "10.0.0.1"}"#;

        let record: GeoRecord = serde_json::from_str(json).unwrap();
        assert!(!record.is_success());
        assert_eq!(record.coordinates(), None);
    }

    #[test]
    fn test_unknown_status_treated_as_failure() {
        let json = r#"{"status": "throttled"}"#;
        let record: GeoRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, GeoStatus::Fail);
    }

    #[test]
    fn test_coordinates_require_success_status() {
        let record = GeoRecord {
            status: GeoStatus::Fail,
            city: None,
            region: None,
            country: None,
            lat: Some(1.0),
            lon: Some(2.0),
        };
        assert_eq!(record.coordinates(), None);
    }

    #[test]
    fn test_place_drops_missing_parts() {
        let mut record = success_record("Norwell", 42.0, -70.0);
        record.region = None;
        assert_eq!(record.place(), "Norwell, United States");
    }

    #[tokio::test]
    async fn test_sequential_resolves_all_addresses() {
        let a = addr("8.8.8.8");
        let b = addr("1.1.1.1");
        let provider = FixedProvider {
            records: HashMap::from([(a, success_record("Mountain View", 37.4, -122.0))]),
        };

        let results = resolve_hops(
            &provider,
            &[a, b],
            ResolveMode::Sequential {
                delay: Duration::ZERO,
            },
        )
        .await;

        assert_eq!(results.len(), 2);
        assert!(results[&a].is_ok());
        assert!(matches!(results[&b], Err(ResolveError::BadStatus(500))));
    }

    #[tokio::test]
    async fn test_concurrent_failure_does_not_abort_siblings() {
        let good = addr("8.8.8.8");
        let bad = addr("10.0.0.1");
        let provider = FixedProvider {
            records: HashMap::from([(good, success_record("Mountain View", 37.4, -122.0))]),
        };

        let results = resolve_hops(
            &provider,
            &[bad, good],
            ResolveMode::Concurrent { workers: 2 },
        )
        .await;

        assert_eq!(results.len(), 2);
        assert!(results[&bad].is_err());
        assert!(results[&good].is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_width_larger_than_input() {
        let a = addr("8.8.8.8");
        let provider = FixedProvider {
            records: HashMap::from([(a, success_record("Mountain View", 37.4, -122.0))]),
        };

        let results =
            resolve_hops(&provider, &[a], ResolveMode::Concurrent { workers: 16 }).await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_lookups() {
        let provider = FixedProvider {
            records: HashMap::new(),
        };
        let results = resolve_hops(
            &provider,
            &[],
            ResolveMode::Sequential {
                delay: Duration::from_secs(10),
            },
        )
        .await;
        assert!(results.is_empty());
    }
}
