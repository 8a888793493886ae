//! Self-location: where does the route start?
//!
//! A small ordered list of independent HTTP services is tried until one
//! yields a usable coordinate pair. Every failure is swallowed and logged;
//! when all services fail the caller seeds hop zero with the sentinel.

use anyhow::{Result, anyhow, bail};
use log::{debug, info, warn};
use serde_json::Value;
use std::time::Duration;

use crate::route::{Coordinates, SENTINEL};

/// Per-service request timeout
const SERVICE_TIMEOUT: Duration = Duration::from_secs(5);

/// The caller's approximate position, or an explicit unknown
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelfLocation {
    Known(Coordinates),
    Unknown,
}

impl SelfLocation {
    /// Coordinates for hop zero; the sentinel when nothing was found
    pub fn coordinates_or_sentinel(&self) -> Coordinates {
        match self {
            Self::Known(coords) => *coords,
            Self::Unknown => SENTINEL,
        }
    }
}

/// One capability-equivalent location service
struct Service {
    name: &'static str,
    url: &'static str,
}

/// Services in priority order. Their payload shapes differ (combined
/// `"lat,lon"` string vs. separate numeric fields); `parse_coordinates`
/// understands all of them.
const SERVICES: &[Service] = &[
    Service {
        name: "ipinfo.io",
        url: "https://ipinfo.io/json",
    },
    Service {
        name: "ipapi.co",
        url: "https://ipapi.co/json/",
    },
    Service {
        name: "ip-api.com",
        url: "http://ip-api.com/json",
    },
];

/// Best-effort locator for the caller's own coordinates
pub struct SelfLocator {
    client: reqwest::Client,
}

impl SelfLocator {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(SERVICE_TIMEOUT)
            .user_agent(concat!("georoute/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Try each service in order; first successful parse wins. No retries
    /// within a single service attempt. Fails soft to `Unknown`.
    pub async fn locate(&self) -> SelfLocation {
        for service in SERVICES {
            match self.try_service(service).await {
                Ok(coords) => {
                    info!(
                        "Location from {}: {:.4}, {:.4}",
                        service.name, coords.lat, coords.lon
                    );
                    return SelfLocation::Known(coords);
                }
                Err(e) => {
                    debug!("{} failed: {}", service.name, e);
                }
            }
        }

        warn!("Could not determine current location; falling back to sentinel coordinates");
        SelfLocation::Unknown
    }

    async fn try_service(&self, service: &Service) -> Result<Coordinates> {
        let response = self.client.get(service.url).send().await?;
        if !response.status().is_success() {
            bail!("HTTP {}", response.status());
        }

        let body: Value = response.json().await?;
        parse_coordinates(&body).ok_or_else(|| anyhow!("no usable coordinate fields"))
    }
}

/// Pull a coordinate pair out of any known self-location payload shape:
/// a combined `"lat,lon"` string (ipinfo.io `loc`), separate
/// `latitude`/`longitude` fields (ipapi.co), or `lat`/`lon` (ip-api.com).
fn parse_coordinates(body: &Value) -> Option<Coordinates> {
    if let Some(loc) = body.get("loc").and_then(Value::as_str) {
        let (lat, lon) = loc.split_once(',')?;
        return Some(Coordinates {
            lat: lat.trim().parse().ok()?,
            lon: lon.trim().parse().ok()?,
        });
    }

    let lat = pick_number(body, &["latitude", "lat"])?;
    let lon = pick_number(body, &["longitude", "lon"])?;
    Some(Coordinates { lat, lon })
}

fn pick_number(body: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| body.get(*key)?.as_f64())
}
