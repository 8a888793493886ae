//! The ordered route model and its assembler.
//!
//! The assembler owns the `Route` it builds for the duration of one pipeline
//! run and hands it by value to the rendering/export collaborators. Hop
//! order always comes from the extraction sequence, never from resolution
//! completion order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::HashSet;

use crate::lookup::geo::{GeoRecord, GeoResult};
use crate::trace::HopAddress;

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Placeholder used when the caller's own location cannot be determined
pub const SENTINEL: Coordinates = Coordinates { lat: 0.0, lon: 0.0 };

/// How a hop should be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerRole {
    Start,
    Intermediate,
    End,
}

/// One element of the renderable route. Never mutated after assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteHop {
    /// Position in the renderable sequence; 0 is always the caller
    pub index: usize,
    /// `None` for the caller's own position
    pub address: Option<HopAddress>,
    pub geo: Option<GeoRecord>,
    pub coords: Coordinates,
    pub role: MarkerRole,
}

impl RouteHop {
    /// "self" for hop zero, the dotted-quad otherwise
    pub fn label(&self) -> String {
        match self.address {
            Some(addr) => addr.to_string(),
            None => "self".to_string(),
        }
    }

    pub fn city(&self) -> Option<&str> {
        self.geo.as_ref()?.city.as_deref()
    }
}

/// A hop that was attempted but could not be placed on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedHop {
    pub address: HopAddress,
    pub reason: String,
}

/// Run statistics: attempted counts every extracted hop, mapped only those
/// that made it onto the renderable sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub hops_attempted: usize,
    pub hops_mapped: usize,
    pub distinct_cities: usize,
    pub first_city: Option<String>,
    pub last_city: Option<String>,
}

/// The ordered, partially-resolved route, ready for rendering or export.
/// If non-empty, index 0 is always the caller's own location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub target: String,
    pub hops: Vec<RouteHop>,
    pub unresolved: Vec<UnresolvedHop>,
    pub summary: RouteSummary,
}

impl Route {
    /// Hops after the self entry, i.e. the mapped part of the trace
    pub fn mapped_hops(&self) -> &[RouteHop] {
        &self.hops[1..]
    }
}

/// Merge the self-location, the ordered hop list, and the resolution results
/// into a single ordered route. Hops that cannot be placed are excluded from
/// the renderable sequence but recorded as unresolved and counted in the
/// summary; they never abort assembly.
pub fn assemble(
    target: &str,
    self_coords: Coordinates,
    hops: &[HopAddress],
    results: &HashMap<HopAddress, GeoResult>,
) -> Route {
    let mut route_hops = vec![RouteHop {
        index: 0,
        address: None,
        geo: None,
        coords: self_coords,
        role: MarkerRole::Start,
    }];
    let mut unresolved = Vec::new();

    for &addr in hops {
        match results.get(&addr) {
            Some(Ok(record)) => match record.coordinates() {
                Some(coords) => route_hops.push(RouteHop {
                    index: route_hops.len(),
                    address: Some(addr),
                    geo: Some(record.clone()),
                    coords,
                    role: MarkerRole::Intermediate,
                }),
                None => unresolved.push(UnresolvedHop {
                    address: addr,
                    reason: unresolved_reason(addr),
                }),
            },
            Some(Err(e)) => unresolved.push(UnresolvedHop {
                address: addr,
                reason: format!("lookup failed: {}", e),
            }),
            None => unresolved.push(UnresolvedHop {
                address: addr,
                reason: "no resolution result".to_string(),
            }),
        }
    }

    // The last mapped hop is where the trace ended
    if route_hops.len() > 1
        && let Some(last) = route_hops.last_mut()
    {
        last.role = MarkerRole::End;
    }

    let summary = summarize(hops.len(), &route_hops);

    Route {
        target: target.to_string(),
        hops: route_hops,
        unresolved,
        summary,
    }
}

fn summarize(attempted: usize, route_hops: &[RouteHop]) -> RouteSummary {
    let mapped = &route_hops[1..];

    let cities: Vec<&str> = mapped.iter().filter_map(RouteHop::city).collect();
    let distinct: HashSet<&str> = cities.iter().copied().collect();

    RouteSummary {
        hops_attempted: attempted,
        hops_mapped: mapped.len(),
        distinct_cities: distinct.len(),
        first_city: cities.first().map(|c| c.to_string()),
        last_city: cities.last().map(|c| c.to_string()),
    }
}

fn unresolved_reason(addr: HopAddress) -> String {
    if addr.is_private() {
        format!("{} is in a private address range", addr)
    } else {
        "likely private or filtered".to_string()
    }
}
