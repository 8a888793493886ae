pub mod geo;
pub mod selfloc;

pub use geo::{GeoProvider, GeoRecord, GeoResult, GeoStatus, IpApiClient, ResolveError, resolve_hops};
pub use selfloc::{SelfLocation, SelfLocator};
