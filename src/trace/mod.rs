pub mod extract;
pub mod invoke;

pub use extract::{HopAddress, extract_hops, hop_addresses};
pub use invoke::TraceInvoker;
