pub mod csv;
pub mod json;
pub mod report;

pub use csv::export_csv;
pub use json::export_json;
pub use report::generate_report;
