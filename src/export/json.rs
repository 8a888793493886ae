use anyhow::Result;
use std::io::Write;

use crate::route::Route;

/// Export the route (hops, unresolved list, and summary) as pretty JSON
pub fn export_json<W: Write>(route: &Route, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, route)?;
    writeln!(writer)?;
    Ok(())
}
