use chrono::Utc;
use std::io::Write;

use crate::route::Route;

/// Generate a plain text report of the route and its summary
pub fn generate_report<W: Write>(route: &Route, mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "georoute report for {}", route.target)?;
    writeln!(
        writer,
        "Generated: {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(writer)?;

    writeln!(
        writer,
        "{:>3}  {:<18} {:<40} {:>10} {:>11}",
        "#", "Node", "Place", "Lat", "Lon"
    )?;
    writeln!(writer, "{}", "-".repeat(88))?;

    for hop in &route.hops {
        let place = hop
            .geo
            .as_ref()
            .map(|g| g.place())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "Your location".to_string());

        writeln!(
            writer,
            "{:>3}  {:<18} {:<40} {:>10.4} {:>11.4}",
            hop.index,
            hop.label(),
            place,
            hop.coords.lat,
            hop.coords.lon
        )?;
    }

    if !route.unresolved.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Unresolved hops:")?;
        for hop in &route.unresolved {
            writeln!(writer, "  {:<18} {}", hop.address, hop.reason)?;
        }
    }

    writeln!(writer)?;
    writeln!(writer, "Hops attempted: {}", route.summary.hops_attempted)?;
    writeln!(writer, "Hops mapped:    {}", route.summary.hops_mapped)?;
    writeln!(writer, "Cities visited: {}", route.summary.distinct_cities)?;
    if let Some(ref city) = route.summary.last_city {
        writeln!(writer, "Final mapped location: {}", city)?;
    }

    Ok(())
}
