use anyhow::Result;
use std::io::Write;

use crate::route::Route;

/// Export the route to CSV format
pub fn export_csv<W: Write>(route: &Route, mut writer: W) -> Result<()> {
    writeln!(writer, "hop,node,city,country,latitude,longitude")?;

    for hop in &route.hops {
        let (city, country) = match &hop.geo {
            Some(geo) => (
                geo.city.clone().unwrap_or_default(),
                geo.country.clone().unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };

        writeln!(
            writer,
            "{},{},{},{},{},{}",
            hop.index,
            hop.label(),
            escape_csv(&city),
            escape_csv(&country),
            hop.coords.lat,
            hop.coords.lon
        )?;
    }

    Ok(())
}

/// Escape a string for CSV (quote if contains comma, quote, or newline)
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::geo::{GeoRecord, GeoStatus};
    use crate::route::{Coordinates, assemble};
    use crate::trace::HopAddress;
    use std::collections::HashMap;

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
    }

    #[test]
    fn test_csv_rows_in_route_order() {
        let hop = HopAddress::parse("93.184.216.34").unwrap();
        let record = GeoRecord {
            status: GeoStatus::Success,
            city: Some("Norwell".to_string()),
            region: None,
            country: Some("United States".to_string()),
            lat: Some(42.1591),
            lon: Some(-70.8163),
        };
        let results = HashMap::from([(hop, Ok(record))]);
        let route = assemble(
            "example.com",
            Coordinates { lat: 51.5, lon: -0.12 },
            &[hop],
            &results,
        );

        let mut buf = Vec::new();
        export_csv(&route, &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "hop,node,city,country,latitude,longitude");
        assert_eq!(lines[1], "0,self,,,51.5,-0.12");
        assert_eq!(lines[2], "1,93.184.216.34,Norwell,United States,42.1591,-70.8163");
    }
}
