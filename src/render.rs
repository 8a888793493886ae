//! Leaflet map rendering.
//!
//! Produces a single self-contained HTML artifact (tiles and the Leaflet
//! library come from CDNs at view time). The renderer only consumes the
//! route's coordinate/label/role triples; it never reaches back into the
//! pipeline.

use serde::Serialize;

use crate::route::{MarkerRole, Route, RouteHop};

/// Marker payload handed to the Leaflet script
#[derive(Serialize)]
struct MapMarker {
    lat: f64,
    lon: f64,
    color: &'static str,
    label: String,
    popup: String,
}

fn marker_color(role: MarkerRole) -> &'static str {
    match role {
        MarkerRole::Start => "#d83b3b",
        MarkerRole::Intermediate => "#3b6fd8",
        MarkerRole::End => "#2e9e4f",
    }
}

fn popup_html(hop: &RouteHop) -> String {
    let place = hop
        .geo
        .as_ref()
        .map(|g| g.place())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "Your location".to_string());

    format!(
        "<b>Hop {}</b><br><b>Node:</b> {}<br><b>Place:</b> {}<br><b>Coordinates:</b> {:.4}, {:.4}",
        hop.index,
        hop.label(),
        place,
        hop.coords.lat,
        hop.coords.lon
    )
}

/// Render the route as an interactive HTML map
pub fn render_map(route: &Route) -> String {
    let markers: Vec<MapMarker> = route
        .hops
        .iter()
        .map(|hop| MapMarker {
            lat: hop.coords.lat,
            lon: hop.coords.lon,
            color: marker_color(hop.role),
            label: format!("Hop {}: {}", hop.index, hop.label()),
            popup: popup_html(hop),
        })
        .collect();

    // Keep embedded strings from terminating the inline script tag
    let markers_json = serde_json::to_string(&markers)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/");

    let center = route
        .hops
        .first()
        .map(|h| (h.coords.lat, h.coords.lon))
        .unwrap_or((0.0, 0.0));

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Network route to {target}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
  html, body, #map {{ height: 100%; margin: 0; }}
  .legend {{
    position: absolute; bottom: 24px; left: 24px; z-index: 1000;
    background: rgba(255, 255, 255, 0.95); border: 1px solid #999;
    border-radius: 8px; padding: 12px 16px; font: 12px sans-serif;
  }}
  .legend .dot {{
    display: inline-block; width: 12px; height: 12px;
    border-radius: 50%; margin-right: 8px;
  }}
</style>
</head>
<body>
<div id="map"></div>
<div class="legend">
  <div style="font-weight: bold; margin-bottom: 6px;">Network route to {target}</div>
  <div><span class="dot" style="background: #d83b3b;"></span>Start (your location)</div>
  <div><span class="dot" style="background: #3b6fd8;"></span>Intermediate hop</div>
  <div><span class="dot" style="background: #2e9e4f;"></span>Destination</div>
  <div style="margin-top: 6px; color: #666;">{mapped} of {attempted} hops mapped &middot; dashed line is approximate</div>
</div>
<script>
var markers = {markers_json};
var map = L.map('map').setView([{center_lat}, {center_lon}], 2);
L.tileLayer('https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
  attribution: '&copy; OpenStreetMap contributors'
}}).addTo(map);

var points = [];
markers.forEach(function (m) {{
  points.push([m.lat, m.lon]);
  L.circleMarker([m.lat, m.lon], {{
    radius: 7, color: m.color, fillColor: m.color, fillOpacity: 0.85
  }}).bindPopup(m.popup).bindTooltip(m.label).addTo(map);
}});

if (points.length > 1) {{
  L.polyline(points, {{
    color: '#3b6fd8', weight: 3, opacity: 0.8, dashArray: '10, 5'
  }}).addTo(map);
  map.fitBounds(points, {{ padding: [40, 40] }});
}}
</script>
</body>
</html>
"#,
        target = route.target,
        mapped = route.summary.hops_mapped,
        attempted = route.summary.hops_attempted,
        markers_json = markers_json,
        center_lat = center.0,
        center_lon = center.1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::geo::{GeoRecord, GeoStatus};
    use crate::route::{Coordinates, assemble};
    use crate::trace::HopAddress;
    use std::collections::HashMap;

    fn sample_route() -> Route {
        let hop = HopAddress::parse("93.184.216.34").unwrap();
        let record = GeoRecord {
            status: GeoStatus::Success,
            city: Some("Norwell".to_string()),
            region: Some("Massachusetts".to_string()),
            country: Some("United States".to_string()),
            lat: Some(42.1591),
            lon: Some(-70.8163),
        };
        let results = HashMap::from([(hop, Ok(record))]);
        assemble(
            "example.com",
            Coordinates {
                lat: 51.5,
                lon: -0.12,
            },
            &[hop],
            &results,
        )
    }

    #[test]
    fn test_map_contains_markers_and_route_line() {
        let html = render_map(&sample_route());

        assert!(html.contains("leaflet"));
        assert!(html.contains("93.184.216.34"));
        assert!(html.contains("Norwell"));
        assert!(html.contains("dashArray"));
        // Start and end colors both present
        assert!(html.contains("#d83b3b"));
        assert!(html.contains("#2e9e4f"));
    }

    #[test]
    fn test_map_centers_on_self_location() {
        let html = render_map(&sample_route());
        assert!(html.contains("setView([51.5, -0.12]"));
    }

    #[test]
    fn test_embedded_json_cannot_break_out_of_script() {
        let mut route = sample_route();
        route.hops[1].geo.as_mut().unwrap().city = Some("</script><b>x".to_string());
        let html = render_map(&route);
        assert!(!html.contains("</script><b>x"));
    }
}
