use serde::{Deserialize, Deserializer, Serialize};

use crate::geometry::Geometry;

/// The four render categories every map feature falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Span,
    Node,
    Drop,
    Zone,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Span,
        Category::Node,
        Category::Drop,
        Category::Zone,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Span => "span",
            Category::Node => "node",
            Category::Drop => "drop",
            Category::Zone => "zone",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Category::Span => "Spans",
            Category::Node => "Nodes",
            Category::Drop => "Drops",
            Category::Zone => "Zones",
        }
    }

    /// Route a feature into a render category.
    ///
    /// An explicit tag always wins. Without one, the geometry type decides:
    /// line-like geometry is a span, polygon-like a zone, and a bare point a
    /// node. Drops are *only* reachable through the explicit tag; inference
    /// cannot tell a subscriber drop from a termination node, so producers
    /// must tag drop features.
    pub fn classify(tag: Option<&str>, geometry: &Geometry) -> Category {
        match tag {
            Some("span") => Category::Span,
            Some("node") => Category::Node,
            Some("drop") => Category::Drop,
            Some("zone") => Category::Zone,
            _ => {
                if geometry.is_line_like() {
                    Category::Span
                } else if geometry.is_polygon_like() {
                    Category::Zone
                } else {
                    Category::Node
                }
            }
        }
    }
}

/// Task progress status, as carried on every feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Submitted,
    Approved,
    Billed,
    Rework,
    FailedInspection,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Status::NotStarted,
        Status::InProgress,
        Status::Submitted,
        Status::Approved,
        Status::Billed,
        Status::Rework,
        Status::FailedInspection,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Status::NotStarted => "not_started",
            Status::InProgress => "in_progress",
            Status::Submitted => "submitted",
            Status::Approved => "approved",
            Status::Billed => "billed",
            Status::Rework => "rework",
            Status::FailedInspection => "failed_inspection",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Status::NotStarted => "not started",
            Status::InProgress => "in progress",
            Status::Submitted => "submitted",
            Status::Approved => "approved",
            Status::Billed => "billed",
            Status::Rework => "rework",
            Status::FailedInspection => "failed inspection",
        }
    }

    /// Default render color for this status.
    pub const fn color(self) -> &'static str {
        match self {
            Status::NotStarted => "#94A3B8",
            Status::InProgress => "#3B82F6",
            Status::Submitted => "#F59E0B",
            Status::Approved => "#10B981",
            Status::Billed => "#8B5CF6",
            Status::Rework => "#EF4444",
            Status::FailedInspection => "#DC2626",
        }
    }

    pub fn parse(raw: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

/// Lenient status decoding: an unknown or missing status renders as the
/// default rather than poisoning the whole feature collection.
fn de_status_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Status, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(Status::parse)
        .unwrap_or_default())
}

/// Property bag carried by every map feature.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureProperties {
    /// Stable server-side identifier (survives reloads; render ids do not).
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de_status_lenient")]
    pub status: Status,
    /// Explicit category tag; absent tags fall back to geometry inference.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub planned_qty: Option<f64>,
    #[serde(default)]
    pub actual_qty: f64,
    #[serde(default)]
    pub remaining_qty: f64,
    #[serde(default)]
    pub progress_pct: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub style_color: Option<String>,
    #[serde(default)]
    pub style_width: Option<f64>,
    #[serde(default)]
    pub style_opacity: Option<f64>,
}

/// One georeferenced record from the map layer endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: FeatureProperties,
}

impl Feature {
    pub fn category(&self) -> Category {
        Category::classify(self.properties.category.as_deref(), &self.geometry)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// Parse a `#RRGGBB` color. Malformed overrides return `None` so callers can
/// fall back to the status default instead of aborting the render.
pub fn parse_hex_color(raw: &str) -> Option<(u8, u8, u8)> {
    let hex = raw.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Geometry {
        Geometry::Point {
            coordinates: [-97.74, 30.26],
        }
    }

    fn line() -> Geometry {
        Geometry::LineString {
            coordinates: vec![[-97.74, 30.26], [-97.73, 30.27]],
        }
    }

    fn polygon() -> Geometry {
        Geometry::Polygon {
            coordinates: vec![vec![
                [-97.74, 30.26],
                [-97.73, 30.26],
                [-97.73, 30.27],
                [-97.74, 30.26],
            ]],
        }
    }

    #[test]
    fn explicit_tag_wins_over_geometry() {
        assert_eq!(Category::classify(Some("drop"), &point()), Category::Drop);
        assert_eq!(Category::classify(Some("node"), &line()), Category::Node);
        assert_eq!(Category::classify(Some("zone"), &point()), Category::Zone);
    }

    #[test]
    fn untagged_features_infer_from_geometry() {
        assert_eq!(Category::classify(None, &line()), Category::Span);
        assert_eq!(Category::classify(None, &polygon()), Category::Zone);
        assert_eq!(Category::classify(None, &point()), Category::Node);
        // An unrecognized tag behaves like no tag at all.
        assert_eq!(Category::classify(Some("other"), &line()), Category::Span);
    }

    #[test]
    fn drops_are_unreachable_without_explicit_tag() {
        // A bare point can only ever infer to node; producers must tag drops.
        assert_eq!(Category::classify(None, &point()), Category::Node);
        assert_eq!(Category::classify(Some("drop"), &point()), Category::Drop);
    }

    #[test]
    fn unknown_status_decodes_to_default() {
        let json = r#"{"id":"t1","name":"Span A","status":"archived"}"#;
        let props: FeatureProperties = serde_json::from_str(json).expect("decode");
        assert_eq!(props.status, Status::NotStarted);
    }

    #[test]
    fn known_status_round_trips() {
        let json = r#"{"id":"t1","status":"failed_inspection"}"#;
        let props: FeatureProperties = serde_json::from_str(json).expect("decode");
        assert_eq!(props.status, Status::FailedInspection);
        assert_eq!(props.status.color(), "#DC2626");
    }

    #[test]
    fn feature_collection_tolerates_missing_optionals() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-97.7, 30.3]},
                "properties": {"id": "t9"}
            }]
        }"#;
        let fc: FeatureCollection = serde_json::from_str(json).expect("decode");
        assert_eq!(fc.features.len(), 1);
        assert_eq!(fc.features[0].category(), Category::Node);
        assert!(fc.features[0].properties.planned_qty.is_none());
    }

    #[test]
    fn hex_color_parsing() {
        assert_eq!(parse_hex_color("#3B82F6"), Some((0x3B, 0x82, 0xF6)));
        assert_eq!(parse_hex_color("3B82F6"), None);
        assert_eq!(parse_hex_color("#3B82"), None);
        assert_eq!(parse_hex_color("#GGGGGG"), None);
    }
}
