use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feature::Status;

/// Request body for the batched status update endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkStatusUpdate {
    pub feature_ids: Vec<String>,
    pub status: Status,
}

/// Response: how many records the bulk update touched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdateResult {
    pub updated: u32,
}

/// One project visible to the current user, as listed by the projects endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// A named camera position saved against a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedView {
    pub id: String,
    pub name: String,
    pub center_lng: f64,
    pub center_lat: f64,
    pub zoom: f64,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for saving the current camera as a named view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSavedView {
    pub name: String,
    pub center_lng: f64,
    pub center_lat: f64,
    pub zoom: f64,
    pub is_default: bool,
}

/// Runtime configuration handed to the client at boot. An empty basemap
/// token disables basemap tiles; vector layers still render.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub basemap_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_update_serializes_snake_case_status() {
        let body = BulkStatusUpdate {
            feature_ids: vec!["a".into(), "b".into()],
            status: Status::InProgress,
        };
        let json = serde_json::to_string(&body).expect("encode");
        assert!(json.contains(r#""status":"in_progress""#));
    }

    #[test]
    fn runtime_config_defaults_to_no_token() {
        let config: RuntimeConfig = serde_json::from_str("{}").expect("decode");
        assert!(config.basemap_token.is_empty());
    }
}
