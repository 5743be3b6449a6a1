use fieldmap_shared::{
    BoundingBox, BulkStatusUpdate, BulkUpdateResult, FeatureCollection, NewSavedView,
    ProjectSummary, RuntimeConfig, SavedView, Status,
};

/// `west,south,east,north`, the bbox query parameter shape the map layer
/// endpoint accepts.
pub fn bbox_query(bbox: &BoundingBox) -> String {
    format!("{},{},{},{}", bbox.west, bbox.south, bbox.east, bbox.north)
}

/// Runtime configuration (basemap token). Served unauthenticated at boot.
pub async fn fetch_runtime_config() -> Result<RuntimeConfig, String> {
    let resp = gloo_net::http::Request::get("/api/config")
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<RuntimeConfig>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

/// Projects visible to the current user.
pub async fn fetch_projects() -> Result<Vec<ProjectSummary>, String> {
    let resp = gloo_net::http::Request::get("/api/projects")
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<Vec<ProjectSummary>>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

/// Project-scoped geometry, optionally filtered by status and bounded to a
/// viewport box.
pub async fn fetch_map_layer(
    project_id: &str,
    status: Option<Status>,
    bbox: Option<&BoundingBox>,
) -> Result<FeatureCollection, String> {
    let mut url = format!("/api/projects/{project_id}/map-layer");
    let mut params: Vec<String> = Vec::new();
    if let Some(status) = status {
        params.push(format!("status={}", status.as_str()));
    }
    if let Some(bbox) = bbox {
        params.push(format!("bbox={}", bbox_query(bbox)));
    }
    if !params.is_empty() {
        url.push('?');
        url.push_str(&params.join("&"));
    }

    let resp = gloo_net::http::Request::get(&url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<FeatureCollection>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

/// One batched status update for a list of feature ids.
pub async fn bulk_update_status(
    project_id: &str,
    body: &BulkStatusUpdate,
) -> Result<BulkUpdateResult, String> {
    let url = format!("/api/projects/{project_id}/features/bulk-update");
    let resp = gloo_net::http::Request::put(&url)
        .json(body)
        .map_err(|e| format!("encode error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<BulkUpdateResult>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

/// Named camera positions saved against a project.
pub async fn fetch_saved_views(project_id: &str) -> Result<Vec<SavedView>, String> {
    let url = format!("/api/projects/{project_id}/map-views");
    let resp = gloo_net::http::Request::get(&url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<Vec<SavedView>>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

pub async fn save_view(project_id: &str, view: &NewSavedView) -> Result<SavedView, String> {
    let url = format!("/api/projects/{project_id}/map-views");
    let resp = gloo_net::http::Request::post(&url)
        .json(view)
        .map_err(|e| format!("encode error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<SavedView>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

pub async fn delete_view(view_id: &str) -> Result<(), String> {
    let url = format!("/api/map-views/{view_id}");
    let resp = gloo_net::http::Request::delete(&url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    Ok(())
}
