use std::cell::RefCell;

use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::api;
use crate::app::MapState;

/// Delay between the last pan/zoom settling and the bounded refetch.
pub const RELOAD_DEBOUNCE_MS: u32 = 400;
/// Below this zoom a viewport covers too much ground to refetch usefully.
pub const MIN_RELOAD_ZOOM: f64 = 10.0;

thread_local! {
    // Single-slot scheduled task: storing a new timeout drops (and thereby
    // cancels) its predecessor, so superseded reload attempts never fire.
    static RELOAD_TIMER: RefCell<Option<Timeout>> = const { RefCell::new(None) };
}

/// Whether a settled viewport warrants a bounded reload.
pub fn should_reload(project: Option<&str>, zoom: f64) -> bool {
    project.is_some_and(|p| !p.is_empty()) && zoom > MIN_RELOAD_ZOOM
}

/// A response is applied only while its generation is still the latest
/// issued one; anything else is a stale write and must be discarded.
pub fn is_stale(issued: u64, current: u64) -> bool {
    issued != current
}

/// Restart the debounce window after a map "view settled" event.
pub fn schedule_viewport_reload(state: MapState) {
    let timeout = Timeout::new(RELOAD_DEBOUNCE_MS, move || {
        RELOAD_TIMER.with(|slot| {
            slot.borrow_mut().take();
        });
        viewport_reload(state);
    });
    RELOAD_TIMER.with(|slot| {
        *slot.borrow_mut() = Some(timeout);
    });
}

/// Cancel any pending debounce without firing it.
pub fn cancel_pending_reload() {
    RELOAD_TIMER.with(|slot| {
        slot.borrow_mut().take();
    });
}

fn viewport_reload(state: MapState) {
    let project = state.project_id.get_untracked();
    let vp = state.viewport.get_untracked();
    if !should_reload(project.as_deref(), vp.zoom()) {
        return;
    }
    let Some(project) = project else {
        return;
    };

    let (canvas_w, canvas_h) = state.canvas_size.get_untracked();
    if canvas_w <= 0.0 || canvas_h <= 0.0 {
        return;
    }
    let bbox = vp.bounds(canvas_w, canvas_h);
    let status = state.status_filter.get_untracked();

    let generation = state.reload_generation.get_untracked().wrapping_add(1);
    state.reload_generation.set(generation);

    spawn_local(async move {
        match api::fetch_map_layer(&project, status, Some(&bbox)).await {
            Ok(collection) => {
                if is_stale(generation, state.reload_generation.get_untracked()) {
                    return;
                }
                state.store.update(|store| {
                    store.merge_incremental(collection.features, bbox);
                });
            }
            Err(e) => {
                // Stale data beats no data: keep what is rendered.
                web_sys::console::warn_1(&format!("Viewport reload failed: {e}").into());
            }
        }
    });
}

/// Full (unbounded) project load: replaces all four collections, optionally
/// fitting the viewport to the loaded extent. Bumping the generation here
/// also invalidates any bounded reload still in flight.
pub fn load_project_data(state: MapState, fit: bool) {
    let Some(project) = state.project_id.get_untracked() else {
        return;
    };
    let status = state.status_filter.get_untracked();

    cancel_pending_reload();
    let generation = state.reload_generation.get_untracked().wrapping_add(1);
    state.reload_generation.set(generation);

    spawn_local(async move {
        match api::fetch_map_layer(&project, status, None).await {
            Ok(collection) => {
                if is_stale(generation, state.reload_generation.get_untracked()) {
                    return;
                }
                state.store.update(|store| {
                    store.replace_all(collection.features);
                });
                // Identifiers are reload-scoped; a full load invalidates the
                // selection and any hover emphasis with them.
                state.selection.update(|selection| selection.clear());
                state.hovered.set(None);

                if fit {
                    let bbox = state.store.with_untracked(|store| store.total_bbox());
                    if let Some(bbox) = bbox {
                        let (canvas_w, canvas_h) = state.canvas_size.get_untracked();
                        if canvas_w > 0.0 && canvas_h > 0.0 {
                            state.viewport.update(|vp| {
                                vp.fit_bounds(&bbox, canvas_w, canvas_h);
                            });
                        }
                    }
                }
            }
            Err(e) => {
                if is_stale(generation, state.reload_generation.get_untracked()) {
                    return;
                }
                web_sys::console::warn_1(&format!("Map data load failed: {e}").into());
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_requires_project_and_zoom() {
        assert!(!should_reload(None, 16.0));
        assert!(!should_reload(Some(""), 16.0));
        assert!(!should_reload(Some("p1"), 10.0));
        assert!(should_reload(Some("p1"), 10.5));
    }

    #[test]
    fn superseded_generations_are_stale() {
        let first = 7u64;
        let second = first.wrapping_add(1);
        // The older response arriving after the newer one was issued must
        // not be applied; the newest one must.
        assert!(is_stale(first, second));
        assert!(!is_stale(second, second));
    }
}
