use std::cell::RefCell;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use fieldmap_shared::{Category, LngLat, ProjectSummary, SavedView, Status};

use crate::api;
use crate::basemap::BasemapStyle;
use crate::canvas::MapCanvas;
use crate::controls::MapControls;
use crate::draw;
use crate::fmt::format_qty;
use crate::hover::{self, HoverTarget};
use crate::layers::LayerSettings;
use crate::measure::MeasureSession;
use crate::modes::{self, InteractionMode};
use crate::reload;
use crate::selection::SelectionSet;
use crate::store::{LayerStore, RenderFeature};
use crate::viewport::Viewport;

/// Marker dropped by the locate-me control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocateMarker {
    pub position: LngLat,
    pub accuracy_m: f64,
}

/// Snapshot of one feature's properties for the detail panel. Holds no
/// render id, so it stays valid across reloads.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDetail {
    pub key: String,
    pub name: String,
    pub category: Category,
    pub status: Status,
    pub planned_qty: Option<f64>,
    pub actual_qty: f64,
    pub remaining_qty: f64,
    pub progress_pct: f64,
    pub unit: Option<String>,
    pub description: Option<String>,
}

impl FeatureDetail {
    pub fn from_feature(feature: &RenderFeature) -> Self {
        let p = &feature.properties;
        Self {
            key: feature.key.clone(),
            name: p.name.clone(),
            category: feature.category,
            status: p.status,
            planned_qty: p.planned_qty,
            actual_qty: p.actual_qty,
            remaining_qty: p.remaining_qty,
            progress_pct: p.progress_pct,
            unit: p.unit.clone(),
            description: p.description.clone(),
        }
    }
}

/// The application state object: every page-wide piece of map state as one
/// struct of copyable signals, provided once through context. Components
/// mutate it only through `RwSignal::update`, so no reader ever observes a
/// half-applied change.
#[derive(Clone, Copy)]
pub struct MapState {
    pub store: RwSignal<LayerStore>,
    pub viewport: RwSignal<Viewport>,
    pub mode: RwSignal<InteractionMode>,
    pub hovered: RwSignal<Option<HoverTarget>>,
    pub selection: RwSignal<SelectionSet>,
    pub measure: RwSignal<MeasureSession>,
    pub layer_settings: RwSignal<LayerSettings>,
    pub projects: RwSignal<Vec<ProjectSummary>>,
    pub project_id: RwSignal<Option<String>>,
    pub status_filter: RwSignal<Option<Status>>,
    pub basemap_style: RwSignal<BasemapStyle>,
    /// `None` until runtime config arrives; an empty token disables tiles.
    pub basemap_token: RwSignal<Option<String>>,
    /// Bumped by the tile cache to invalidate the canvas.
    pub tiles_generation: RwSignal<u64>,
    pub mouse_pos: RwSignal<(f64, f64)>,
    pub canvas_size: RwSignal<(f64, f64)>,
    /// Shared measurement/draw result banner.
    pub banner: RwSignal<Option<String>>,
    pub bulk_status: RwSignal<Option<Status>>,
    pub bulk_message: RwSignal<Option<String>>,
    pub detail: RwSignal<Option<FeatureDetail>>,
    pub locate: RwSignal<Option<LocateMarker>>,
    pub saved_views: RwSignal<Vec<SavedView>>,
    /// Monotonic token guarding reload responses against stale writes.
    pub reload_generation: RwSignal<u64>,
    /// Bumped by the draw tool to invalidate the canvas overlay.
    pub draw_generation: RwSignal<u64>,
}

impl MapState {
    fn new(settings: LayerSettings, basemap_style: BasemapStyle) -> Self {
        let mut store = LayerStore::new();
        store.attach_all();
        Self {
            store: RwSignal::new(store),
            viewport: RwSignal::new(Viewport::default()),
            mode: RwSignal::new(InteractionMode::Browse),
            hovered: RwSignal::new(None),
            selection: RwSignal::new(SelectionSet::new()),
            measure: RwSignal::new(MeasureSession::new()),
            layer_settings: RwSignal::new(settings),
            projects: RwSignal::new(Vec::new()),
            project_id: RwSignal::new(None),
            status_filter: RwSignal::new(None),
            basemap_style: RwSignal::new(basemap_style),
            basemap_token: RwSignal::new(None),
            tiles_generation: RwSignal::new(0),
            mouse_pos: RwSignal::new((0.0, 0.0)),
            canvas_size: RwSignal::new((0.0, 0.0)),
            banner: RwSignal::new(None),
            bulk_status: RwSignal::new(None),
            bulk_message: RwSignal::new(None),
            detail: RwSignal::new(None),
            locate: RwSignal::new(None),
            saved_views: RwSignal::new(Vec::new()),
            reload_generation: RwSignal::new(0),
            draw_generation: RwSignal::new(0),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Default)]
#[serde(default)]
struct Settings {
    layers: LayerSettings,
    basemap_style: BasemapStyle,
}

struct KeydownBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
}

use gloo_storage::Storage;

const SETTINGS_KEY: &str = "fieldmap_settings";

/// Root application component. Provides the map state via context.
#[component]
pub fn App() -> impl IntoView {
    let saved: Settings = gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default();
    let state = MapState::new(saved.layers, saved.basemap_style);
    provide_context(state);

    // Persist render settings on any change.
    Effect::new(move || {
        let settings = Settings {
            layers: state.layer_settings.get(),
            basemap_style: state.basemap_style.get(),
        };
        let _ = gloo_storage::LocalStorage::set(SETTINGS_KEY, &settings);
    });

    // Runtime config: basemap token. Absence disables tiles, not the map.
    Effect::new(move || {
        spawn_local(async move {
            match api::fetch_runtime_config().await {
                Ok(config) => state.basemap_token.set(Some(config.basemap_token)),
                Err(e) => {
                    web_sys::console::warn_1(
                        &format!("Config fetch failed, basemap disabled: {e}").into(),
                    );
                }
            }
        });
    });

    // Project list; a single project auto-selects and loads.
    Effect::new(move || {
        spawn_local(async move {
            match api::fetch_projects().await {
                Ok(projects) => {
                    if projects.len() == 1 {
                        state.project_id.set(Some(projects[0].id.clone()));
                        reload::load_project_data(state, true);
                    }
                    state.projects.set(projects);
                }
                Err(e) => {
                    web_sys::console::warn_1(&format!("Projects fetch failed: {e}").into());
                }
            }
        });
    });

    // Global keyboard shortcuts.
    Effect::new(move || {
        use wasm_bindgen::prelude::*;

        let Some(window) = web_sys::window() else {
            return;
        };

        KEYDOWN_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "keydown",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler =
            Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
                let target_tag = e
                    .target()
                    .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    .map(|el| el.tag_name())
                    .unwrap_or_default();
                if target_tag == "INPUT" || target_tag == "TEXTAREA" || target_tag == "SELECT" {
                    return;
                }

                match e.key().as_str() {
                    "Escape" => {
                        if state.mode.get_untracked() != InteractionMode::Browse {
                            modes::toggle_mode(state, state.mode.get_untracked());
                        } else {
                            state.detail.set(None);
                        }
                    }
                    "m" => modes::toggle_mode(state, InteractionMode::Measure),
                    "d" => modes::toggle_mode(state, InteractionMode::Draw),
                    "s" => modes::toggle_mode(state, InteractionMode::BulkSelect),
                    "l" => {
                        state
                            .layer_settings
                            .update(|s| s.labels_visible = !s.labels_visible);
                    }
                    "+" | "=" => {
                        e.prevent_default();
                        let (cw, ch) = state.canvas_size.get_untracked();
                        state.viewport.update(|vp| vp.zoom_at(-120.0, cw / 2.0, ch / 2.0));
                    }
                    "-" => {
                        e.prevent_default();
                        let (cw, ch) = state.canvas_size.get_untracked();
                        state.viewport.update(|vp| vp.zoom_at(120.0, cw / 2.0, ch / 2.0));
                    }
                    "0" => {
                        let bbox = state.store.with_untracked(|store| store.total_bbox());
                        if let Some(bbox) = bbox {
                            let (cw, ch) = state.canvas_size.get_untracked();
                            state.viewport.update(|vp| vp.fit_bounds(&bbox, cw, ch));
                        }
                    }
                    _ => {}
                }
            });

        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    view! {
        <div style="width: 100%; height: 100%; position: relative; overflow: hidden; background: #0f172a;">
            <MapCanvas />
            <MapControls />
            <ResultBanner />
            <DetailPanel />
        </div>
        <HoverPopup />
    }
}

/// Shared banner for measurement and drawn-shape results.
#[component]
fn ResultBanner() -> impl IntoView {
    let state: MapState = expect_context();

    view! {
        {move || {
            state.banner.get().map(|text| {
                view! {
                    <div style="position: absolute; top: 56px; left: 50%; transform: translateX(-50%); \
                        z-index: 12; display: flex; align-items: center; gap: 10px; background: #1e293b; \
                        border: 1px solid #334155; border-radius: 8px; padding: 7px 12px; color: #e2e8f0; \
                        font-size: 0.8rem; box-shadow: 0 8px 24px rgba(0,0,0,0.45);">
                        <span>{text}</span>
                        <button
                            style="background: none; border: none; color: #94a3b8; cursor: pointer; font-size: 0.78rem;"
                            on:click=move |_| {
                                match state.mode.get_untracked() {
                                    InteractionMode::Measure => {
                                        state.measure.update(|session| session.clear());
                                        state.banner.set(None);
                                    }
                                    InteractionMode::Draw => draw::delete_all(state),
                                    _ => state.banner.set(None),
                                }
                            }
                        >
                            "Clear"
                        </button>
                    </div>
                }
            })
        }}
    }
}

/// Floating popup following the pointer over an interactive feature.
#[component]
fn HoverPopup() -> impl IntoView {
    let state: MapState = expect_context();

    let info = Memo::new(move |_| {
        let target = state.hovered.get()?;
        state.store.with(|store| {
            store
                .find(target.category, target.render_id)
                .map(FeatureDetail::from_feature)
        })
    });

    view! {
        {move || {
            let Some(detail) = info.get() else {
                return view! { <div style="display:none;" /> }.into_any();
            };
            let (mx, my) = state.mouse_pos.get();
            let viewport_w = web_sys::window()
                .and_then(|w| w.inner_width().ok())
                .and_then(|v| v.as_f64())
                .unwrap_or(1200.0);
            let (x, y) = hover::popup_position(mx, my, viewport_w);
            let planned = detail
                .planned_qty
                .map(|q| format_qty(q, detail.unit.as_deref()))
                .unwrap_or_else(|| "N/A".into());

            view! {
                <div style=format!(
                    "position: fixed; left: {x}px; top: {y}px; pointer-events: none; z-index: 100; \
                    background: #1e293b; border: 1px solid #334155; border-radius: 8px; \
                    padding: 8px 10px; max-width: 220px; color: #e2e8f0; font-size: 0.74rem; \
                    box-shadow: 0 6px 18px rgba(0,0,0,0.5);"
                )>
                    <div style="font-weight: 600; font-size: 0.8rem; margin-bottom: 4px;">
                        {detail.name.clone()}
                    </div>
                    <div style="display: flex; align-items: center; gap: 6px; color: #94a3b8;">
                        <span style=format!(
                            "width: 8px; height: 8px; border-radius: 50%; background: {};",
                            detail.status.color()
                        ) />
                        {detail.status.label()}
                    </div>
                    <div style="display: flex; justify-content: space-between; gap: 10px; margin-top: 3px;">
                        <span style="color: #94a3b8;">"Planned"</span>
                        <span>{planned}</span>
                    </div>
                    <div style="display: flex; justify-content: space-between; gap: 10px;">
                        <span style="color: #94a3b8;">"Completed"</span>
                        <span>{format_qty(detail.actual_qty, detail.unit.as_deref())}</span>
                    </div>
                    <div style="display: flex; justify-content: space-between; gap: 10px;">
                        <span style="color: #94a3b8;">"Remaining"</span>
                        <span>{format_qty(detail.remaining_qty, detail.unit.as_deref())}</span>
                    </div>
                    <div style="height: 4px; background: rgba(255,255,255,0.08); border-radius: 2px; margin-top: 5px; overflow: hidden;">
                        <div style=format!(
                            "height: 100%; width: {:.0}%; background: {}; border-radius: 2px;",
                            detail.progress_pct.clamp(0.0, 100.0),
                            detail.status.color()
                        ) />
                    </div>
                </div>
            }
            .into_any()
        }}
    }
}

/// Compact feature panel opened by a Browse-mode click.
#[component]
fn DetailPanel() -> impl IntoView {
    let state: MapState = expect_context();

    let row = |label: &'static str, value: String| {
        view! {
            <div style="display: flex; justify-content: space-between; gap: 10px; padding: 3px 0; border-bottom: 1px solid rgba(51,65,85,0.5);">
                <span style="color: #94a3b8;">{label}</span>
                <span>{value}</span>
            </div>
        }
    };

    view! {
        {move || {
            state.detail.get().map(|detail| {
                let unit = detail.unit.as_deref();
                view! {
                    <div style="position: absolute; top: 56px; right: 12px; bottom: 14px; z-index: 11; \
                        width: 280px; overflow-y: auto; background: #1e293b; border: 1px solid #334155; \
                        border-radius: 8px; padding: 14px; color: #e2e8f0; font-size: 0.8rem; \
                        box-shadow: 0 8px 24px rgba(0,0,0,0.45);">
                        <div style="display: flex; justify-content: space-between; align-items: center; margin-bottom: 8px;">
                            <div style="font-weight: 600; font-size: 0.92rem;">{detail.name.clone()}</div>
                            <button
                                style="background: none; border: none; color: #94a3b8; cursor: pointer; font-size: 1rem;"
                                on:click=move |_| state.detail.set(None)
                            >
                                "\u{00D7}"
                            </button>
                        </div>
                        <div style="display: flex; align-items: center; gap: 8px; margin-bottom: 10px;">
                            <span style=format!(
                                "background: {}; color: #0f172a; border-radius: 10px; padding: 2px 8px; \
                                font-size: 0.7rem; font-weight: 600;",
                                detail.status.color()
                            )>
                                {detail.status.label()}
                            </span>
                            <span style="color: #64748b; font-size: 0.72rem;">{detail.category.as_str()}</span>
                        </div>
                        {row(
                            "Planned",
                            detail
                                .planned_qty
                                .map(|q| format_qty(q, unit))
                                .unwrap_or_else(|| "N/A".into()),
                        )}
                        {row("Actual", format_qty(detail.actual_qty, unit))}
                        {row("Remaining", format_qty(detail.remaining_qty, unit))}
                        <div style="margin-top: 10px;">
                            <div style="height: 6px; background: rgba(255,255,255,0.08); border-radius: 3px; overflow: hidden;">
                                <div style=format!(
                                    "height: 100%; width: {:.0}%; background: {};",
                                    detail.progress_pct.clamp(0.0, 100.0),
                                    detail.status.color()
                                ) />
                            </div>
                            <div style="color: #94a3b8; font-size: 0.72rem; margin-top: 3px;">
                                {format!("{:.0}% complete", detail.progress_pct)}
                            </div>
                        </div>
                        {detail.description.clone().map(|text| {
                            view! {
                                <div style="margin-top: 10px; color: #cbd5e1; font-size: 0.76rem;">{text}</div>
                            }
                        })}
                    </div>
                }
            })
        }}
    }
}
