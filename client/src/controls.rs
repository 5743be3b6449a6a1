use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use fieldmap_shared::{Category, LngLat, Status};

use crate::api;
use crate::app::{LocateMarker, MapState};
use crate::basemap::{self, BasemapStyle};
use crate::draw::{self, DrawShape};
use crate::modes::{self, InteractionMode};
use crate::reload;
use crate::selection;

const PANEL_STYLE: &str = "position: absolute; top: 56px; right: 12px; z-index: 10; \
    background: #1e293b; border: 1px solid #334155; border-radius: 8px; padding: 12px; \
    width: 230px; color: #e2e8f0; font-size: 0.8rem; box-shadow: 0 8px 24px rgba(0,0,0,0.45);";

const BTN_STYLE: &str = "background: #1e293b; border: 1px solid #334155; color: #cbd5e1; \
    border-radius: 6px; padding: 5px 10px; font-size: 0.78rem; cursor: pointer;";

const BTN_ACTIVE_STYLE: &str = "background: #2563eb; border: 1px solid #3b82f6; color: #ffffff; \
    border-radius: 6px; padding: 5px 10px; font-size: 0.78rem; cursor: pointer;";

const SELECT_STYLE: &str = "background: #0f172a; border: 1px solid #334155; color: #e2e8f0; \
    border-radius: 6px; padding: 4px 8px; font-size: 0.78rem;";

/// Toolbar, layer panel, legend, saved views, and the bulk action bar.
#[component]
pub fn MapControls() -> impl IntoView {
    let state: MapState = expect_context();

    let layer_panel_open = RwSignal::new(false);
    let views_panel_open = RwSignal::new(false);

    view! {
        <Toolbar layer_panel_open=layer_panel_open views_panel_open=views_panel_open />
        {move || layer_panel_open.get().then(|| view! { <LayerPanel /> })}
        {move || views_panel_open.get().then(|| view! { <SavedViewsPanel /> })}
        {move || {
            (state.mode.get() == InteractionMode::Draw).then(|| view! { <DrawToolbar /> })
        }}
        <Legend />
        <BulkBar />
    }
}

#[component]
fn Toolbar(layer_panel_open: RwSignal<bool>, views_panel_open: RwSignal<bool>) -> impl IntoView {
    let state: MapState = expect_context();

    let mode_button = move |mode: InteractionMode| {
        view! {
            <button
                style=move || {
                    if state.mode.get() == mode { BTN_ACTIVE_STYLE } else { BTN_STYLE }
                }
                on:click=move |_| modes::toggle_mode(state, mode)
            >
                {mode.label()}
            </button>
        }
    };

    view! {
        <div style="position: absolute; top: 12px; left: 12px; right: 12px; z-index: 10; \
            display: flex; align-items: center; gap: 8px; flex-wrap: wrap; pointer-events: none;">
            <div style="display: flex; gap: 8px; align-items: center; pointer-events: auto;">
                <select
                    style=SELECT_STYLE
                    on:change=move |ev| {
                        let value = event_target_value(&ev);
                        state.project_id.set((!value.is_empty()).then_some(value));
                        state.saved_views.set(Vec::new());
                        if state.project_id.with_untracked(Option::is_some) {
                            reload::load_project_data(state, true);
                            refresh_saved_views(state);
                        }
                    }
                >
                    <option value="">"Select Project"</option>
                    {move || {
                        state
                            .projects
                            .get()
                            .into_iter()
                            .map(|p| {
                                let selected =
                                    state.project_id.get().as_deref() == Some(p.id.as_str());
                                view! {
                                    <option value=p.id.clone() selected=selected>{p.name.clone()}</option>
                                }
                            })
                            .collect_view()
                    }}
                </select>
                <select
                    style=SELECT_STYLE
                    on:change=move |ev| {
                        let value = event_target_value(&ev);
                        state.status_filter.set(Status::parse(&value));
                        if state.project_id.with_untracked(Option::is_some) {
                            reload::load_project_data(state, false);
                        }
                    }
                >
                    <option value="">"All Statuses"</option>
                    {Status::ALL
                        .into_iter()
                        .map(|s| view! { <option value=s.as_str()>{s.label()}</option> })
                        .collect_view()}
                </select>
            </div>
            <div style="display: flex; gap: 6px; align-items: center; pointer-events: auto; margin-left: auto;">
                <button
                    style=BTN_STYLE
                    title="Zoom in"
                    on:click=move |_| {
                        let (cw, ch) = state.canvas_size.get_untracked();
                        state.viewport.update(|vp| vp.zoom_at(-120.0, cw / 2.0, ch / 2.0));
                    }
                >
                    "+"
                </button>
                <button
                    style=BTN_STYLE
                    title="Zoom out"
                    on:click=move |_| {
                        let (cw, ch) = state.canvas_size.get_untracked();
                        state.viewport.update(|vp| vp.zoom_at(120.0, cw / 2.0, ch / 2.0));
                    }
                >
                    "\u{2212}"
                </button>
                {mode_button(InteractionMode::Measure)}
                {mode_button(InteractionMode::Draw)}
                {mode_button(InteractionMode::BulkSelect)}
                <button style=BTN_STYLE title="Go to my location" on:click=move |_| locate_me(state)>
                    "Locate"
                </button>
                <select
                    style=SELECT_STYLE
                    on:change=move |ev| {
                        let value = event_target_value(&ev);
                        let style = BasemapStyle::ALL
                            .into_iter()
                            .find(|s| s.label() == value)
                            .unwrap_or_default();
                        basemap::switch_style(state, style);
                    }
                >
                    {BasemapStyle::ALL
                        .into_iter()
                        .map(|s| {
                            let selected = move || state.basemap_style.get() == s;
                            view! { <option value=s.label() selected=selected>{s.label()}</option> }
                        })
                        .collect_view()}
                </select>
                <button
                    style=BTN_STYLE
                    on:click=move |_| {
                        views_panel_open.set(false);
                        layer_panel_open.update(|v| *v = !*v);
                    }
                >
                    "Layers"
                </button>
                <button
                    style=BTN_STYLE
                    on:click=move |_| {
                        layer_panel_open.set(false);
                        views_panel_open.update(|v| *v = !*v);
                        if views_panel_open.get_untracked() {
                            refresh_saved_views(state);
                        }
                    }
                >
                    "Views"
                </button>
            </div>
        </div>
    }
}

#[component]
fn LayerPanel() -> impl IntoView {
    let state: MapState = expect_context();

    let category_row = move |category: Category| {
        view! {
            <div style="display: flex; flex-direction: column; gap: 3px; margin-bottom: 8px;">
                <label style="display: flex; align-items: center; gap: 6px;">
                    <input
                        type="checkbox"
                        prop:checked=move || state.layer_settings.get().is_visible(category)
                        on:change=move |ev| {
                            let checked = event_target_checked(&ev);
                            state.layer_settings.update(|s| s.set_visible(category, checked));
                        }
                    />
                    {category.label()}
                </label>
                <input
                    type="range"
                    min="0"
                    max="100"
                    prop:value=move || {
                        format!("{:.0}", state.layer_settings.get().opacity(category) * 100.0)
                    }
                    on:input=move |ev| {
                        let raw = event_target_value(&ev).parse::<f64>().unwrap_or(100.0);
                        state.layer_settings.update(|s| s.set_opacity(category, raw / 100.0));
                    }
                />
            </div>
        }
    };

    view! {
        <div style=PANEL_STYLE>
            <div style="font-weight: 600; margin-bottom: 8px;">"Layers"</div>
            {Category::ALL.into_iter().map(category_row).collect_view()}
            <div style="border-top: 1px solid #334155; padding-top: 8px; margin-top: 4px;">
                <label style="display: block; margin-bottom: 3px;">
                    "Span width: "
                    {move || format!("{:.0} px", state.layer_settings.get().span_width)}
                </label>
                <input
                    type="range"
                    min="1"
                    max="12"
                    prop:value=move || format!("{:.0}", state.layer_settings.get().span_width)
                    on:input=move |ev| {
                        let raw = event_target_value(&ev).parse::<f64>().unwrap_or(4.0);
                        state.layer_settings.update(|s| s.span_width = raw.clamp(1.0, 12.0));
                    }
                />
                <label style="display: flex; align-items: center; gap: 6px; margin-top: 8px;">
                    <input
                        type="checkbox"
                        prop:checked=move || state.layer_settings.get().labels_visible
                        on:change=move |ev| {
                            let checked = event_target_checked(&ev);
                            state.layer_settings.update(|s| s.labels_visible = checked);
                        }
                    />
                    "Labels"
                </label>
            </div>
        </div>
    }
}

#[component]
fn Legend() -> impl IntoView {
    let state: MapState = expect_context();

    view! {
        <div style="position: absolute; bottom: 14px; left: 12px; z-index: 9; background: rgba(30,41,59,0.92); \
            border: 1px solid #334155; border-radius: 8px; padding: 8px 12px; color: #cbd5e1; font-size: 0.72rem;">
            {move || {
                let counts = state.store.with(|store| store.status_counts());
                if counts.is_empty() {
                    view! { <div style="color: #64748b;">"No features loaded"</div> }.into_any()
                } else {
                    counts
                        .into_iter()
                        .map(|(status, count)| {
                            view! {
                                <div style="display: flex; align-items: center; gap: 6px; padding: 1px 0;">
                                    <span style=format!(
                                        "width: 9px; height: 9px; border-radius: 50%; background: {};",
                                        status.color()
                                    ) />
                                    <span>{format!("{} ({count})", status.label())}</span>
                                </div>
                            }
                        })
                        .collect_view()
                        .into_any()
                }
            }}
        </div>
    }
}

#[component]
fn DrawToolbar() -> impl IntoView {
    let state: MapState = expect_context();
    let shape = RwSignal::new(draw::active_shape());

    let shape_button = move |s: DrawShape| {
        view! {
            <button
                style=move || if shape.get() == s { BTN_ACTIVE_STYLE } else { BTN_STYLE }
                on:click=move |_| {
                    draw::set_shape(s);
                    shape.set(s);
                    state.draw_generation.update(|g| *g = g.wrapping_add(1));
                }
            >
                {s.label()}
            </button>
        }
    };

    view! {
        <div style="position: absolute; top: 56px; left: 12px; z-index: 10; display: flex; gap: 6px; \
            background: #1e293b; border: 1px solid #334155; border-radius: 8px; padding: 8px;">
            {DrawShape::ALL.into_iter().map(shape_button).collect_view()}
            <button style=BTN_STYLE title="Delete drawn shapes" on:click=move |_| draw::delete_all(state)>
                "Trash"
            </button>
        </div>
    }
}

#[component]
fn BulkBar() -> impl IntoView {
    let state: MapState = expect_context();

    view! {
        {move || {
            let active = state.mode.get() == InteractionMode::BulkSelect;
            let count = state.selection.with(|s| s.len());
            (active || count > 0).then(|| {
                view! {
                    <div style="position: absolute; bottom: 14px; left: 50%; transform: translateX(-50%); \
                        z-index: 11; display: flex; align-items: center; gap: 10px; background: #1e293b; \
                        border: 1px solid #334155; border-radius: 8px; padding: 8px 14px; color: #e2e8f0; \
                        font-size: 0.8rem; box-shadow: 0 8px 24px rgba(0,0,0,0.45);">
                        <span>
                            {format!("{count} feature{} selected", if count == 1 { "" } else { "s" })}
                        </span>
                        <select
                            style=SELECT_STYLE
                            on:change=move |ev| {
                                state.bulk_status.set(Status::parse(&event_target_value(&ev)));
                            }
                        >
                            <option value="" selected=move || state.bulk_status.get().is_none()>
                                "Set status..."
                            </option>
                            {Status::ALL
                                .into_iter()
                                .map(|s| {
                                    let selected = move || state.bulk_status.get() == Some(s);
                                    view! {
                                        <option value=s.as_str() selected=selected>{s.label()}</option>
                                    }
                                })
                                .collect_view()}
                        </select>
                        <button style=BTN_ACTIVE_STYLE on:click=move |_| selection::apply_bulk_update(state)>
                            "Apply"
                        </button>
                        <button
                            style=BTN_STYLE
                            on:click=move |_| {
                                state.selection.update(|s| s.clear());
                                state.bulk_status.set(None);
                                state.bulk_message.set(None);
                            }
                        >
                            "Clear"
                        </button>
                        {move || {
                            state.bulk_message.get().map(|message| {
                                view! { <span style="color: #fbbf24;">{message}</span> }
                            })
                        }}
                    </div>
                }
            })
        }}
    }
}

#[component]
fn SavedViewsPanel() -> impl IntoView {
    let state: MapState = expect_context();
    let view_name = RwSignal::new(String::new());

    view! {
        <div style=PANEL_STYLE>
            <div style="font-weight: 600; margin-bottom: 8px;">"Saved Views"</div>
            {move || {
                let views = state.saved_views.get();
                if views.is_empty() {
                    view! { <div style="color: #64748b; padding: 4px 0;">"No saved views"</div> }
                        .into_any()
                } else {
                    views
                        .into_iter()
                        .map(|v| {
                            let center = LngLat::new(v.center_lng, v.center_lat);
                            let zoom = v.zoom;
                            let view_id = v.id.clone();
                            let title = if v.is_default {
                                format!("{} \u{2605}", v.name)
                            } else {
                                v.name.clone()
                            };
                            let meta = v
                                .created_at
                                .map(|dt: chrono::DateTime<chrono::Utc>| {
                                    format!("Zoom {:.1} - {}", zoom, dt.format("%Y-%m-%d"))
                                })
                                .unwrap_or_else(|| format!("Zoom {zoom:.1}"));
                            view! {
                                <div style="display: flex; align-items: center; justify-content: space-between; padding: 3px 0;">
                                    <a
                                        style="cursor: pointer; color: #93c5fd;"
                                        on:click=move |_| {
                                            let (cw, ch) = state.canvas_size.get_untracked();
                                            state.viewport.update(|vp| {
                                                vp.set_camera(center, zoom, cw, ch);
                                            });
                                        }
                                    >
                                        {title}
                                        <span style="display: block; color: #64748b; font-size: 0.68rem;">{meta}</span>
                                    </a>
                                    <button
                                        style=BTN_STYLE
                                        on:click=move |_| {
                                            let view_id = view_id.clone();
                                            wasm_bindgen_futures::spawn_local(async move {
                                                if let Err(e) = api::delete_view(&view_id).await {
                                                    web_sys::console::warn_1(
                                                        &format!("Delete view failed: {e}").into(),
                                                    );
                                                }
                                                refresh_saved_views(state);
                                            });
                                        }
                                    >
                                        "\u{00D7}"
                                    </button>
                                </div>
                            }
                        })
                        .collect_view()
                        .into_any()
                }
            }}
            <div style="border-top: 1px solid #334155; padding-top: 8px; margin-top: 6px; display: flex; gap: 6px;">
                <input
                    type="text"
                    placeholder="View name"
                    style="flex: 1; background: #0f172a; border: 1px solid #334155; color: #e2e8f0; \
                        border-radius: 6px; padding: 4px 8px; font-size: 0.78rem;"
                    prop:value=move || view_name.get()
                    on:input=move |ev| view_name.set(event_target_value(&ev))
                />
                <button
                    style=BTN_ACTIVE_STYLE
                    on:click=move |_| save_current_view(state, view_name)
                >
                    "Save"
                </button>
            </div>
        </div>
    }
}

fn save_current_view(state: MapState, view_name: RwSignal<String>) {
    let name = view_name.get_untracked().trim().to_owned();
    let Some(project) = state.project_id.get_untracked() else {
        return;
    };
    if name.is_empty() {
        return;
    }

    let (cw, ch) = state.canvas_size.get_untracked();
    let vp = state.viewport.get_untracked();
    let center = vp.center(cw, ch);
    let body = fieldmap_shared::NewSavedView {
        name,
        center_lng: center.lng,
        center_lat: center.lat,
        zoom: vp.zoom(),
        is_default: false,
    };

    wasm_bindgen_futures::spawn_local(async move {
        match api::save_view(&project, &body).await {
            Ok(_) => {
                view_name.set(String::new());
                refresh_saved_views(state);
            }
            Err(e) => {
                web_sys::console::warn_1(&format!("Save view failed: {e}").into());
            }
        }
    });
}

fn refresh_saved_views(state: MapState) {
    let Some(project) = state.project_id.get_untracked() else {
        return;
    };
    wasm_bindgen_futures::spawn_local(async move {
        match api::fetch_saved_views(&project).await {
            Ok(views) => state.saved_views.set(views),
            Err(e) => {
                web_sys::console::warn_1(&format!("Saved views fetch failed: {e}").into());
            }
        }
    });
}

/// Fly to the device position. Degrades to a banner message when the
/// platform has no geolocation support.
fn locate_me(state: MapState) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(geolocation) = window.navigator().geolocation() else {
        state.banner.set(Some("Geolocation not supported".into()));
        return;
    };

    let success = Closure::once(move |pos: web_sys::GeolocationPosition| {
        let coords = pos.coords();
        let position = LngLat::new(coords.longitude(), coords.latitude());
        let (cw, ch) = state.canvas_size.get_untracked();
        state.viewport.update(|vp| vp.set_camera(position, 16.0, cw, ch));
        state.locate.set(Some(LocateMarker {
            position,
            accuracy_m: coords.accuracy(),
        }));
    });
    let error = Closure::once(move |err: web_sys::GeolocationPositionError| {
        web_sys::console::warn_1(&format!("Location error: {}", err.message()).into());
    });

    let options = web_sys::PositionOptions::new();
    options.set_enable_high_accuracy(true);
    if geolocation
        .get_current_position_with_error_callback_and_options(
            success.as_ref().unchecked_ref(),
            Some(error.as_ref().unchecked_ref()),
            &options,
        )
        .is_ok()
    {
        success.forget();
        error.forget();
    }
}
