use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent};

use fieldmap_shared::{Category, Geometry, LngLat};

use crate::app::{FeatureDetail, MapState};
use crate::draw::{self, DrawShape};
use crate::hit::hit_test;
use crate::hover;
use crate::layers::{
    DEFAULT_DROP_OPACITY, DEFAULT_NODE_OPACITY, DEFAULT_SPAN_OPACITY, DEFAULT_ZONE_FILL_OPACITY,
    DEFAULT_ZONE_OUTLINE_WIDTH, DROP_RADIUS, LayerSettings, NODE_HALO_RADIUS, NODE_RADIUS,
};
use crate::render_loop::RenderScheduler;
use crate::selection::SelectionSet;
use crate::store::{LayerStore, RenderFeature};
use crate::viewport::{Viewport, WORLD_SIZE};
use crate::{basemap, modes::InteractionMode, reload};

const BACKGROUND: &str = "#0f172a";
const DRAW_COLOR: (u8, u8, u8) = (0xFF, 0x6B, 0x6B);
const SELECTION_COLOR: &str = "rgba(255,255,255,0.5)";
const CLICK_SLOP_PX: f64 = 5.0;

/// Opening camera before any project data is loaded.
const INITIAL_CENTER: LngLat = LngLat::new(-97.7431, 30.2672);
const INITIAL_ZOOM: f64 = 14.0;

fn rgba(color: (u8, u8, u8), alpha: f64) -> String {
    format!("rgba({},{},{},{})", color.0, color.1, color.2, alpha)
}

/// The interactive map surface: basemap tiles below, the four category
/// paint stacks above, then transient measure/draw overlays.
#[component]
pub fn MapCanvas() -> impl IntoView {
    let state: MapState = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    // Drag state
    let is_dragging = Rc::new(Cell::new(false));
    let drag_start_x = Rc::new(Cell::new(0.0f64));
    let drag_start_y = Rc::new(Cell::new(0.0f64));
    let last_x = Rc::new(Cell::new(0.0f64));
    let last_y = Rc::new(Cell::new(0.0f64));
    // Pinch state
    let pinch_dist = Rc::new(Cell::new(0.0f64));

    // Cached 2D context (invalidated on canvas resize)
    let cached_ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>> = Rc::new(RefCell::new(None));

    // Center the default camera once the canvas size is known.
    let camera_initialized = Rc::new(Cell::new(false));

    let cached_ctx_render = cached_ctx.clone();
    let camera_init_render = camera_initialized.clone();
    let scheduler = Rc::new(RenderScheduler::new(move || {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas;

        let Some(parent) = canvas.parent_element() else {
            return;
        };
        let css_w = parent.client_width() as f64;
        let css_h = parent.client_height() as f64;
        if css_w <= 0.0 || css_h <= 0.0 {
            return;
        }
        if state.canvas_size.get_untracked() != (css_w, css_h) {
            state.canvas_size.set((css_w, css_h));
        }
        if !camera_init_render.get() {
            camera_init_render.set(true);
            state.viewport.update(|vp| {
                vp.set_camera(INITIAL_CENTER, INITIAL_ZOOM, css_w, css_h);
            });
        }

        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0)
            .max(1.0);
        let px_w = (css_w * dpr) as u32;
        let px_h = (css_h * dpr) as u32;
        if canvas.width() != px_w || canvas.height() != px_h {
            canvas.set_width(px_w);
            canvas.set_height(px_h);
            *cached_ctx_render.borrow_mut() = None;
        }

        let ctx = {
            let mut cache = cached_ctx_render.borrow_mut();
            if cache.is_none() {
                let Some(ctx) = canvas
                    .get_context("2d")
                    .ok()
                    .flatten()
                    .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
                else {
                    return;
                };
                *cache = Some(ctx);
            }
            let Some(ctx) = cache.clone() else {
                return;
            };
            ctx
        };

        ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();
        paint(state, &ctx, css_w, css_h);
    }));

    // Data/style/interaction changes repaint the scene.
    let sched_state = scheduler.clone();
    Effect::new(move || {
        state.store.track();
        state.layer_settings.track();
        state.selection.track();
        state.hovered.track();
        state.measure.track();
        state.tiles_generation.track();
        state.draw_generation.track();
        state.locate.track();
        state.mode.track();
        sched_state.mark_dirty();
    });

    // Viewport changes repaint, refresh basemap tiles, and restart the
    // settle-debounced bounded reload.
    let sched_vp = scheduler.clone();
    Effect::new(move || {
        state.viewport.track();
        sched_vp.mark_dirty();
        basemap::ensure_visible_tiles(state);
        reload::schedule_viewport_reload(state);
    });

    // Token arrival / style swap kick the tile fetcher.
    let sched_tiles = scheduler.clone();
    Effect::new(move || {
        state.basemap_token.track();
        state.basemap_style.track();
        basemap::ensure_visible_tiles(state);
        sched_tiles.mark_dirty();
    });

    // Mode changes swap the pointer affordance.
    Effect::new(move || {
        let cursor = state.mode.get().cursor();
        if let Some(canvas) = canvas_ref.get_untracked() {
            let canvas: &HtmlCanvasElement = &canvas;
            web_sys::HtmlElement::style(canvas).set_property("cursor", cursor).ok();
        }
    });

    // --- Input handlers ---

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let delta = e.delta_y();
        let x = e.offset_x() as f64;
        let y = e.offset_y() as f64;
        state.viewport.update(|vp| vp.zoom_at(delta, x, y));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        move |e: PointerEvent| {
            is_dragging.set(true);
            drag_start_x.set(e.client_x() as f64);
            drag_start_y.set(e.client_y() as f64);
            last_x.set(e.client_x() as f64);
            last_y.set(e.client_y() as f64);

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                if state.mode.get_untracked() == InteractionMode::Browse {
                    el.style().set_property("cursor", "grabbing").ok();
                }
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        move |e: PointerEvent| {
            if is_dragging.get() {
                let dx = e.client_x() as f64 - last_x.get();
                let dy = e.client_y() as f64 - last_y.get();
                last_x.set(e.client_x() as f64);
                last_y.set(e.client_y() as f64);
                state.viewport.update(|vp| vp.pan(dx, dy));
                return;
            }

            let (local_x, local_y) = local_coords(canvas_ref, &e);
            let vp = state.viewport.get_untracked();
            let settings = state.layer_settings.get_untracked();
            let hit = state
                .store
                .with_untracked(|store| hit_test(store, &settings, &vp, local_x, local_y));

            let current = state.hovered.get_untracked();
            if hit != current {
                state.store.update(|store| {
                    hover::transition(store, current, hit);
                });
                state.hovered.set(hit);
            }
            if hit.is_some() {
                state.mouse_pos.set((e.client_x() as f64, e.client_y() as f64));
            }
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style()
                    .set_property("cursor", state.mode.get_untracked().cursor())
                    .ok();
            }
        }
    };

    let on_pointer_leave = {
        let is_dragging = is_dragging.clone();
        move |_: PointerEvent| {
            is_dragging.set(false);
            let current = state.hovered.get_untracked();
            if current.is_some() {
                state.store.update(|store| {
                    hover::transition(store, current, None);
                });
                state.hovered.set(None);
            }
        }
    };

    let on_click = {
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        move |e: MouseEvent| {
            let dx = (e.client_x() as f64 - drag_start_x.get()).abs();
            let dy = (e.client_y() as f64 - drag_start_y.get()).abs();
            if dx >= CLICK_SLOP_PX || dy >= CLICK_SLOP_PX {
                return;
            }

            let (local_x, local_y) = local_coords(canvas_ref, &e);
            let vp = state.viewport.get_untracked();

            // Exactly one mode owns each click; Browse is the fallback.
            match state.mode.get_untracked() {
                InteractionMode::Measure => {
                    let point = vp.screen_to_lnglat(local_x, local_y);
                    state.measure.update(|session| session.push(point));
                    state
                        .banner
                        .set(state.measure.with_untracked(|session| session.banner_text()));
                }
                InteractionMode::Draw => {
                    let point = vp.screen_to_lnglat(local_x, local_y);
                    draw::handle_click(state, point);
                }
                InteractionMode::BulkSelect => {
                    let settings = state.layer_settings.get_untracked();
                    let hit = state.store.with_untracked(|store| {
                        hit_test(store, &settings, &vp, local_x, local_y)
                    });
                    if let Some(target) = hit {
                        let key = state.store.with_untracked(|store| {
                            store
                                .find(target.category, target.render_id)
                                .map(|f| f.key.clone())
                        });
                        if let Some(key) = key {
                            state.selection.update(|selection| {
                                selection.toggle(&key);
                            });
                            state.bulk_message.set(None);
                        }
                    }
                }
                InteractionMode::Browse => {
                    let settings = state.layer_settings.get_untracked();
                    let hit = state.store.with_untracked(|store| {
                        hit_test(store, &settings, &vp, local_x, local_y)
                    });
                    if let Some(target) = hit {
                        let detail = state.store.with_untracked(|store| {
                            store
                                .find(target.category, target.render_id)
                                .map(FeatureDetail::from_feature)
                        });
                        if let Some(detail) = detail {
                            state.detail.set(Some(detail));
                        }
                    }
                }
            }
        }
    };

    let on_dblclick = move |e: MouseEvent| {
        if state.mode.get_untracked() == InteractionMode::Draw {
            e.prevent_default();
            draw::finish(state);
        }
    };

    let on_touch_start = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                pinch_dist.set((dx * dx + dy * dy).sqrt());
            }
        }
    };

    let on_touch_move = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                let new_dist = (dx * dx + dy * dy).sqrt();
                let old_dist = pinch_dist.get();

                if old_dist > 0.0 {
                    let mid_x = (t0.client_x() + t1.client_x()) as f64 / 2.0;
                    let mid_y = (t0.client_y() + t1.client_y()) as f64 / 2.0;
                    let delta = -(new_dist - old_dist) * 2.0;
                    state.viewport.update(|vp| vp.zoom_at(delta, mid_x, mid_y));
                }
                pinch_dist.set(new_dist);
            }
        }
    };

    view! {
        <canvas
            node_ref=canvas_ref
            style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_click
            on:dblclick=on_dblclick
            on:touchstart=on_touch_start
            on:touchmove=on_touch_move
        />
    }
}

fn local_coords(canvas_ref: NodeRef<leptos::html::Canvas>, e: &MouseEvent) -> (f64, f64) {
    canvas_ref
        .get_untracked()
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            (
                e.client_x() as f64 - rect.left(),
                e.client_y() as f64 - rect.top(),
            )
        })
        .unwrap_or((e.offset_x() as f64, e.offset_y() as f64))
}

// --- Painting ---

fn paint(state: MapState, ctx: &CanvasRenderingContext2d, w: f64, h: f64) {
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, w, h);

    let vp = state.viewport.get_untracked();
    let settings = state.layer_settings.get_untracked();
    let selection = state.selection.get_untracked();

    basemap::with_tiles(|tiles| {
        paint_tiles(ctx, &vp, tiles, w, h);
    });

    state.store.with_untracked(|store| {
        paint_zones(ctx, &vp, store, &settings);
        paint_spans(ctx, &vp, store, &settings, &selection);
        paint_nodes(ctx, &vp, store, &settings, &selection);
        paint_drops(ctx, &vp, store, &settings, &selection);
        paint_labels(ctx, &vp, store, &settings);
    });

    state.measure.with_untracked(|session| {
        paint_measure(ctx, &vp, session.points());
    });

    if state.mode.get_untracked() == InteractionMode::Draw {
        paint_draw_overlay(ctx, &vp);
    }

    if let Some(marker) = state.locate.get_untracked() {
        paint_locate_marker(ctx, &vp, marker.position, marker.accuracy_m);
    }
}

fn paint_tiles(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    tiles: &[basemap::MapTile],
    w: f64,
    h: f64,
) {
    for tile in tiles {
        let world_per_tile = WORLD_SIZE / (1u32 << tile.z) as f64;
        let (sx, sy) =
            vp.world_to_screen(tile.x as f64 * world_per_tile, tile.y as f64 * world_per_tile);
        let size = world_per_tile * vp.scale;
        if sx + size < 0.0 || sy + size < 0.0 || sx > w || sy > h {
            continue;
        }
        ctx.draw_image_with_html_image_element_and_dw_and_dh(&tile.image, sx, sy, size, size)
            .ok();
    }
}

fn set_dash(ctx: &CanvasRenderingContext2d, on: f64, off: f64) {
    let segments = js_sys::Array::of2(&JsValue::from_f64(on), &JsValue::from_f64(off));
    ctx.set_line_dash(&segments).ok();
}

fn clear_dash(ctx: &CanvasRenderingContext2d) {
    ctx.set_line_dash(&js_sys::Array::new()).ok();
}

fn trace_path(ctx: &CanvasRenderingContext2d, vp: &Viewport, coords: &[[f64; 2]], close: bool) {
    for (i, &c) in coords.iter().enumerate() {
        let (sx, sy) = vp.lnglat_to_screen(c.into());
        if i == 0 {
            ctx.move_to(sx, sy);
        } else {
            ctx.line_to(sx, sy);
        }
    }
    if close {
        ctx.close_path();
    }
}

fn each_line<'a>(geometry: &'a Geometry) -> Vec<&'a [[f64; 2]]> {
    match geometry {
        Geometry::LineString { coordinates } => vec![coordinates.as_slice()],
        Geometry::MultiLineString { coordinates } => {
            coordinates.iter().map(Vec::as_slice).collect()
        }
        _ => Vec::new(),
    }
}

fn each_polygon<'a>(geometry: &'a Geometry) -> Vec<&'a [Vec<[f64; 2]>]> {
    match geometry {
        Geometry::Polygon { coordinates } => vec![coordinates.as_slice()],
        Geometry::MultiPolygon { coordinates } => {
            coordinates.iter().map(Vec::as_slice).collect()
        }
        _ => Vec::new(),
    }
}

fn point_screen(vp: &Viewport, feature: &RenderFeature) -> Option<(f64, f64)> {
    match &feature.geometry {
        Geometry::Point { coordinates } => Some(vp.lnglat_to_screen((*coordinates).into())),
        _ => None,
    }
}

fn stroke_lines(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    geometry: &Geometry,
    color: &str,
    width: f64,
) {
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(width);
    ctx.begin_path();
    for line in each_line(geometry) {
        trace_path(ctx, vp, line, false);
    }
    ctx.stroke();
}

fn paint_zones(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    store: &LayerStore,
    settings: &LayerSettings,
) {
    if !settings.is_visible(Category::Zone) {
        return;
    }
    let category_opacity = settings.opacity(Category::Zone);

    for feature in store.features(Category::Zone) {
        let fill_alpha =
            feature.paint.opacity.unwrap_or(DEFAULT_ZONE_FILL_OPACITY) * category_opacity;

        ctx.begin_path();
        for rings in each_polygon(&feature.geometry) {
            for ring in rings {
                trace_path(ctx, vp, ring, true);
            }
        }
        ctx.set_fill_style_str(&rgba(feature.paint.color, fill_alpha));
        ctx.fill_with_canvas_winding_rule(web_sys::CanvasWindingRule::Evenodd);

        set_dash(ctx, 3.0, 2.0);
        ctx.set_stroke_style_str(&rgba(feature.paint.color, category_opacity));
        ctx.set_line_width(feature.paint.width.unwrap_or(DEFAULT_ZONE_OUTLINE_WIDTH));
        ctx.stroke();
        clear_dash(ctx);
    }
}

fn paint_spans(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    store: &LayerStore,
    settings: &LayerSettings,
    selection: &SelectionSet,
) {
    if !settings.is_visible(Category::Span) {
        return;
    }
    let category_opacity = settings.opacity(Category::Span);
    ctx.set_line_cap("round");
    ctx.set_line_join("round");

    // Dark casing keeps spans legible over imagery.
    for feature in store.features(Category::Span) {
        stroke_lines(
            ctx,
            vp,
            &feature.geometry,
            &rgba((0, 0, 0), 0.35 * category_opacity),
            settings.span_casing_width(feature.paint.width, feature.hovered),
        );
    }

    // Selection underlay beneath the styled line.
    for feature in store.features(Category::Span) {
        if selection.contains(&feature.key) {
            stroke_lines(ctx, vp, &feature.geometry, SELECTION_COLOR, 8.0);
        }
    }

    for feature in store.features(Category::Span) {
        let alpha = feature.paint.opacity.unwrap_or(DEFAULT_SPAN_OPACITY) * category_opacity;
        stroke_lines(
            ctx,
            vp,
            &feature.geometry,
            &rgba(feature.paint.color, alpha),
            settings.span_line_width(feature.paint.width, feature.hovered),
        );
    }

    // Hover emphasis overlay on top of the styled line.
    for feature in store.features(Category::Span) {
        if feature.hovered {
            stroke_lines(
                ctx,
                vp,
                &feature.geometry,
                SELECTION_COLOR,
                settings.span_line_width(feature.paint.width, true) + 4.0,
            );
        }
    }

    ctx.set_line_cap("butt");
    ctx.set_line_join("miter");
}

fn fill_circle(ctx: &CanvasRenderingContext2d, x: f64, y: f64, r: f64, fill: &str) {
    ctx.begin_path();
    ctx.arc(x, y, r, 0.0, std::f64::consts::TAU).ok();
    ctx.set_fill_style_str(fill);
    ctx.fill();
}

fn stroke_circle(
    ctx: &CanvasRenderingContext2d,
    x: f64,
    y: f64,
    r: f64,
    stroke: &str,
    width: f64,
) {
    ctx.begin_path();
    ctx.arc(x, y, r, 0.0, std::f64::consts::TAU).ok();
    ctx.set_stroke_style_str(stroke);
    ctx.set_line_width(width);
    ctx.stroke();
}

fn paint_nodes(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    store: &LayerStore,
    settings: &LayerSettings,
    selection: &SelectionSet,
) {
    if !settings.is_visible(Category::Node) {
        return;
    }
    let category_opacity = settings.opacity(Category::Node);

    for feature in store.features(Category::Node) {
        let Some((x, y)) = point_screen(vp, feature) else {
            continue;
        };
        let halo_r = LayerSettings::circle_radius(NODE_HALO_RADIUS, feature.hovered);
        fill_circle(ctx, x, y, halo_r, &rgba((0, 0, 0), 0.3 * category_opacity));

        if selection.contains(&feature.key) {
            stroke_circle(ctx, x, y, NODE_HALO_RADIUS + 2.0, SELECTION_COLOR, 3.0);
        }

        let r = LayerSettings::circle_radius(NODE_RADIUS, feature.hovered);
        let alpha = feature.paint.opacity.unwrap_or(DEFAULT_NODE_OPACITY) * category_opacity;
        fill_circle(ctx, x, y, r, &rgba(feature.paint.color, alpha));
        stroke_circle(ctx, x, y, r, &rgba((255, 255, 255), category_opacity), 2.5);
    }
}

fn paint_drops(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    store: &LayerStore,
    settings: &LayerSettings,
    selection: &SelectionSet,
) {
    if !settings.is_visible(Category::Drop) {
        return;
    }
    let category_opacity = settings.opacity(Category::Drop);

    for feature in store.features(Category::Drop) {
        let Some((x, y)) = point_screen(vp, feature) else {
            continue;
        };
        if selection.contains(&feature.key) {
            stroke_circle(ctx, x, y, DROP_RADIUS + 5.0, SELECTION_COLOR, 3.0);
        }

        let r = LayerSettings::circle_radius(DROP_RADIUS, feature.hovered);
        let alpha = feature.paint.opacity.unwrap_or(DEFAULT_DROP_OPACITY) * category_opacity;
        fill_circle(ctx, x, y, r, &rgba(feature.paint.color, alpha));
        stroke_circle(ctx, x, y, r, &rgba((255, 255, 255), category_opacity), 1.5);
    }
}

fn paint_labels(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    store: &LayerStore,
    settings: &LayerSettings,
) {
    let zoom = vp.zoom();
    ctx.set_text_align("center");

    for (category, font, offset_y) in [
        (Category::Span, "11px sans-serif", -6.0),
        (Category::Node, "12px sans-serif", NODE_RADIUS + 14.0),
        (Category::Drop, "10px sans-serif", DROP_RADIUS + 12.0),
    ] {
        if !settings.labels_at_zoom(category, zoom) {
            continue;
        }
        ctx.set_font(font);

        for feature in store.features(category) {
            let name = &feature.properties.name;
            if name.is_empty() {
                continue;
            }
            let anchor = label_anchor(&feature.geometry);
            let Some(anchor) = anchor else {
                continue;
            };
            let (x, y) = vp.lnglat_to_screen(anchor);

            ctx.set_stroke_style_str("rgba(0,0,0,0.8)");
            ctx.set_line_width(2.0);
            ctx.stroke_text(name, x, y + offset_y).ok();
            ctx.set_fill_style_str("#FFFFFF");
            ctx.fill_text(name, x, y + offset_y).ok();
        }
    }

    ctx.set_text_align("start");
}

fn label_anchor(geometry: &Geometry) -> Option<LngLat> {
    match geometry {
        Geometry::Point { coordinates } => Some((*coordinates).into()),
        Geometry::LineString { coordinates } => {
            coordinates.get(coordinates.len() / 2).map(|&c| c.into())
        }
        Geometry::MultiLineString { coordinates } => coordinates
            .first()
            .and_then(|line| line.get(line.len() / 2))
            .map(|&c| c.into()),
        _ => None,
    }
}

fn paint_measure(ctx: &CanvasRenderingContext2d, vp: &Viewport, points: &[LngLat]) {
    if points.is_empty() {
        return;
    }

    if points.len() >= 2 {
        ctx.begin_path();
        for (i, &p) in points.iter().enumerate() {
            let (sx, sy) = vp.lnglat_to_screen(p);
            if i == 0 {
                ctx.move_to(sx, sy);
            } else {
                ctx.line_to(sx, sy);
            }
        }
        set_dash(ctx, 3.0, 2.0);
        ctx.set_stroke_style_str(&rgba(DRAW_COLOR, 1.0));
        ctx.set_line_width(2.0);
        ctx.stroke();

        // Implicit closure once an area exists.
        if points.len() >= 3 {
            ctx.close_path();
            ctx.set_fill_style_str(&rgba(DRAW_COLOR, 0.1));
            ctx.fill();
            ctx.set_stroke_style_str(&rgba(DRAW_COLOR, 0.5));
            ctx.stroke();
        }
        clear_dash(ctx);
    }

    for &p in points {
        let (sx, sy) = vp.lnglat_to_screen(p);
        fill_circle(ctx, sx, sy, 5.0, &rgba(DRAW_COLOR, 1.0));
        stroke_circle(ctx, sx, sy, 5.0, "#FFFFFF", 2.0);
    }
}

fn paint_draw_overlay(ctx: &CanvasRenderingContext2d, vp: &Viewport) {
    for geometry in draw::finished_snapshot() {
        paint_drawn_geometry(ctx, vp, &geometry);
    }

    let (shape, draft) = draw::draft_snapshot();
    if draft.is_empty() {
        return;
    }

    if draft.len() >= 2 {
        ctx.begin_path();
        for (i, &p) in draft.iter().enumerate() {
            let (sx, sy) = vp.lnglat_to_screen(p);
            if i == 0 {
                ctx.move_to(sx, sy);
            } else {
                ctx.line_to(sx, sy);
            }
        }
        if shape == DrawShape::Polygon {
            ctx.close_path();
        }
        set_dash(ctx, 2.0, 2.0);
        ctx.set_stroke_style_str(&rgba(DRAW_COLOR, 1.0));
        ctx.set_line_width(2.0);
        ctx.stroke();
        clear_dash(ctx);
    }

    for &p in &draft {
        let (sx, sy) = vp.lnglat_to_screen(p);
        fill_circle(ctx, sx, sy, 4.0, &rgba(DRAW_COLOR, 1.0));
    }
}

fn paint_drawn_geometry(ctx: &CanvasRenderingContext2d, vp: &Viewport, geometry: &Geometry) {
    match geometry {
        Geometry::Point { coordinates } => {
            let (sx, sy) = vp.lnglat_to_screen((*coordinates).into());
            fill_circle(ctx, sx, sy, 6.0, &rgba(DRAW_COLOR, 1.0));
        }
        Geometry::LineString { .. } | Geometry::MultiLineString { .. } => {
            set_dash(ctx, 2.0, 2.0);
            stroke_lines(ctx, vp, geometry, &rgba(DRAW_COLOR, 1.0), 3.0);
            clear_dash(ctx);
        }
        Geometry::Polygon { .. } | Geometry::MultiPolygon { .. } => {
            ctx.begin_path();
            for rings in each_polygon(geometry) {
                for ring in rings {
                    trace_path(ctx, vp, ring, true);
                }
            }
            ctx.set_fill_style_str(&rgba(DRAW_COLOR, 0.15));
            ctx.fill_with_canvas_winding_rule(web_sys::CanvasWindingRule::Evenodd);
            set_dash(ctx, 2.0, 2.0);
            ctx.set_stroke_style_str(&rgba(DRAW_COLOR, 1.0));
            ctx.set_line_width(2.0);
            ctx.stroke();
            clear_dash(ctx);
        }
    }
}

fn paint_locate_marker(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    position: LngLat,
    accuracy_m: f64,
) {
    let (sx, sy) = vp.lnglat_to_screen(position);

    // Accuracy ring: meters converted through the Mercator scale at this
    // latitude.
    let meters_per_world =
        2.0 * std::f64::consts::PI * 6_371_008.8 * position.lat.to_radians().cos() / WORLD_SIZE;
    if meters_per_world > 0.0 {
        let radius_px = accuracy_m / meters_per_world * vp.scale;
        if radius_px > 10.0 && radius_px < 4000.0 {
            fill_circle(ctx, sx, sy, radius_px, "rgba(59,130,246,0.12)");
            stroke_circle(ctx, sx, sy, radius_px, "rgba(59,130,246,0.4)", 1.0);
        }
    }

    fill_circle(ctx, sx, sy, 7.0, "#3B82F6");
    stroke_circle(ctx, sx, sy, 7.0, "#FFFFFF", 2.5);
}
