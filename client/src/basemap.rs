use std::cell::RefCell;
use std::collections::HashSet;

use js_sys::Reflect;
use leptos::prelude::*;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;

use crate::app::MapState;
use crate::viewport::{Viewport, WORLD_SIZE};

const MAX_TILE_ZOOM: u8 = 19;
const MAX_CACHED_TILES: usize = 300;
const ONLOAD_HANDLE_KEY: &str = "__fieldmapTileOnload";
const ONERROR_HANDLE_KEY: &str = "__fieldmapTileOnerror";

/// Basemap styles. Swapping styles drops only the tile cache: feature
/// collections and paint stacks are untouched, so loaded data survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BasemapStyle {
    #[default]
    Satellite,
    Streets,
}

impl BasemapStyle {
    pub const ALL: [BasemapStyle; 2] = [BasemapStyle::Satellite, BasemapStyle::Streets];

    pub const fn label(self) -> &'static str {
        match self {
            BasemapStyle::Satellite => "Satellite",
            BasemapStyle::Streets => "Streets",
        }
    }

    const fn style_id(self) -> &'static str {
        match self {
            BasemapStyle::Satellite => "satellite-streets-v12",
            BasemapStyle::Streets => "streets-v12",
        }
    }

    pub fn tile_url(self, token: &str, z: u8, x: u32, y: u32) -> String {
        format!(
            "https://api.mapbox.com/styles/v1/mapbox/{}/tiles/256/{z}/{x}/{y}?access_token={token}",
            self.style_id()
        )
    }
}

/// One loaded raster tile in slippy-map addressing.
#[derive(Clone)]
pub struct MapTile {
    pub style: BasemapStyle,
    pub z: u8,
    pub x: u32,
    pub y: u32,
    pub image: HtmlImageElement,
}

pub type TileKey = (BasemapStyle, u8, u32, u32);

thread_local! {
    // Tile cache and in-flight set live beside the DOM, not in reactive
    // state; `tiles_generation` is bumped to invalidate the canvas.
    static TILE_CACHE: RefCell<Vec<MapTile>> = const { RefCell::new(Vec::new()) };
    static PENDING_TILES: RefCell<HashSet<TileKey>> = RefCell::new(HashSet::new());
}

/// Read access to the loaded tiles, painted lowest zoom first.
pub fn with_tiles<R>(f: impl FnOnce(&[MapTile]) -> R) -> R {
    TILE_CACHE.with(|cache| f(&cache.borrow()))
}

/// Integer tile zoom for a continuous viewport zoom.
pub fn tile_zoom(viewport_zoom: f64) -> u8 {
    viewport_zoom.floor().clamp(0.0, MAX_TILE_ZOOM as f64) as u8
}

/// Inclusive tile index range covering the visible viewport at zoom `z`.
pub fn visible_tile_range(
    vp: &Viewport,
    canvas_w: f64,
    canvas_h: f64,
    z: u8,
) -> (u32, u32, u32, u32) {
    let tiles_per_axis = 1u32 << z;
    let world_per_tile = WORLD_SIZE / tiles_per_axis as f64;

    let (wx0, wy0) = vp.screen_to_world(0.0, 0.0);
    let (wx1, wy1) = vp.screen_to_world(canvas_w, canvas_h);

    let max_index = tiles_per_axis - 1;
    let clamp = |v: f64| (v.floor().max(0.0) as u32).min(max_index);
    (
        clamp(wx0 / world_per_tile),
        clamp(wx1 / world_per_tile),
        clamp(wy0 / world_per_tile),
        clamp(wy1 / world_per_tile),
    )
}

/// Whether a cached tile is worth keeping once the cache overflows.
pub fn should_retain(tile: TileKey, style: BasemapStyle, z: u8) -> bool {
    tile.0 == style && tile.1 == z
}

/// Request any missing tiles for the current viewport. Without a basemap
/// token this is a no-op: tiles stay disabled and vector layers render on
/// the plain background.
pub fn ensure_visible_tiles(state: MapState) {
    let Some(token) = state.basemap_token.get_untracked() else {
        return;
    };
    if token.is_empty() {
        return;
    }

    let (canvas_w, canvas_h) = state.canvas_size.get_untracked();
    if canvas_w <= 0.0 || canvas_h <= 0.0 {
        return;
    }

    let style = state.basemap_style.get_untracked();
    let vp = state.viewport.get_untracked();
    let z = tile_zoom(vp.zoom());
    let (x0, x1, y0, y1) = visible_tile_range(&vp, canvas_w, canvas_h, z);

    let loaded: HashSet<TileKey> = TILE_CACHE.with(|cache| {
        cache
            .borrow()
            .iter()
            .map(|t| (t.style, t.z, t.x, t.y))
            .collect()
    });

    for x in x0..=x1 {
        for y in y0..=y1 {
            let key = (style, z, x, y);
            if loaded.contains(&key) {
                continue;
            }
            let already_pending =
                PENDING_TILES.with(|pending| !pending.borrow_mut().insert(key));
            if already_pending {
                continue;
            }
            load_tile(state, key, style.tile_url(&token, z, x, y));
        }
    }
}

/// Switch basemap styles: the tile cache is torn down and refetched, while
/// the layer store keeps all loaded feature data in memory.
pub fn switch_style(state: MapState, style: BasemapStyle) {
    if state.basemap_style.get_untracked() == style {
        return;
    }
    state.basemap_style.set(style);
    TILE_CACHE.with(|cache| cache.borrow_mut().clear());
    PENDING_TILES.with(|pending| pending.borrow_mut().clear());
    state.tiles_generation.update(|g| *g = g.wrapping_add(1));
    // Re-attach the category collections to the new style; loaded feature
    // data stays in memory and is not refetched.
    state.store.update(|store| store.attach_all());
    ensure_visible_tiles(state);
}

fn load_tile(state: MapState, key: TileKey, url: String) {
    let img = match HtmlImageElement::new() {
        Ok(img) => img,
        Err(_) => {
            PENDING_TILES.with(|pending| {
                pending.borrow_mut().remove(&key);
            });
            return;
        }
    };

    let img_for_load = img.clone();
    let onload = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_load);
        PENDING_TILES.with(|pending| {
            pending.borrow_mut().remove(&key);
        });
        insert_tile(
            state,
            MapTile {
                style: key.0,
                z: key.1,
                x: key.2,
                y: key.3,
                image: img_for_load.clone(),
            },
        );
    });

    let img_for_error = img.clone();
    let onerror = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_error);
        PENDING_TILES.with(|pending| {
            pending.borrow_mut().remove(&key);
        });
    });

    let onload_js = onload.into_js_value();
    let onerror_js = onerror.into_js_value();
    img.set_onload(Some(onload_js.unchecked_ref()));
    img.set_onerror(Some(onerror_js.unchecked_ref()));
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONLOAD_HANDLE_KEY),
        &onload_js,
    );
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONERROR_HANDLE_KEY),
        &onerror_js,
    );
    img.set_src(&url);
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}

fn insert_tile(state: MapState, tile: MapTile) {
    let style = state.basemap_style.get_untracked();
    if tile.style != style {
        // Style changed while this tile was in flight.
        return;
    }
    let vp = state.viewport.get_untracked();
    let current_z = tile_zoom(vp.zoom());

    TILE_CACHE.with(|cache| {
        let mut tiles = cache.borrow_mut();
        tiles.push(tile);
        if tiles.len() > MAX_CACHED_TILES {
            tiles.retain(|t| should_retain((t.style, t.z, t.x, t.y), style, current_z));
        }
        // Lower zooms first so crisper tiles paint on top.
        tiles.sort_by_key(|t| t.z);
    });
    state.tiles_generation.update(|g| *g = g.wrapping_add(1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmap_shared::LngLat;

    #[test]
    fn tile_zoom_clamps_to_valid_range() {
        assert_eq!(tile_zoom(-3.0), 0);
        assert_eq!(tile_zoom(14.7), 14);
        assert_eq!(tile_zoom(25.0), 19);
    }

    #[test]
    fn visible_range_covers_the_viewport_center() {
        let mut vp = Viewport::default();
        let center = LngLat::new(-97.7431, 30.2672);
        vp.set_camera(center, 14.0, 1200.0, 800.0);

        let z = tile_zoom(vp.zoom());
        let (x0, x1, y0, y1) = visible_tile_range(&vp, 1200.0, 800.0, z);
        assert!(x0 <= x1 && y0 <= y1);

        // The tile containing the center must be inside the range.
        let (wx, wy) = crate::viewport::project(center);
        let world_per_tile = WORLD_SIZE / (1u32 << z) as f64;
        let cx = (wx / world_per_tile) as u32;
        let cy = (wy / world_per_tile) as u32;
        assert!((x0..=x1).contains(&cx));
        assert!((y0..=y1).contains(&cy));
    }

    #[test]
    fn tile_url_carries_style_and_token() {
        let url = BasemapStyle::Streets.tile_url("tok123", 14, 3840, 6656);
        assert!(url.contains("streets-v12"));
        assert!(url.contains("/14/3840/6656"));
        assert!(url.ends_with("access_token=tok123"));
    }

    #[test]
    fn eviction_keeps_only_current_style_and_zoom() {
        let keep = (BasemapStyle::Streets, 14, 1, 2);
        let wrong_style = (BasemapStyle::Satellite, 14, 1, 2);
        let wrong_zoom = (BasemapStyle::Streets, 12, 1, 2);
        assert!(should_retain(keep, BasemapStyle::Streets, 14));
        assert!(!should_retain(wrong_style, BasemapStyle::Streets, 14));
        assert!(!should_retain(wrong_zoom, BasemapStyle::Streets, 14));
    }
}
