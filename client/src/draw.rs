use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;

use fieldmap_shared::{Geometry, LngLat};

use crate::app::MapState;
use crate::fmt::format_number;
use crate::measure::{FT_PER_M, SQFT_PER_SQM};

/// Which primitive the drawing tool is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawShape {
    #[default]
    Line,
    Polygon,
    Point,
}

impl DrawShape {
    pub const ALL: [DrawShape; 3] = [DrawShape::Line, DrawShape::Polygon, DrawShape::Point];

    pub const fn label(self) -> &'static str {
        match self {
            DrawShape::Line => "Line",
            DrawShape::Polygon => "Polygon",
            DrawShape::Point => "Point",
        }
    }
}

/// Callbacks the core registers against the drawing tool. The tool owns its
/// editing state; the core only sees finished/updated geometry.
pub struct DrawCallbacks {
    pub on_create: Rc<dyn Fn(&Geometry)>,
    pub on_update: Rc<dyn Fn(&Geometry)>,
    pub on_delete: Rc<dyn Fn()>,
}

#[derive(Default)]
struct DrawTool {
    active: bool,
    shape: DrawShape,
    draft: Vec<LngLat>,
    finished: Vec<Geometry>,
    callbacks: Option<DrawCallbacks>,
}

thread_local! {
    static DRAW_TOOL: RefCell<DrawTool> = RefCell::new(DrawTool::default());
}

/// Build a geometry from the shape selection and accumulated vertices, once
/// enough exist: 1 for points, 2 for lines, 3 for polygons.
pub fn draft_geometry(shape: DrawShape, points: &[LngLat]) -> Option<Geometry> {
    match shape {
        DrawShape::Point => points.first().map(|p| Geometry::Point {
            coordinates: [p.lng, p.lat],
        }),
        DrawShape::Line => (points.len() >= 2).then(|| Geometry::LineString {
            coordinates: points.iter().map(|p| [p.lng, p.lat]).collect(),
        }),
        DrawShape::Polygon => (points.len() >= 3).then(|| {
            let mut ring: Vec<[f64; 2]> = points.iter().map(|p| [p.lng, p.lat]).collect();
            ring.push(ring[0]);
            Geometry::Polygon {
                coordinates: vec![ring],
            }
        }),
    }
}

/// Measurement display for a drawn geometry, classified by type.
pub fn measurement_text(geometry: &Geometry) -> Option<String> {
    match geometry {
        Geometry::LineString { .. } | Geometry::MultiLineString { .. } => {
            let length_m = geometry.length_m();
            Some(format!(
                "Drawn line: {} ft ({:.1} m)",
                format_number(length_m * FT_PER_M),
                length_m
            ))
        }
        Geometry::Polygon { .. } | Geometry::MultiPolygon { .. } => {
            let area_sqm = geometry.area_sqm();
            Some(format!(
                "Drawn area: {} sq ft ({:.1} sq m)",
                format_number(area_sqm * SQFT_PER_SQM),
                area_sqm
            ))
        }
        Geometry::Point { coordinates } => Some(format!(
            "Point: {:.6}, {:.6}",
            coordinates[1], coordinates[0]
        )),
    }
}

/// Attach the core's callbacks and arm the tool. Each event classifies the
/// geometry and surfaces its measurement in the shared result banner.
pub fn activate(state: MapState) {
    let banner = state.banner;
    let generation = state.draw_generation;

    let show = move |geometry: &Geometry| {
        banner.set(measurement_text(geometry));
        generation.update(|g| *g = g.wrapping_add(1));
    };
    let callbacks = DrawCallbacks {
        on_create: Rc::new(show),
        on_update: Rc::new(show),
        on_delete: Rc::new(move || {
            banner.set(None);
            generation.update(|g| *g = g.wrapping_add(1));
        }),
    };

    DRAW_TOOL.with(|tool| {
        let mut tool = tool.borrow_mut();
        tool.active = true;
        tool.draft.clear();
        tool.finished.clear();
        tool.callbacks = Some(callbacks);
    });
}

/// Detach callbacks and drop all editing state.
pub fn deactivate() {
    DRAW_TOOL.with(|tool| {
        *tool.borrow_mut() = DrawTool::default();
    });
}

pub fn set_shape(shape: DrawShape) {
    DRAW_TOOL.with(|tool| {
        let mut tool = tool.borrow_mut();
        if tool.shape != shape {
            tool.shape = shape;
            tool.draft.clear();
        }
    });
}

pub fn active_shape() -> DrawShape {
    DRAW_TOOL.with(|tool| tool.borrow().shape)
}

/// Append a vertex at the clicked coordinate. Points finalize immediately;
/// lines and polygons fire an update per vertex until finished.
pub fn handle_click(state: MapState, point: LngLat) {
    let (geometry, created) = DRAW_TOOL.with(|tool| {
        let mut tool = tool.borrow_mut();
        if !tool.active {
            return (None, false);
        }
        tool.draft.push(point);

        if tool.shape == DrawShape::Point {
            let geometry = draft_geometry(tool.shape, &tool.draft);
            tool.draft.clear();
            if let Some(ref g) = geometry {
                tool.finished.push(g.clone());
            }
            (geometry, true)
        } else {
            (draft_geometry(tool.shape, &tool.draft), false)
        }
    });

    dispatch(state, geometry, created);
}

/// Finish the in-progress line/polygon (double click).
pub fn finish(state: MapState) {
    let geometry = DRAW_TOOL.with(|tool| {
        let mut tool = tool.borrow_mut();
        if !tool.active {
            return None;
        }
        let geometry = draft_geometry(tool.shape, &tool.draft)?;
        tool.draft.clear();
        tool.finished.push(geometry.clone());
        Some(geometry)
    });

    dispatch(state, geometry, true);
}

/// Trash: drop draft and finished geometry, notify the core.
pub fn delete_all(state: MapState) {
    let on_delete = DRAW_TOOL.with(|tool| {
        let mut tool = tool.borrow_mut();
        tool.draft.clear();
        tool.finished.clear();
        tool.callbacks.as_ref().map(|cb| cb.on_delete.clone())
    });
    if let Some(on_delete) = on_delete {
        on_delete();
    }
    state.draw_generation.update(|g| *g = g.wrapping_add(1));
}

fn dispatch(state: MapState, geometry: Option<Geometry>, created: bool) {
    let Some(geometry) = geometry else {
        // Not enough vertices for a measurable shape yet; still repaint the
        // draft markers.
        state.draw_generation.update(|g| *g = g.wrapping_add(1));
        return;
    };
    let callback = DRAW_TOOL.with(|tool| {
        let tool = tool.borrow();
        tool.callbacks.as_ref().map(|cb| {
            if created {
                cb.on_create.clone()
            } else {
                cb.on_update.clone()
            }
        })
    });
    if let Some(callback) = callback {
        callback(&geometry);
    }
}

/// Snapshot of the in-progress vertices for rendering.
pub fn draft_snapshot() -> (DrawShape, Vec<LngLat>) {
    DRAW_TOOL.with(|tool| {
        let tool = tool.borrow();
        (tool.shape, tool.draft.clone())
    })
}

/// Snapshot of completed geometry for rendering.
pub fn finished_snapshot() -> Vec<Geometry> {
    DRAW_TOOL.with(|tool| tool.borrow().finished.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<LngLat> {
        coords.iter().map(|&(lng, lat)| LngLat::new(lng, lat)).collect()
    }

    #[test]
    fn draft_geometry_needs_enough_vertices() {
        let points = pts(&[(-97.74, 30.26)]);
        assert!(draft_geometry(DrawShape::Point, &points).is_some());
        assert!(draft_geometry(DrawShape::Line, &points).is_none());
        assert!(draft_geometry(DrawShape::Polygon, &points).is_none());

        let points = pts(&[(-97.74, 30.26), (-97.73, 30.26), (-97.73, 30.27)]);
        assert!(matches!(
            draft_geometry(DrawShape::Line, &points),
            Some(Geometry::LineString { .. })
        ));
        assert!(matches!(
            draft_geometry(DrawShape::Polygon, &points),
            Some(Geometry::Polygon { .. })
        ));
    }

    #[test]
    fn polygon_draft_closes_its_ring() {
        let points = pts(&[(-97.74, 30.26), (-97.73, 30.26), (-97.73, 30.27)]);
        let Some(Geometry::Polygon { coordinates }) =
            draft_geometry(DrawShape::Polygon, &points)
        else {
            panic!("expected polygon");
        };
        let ring = &coordinates[0];
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn measurement_classifies_by_geometry_type() {
        let line = Geometry::LineString {
            coordinates: vec![[-97.7431, 30.2672], [-97.7421, 30.2672]],
        };
        let text = measurement_text(&line).expect("line text");
        assert!(text.starts_with("Drawn line: "), "{text}");
        assert!(text.contains(" ft ("), "{text}");

        let poly = Geometry::Polygon {
            coordinates: vec![vec![
                [-97.7431, 30.2672],
                [-97.7421, 30.2672],
                [-97.7421, 30.2680],
                [-97.7431, 30.2672],
            ]],
        };
        let text = measurement_text(&poly).expect("polygon text");
        assert!(text.starts_with("Drawn area: "), "{text}");
        assert!(text.contains(" sq ft ("), "{text}");

        let point = Geometry::Point {
            coordinates: [-97.7431, 30.2672],
        };
        assert_eq!(
            measurement_text(&point).expect("point text"),
            "Point: 30.267200, -97.743100"
        );
    }
}
