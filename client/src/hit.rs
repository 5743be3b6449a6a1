use fieldmap_shared::{Category, Geometry, LngLat, point_in_ring};

use crate::hover::HoverTarget;
use crate::layers::{DROP_RADIUS, LayerSettings, NODE_RADIUS};
use crate::store::{LayerStore, RenderFeature};
use crate::viewport::Viewport;

/// Extra slack in CSS pixels around every hit target.
const HIT_TOLERANCE_PX: f64 = 4.0;

/// Hit-test priority mirrors paint order, top-most first: points above
/// lines above polygons.
const HIT_ORDER: [Category; 4] = [
    Category::Drop,
    Category::Node,
    Category::Span,
    Category::Zone,
];

/// Distance from a point to a line segment, all in screen pixels.
pub fn point_segment_distance(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

/// Find the top-most interactive feature under a screen position.
pub fn hit_test(
    store: &LayerStore,
    settings: &LayerSettings,
    vp: &Viewport,
    sx: f64,
    sy: f64,
) -> Option<HoverTarget> {
    let cursor = vp.screen_to_lnglat(sx, sy);

    for category in HIT_ORDER {
        if !settings.is_visible(category) {
            continue;
        }
        // Later features draw on top, so scan in reverse.
        for feature in store.features(category).iter().rev() {
            if !bbox_precheck(feature, vp, sx, sy) {
                continue;
            }
            let hit = match category {
                Category::Node => point_hit(feature, vp, sx, sy, NODE_RADIUS),
                Category::Drop => point_hit(feature, vp, sx, sy, DROP_RADIUS),
                Category::Span => span_hit(feature, settings, vp, sx, sy),
                Category::Zone => zone_hit(feature, cursor),
            };
            if hit {
                return Some(HoverTarget {
                    render_id: feature.render_id,
                    category,
                });
            }
        }
    }
    None
}

/// Cheap reject: the cursor must be near the feature's projected extent.
fn bbox_precheck(feature: &RenderFeature, vp: &Viewport, sx: f64, sy: f64) -> bool {
    let Some(bbox) = feature.bbox else {
        return true;
    };
    let (x0, y0) = vp.lnglat_to_screen(LngLat::new(bbox.west, bbox.north));
    let (x1, y1) = vp.lnglat_to_screen(LngLat::new(bbox.east, bbox.south));
    let margin = 24.0;
    sx >= x0 - margin && sx <= x1 + margin && sy >= y0 - margin && sy <= y1 + margin
}

fn point_hit(feature: &RenderFeature, vp: &Viewport, sx: f64, sy: f64, radius: f64) -> bool {
    let Geometry::Point { coordinates } = &feature.geometry else {
        return false;
    };
    let (cx, cy) = vp.lnglat_to_screen((*coordinates).into());
    let tolerance = radius + HIT_TOLERANCE_PX;
    (sx - cx).powi(2) + (sy - cy).powi(2) <= tolerance * tolerance
}

fn span_hit(
    feature: &RenderFeature,
    settings: &LayerSettings,
    vp: &Viewport,
    sx: f64,
    sy: f64,
) -> bool {
    let tolerance =
        settings.span_line_width(feature.paint.width, false) / 2.0 + HIT_TOLERANCE_PX;

    let line_hit = |coords: &[[f64; 2]]| {
        coords.windows(2).any(|pair| {
            let (ax, ay) = vp.lnglat_to_screen(pair[0].into());
            let (bx, by) = vp.lnglat_to_screen(pair[1].into());
            point_segment_distance(sx, sy, ax, ay, bx, by) <= tolerance
        })
    };

    match &feature.geometry {
        Geometry::LineString { coordinates } => line_hit(coordinates),
        Geometry::MultiLineString { coordinates } => {
            coordinates.iter().any(|line| line_hit(line))
        }
        _ => false,
    }
}

fn zone_hit(feature: &RenderFeature, cursor: LngLat) -> bool {
    let rings_hit = |rings: &[Vec<[f64; 2]>]| {
        let mut rings_iter = rings.iter();
        let Some(outer) = rings_iter.next() else {
            return false;
        };
        let outer: Vec<LngLat> = outer.iter().map(|&c| c.into()).collect();
        if !point_in_ring(cursor, &outer) {
            return false;
        }
        // Inside a hole is outside the zone.
        !rings_iter.any(|hole| {
            let hole: Vec<LngLat> = hole.iter().map(|&c| c.into()).collect();
            point_in_ring(cursor, &hole)
        })
    };

    match &feature.geometry {
        Geometry::Polygon { coordinates } => rings_hit(coordinates),
        Geometry::MultiPolygon { coordinates } => coordinates.iter().any(|poly| rings_hit(poly)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmap_shared::{Feature, FeatureProperties};

    fn feature(id: &str, category: Option<&str>, geometry: Geometry) -> Feature {
        Feature {
            geometry,
            properties: FeatureProperties {
                id: id.into(),
                category: category.map(str::to_owned),
                ..Default::default()
            },
        }
    }

    fn test_world() -> (LayerStore, LayerSettings, Viewport) {
        let mut store = LayerStore::new();
        store.attach_all();
        store.replace_all(vec![
            feature(
                "span-1",
                None,
                Geometry::LineString {
                    coordinates: vec![[-97.7450, 30.2672], [-97.7410, 30.2672]],
                },
            ),
            feature(
                "node-1",
                None,
                Geometry::Point {
                    coordinates: [-97.7431, 30.2690],
                },
            ),
            feature(
                "zone-1",
                None,
                Geometry::Polygon {
                    coordinates: vec![vec![
                        [-97.7445, 30.2650],
                        [-97.7415, 30.2650],
                        [-97.7415, 30.2665],
                        [-97.7445, 30.2665],
                        [-97.7445, 30.2650],
                    ]],
                },
            ),
        ]);

        let mut vp = Viewport::default();
        vp.set_camera(LngLat::new(-97.7431, 30.2672), 16.0, 1200.0, 800.0);
        (store, LayerSettings::default(), vp)
    }

    #[test]
    fn hits_a_node_within_its_radius() {
        let (store, settings, vp) = test_world();
        let (sx, sy) = vp.lnglat_to_screen(LngLat::new(-97.7431, 30.2690));
        let hit = hit_test(&store, &settings, &vp, sx + 3.0, sy - 2.0).expect("hit");
        assert_eq!(hit.category, Category::Node);
    }

    #[test]
    fn hits_a_span_near_its_segment() {
        let (store, settings, vp) = test_world();
        let (sx, sy) = vp.lnglat_to_screen(LngLat::new(-97.7430, 30.2672));
        let hit = hit_test(&store, &settings, &vp, sx, sy + 3.0).expect("hit");
        assert_eq!(hit.category, Category::Span);
    }

    #[test]
    fn hits_a_zone_by_containment() {
        let (store, settings, vp) = test_world();
        let (sx, sy) = vp.lnglat_to_screen(LngLat::new(-97.7430, 30.2658));
        let hit = hit_test(&store, &settings, &vp, sx, sy).expect("hit");
        assert_eq!(hit.category, Category::Zone);
    }

    #[test]
    fn misses_empty_space() {
        let (store, settings, vp) = test_world();
        let (sx, sy) = vp.lnglat_to_screen(LngLat::new(-97.7470, 30.2700));
        assert!(hit_test(&store, &settings, &vp, sx, sy).is_none());
    }

    #[test]
    fn hidden_categories_are_not_interactive() {
        let (store, mut settings, vp) = test_world();
        settings.set_visible(Category::Node, false);
        let (sx, sy) = vp.lnglat_to_screen(LngLat::new(-97.7431, 30.2690));
        assert!(hit_test(&store, &settings, &vp, sx, sy).is_none());
    }

    #[test]
    fn segment_distance_handles_degenerate_segments() {
        let d = point_segment_distance(3.0, 4.0, 0.0, 0.0, 0.0, 0.0);
        assert!((d - 5.0).abs() < 1e-9);
        let d = point_segment_distance(5.0, 1.0, 0.0, 0.0, 10.0, 0.0);
        assert!((d - 1.0).abs() < 1e-9);
    }
}
