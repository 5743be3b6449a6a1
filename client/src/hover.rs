use fieldmap_shared::Category;

use crate::store::LayerStore;

/// Estimated popup footprint used for edge flipping before layout runs.
const POPUP_WIDTH: f64 = 240.0;
const POPUP_EDGE_MARGIN: f64 = 10.0;
const POPUP_OFFSET_X: f64 = 15.0;
const POPUP_OFFSET_Y: f64 = -10.0;

/// The feature currently under the pointer: render id plus the source
/// category it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverTarget {
    pub render_id: u32,
    pub category: Category,
}

/// Move the single hover slot from `current` to `next`, keeping the store's
/// hover attributes consistent: the previous feature is cleared before the
/// new one is set, and at most one feature carries the attribute afterwards.
///
/// Idempotent under repeated calls with the same target, and silent when
/// either id no longer exists (features can be replaced mid-hover by a
/// reload).
pub fn transition(
    store: &mut LayerStore,
    current: Option<HoverTarget>,
    next: Option<HoverTarget>,
) -> Option<HoverTarget> {
    if current == next {
        return current;
    }
    if let Some(prev) = current {
        store.set_hover(prev.category, prev.render_id, false);
    }
    if let Some(target) = next {
        store.set_hover(target.category, target.render_id, true);
    }
    next
}

/// Popup anchor near the pointer, flipped to the other side of the cursor
/// when it would overflow the right viewport edge.
pub fn popup_position(mouse_x: f64, mouse_y: f64, viewport_w: f64) -> (f64, f64) {
    let x = mouse_x + POPUP_OFFSET_X;
    let x = if x + POPUP_WIDTH > viewport_w - POPUP_EDGE_MARGIN {
        x - POPUP_WIDTH - 2.0 * POPUP_OFFSET_X
    } else {
        x
    };
    (x, mouse_y + POPUP_OFFSET_Y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmap_shared::{Feature, FeatureProperties, Geometry};

    fn store_with_nodes(n: usize) -> LayerStore {
        let mut store = LayerStore::new();
        store.attach_all();
        let features = (0..n)
            .map(|i| Feature {
                geometry: Geometry::Point {
                    coordinates: [-97.74 + i as f64 * 0.001, 30.26],
                },
                properties: FeatureProperties {
                    id: format!("n{i}"),
                    ..Default::default()
                },
            })
            .collect();
        store.replace_all(features);
        store
    }

    fn hovered_count(store: &LayerStore) -> usize {
        store
            .features(Category::Node)
            .iter()
            .filter(|f| f.hovered)
            .count()
    }

    fn target(render_id: u32) -> HoverTarget {
        HoverTarget {
            render_id,
            category: Category::Node,
        }
    }

    #[test]
    fn at_most_one_feature_is_hovered() {
        let mut store = store_with_nodes(3);
        let current = transition(&mut store, None, Some(target(0)));
        assert_eq!(hovered_count(&store), 1);

        // Moving to a new feature clears the old one first.
        let current = transition(&mut store, current, Some(target(2)));
        assert_eq!(hovered_count(&store), 1);
        assert!(store.find(Category::Node, 2).expect("feature").hovered);
        assert!(!store.find(Category::Node, 0).expect("feature").hovered);
        assert_eq!(current, Some(target(2)));
    }

    #[test]
    fn re_entry_is_idempotent() {
        let mut store = store_with_nodes(2);
        let mut current = None;
        for _ in 0..5 {
            current = transition(&mut store, current, Some(target(1)));
        }
        assert_eq!(hovered_count(&store), 1);

        current = transition(&mut store, current, None);
        assert_eq!(hovered_count(&store), 0);
        assert_eq!(current, None);
    }

    #[test]
    fn vanished_ids_are_tolerated() {
        let mut store = store_with_nodes(1);
        let current = transition(&mut store, None, Some(target(0)));

        // Reload replaces the collection; the held id no longer exists.
        store.replace_all(Vec::new());
        let current = transition(&mut store, current, None);
        assert_eq!(current, None);
        assert_eq!(hovered_count(&store), 0);
    }

    #[test]
    fn popup_flips_at_the_right_edge() {
        let (x, y) = popup_position(100.0, 200.0, 1200.0);
        assert_eq!((x, y), (115.0, 190.0));

        let (flipped_x, _) = popup_position(1100.0, 200.0, 1200.0);
        assert!(flipped_x < 1100.0 - 240.0 + 1.0);
    }
}
