use std::collections::{HashMap, HashSet};

use fieldmap_shared::{
    BoundingBox, Category, Feature, FeatureProperties, Geometry, Status, bounding_box,
};

use crate::layers::{ResolvedPaint, resolve_paint};

/// One feature prepared for rendering: geometry plus paint resolved at
/// ingest, a reload-scoped dense render id, and the transient hover flag.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFeature {
    /// Dense integer id, reassigned on every full reload. Never persist.
    pub render_id: u32,
    /// Stable server identifier; survives reloads, used for bulk updates.
    pub key: String,
    pub category: Category,
    pub geometry: Geometry,
    pub bbox: Option<BoundingBox>,
    pub properties: FeatureProperties,
    pub paint: ResolvedPaint,
    pub hovered: bool,
}

impl RenderFeature {
    fn from_feature(feature: Feature, category: Category, render_id: u32) -> Self {
        let bbox = feature.geometry.bbox();
        let paint = resolve_paint(&feature.properties);
        Self {
            render_id,
            key: feature.properties.id.clone(),
            category,
            geometry: feature.geometry,
            bbox,
            properties: feature.properties,
            paint,
            hovered: false,
        }
    }
}

const fn index_of(category: Category) -> usize {
    match category {
        Category::Span => 0,
        Category::Node => 1,
        Category::Drop => 2,
        Category::Zone => 3,
    }
}

/// Owner of the four per-category feature collections backing the renderer.
///
/// Collections exist only after they are attached (map initialization);
/// updates addressed to an unattached category are silent no-ops so partial
/// initialization never errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerStore {
    collections: [Vec<RenderFeature>; 4],
    attached: [bool; 4],
    next_render_id: u32,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach all four category collections (map initialization / re-attach
    /// after a basemap style swap). Existing data is preserved.
    pub fn attach_all(&mut self) {
        self.attached = [true; 4];
    }

    pub fn is_attached(&self, category: Category) -> bool {
        self.attached[index_of(category)]
    }

    pub fn features(&self, category: Category) -> &[RenderFeature] {
        &self.collections[index_of(category)]
    }

    pub fn len(&self, category: Category) -> usize {
        self.collections[index_of(category)].len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.iter().all(Vec::is_empty)
    }

    pub fn find(&self, category: Category, render_id: u32) -> Option<&RenderFeature> {
        self.collections[index_of(category)]
            .iter()
            .find(|f| f.render_id == render_id)
    }

    /// Replace every collection from a full project load. Render ids are
    /// reassigned densely across the whole load, so any ids held from before
    /// this call are invalid afterwards.
    pub fn replace_all(&mut self, features: Vec<Feature>) {
        self.next_render_id = 0;
        for (idx, collection) in self.collections.iter_mut().enumerate() {
            if self.attached[idx] {
                collection.clear();
            }
        }

        for feature in features {
            let category = feature.category();
            if !self.attached[index_of(category)] {
                continue;
            }
            let render_id = self.next_render_id;
            self.next_render_id += 1;
            self.collections[index_of(category)]
                .push(RenderFeature::from_feature(feature, category, render_id));
        }
    }

    /// Merge a viewport-bounded reload. Within the box this behaves like a
    /// replace: existing features wholly inside `bbox`, or re-sent under the
    /// same stable key, are dropped before the fetched features are appended
    /// with fresh render ids. Features outside the box are never removed.
    pub fn merge_incremental(&mut self, features: Vec<Feature>, bbox: BoundingBox) {
        let mut incoming_keys: [HashSet<&str>; 4] = std::array::from_fn(|_| HashSet::new());
        let mut routed: Vec<(Category, Feature)> = Vec::with_capacity(features.len());
        for feature in features {
            let category = feature.category();
            routed.push((category, feature));
        }
        for (category, feature) in &routed {
            incoming_keys[index_of(*category)].insert(feature.properties.id.as_str());
        }

        for (idx, collection) in self.collections.iter_mut().enumerate() {
            if !self.attached[idx] {
                continue;
            }
            let keys = &incoming_keys[idx];
            collection.retain(|existing| {
                if keys.contains(existing.key.as_str()) {
                    return false;
                }
                match existing.bbox {
                    Some(fb) => !bbox.contains_box(&fb),
                    None => true,
                }
            });
        }
        drop(incoming_keys);

        for (category, feature) in routed {
            if !self.attached[index_of(category)] {
                continue;
            }
            let render_id = self.next_render_id;
            self.next_render_id += 1;
            self.collections[index_of(category)]
                .push(RenderFeature::from_feature(feature, category, render_id));
        }
    }

    /// Flip the transient hover attribute on one feature. Unknown ids are
    /// ignored; the feature may have been replaced by a reload mid-hover.
    pub fn set_hover(&mut self, category: Category, render_id: u32, hovered: bool) {
        if let Some(feature) = self.collections[index_of(category)]
            .iter_mut()
            .find(|f| f.render_id == render_id)
        {
            feature.hovered = hovered;
        }
    }

    /// Combined geographic extent of everything loaded.
    pub fn total_bbox(&self) -> Option<BoundingBox> {
        bounding_box(self.collections.iter().flatten().map(|f| &f.geometry))
    }

    /// Feature counts per status, for the legend.
    pub fn status_counts(&self) -> Vec<(Status, usize)> {
        let mut counts: HashMap<Status, usize> = HashMap::new();
        for feature in self.collections.iter().flatten() {
            *counts.entry(feature.properties.status).or_default() += 1;
        }
        let mut out: Vec<(Status, usize)> = Status::ALL
            .into_iter()
            .filter_map(|s| counts.get(&s).map(|&n| (s, n)))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmap_shared::FeatureCollection;

    fn point_feature(id: &str, category: Option<&str>, lng: f64, lat: f64) -> Feature {
        Feature {
            geometry: Geometry::Point {
                coordinates: [lng, lat],
            },
            properties: FeatureProperties {
                id: id.into(),
                name: id.into(),
                category: category.map(str::to_owned),
                ..Default::default()
            },
        }
    }

    fn line_feature(id: &str, coords: Vec<[f64; 2]>) -> Feature {
        Feature {
            geometry: Geometry::LineString {
                coordinates: coords,
            },
            properties: FeatureProperties {
                id: id.into(),
                name: id.into(),
                ..Default::default()
            },
        }
    }

    fn attached_store() -> LayerStore {
        let mut store = LayerStore::new();
        store.attach_all();
        store
    }

    #[test]
    fn replace_all_partitions_by_category() {
        let mut features = Vec::new();
        for i in 0..10 {
            features.push(line_feature(
                &format!("s{i}"),
                vec![[-97.74, 30.26], [-97.73, 30.27]],
            ));
        }
        for i in 0..5 {
            features.push(point_feature(&format!("n{i}"), None, -97.74, 30.26));
        }
        for i in 0..2 {
            features.push(Feature {
                geometry: Geometry::Polygon {
                    coordinates: vec![vec![
                        [-97.74, 30.26],
                        [-97.73, 30.26],
                        [-97.73, 30.27],
                        [-97.74, 30.26],
                    ]],
                },
                properties: FeatureProperties {
                    id: format!("z{i}"),
                    ..Default::default()
                },
            });
        }

        let mut store = attached_store();
        store.replace_all(features);
        assert_eq!(store.len(Category::Span), 10);
        assert_eq!(store.len(Category::Node), 5);
        assert_eq!(store.len(Category::Zone), 2);
        assert_eq!(store.len(Category::Drop), 0);
    }

    #[test]
    fn render_ids_are_dense_and_unique() {
        let mut store = attached_store();
        store.replace_all(vec![
            point_feature("a", None, -97.74, 30.26),
            point_feature("b", Some("drop"), -97.73, 30.26),
            line_feature("c", vec![[-97.74, 30.26], [-97.73, 30.27]]),
        ]);

        let mut ids: Vec<u32> = Category::ALL
            .into_iter()
            .flat_map(|c| store.features(c).iter().map(|f| f.render_id))
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2]);

        // A second full load starts over from zero.
        store.replace_all(vec![point_feature("d", None, -97.74, 30.26)]);
        assert_eq!(store.features(Category::Node)[0].render_id, 0);
    }

    #[test]
    fn unattached_category_update_is_a_no_op() {
        let mut store = LayerStore::new();
        store.replace_all(vec![point_feature("a", None, -97.74, 30.26)]);
        assert!(store.is_empty());

        store.attach_all();
        store.replace_all(vec![point_feature("a", None, -97.74, 30.26)]);
        assert_eq!(store.len(Category::Node), 1);
    }

    #[test]
    fn merge_never_removes_features_outside_the_box() {
        let mut store = attached_store();
        store.replace_all(vec![
            point_feature("inside", None, -97.74, 30.26),
            point_feature("outside", None, -97.50, 30.50),
        ]);

        let bbox = BoundingBox::new(-97.80, 30.20, -97.70, 30.30);
        store.merge_incremental(vec![point_feature("fresh", None, -97.73, 30.25)], bbox);

        let keys: Vec<&str> = store
            .features(Category::Node)
            .iter()
            .map(|f| f.key.as_str())
            .collect();
        assert!(keys.contains(&"outside"));
        assert!(keys.contains(&"fresh"));
        // "inside" was wholly within the box and not re-sent: server-side
        // deletion reflected locally.
        assert!(!keys.contains(&"inside"));
    }

    #[test]
    fn merge_keeps_features_crossing_the_box_edge() {
        let mut store = attached_store();
        store.replace_all(vec![line_feature(
            "crossing",
            vec![[-97.75, 30.25], [-97.65, 30.25]],
        )]);

        let bbox = BoundingBox::new(-97.80, 30.20, -97.70, 30.30);
        store.merge_incremental(Vec::new(), bbox);
        assert_eq!(store.len(Category::Span), 1);
    }

    #[test]
    fn merge_replaces_resent_keys_with_fresh_ids() {
        let mut store = attached_store();
        store.replace_all(vec![point_feature("a", None, -97.74, 30.26)]);
        let old_id = store.features(Category::Node)[0].render_id;

        let bbox = BoundingBox::new(-97.80, 30.20, -97.70, 30.30);
        store.merge_incremental(vec![point_feature("a", None, -97.74, 30.26)], bbox);

        assert_eq!(store.len(Category::Node), 1);
        assert_ne!(store.features(Category::Node)[0].render_id, old_id);
    }

    #[test]
    fn set_hover_on_missing_id_is_silent() {
        let mut store = attached_store();
        store.replace_all(vec![point_feature("a", None, -97.74, 30.26)]);
        store.set_hover(Category::Node, 999, true);
        assert!(!store.features(Category::Node)[0].hovered);

        store.set_hover(Category::Node, 0, true);
        assert!(store.features(Category::Node)[0].hovered);
    }

    #[test]
    fn status_counts_feed_the_legend() {
        let json = r#"{
            "features": [
                {"geometry": {"type": "Point", "coordinates": [-97.7, 30.3]},
                 "properties": {"id": "a", "status": "approved"}},
                {"geometry": {"type": "Point", "coordinates": [-97.7, 30.3]},
                 "properties": {"id": "b", "status": "approved"}},
                {"geometry": {"type": "Point", "coordinates": [-97.7, 30.3]},
                 "properties": {"id": "c", "status": "rework"}}
            ]
        }"#;
        let fc: FeatureCollection = serde_json::from_str(json).expect("decode");
        let mut store = attached_store();
        store.replace_all(fc.features);

        let counts = store.status_counts();
        assert_eq!(counts[0], (Status::Approved, 2));
        assert_eq!(counts[1], (Status::Rework, 1));
    }
}
