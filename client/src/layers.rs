use fieldmap_shared::{Category, FeatureProperties, parse_hex_color};
use serde::{Deserialize, Serialize};

/// Hover scales width/radius by this factor; the status color stays intact
/// so the feature remains legible while hovered.
pub const HOVER_SCALE: f64 = 1.5;

pub const DEFAULT_SPAN_WIDTH: f64 = 4.0;
pub const DEFAULT_ZONE_OUTLINE_WIDTH: f64 = 2.0;
pub const NODE_RADIUS: f64 = 7.0;
pub const NODE_HALO_RADIUS: f64 = 10.0;
pub const DROP_RADIUS: f64 = 5.0;

/// Extra width the dark casing adds under span lines.
const CASING_EXTRA: f64 = 2.0;
const CASING_HOVER_EXTRA: f64 = 3.0;

pub const DEFAULT_SPAN_OPACITY: f64 = 0.95;
pub const DEFAULT_NODE_OPACITY: f64 = 0.95;
pub const DEFAULT_DROP_OPACITY: f64 = 0.9;
pub const DEFAULT_ZONE_FILL_OPACITY: f64 = 0.15;

/// Minimum zoom at which each category's labels appear.
pub const SPAN_LABEL_MIN_ZOOM: f64 = 15.0;
pub const NODE_LABEL_MIN_ZOOM: f64 = 14.0;
pub const DROP_LABEL_MIN_ZOOM: f64 = 15.0;

/// Paint resolved once at ingest: explicit per-feature override beats the
/// status-derived default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPaint {
    pub color: (u8, u8, u8),
    /// Line width (spans/zone outlines); `None` means the category default.
    pub width: Option<f64>,
    /// Opacity override; `None` means the category default.
    pub opacity: Option<f64>,
}

/// Resolve a feature's paint from its property bag. A malformed color
/// override degrades to the status color rather than failing the feature.
pub fn resolve_paint(props: &FeatureProperties) -> ResolvedPaint {
    let status_color =
        parse_hex_color(props.status.color()).unwrap_or((0x94, 0xA3, 0xB8));
    let color = props
        .style_color
        .as_deref()
        .and_then(parse_hex_color)
        .unwrap_or(status_color);

    ResolvedPaint {
        color,
        width: props.style_width,
        opacity: props.style_opacity,
    }
}

/// One paint pass in a category's layer stack, in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintLayer {
    /// Dark under-stroke for legibility over imagery (spans only).
    Casing,
    /// Translucent halo behind node circles.
    Halo,
    /// The primary styled fill/line/circle layer.
    Primary,
    /// Zone outline stroke above the fill.
    Outline,
    /// Transient hover/selection emphasis.
    Highlight,
    /// Name labels, gated by a minimum zoom.
    Label,
}

/// The declared paint stack for one category. Hiding the category hides
/// every layer in the stack together.
pub fn layer_stack(category: Category) -> &'static [PaintLayer] {
    match category {
        Category::Span => &[
            PaintLayer::Casing,
            PaintLayer::Primary,
            PaintLayer::Highlight,
            PaintLayer::Label,
        ],
        Category::Node => &[
            PaintLayer::Halo,
            PaintLayer::Primary,
            PaintLayer::Highlight,
            PaintLayer::Label,
        ],
        Category::Drop => &[
            PaintLayer::Primary,
            PaintLayer::Highlight,
            PaintLayer::Label,
        ],
        Category::Zone => &[
            PaintLayer::Primary,
            PaintLayer::Outline,
            PaintLayer::Highlight,
        ],
    }
}

const fn category_index(category: Category) -> usize {
    match category {
        Category::Span => 0,
        Category::Node => 1,
        Category::Drop => 2,
        Category::Zone => 3,
    }
}

/// Per-category render settings, persisted across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerSettings {
    visible: [bool; 4],
    opacity: [f64; 4],
    pub span_width: f64,
    pub labels_visible: bool,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            visible: [true; 4],
            opacity: [1.0; 4],
            span_width: DEFAULT_SPAN_WIDTH,
            labels_visible: true,
        }
    }
}

impl LayerSettings {
    pub fn is_visible(&self, category: Category) -> bool {
        self.visible[category_index(category)]
    }

    pub fn set_visible(&mut self, category: Category, visible: bool) {
        self.visible[category_index(category)] = visible;
    }

    pub fn opacity(&self, category: Category) -> f64 {
        self.opacity[category_index(category)]
    }

    pub fn set_opacity(&mut self, category: Category, opacity: f64) {
        self.opacity[category_index(category)] = opacity.clamp(0.0, 1.0);
    }

    /// Effective span line width, including the hover emphasis variant.
    pub fn span_line_width(&self, feature_width: Option<f64>, hovered: bool) -> f64 {
        let base = feature_width.unwrap_or(self.span_width);
        if hovered { base * HOVER_SCALE } else { base }
    }

    /// Casing width tracks the line width so the dark edge stays visible
    /// when the slider or hover changes the primary width.
    pub fn span_casing_width(&self, feature_width: Option<f64>, hovered: bool) -> f64 {
        let base = feature_width.unwrap_or(self.span_width);
        if hovered {
            base * HOVER_SCALE + CASING_HOVER_EXTRA
        } else {
            base + CASING_EXTRA
        }
    }

    pub fn circle_radius(base: f64, hovered: bool) -> f64 {
        if hovered { base * HOVER_SCALE } else { base }
    }

    /// Whether a category's labels render at the given zoom.
    pub fn labels_at_zoom(&self, category: Category, zoom: f64) -> bool {
        if !self.labels_visible || !self.is_visible(category) {
            return false;
        }
        match category {
            Category::Span => zoom >= SPAN_LABEL_MIN_ZOOM,
            Category::Node => zoom >= NODE_LABEL_MIN_ZOOM,
            Category::Drop => zoom >= DROP_LABEL_MIN_ZOOM,
            Category::Zone => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmap_shared::Status;

    fn props(status: Status) -> FeatureProperties {
        FeatureProperties {
            id: "t1".into(),
            status,
            ..Default::default()
        }
    }

    #[test]
    fn status_color_is_the_default_paint() {
        let paint = resolve_paint(&props(Status::InProgress));
        assert_eq!(paint.color, (0x3B, 0x82, 0xF6));
        assert_eq!(paint.width, None);
    }

    #[test]
    fn explicit_override_beats_status_color() {
        let mut p = props(Status::Approved);
        p.style_color = Some("#FF6B6B".into());
        p.style_width = Some(6.0);
        let paint = resolve_paint(&p);
        assert_eq!(paint.color, (0xFF, 0x6B, 0x6B));
        assert_eq!(paint.width, Some(6.0));
    }

    #[test]
    fn malformed_override_falls_back_to_status_color() {
        let mut p = props(Status::Rework);
        p.style_color = Some("tomato".into());
        let paint = resolve_paint(&p);
        assert_eq!(paint.color, (0xEF, 0x44, 0x44));
    }

    #[test]
    fn hover_scales_width_without_touching_color() {
        let settings = LayerSettings::default();
        let normal = settings.span_line_width(None, false);
        let hovered = settings.span_line_width(None, true);
        assert_eq!(normal, DEFAULT_SPAN_WIDTH);
        assert_eq!(hovered, DEFAULT_SPAN_WIDTH * HOVER_SCALE);

        assert_eq!(settings.span_casing_width(None, false), DEFAULT_SPAN_WIDTH + 2.0);
        assert_eq!(
            settings.span_casing_width(None, true),
            DEFAULT_SPAN_WIDTH * HOVER_SCALE + 3.0
        );
    }

    #[test]
    fn width_slider_recomputes_hover_variant() {
        let mut settings = LayerSettings::default();
        settings.span_width = 8.0;
        assert_eq!(settings.span_line_width(None, true), 12.0);
        assert_eq!(settings.span_casing_width(None, true), 15.0);
    }

    #[test]
    fn span_stack_includes_casing_and_label() {
        let stack = layer_stack(Category::Span);
        assert_eq!(stack.first(), Some(&PaintLayer::Casing));
        assert!(stack.contains(&PaintLayer::Label));
        assert!(!layer_stack(Category::Zone).contains(&PaintLayer::Label));
    }

    #[test]
    fn visibility_toggle_covers_whole_stack() {
        let mut settings = LayerSettings::default();
        settings.set_visible(Category::Span, false);
        assert!(!settings.is_visible(Category::Span));
        // Labels are part of the stack: hidden category means no labels.
        assert!(!settings.labels_at_zoom(Category::Span, 16.0));

        settings.set_visible(Category::Span, true);
        assert!(settings.labels_at_zoom(Category::Span, 16.0));
    }

    #[test]
    fn labels_gate_on_min_zoom() {
        let settings = LayerSettings::default();
        assert!(!settings.labels_at_zoom(Category::Span, 14.5));
        assert!(settings.labels_at_zoom(Category::Span, 15.0));
        assert!(settings.labels_at_zoom(Category::Node, 14.0));
        assert!(!settings.labels_at_zoom(Category::Zone, 18.0));
    }

    #[test]
    fn opacity_is_clamped() {
        let mut settings = LayerSettings::default();
        settings.set_opacity(Category::Zone, 1.7);
        assert_eq!(settings.opacity(Category::Zone), 1.0);
        settings.set_opacity(Category::Zone, -0.2);
        assert_eq!(settings.opacity(Category::Zone), 0.0);
    }
}
