use fieldmap_shared::{BoundingBox, LngLat};

/// Size of the Mercator world in world units at zoom 0.
pub const WORLD_SIZE: f64 = 256.0;

const MIN_ZOOM: f64 = 2.0;
const MAX_ZOOM: f64 = 19.0;
const ZOOM_SENSITIVITY: f64 = 0.0015;
const FIT_PADDING: f64 = 0.08;
const FIT_MAX_ZOOM: f64 = 17.0;

/// Poles are unrepresentable in Web Mercator.
const MAX_MERCATOR_LAT: f64 = 85.05113;

/// Viewport manages the pan/zoom transformation from geographic coordinates
/// to screen pixels. World coordinates are Web-Mercator units at zoom 0;
/// `scale` is `2^zoom`, so `screen = world * scale + offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            // zoom 14; callers re-center via set_camera once canvas size is known
            scale: 16384.0,
        }
    }
}

/// Project a lon/lat coordinate into zoom-0 Mercator world units.
pub fn project(p: LngLat) -> (f64, f64) {
    let lat = p.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = (p.lng + 180.0) / 360.0 * WORLD_SIZE;
    let siny = lat.to_radians().sin();
    let y = (0.5 - ((1.0 + siny) / (1.0 - siny)).ln() / (4.0 * std::f64::consts::PI)) * WORLD_SIZE;
    (x, y)
}

/// Inverse of [`project`].
pub fn unproject(wx: f64, wy: f64) -> LngLat {
    let lng = wx / WORLD_SIZE * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * wy / WORLD_SIZE);
    let lat = n.sinh().atan().to_degrees();
    LngLat::new(lng, lat)
}

impl Viewport {
    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (
            wx * self.scale + self.offset_x,
            wy * self.scale + self.offset_y,
        )
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.offset_x) / self.scale,
            (sy - self.offset_y) / self.scale,
        )
    }

    /// Screen position of a geographic coordinate.
    pub fn lnglat_to_screen(&self, p: LngLat) -> (f64, f64) {
        let (wx, wy) = project(p);
        self.world_to_screen(wx, wy)
    }

    /// Geographic coordinate under a screen position.
    pub fn screen_to_lnglat(&self, sx: f64, sy: f64) -> LngLat {
        let (wx, wy) = self.screen_to_world(sx, sy);
        unproject(wx, wy)
    }

    pub fn zoom(&self) -> f64 {
        self.scale.log2()
    }

    /// Zoom toward a focus point (screen coordinates).
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        let factor = (-delta * ZOOM_SENSITIVITY).exp();
        let new_scale = (self.scale * factor).clamp(MIN_ZOOM.exp2(), MAX_ZOOM.exp2());
        let ratio = new_scale / self.scale;

        // Keep the point under the cursor fixed
        self.offset_x = screen_x - (screen_x - self.offset_x) * ratio;
        self.offset_y = screen_y - (screen_y - self.offset_y) * ratio;
        self.scale = new_scale;
    }

    /// Pan by screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Center the viewport on a coordinate at a given zoom level.
    pub fn set_camera(&mut self, center: LngLat, zoom: f64, canvas_w: f64, canvas_h: f64) {
        self.scale = zoom.clamp(MIN_ZOOM, MAX_ZOOM).exp2();
        let (wx, wy) = project(center);
        self.offset_x = canvas_w / 2.0 - wx * self.scale;
        self.offset_y = canvas_h / 2.0 - wy * self.scale;
    }

    /// Geographic coordinate at the center of the canvas.
    pub fn center(&self, canvas_w: f64, canvas_h: f64) -> LngLat {
        self.screen_to_lnglat(canvas_w / 2.0, canvas_h / 2.0)
    }

    /// Fit the viewport to a geographic extent with padding.
    pub fn fit_bounds(&mut self, bbox: &BoundingBox, canvas_w: f64, canvas_h: f64) {
        if canvas_w <= 0.0 || canvas_h <= 0.0 {
            return;
        }

        let (min_x, max_y) = project(LngLat::new(bbox.west, bbox.south));
        let (max_x, min_y) = project(LngLat::new(bbox.east, bbox.north));
        let world_w = max_x - min_x;
        let world_h = max_y - min_y;

        let scale = if world_w <= 0.0 && world_h <= 0.0 {
            // Degenerate extent (single point), fall back to a close-in zoom.
            FIT_MAX_ZOOM.exp2()
        } else {
            let scale_x = canvas_w / (world_w.max(f64::EPSILON) * (1.0 + FIT_PADDING * 2.0));
            let scale_y = canvas_h / (world_h.max(f64::EPSILON) * (1.0 + FIT_PADDING * 2.0));
            scale_x.min(scale_y)
        };
        self.scale = scale.clamp(MIN_ZOOM.exp2(), FIT_MAX_ZOOM.exp2());

        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;
        self.offset_x = canvas_w / 2.0 - center_x * self.scale;
        self.offset_y = canvas_h / 2.0 - center_y * self.scale;
    }

    /// Geographic extent currently visible: `west,south,east,north`.
    pub fn bounds(&self, canvas_w: f64, canvas_h: f64) -> BoundingBox {
        let top_left = self.screen_to_lnglat(0.0, 0.0);
        let bottom_right = self.screen_to_lnglat(canvas_w, canvas_h);
        BoundingBox::new(
            top_left.lng,
            bottom_right.lat,
            bottom_right.lng,
            top_left.lat,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn project_unproject_round_trip() {
        let p = LngLat::new(-97.7431, 30.2672);
        let (wx, wy) = project(p);
        let back = unproject(wx, wy);
        assert!(close(back.lng, p.lng, 1e-9));
        assert!(close(back.lat, p.lat, 1e-9));
    }

    #[test]
    fn set_camera_centers_the_coordinate() {
        let mut vp = Viewport::default();
        let center = LngLat::new(-97.7431, 30.2672);
        vp.set_camera(center, 14.0, 1200.0, 800.0);
        let (sx, sy) = vp.lnglat_to_screen(center);
        assert!(close(sx, 600.0, 1e-6));
        assert!(close(sy, 400.0, 1e-6));
        assert!(close(vp.zoom(), 14.0, 1e-9));
    }

    #[test]
    fn zoom_at_keeps_cursor_point_fixed() {
        let mut vp = Viewport::default();
        vp.set_camera(LngLat::new(-97.7431, 30.2672), 14.0, 1200.0, 800.0);
        let anchor = vp.screen_to_lnglat(300.0, 200.0);

        vp.zoom_at(-240.0, 300.0, 200.0);
        let after = vp.screen_to_lnglat(300.0, 200.0);
        assert!(close(after.lng, anchor.lng, 1e-9));
        assert!(close(after.lat, anchor.lat, 1e-9));
        assert!(vp.zoom() > 14.0);
    }

    #[test]
    fn pan_shifts_bounds() {
        let mut vp = Viewport::default();
        vp.set_camera(LngLat::new(-97.7431, 30.2672), 14.0, 1200.0, 800.0);
        let before = vp.bounds(1200.0, 800.0);
        vp.pan(100.0, 0.0);
        let after = vp.bounds(1200.0, 800.0);
        // Panning the content right moves the visible extent west.
        assert!(after.west < before.west);
        assert!(close(after.north, before.north, 1e-9));
    }

    #[test]
    fn fit_bounds_contains_the_extent() {
        let mut vp = Viewport::default();
        let bbox = BoundingBox::new(-97.80, 30.20, -97.70, 30.30);
        vp.fit_bounds(&bbox, 1200.0, 800.0);

        let visible = vp.bounds(1200.0, 800.0);
        assert!(visible.west < bbox.west);
        assert!(visible.east > bbox.east);
        assert!(visible.south < bbox.south);
        assert!(visible.north > bbox.north);
    }

    #[test]
    fn fit_bounds_caps_zoom_for_tiny_extents() {
        let mut vp = Viewport::default();
        let bbox = BoundingBox::new(-97.7432, 30.2671, -97.7431, 30.2672);
        vp.fit_bounds(&bbox, 1200.0, 800.0);
        assert!(vp.zoom() <= 17.0 + 1e-9);
    }
}
