use fieldmap_shared::{LngLat, line_length_m, ring_area_sqm};

use crate::fmt::format_number;

pub const FT_PER_M: f64 = 3.280_84;
pub const SQFT_PER_SQM: f64 = 10.7639;

/// A freehand measurement session: the ordered coordinates clicked while
/// Measure mode is active. Cleared on mode exit or explicit clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureSession {
    points: Vec<LngLat>,
}

impl MeasureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: LngLat) {
        self.points.push(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[LngLat] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Open-path length in meters, once two points exist.
    pub fn length_m(&self) -> Option<f64> {
        (self.points.len() >= 2).then(|| line_length_m(&self.points))
    }

    /// Area of the implicitly closed path in square meters, once three
    /// points exist.
    pub fn area_sqm(&self) -> Option<f64> {
        (self.points.len() >= 3).then(|| ring_area_sqm(&self.points))
    }

    /// Banner text: computed in metric, displayed in imperial plus metric.
    /// Length and area round to whole feet; meters show one decimal.
    pub fn banner_text(&self) -> Option<String> {
        let length_m = self.length_m()?;
        let mut text = format!(
            "Distance: {} ft ({:.1} m)",
            format_number(length_m * FT_PER_M),
            length_m
        );
        if let Some(area) = self.area_sqm() {
            text.push_str(&format!(" | Area: {} sq ft", format_number(area * SQFT_PER_SQM)));
        }
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmap_shared::geometry::EARTH_RADIUS_M;

    const M_PER_DEG: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

    fn offset(origin: LngLat, east_m: f64, north_m: f64) -> LngLat {
        LngLat::new(
            origin.lng + east_m / (M_PER_DEG * origin.lat.to_radians().cos()),
            origin.lat + north_m / M_PER_DEG,
        )
    }

    #[test]
    fn no_results_until_enough_points() {
        let mut session = MeasureSession::new();
        assert!(session.banner_text().is_none());

        session.push(LngLat::new(-97.7431, 30.2672));
        assert!(session.length_m().is_none());
        assert!(session.banner_text().is_none());
    }

    #[test]
    fn right_triangle_scenario() {
        // Legs ~300 ft and ~400 ft: closing the triangle reports a ~500 ft
        // hypotenuse and ~60,000 sq ft area, both within 1%.
        let a = LngLat::new(-97.7431, 30.2672);
        let b = offset(a, 300.0 / FT_PER_M, 0.0);
        let c = offset(b, 0.0, 400.0 / FT_PER_M);

        let mut session = MeasureSession::new();
        session.push(a);
        session.push(b);
        session.push(c);

        let length_ft = session.length_m().expect("length") * FT_PER_M;
        assert!((length_ft - 700.0).abs() / 700.0 < 0.01);

        let area_sqft = session.area_sqm().expect("area") * SQFT_PER_SQM;
        assert!((area_sqft - 60_000.0).abs() / 60_000.0 < 0.01);

        let banner = session.banner_text().expect("banner");
        assert!(banner.starts_with("Distance: "), "{banner}");
        assert!(banner.contains(" | Area: "), "{banner}");
        assert!(banner.contains(" sq ft"), "{banner}");
    }

    #[test]
    fn length_and_area_are_monotonic_without_backtracking() {
        let origin = LngLat::new(-97.7431, 30.2672);
        let mut session = MeasureSession::new();
        session.push(origin);
        session.push(offset(origin, 100.0, 0.0));
        session.push(offset(origin, 100.0, 80.0));

        let mut prev_len = session.length_m().expect("length");
        let mut prev_area = session.area_sqm().expect("area");
        assert!(prev_area > 0.0);

        // Extending outward along the convex hull grows both measures.
        for (east, north) in [(40.0, 160.0), (-60.0, 170.0)] {
            session.push(offset(origin, east, north));
            let len = session.length_m().expect("length");
            let area = session.area_sqm().expect("area");
            assert!(len >= prev_len);
            assert!(area >= prev_area);
            prev_len = len;
            prev_area = area;
        }
    }

    #[test]
    fn meters_render_with_one_decimal() {
        let a = LngLat::new(-97.7431, 30.2672);
        let b = offset(a, 123.456, 0.0);
        let mut session = MeasureSession::new();
        session.push(a);
        session.push(b);

        let banner = session.banner_text().expect("banner");
        assert!(banner.contains("(123.5 m)"), "{banner}");
    }

    #[test]
    fn clear_resets_the_session() {
        let mut session = MeasureSession::new();
        session.push(LngLat::new(-97.7431, 30.2672));
        session.push(LngLat::new(-97.7421, 30.2672));
        assert!(session.banner_text().is_some());

        session.clear();
        assert!(session.is_empty());
        assert!(session.banner_text().is_none());
    }
}
