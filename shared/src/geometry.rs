use serde::{Deserialize, Serialize};

/// Mean earth radius in meters, used for great-circle length.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Equatorial radius in meters, used for spherical polygon area.
const AREA_RADIUS_M: f64 = 6_378_137.0;

/// A longitude/latitude pair in degrees (WGS84), GeoJSON axis order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl From<[f64; 2]> for LngLat {
    fn from(pair: [f64; 2]) -> Self {
        Self {
            lng: pair[0],
            lat: pair[1],
        }
    }
}

/// GeoJSON geometry, restricted to the types the map layer endpoint emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    LineString { coordinates: Vec<[f64; 2]> },
    MultiLineString { coordinates: Vec<Vec<[f64; 2]>> },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

impl Geometry {
    pub fn is_line_like(&self) -> bool {
        matches!(self, Self::LineString { .. } | Self::MultiLineString { .. })
    }

    pub fn is_polygon_like(&self) -> bool {
        matches!(self, Self::Polygon { .. } | Self::MultiPolygon { .. })
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Self::Point { .. })
    }

    /// Visit every coordinate in the geometry.
    pub fn for_each_coord(&self, mut f: impl FnMut(LngLat)) {
        match self {
            Self::Point { coordinates } => f((*coordinates).into()),
            Self::LineString { coordinates } => {
                for c in coordinates {
                    f((*c).into());
                }
            }
            Self::MultiLineString { coordinates } => {
                for line in coordinates {
                    for c in line {
                        f((*c).into());
                    }
                }
            }
            Self::Polygon { coordinates } => {
                for ring in coordinates {
                    for c in ring {
                        f((*c).into());
                    }
                }
            }
            Self::MultiPolygon { coordinates } => {
                for poly in coordinates {
                    for ring in poly {
                        for c in ring {
                            f((*c).into());
                        }
                    }
                }
            }
        }
    }

    /// Axis-aligned extent of this geometry, or `None` if it has no coordinates.
    pub fn bbox(&self) -> Option<BoundingBox> {
        let mut bbox: Option<BoundingBox> = None;
        self.for_each_coord(|c| match bbox {
            Some(ref mut b) => b.expand(c),
            None => bbox = Some(BoundingBox::at(c)),
        });
        bbox
    }

    /// Total great-circle length in meters (0 for points and polygons).
    pub fn length_m(&self) -> f64 {
        match self {
            Self::LineString { coordinates } => {
                line_length_m(&coordinates.iter().map(|&c| c.into()).collect::<Vec<_>>())
            }
            Self::MultiLineString { coordinates } => coordinates
                .iter()
                .map(|line| line_length_m(&line.iter().map(|&c| c.into()).collect::<Vec<_>>()))
                .sum(),
            _ => 0.0,
        }
    }

    /// Surface area in square meters (0 for points and lines).
    /// Holes are subtracted from their outer ring.
    pub fn area_sqm(&self) -> f64 {
        fn poly_area(rings: &[Vec<[f64; 2]>]) -> f64 {
            let mut area = 0.0;
            for (i, ring) in rings.iter().enumerate() {
                let coords: Vec<LngLat> = ring.iter().map(|&c| c.into()).collect();
                let ring_area = ring_area_sqm(&coords);
                if i == 0 {
                    area += ring_area;
                } else {
                    area -= ring_area;
                }
            }
            area.max(0.0)
        }

        match self {
            Self::Polygon { coordinates } => poly_area(coordinates),
            Self::MultiPolygon { coordinates } => coordinates.iter().map(|p| poly_area(p)).sum(),
            _ => 0.0,
        }
    }
}

/// Axis-aligned longitude/latitude extent: `west,south,east,north`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub const fn at(p: LngLat) -> Self {
        Self {
            west: p.lng,
            south: p.lat,
            east: p.lng,
            north: p.lat,
        }
    }

    pub fn expand(&mut self, p: LngLat) {
        self.west = self.west.min(p.lng);
        self.south = self.south.min(p.lat);
        self.east = self.east.max(p.lng);
        self.north = self.north.max(p.lat);
    }

    pub fn contains(&self, p: LngLat) -> bool {
        p.lng >= self.west && p.lng <= self.east && p.lat >= self.south && p.lat <= self.north
    }

    /// Whether `other` lies entirely within this box.
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        other.west >= self.west
            && other.east <= self.east
            && other.south >= self.south
            && other.north <= self.north
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}

/// Combined extent of a set of geometries, or `None` if none carry coordinates.
pub fn bounding_box<'a>(geometries: impl IntoIterator<Item = &'a Geometry>) -> Option<BoundingBox> {
    let mut bbox: Option<BoundingBox> = None;
    for geometry in geometries {
        if let Some(gb) = geometry.bbox() {
            match bbox {
                Some(ref mut b) => {
                    b.expand(LngLat::new(gb.west, gb.south));
                    b.expand(LngLat::new(gb.east, gb.north));
                }
                None => bbox = Some(gb),
            }
        }
    }
    bbox
}

/// Great-circle distance between two coordinates in meters (haversine).
pub fn haversine_m(a: LngLat, b: LngLat) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Length of a path in meters: the sum of great-circle segment distances.
/// Monotonically non-decreasing as vertices are appended.
pub fn line_length_m(coords: &[LngLat]) -> f64 {
    coords
        .windows(2)
        .map(|pair| haversine_m(pair[0], pair[1]))
        .sum()
}

/// Unsigned area of a ring in square meters via spherical excess
/// (Chamberlain & Duquette). The ring may be open or closed; a trailing
/// duplicate of the first vertex is ignored.
pub fn ring_area_sqm(coords: &[LngLat]) -> f64 {
    let mut ring = coords;
    if ring.len() >= 2 && ring[0] == ring[ring.len() - 1] {
        ring = &ring[..ring.len() - 1];
    }
    if ring.len() < 3 {
        return 0.0;
    }

    let n = ring.len();
    let mut total = 0.0;
    for i in 0..n {
        let lower = ring[i];
        let middle = ring[(i + 1) % n];
        let upper = ring[(i + 2) % n];
        total += (upper.lng.to_radians() - lower.lng.to_radians()) * middle.lat.to_radians().sin();
    }

    (total * AREA_RADIUS_M * AREA_RADIUS_M / 2.0).abs()
}

/// Point-in-ring test by ray casting. The ring may be open or closed.
pub fn point_in_ring(p: LngLat, ring: &[LngLat]) -> bool {
    let mut coords = ring;
    if coords.len() >= 2 && coords[0] == coords[coords.len() - 1] {
        coords = &coords[..coords.len() - 1];
    }
    if coords.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = coords.len();
    let mut j = n - 1;
    for i in 0..n {
        let a = coords[i];
        let b = coords[j];
        if (a.lat > p.lat) != (b.lat > p.lat)
            && p.lng < (b.lng - a.lng) * (p.lat - a.lat) / (b.lat - a.lat) + a.lng
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
