// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Point-in-polygon tests for outlook geometries.
//!
//! Coordinates follow GeoJSON order: `x` is longitude, `y` is latitude.
//! Callers holding a `(lat, lon)` pair must swap it before calling in.
//!
//! Points lying exactly on an edge have no defined classification under
//! ray casting and may land on either side.

use serde_json::Value;

/// Denominator used in place of zero for horizontal edges.
const EDGE_EPSILON: f64 = 1e-12;

/// One closed ring of `[x, y]` positions.
pub type Ring = Vec<[f64; 2]>;

/// Outer boundary first, then holes.
pub type Polygon = Vec<Ring>;

/// Ray-casting test of a point against one ring.
///
/// Rings with fewer than three vertices never contain anything.
#[must_use]
pub fn point_in_ring(x: f64, y: f64, ring: &[[f64; 2]]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    for i in 0..n {
        let [x1, y1] = ring[i];
        let [x2, y2] = ring[(i + 1) % n];

        if (y1 > y) != (y2 > y) {
            let dy = if y2 - y1 == 0.0 { EDGE_EPSILON } else { y2 - y1 };
            let x_cross = (x2 - x1) * (y - y1) / dy + x1;
            if x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// Inside the outer ring and outside every hole.
#[must_use]
pub fn point_in_polygon(x: f64, y: f64, rings: &[Ring]) -> bool {
    let Some((outer, holes)) = rings.split_first() else {
        return false;
    };
    point_in_ring(x, y, outer) && !holes.iter().any(|hole| point_in_ring(x, y, hole))
}

/// Inside any constituent polygon.
#[must_use]
pub fn point_in_multipolygon(x: f64, y: f64, polygons: &[Polygon]) -> bool {
    polygons.iter().any(|rings| point_in_polygon(x, y, rings))
}

/// Area geometry of an outlook feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    /// Parse a GeoJSON geometry object.
    ///
    /// Returns `None` for missing coordinates and for non-areal types
    /// (points and lines can never contain a location). Positions with
    /// fewer than two numbers are dropped; a third (altitude) number is
    /// ignored.
    #[must_use]
    pub fn from_json(geometry: &Value) -> Option<Self> {
        let coordinates = geometry.get("coordinates")?;
        match geometry.get("type")?.as_str()? {
            "Polygon" => parse_polygon(coordinates).map(Self::Polygon),
            "MultiPolygon" => coordinates
                .as_array()?
                .iter()
                .map(parse_polygon)
                .collect::<Option<Vec<_>>>()
                .map(Self::MultiPolygon),
            _ => None,
        }
    }

    /// Whether the geometry contains the point. Note the `(lon, lat)` order.
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        match self {
            Self::Polygon(rings) => point_in_polygon(lon, lat, rings),
            Self::MultiPolygon(polygons) => point_in_multipolygon(lon, lat, polygons),
        }
    }
}

fn parse_polygon(value: &Value) -> Option<Polygon> {
    value.as_array()?.iter().map(parse_ring).collect()
}

fn parse_ring(value: &Value) -> Option<Ring> {
    Some(
        value
            .as_array()?
            .iter()
            .filter_map(|position| {
                let position = position.as_array()?;
                let x = position.first()?.as_f64()?;
                let y = position.get(1)?.as_f64()?;
                Some([x, y])
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Axis-aligned box as a closed ring.
    fn square(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Ring {
        vec![
            [min_x, min_y],
            [max_x, min_y],
            [max_x, max_y],
            [min_x, max_y],
            [min_x, min_y],
        ]
    }

    #[test]
    fn test_point_in_ring() {
        let ring = square(0.0, 0.0, 10.0, 10.0);
        assert!(point_in_ring(5.0, 5.0, &ring));
        assert!(point_in_ring(0.5, 9.5, &ring));
        assert!(!point_in_ring(15.0, 5.0, &ring));
        assert!(!point_in_ring(5.0, -1.0, &ring));
    }

    #[test]
    fn test_open_ring_same_as_closed() {
        let mut ring = square(0.0, 0.0, 10.0, 10.0);
        ring.pop();
        assert!(point_in_ring(5.0, 5.0, &ring));
        assert!(!point_in_ring(11.0, 5.0, &ring));
    }

    #[test]
    fn test_concave_ring() {
        // U shape opening upward; the notch is outside.
        let ring = vec![
            [0.0, 0.0],
            [9.0, 0.0],
            [9.0, 9.0],
            [6.0, 9.0],
            [6.0, 3.0],
            [3.0, 3.0],
            [3.0, 9.0],
            [0.0, 9.0],
        ];
        assert!(point_in_ring(1.0, 8.0, &ring));
        assert!(point_in_ring(4.5, 1.0, &ring));
        assert!(!point_in_ring(4.5, 6.0, &ring));
    }

    #[test]
    fn test_degenerate_rings_never_contain() {
        assert!(!point_in_ring(0.0, 0.0, &[]));
        assert!(!point_in_ring(0.0, 0.0, &[[0.0, 0.0], [1.0, 1.0]]));
        // Collinear vertices enclose no area.
        assert!(!point_in_ring(1.0, 1.0, &[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]));
    }

    #[test]
    fn test_horizontal_edges_do_not_panic() {
        let ring = vec![[0.0, 0.0], [4.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]];
        assert!(point_in_ring(2.0, 2.0, &ring));
        // Ray along the bottom edge.
        let _ = point_in_ring(2.0, 0.0, &ring);
    }

    #[test]
    fn test_polygon_hole_excluded() {
        let rings = vec![square(0.0, 0.0, 10.0, 10.0), square(4.0, 4.0, 6.0, 6.0)];
        assert!(point_in_polygon(2.0, 2.0, &rings));
        assert!(!point_in_polygon(5.0, 5.0, &rings));
        assert!(!point_in_polygon(12.0, 5.0, &rings));
    }

    #[test]
    fn test_polygon_inside_every_hole_case() {
        let outer = square(0.0, 0.0, 20.0, 20.0);
        let holes = [square(1.0, 1.0, 3.0, 3.0), square(10.0, 10.0, 12.0, 12.0)];
        let mut rings = vec![outer];
        rings.extend(holes.iter().cloned());

        for hole in &holes {
            let [cx, cy] = [(hole[0][0] + hole[2][0]) / 2.0, (hole[0][1] + hole[2][1]) / 2.0];
            assert!(!point_in_polygon(cx, cy, &rings));
        }
        assert!(point_in_polygon(6.0, 6.0, &rings));
    }

    #[test]
    fn test_empty_polygon() {
        assert!(!point_in_polygon(0.0, 0.0, &[]));
    }

    #[test]
    fn test_multipolygon_is_or_of_parts() {
        let west = vec![square(-10.0, 0.0, -5.0, 5.0)];
        let east = vec![square(5.0, 0.0, 10.0, 5.0)];
        let parts = vec![west.clone(), east.clone()];

        for (x, y) in [(-7.0, 2.0), (7.0, 2.0), (0.0, 2.0), (7.0, 9.0)] {
            let expected = point_in_polygon(x, y, &west) || point_in_polygon(x, y, &east);
            assert_eq!(point_in_multipolygon(x, y, &parts), expected, "({x}, {y})");
        }
    }

    #[test]
    fn test_disjoint_part_never_removes_containment() {
        let base = vec![vec![square(0.0, 0.0, 1.0, 1.0)]];
        assert!(point_in_multipolygon(0.5, 0.5, &base));

        let mut extended = base.clone();
        extended.push(vec![square(50.0, 50.0, 51.0, 51.0)]);
        assert!(point_in_multipolygon(0.5, 0.5, &extended));
        assert!(point_in_multipolygon(50.5, 50.5, &extended));
    }

    #[test]
    fn test_lon_lat_order_matters() {
        // Box around Norman, OK: lon -98..-97, lat 35..36.
        let geometry = Geometry::Polygon(vec![square(-98.0, 35.0, -97.0, 36.0)]);
        let (lat, lon) = (35.22, -97.44);
        assert!(geometry.contains(lon, lat));
        // Swapped order lands in the Southern Ocean.
        assert!(!geometry.contains(lat, lon));
    }

    #[test]
    fn test_geometry_from_json() {
        let polygon = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [4.0, 0.0, 120.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]]]
        });
        let geometry = Geometry::from_json(&polygon).unwrap();
        assert!(geometry.contains(2.0, 2.0));

        let multi = json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]],
                [[[5, 5], [6, 5], [6, 6], [5, 6], [5, 5]]]
            ]
        });
        let geometry = Geometry::from_json(&multi).unwrap();
        assert!(geometry.contains(5.5, 5.5));
        assert!(!geometry.contains(3.0, 3.0));
    }

    #[test]
    fn test_geometry_from_json_rejects_non_areal() {
        assert!(Geometry::from_json(&json!({"type": "Point", "coordinates": [1.0, 2.0]})).is_none());
        assert!(Geometry::from_json(&json!({"type": "Polygon"})).is_none());
        assert!(Geometry::from_json(&Value::Null).is_none());
    }
}
