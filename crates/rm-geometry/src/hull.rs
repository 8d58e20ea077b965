use std::collections::VecDeque;

use nalgebra::Vector2;

use crate::chain::FeretValues;
use crate::error::{GeometryError, Result};
use crate::polygon::Polygon;

/// Convex hull: a polygon whose vertices are a counter-clockwise convex
/// traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull {
    polygon: Polygon,
}

#[inline]
fn cross(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> f64 {
    let ab = b - a;
    let ac = c - a;
    ab.x * ac.y - ab.y * ac.x
}

/// Rotate the vertex cycle so it starts at the lexicographically smallest
/// vertex; makes hull construction idempotent vertex-for-vertex.
fn canonicalize(mut verts: Vec<Vector2<f64>>) -> Vec<Vector2<f64>> {
    if verts.len() < 2 {
        return verts;
    }
    let mut first = 0;
    for i in 1..verts.len() {
        let (a, b) = (verts[i], verts[first]);
        if (a.x, a.y) < (b.x, b.y) {
            first = i;
        }
    }
    verts.rotate_left(first);
    verts
}

impl ConvexHull {
    /// Melkman's on-line hull of a simple polygon.
    ///
    /// The cross-product tolerance scales with the minimum adjacent-vertex
    /// distance so pixel-edge polygons and large augmented polygons are
    /// treated alike. All-collinear input fails with `DegenerateGeometry`;
    /// a deque collapse (self-intersecting input) with `SelfIntersecting`.
    pub fn from_polygon(polygon: &Polygon) -> Result<ConvexHull> {
        let mut verts: Vec<Vector2<f64>> = Vec::with_capacity(polygon.vertices.len());
        for &v in &polygon.vertices {
            if verts.last().map_or(true, |&last| (v - last).norm() > 0.0) {
                verts.push(v);
            }
        }
        if verts.len() > 1 && (verts[0] - verts[verts.len() - 1]).norm() == 0.0 {
            verts.pop();
        }
        let n = verts.len();
        if n <= 2 {
            return Ok(ConvexHull {
                polygon: Polygon::new(canonicalize(verts)),
            });
        }
        let min_dist = (0..n)
            .map(|i| (verts[(i + 1) % n] - verts[i]).norm())
            .fold(f64::INFINITY, f64::min);
        let eps = 1e-9 * min_dist;
        if n == 3 {
            if cross(verts[0], verts[1], verts[2]).abs() <= eps {
                return Err(GeometryError::DegenerateGeometry(
                    "all vertices collinear".to_string(),
                ));
            }
            let mut p = Polygon::new(verts);
            if p.is_clockwise() {
                p.reverse();
            }
            return Ok(ConvexHull {
                polygon: Polygon::new(canonicalize(p.vertices)),
            });
        }

        // Seed with the first three non-collinear vertices; of a collinear
        // triple only the two mutually-farthest points are kept.
        let mut seed: Vec<Vector2<f64>> = vec![verts[0]];
        let mut idx = 1;
        while idx < n {
            seed.push(verts[idx]);
            idx += 1;
            if seed.len() == 3 {
                if cross(seed[0], seed[1], seed[2]).abs() > eps {
                    break;
                }
                let d01 = (seed[1] - seed[0]).norm();
                let d02 = (seed[2] - seed[0]).norm();
                let d12 = (seed[2] - seed[1]).norm();
                if d01 >= d02 && d01 >= d12 {
                    seed.remove(2);
                } else if d02 >= d01 && d02 >= d12 {
                    seed.remove(1);
                } else {
                    seed.remove(0);
                }
            }
        }
        if seed.len() < 3 {
            return Err(GeometryError::DegenerateGeometry(
                "all vertices collinear".to_string(),
            ));
        }

        let mut dq: VecDeque<Vector2<f64>> = VecDeque::with_capacity(n + 1);
        if cross(seed[0], seed[1], seed[2]) > 0.0 {
            dq.extend([seed[2], seed[0], seed[1], seed[2]]);
        } else {
            dq.extend([seed[2], seed[1], seed[0], seed[2]]);
        }

        for &v in &verts[idx..] {
            let back_ok = cross(dq[dq.len() - 2], dq[dq.len() - 1], v) > eps;
            let front_ok = cross(dq[0], dq[1], v) > eps;
            if back_ok && front_ok {
                // v is inside the hull built so far.
                continue;
            }
            while cross(dq[dq.len() - 2], dq[dq.len() - 1], v) <= eps {
                dq.pop_back();
                if dq.len() < 2 {
                    return Err(GeometryError::SelfIntersecting(
                        "hull deque collapsed".to_string(),
                    ));
                }
            }
            dq.push_back(v);
            while cross(v, dq[0], dq[1]) <= eps {
                dq.pop_front();
                if dq.len() < 2 {
                    return Err(GeometryError::SelfIntersecting(
                        "hull deque collapsed".to_string(),
                    ));
                }
            }
            dq.push_front(v);
        }
        // Drop the duplicated sentinel.
        dq.pop_back();
        Ok(ConvexHull {
            polygon: Polygon::new(canonicalize(dq.into_iter().collect())),
        })
    }

    pub fn vertices(&self) -> &[Vector2<f64>] {
        &self.polygon.vertices
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn area(&self) -> f64 {
        self.polygon.area()
    }

    pub fn perimeter(&self) -> f64 {
        self.polygon.perimeter()
    }

    /// Feret diameters by rotating callipers (Preparata & Shamos).
    ///
    /// Returns the maximum vertex-to-vertex distance, the minimum width over
    /// antipodal edge-vertex configurations, the extent along the minimum
    /// width's caliper direction, and the angles at which the extrema
    /// occurred. Hulls of one or two vertices degenerate to the one-pixel
    /// small-object convention.
    pub fn feret(&self) -> FeretValues {
        let verts = &self.polygon.vertices;
        let n = verts.len();
        if n == 0 {
            return FeretValues {
                max_diameter: f64::NAN,
                min_diameter: f64::NAN,
                max_perpendicular: f64::NAN,
                max_angle: 0.0,
                min_angle: 0.0,
            };
        }
        if n <= 2 {
            let (diameter, angle) = if n == 2 {
                let d = verts[1] - verts[0];
                (d.norm().max(1.0), d.y.atan2(d.x))
            } else {
                (1.0, 0.0)
            };
            return FeretValues {
                max_diameter: diameter,
                min_diameter: 1.0,
                max_perpendicular: diameter,
                max_angle: angle,
                min_angle: angle + std::f64::consts::FRAC_PI_2,
            };
        }

        let area2 = |a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>| cross(a, b, c).abs();
        let mut max_diameter = 0.0;
        let mut max_angle = 0.0;
        let mut min_diameter = f64::INFINITY;
        let mut min_angle = 0.0;
        let mut j = 1usize;
        for i in 0..n {
            let a = verts[i];
            let b = verts[(i + 1) % n];
            // Advance the antipodal vertex to the one farthest from edge ab.
            let mut guard = 0;
            while area2(a, b, verts[(j + 1) % n]) > area2(a, b, verts[j % n]) && guard <= n {
                j += 1;
                guard += 1;
            }
            let p = verts[j % n];
            let edge = b - a;
            let edge_len = edge.norm();
            if edge_len > 0.0 {
                let height = area2(a, b, p) / edge_len;
                if height < min_diameter {
                    min_diameter = height;
                    min_angle = edge.y.atan2(edge.x);
                }
            }
            for q in [a, b] {
                let d = p - q;
                let dist = d.norm();
                if dist > max_diameter {
                    max_diameter = dist;
                    max_angle = d.y.atan2(d.x);
                }
            }
        }
        // Extent along the caliper direction of the minimum width.
        let dir = Vector2::new(min_angle.cos(), min_angle.sin());
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for v in verts {
            let t = v.dot(&dir);
            lo = lo.min(t);
            hi = hi.max(t);
        }
        FeretValues {
            max_diameter,
            min_diameter,
            max_perpendicular: hi - lo,
            max_angle,
            min_angle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn polygon(points: &[(f64, f64)]) -> Polygon {
        Polygon::new(points.iter().map(|&(x, y)| Vector2::new(x, y)).collect())
    }

    #[test]
    fn test_hull_of_convex_square() {
        let p = polygon(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
        let hull = p.convex_hull().unwrap();
        assert_eq!(hull.vertices().len(), 4);
        assert_relative_eq!(hull.area(), 4.0);
        assert!(!hull.polygon().is_clockwise());
    }

    #[test]
    fn test_hull_drops_concave_vertex() {
        let p = polygon(&[
            (0.0, 0.0),
            (2.0, 0.0),
            (1.0, 0.5), // dent
            (2.0, 2.0),
            (0.0, 2.0),
        ]);
        let hull = p.convex_hull().unwrap();
        assert_eq!(hull.vertices().len(), 4);
        assert_relative_eq!(hull.area(), 4.0);
        assert!(hull.area() >= p.area());
    }

    #[test]
    fn test_hull_collinear_fails() {
        let p = polygon(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        match p.convex_hull() {
            Err(GeometryError::DegenerateGeometry(_)) => {}
            other => panic!("expected degenerate geometry, got {other:?}"),
        }
    }

    #[test]
    fn test_hull_idempotent() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut verts = Vec::new();
        for k in 0..24 {
            let a = f64::from(k) * std::f64::consts::TAU / 24.0;
            let r = rng.gen_range(0.5..2.0);
            verts.push(Vector2::new(r * a.cos(), r * a.sin()));
        }
        let hull = Polygon::new(verts).convex_hull().unwrap();
        let again = hull.polygon().convex_hull().unwrap();
        assert_eq!(hull.vertices(), again.vertices());
    }

    #[test]
    fn test_hull_area_dominates_polygon() {
        let mut rng = StdRng::seed_from_u64(7);
        for seed in 0..20 {
            let mut verts = Vec::new();
            let n = 6 + seed % 9;
            for k in 0..n {
                let a = f64::from(k) * std::f64::consts::TAU / f64::from(n);
                let r = rng.gen_range(0.2..2.0);
                verts.push(Vector2::new(r * a.cos(), r * a.sin()));
            }
            let p = Polygon::new(verts);
            let hull = p.convex_hull().unwrap();
            assert!(hull.area() >= p.area() - 1e-9);
            assert!(hull.polygon().contains(p.centroid()));
        }
    }

    #[test]
    fn test_feret_square() {
        let hull = polygon(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)])
            .convex_hull()
            .unwrap();
        let f = hull.feret();
        assert_relative_eq!(f.max_diameter, 2.0 * 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(f.min_diameter, 2.0, epsilon = 1e-12);
        assert_relative_eq!(f.max_perpendicular, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_feret_matches_chain_rotation_method() {
        // Cross-check the callipers against the brute-force projection sweep.
        use crate::chain::{ChainCode, Code, Connectivity};
        let cc = ChainCode {
            start: (0, 0),
            codes: [0, 0, 6, 6, 4, 4, 2, 2]
                .iter()
                .map(|&d| Code::new(d, false))
                .collect(),
            connectivity: Connectivity::Eight,
            object_id: 1,
        };
        let brute = cc.feret(1e-3);
        let hull = Polygon::new(cc.vertices()).convex_hull().unwrap();
        let exact = hull.feret();
        assert_relative_eq!(brute.max_diameter, exact.max_diameter, epsilon = 1e-2);
        assert_relative_eq!(brute.min_diameter, exact.min_diameter, epsilon = 1e-2);
    }

    #[test]
    fn test_feret_two_vertices_convention() {
        let hull = polygon(&[(0.0, 0.0), (3.0, 0.0)]).convex_hull().unwrap();
        let f = hull.feret();
        assert_relative_eq!(f.max_diameter, 3.0);
        assert_relative_eq!(f.min_diameter, 1.0);
    }

    #[test]
    fn test_single_vertex_convention() {
        let hull = polygon(&[(5.0, 5.0)]).convex_hull().unwrap();
        let f = hull.feret();
        assert_relative_eq!(f.max_diameter, 1.0);
        assert_relative_eq!(f.min_diameter, 1.0);
    }
}
