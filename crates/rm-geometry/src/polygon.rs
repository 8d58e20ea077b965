use nalgebra::{Matrix2, Matrix3, Matrix5, Vector2, Vector3, Vector5};
use rm_accum::{MinMaxAccumulator, VarianceAccumulator};

use crate::hull::ConvexHull;
use crate::error::Result;

/// Closed polygon over 2-D float vertices.
///
/// The edge from the last vertex back to the first is implicit. Orientation
/// follows the mathematical convention: positive signed area is
/// counter-clockwise.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub vertices: Vec<Vector2<f64>>,
}

/// Vertex-to-centroid distance statistics of a boundary polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusValues {
    pub max: f64,
    pub mean: f64,
    pub min: f64,
    pub var: f64,
}

/// Least-squares circle fit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CircleParameters {
    pub center: Vector2<f64>,
    pub diameter: f64,
}

/// Least-squares ellipse fit. All-zero when the fit does not describe an
/// ellipse.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EllipseParameters {
    pub center: Vector2<f64>,
    pub major_axis: f64,
    pub minor_axis: f64,
    pub orientation: f64,
}

impl Polygon {
    pub fn new(vertices: Vec<Vector2<f64>>) -> Polygon {
        Polygon { vertices }
    }

    /// Signed area: half the sum of cross products of consecutive vertices.
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        sum / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Sum of edge lengths, closing edge included.
    pub fn perimeter(&self) -> f64 {
        let n = self.vertices.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| (self.vertices[(i + 1) % n] - self.vertices[i]).norm())
            .sum()
    }

    /// Area-weighted centroid; falls back to the vertex mean for degenerate
    /// (zero-area) polygons.
    pub fn centroid(&self) -> Vector2<f64> {
        let n = self.vertices.len();
        if n == 0 {
            return Vector2::zeros();
        }
        let area = self.signed_area();
        if area.abs() < 1e-12 {
            return self.vertices.iter().sum::<Vector2<f64>>() / n as f64;
        }
        let mut c = Vector2::zeros();
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let cross = a.x * b.y - b.x * a.y;
            c += (a + b) * cross;
        }
        c / (6.0 * area)
    }

    pub fn is_clockwise(&self) -> bool {
        self.signed_area() < 0.0
    }

    pub fn reverse(&mut self) {
        self.vertices.reverse();
    }

    /// Axis-aligned bounding box as (min, max) corners.
    pub fn bounding_box(&self) -> Option<(Vector2<f64>, Vector2<f64>)> {
        let first = *self.vertices.first()?;
        let mut min = first;
        let mut max = first;
        for v in &self.vertices[1..] {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
        }
        Some((min, max))
    }

    /// Ramer-Douglas-Peucker simplification.
    ///
    /// The recursion is seeded by two extremal vertices (the vertex farthest
    /// from vertex 0, then the vertex farthest from that one) so the result
    /// does not depend on where the boundary walk happened to start.
    pub fn simplify(&self, tolerance: f64) -> Polygon {
        let n = self.vertices.len();
        if n < 4 {
            return self.clone();
        }
        let i1 = (0..n)
            .max_by(|&a, &b| {
                let da = (self.vertices[a] - self.vertices[0]).norm_squared();
                let db = (self.vertices[b] - self.vertices[0]).norm_squared();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(0);
        let i2 = (0..n)
            .max_by(|&a, &b| {
                let da = (self.vertices[a] - self.vertices[i1]).norm_squared();
                let db = (self.vertices[b] - self.vertices[i1]).norm_squared();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(0);
        let (lo, hi) = (i1.min(i2), i1.max(i2));
        let chain_a: Vec<Vector2<f64>> = self.vertices[lo..=hi].to_vec();
        let mut chain_b: Vec<Vector2<f64>> = self.vertices[hi..].to_vec();
        chain_b.extend_from_slice(&self.vertices[..=lo]);
        let mut out = rdp(&chain_a, tolerance);
        let b = rdp(&chain_b, tolerance);
        // Both chains contain the two seed vertices; drop the duplicates.
        out.extend_from_slice(&b[1..b.len() - 1]);
        Polygon::new(out)
    }

    /// Insert vertices so that no edge is longer than `distance`, by uniform
    /// subdivision edge by edge.
    pub fn augment(&self, distance: f64) -> Polygon {
        let n = self.vertices.len();
        if n < 2 || distance <= 0.0 {
            return self.clone();
        }
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let len = (b - a).norm();
            let segments = (len / distance).ceil().max(1.0) as usize;
            for j in 0..segments {
                out.push(a + (b - a) * (j as f64 / segments as f64));
            }
        }
        Polygon::new(out)
    }

    /// Gaussian smoothing of the vertex sequence, treated as a periodic
    /// signal; the polygon stays closed.
    pub fn smooth(&self, sigma: f64) -> Polygon {
        let n = self.vertices.len();
        if n < 3 || sigma <= 0.0 {
            return self.clone();
        }
        let radius = (3.0 * sigma).ceil() as usize;
        let mut kernel = Vec::with_capacity(2 * radius + 1);
        for t in -(radius as i64)..=(radius as i64) {
            kernel.push((-(t * t) as f64 / (2.0 * sigma * sigma)).exp());
        }
        let norm: f64 = kernel.iter().sum();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let mut acc = Vector2::zeros();
            for (k, w) in kernel.iter().enumerate() {
                let j = (i + n * (radius / n + 1) + k - radius) % n;
                acc += self.vertices[j] * *w;
            }
            out.push(acc / norm);
        }
        Polygon::new(out)
    }

    /// Point-in-polygon test with a horizontal half-ray from `-∞` to `p`.
    ///
    /// Each edge crosses the ray at most once; of an edge's two endpoints
    /// only the upper one counts as a crossing, so shared vertices are not
    /// double counted. Points exactly on an edge or vertex are inside.
    pub fn contains(&self, p: Vector2<f64>) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            if point_on_segment(p, a, b) {
                return true;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let t = (p.y - a.y) / (b.y - a.y);
                let x = a.x + t * (b.x - a.x);
                if x < p.x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Vertex-to-centroid distance statistics around `center`.
    pub fn radius_statistics(&self, center: Vector2<f64>) -> RadiusValues {
        let mut minmax = MinMaxAccumulator::default();
        let mut var = VarianceAccumulator::default();
        for v in &self.vertices {
            let r = (v - center).norm();
            minmax.push(r);
            var.push(r);
        }
        RadiusValues {
            max: minmax.maximum(),
            mean: var.mean(),
            min: minmax.minimum(),
            var: if var.number() < 2 { 0.0 } else { var.variance() },
        }
    }

    /// Radial spread of the vertices around the ellipse implied by their
    /// covariance: the coefficient of variation of the Mahalanobis radius.
    /// NaN for degenerate (collinear) vertex sets.
    pub fn ellipse_variance(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return f64::NAN;
        }
        let mean = self.vertices.iter().sum::<Vector2<f64>>() / n as f64;
        let mut cov = Matrix2::zeros();
        for v in &self.vertices {
            let d = v - mean;
            cov += d * d.transpose();
        }
        cov /= n as f64;
        let inv = match cov.try_inverse() {
            Some(inv) => inv,
            None => return f64::NAN,
        };
        let mut var = VarianceAccumulator::default();
        for v in &self.vertices {
            let d = v - mean;
            var.push((d.transpose() * inv * d)[(0, 0)].max(0.0).sqrt());
        }
        if var.mean() == 0.0 {
            return f64::NAN;
        }
        var.standard_deviation() / var.mean()
    }

    /// Least-squares circle through the vertices. The normal equations of
    /// `x² + y² + Dx + Ey + F = 0` are solved with a column-pivoting QR.
    pub fn fit_circle(&self) -> CircleParameters {
        let n = self.vertices.len();
        if n < 3 {
            return CircleParameters::default();
        }
        let mut ata = Matrix3::zeros();
        let mut atb = Vector3::zeros();
        for v in &self.vertices {
            let row = Vector3::new(v.x, v.y, 1.0);
            let b = -(v.x * v.x + v.y * v.y);
            ata += row * row.transpose();
            atb += row * b;
        }
        let sol = match ata.col_piv_qr().solve(&atb) {
            Some(sol) => sol,
            None => return CircleParameters::default(),
        };
        let (d, e, f) = (sol[0], sol[1], sol[2]);
        let center = Vector2::new(-d / 2.0, -e / 2.0);
        let r2 = center.norm_squared() - f;
        if r2 <= 0.0 {
            return CircleParameters::default();
        }
        CircleParameters {
            center,
            diameter: 2.0 * r2.sqrt(),
        }
    }

    /// Least-squares conic fit constrained to an ellipse, via
    /// column-pivoting QR. A fit whose discriminant indicates a non-ellipse
    /// conic returns the zero-initialised parameters.
    pub fn fit_ellipse(&self) -> EllipseParameters {
        let n = self.vertices.len();
        if n < 5 {
            return EllipseParameters::default();
        }
        let mut ata = Matrix5::zeros();
        let mut atb = Vector5::zeros();
        for v in &self.vertices {
            let row = Vector5::new(v.x * v.x, v.x * v.y, v.y * v.y, v.x, v.y);
            ata += row * row.transpose();
            atb += row;
        }
        let sol = match ata.col_piv_qr().solve(&atb) {
            Some(sol) => sol,
            None => return EllipseParameters::default(),
        };
        let (ca, cb, cc, cd, ce) = (sol[0], sol[1], sol[2], sol[3], sol[4]);
        if cb * cb - 4.0 * ca * cc >= 0.0 {
            return EllipseParameters::default();
        }
        let m = Matrix2::new(ca, cb / 2.0, cb / 2.0, cc);
        let center = match m.try_inverse() {
            Some(inv) => -(inv * Vector2::new(cd / 2.0, ce / 2.0)),
            None => return EllipseParameters::default(),
        };
        // Constant term of the conic shifted to its centre.
        let kappa = 1.0
            - (ca * center.x * center.x
                + cb * center.x * center.y
                + cc * center.y * center.y
                + cd * center.x
                + ce * center.y);
        let eig = nalgebra::SymmetricEigen::new(m);
        let (l0, l1) = (eig.eigenvalues[0], eig.eigenvalues[1]);
        if l0 <= 0.0 || l1 <= 0.0 || kappa <= 0.0 {
            return EllipseParameters::default();
        }
        let (lmin, vmin, lmax) = if l0 <= l1 {
            (l0, eig.eigenvectors.column(0).into_owned(), l1)
        } else {
            (l1, eig.eigenvectors.column(1).into_owned(), l0)
        };
        EllipseParameters {
            center,
            major_axis: 2.0 * (kappa / lmin).sqrt(),
            minor_axis: 2.0 * (kappa / lmax).sqrt(),
            orientation: vmin.y.atan2(vmin.x),
        }
    }

    /// Convex hull via Melkman's on-line algorithm.
    pub fn convex_hull(&self) -> Result<ConvexHull> {
        ConvexHull::from_polygon(self)
    }
}

fn point_on_segment(p: Vector2<f64>, a: Vector2<f64>, b: Vector2<f64>) -> bool {
    let ab = b - a;
    let ap = p - a;
    let cross = ab.x * ap.y - ab.y * ap.x;
    if cross.abs() > 1e-9 * ab.norm().max(1.0) {
        return false;
    }
    let dot = ap.dot(&ab);
    dot >= -1e-12 && dot <= ab.norm_squared() + 1e-12
}

fn rdp(points: &[Vector2<f64>], tolerance: f64) -> Vec<Vector2<f64>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let first = points[0];
    let last = points[points.len() - 1];
    let dir = last - first;
    let len = dir.norm();
    let mut max_dist = 0.0;
    let mut index = 0;
    for (i, p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = if len < 1e-12 {
            (p - first).norm()
        } else {
            ((p - first).x * dir.y - (p - first).y * dir.x).abs() / len
        };
        if dist > max_dist {
            max_dist = dist;
            index = i;
        }
    }
    if max_dist <= tolerance {
        return vec![first, last];
    }
    let mut left = rdp(&points[..=index], tolerance);
    let right = rdp(&points[index..], tolerance);
    left.pop();
    left.extend(right);
    left
}
