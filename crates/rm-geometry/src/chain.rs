use nalgebra::Vector2;

use crate::error::{GeometryError, Result};
use crate::polygon::Polygon;

/// Neighbourhood connectivity of a 2-D boundary walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Axial neighbours only, code alphabet {0..3}.
    Four,
    /// Axial and diagonal neighbours, code alphabet {0..7}.
    Eight,
}

/// Step deltas for the 8-connected code alphabet. Even indices are axial.
pub const DELTAS8: [(i64, i64); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Step deltas for the 4-connected code alphabet.
pub const DELTAS4: [(i64, i64); 4] = [(1, 0), (0, -1), (-1, 0), (0, 1)];

/// One chain code step: a direction plus a flag marking traversal of an
/// image-edge pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    pub direction: u8,
    pub border: bool,
}

impl Code {
    pub fn new(direction: u8, border: bool) -> Code {
        Code { direction, border }
    }

    pub fn is_even(&self) -> bool {
        self.direction % 2 == 0
    }
}

/// Freeman chain code of one object boundary.
///
/// `start` is the upper-left boundary pixel where the wall-following walk
/// began; an empty code list denotes a single-pixel object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainCode {
    pub start: (i64, i64),
    pub codes: Vec<Code>,
    pub connectivity: Connectivity,
    pub object_id: u32,
}

/// Extremal projections of a 2-D shape onto rotating axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeretValues {
    pub max_diameter: f64,
    pub min_diameter: f64,
    pub max_perpendicular: f64,
    pub max_angle: f64,
    pub min_angle: f64,
}

impl ChainCode {
    fn delta(&self, direction: u8) -> (i64, i64) {
        match self.connectivity {
            Connectivity::Four => DELTAS4[direction as usize],
            Connectivity::Eight => DELTAS8[direction as usize],
        }
    }

    /// Boundary pixel centres along the walk, starting at `start`.
    pub fn vertices(&self) -> Vec<Vector2<f64>> {
        let mut out = Vec::with_capacity(self.codes.len().max(1));
        let (mut x, mut y) = self.start;
        out.push(Vector2::new(x as f64, y as f64));
        // The last code returns to the start pixel; skip its duplicate.
        for code in self.codes.iter().take(self.codes.len().saturating_sub(1)) {
            let (dx, dy) = self.delta(code.direction);
            x += dx;
            y += dy;
            out.push(Vector2::new(x as f64, y as f64));
        }
        out
    }

    /// Rewrite a 4-connected chain code as the equivalent 8-connected one,
    /// collapsing `(k, (k+1) mod 4)` pairs into the diagonal code `2k+1`.
    pub fn convert_to_8_connected(&self) -> ChainCode {
        if self.connectivity == Connectivity::Eight {
            return self.clone();
        }
        let mut codes = Vec::with_capacity(self.codes.len());
        let mut i = 0;
        while i < self.codes.len() {
            let a = self.codes[i];
            if i + 1 < self.codes.len() {
                let b = self.codes[i + 1];
                if b.direction == (a.direction + 1) % 4 {
                    codes.push(Code::new(2 * a.direction + 1, a.border || b.border));
                    i += 2;
                    continue;
                }
            }
            codes.push(Code::new(2 * a.direction, a.border));
            i += 1;
        }
        ChainCode {
            start: self.start,
            codes,
            connectivity: Connectivity::Eight,
            object_id: self.object_id,
        }
    }

    /// Boundary length with the Kulpa bias corrections. Codes flagged as
    /// border traversals do not contribute.
    pub fn length(&self) -> f64 {
        match self.connectivity {
            Connectivity::Eight => {
                let mut even = 0usize;
                let mut odd = 0usize;
                for code in &self.codes {
                    if code.border {
                        continue;
                    }
                    if code.is_even() {
                        even += 1;
                    } else {
                        odd += 1;
                    }
                }
                0.980 * even as f64 + 1.406 * odd as f64 - 0.091 * self.corner_count() as f64
            }
            Connectivity::Four => {
                let n = self.codes.iter().filter(|c| !c.border).count();
                0.948 * n as f64 - 0.278 * self.corner_count() as f64
            }
        }
    }

    /// Number of direction changes along the (cyclic) code sequence.
    fn corner_count(&self) -> usize {
        if self.codes.len() < 2 {
            return 0;
        }
        let mut prev = self.codes[self.codes.len() - 1].direction;
        let mut corners = 0;
        for code in &self.codes {
            if code.direction != prev {
                corners += 1;
            }
            prev = code.direction;
        }
        corners
    }

    /// Convert the boundary to the pixel-edge-midpoint polygon.
    ///
    /// Each boundary pixel contributes the midpoints of its exposed edges,
    /// drawn from the set `{(0,-½), (-½,0), (0,½), (½,0)}` around the pixel
    /// centre. A single-pixel object yields the four-vertex diamond.
    pub fn polygon(&self) -> Result<Polygon> {
        if self.codes.len() == 1 {
            return Err(GeometryError::MalformedChainCode(
                "single-code chain cannot form a closed boundary".to_string(),
            ));
        }
        let cc = self.convert_to_8_connected();
        let pts = [
            Vector2::new(0.0, -0.5),
            Vector2::new(-0.5, 0.0),
            Vector2::new(0.0, 0.5),
            Vector2::new(0.5, 0.0),
        ];
        let mut vertices = Vec::new();
        let (mut x, mut y) = cc.start;
        if cc.codes.is_empty() {
            let pos = Vector2::new(x as f64, y as f64);
            for idx in [0usize, 3, 2, 1] {
                vertices.push(pos + pts[idx]);
            }
            return Ok(Polygon::new(vertices));
        }
        // The exposed edge midpoints of each pixel depend on the incoming
        // code m and outgoing code n; the cyclic walk supplies m for the
        // start pixel from the final code.
        let mut m = cc.codes[cc.codes.len() - 1].direction as usize;
        for code in &cc.codes {
            let n = code.direction as usize;
            let pos = Vector2::new(x as f64, y as f64);
            let k = ((m + 1) / 2) % 4;
            let s = (n / 2) % 4;
            let count = (k + 4 - s) % 4 + 1;
            for t in 0..count {
                vertices.push(pos + pts[(k + 4 - t) % 4]);
            }
            let (dx, dy) = DELTAS8[n];
            x += dx;
            y += dy;
            m = n;
        }
        Ok(Polygon::new(vertices))
    }

    /// Feret diameters by rotating the boundary pixel centres over discrete
    /// angles in `[0, π/2)` and tracking the projection bounding boxes.
    ///
    /// A single-pixel object returns the small-object convention
    /// `(1, 1, 1, 0, π/2)`; all diameters are floored at one pixel.
    pub fn feret(&self, angle_step: f64) -> FeretValues {
        if self.codes.is_empty() {
            return FeretValues {
                max_diameter: 1.0,
                min_diameter: 1.0,
                max_perpendicular: 1.0,
                max_angle: 0.0,
                min_angle: std::f64::consts::FRAC_PI_2,
            };
        }
        let step = if angle_step > 0.0 { angle_step } else { 2.5e-3 };
        let vertices = self.vertices();
        let mut max_diameter = f64::NEG_INFINITY;
        let mut min_diameter = f64::INFINITY;
        let mut max_perpendicular = 0.0;
        let mut max_angle = 0.0;
        let mut min_angle = 0.0;
        let mut angle = 0.0;
        while angle < std::f64::consts::FRAC_PI_2 {
            let (sin, cos) = angle.sin_cos();
            let mut u_min = f64::INFINITY;
            let mut u_max = f64::NEG_INFINITY;
            let mut v_min = f64::INFINITY;
            let mut v_max = f64::NEG_INFINITY;
            for p in &vertices {
                let u = p.x * cos + p.y * sin;
                let v = -p.x * sin + p.y * cos;
                u_min = u_min.min(u);
                u_max = u_max.max(u);
                v_min = v_min.min(v);
                v_max = v_max.max(v);
            }
            let wu = u_max - u_min;
            let wv = v_max - v_min;
            // wu extends along `angle`, wv along the perpendicular axis.
            for (w, perp, a) in [
                (wu, wv, angle),
                (wv, wu, angle + std::f64::consts::FRAC_PI_2),
            ] {
                if w > max_diameter {
                    max_diameter = w;
                    max_angle = a;
                }
                if w < min_diameter {
                    min_diameter = w;
                    max_perpendicular = perp;
                    min_angle = a;
                }
            }
            angle += step;
        }
        FeretValues {
            max_diameter: max_diameter.max(1.0),
            min_diameter: min_diameter.max(1.0),
            max_perpendicular: max_perpendicular.max(1.0),
            max_angle,
            min_angle,
        }
    }

    /// Integral of squared curvature along the boundary.
    ///
    /// The curvature signal is the cyclic sequence of direction-code
    /// differences, smoothed with three passes of a five-tap uniform filter
    /// and weighted by the Kulpa element lengths.
    pub fn bending_energy(&self) -> f64 {
        let cc = self.convert_to_8_connected();
        let n = cc.codes.len();
        if n < 3 {
            return 0.0;
        }
        let mut diff = Vec::with_capacity(n);
        for i in 0..n {
            let a = cc.codes[i].direction as i32;
            let b = cc.codes[(i + 1) % n].direction as i32;
            let d = (b - a + 12) % 8 - 4;
            diff.push(f64::from(d) * std::f64::consts::FRAC_PI_4);
        }
        for _ in 0..3 {
            let prev = diff.clone();
            for i in 0..n {
                let mut sum = 0.0;
                for t in 0..5usize {
                    sum += prev[(i + n + t - 2) % n];
                }
                diff[i] = sum / 5.0;
            }
        }
        let mut energy = 0.0;
        for (i, d) in diff.iter().enumerate() {
            let len = if cc.codes[i].is_even() { 0.980 } else { 1.406 };
            energy += d * d / len;
        }
        energy
    }

    /// Render the boundary pixels into a tight u8 image.
    ///
    /// Returns the image and the coordinate of its origin pixel, so that a
    /// re-trace can be translated back into the original frame.
    pub fn image(&self) -> (rm_image::Image, (i64, i64)) {
        let mut positions = vec![self.start];
        let (mut x, mut y) = self.start;
        for code in &self.codes {
            let (dx, dy) = self.delta(code.direction);
            x += dx;
            y += dy;
            positions.push((x, y));
        }
        let min_x = positions.iter().map(|p| p.0).min().unwrap();
        let max_x = positions.iter().map(|p| p.0).max().unwrap();
        let min_y = positions.iter().map(|p| p.1).min().unwrap();
        let max_y = positions.iter().map(|p| p.1).max().unwrap();
        let width = (max_x - min_x + 1) as usize;
        let height = (max_y - min_y + 1) as usize;
        let mut data = vec![0u8; width * height];
        for (px, py) in positions {
            data[(py - min_y) as usize * width + (px - min_x) as usize] = 1;
        }
        let image = rm_image::Image::from_u8(vec![height, width], data)
            .expect("buffer sized from bounding box");
        (image, (min_x, min_y))
    }

    /// Chain code of the pixel centres 8-adjacent to the object.
    ///
    /// The boundary is rasterised, the exterior flood-filled (4-connected,
    /// so diagonal boundary steps do not leak), and the ring of exterior
    /// pixels touching the boundary is re-traced.
    pub fn offset(&self) -> Result<ChainCode> {
        let cc = self.convert_to_8_connected();
        let mut positions = vec![cc.start];
        let (mut x, mut y) = cc.start;
        for code in &cc.codes {
            let (dx, dy) = DELTAS8[code.direction as usize];
            x += dx;
            y += dy;
            positions.push((x, y));
        }
        let min_x = positions.iter().map(|p| p.0).min().unwrap() - 2;
        let max_x = positions.iter().map(|p| p.0).max().unwrap() + 2;
        let min_y = positions.iter().map(|p| p.1).min().unwrap() - 2;
        let max_y = positions.iter().map(|p| p.1).max().unwrap() + 2;
        let width = (max_x - min_x + 1) as usize;
        let height = (max_y - min_y + 1) as usize;
        let mut boundary = vec![false; width * height];
        for (px, py) in &positions {
            boundary[(py - min_y) as usize * width + (px - min_x) as usize] = true;
        }
        // Flood the exterior from the padded border.
        let mut exterior = vec![false; width * height];
        let mut stack = vec![0usize];
        exterior[0] = true;
        while let Some(i) = stack.pop() {
            let (ix, iy) = (i % width, i / width);
            let mut visit = |j: usize| {
                if !exterior[j] && !boundary[j] {
                    exterior[j] = true;
                    stack.push(j);
                }
            };
            if ix > 0 {
                visit(i - 1);
            }
            if ix + 1 < width {
                visit(i + 1);
            }
            if iy > 0 {
                visit(i - width);
            }
            if iy + 1 < height {
                visit(i + width);
            }
        }
        // The offset ring: exterior pixels 8-adjacent to the boundary.
        let mut ring = vec![0u8; width * height];
        let mut ring_start: Option<(usize, usize)> = None;
        for iy in 0..height {
            for ix in 0..width {
                let i = iy * width + ix;
                if !exterior[i] {
                    continue;
                }
                let touches = DELTAS8.iter().any(|&(dx, dy)| {
                    let nx = ix as i64 + dx;
                    let ny = iy as i64 + dy;
                    nx >= 0
                        && ny >= 0
                        && (nx as usize) < width
                        && (ny as usize) < height
                        && boundary[ny as usize * width + nx as usize]
                });
                if touches {
                    ring[i] = 1;
                    if ring_start.is_none() {
                        ring_start = Some((ix, iy));
                    }
                }
            }
        }
        let (sx, sy) = ring_start.ok_or_else(|| {
            GeometryError::MalformedChainCode("offset ring is empty".to_string())
        })?;
        let ring_image = rm_image::Image::from_u8(vec![height, width], ring)
            .expect("buffer sized from bounding box");
        let mut out = crate::extract::get_single_chain_code(
            &ring_image,
            (sx as i64, sy as i64),
            Connectivity::Eight,
        )?;
        out.start = (out.start.0 + min_x, out.start.1 + min_y);
        out.object_id = cc.object_id;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square3_codes() -> ChainCode {
        // 8-connected walk around a 3x3 square anchored at the origin.
        ChainCode {
            start: (0, 0),
            codes: [0, 0, 6, 6, 4, 4, 2, 2]
                .iter()
                .map(|&d| Code::new(d, false))
                .collect(),
            connectivity: Connectivity::Eight,
            object_id: 1,
        }
    }

    fn single_pixel() -> ChainCode {
        ChainCode {
            start: (4, 7),
            codes: vec![],
            connectivity: Connectivity::Eight,
            object_id: 1,
        }
    }

    #[test]
    fn test_length_square() {
        let cc = square3_codes();
        assert_relative_eq!(cc.length(), 0.980 * 8.0 - 0.091 * 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_length_ignores_border_codes() {
        let mut cc = square3_codes();
        cc.codes[0].border = true;
        assert_relative_eq!(cc.length(), 0.980 * 7.0 - 0.091 * 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_convert_to_8_connected() {
        let cc4 = ChainCode {
            start: (0, 0),
            codes: [0, 0, 3, 3, 2, 2, 1, 1]
                .iter()
                .map(|&d| Code::new(d, false))
                .collect(),
            connectivity: Connectivity::Four,
            object_id: 1,
        };
        let cc8 = cc4.convert_to_8_connected();
        let dirs: Vec<u8> = cc8.codes.iter().map(|c| c.direction).collect();
        assert_eq!(dirs, vec![0, 0, 6, 6, 4, 4, 2, 2]);
    }

    #[test]
    fn test_convert_collapses_diagonal_pair() {
        let cc4 = ChainCode {
            start: (0, 0),
            codes: vec![Code::new(0, false), Code::new(1, false), Code::new(0, false)],
            connectivity: Connectivity::Four,
            object_id: 1,
        };
        let dirs: Vec<u8> = cc4
            .convert_to_8_connected()
            .codes
            .iter()
            .map(|c| c.direction)
            .collect();
        assert_eq!(dirs, vec![1, 0]);
    }

    #[test]
    fn test_polygon_square() {
        let poly = square3_codes().polygon().unwrap();
        assert_eq!(poly.vertices.len(), 12);
        assert_relative_eq!(poly.area(), 8.5, epsilon = 1e-12);
    }

    #[test]
    fn test_polygon_single_pixel_diamond() {
        let poly = single_pixel().polygon().unwrap();
        assert_eq!(poly.vertices.len(), 4);
        assert_relative_eq!(poly.area(), 0.5, epsilon = 1e-12);
        let c = poly.centroid();
        assert_relative_eq!(c.x, 4.0, epsilon = 1e-12);
        assert_relative_eq!(c.y, 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_polygon_rejects_single_code() {
        let cc = ChainCode {
            start: (0, 0),
            codes: vec![Code::new(0, false)],
            connectivity: Connectivity::Eight,
            object_id: 1,
        };
        assert!(cc.polygon().is_err());
    }

    #[test]
    fn test_polygon_matches_converted_4_connected() {
        let cc4 = ChainCode {
            start: (0, 0),
            codes: [0, 0, 3, 3, 2, 2, 1, 1]
                .iter()
                .map(|&d| Code::new(d, false))
                .collect(),
            connectivity: Connectivity::Four,
            object_id: 1,
        };
        let a = cc4.polygon().unwrap();
        let b = cc4.convert_to_8_connected().polygon().unwrap();
        assert_eq!(a.vertices, b.vertices);
    }

    #[test]
    fn test_feret_square() {
        let f = square3_codes().feret(2.5e-3);
        assert_relative_eq!(f.min_diameter, 2.0, epsilon = 1e-3);
        assert_relative_eq!(f.max_diameter, 2.0 * 2f64.sqrt(), epsilon = 1e-2);
        assert_relative_eq!(f.max_perpendicular, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_feret_single_pixel_convention() {
        let f = single_pixel().feret(2.5e-3);
        assert_eq!(f.max_diameter, 1.0);
        assert_eq!(f.min_diameter, 1.0);
        assert_eq!(f.max_perpendicular, 1.0);
    }

    #[test]
    fn test_bending_energy_square_positive() {
        let be = square3_codes().bending_energy();
        assert!(be > 0.0);
        // Total turning is 2π regardless of size; a larger square spreads
        // the same turning over a longer boundary, lowering the energy.
        let mut codes = Vec::new();
        for d in [0u8, 6, 4, 2] {
            for _ in 0..7 {
                codes.push(Code::new(d, false));
            }
        }
        let big = ChainCode {
            start: (0, 0),
            codes,
            connectivity: Connectivity::Eight,
            object_id: 1,
        };
        assert!(big.bending_energy() < be);
    }

    #[test]
    fn test_vertices_walk() {
        let cc = square3_codes();
        let v = cc.vertices();
        assert_eq!(v.len(), 8);
        assert_eq!(v[0], Vector2::new(0.0, 0.0));
        assert_eq!(v[2], Vector2::new(2.0, 0.0));
        assert_eq!(v[4], Vector2::new(2.0, 2.0));
    }

    #[test]
    fn test_image_renders_boundary() {
        let (img, origin) = square3_codes().image();
        assert_eq!(origin, (0, 0));
        assert_eq!(img.sizes(), &[3, 3]);
        assert_eq!(img.label_at(&[0, 0]).unwrap(), 1);
        assert_eq!(img.label_at(&[1, 1]).unwrap(), 0); // interior not rendered
        assert_eq!(img.label_at(&[2, 2]).unwrap(), 1);
    }

    #[test]
    fn test_offset_square_ring() {
        let off = square3_codes().offset().unwrap();
        // The ring around a 3x3 square is the 16-pixel frame of the 5x5 box.
        assert_eq!(off.start, (-1, -1));
        assert_eq!(off.codes.len(), 16);
    }
}
