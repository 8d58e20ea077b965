use std::fmt;
use std::ops::Mul;

/// Composable physical units.
///
/// Units are integer powers of the two base units the engine cares about
/// (metre and pixel) together with a power-of-ten exponent stored in steps
/// of a thousand, so SI prefixes survive multiplication. The distinguished
/// `pixel` unit marks the absence of physical calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Units {
    metre: i8,
    pixel: i8,
    /// Power of 10^3 relative to the base unit (1 => km, -1 => mm, -2 => um).
    thousands: i8,
}

impl Units {
    /// Dimensionless.
    pub fn none() -> Units {
        Units::default()
    }

    /// One pixel.
    pub fn pixel() -> Units {
        Units {
            pixel: 1,
            ..Units::default()
        }
    }

    /// One metre.
    pub fn metre() -> Units {
        Units {
            metre: 1,
            ..Units::default()
        }
    }

    /// One micrometre (10^-6 m).
    pub fn micrometre() -> Units {
        Units {
            metre: 1,
            thousands: -2,
            ..Units::default()
        }
    }

    /// One millimetre (10^-3 m).
    pub fn millimetre() -> Units {
        Units {
            metre: 1,
            thousands: -1,
            ..Units::default()
        }
    }

    /// Raise to an integer power.
    pub fn pow(self, exp: i8) -> Units {
        Units {
            metre: self.metre * exp,
            pixel: self.pixel * exp,
            thousands: self.thousands * exp,
        }
    }

    /// True when the units carry no pixel component, i.e. the quantity is
    /// physically calibrated (dimensionless counts as physical).
    pub fn is_physical(&self) -> bool {
        self.pixel == 0
    }

    /// True when the units are exactly dimensionless.
    pub fn is_dimensionless(&self) -> bool {
        *self == Units::default()
    }

    /// Units with the same base powers but no decimal prefix, together with
    /// the factor 10^(3·thousands) removed.
    pub fn strip_prefix(self) -> (f64, Units) {
        let factor = 1000f64.powi(i32::from(self.thousands));
        (
            factor,
            Units {
                thousands: 0,
                ..self
            },
        )
    }

    /// True when two units differ at most in their decimal prefix.
    pub fn same_dimension(&self, other: &Units) -> bool {
        self.metre == other.metre && self.pixel == other.pixel
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, unicode: bool) -> fmt::Result {
        if self.is_dimensionless() {
            return Ok(());
        }
        let mut first = true;
        for (base, power) in [("m", self.metre), ("px", self.pixel)] {
            if power == 0 {
                continue;
            }
            if !first {
                write!(f, "{}", if unicode { "·" } else { "." })?;
            }
            first = false;
            // The decimal prefix is folded into the first base unit when it
            // divides evenly over that unit's power.
            if base == "m" && self.thousands != 0 {
                let prefix = if self.thousands % self.metre == 0 {
                    self.thousands / self.metre
                } else {
                    0
                };
                match prefix {
                    -3 => write!(f, "nm")?,
                    -2 => write!(f, "{}m", if unicode { "µ" } else { "u" })?,
                    -1 => write!(f, "mm")?,
                    1 => write!(f, "km")?,
                    _ => write!(f, "10^{}.m", 3 * i32::from(self.thousands))?,
                }
            } else {
                write!(f, "{}", base)?;
            }
            if power != 1 {
                if unicode && (2..=3).contains(&power) {
                    write!(f, "{}", if power == 2 { "²" } else { "³" })?;
                } else {
                    write!(f, "^{}", power)?;
                }
            }
        }
        Ok(())
    }

    /// Plain-ASCII rendering ("um^2").
    pub fn to_ascii_string(&self) -> String {
        format!("{}", AsciiUnits(self))
    }
}

struct AsciiUnits<'a>(&'a Units);

impl fmt::Display for AsciiUnits<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.render(f, false)
    }
}

impl fmt::Display for Units {
    /// UTF-8 rendering ("µm²").
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, true)
    }
}

impl Mul for Units {
    type Output = Units;

    fn mul(self, rhs: Units) -> Units {
        Units {
            metre: self.metre + rhs.metre,
            pixel: self.pixel + rhs.pixel,
            thousands: self.thousands + rhs.thousands,
        }
    }
}

/// A magnitude with units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalQuantity {
    pub magnitude: f64,
    pub units: Units,
}

impl PhysicalQuantity {
    pub fn new(magnitude: f64, units: Units) -> PhysicalQuantity {
        PhysicalQuantity { magnitude, units }
    }

    /// An uncalibrated quantity of `magnitude` pixels.
    pub fn pixels(magnitude: f64) -> PhysicalQuantity {
        PhysicalQuantity::new(magnitude, Units::pixel())
    }

    /// A calibrated length in metres.
    pub fn metres(magnitude: f64) -> PhysicalQuantity {
        PhysicalQuantity::new(magnitude, Units::metre())
    }

    /// A calibrated length in micrometres.
    pub fn micrometres(magnitude: f64) -> PhysicalQuantity {
        PhysicalQuantity::new(magnitude, Units::micrometre())
    }

    /// Raise to an integer power.
    pub fn pow(self, exp: i8) -> PhysicalQuantity {
        PhysicalQuantity {
            magnitude: self.magnitude.powi(i32::from(exp)),
            units: self.units.pow(exp),
        }
    }

    /// True when the quantity carries no pixel component.
    pub fn is_physical(&self) -> bool {
        self.units.is_physical()
    }
}

impl Mul for PhysicalQuantity {
    type Output = PhysicalQuantity;

    fn mul(self, rhs: PhysicalQuantity) -> PhysicalQuantity {
        PhysicalQuantity {
            magnitude: self.magnitude * rhs.magnitude,
            units: self.units * rhs.units,
        }
    }
}

impl fmt::Display for PhysicalQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.units.is_dimensionless() {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "{} {}", self.magnitude, self.units)
        }
    }
}

/// Per-dimension pixel pitch of an image.
///
/// Dimensions without an explicit entry default to 1 px (uncalibrated).
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSize {
    dims: Vec<PhysicalQuantity>,
}

impl PixelSize {
    /// Uncalibrated pixel size for `ndim` dimensions.
    pub fn uncalibrated(ndim: usize) -> PixelSize {
        PixelSize {
            dims: vec![PhysicalQuantity::pixels(1.0); ndim],
        }
    }

    /// Isotropic pixel size: the same pitch in every dimension.
    pub fn isotropic(ndim: usize, pitch: PhysicalQuantity) -> PixelSize {
        PixelSize {
            dims: vec![pitch; ndim],
        }
    }

    /// Anisotropic pixel size from per-dimension pitches.
    pub fn anisotropic(dims: Vec<PhysicalQuantity>) -> PixelSize {
        PixelSize { dims }
    }

    pub fn dimensionality(&self) -> usize {
        self.dims.len()
    }

    /// Pitch along dimension `dim` (1 px when out of range).
    pub fn get(&self, dim: usize) -> PhysicalQuantity {
        self.dims
            .get(dim)
            .copied()
            .unwrap_or_else(|| PhysicalQuantity::pixels(1.0))
    }

    /// True when every dimension has the same pitch, compared up to SI
    /// prefix (1 mm and 1000 µm count as equal).
    pub fn is_isotropic(&self) -> bool {
        self.dims.windows(2).all(|w| {
            if !w[0].units.same_dimension(&w[1].units) {
                return false;
            }
            let (fa, _) = w[0].units.strip_prefix();
            let (fb, _) = w[1].units.strip_prefix();
            let (a, b) = (w[0].magnitude * fa, w[1].magnitude * fb);
            (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs())
        })
    }

    /// True when every dimension is physically calibrated.
    pub fn is_physical(&self) -> bool {
        self.dims.iter().all(|d| d.is_physical())
    }

    /// Product of the pitches over the first `ndim` dimensions: the physical
    /// size of one pixel (area in 2-D, volume in 3-D).
    pub fn product(&self, ndim: usize) -> PhysicalQuantity {
        let mut out = PhysicalQuantity::new(1.0, Units::none());
        for dim in 0..ndim {
            out = out * self.get(dim);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_compose() {
        let m2 = Units::metre() * Units::metre();
        assert_eq!(m2, Units::metre().pow(2));
        assert!(m2.is_physical());
        assert!(!Units::pixel().is_physical());
    }

    #[test]
    fn test_units_render() {
        assert_eq!(Units::metre().pow(2).to_string(), "m²");
        assert_eq!(Units::micrometre().to_string(), "µm");
        assert_eq!(Units::micrometre().to_ascii_string(), "um");
        assert_eq!(Units::pixel().pow(2).to_ascii_string(), "px^2");
        assert_eq!(Units::micrometre().pow(2).to_string(), "µm²");
        assert_eq!(Units::none().to_string(), "");
    }

    #[test]
    fn test_quantity_arithmetic() {
        use approx::assert_relative_eq;

        let a = PhysicalQuantity::micrometres(2.0);
        let b = a * a;
        assert_eq!(b.magnitude, 4.0);
        assert_eq!(b.units, Units::micrometre().pow(2));
        let (factor, stripped) = b.units.strip_prefix();
        assert_eq!(stripped, Units::metre().pow(2));
        assert_relative_eq!(factor, 1e-12);
    }

    #[test]
    fn test_pixel_size() {
        let ps = PixelSize::isotropic(2, PhysicalQuantity::metres(1.0));
        assert!(ps.is_isotropic());
        assert!(ps.is_physical());
        assert_eq!(ps.product(2).units, Units::metre().pow(2));

        let aniso = PixelSize::anisotropic(vec![
            PhysicalQuantity::metres(1.0),
            PhysicalQuantity::metres(2.0),
        ]);
        assert!(!aniso.is_isotropic());
        assert_eq!(aniso.product(2).magnitude, 2.0);

        let un = PixelSize::uncalibrated(3);
        assert!(un.is_isotropic());
        assert!(!un.is_physical());

        // Isotropy holds up to SI prefix.
        let mixed = PixelSize::anisotropic(vec![
            PhysicalQuantity::new(1.0, Units::millimetre()),
            PhysicalQuantity::micrometres(1000.0),
        ]);
        assert!(mixed.is_isotropic());
    }
}
