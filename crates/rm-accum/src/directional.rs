/// Directional statistics of angular data via the unit-vector sum.
#[derive(Debug, Clone, Default)]
pub struct DirectionalStatisticsAccumulator {
    n: usize,
    sum_cos: f64,
    sum_sin: f64,
}

impl DirectionalStatisticsAccumulator {
    /// Push an angle in radians.
    pub fn push(&mut self, angle: f64) {
        self.n += 1;
        self.sum_cos += angle.cos();
        self.sum_sin += angle.sin();
    }

    pub fn merge(&mut self, other: &DirectionalStatisticsAccumulator) {
        self.n += other.n;
        self.sum_cos += other.sum_cos;
        self.sum_sin += other.sum_sin;
    }

    pub fn number(&self) -> usize {
        self.n
    }

    /// Circular mean angle in radians; NaN when empty.
    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            f64::NAN
        } else {
            self.sum_sin.atan2(self.sum_cos)
        }
    }

    /// Circular standard deviation `sqrt(-2 ln R̄)`; NaN when empty.
    pub fn standard_deviation(&self) -> f64 {
        if self.n == 0 {
            return f64::NAN;
        }
        let r = (self.sum_cos * self.sum_cos + self.sum_sin * self.sum_sin).sqrt()
            / self.n as f64;
        if r <= 0.0 {
            f64::INFINITY
        } else {
            (-2.0 * r.min(1.0).ln()).sqrt()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_mean_wraps() {
        let mut acc = DirectionalStatisticsAccumulator::default();
        acc.push(PI - 0.1);
        acc.push(-PI + 0.1);
        // Linear mean would be 0; circular mean is at the wrap point.
        assert_relative_eq!(acc.mean().abs(), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_concentrated_data() {
        let mut acc = DirectionalStatisticsAccumulator::default();
        for _ in 0..10 {
            acc.push(0.5);
        }
        assert_relative_eq!(acc.mean(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(acc.standard_deviation(), 0.0, epsilon = 1e-7);
    }

    #[test]
    fn test_uniform_data_dispersed() {
        let mut acc = DirectionalStatisticsAccumulator::default();
        for k in 0..4 {
            acc.push(f64::from(k) * PI / 2.0);
        }
        assert!(acc.standard_deviation() > 2.0);
    }
}
