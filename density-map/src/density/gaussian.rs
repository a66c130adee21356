//! Separable Gaussian smoothing with zero boundary extension.

use crate::common::*;

/// The number of standard deviations covered by the kernel on each side.
pub const TRUNCATE: f64 = 4.0;

/// Normalized 1D Gaussian kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    taps: Vec<f64>,
    radius: usize,
}

impl GaussianKernel {
    pub fn new(sigma: f64) -> Result<Self> {
        ensure!(
            sigma.is_finite() && sigma > 0.0,
            "sigma must be positive, but get {}",
            sigma
        );

        let radius = (TRUNCATE * sigma + 0.5) as usize;
        let denom = 2.0 * sigma * sigma;
        let taps: Vec<f64> = (0..=2 * radius)
            .map(|index| {
                let offset = index as f64 - radius as f64;
                (-offset * offset / denom).exp()
            })
            .collect();
        let total: f64 = taps.iter().sum();
        let taps = taps.into_iter().map(|tap| tap / total).collect();

        Ok(Self { taps, radius })
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    /// Convolve rows then columns. Samples outside the field count as zero,
    /// so mass spreading past the border is dropped.
    pub fn filter(&self, field: &Array2<f64>) -> Array2<f64> {
        let rows = self.filter_axis(field, Axis(1));
        self.filter_axis(&rows, Axis(0))
    }

    fn filter_axis(&self, field: &Array2<f64>, axis: Axis) -> Array2<f64> {
        let mut output = Array2::zeros(field.raw_dim());
        let radius = self.radius as isize;

        output
            .lanes_mut(axis)
            .into_iter()
            .zip(field.lanes(axis))
            .for_each(|(mut out_lane, in_lane)| {
                let len = in_lane.len() as isize;

                // the field is mostly zero before the first pass
                in_lane
                    .iter()
                    .enumerate()
                    .filter(|(_, value)| **value != 0.0)
                    .for_each(|(src, &value)| {
                        let src = src as isize;
                        let lo = (src - radius).max(0);
                        let hi = (src + radius).min(len - 1);
                        (lo..=hi).for_each(|dst| {
                            let tap = self.taps[(dst - src + radius) as usize];
                            out_lane[dst as usize] += value * tap;
                        });
                    });
            });

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn kernel_is_normalized() {
        let kernel = GaussianKernel::new(2.5).unwrap();
        assert_eq!(kernel.radius(), 10);
        assert_eq!(kernel.taps().len(), 21);
        assert_abs_diff_eq!(kernel.taps().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(kernel.taps()[0], kernel.taps()[20], epsilon = 1e-15);
    }

    #[test]
    fn reject_bad_sigma() {
        assert!(GaussianKernel::new(0.0).is_err());
        assert!(GaussianKernel::new(-1.0).is_err());
        assert!(GaussianKernel::new(f64::NAN).is_err());
    }

    #[test]
    fn interior_impulse_keeps_mass() {
        let kernel = GaussianKernel::new(1.0).unwrap();
        let mut field = Array2::zeros((21, 21));
        field[[10, 10]] = 100.0;
        let output = kernel.filter(&field);
        assert_abs_diff_eq!(output.sum(), 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(output[[10, 9]], output[[10, 11]], epsilon = 1e-12);
        assert_abs_diff_eq!(output[[9, 10]], output[[10, 9]], epsilon = 1e-12);
    }

    #[test]
    fn corner_impulse_loses_mass() {
        let kernel = GaussianKernel::new(2.0).unwrap();
        let mut field = Array2::zeros((20, 20));
        field[[0, 0]] = 100.0;
        let output = kernel.filter(&field);
        assert!(output.sum() < 40.0);
        assert!(output.sum() > 20.0);
    }
}
