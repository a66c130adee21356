//! Density map synthesis from point annotations.

mod gaussian;
pub use gaussian::*;

use crate::{annotation::Point, common::*};

/// The value placed at an annotated pixel before smoothing.
pub const IMPULSE: f64 = 100.0;

/// The default lower bound of every density cell.
pub const DEFAULT_MIN_VALUE: f64 = 1e-4;

/// How impulses at identical pixels combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpulsePolicy {
    /// A later impulse replaces an earlier one. The total mass is still
    /// renormalized to the point count, so duplicated points spread the
    /// mass of one peak over the whole map.
    Overwrite,
    /// Impulses at the same pixel add up.
    Accumulate,
}

impl Default for ImpulsePolicy {
    fn default() -> Self {
        Self::Overwrite
    }
}

/// A per-pixel object density field. Its sum is the object count times [IMPULSE].
#[derive(Debug, Clone, PartialEq)]
pub struct DensityMap {
    data: Array2<f32>,
}

impl DensityMap {
    pub fn from_array(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Get the (height, width) shape.
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().map(|&value| value as f64).sum()
    }

    /// Recover the object count.
    pub fn count(&self) -> f64 {
        self.sum() / IMPULSE
    }

    pub fn min(&self) -> Option<f32> {
        self.data.iter().copied().reduce(f32::min)
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array2<f32> {
        self.data
    }
}

/// Density map synthesizer initializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityMapInit {
    /// The standard deviation of the Gaussian kernel in pixels.
    pub sigma: R64,
    /// The floor applied to every cell after smoothing.
    #[serde(default = "default_min_value")]
    pub min_value: R64,
    #[serde(default)]
    pub impulse_policy: ImpulsePolicy,
}

impl DensityMapInit {
    pub fn build(self) -> Result<DensityMapSynthesizer> {
        let Self {
            sigma,
            min_value,
            impulse_policy,
        } = self;
        ensure!(
            min_value >= 0.0,
            "min_value must be non-negative, but get {}",
            min_value
        );
        let kernel = GaussianKernel::new(sigma.raw())?;

        Ok(DensityMapSynthesizer {
            kernel,
            min_value: min_value.raw(),
            impulse_policy,
        })
    }
}

impl Default for DensityMapInit {
    fn default() -> Self {
        Self {
            sigma: r64(10.0),
            min_value: default_min_value(),
            impulse_policy: ImpulsePolicy::Overwrite,
        }
    }
}

fn default_min_value() -> R64 {
    r64(DEFAULT_MIN_VALUE)
}

/// Converts point sets into density maps.
#[derive(Debug, Clone)]
pub struct DensityMapSynthesizer {
    kernel: GaussianKernel,
    min_value: f64,
    impulse_policy: ImpulsePolicy,
}

impl DensityMapSynthesizer {
    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    /// Build the density map of all `points` on a field of `(height, width)`.
    pub fn synthesize<P>(
        &self,
        shape: (usize, usize),
        points: impl IntoIterator<Item = P>,
    ) -> Result<DensityMap>
    where
        P: Borrow<Point>,
    {
        let (height, width) = shape;
        let mut field = Array2::<f64>::zeros(shape);
        let mut num_points = 0;

        for point in points {
            let Point { x, y, .. } = *point.borrow();
            if x >= width || y >= height {
                return Err(DensityError::PointOutOfBounds {
                    x,
                    y,
                    height,
                    width,
                }
                .into());
            }

            match self.impulse_policy {
                ImpulsePolicy::Overwrite => field[[y, x]] = IMPULSE,
                ImpulsePolicy::Accumulate => field[[y, x]] += IMPULSE,
            }
            num_points += 1;
        }

        let mut field = self.kernel.filter(&field);
        let min_value = self.min_value;
        field.mapv_inplace(|value| value.max(min_value));

        // an empty point set keeps the floor-valued field
        if num_points > 0 {
            let total = field.sum();
            if total > 0.0 {
                let scale = num_points as f64 * IMPULSE / total;
                field.mapv_inplace(|value| value * scale);
            }
        }

        Ok(DensityMap {
            data: field.mapv(|value| value as f32),
        })
    }

    /// Build one density map per entry of `class_labels`, in order, each from
    /// the points of exactly that class.
    pub fn synthesize_by_class(
        &self,
        shape: (usize, usize),
        points: &[Point],
        class_labels: &[i64],
    ) -> Result<Vec<DensityMap>> {
        class_labels
            .iter()
            .map(|&label| {
                let class_points = points.iter().filter(|point| point.class_id == label);
                self.synthesize(shape, class_points)
            })
            .try_collect()
    }
}

/// Build a density map with the default impulse policy.
pub fn synthesize(
    shape: (usize, usize),
    points: &[Point],
    sigma: f64,
    min_value: f64,
) -> Result<DensityMap> {
    DensityMapInit {
        sigma: R64::try_new(sigma).ok_or_else(|| format_err!("sigma must be finite"))?,
        min_value: R64::try_new(min_value)
            .ok_or_else(|| format_err!("min_value must be finite"))?,
        impulse_policy: ImpulsePolicy::Overwrite,
    }
    .build()?
    .synthesize(shape, points)
}

/// Build per-class density maps with the default floor value.
pub fn synthesize_by_class(
    shape: (usize, usize),
    points: &[Point],
    class_labels: &[i64],
    sigma: f64,
) -> Result<Vec<DensityMap>> {
    DensityMapInit {
        sigma: R64::try_new(sigma).ok_or_else(|| format_err!("sigma must be finite"))?,
        ..Default::default()
    }
    .build()?
    .synthesize_by_class(shape, points, class_labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn corn_points() -> Vec<Point> {
        vec![
            Point::new(10, 12, 0),
            Point::new(40, 30, 0),
            Point::new(0, 0, 1),
            Point::new(63, 47, 1),
            Point::new(25, 25, 2),
        ]
    }

    #[test]
    fn mass_equals_count() {
        let points = corn_points();
        for &sigma in &[0.5, 3.0, 12.0] {
            let map = synthesize((48, 64), &points, sigma, DEFAULT_MIN_VALUE).unwrap();
            assert_eq!(map.shape(), (48, 64));
            assert_relative_eq!(map.sum(), 500.0, max_relative = 1e-3);
            assert_relative_eq!(map.count(), 5.0, max_relative = 1e-3);
        }
    }

    #[test]
    fn every_cell_above_floor() {
        let map = synthesize((48, 64), &corn_points(), 4.0, DEFAULT_MIN_VALUE).unwrap();
        let min = map.min().unwrap();
        assert!(min as f64 >= DEFAULT_MIN_VALUE * 0.999);
    }

    #[test]
    fn empty_points_give_floor_field() {
        let map = synthesize((8, 9), &[], 2.0, 1e-4).unwrap();
        assert!(map.view().iter().all(|&value| value == 1e-4_f64 as f32));
        assert!(map.view().iter().all(|value| value.is_finite()));
    }

    #[test]
    fn per_class_counts_add_up() {
        let points = corn_points();
        let maps = synthesize_by_class((48, 64), &points, &[0, 1, 2, 7], 3.0).unwrap();
        assert_eq!(maps.len(), 4);
        assert_relative_eq!(maps[0].count(), 2.0, max_relative = 1e-3);
        assert_relative_eq!(maps[1].count(), 2.0, max_relative = 1e-3);
        assert_relative_eq!(maps[2].count(), 1.0, max_relative = 1e-3);
        assert!(maps[3].count() < 1e-2);

        let whole = synthesize((48, 64), &points, 3.0, DEFAULT_MIN_VALUE).unwrap();
        let parts: f64 = maps[..3].iter().map(DensityMap::sum).sum();
        assert_relative_eq!(parts, whole.sum(), max_relative = 1e-3);
    }

    #[test]
    fn duplicate_impulses_follow_policy() {
        let points = vec![Point::new(5, 5, 0), Point::new(5, 5, 0), Point::new(20, 5, 0)];

        let overwrite = synthesize((11, 31), &points, 1.0, 1e-4).unwrap();
        let accumulate = DensityMapInit {
            sigma: r64(1.0),
            min_value: r64(1e-4),
            impulse_policy: ImpulsePolicy::Accumulate,
        }
        .build()
        .unwrap()
        .synthesize((11, 31), &points)
        .unwrap();

        // both keep the total mass of three objects
        assert_relative_eq!(overwrite.count(), 3.0, max_relative = 1e-3);
        assert_relative_eq!(accumulate.count(), 3.0, max_relative = 1e-3);

        // with overwriting both peaks are equal, accumulation doubles the first
        let ov = overwrite.as_array();
        assert_relative_eq!(ov[[5, 5]], ov[[5, 20]], max_relative = 1e-4);
        let ac = accumulate.as_array();
        assert_relative_eq!(ac[[5, 5]], 2.0 * ac[[5, 20]], max_relative = 1e-3);
    }

    #[test]
    fn reject_out_of_bound_point() {
        let err = synthesize((10, 10), &[Point::new(10, 3, 0)], 1.0, 1e-4).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DensityError>(),
            Some(DensityError::PointOutOfBounds { x: 10, y: 3, .. })
        ));
    }
}
