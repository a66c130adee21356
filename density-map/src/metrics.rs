//! Count recovery and training losses over predicted density maps.

use crate::{common::*, density::IMPULSE};
use ndarray::ArrayView4;

/// Recover the object count of a density map array.
pub fn count(map: ArrayView2<'_, f32>) -> f64 {
    map.iter().map(|&value| value as f64).sum::<f64>() / IMPULSE
}

/// The absolute difference of recovered counts.
pub fn count_error(pred: ArrayView2<'_, f32>, target: ArrayView2<'_, f32>) -> f64 {
    (count(pred) - count(target)).abs()
}

/// The mean absolute count error over a `[batch, channel, height, width]`
/// batch, counting all channels of a sample together.
pub fn batch_count_error(pred: ArrayView4<'_, f32>, target: ArrayView4<'_, f32>) -> Result<f64> {
    check_shapes(&pred, &target)?;
    let errors = izip!(pred.outer_iter(), target.outer_iter()).map(|(pred, target)| {
        let pred: f64 = pred.iter().map(|&value| value as f64).sum();
        let target: f64 = target.iter().map(|&value| value as f64).sum();
        ((pred - target) / IMPULSE).abs()
    });
    Ok(mean(errors))
}

/// The mean squared error of two batches.
pub fn mse(pred: ArrayView4<'_, f32>, target: ArrayView4<'_, f32>) -> Result<f64> {
    check_shapes(&pred, &target)?;
    let errors = izip!(pred.iter(), target.iter()).map(|(&pred, &target)| {
        let diff = pred as f64 - target as f64;
        diff * diff
    });
    Ok(mean(errors))
}

/// The selectable training loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    Mse,
    Density,
}

impl Default for LossKind {
    fn default() -> Self {
        Self::Mse
    }
}

/// The weighted sum of the pixel MSE and the mean absolute percentage error
/// of per-map counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityLoss {
    pub lambda_mse: R64,
    pub lambda_mape: R64,
}

impl Default for DensityLoss {
    fn default() -> Self {
        Self {
            lambda_mse: r64(1.0),
            lambda_mape: r64(0.5),
        }
    }
}

impl DensityLoss {
    pub fn forward(&self, pred: ArrayView4<'_, f32>, target: ArrayView4<'_, f32>) -> Result<f64> {
        let mse_loss = mse(pred.view(), target.view())?;

        // per (sample, channel) map sums, offset by one to stay finite on empty maps
        let pred_sums = pred.sum_axis(Axis(3)).sum_axis(Axis(2));
        let target_sums = target.sum_axis(Axis(3)).sum_axis(Axis(2));
        let mape_loss = mean(
            izip!(pred_sums.iter(), target_sums.iter()).map(|(&pred, &target)| {
                let pred = pred as f64 + 1.0;
                let target = target as f64 + 1.0;
                (target - pred).abs() / target
            }),
        );

        Ok(self.lambda_mse.raw() * mse_loss + self.lambda_mape.raw() * mape_loss)
    }
}

/// Compute the loss of `kind` with default weights.
pub fn loss(kind: LossKind, pred: ArrayView4<'_, f32>, target: ArrayView4<'_, f32>) -> Result<f64> {
    match kind {
        LossKind::Mse => mse(pred, target),
        LossKind::Density => DensityLoss::default().forward(pred, target),
    }
}

fn check_shapes(pred: &ArrayView4<'_, f32>, target: &ArrayView4<'_, f32>) -> Result<()> {
    ensure!(
        pred.shape() == target.shape(),
        "prediction shape {:?} does not match target shape {:?}",
        pred.shape(),
        target.shape()
    );
    Ok(())
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, len) = values.fold((0.0, 0usize), |(sum, len), value| (sum + value, len + 1));
    if len == 0 {
        0.0
    } else {
        sum / len as f64
    }
}
