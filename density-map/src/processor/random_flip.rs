//! Random flips shared by an image and its density map.

use super::raster::{FlipDecision, Raster};
use crate::common::*;

/// The flip direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// Random flip initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RandomFlipInit {
    pub axis: FlipAxis,
    pub prob: R64,
}

impl RandomFlipInit {
    pub fn build(self) -> Result<RandomFlip> {
        let Self { axis, prob } = self;
        ensure!(
            (0.0..=1.0).contains(&prob.raw()),
            "flip probability must be in range 0.0..=1.0, but get {}",
            prob
        );
        Ok(RandomFlip {
            axis,
            prob: prob.raw(),
        })
    }
}

/// Flips both members of a pair with one shared coin toss.
#[derive(Debug, Clone)]
pub struct RandomFlip {
    axis: FlipAxis,
    prob: f64,
}

impl RandomFlip {
    pub fn axis(&self) -> FlipAxis {
        self.axis
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> FlipDecision {
        FlipDecision::sample(self.prob, rng)
    }

    pub fn apply<T: Raster>(&self, decision: FlipDecision, raster: T) -> T {
        match (decision, self.axis) {
            (FlipDecision::Keep, _) => raster,
            (FlipDecision::Flip, FlipAxis::Horizontal) => raster.flip_horizontal(),
            (FlipDecision::Flip, FlipAxis::Vertical) => raster.flip_vertical(),
        }
    }

    pub fn forward<A, B, R>(&self, first: A, second: B, rng: &mut R) -> (A, B)
    where
        A: Raster,
        B: Raster,
        R: Rng + ?Sized,
    {
        let decision = self.sample(rng);
        (self.apply(decision, first), self.apply(decision, second))
    }
}
