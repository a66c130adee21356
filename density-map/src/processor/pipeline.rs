//! Ordered augmentation stages over (image, density map) samples.

use super::{
    color_jitter::{ColorJitter, ColorJitterInit},
    random_crop::{RandomCrop, RandomCropInit},
    random_flip::{FlipAxis, RandomFlip, RandomFlipInit},
};
use crate::{
    common::*,
    config::{AugmentationConfig, StageConfig},
    dataset::Sample,
};

/// An operation applied to both members of a sample with shared random decisions.
#[derive(Debug, Clone)]
pub enum PairedOp {
    HorizontalFlip(RandomFlip),
    VerticalFlip(RandomFlip),
    RandomCrop(RandomCrop),
}

impl PairedOp {
    pub fn forward<R: Rng + ?Sized>(&self, sample: Sample, rng: &mut R) -> Result<Sample> {
        let Sample { image, density } = sample;
        let (image, density) = match self {
            Self::HorizontalFlip(flip) | Self::VerticalFlip(flip) => {
                flip.forward(image, density, rng)
            }
            Self::RandomCrop(crop) => crop.forward(image, density, rng)?,
        };
        Sample::new(image, density)
    }
}

/// An operation applied to the image only.
#[derive(Debug, Clone)]
pub enum ImageOp {
    ColorJitter(ColorJitter),
}

impl ImageOp {
    pub fn forward<R: Rng + ?Sized>(&self, image: RgbImage, rng: &mut R) -> RgbImage {
        match self {
            Self::ColorJitter(jitter) => jitter.forward(image, rng),
        }
    }
}

/// One step of the augmentation pipeline.
#[derive(Debug, Clone)]
pub enum Stage {
    Paired(PairedOp),
    ImageOnly(ImageOp),
}

impl Stage {
    pub fn forward<R: Rng + ?Sized>(&self, sample: Sample, rng: &mut R) -> Result<Sample> {
        match self {
            Self::Paired(op) => op.forward(sample, rng),
            Self::ImageOnly(op) => {
                let Sample { image, density } = sample;
                Ok(Sample {
                    image: op.forward(image, rng),
                    density,
                })
            }
        }
    }
}

impl TryFrom<&StageConfig> for Stage {
    type Error = Error;

    fn try_from(config: &StageConfig) -> Result<Self> {
        let stage = match *config {
            StageConfig::HorizontalFlip { prob } => Self::Paired(PairedOp::HorizontalFlip(
                RandomFlipInit {
                    axis: FlipAxis::Horizontal,
                    prob,
                }
                .build()?,
            )),
            StageConfig::VerticalFlip { prob } => Self::Paired(PairedOp::VerticalFlip(
                RandomFlipInit {
                    axis: FlipAxis::Vertical,
                    prob,
                }
                .build()?,
            )),
            StageConfig::RandomCrop { height, width } => Self::Paired(PairedOp::RandomCrop(
                RandomCropInit { height, width }.build()?,
            )),
            StageConfig::ColorJitter {
                prob,
                hue_shift,
                saturation_shift,
                value_shift,
            } => Self::ImageOnly(ImageOp::ColorJitter(
                ColorJitterInit {
                    prob,
                    hue_shift,
                    saturation_shift,
                    value_shift,
                }
                .build()?,
            )),
        };
        Ok(stage)
    }
}

/// Runs stages in declaration order, each consuming the output of the previous.
#[derive(Debug, Clone, Default)]
pub struct AugmentationPipeline {
    stages: Vec<Stage>,
}

impl AugmentationPipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn from_config(config: &AugmentationConfig) -> Result<Self> {
        let stages: Vec<_> = config.stages.iter().map(Stage::try_from).try_collect()?;
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn forward<R: Rng + ?Sized>(&self, sample: Sample, rng: &mut R) -> Result<Sample> {
        self.stages
            .iter()
            .try_fold(sample, |sample, stage| stage.forward(sample, rng))
    }
}
