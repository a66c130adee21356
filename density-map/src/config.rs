//! Configuration formats of the preprocessing and training data pipelines.

use crate::{common::*, density::ImpulsePolicy};

/// Corpus preprocessing options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// The directory of source images.
    pub image_dir: PathBuf,
    /// The directory of annotation files named after the image stems.
    pub annotation_dir: PathBuf,
    /// The directory to write copied or letterboxed images to.
    pub output_image_dir: PathBuf,
    /// The directory to write density map arrays to.
    pub output_map_dir: PathBuf,
    /// The class labels to emit separate density maps for, in artifact index order.
    pub class_labels: Vec<i64>,
    /// If set, letterbox every image into `target_size`.
    #[serde(default)]
    pub resize: bool,
    /// The canvas `[width, height]` used when `resize` is set.
    #[serde(default = "default_target_size")]
    pub target_size: [usize; 2],
    /// The standard deviation of the Gaussian kernel in pixels.
    pub sigma: R64,
    #[serde(default = "default_min_value")]
    pub min_value: R64,
    #[serde(default)]
    pub impulse_policy: ImpulsePolicy,
    /// Accepted image file extensions, compared case-insensitively.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    /// The number of files processed concurrently. It defaults to the number of CPUs.
    pub num_workers: Option<NonZeroUsize>,
}

impl PreprocessConfig {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config: Self = json5::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.class_labels.is_empty(), "class_labels must not be empty");
        ensure!(
            self.class_labels.iter().all_unique(),
            "class_labels must not contain duplicates"
        );
        ensure!(self.sigma > 0.0, "sigma must be positive");
        ensure!(self.min_value >= 0.0, "min_value must be non-negative");
        let [width, height] = self.target_size;
        ensure!(
            width > 0 && height > 0,
            "target_size must be positive, but get {}x{}",
            width,
            height
        );
        ensure!(
            !self.image_extensions.is_empty(),
            "image_extensions must not be empty"
        );
        Ok(())
    }
}

/// Training sample augmentation options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AugmentationConfig {
    /// The stages, executed in order.
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

impl AugmentationConfig {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

/// Variants of augmentation stages and options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageConfig {
    /// Flip image and density map left to right.
    HorizontalFlip { prob: R64 },
    /// Flip image and density map upside down.
    VerticalFlip { prob: R64 },
    /// Pad when needed, then crop image and density map at one origin.
    RandomCrop { height: usize, width: usize },
    /// Hue, saturation and brightness jitter on the image only.
    ColorJitter {
        #[serde(default = "default_jitter_prob")]
        prob: R64,
        hue_shift: Option<R64>,
        saturation_shift: Option<R64>,
        value_shift: Option<R64>,
    },
}

fn default_target_size() -> [usize; 2] {
    [256, 256]
}

fn default_min_value() -> R64 {
    r64(crate::density::DEFAULT_MIN_VALUE)
}

fn default_image_extensions() -> Vec<String> {
    vec!["png".into(), "jpg".into(), "jpeg".into()]
}

fn default_jitter_prob() -> R64 {
    r64(0.5)
}
