use super::*;
use crate::{common::*, density::DensityMap, npy};

/// The dataset of preprocessed images and the density maps of one class.
#[derive(Debug, Clone)]
pub struct DensityDataset {
    density_dir: PathBuf,
    class_index: usize,
    class_label: Option<i64>,
    image_files: Vec<PathBuf>,
}

impl DensityDataset {
    /// Open the dataset in `image_dir` with density maps of artifact index
    /// `class_index` in `density_dir`.
    pub fn open(
        image_dir: impl AsRef<Path>,
        density_dir: impl AsRef<Path>,
        class_index: usize,
        extensions: &[impl AsRef<str>],
    ) -> Result<Self> {
        let image_dir = image_dir.as_ref();
        let density_dir = density_dir.as_ref().to_owned();
        ensure!(
            density_dir.is_dir(),
            "'{}' is not a directory",
            density_dir.display()
        );

        let image_files = list_images(image_dir, extensions)?;
        debug!(
            "found {} images in '{}'",
            image_files.len(),
            image_dir.display()
        );

        Ok(Self {
            density_dir,
            class_index,
            class_label: None,
            image_files,
        })
    }

    /// Open the dataset of a class label, resolving its artifact index from
    /// the class index file in `density_dir`.
    pub fn open_with_label(
        image_dir: impl AsRef<Path>,
        density_dir: impl AsRef<Path>,
        class_label: i64,
        extensions: &[impl AsRef<str>],
    ) -> Result<Self> {
        let density_dir = density_dir.as_ref();
        let index = ClassIndex::open(density_dir)?;
        let class_index = index.index_of(class_label).ok_or_else(|| {
            format_err!(
                "class label {} is not listed in '{}'",
                class_label,
                density_dir.join(CLASS_INDEX_FILE).display()
            )
        })?;

        let mut dataset = Self::open(image_dir, density_dir, class_index, extensions)?;
        dataset.class_label = Some(class_label);
        Ok(dataset)
    }

    pub fn class_index(&self) -> usize {
        self.class_index
    }

    pub fn image_files(&self) -> &[PathBuf] {
        &self.image_files
    }

    /// The density map path paired with an image path.
    pub fn density_path(&self, image_file: &Path) -> Result<PathBuf> {
        let stem = file_stem(image_file)?;
        Ok(self
            .density_dir
            .join(density_file_name(stem, self.class_index)))
    }
}

impl GenericDataset for DensityDataset {
    fn class_label(&self) -> Option<i64> {
        self.class_label
    }
}

impl RandomAccessDataset for DensityDataset {
    fn num_records(&self) -> usize {
        self.image_files.len()
    }

    fn nth(&self, index: usize) -> Result<Sample> {
        let image_file = self.image_files.get(index).ok_or_else(|| {
            format_err!(
                "index {} is out of range, the dataset has {} records",
                index,
                self.image_files.len()
            )
        })?;
        let density_file = self.density_path(image_file)?;

        let image = image::open(image_file)
            .with_context(|| format!("failed to load image '{}'", image_file.display()))?
            .to_rgb8();
        let density = DensityMap::from_array(npy::read_npy(&density_file)?);

        Sample::new(image, density).with_context(|| {
            format!(
                "'{}' and '{}' are not co-registered",
                image_file.display(),
                density_file.display()
            )
        })
    }
}
