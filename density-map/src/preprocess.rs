//! Corpus preprocessing into images and per-class density map artifacts.

use crate::{
    annotation,
    common::*,
    config::PreprocessConfig,
    dataset::{density_file_name, file_stem, list_images, ClassIndex},
    density::{DensityMapInit, DensityMapSynthesizer},
    npy,
    processor::letterbox,
};

/// The outcome of one source image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileOutcome {
    /// The image and its density maps are written.
    Processed,
    /// The image has no annotation file.
    Skipped,
    /// The image failed with the attached error message.
    Failed(String),
}

/// Per-file outcome counts of a preprocessing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// The failed images and their error messages, sorted by path.
    pub failures: Vec<(PathBuf, String)>,
}

impl PreprocessReport {
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed
    }

    fn record(&mut self, path: PathBuf, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Processed => self.processed += 1,
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Failed(message) => {
                self.failed += 1;
                self.failures.push((path, message));
            }
        }
    }
}

/// Process every image of the corpus described by `config`.
///
/// Errors of individual files are reported rather than returned. The
/// function fails only if the corpus cannot be listed or the output
/// directories cannot be prepared.
pub async fn preprocess(config: &PreprocessConfig) -> Result<PreprocessReport> {
    config.validate()?;
    let PreprocessConfig {
        ref image_dir,
        ref output_image_dir,
        ref output_map_dir,
        ref image_extensions,
        num_workers,
        sigma,
        min_value,
        impulse_policy,
        ..
    } = *config;

    tokio::fs::create_dir_all(output_image_dir)
        .await
        .with_context(|| format!("failed to create '{}'", output_image_dir.display()))?;
    tokio::fs::create_dir_all(output_map_dir)
        .await
        .with_context(|| format!("failed to create '{}'", output_map_dir.display()))?;

    let image_files = list_images(image_dir, image_extensions)?;
    let num_workers = num_workers
        .map(NonZeroUsize::get)
        .unwrap_or_else(num_cpus::get);
    info!(
        "preprocess {} images in '{}' with {} workers",
        image_files.len(),
        image_dir.display(),
        num_workers
    );

    let synthesizer = Arc::new(
        DensityMapInit {
            sigma,
            min_value,
            impulse_policy,
        }
        .build()?,
    );
    let config = Arc::new(config.clone());

    let mut outcomes: Vec<(PathBuf, FileOutcome)> = stream::iter(image_files)
        .map(|image_file| {
            let config = config.clone();
            let synthesizer = synthesizer.clone();

            async move {
                let path = image_file.clone();
                let result = tokio::task::spawn_blocking(move || {
                    process_file(&config, &synthesizer, &image_file)
                })
                .await;

                let outcome = match result {
                    Ok(Ok(())) => {
                        debug!("processed '{}'", path.display());
                        FileOutcome::Processed
                    }
                    Ok(Err(err)) => classify(&path, err),
                    Err(err) => {
                        warn!("worker of '{}' panicked: {}", path.display(), err);
                        FileOutcome::Failed(err.to_string())
                    }
                };
                (path, outcome)
            }
        })
        .buffer_unordered(num_workers)
        .collect()
        .await;
    outcomes.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));

    let report = outcomes
        .into_iter()
        .fold(PreprocessReport::default(), |mut report, (path, outcome)| {
            report.record(path, outcome);
            report
        });

    ClassIndex::new(config.class_labels.clone()).save(output_map_dir)?;

    info!(
        "processed {} images, skipped {}, failed {}",
        report.processed, report.skipped, report.failed
    );
    Ok(report)
}

fn classify(path: &Path, err: Error) -> FileOutcome {
    match err.downcast_ref::<DensityError>() {
        Some(DensityError::MissingAnnotation { annotation, .. }) => {
            warn!(
                "skip '{}' because '{}' does not exist",
                path.display(),
                annotation.display()
            );
            FileOutcome::Skipped
        }
        _ => {
            warn!("failed to process '{}': {:#}", path.display(), err);
            FileOutcome::Failed(format!("{:#}", err))
        }
    }
}

/// Produce the output image and the per-class density maps of one image.
pub fn process_file(
    config: &PreprocessConfig,
    synthesizer: &DensityMapSynthesizer,
    image_file: &Path,
) -> Result<()> {
    let PreprocessConfig {
        ref annotation_dir,
        ref output_image_dir,
        ref output_map_dir,
        ref class_labels,
        resize,
        target_size: [target_w, target_h],
        ..
    } = *config;

    let stem = file_stem(image_file)?;
    let file_name = image_file
        .file_name()
        .ok_or_else(|| format_err!("invalid file name '{}'", image_file.display()))?;
    let annotation_file = annotation_dir.join(format!("{}.txt", stem));
    if !annotation_file.is_file() {
        return Err(DensityError::MissingAnnotation {
            image: image_file.to_owned(),
            annotation: annotation_file,
        }
        .into());
    }

    // the output image is written only after every map
    let (canvas, points, shape) = if resize {
        let image = image::open(image_file)
            .with_context(|| format!("failed to load image '{}'", image_file.display()))?
            .to_rgb8();
        let (orig_w, orig_h) = image.dimensions();
        let points =
            annotation::read_annotations(&annotation_file, orig_w as usize, orig_h as usize)?;

        let boxed = letterbox(&image, (target_w, target_h))?;
        let transform = boxed.transform();
        let points = points
            .iter()
            .map(|point| transform.project_point(point))
            .collect_vec();

        (Some(boxed.canvas), points, (target_h, target_w))
    } else {
        let (orig_w, orig_h) = image::image_dimensions(image_file)
            .with_context(|| format!("failed to read size of '{}'", image_file.display()))?;
        let points =
            annotation::read_annotations(&annotation_file, orig_w as usize, orig_h as usize)?;

        (None, points, (orig_h as usize, orig_w as usize))
    };

    let maps = synthesizer.synthesize_by_class(shape, &points, class_labels)?;
    for (class_index, map) in maps.iter().enumerate() {
        let path = output_map_dir.join(density_file_name(stem, class_index));
        npy::write_npy(&path, map.as_array())?;
    }

    let output_image_file = output_image_dir.join(file_name);
    match canvas {
        Some(canvas) => canvas
            .save(&output_image_file)
            .with_context(|| format!("failed to save '{}'", output_image_file.display()))?,
        None => {
            fs::copy(image_file, &output_image_file)
                .with_context(|| format!("failed to copy to '{}'", output_image_file.display()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::ImpulsePolicy;

    fn config(root: &Path) -> PreprocessConfig {
        PreprocessConfig {
            image_dir: root.join("images"),
            annotation_dir: root.join("labels"),
            output_image_dir: root.join("out/images"),
            output_map_dir: root.join("out/maps"),
            class_labels: vec![0, 1],
            resize: false,
            target_size: [32, 32],
            sigma: r64(2.0),
            min_value: r64(1e-4),
            impulse_policy: ImpulsePolicy::Overwrite,
            image_extensions: vec!["png".into()],
            num_workers: NonZeroUsize::new(2),
        }
    }

    #[test]
    fn missing_annotation_is_typed() {
        let root = tempfile::tempdir().unwrap();
        let config = config(root.path());
        fs::create_dir_all(&config.image_dir).unwrap();
        fs::create_dir_all(&config.annotation_dir).unwrap();
        let image_file = config.image_dir.join("lonely.png");
        RgbImage::new(8, 8).save(&image_file).unwrap();

        let synthesizer = DensityMapInit::default().build().unwrap();
        let err = process_file(&config, &synthesizer, &image_file).unwrap_err();
        assert!(matches!(classify(&image_file, err), FileOutcome::Skipped));
    }

    #[test]
    fn failed_file_leaves_no_image() {
        let root = tempfile::tempdir().unwrap();
        let config = config(root.path());
        fs::create_dir_all(&config.image_dir).unwrap();
        fs::create_dir_all(&config.annotation_dir).unwrap();
        fs::create_dir_all(&config.output_image_dir).unwrap();
        fs::create_dir_all(&config.output_map_dir).unwrap();

        let image_file = config.image_dir.join("a.png");
        RgbImage::new(20, 10).save(&image_file).unwrap();
        fs::write(config.annotation_dir.join("a.txt"), "0 0.5 0.5 0.1 0.1\n").unwrap();

        // a directory in place of the second map makes the write fail
        fs::create_dir(config.output_map_dir.join(density_file_name("a", 1))).unwrap();

        let synthesizer = DensityMapInit::default().build().unwrap();
        let err = process_file(&config, &synthesizer, &image_file).unwrap_err();
        assert!(matches!(classify(&image_file, err), FileOutcome::Failed(_)));
        assert!(!config.output_image_dir.join("a.png").exists());
    }

    #[test]
    fn edge_center_is_processed() {
        let root = tempfile::tempdir().unwrap();
        let config = config(root.path());
        fs::create_dir_all(&config.image_dir).unwrap();
        fs::create_dir_all(&config.annotation_dir).unwrap();
        fs::create_dir_all(&config.output_image_dir).unwrap();
        fs::create_dir_all(&config.output_map_dir).unwrap();

        let image_file = config.image_dir.join("a.png");
        RgbImage::new(20, 10).save(&image_file).unwrap();
        fs::write(config.annotation_dir.join("a.txt"), "0 1.0 0.5 0.1 0.1\n").unwrap();

        let synthesizer = DensityMapInit::default().build().unwrap();
        process_file(&config, &synthesizer, &image_file).unwrap();
        assert!(config.output_image_dir.join("a.png").exists());

        let map = npy::read_npy(config.output_map_dir.join(density_file_name("a", 0))).unwrap();
        assert_eq!(map.dim(), (10, 20));
        let count = map.iter().map(|&value| value as f64).sum::<f64>() / 100.0;
        assert!((count - 1.0).abs() < 1e-3);
    }

    #[test]
    fn report_counts_outcomes() {
        let mut report = PreprocessReport::default();
        report.record("a".into(), FileOutcome::Processed);
        report.record("b".into(), FileOutcome::Skipped);
        report.record("c".into(), FileOutcome::Failed("oops".into()));
        assert_eq!(report.total(), 3);
        assert_eq!(report.failures, vec![(PathBuf::from("c"), "oops".to_owned())]);
    }
}
