use approx::assert_relative_eq;
use density_map::{
    config::PreprocessConfig,
    dataset::{density_file_name, ClassIndex, DensityDataset, RandomAccessDataset},
    density::{DensityMap, ImpulsePolicy},
    npy,
    preprocess::preprocess,
};
use image::{Rgb, RgbImage};
use noisy_float::prelude::*;
use std::{fs, num::NonZeroUsize, path::Path};

fn write_corpus(root: &Path) {
    let image_dir = root.join("images");
    let label_dir = root.join("labels");
    fs::create_dir_all(&image_dir).unwrap();
    fs::create_dir_all(&label_dir).unwrap();

    // 80x40, three kernels of class 0 and one of class 1
    RgbImage::from_pixel(80, 40, Rgb([120, 200, 40]))
        .save(image_dir.join("ear_a.png"))
        .unwrap();
    fs::write(
        label_dir.join("ear_a.txt"),
        "0 0.10 0.20 0.05 0.05\n\
         0 0.50 0.50 0.05 0.05\n\
         1 0.90 0.80 0.05 0.05\n\
         0 0.30 0.70 0.05 0.05\n",
    )
    .unwrap();

    // 30x60 without kernels
    RgbImage::from_pixel(30, 60, Rgb([10, 10, 10]))
        .save(image_dir.join("ear_b.PNG"))
        .unwrap();
    fs::write(label_dir.join("ear_b.txt"), "").unwrap();

    // no annotation file
    RgbImage::new(16, 16)
        .save(image_dir.join("ear_c.png"))
        .unwrap();

    // malformed annotation
    RgbImage::new(16, 16)
        .save(image_dir.join("ear_d.png"))
        .unwrap();
    fs::write(label_dir.join("ear_d.txt"), "0 0.5 0.5 0.1\n").unwrap();

    // not an image
    fs::write(image_dir.join("notes.txt"), "ignored").unwrap();
}

fn config(root: &Path, resize: bool) -> PreprocessConfig {
    PreprocessConfig {
        image_dir: root.join("images"),
        annotation_dir: root.join("labels"),
        output_image_dir: root.join("out/images"),
        output_map_dir: root.join("out/maps"),
        class_labels: vec![0, 1, 5],
        resize,
        target_size: [64, 64],
        sigma: r64(3.0),
        min_value: r64(1e-4),
        impulse_policy: ImpulsePolicy::Overwrite,
        image_extensions: vec!["png".into(), "jpg".into()],
        num_workers: NonZeroUsize::new(2),
    }
}

fn load_map(config: &PreprocessConfig, stem: &str, class_index: usize) -> DensityMap {
    let path = config
        .output_map_dir
        .join(density_file_name(stem, class_index));
    DensityMap::from_array(npy::read_npy(path).unwrap())
}

#[tokio::test]
async fn preprocess_without_resize() {
    let root = tempfile::tempdir().unwrap();
    write_corpus(root.path());
    let config = config(root.path(), false);

    let report = preprocess(&config).await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 1);
    assert!(report.failures[0].0.ends_with("ear_d.png"));

    let class_0 = load_map(&config, "ear_a", 0);
    let class_1 = load_map(&config, "ear_a", 1);
    let class_5 = load_map(&config, "ear_a", 2);
    assert_eq!(class_0.shape(), (40, 80));
    assert_relative_eq!(class_0.count(), 3.0, max_relative = 1e-3);
    assert_relative_eq!(class_1.count(), 1.0, max_relative = 1e-3);
    assert!(class_5.count() < 1e-2);

    let empty = load_map(&config, "ear_b", 0);
    assert_eq!(empty.shape(), (60, 30));
    assert!(empty.view().iter().all(|value| value.is_finite()));

    // images are copied verbatim
    assert_eq!(
        fs::read(root.path().join("images/ear_a.png")).unwrap(),
        fs::read(config.output_image_dir.join("ear_a.png")).unwrap()
    );
    assert!(!config.output_image_dir.join("ear_c.png").exists());
    assert!(!config
        .output_map_dir
        .join(density_file_name("ear_c", 0))
        .exists());

    let index = ClassIndex::open(&config.output_map_dir).unwrap();
    assert_eq!(index.class_labels, vec![0, 1, 5]);
}

#[tokio::test]
async fn preprocess_with_resize() {
    let root = tempfile::tempdir().unwrap();
    write_corpus(root.path());
    let config = config(root.path(), true);

    let report = preprocess(&config).await.unwrap();
    assert_eq!((report.processed, report.skipped, report.failed), (2, 1, 1));

    let canvas = image::open(config.output_image_dir.join("ear_a.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(canvas.dimensions(), (64, 64));
    // 80x40 is letterboxed into 64x32 at row 16
    assert_eq!(canvas.get_pixel(32, 4), &Rgb([0, 0, 0]));
    assert_eq!(canvas.get_pixel(32, 60), &Rgb([0, 0, 0]));

    let class_0 = load_map(&config, "ear_a", 0);
    assert_eq!(class_0.shape(), (64, 64));
    assert_relative_eq!(class_0.count(), 3.0, max_relative = 1e-3);

    // the mass stays inside the pasted band
    let band: f64 = class_0
        .view()
        .rows()
        .into_iter()
        .skip(16)
        .take(32)
        .flat_map(|row| row.to_vec())
        .map(|value| value as f64)
        .sum();
    assert!(band / class_0.sum() > 0.9);

    let dataset = DensityDataset::open_with_label(
        &config.output_image_dir,
        &config.output_map_dir,
        1,
        &["png"],
    )
    .unwrap();
    assert_eq!(dataset.num_records(), 2);
    let sample = dataset.nth(0).unwrap();
    assert_eq!(sample.shape(), (64, 64));
    assert_relative_eq!(sample.density.count(), 1.0, max_relative = 1e-3);
}
