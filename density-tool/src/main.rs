use anyhow::{ensure, Context, Result};
use density_map::{
    config::{AugmentationConfig, PreprocessConfig},
    dataset::{density_file_name, file_stem, DensityDataset, RandomAccessDataset},
    density::DensityMap,
    npy,
    preprocess::preprocess,
    processor::AugmentationPipeline,
};
use prettytable::{cell, row, Table};
use rand::{rngs::StdRng, SeedableRng};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use structopt::StructOpt;
use tracing::{info, info_span, warn, Instrument};
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

#[derive(Debug, Clone, StructOpt)]
/// Density map preprocessing and inspection toolkit.
enum Args {
    /// Generate images and per-class density maps from an annotated corpus.
    Preprocess {
        #[structopt(long, default_value = "preprocess.json5")]
        /// configuration file
        config_file: PathBuf,
    },
    /// Print the object counts stored in density map files.
    Count {
        /// density map files
        files: Vec<PathBuf>,
    },
    /// Print the shape and value statistics of a density map file.
    Inspect {
        /// density map file
        file: PathBuf,
    },
    /// Write augmented copies of a preprocessed dataset.
    Augment {
        #[structopt(long)]
        /// directory of preprocessed images
        image_dir: PathBuf,
        #[structopt(long)]
        /// directory of density map files
        density_dir: PathBuf,
        #[structopt(long, default_value = "0")]
        /// class index of the density maps
        class_index: usize,
        #[structopt(long, default_value = "augment.json5")]
        /// augmentation configuration file
        config_file: PathBuf,
        #[structopt(long)]
        /// output directory
        output_dir: PathBuf,
        #[structopt(long, default_value = "1")]
        /// number of augmented copies per record
        repeat: usize,
        #[structopt(long)]
        /// random seed
        seed: Option<u64>,
    },
}

#[tokio::main]
pub async fn main() -> Result<()> {
    // setup tracing
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    match Args::from_args() {
        Args::Preprocess { config_file } => run_preprocess(config_file)
            .instrument(info_span!("preprocess"))
            .await?,
        Args::Count { files } => count(&files)?,
        Args::Inspect { file } => inspect(file)?,
        Args::Augment {
            image_dir,
            density_dir,
            class_index,
            config_file,
            output_dir,
            repeat,
            seed,
        } => augment(
            image_dir,
            density_dir,
            class_index,
            config_file,
            output_dir,
            repeat,
            seed,
        )?,
    }

    Ok(())
}

async fn run_preprocess(config_file: PathBuf) -> Result<()> {
    let config = PreprocessConfig::open(&config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))?;
    let report = preprocess(&config).await?;

    if !report.failures.is_empty() {
        let mut table = Table::new();
        table.add_row(row!["failed file", "error"]);
        report.failures.iter().for_each(|(path, message)| {
            table.add_row(row![path.display(), message]);
        });
        table.printstd();
    }

    let mut table = Table::new();
    table.add_row(row!["processed", "skipped", "failed", "total"]);
    table.add_row(row![
        report.processed,
        report.skipped,
        report.failed,
        report.total()
    ]);
    table.printstd();

    Ok(())
}

fn count(files: &[PathBuf]) -> Result<()> {
    ensure!(!files.is_empty(), "no density map file is given");

    let mut table = Table::new();
    table.add_row(row!["file", "count"]);
    let mut total = 0.0;

    for file in files {
        let map = DensityMap::from_array(npy::read_npy(file)?);
        let count = map.count();
        total += count;
        table.add_row(row![file.display(), format!("{:.2}", count)]);
    }

    if files.len() > 1 {
        table.add_row(row!["total", format!("{:.2}", total)]);
    }
    table.printstd();
    Ok(())
}

fn inspect(file: impl AsRef<Path>) -> Result<()> {
    let file = file.as_ref();
    let map = DensityMap::from_array(npy::read_npy(file)?);
    let (height, width) = map.shape();
    let values = map.view();
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mean = if values.is_empty() {
        0.0
    } else {
        map.sum() / values.len() as f64
    };

    let mut table = Table::new();
    table.add_row(row!["file", file.display()]);
    table.add_row(row!["shape", format!("{}x{}", height, width)]);
    table.add_row(row!["sum", format!("{:.4}", map.sum())]);
    table.add_row(row!["count", format!("{:.2}", map.count())]);
    table.add_row(row![
        "min",
        map.min()
            .map(|min| format!("{:e}", min))
            .unwrap_or_else(|| "-".into())
    ]);
    table.add_row(row!["max", format!("{:e}", max)]);
    table.add_row(row!["mean", format!("{:e}", mean)]);
    table.printstd();

    Ok(())
}

fn augment(
    image_dir: PathBuf,
    density_dir: PathBuf,
    class_index: usize,
    config_file: PathBuf,
    output_dir: PathBuf,
    repeat: usize,
    seed: Option<u64>,
) -> Result<()> {
    let config = AugmentationConfig::open(&config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))?;
    let pipeline = AugmentationPipeline::from_config(&config)?;
    let dataset = DensityDataset::open(
        &image_dir,
        &density_dir,
        class_index,
        &["png", "jpg", "jpeg"],
    )?;
    fs::create_dir_all(&output_dir)?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut num_written = 0;
    for (index, image_file) in dataset.image_files().iter().enumerate() {
        let sample = match dataset.nth(index) {
            Ok(sample) => sample,
            Err(err) => {
                warn!("skip '{}': {:#}", image_file.display(), err);
                continue;
            }
        };
        let stem = file_stem(image_file)?;

        for round in 0..repeat {
            let output = pipeline.forward(sample.clone(), &mut rng)?;
            let output_stem = format!("{}_aug_{}", stem, round);
            output
                .image
                .save(output_dir.join(format!("{}.png", output_stem)))?;
            npy::write_npy(
                output_dir.join(density_file_name(&output_stem, class_index)),
                output.density.as_array(),
            )?;
            num_written += 1;
        }
    }

    info!(
        "wrote {} augmented samples to '{}'",
        num_written,
        output_dir.display()
    );
    Ok(())
}
