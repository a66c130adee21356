use super::*;
use crate::{common::*, processor::AugmentationPipeline};

/// Training stream initializer.
#[derive(Debug, Clone)]
pub struct TrainingStreamInit {
    pub batch_size: NonZeroUsize,
    /// The number of samples loaded concurrently. It defaults to the number of CPUs.
    pub num_workers: Option<NonZeroUsize>,
    /// Makes the shuffling and augmentation reproducible if set.
    pub seed: Option<u64>,
}

impl TrainingStreamInit {
    pub fn build<D>(self, dataset: D, pipeline: AugmentationPipeline) -> Result<TrainingStream<D>>
    where
        D: 'static + RandomAccessDataset,
    {
        let Self {
            batch_size,
            num_workers,
            seed,
        } = self;
        ensure!(
            dataset.num_records() > 0,
            "the dataset must contain at least one record"
        );
        let num_workers = num_workers.map(NonZeroUsize::get).unwrap_or_else(num_cpus::get);

        Ok(TrainingStream {
            dataset: Arc::new(dataset),
            pipeline: Arc::new(pipeline),
            batch_size: batch_size.get(),
            num_workers,
            seed,
        })
    }
}

/// Shuffled, augmented and batched samples of a dataset.
#[derive(Debug)]
pub struct TrainingStream<D>
where
    D: 'static + RandomAccessDataset,
{
    dataset: Arc<D>,
    pipeline: Arc<AugmentationPipeline>,
    batch_size: usize,
    num_workers: usize,
    seed: Option<u64>,
}

impl<D> Clone for TrainingStream<D>
where
    D: 'static + RandomAccessDataset,
{
    fn clone(&self) -> Self {
        Self {
            dataset: self.dataset.clone(),
            pipeline: self.pipeline.clone(),
            batch_size: self.batch_size,
            num_workers: self.num_workers,
            seed: self.seed,
        }
    }
}

impl<D> GenericDataset for TrainingStream<D>
where
    D: 'static + RandomAccessDataset,
{
    fn class_label(&self) -> Option<i64> {
        self.dataset.class_label()
    }
}

impl<D> TrainingStream<D>
where
    D: 'static + RandomAccessDataset,
{
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The number of batches in an epoch. The last batch may be smaller.
    pub fn num_batches(&self) -> usize {
        (self.dataset.num_records() + self.batch_size - 1) / self.batch_size
    }

    /// Visit every record once in a shuffled order.
    pub fn epoch(&self, epoch: usize) -> Pin<Box<dyn Stream<Item = Result<Batch>> + Send>> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(epoch as u64)),
            None => StdRng::from_entropy(),
        };

        // draw the order and one augmentation seed per record up front
        let mut indexes = (0..self.dataset.num_records()).collect_vec();
        indexes.shuffle(&mut rng);
        let jobs = indexes
            .into_iter()
            .map(|index| (index, rng.gen::<u64>()))
            .collect_vec();

        let dataset = self.dataset.clone();
        let pipeline = self.pipeline.clone();

        let stream = stream::iter(jobs)
            .map(move |(index, seed)| {
                let dataset = dataset.clone();
                let pipeline = pipeline.clone();

                async move {
                    tokio::task::spawn_blocking(move || {
                        let mut rng = StdRng::seed_from_u64(seed);
                        let sample = dataset.nth(index)?;
                        pipeline.forward(sample, &mut rng)
                    })
                    .await?
                }
            })
            .buffered(self.num_workers)
            .chunks(self.batch_size)
            .map(|samples| {
                let samples: Vec<_> = samples.into_iter().try_collect()?;
                Batch::from_samples(&samples)
            });

        Box::pin(stream)
    }

    /// Repeat epochs endlessly, tagging each batch with its epoch.
    pub fn epochs(&self) -> Pin<Box<dyn Stream<Item = Result<(usize, Batch)>> + Send>> {
        let this = self.clone();
        let stream = stream::iter(0..).flat_map(move |epoch| {
            debug!("start epoch {}", epoch);
            this.epoch(epoch)
                .map(move |result| result.map(|batch| (epoch, batch)))
        });
        Box::pin(stream)
    }
}
