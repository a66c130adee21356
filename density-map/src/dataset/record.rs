use crate::{common::*, density::DensityMap};

/// A co-registered image and density map.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub image: RgbImage,
    pub density: DensityMap,
}

impl Sample {
    pub fn new(image: RgbImage, density: DensityMap) -> Result<Self> {
        let (width, height) = image.dimensions();
        let (density_h, density_w) = density.shape();
        if (height as usize, width as usize) != (density_h, density_w) {
            return Err(DensityError::ShapeMismatch {
                image_h: height as usize,
                image_w: width as usize,
                density_h,
                density_w,
            }
            .into());
        }
        Ok(Self { image, density })
    }

    /// Get the (height, width) shape.
    pub fn shape(&self) -> (usize, usize) {
        self.density.shape()
    }

    /// The image as a `[3, height, width]` array in range 0..=1.
    pub fn image_array(&self) -> Array3<f32> {
        let (height, width) = self.shape();
        Array3::from_shape_fn((3, height, width), |(c, y, x)| {
            self.image.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        })
    }

    /// The density map as a `[1, height, width]` array.
    pub fn density_array(&self) -> Array3<f32> {
        self.density.as_array().clone().insert_axis(Axis(0))
    }

    #[cfg(feature = "tch")]
    pub fn to_tensors(&self) -> (tch::Tensor, tch::Tensor) {
        (to_tensor(&self.image_array()), to_tensor(&self.density_array()))
    }
}

/// Equally sized samples stacked along a leading batch axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// `[batch, 3, height, width]`
    pub images: Array4<f32>,
    /// `[batch, 1, height, width]`
    pub densities: Array4<f32>,
}

impl Batch {
    pub fn from_samples(samples: &[Sample]) -> Result<Self> {
        let first = samples
            .first()
            .ok_or_else(|| format_err!("cannot build a batch from zero samples"))?;
        let shape = first.shape();
        ensure!(
            samples.iter().all(|sample| sample.shape() == shape),
            "samples in a batch must have identical shape, consider a random_crop stage"
        );

        let images: Vec<_> = samples.iter().map(Sample::image_array).collect();
        let densities: Vec<_> = samples.iter().map(Sample::density_array).collect();
        let images = ndarray::stack(
            Axis(0),
            &images.iter().map(|array| array.view()).collect_vec(),
        )?;
        let densities = ndarray::stack(
            Axis(0),
            &densities.iter().map(|array| array.view()).collect_vec(),
        )?;

        Ok(Self { images, densities })
    }

    pub fn len(&self) -> usize {
        self.images.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(feature = "tch")]
    pub fn to_tensors(&self) -> (tch::Tensor, tch::Tensor) {
        (to_tensor(&self.images), to_tensor(&self.densities))
    }
}

#[cfg(feature = "tch")]
fn to_tensor<D>(array: &ndarray::Array<f32, D>) -> tch::Tensor
where
    D: ndarray::Dimension,
{
    let shape: Vec<i64> = array.shape().iter().map(|&dim| dim as i64).collect();
    let values: Vec<f32> = array.iter().copied().collect();
    tch::Tensor::of_slice(&values).view(shape.as_slice())
}
