//! Random crop with zero pre-padding, shared by an image and its density map.

use super::raster::{CropWindow, Padding, Raster};
use crate::common::*;

/// Random crop initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RandomCropInit {
    pub height: usize,
    pub width: usize,
}

impl RandomCropInit {
    pub fn build(self) -> Result<RandomCrop> {
        let Self { height, width } = self;
        ensure!(
            height > 0 && width > 0,
            "crop size must be positive, but get {}x{}",
            height,
            width
        );
        Ok(RandomCrop { height, width })
    }
}

/// Crops both members of a pair at one shared random origin.
///
/// Inputs smaller than the crop are first padded with zeros on both sides.
#[derive(Debug, Clone)]
pub struct RandomCrop {
    height: usize,
    width: usize,
}

impl RandomCrop {
    /// Get the (height, width) crop size.
    pub fn size(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// The padding needed before cropping an input of this size.
    pub fn padding(&self, height: usize, width: usize) -> Padding {
        Padding::to_fit(height, width, self.height, self.width)
    }

    /// Draw a crop window on an input of `height`x`width`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        height: usize,
        width: usize,
        rng: &mut R,
    ) -> Result<CropWindow> {
        if self.height > height || self.width > width {
            return Err(DensityError::InvalidCropSize {
                crop_h: self.height,
                crop_w: self.width,
                image_h: height,
                image_w: width,
            }
            .into());
        }

        let top = rng.gen_range(0..=(height - self.height));
        let left = rng.gen_range(0..=(width - self.width));

        Ok(CropWindow {
            top,
            left,
            height: self.height,
            width: self.width,
        })
    }

    pub fn forward<A, B, R>(&self, first: A, second: B, rng: &mut R) -> Result<(A, B)>
    where
        A: Raster,
        B: Raster,
        R: Rng + ?Sized,
    {
        let shape = (first.height(), first.width());
        if shape != (second.height(), second.width()) {
            return Err(DensityError::ShapeMismatch {
                image_h: shape.0,
                image_w: shape.1,
                density_h: second.height(),
                density_w: second.width(),
            }
            .into());
        }

        let padding = self.padding(shape.0, shape.1);
        let first = first.pad(&padding);
        let second = second.pad(&padding);

        let window = self.sample(first.height(), first.width(), rng)?;
        Ok((first.crop(&window), second.crop(&window)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::DensityMap;

    fn crop(height: usize, width: usize) -> RandomCrop {
        RandomCropInit { height, width }.build().unwrap()
    }

    #[test]
    fn pad_small_input_to_crop_size() {
        let crop = crop(6, 4);
        let padding = crop.padding(3, 8);
        assert_eq!(3 + padding.top + padding.bottom, 6);
        assert_eq!((padding.top, padding.bottom), (1, 2));
        assert_eq!((padding.left, padding.right), (0, 0));

        let image = RgbImage::from_pixel(8, 3, Rgb([9, 9, 9]));
        let density = DensityMap::from_array(Array2::from_elem((3, 8), 1.0));
        let mut rng = StdRng::seed_from_u64(3);
        let (image, density) = crop.forward(image, density, &mut rng).unwrap();

        assert_eq!(image.dimensions(), (4, 6));
        assert_eq!(density.shape(), (6, 4));

        // rows 0 and 4..6 are padding in both members
        for y in 0..6 {
            let padded = y == 0 || y >= 4;
            for x in 0..4 {
                let pixel = image.get_pixel(x, y as u32)[0];
                let value = density.as_array()[[y, x as usize]];
                assert_eq!(pixel == 0, padded);
                assert_eq!(value == 0.0, padded);
            }
        }
    }

    #[test]
    fn crop_pair_at_same_origin() {
        let crop = crop(3, 3);
        let (h, w) = (7, 9);
        let image = RgbImage::from_fn(w, h, |x, y| Rgb([(y * 9 + x) as u8, 0, 0]));
        let array = Array2::from_shape_fn((h as usize, w as usize), |(i, j)| (i * 9 + j) as f32);
        let mut rng = StdRng::seed_from_u64(11);

        (0..32).for_each(|_| {
            let (image, array) = crop.forward(image.clone(), array.clone(), &mut rng).unwrap();
            assert_eq!(array.dim(), (3, 3));
            for i in 0..3 {
                for j in 0..3 {
                    assert_eq!(image.get_pixel(j, i)[0] as f32, array[[i as usize, j as usize]]);
                }
            }
        });
    }

    #[test]
    fn exact_size_keeps_everything() {
        let crop = crop(2, 2);
        let array = Array2::from_shape_fn((2, 2), |(i, j)| (i * 2 + j) as f32);
        let mut rng = StdRng::seed_from_u64(0);
        let (a, b) = crop.forward(array.clone(), array.clone(), &mut rng).unwrap();
        assert_eq!(a, array);
        assert_eq!(b, array);
    }

    #[test]
    fn window_larger_than_input_is_rejected() {
        let crop = crop(5, 5);
        let mut rng = StdRng::seed_from_u64(0);
        let err = crop.sample(4, 6, &mut rng).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DensityError>(),
            Some(DensityError::InvalidCropSize { crop_h: 5, image_h: 4, .. })
        ));
    }

    #[test]
    fn mismatched_pair_is_rejected() {
        let crop = crop(2, 2);
        let mut rng = StdRng::seed_from_u64(0);
        let err = crop
            .forward(Array2::<f32>::zeros((4, 4)), Array2::<f32>::zeros((4, 5)), &mut rng)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DensityError>(),
            Some(DensityError::ShapeMismatch { .. })
        ));
    }
}
