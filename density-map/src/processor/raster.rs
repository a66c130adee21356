//! Geometric primitives shared by images and density maps.

use crate::{common::*, density::DensityMap};

/// Zero padding amounts in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Padding {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl Padding {
    /// The padding that grows `height`x`width` to at least `min_h`x`min_w`,
    /// split evenly with the odd pixel on the bottom or right side.
    pub fn to_fit(height: usize, width: usize, min_h: usize, min_w: usize) -> Self {
        let pad_h = min_h.saturating_sub(height);
        let pad_w = min_w.saturating_sub(width);
        Self {
            top: pad_h / 2,
            bottom: pad_h - pad_h / 2,
            left: pad_w / 2,
            right: pad_w - pad_w / 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A crop rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CropWindow {
    pub top: usize,
    pub left: usize,
    pub height: usize,
    pub width: usize,
}

/// Which flips to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlipDecision {
    Keep,
    Flip,
}

impl FlipDecision {
    pub fn sample<R: Rng + ?Sized>(prob: f64, rng: &mut R) -> Self {
        if rng.gen_bool(prob) {
            Self::Flip
        } else {
            Self::Keep
        }
    }
}

/// A 2D raster that geometric augmentations can be applied to.
pub trait Raster: Sized {
    fn height(&self) -> usize;
    fn width(&self) -> usize;
    fn flip_horizontal(self) -> Self;
    fn flip_vertical(self) -> Self;
    /// Extend the borders with zeros.
    fn pad(self, padding: &Padding) -> Self;
    /// Cut out a window that lies inside the raster.
    fn crop(self, window: &CropWindow) -> Self;
}

impl Raster for RgbImage {
    fn height(&self) -> usize {
        self.dimensions().1 as usize
    }

    fn width(&self) -> usize {
        self.dimensions().0 as usize
    }

    fn flip_horizontal(self) -> Self {
        image::imageops::flip_horizontal(&self)
    }

    fn flip_vertical(self) -> Self {
        image::imageops::flip_vertical(&self)
    }

    fn pad(self, padding: &Padding) -> Self {
        if padding.is_empty() {
            return self;
        }
        let (width, height) = self.dimensions();
        let mut canvas = RgbImage::new(
            width + (padding.left + padding.right) as u32,
            height + (padding.top + padding.bottom) as u32,
        );
        image::imageops::replace(&mut canvas, &self, padding.left as i64, padding.top as i64);
        canvas
    }

    fn crop(self, window: &CropWindow) -> Self {
        let CropWindow {
            top,
            left,
            height,
            width,
        } = *window;
        image::imageops::crop_imm(&self, left as u32, top as u32, width as u32, height as u32)
            .to_image()
    }
}

impl Raster for Array2<f32> {
    fn height(&self) -> usize {
        self.nrows()
    }

    fn width(&self) -> usize {
        self.ncols()
    }

    fn flip_horizontal(self) -> Self {
        self.slice(s![.., ..;-1]).to_owned()
    }

    fn flip_vertical(self) -> Self {
        self.slice(s![..;-1, ..]).to_owned()
    }

    fn pad(self, padding: &Padding) -> Self {
        if padding.is_empty() {
            return self;
        }
        let (height, width) = self.dim();
        let mut canvas = Array2::zeros((
            height + padding.top + padding.bottom,
            width + padding.left + padding.right,
        ));
        canvas
            .slice_mut(s![
                padding.top..(padding.top + height),
                padding.left..(padding.left + width)
            ])
            .assign(&self);
        canvas
    }

    fn crop(self, window: &CropWindow) -> Self {
        let CropWindow {
            top,
            left,
            height,
            width,
        } = *window;
        self.slice(s![top..(top + height), left..(left + width)])
            .to_owned()
    }
}

impl Raster for DensityMap {
    fn height(&self) -> usize {
        DensityMap::height(self)
    }

    fn width(&self) -> usize {
        DensityMap::width(self)
    }

    fn flip_horizontal(self) -> Self {
        DensityMap::from_array(self.into_array().flip_horizontal())
    }

    fn flip_vertical(self) -> Self {
        DensityMap::from_array(self.into_array().flip_vertical())
    }

    fn pad(self, padding: &Padding) -> Self {
        DensityMap::from_array(self.into_array().pad(padding))
    }

    fn crop(self, window: &CropWindow) -> Self {
        DensityMap::from_array(self.into_array().crop(window))
    }
}
