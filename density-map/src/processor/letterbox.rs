//! Aspect-preserving resize into a fixed canvas.

use crate::{annotation::Point, common::*};

/// The scale and offset that map original pixels into a letterbox canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxTransform {
    pub orig_w: usize,
    pub orig_h: usize,
    pub new_w: usize,
    pub new_h: usize,
    pub paste_x: usize,
    pub paste_y: usize,
}

impl LetterboxTransform {
    /// Compute the placement of an `orig_w`x`orig_h` image in a `target_w`x`target_h` canvas.
    pub fn new(orig_w: usize, orig_h: usize, target_w: usize, target_h: usize) -> Result<Self> {
        ensure!(
            orig_w > 0 && orig_h > 0,
            "image size must be positive, but get {}x{}",
            orig_w,
            orig_h
        );
        ensure!(
            target_w > 0 && target_h > 0,
            "target size must be positive, but get {}x{}",
            target_w,
            target_h
        );

        let aspect = orig_w as f64 / orig_h as f64;
        let (new_w, new_h) = if aspect > target_w as f64 / target_h as f64 {
            let new_h = (target_w as f64 / aspect).round() as usize;
            (target_w, new_h.clamp(1, target_h))
        } else {
            let new_w = (target_h as f64 * aspect).round() as usize;
            (new_w.clamp(1, target_w), target_h)
        };

        Ok(Self {
            orig_w,
            orig_h,
            new_w,
            new_h,
            paste_x: (target_w - new_w) / 2,
            paste_y: (target_h - new_h) / 2,
        })
    }

    /// Map a pixel of the original image into the canvas.
    ///
    /// The result is kept inside the pasted region.
    pub fn project(&self, x: usize, y: usize) -> (usize, usize) {
        let sx = self.new_w as f64 / self.orig_w as f64;
        let sy = self.new_h as f64 / self.orig_h as f64;
        let new_x = ((x as f64 * sx).round() as usize).min(self.new_w - 1);
        let new_y = ((y as f64 * sy).round() as usize).min(self.new_h - 1);
        (new_x + self.paste_x, new_y + self.paste_y)
    }

    pub fn project_point(&self, point: &Point) -> Point {
        let (x, y) = self.project(point.x, point.y);
        Point {
            x,
            y,
            class_id: point.class_id,
        }
    }
}

/// A letterboxed image and its placement.
#[derive(Debug, Clone)]
pub struct LetterboxedImage {
    pub canvas: RgbImage,
    pub new_width: usize,
    pub new_height: usize,
    pub paste_x: usize,
    pub paste_y: usize,
    transform: LetterboxTransform,
}

impl LetterboxedImage {
    pub fn transform(&self) -> &LetterboxTransform {
        &self.transform
    }
}

/// Resize `image` with Lanczos resampling and center it on a black canvas of
/// `target_size = (width, height)`.
pub fn letterbox(image: &RgbImage, target_size: (usize, usize)) -> Result<LetterboxedImage> {
    let (target_w, target_h) = target_size;
    let (orig_w, orig_h) = image.dimensions();
    let transform = LetterboxTransform::new(orig_w as usize, orig_h as usize, target_w, target_h)?;
    let LetterboxTransform {
        new_w,
        new_h,
        paste_x,
        paste_y,
        ..
    } = transform;

    let resized = if (new_w, new_h) == (orig_w as usize, orig_h as usize) {
        image.clone()
    } else {
        image::imageops::resize(image, new_w as u32, new_h as u32, FilterType::Lanczos3)
    };
    let mut canvas = RgbImage::new(target_w as u32, target_h as u32);
    image::imageops::replace(&mut canvas, &resized, paste_x as i64, paste_y as i64);

    Ok(LetterboxedImage {
        canvas,
        new_width: new_w,
        new_height: new_h,
        paste_x,
        paste_y,
        transform,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_image_is_centered_vertically() {
        let image = RgbImage::from_pixel(200, 100, Rgb([200, 10, 10]));
        let boxed = letterbox(&image, (256, 256)).unwrap();

        assert_eq!(boxed.canvas.dimensions(), (256, 256));
        assert_eq!((boxed.new_width, boxed.new_height), (256, 128));
        assert_eq!((boxed.paste_x, boxed.paste_y), (0, 64));
        assert_eq!(boxed.paste_y * 2 + boxed.new_height, 256);

        let aspect = boxed.new_width as f64 / boxed.new_height as f64;
        assert!((aspect - 2.0).abs() < 1e-2);

        assert_eq!(boxed.canvas.get_pixel(128, 10), &Rgb([0, 0, 0]));
        assert!(boxed.canvas.get_pixel(128, 128)[1] < 40);
        assert!(boxed.canvas.get_pixel(128, 128)[0] > 150);
    }

    #[test]
    fn tall_image_is_centered_horizontally() {
        let transform = LetterboxTransform::new(90, 300, 256, 256).unwrap();
        assert_eq!(transform.new_h, 256);
        assert_eq!(transform.new_w, 77);
        let total = transform.paste_x * 2 + transform.new_w;
        assert!((255..=257).contains(&total));
    }

    #[test]
    fn exact_size_is_identity() {
        let image = RgbImage::from_pixel(64, 48, Rgb([1, 2, 3]));
        let boxed = letterbox(&image, (64, 48)).unwrap();
        assert_eq!((boxed.new_width, boxed.new_height), (64, 48));
        assert_eq!((boxed.paste_x, boxed.paste_y), (0, 0));
        assert_eq!(boxed.canvas, image);
    }

    #[test]
    fn project_points_into_canvas() {
        let transform = LetterboxTransform::new(200, 100, 256, 256).unwrap();
        assert_eq!(transform.project(0, 0), (0, 64));
        assert_eq!(transform.project(100, 50), (128, 128));
        assert_eq!(transform.project(199, 99), (255, 191));

        let point = transform.project_point(&Point::new(50, 25, 3));
        assert_eq!(point, Point::new(64, 96, 3));
    }
}
