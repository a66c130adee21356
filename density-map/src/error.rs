use std::path::PathBuf;

/// Failures with a defined meaning in the density map pipeline.
///
/// The values travel inside [anyhow::Error]. Callers that must tell
/// them apart, such as the corpus preprocessor, recover them with
/// `error.downcast_ref::<DensityError>()`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DensityError {
    /// An annotation line is not five numeric fields.
    #[error("malformed record at {}:{line}: {reason}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    /// The image has no annotation file.
    #[error("annotation file '{}' not found for image '{}'", annotation.display(), image.display())]
    MissingAnnotation { image: PathBuf, annotation: PathBuf },
    /// The crop does not fit into the image even after padding.
    #[error("crop size {crop_h}x{crop_w} exceeds padded image size {image_h}x{image_w}")]
    InvalidCropSize {
        crop_h: usize,
        crop_w: usize,
        image_h: usize,
        image_w: usize,
    },
    /// A point lies outside of the density map.
    #[error("point ({x}, {y}) is out of bound of shape {height}x{width}")]
    PointOutOfBounds {
        x: usize,
        y: usize,
        height: usize,
        width: usize,
    },
    /// The members of a sample are not co-registered.
    #[error("image size {image_h}x{image_w} does not match density map size {density_h}x{density_w}")]
    ShapeMismatch {
        image_h: usize,
        image_w: usize,
        density_h: usize,
        density_w: usize,
    },
    /// An array artifact cannot be decoded.
    #[error("invalid array file: {reason}")]
    InvalidArray { reason: String },
}
