//! Data preprocessing building blocks.

pub mod color_jitter;
pub mod letterbox;
pub mod pipeline;
pub mod random_crop;
pub mod random_flip;
pub mod raster;

pub use color_jitter::*;
pub use letterbox::*;
pub use pipeline::*;
pub use random_crop::*;
pub use random_flip::*;
pub use raster::*;
