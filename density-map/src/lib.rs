//! Density map synthesis and paired augmentation for object counting.

mod common;
pub mod annotation;
pub mod config;
pub mod dataset;
pub mod density;
pub mod error;
pub mod metrics;
pub mod npy;
pub mod preprocess;
pub mod processor;

pub use error::DensityError;
