//! Paired image and density map datasets.

mod class_index;
mod dataset;
mod density_dataset;
mod record;
mod training_stream;
mod utils;

pub use class_index::*;
pub use dataset::*;
pub use density_dataset::*;
pub use record::*;
pub use training_stream::*;
pub use utils::*;
