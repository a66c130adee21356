pub use crate::error::DensityError;
pub use anyhow::{ensure, format_err, Context as _, Error, Result};
pub use futures::stream::{self, Stream, StreamExt as _, TryStreamExt as _};
pub use image::{imageops::FilterType, Rgb, RgbImage};
pub use itertools::{izip, Itertools as _};
pub use ndarray::{s, Array2, Array3, Array4, ArrayView2, Axis};
pub use noisy_float::prelude::*;
pub use rand::{prelude::*, rngs::StdRng};
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::Borrow,
    fmt::Debug,
    fs,
    io::{BufReader, BufWriter, Read, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
};
pub use tracing::{debug, info, warn};
