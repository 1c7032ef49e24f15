//! Low-level building blocks for custom post-processing pipelines.
//!
//! These expose prior synthesis, single-scale decoding and box geometry for
//! callers that assemble their own pipeline. Most users should prefer the
//! top-level `Detector`.

pub use crate::candidate::detection::Detection;
pub use crate::candidate::nms::weighted_nms;
pub use crate::decode::prior::{decode_box, PriorBox, DEFAULT_VARIANCES};
pub use crate::decode::scale::decode_scale;
pub use crate::decode::{CLASS_CHANNELS, REGRESSION_CHANNELS};
pub use crate::preprocess::subtract_mean;
pub use crate::tensor::maxout::MAXOUT_CHANNELS;
