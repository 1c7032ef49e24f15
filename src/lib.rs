//! S3FD is a CPU post-processor for the S3FD single-shot face detector.
//!
//! The network itself runs elsewhere; this crate takes its raw per-scale
//! classification and regression tensors, decodes them against synthesized
//! prior boxes, gates them by confidence, and merges overlapping boxes with
//! score-weighted non-maximum suppression. Batches can be processed in
//! parallel via the `rayon` feature, and the `image-io` feature prepares
//! network input from image files.

mod candidate;
pub mod decode;
mod detector;
pub mod lowlevel;
pub mod preprocess;
pub mod tensor;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use preprocess::io;

pub use candidate::detection::Detection;
pub use candidate::nms::{weighted_nms, DEFAULT_NMS_THRESHOLD};
pub use decode::{decode_scales, Scale, ScaleOutput, NUM_SCALES};
pub use detector::{DetectConfig, Detector};
pub use preprocess::{prepare_batch, InputGeometry, BGR_MEAN, DEFAULT_INPUT_SIZE};
pub use tensor::{maxout_background, OwnedTensor, TensorView};
pub use util::{S3fdError, S3fdResult};
