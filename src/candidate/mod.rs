//! Candidate boxes and their pruning.
//!
//! Includes the detection box type with pixel-grid geometry and the
//! score-weighted non-maximum suppression that merges overlapping boxes.

pub(crate) mod detection;
pub(crate) mod nms;
