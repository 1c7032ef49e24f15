//! Background max-out for the finest scale.
//!
//! The stride-4 classification head predicts three background sub-classes
//! plus the face class. Collapsing the three background logits to their
//! element-wise maximum yields the usual `[background, face]` pair the
//! softmax stage expects.

use crate::tensor::{OwnedTensor, TensorView};
use crate::util::{S3fdError, S3fdResult};

/// Number of channels produced by the raw stride-4 classification head.
pub const MAXOUT_CHANNELS: usize = 4;

/// Collapses a 4-channel classification tensor to `[max(c0, c1, c2), c3]`.
///
/// Operates on raw logits, before softmax.
pub fn maxout_background(cls: TensorView<'_>) -> S3fdResult<OwnedTensor> {
    if cls.channels() != MAXOUT_CHANNELS {
        return Err(S3fdError::InvalidInputShape {
            context: "classification",
            reason: "background max-out requires 4 channels",
            shape: cls.shape().to_vec(),
        });
    }

    let [batch, height, width, _] = cls.shape();
    let mut out = Vec::with_capacity(batch * height * width * 2);
    for cell in cls.as_slice().chunks_exact(MAXOUT_CHANNELS) {
        out.push(cell[0].max(cell[1]).max(cell[2]));
        out.push(cell[3]);
    }
    OwnedTensor::new(out, [batch, height, width, 2])
}
