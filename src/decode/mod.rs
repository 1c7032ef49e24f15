//! Decoding raw multi-scale network output into candidate boxes.
//!
//! The network predicts, for each of six feature-pyramid levels, a
//! classification tensor `(N, H, W, C)` and a regression tensor
//! `(N, H, W, 4)`. Level `i` has stride `2^(i + 2)`, so the levels cover
//! strides 4 through 128. Every grid cell owns one prior box; decoding turns
//! its regression offsets into image-space corners.

pub(crate) mod prior;
pub(crate) mod scale;

use crate::candidate::detection::Detection;
use crate::detector::DetectConfig;
use crate::tensor::maxout::MAXOUT_CHANNELS;
use crate::tensor::TensorView;
use crate::util::{S3fdError, S3fdResult};

/// Number of feature-pyramid levels the network emits.
pub const NUM_SCALES: usize = 6;

/// Channels in a classification tensor after background max-out.
pub const CLASS_CHANNELS: usize = 2;

/// Channels in a regression tensor.
pub const REGRESSION_CHANNELS: usize = 4;

/// One feature-pyramid level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scale {
    level: usize,
}

impl Scale {
    /// Returns the scale for `level`, or `None` past the last level.
    pub fn new(level: usize) -> Option<Self> {
        (level < NUM_SCALES).then_some(Self { level })
    }

    /// Iterates over all levels, finest first.
    pub fn all() -> impl Iterator<Item = Scale> {
        (0..NUM_SCALES).map(|level| Scale { level })
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Stride in input pixels, `2^(level + 2)`.
    pub fn stride(&self) -> usize {
        1usize << (self.level + 2)
    }
}

/// Classification and regression tensors for one scale.
#[derive(Clone, Copy, Debug)]
pub struct ScaleOutput<'a> {
    /// Class logits, `(N, H, W, 2)` or `(N, H, W, 4)` on level 0.
    pub cls: TensorView<'a>,
    /// Box offsets, `(N, H, W, 4)`.
    pub reg: TensorView<'a>,
}

impl<'a> ScaleOutput<'a> {
    pub fn new(cls: TensorView<'a>, reg: TensorView<'a>) -> Self {
        Self { cls, reg }
    }

    /// Batch size shared by both tensors.
    pub fn batch(&self) -> usize {
        self.cls.batch()
    }

    /// Restricts both tensors to batch entry `n`.
    pub fn image(&self, n: usize) -> S3fdResult<ScaleOutput<'a>> {
        Ok(Self {
            cls: self.cls.image(n)?,
            reg: self.reg.image(n)?,
        })
    }

    /// Checks channel counts, matching grids and batch sizes.
    pub fn validate(&self, scale: Scale) -> S3fdResult<()> {
        let cls_channels = self.cls.channels();
        let allowed = cls_channels == CLASS_CHANNELS
            || (scale.level() == 0 && cls_channels == MAXOUT_CHANNELS);
        if !allowed {
            return Err(S3fdError::InvalidInputShape {
                context: "classification",
                reason: "expected 2 channels (4 allowed on the stride-4 scale)",
                shape: self.cls.shape().to_vec(),
            });
        }
        if self.reg.channels() != REGRESSION_CHANNELS {
            return Err(S3fdError::InvalidInputShape {
                context: "regression",
                reason: "expected 4 channels",
                shape: self.reg.shape().to_vec(),
            });
        }
        if self.cls.height() != self.reg.height() || self.cls.width() != self.reg.width() {
            return Err(S3fdError::InvalidInputShape {
                context: "regression",
                reason: "grid does not match classification tensor",
                shape: self.reg.shape().to_vec(),
            });
        }
        if self.cls.batch() != self.reg.batch() {
            return Err(S3fdError::BatchMismatch {
                scale: scale.level(),
                expected: self.cls.batch(),
                got: self.reg.batch(),
            });
        }
        Ok(())
    }
}

/// Decodes every scale of a single image into confident candidates.
///
/// `outputs[i]` must hold level `i`. The result is unordered and may be empty.
pub fn decode_scales(
    outputs: &[ScaleOutput<'_>],
    cfg: &DetectConfig,
) -> S3fdResult<Vec<Detection>> {
    if outputs.len() != NUM_SCALES {
        return Err(S3fdError::ScaleCountMismatch {
            expected: NUM_SCALES,
            got: outputs.len(),
        });
    }
    let mut candidates = Vec::new();
    for (scale, output) in Scale::all().zip(outputs.iter().copied()) {
        scale::decode_scale(scale, output, cfg, &mut candidates)?;
    }
    Ok(candidates)
}
