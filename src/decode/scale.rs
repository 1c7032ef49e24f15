//! Per-scale decoding: softmax, coarse filter, prior decode, confidence gate.

use crate::candidate::detection::Detection;
use crate::decode::prior::{decode_box, PriorBox};
use crate::decode::{Scale, ScaleOutput, CLASS_CHANNELS};
use crate::detector::DetectConfig;
use crate::tensor::maxout::{maxout_background, MAXOUT_CHANNELS};
use crate::trace::{stage_count, stage_span};
use crate::util::math::softmax_channels;
use crate::util::{S3fdError, S3fdResult};

/// Index of the face class after max-out.
const FACE_CHANNEL: usize = 1;

/// Returns face probabilities for every cell of a single-image scale.
///
/// Applies background max-out first when the stride-4 head is still raw.
pub(crate) fn face_probabilities(scale: Scale, output: &ScaleOutput<'_>) -> S3fdResult<Vec<f32>> {
    let mut probs = if scale.level() == 0 && output.cls.channels() == MAXOUT_CHANNELS {
        maxout_background(output.cls)?.into_data()
    } else {
        output.cls.as_slice().to_vec()
    };
    softmax_channels(&mut probs, CLASS_CHANNELS);
    Ok(probs
        .chunks_exact(CLASS_CHANNELS)
        .map(|cell| cell[FACE_CHANNEL])
        .collect())
}

/// Decodes one scale of one image, appending confident boxes to `out`.
///
/// Cells pass a cheap `> coarse_threshold` pre-filter before the
/// `>= confidence` gate; only gated cells are decoded.
pub fn decode_scale(
    scale: Scale,
    output: ScaleOutput<'_>,
    cfg: &DetectConfig,
    out: &mut Vec<Detection>,
) -> S3fdResult<()> {
    output.validate(scale)?;
    if output.batch() != 1 {
        return Err(S3fdError::InvalidInputShape {
            context: "classification",
            reason: "decode_scale expects a single image (batch 1)",
            shape: output.cls.shape().to_vec(),
        });
    }
    output.cls.ensure_finite("classification")?;
    output.reg.ensure_finite("regression")?;

    let stride = scale.stride();
    let width = output.cls.width();
    let _stage = stage_span!(
        "decode_scale",
        level = scale.level(),
        stride = stride,
        height = output.cls.height(),
        width = width
    )
    .entered();

    let probs = face_probabilities(scale, &output)?;
    let coarse: Vec<usize> = probs
        .iter()
        .enumerate()
        .filter(|&(_, &p)| p > cfg.coarse_threshold)
        .map(|(idx, _)| idx)
        .collect();

    let before = out.len();
    for &idx in &coarse {
        let score = probs[idx];
        if score < cfg.confidence {
            continue;
        }
        let (row, col) = (idx / width, idx % width);
        let loc = output
            .reg
            .cell(0, row, col)
            .ok_or(S3fdError::IndexOutOfBounds {
                index: idx,
                len: probs.len(),
                context: "regression cell",
            })?;
        let prior = PriorBox::for_cell(stride, row, col);
        let [x1, y1, x2, y2] = decode_box([loc[0], loc[1], loc[2], loc[3]], &prior, cfg.variances);
        let det = Detection::new(x1, y1, x2, y2, score);
        if !det.is_well_formed() {
            return Err(S3fdError::DegenerateBox {
                scale: scale.level(),
                row,
                col,
            });
        }
        out.push(det);
    }

    stage_count!(
        "decode_scale",
        coarse = coarse.len(),
        confident = out.len() - before
    );
    Ok(())
}
