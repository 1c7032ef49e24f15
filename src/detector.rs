//! High-level detector: decode every scale, then merge with weighted NMS.
//!
//! A `Detector` holds only configuration, so one instance can serve any
//! number of images. Batches are split per image; with the `rayon` feature
//! and `parallel: true` the images are processed concurrently. Each image
//! reads its own slice of the batch tensors and no state is shared.

use crate::candidate::detection::Detection;
use crate::candidate::nms::{weighted_nms, DEFAULT_NMS_THRESHOLD};
use crate::decode::prior::DEFAULT_VARIANCES;
use crate::decode::{decode_scales, Scale, ScaleOutput, NUM_SCALES};
use crate::trace::{stage_count, stage_span};
use crate::util::{S3fdError, S3fdResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Post-processing configuration.
#[derive(Clone, Debug)]
pub struct DetectConfig {
    /// Minimum face probability for a box to be kept.
    pub confidence: f32,
    /// IoU above which boxes are merged during NMS.
    pub nms_threshold: f32,
    /// Probability a cell must exceed before it is considered at all.
    pub coarse_threshold: f32,
    /// Center and size variances used to decode offsets.
    pub variances: [f32; 2],
    /// Process batch images in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            confidence: 0.7,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            coarse_threshold: 0.05,
            variances: DEFAULT_VARIANCES,
            parallel: false,
        }
    }
}

impl DetectConfig {
    /// Sets the confidence from a percentage in `[0, 100]`.
    pub fn with_confidence_percent(mut self, percent: f32) -> Self {
        self.confidence = percent / 100.0;
        self
    }

    /// Checks that every threshold is in range.
    pub fn validate(&self) -> S3fdResult<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(S3fdError::InvalidConfig("confidence must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.nms_threshold) {
            return Err(S3fdError::InvalidConfig("nms_threshold must be in [0, 1]"));
        }
        if !(0.0..1.0).contains(&self.coarse_threshold) {
            return Err(S3fdError::InvalidConfig(
                "coarse_threshold must be in [0, 1)",
            ));
        }
        if self.variances.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(S3fdError::InvalidConfig(
                "variances must be finite and positive",
            ));
        }
        Ok(())
    }
}

/// S3FD post-processor.
#[derive(Clone, Debug, Default)]
pub struct Detector {
    cfg: DetectConfig,
}

impl Detector {
    /// Creates a detector with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: DetectConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn config(&self) -> &DetectConfig {
        &self.cfg
    }

    /// Detects faces in a single image (every tensor has batch size 1).
    pub fn detect(&self, outputs: &[ScaleOutput<'_>]) -> S3fdResult<Vec<Detection>> {
        self.cfg.validate()?;
        let batch = check_batch(outputs)?;
        if batch != 1 {
            return Err(S3fdError::BatchMismatch {
                scale: 0,
                expected: 1,
                got: batch,
            });
        }
        self.detect_image(outputs)
    }

    /// Detects faces in every image of a batch.
    ///
    /// Returns one detection list per batch entry, in batch order.
    ///
    /// The batch succeeds or fails as a unit: if any image fails to decode
    /// (for example a `DegenerateBox` from an overflowing offset), the whole
    /// call returns that error and no per-image results are returned. With
    /// `parallel` set, which failing image is reported first is unspecified.
    pub fn detect_batch(&self, outputs: &[ScaleOutput<'_>]) -> S3fdResult<Vec<Vec<Detection>>> {
        self.cfg.validate()?;
        let batch = check_batch(outputs)?;

        #[cfg(feature = "rayon")]
        if self.cfg.parallel {
            return (0..batch)
                .into_par_iter()
                .map(|n| self.detect_nth(outputs, n))
                .collect();
        }

        (0..batch).map(|n| self.detect_nth(outputs, n)).collect()
    }

    fn detect_nth(&self, outputs: &[ScaleOutput<'_>], n: usize) -> S3fdResult<Vec<Detection>> {
        let image = outputs
            .iter()
            .map(|output| output.image(n))
            .collect::<S3fdResult<Vec<_>>>()?;
        self.detect_image(&image)
    }

    fn detect_image(&self, outputs: &[ScaleOutput<'_>]) -> S3fdResult<Vec<Detection>> {
        let _stage = stage_span!("detect", confidence = self.cfg.confidence).entered();
        let candidates = decode_scales(outputs, &self.cfg)?;
        let kept = weighted_nms(&candidates, self.cfg.nms_threshold);
        stage_count!("detect", candidates = candidates.len(), kept = kept.len());
        Ok(kept)
    }
}

/// Validates scale count and shapes, returning the shared batch size.
fn check_batch(outputs: &[ScaleOutput<'_>]) -> S3fdResult<usize> {
    if outputs.len() != NUM_SCALES {
        return Err(S3fdError::ScaleCountMismatch {
            expected: NUM_SCALES,
            got: outputs.len(),
        });
    }
    let batch = outputs[0].batch();
    for (scale, output) in Scale::all().zip(outputs) {
        output.validate(scale)?;
        if output.batch() != batch {
            return Err(S3fdError::BatchMismatch {
                scale: scale.level(),
                expected: batch,
                got: output.batch(),
            });
        }
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::DetectConfig;
    use crate::util::S3fdError;

    #[test]
    fn default_config_is_valid() {
        assert!(DetectConfig::default().validate().is_ok());
    }

    #[test]
    fn percent_confidence_converts() {
        let cfg = DetectConfig::default().with_confidence_percent(50.0);
        assert!((cfg.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_thresholds_are_rejected() {
        let cfg = DetectConfig {
            confidence: 1.5,
            ..DetectConfig::default()
        };
        assert_eq!(
            cfg.validate().unwrap_err(),
            S3fdError::InvalidConfig("confidence must be in [0, 1]")
        );

        let cfg = DetectConfig {
            nms_threshold: f32::NAN,
            ..DetectConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = DetectConfig {
            variances: [0.1, 0.0],
            ..DetectConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
