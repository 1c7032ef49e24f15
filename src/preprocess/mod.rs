//! Network input preparation and coordinate mapping.
//!
//! The network consumes square BGR images with the per-channel training
//! mean removed. `InputGeometry` remembers how a source image was resized
//! into that square so detections can be mapped back.

use crate::candidate::detection::Detection;
use crate::tensor::OwnedTensor;
use crate::util::{S3fdError, S3fdResult};

#[cfg(feature = "image-io")]
pub mod io;

/// Per-channel mean of the training set in BGR order.
pub const BGR_MEAN: [f32; 3] = [104.0, 117.0, 123.0];

/// Side length of the square network input.
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Builds the network feed from an NHWC batch of 8-bit BGR pixels.
pub fn prepare_batch(pixels: &[u8], shape: [usize; 4]) -> S3fdResult<OwnedTensor> {
    check_bgr(&shape)?;
    let data = pixels.iter().map(|&v| f32::from(v)).collect();
    let mut tensor = OwnedTensor::new(data, shape)?;
    subtract_mean(&mut tensor)?;
    Ok(tensor)
}

/// Subtracts [`BGR_MEAN`] in place from an NHWC BGR tensor.
pub fn subtract_mean(tensor: &mut OwnedTensor) -> S3fdResult<()> {
    check_bgr(&tensor.shape())?;
    for pixel in tensor.data_mut().chunks_exact_mut(3) {
        for (value, mean) in pixel.iter_mut().zip(BGR_MEAN) {
            *value -= mean;
        }
    }
    Ok(())
}

fn check_bgr(shape: &[usize; 4]) -> S3fdResult<()> {
    if shape[3] != 3 {
        return Err(S3fdError::InvalidInputShape {
            context: "input batch",
            reason: "expected 3 BGR channels",
            shape: shape.to_vec(),
        });
    }
    Ok(())
}

/// Mapping between a source image and the square network input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputGeometry {
    pub source_width: u32,
    pub source_height: u32,
    pub input_size: u32,
}

impl InputGeometry {
    pub fn new(source_width: u32, source_height: u32, input_size: u32) -> S3fdResult<Self> {
        if source_width == 0 || source_height == 0 || input_size == 0 {
            return Err(S3fdError::InvalidConfig(
                "source and input sizes must be non-zero",
            ));
        }
        Ok(Self {
            source_width,
            source_height,
            input_size,
        })
    }

    /// Maps a detection from network-input pixels to source pixels.
    pub fn to_source(&self, det: &Detection) -> Detection {
        let sx = self.source_width as f32 / self.input_size as f32;
        let sy = self.source_height as f32 / self.input_size as f32;
        Detection::new(det.x1 * sx, det.y1 * sy, det.x2 * sx, det.y2 * sy, det.score)
    }
}
