//! Loading network input from image files via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::preprocess::{subtract_mean, InputGeometry};
use crate::tensor::OwnedTensor;
use crate::util::{S3fdError, S3fdResult};
use image::imageops::FilterType;
use std::path::Path;

/// Converts an RGB image into a `(1, size, size, 3)` mean-subtracted BGR feed.
pub fn input_from_rgb_image(
    img: &image::RgbImage,
    input_size: u32,
) -> S3fdResult<(OwnedTensor, InputGeometry)> {
    let geometry = InputGeometry::new(img.width(), img.height(), input_size)?;
    let resized = image::imageops::resize(img, input_size, input_size, FilterType::Triangle);

    let side = input_size as usize;
    let mut data = Vec::with_capacity(side * side * 3);
    for pixel in resized.pixels() {
        let [r, g, b] = pixel.0;
        data.extend([f32::from(b), f32::from(g), f32::from(r)]);
    }
    let mut tensor = OwnedTensor::new(data, [1, side, side, 3])?;
    subtract_mean(&mut tensor)?;
    Ok((tensor, geometry))
}

/// Loads an image from disk and prepares it as network input.
pub fn load_input<P: AsRef<Path>>(
    path: P,
    input_size: u32,
) -> S3fdResult<(OwnedTensor, InputGeometry)> {
    let img = image::open(path).map_err(|err| S3fdError::ImageIo {
        reason: err.to_string(),
    })?;
    input_from_rgb_image(&img.to_rgb8(), input_size)
}
