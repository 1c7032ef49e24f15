//! NHWC tensor views over raw network output.
//!
//! `TensorView` is a borrowed 4D view `(batch, height, width, channels)` into
//! a contiguous `f32` buffer in the channel-last order the inference engine
//! emits. Views never copy; `image(n)` slices one batch entry out of the
//! same backing buffer. `OwnedTensor` holds the result of transforms such as
//! background max-out or mean subtraction.

use crate::util::{S3fdError, S3fdResult};

pub(crate) mod maxout;

pub use maxout::maxout_background;

/// Borrowed NHWC tensor view.
#[derive(Copy, Clone, Debug)]
pub struct TensorView<'a> {
    data: &'a [f32],
    shape: [usize; 4],
}

impl<'a> TensorView<'a> {
    /// Creates a view with an explicit `[batch, height, width, channels]` shape.
    pub fn new(data: &'a [f32], shape: [usize; 4]) -> S3fdResult<Self> {
        let expected = element_count(&shape)?;
        if data.len() != expected {
            return Err(S3fdError::LengthMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self { data, shape })
    }

    /// Creates a view from a dynamic shape, rejecting anything but rank 4.
    pub fn from_dims(data: &'a [f32], dims: &[usize]) -> S3fdResult<Self> {
        let shape: [usize; 4] = dims
            .try_into()
            .map_err(|_| S3fdError::InvalidInputShape {
                context: "tensor",
                reason: "expected rank 4 (batch, height, width, channels)",
                shape: dims.to_vec(),
            })?;
        Self::new(data, shape)
    }

    /// Returns the full `[batch, height, width, channels]` shape.
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn batch(&self) -> usize {
        self.shape[0]
    }

    pub fn height(&self) -> usize {
        self.shape[1]
    }

    pub fn width(&self) -> usize {
        self.shape[2]
    }

    pub fn channels(&self) -> usize {
        self.shape[3]
    }

    /// Returns the backing slice.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Returns the channel vector at `(n, row, col)` if it is within bounds.
    pub fn cell(&self, n: usize, row: usize, col: usize) -> Option<&'a [f32]> {
        let [batch, height, width, channels] = self.shape;
        if n >= batch || row >= height || col >= width {
            return None;
        }
        let start = ((n * height + row) * width + col) * channels;
        self.data.get(start..start + channels)
    }

    /// Returns a zero-copy view of batch entry `n` with batch size 1.
    pub fn image(&self, n: usize) -> S3fdResult<TensorView<'a>> {
        let [batch, height, width, channels] = self.shape;
        if n >= batch {
            return Err(S3fdError::IndexOutOfBounds {
                index: n,
                len: batch,
                context: "batch",
            });
        }
        let per_image = height * width * channels;
        let start = n * per_image;
        Ok(TensorView {
            data: &self.data[start..start + per_image],
            shape: [1, height, width, channels],
        })
    }

    /// Fails with `NonFiniteValue` on the first NaN or infinite element.
    pub fn ensure_finite(&self, context: &'static str) -> S3fdResult<()> {
        match self.data.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(S3fdError::NonFiniteValue { context, index }),
            None => Ok(()),
        }
    }
}

/// Owned NHWC tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedTensor {
    data: Vec<f32>,
    shape: [usize; 4],
}

impl OwnedTensor {
    /// Wraps a buffer, validating it against `shape`.
    pub fn new(data: Vec<f32>, shape: [usize; 4]) -> S3fdResult<Self> {
        TensorView::new(&data, shape)?;
        Ok(Self { data, shape })
    }

    /// Returns a borrowed view of the tensor.
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            data: &self.data,
            shape: self.shape,
        }
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor and returns its buffer.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

fn element_count(shape: &[usize; 4]) -> S3fdResult<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or(S3fdError::InvalidInputShape {
            context: "tensor",
            reason: "element count overflows usize",
            shape: shape.to_vec(),
        })
}
