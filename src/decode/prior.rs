//! Prior boxes and offset decoding.

/// Default center/size variances used when the network was trained.
pub const DEFAULT_VARIANCES: [f32; 2] = [0.1, 0.2];

/// Prior box in center-size form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriorBox {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

impl PriorBox {
    /// Prior for grid cell `(row, col)` of a scale with the given stride.
    ///
    /// The center sits in the middle of the cell and the side is four strides.
    pub fn for_cell(stride: usize, row: usize, col: usize) -> Self {
        let stride = stride as f32;
        let half = stride / 2.0;
        Self {
            cx: half + col as f32 * stride,
            cy: half + row as f32 * stride,
            w: stride * 4.0,
            h: stride * 4.0,
        }
    }
}

/// Decodes regression offsets `[lx, ly, lw, lh]` against a prior.
///
/// Returns corners `[x1, y1, x2, y2]`.
pub fn decode_box(loc: [f32; 4], prior: &PriorBox, variances: [f32; 2]) -> [f32; 4] {
    let cx = prior.cx + loc[0] * variances[0] * prior.w;
    let cy = prior.cy + loc[1] * variances[0] * prior.h;
    let w = prior.w * (loc[2] * variances[1]).exp();
    let h = prior.h * (loc[3] * variances[1]).exp();
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    [x1, y1, x1 + w, y1 + h]
}
