use s3fd::{
    DetectConfig, Detection, Detector, S3fdError, Scale, ScaleOutput, TensorView, NUM_SCALES,
};

const INPUT_SIZE: usize = 640;
const BACKGROUND: [f32; 2] = [4.0, -4.0];

/// Network output for a batch, with face logits planted at chosen cells.
struct SyntheticOutputs {
    batch: usize,
    grids: Vec<usize>,
    cls: Vec<Vec<f32>>,
    reg: Vec<Vec<f32>>,
}

impl SyntheticOutputs {
    fn new(batch: usize, raw_first_scale: bool) -> Self {
        let mut grids = Vec::new();
        let mut cls = Vec::new();
        let mut reg = Vec::new();
        for scale in Scale::all() {
            let grid = INPUT_SIZE / scale.stride();
            let cells = batch * grid * grid;
            let cell: &[f32] = if scale.level() == 0 && raw_first_scale {
                &[4.0, 3.0, 2.0, -4.0]
            } else {
                &BACKGROUND
            };
            grids.push(grid);
            cls.push(cell.repeat(cells));
            reg.push(vec![0.0; cells * 4]);
        }
        Self {
            batch,
            grids,
            cls,
            reg,
        }
    }

    fn channels(&self, level: usize) -> usize {
        self.cls[level].len() / (self.batch * self.grids[level] * self.grids[level])
    }

    /// Sets the face probability of one cell to `score`.
    fn plant(&mut self, n: usize, level: usize, row: usize, col: usize, score: f32) {
        let grid = self.grids[level];
        let channels = self.channels(level);
        let idx = (n * grid + row) * grid + col;
        let logits = &mut self.cls[level][idx * channels..(idx + 1) * channels];
        logits.fill(-50.0);
        logits[0] = 0.0;
        logits[channels - 1] = (score / (1.0 - score)).ln();
    }

    /// Overwrites the regression offsets of one cell.
    fn set_offsets(&mut self, n: usize, level: usize, row: usize, col: usize, loc: [f32; 4]) {
        let grid = self.grids[level];
        let idx = (n * grid + row) * grid + col;
        self.reg[level][idx * 4..(idx + 1) * 4].copy_from_slice(&loc);
    }

    fn views(&self) -> Vec<ScaleOutput<'_>> {
        (0..NUM_SCALES)
            .map(|level| {
                let grid = self.grids[level];
                ScaleOutput::new(
                    TensorView::new(
                        &self.cls[level],
                        [self.batch, grid, grid, self.channels(level)],
                    )
                    .unwrap(),
                    TensorView::new(&self.reg[level], [self.batch, grid, grid, 4]).unwrap(),
                )
            })
            .collect()
    }
}

fn assert_box(det: &Detection, corners: [f32; 4], score: f32) {
    for (value, want) in det.corners().iter().zip(corners) {
        assert!((value - want).abs() < 1e-3, "{:?} vs {:?}", det, corners);
    }
    assert!((det.score - score).abs() < 1e-5, "{:?} score vs {score}", det);
}

#[test]
fn two_faces_are_detected_and_neighbors_merged() {
    let mut outputs = SyntheticOutputs::new(1, false);
    // stride 16: neighboring cells overlap with IoU ~0.6
    outputs.plant(0, 2, 10, 12, 0.9);
    outputs.plant(0, 2, 10, 13, 0.8);
    // stride 64, far away from the first face
    outputs.plant(0, 4, 7, 2, 0.95);

    let detector = Detector::new();
    let dets = detector.detect(&outputs.views()).unwrap();
    assert_eq!(dets.len(), 2);

    assert_box(&dets[0], [32.0, 352.0, 288.0, 608.0], 0.95);
    let x1 = (0.9 * 168.0 + 0.8 * 184.0) / 1.7;
    assert_box(&dets[1], [x1, 136.0, x1 + 64.0, 200.0], 0.9);
}

#[test]
fn raw_stride_four_head_is_accepted() {
    let mut outputs = SyntheticOutputs::new(1, true);
    outputs.plant(0, 0, 20, 30, 0.85);

    let dets = Detector::new().detect(&outputs.views()).unwrap();
    assert_eq!(dets.len(), 1);
    // center (2 + 120, 2 + 80), size 16
    assert_box(&dets[0], [114.0, 74.0, 130.0, 90.0], 0.85);
}

#[test]
fn confident_free_image_returns_empty_list() {
    let outputs = SyntheticOutputs::new(1, false);
    let dets = Detector::new().detect(&outputs.views()).unwrap();
    assert!(dets.is_empty());
}

#[test]
fn confidence_threshold_gates_faces() {
    let mut outputs = SyntheticOutputs::new(1, false);
    outputs.plant(0, 3, 2, 2, 0.6);
    outputs.plant(0, 5, 1, 3, 0.9);

    let strict = Detector::new().with_config(DetectConfig::default().with_confidence_percent(70.0));
    assert_eq!(strict.detect(&outputs.views()).unwrap().len(), 1);

    let loose = Detector::new().with_config(DetectConfig::default().with_confidence_percent(50.0));
    assert_eq!(loose.detect(&outputs.views()).unwrap().len(), 2);
}

#[test]
fn batch_entries_are_processed_independently() {
    let mut outputs = SyntheticOutputs::new(3, false);
    outputs.plant(0, 2, 5, 5, 0.9);
    outputs.plant(2, 1, 30, 40, 0.8);
    outputs.plant(2, 4, 2, 8, 0.75);

    let dets = Detector::new().detect_batch(&outputs.views()).unwrap();
    assert_eq!(dets.len(), 3);
    assert_eq!(dets[0].len(), 1);
    assert!(dets[1].is_empty());
    assert_eq!(dets[2].len(), 2);
    // stride 8, cell (30, 40): center (324, 244), size 32
    assert_box(&dets[2][0], [308.0, 228.0, 340.0, 260.0], 0.8);
}

#[test]
fn single_image_entry_point_rejects_batches() {
    let outputs = SyntheticOutputs::new(2, false);
    let err = Detector::new().detect(&outputs.views()).unwrap_err();
    assert_eq!(
        err,
        S3fdError::BatchMismatch {
            scale: 0,
            expected: 1,
            got: 2,
        }
    );
}

#[test]
fn batch_sizes_must_agree_across_scales() {
    let two = SyntheticOutputs::new(2, false);
    let one = SyntheticOutputs::new(1, false);
    let mut views = two.views();
    views[3] = one.views()[3];

    let err = Detector::new().detect_batch(&views).unwrap_err();
    assert_eq!(
        err,
        S3fdError::BatchMismatch {
            scale: 3,
            expected: 2,
            got: 1,
        }
    );
}

#[test]
fn overflowing_offsets_fail_the_whole_batch() {
    let mut outputs = SyntheticOutputs::new(2, false);
    outputs.plant(0, 2, 5, 5, 0.9);
    outputs.plant(1, 3, 4, 4, 0.9);
    // exp(1e4 * 0.2) overflows the width
    outputs.set_offsets(1, 3, 4, 4, [0.0, 0.0, 1.0e4, 0.0]);

    let err = Detector::new().detect_batch(&outputs.views()).unwrap_err();
    assert_eq!(
        err,
        S3fdError::DegenerateBox {
            scale: 3,
            row: 4,
            col: 4,
        }
    );
}

#[test]
fn configured_variances_scale_the_offsets() {
    let mut outputs = SyntheticOutputs::new(1, false);
    outputs.plant(0, 3, 4, 4, 0.9);
    outputs.set_offsets(0, 3, 4, 4, [1.0, 0.0, 0.0, 0.0]);

    // stride 32, cell (4, 4): center (144, 144), size 128
    let dets = Detector::new().detect(&outputs.views()).unwrap();
    assert_box(&dets[0], [92.8, 80.0, 220.8, 208.0], 0.9);

    let wide = Detector::new().with_config(DetectConfig {
        variances: [0.2, 0.2],
        ..DetectConfig::default()
    });
    let dets = wide.detect(&outputs.views()).unwrap();
    assert_box(&dets[0], [105.6, 80.0, 233.6, 208.0], 0.9);
}

#[test]
fn missing_scale_is_rejected() {
    let outputs = SyntheticOutputs::new(1, false);
    let views = outputs.views();
    let err = Detector::new().detect(&views[..5]).unwrap_err();
    assert_eq!(
        err,
        S3fdError::ScaleCountMismatch {
            expected: 6,
            got: 5,
        }
    );
}

#[test]
fn invalid_config_is_reported_before_decoding() {
    let outputs = SyntheticOutputs::new(1, false);
    let detector = Detector::new().with_config(DetectConfig {
        nms_threshold: 2.0,
        ..DetectConfig::default()
    });
    assert!(matches!(
        detector.detect(&outputs.views()),
        Err(S3fdError::InvalidConfig(_))
    ));
}
