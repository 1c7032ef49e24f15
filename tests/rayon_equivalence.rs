#![cfg(feature = "rayon")]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use s3fd::{DetectConfig, Detector, Scale, ScaleOutput, TensorView};

fn random_batch(rng: &mut StdRng, batch: usize, input: usize) -> Vec<(Vec<f32>, Vec<f32>, usize)> {
    Scale::all()
        .map(|scale| {
            let grid = input / scale.stride();
            let cells = batch * grid * grid;
            let cls = (0..cells * 2)
                .map(|i| {
                    if i % 2 == 0 {
                        rng.random_range(0.0f32..3.0)
                    } else {
                        rng.random_range(-3.0f32..3.0)
                    }
                })
                .collect();
            let reg = (0..cells * 4).map(|_| rng.random_range(-1.0f32..1.0)).collect();
            (cls, reg, grid)
        })
        .collect()
}

#[test]
fn parallel_batch_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(2024);
    let batch = 4;
    let tensors = random_batch(&mut rng, batch, 256);
    let views: Vec<ScaleOutput<'_>> = tensors
        .iter()
        .map(|(cls, reg, grid)| {
            ScaleOutput::new(
                TensorView::new(cls, [batch, *grid, *grid, 2]).unwrap(),
                TensorView::new(reg, [batch, *grid, *grid, 4]).unwrap(),
            )
        })
        .collect();

    let base = DetectConfig {
        confidence: 0.6,
        ..DetectConfig::default()
    };
    let seq = Detector::new()
        .with_config(DetectConfig {
            parallel: false,
            ..base.clone()
        })
        .detect_batch(&views)
        .unwrap();
    let par = Detector::new()
        .with_config(DetectConfig {
            parallel: true,
            ..base
        })
        .detect_batch(&views)
        .unwrap();

    assert_eq!(seq.len(), batch);
    assert!(seq.iter().any(|dets| !dets.is_empty()));
    assert_eq!(seq, par);
}
