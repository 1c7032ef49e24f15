//! Score-weighted non-maximum suppression.

use crate::candidate::detection::{iou_with_areas, Detection};
use crate::trace::{stage_count, stage_span};

/// Default IoU threshold above which boxes are merged.
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.5;

/// Returns candidate indices ordered by descending score.
///
/// Ties keep ascending index order so results are reproducible.
pub(crate) fn rank_desc(boxes: &[Detection]) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..boxes.len()).collect();
    ranked.sort_by(|&a, &b| {
        boxes[b]
            .score
            .total_cmp(&boxes[a].score)
            .then_with(|| a.cmp(&b))
    });
    ranked
}

/// Greedy NMS that merges each cluster into its best box.
///
/// Boxes are visited by descending score. Every remaining box whose IoU with
/// the current best exceeds `iou_threshold` joins its cluster and is removed;
/// the best box keeps its score but takes the score-weighted mean corners of
/// the whole cluster. Output follows the original ranking order.
pub fn weighted_nms(boxes: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    let _stage = stage_span!("weighted_nms", candidates = boxes.len()).entered();
    if boxes.is_empty() {
        return Vec::new();
    }

    let mut boxes = boxes.to_vec();
    let areas: Vec<f32> = boxes.iter().map(Detection::area).collect();
    let mut ranked = rank_desc(&boxes);
    let mut kept = Vec::new();
    let mut cluster = Vec::new();
    let mut remaining = Vec::with_capacity(ranked.len());

    while !ranked.is_empty() {
        let best = ranked[0];
        cluster.clear();
        remaining.clear();

        for &idx in &ranked[1..] {
            let iou = iou_with_areas(&boxes[best], &boxes[idx], areas[best], areas[idx]);
            if iou > iou_threshold {
                cluster.push(idx);
            } else {
                remaining.push(idx);
            }
        }

        if !cluster.is_empty() {
            if let Some(corners) = weighted_corners(&boxes, best, &cluster) {
                let [x1, y1, x2, y2] = corners;
                let target = &mut boxes[best];
                target.x1 = x1;
                target.y1 = y1;
                target.x2 = x2;
                target.y2 = y2;
            }
        }

        kept.push(boxes[best]);
        std::mem::swap(&mut ranked, &mut remaining);
    }

    stage_count!("weighted_nms", kept = kept.len());
    kept
}

/// Score-weighted mean corners of `best` and its cluster.
///
/// Returns `None` when the cluster carries no score weight.
fn weighted_corners(boxes: &[Detection], best: usize, cluster: &[usize]) -> Option<[f32; 4]> {
    let mut acc = [0.0f64; 4];
    let mut total = 0.0f64;
    for &idx in std::iter::once(&best).chain(cluster) {
        let det = &boxes[idx];
        let weight = f64::from(det.score);
        for (sum, corner) in acc.iter_mut().zip(det.corners()) {
            *sum += weight * f64::from(corner);
        }
        total += weight;
    }

    if total <= 0.0 {
        return None;
    }
    Some(acc.map(|sum| (sum / total) as f32))
}
