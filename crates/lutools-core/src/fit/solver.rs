//! Residual binning and hole filling for a single lattice size.
//!
//! Each correspondence votes for the lattice node nearest its `before`
//! colour with the residual `after − before`. A node's value is its own
//! coordinate plus the mean residual of its votes. Nodes without votes take
//! the mean residual of their populated 6-neighbours, one layer at a time,
//! until the lattice is full.

use crate::cancel::CancelToken;
use crate::error::LutoolsResult;
use crate::fit::samples::Correspondence;
use crate::transform::evaluate::to_unit;
use crate::transform::lut::Lut3D;

/// Correspondences processed between progress reports and cancel checks.
pub const BATCH_SIZE: usize = 65_536;

/// Per-node running sum of residuals.
#[derive(Debug, Clone, Copy, Default)]
struct Bin {
    sum: [f64; 3],
    count: u32,
}

/// Fit one lattice of `size` nodes per axis.
///
/// `on_batch` receives the number of correspondences processed so far after
/// every batch. `cancel` is checked before each batch.
pub fn solve(
    size: usize,
    samples: &[Correspondence],
    cancel: &CancelToken,
    on_batch: &mut dyn FnMut(usize),
) -> LutoolsResult<Lut3D> {
    let identity = Lut3D::identity(size)?;
    let mut bins = vec![Bin::default(); size * size * size];

    let mut done = 0;
    for batch in samples.chunks(BATCH_SIZE) {
        cancel.check()?;
        for sample in batch {
            let node = identity.nearest_node(sample.before.map(to_unit));
            let bin = &mut bins[identity.index(node[0], node[1], node[2])];
            for c in 0..3 {
                bin.sum[c] += (sample.after[c] as f64 - sample.before[c] as f64) / 255.0;
            }
            bin.count += 1;
        }
        done += batch.len();
        on_batch(done);
    }

    let residuals = fill_residuals(size, &bins);
    let data = identity
        .data()
        .iter()
        .zip(&residuals)
        .map(|(node, residual)| {
            [
                (node[0] as f64 + residual[0]).clamp(0.0, 1.0) as f32,
                (node[1] as f64 + residual[1]).clamp(0.0, 1.0) as f32,
                (node[2] as f64 + residual[2]).clamp(0.0, 1.0) as f32,
            ]
        })
        .collect();
    Lut3D::from_data(size, data)
}

/// Mean residual per node with empty nodes flood-filled from populated ones.
fn fill_residuals(size: usize, bins: &[Bin]) -> Vec<[f64; 3]> {
    let mut residual: Vec<Option<[f64; 3]>> = bins
        .iter()
        .map(|bin| {
            (bin.count > 0).then(|| {
                let n = bin.count as f64;
                [bin.sum[0] / n, bin.sum[1] / n, bin.sum[2] / n]
            })
        })
        .collect();

    if residual.iter().all(Option::is_none) {
        return vec![[0.0; 3]; bins.len()];
    }

    let coords = |i: usize| [i % size, (i / size) % size, i / (size * size)];
    let index = |n: [usize; 3]| n[0] + n[1] * size + n[2] * size * size;

    // First layer: empty nodes touching a populated one.
    let mut queued = vec![false; residual.len()];
    let mut frontier = Vec::new();
    for i in 0..residual.len() {
        if residual[i].is_none()
            && neighbours(coords(i), size).any(|n| residual[index(n)].is_some())
        {
            queued[i] = true;
            frontier.push(i);
        }
    }

    while !frontier.is_empty() {
        // Values for this layer read only earlier layers, then commit together.
        let layer: Vec<(usize, [f64; 3])> = frontier
            .iter()
            .map(|&i| {
                let mut sum = [0.0_f64; 3];
                let mut count = 0;
                for n in neighbours(coords(i), size) {
                    if let Some(v) = residual[index(n)] {
                        for c in 0..3 {
                            sum[c] += v[c];
                        }
                        count += 1;
                    }
                }
                let n = count.max(1) as f64;
                (i, [sum[0] / n, sum[1] / n, sum[2] / n])
            })
            .collect();

        let mut next = Vec::new();
        for &(i, value) in &layer {
            residual[i] = Some(value);
        }
        for &(i, _) in &layer {
            for n in neighbours(coords(i), size) {
                let j = index(n);
                if residual[j].is_none() && !queued[j] {
                    queued[j] = true;
                    next.push(j);
                }
            }
        }
        frontier = next;
    }

    residual.into_iter().map(|v| v.unwrap_or([0.0; 3])).collect()
}

/// In-bounds 6-connected neighbours of a node.
fn neighbours([r, g, b]: [usize; 3], size: usize) -> impl Iterator<Item = [usize; 3]> {
    let last = size - 1;
    [
        (r > 0).then(|| [r - 1, g, b]),
        (r < last).then(|| [r + 1, g, b]),
        (g > 0).then(|| [r, g - 1, b]),
        (g < last).then(|| [r, g + 1, b]),
        (b > 0).then(|| [r, g, b - 1]),
        (b < last).then(|| [r, g, b + 1]),
    ]
    .into_iter()
    .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const EPSILON: f32 = 1e-6;

    fn pairs(f: impl Fn([u8; 3]) -> [u8; 3]) -> Vec<Correspondence> {
        let mut out = Vec::new();
        for r in (0..=255u8).step_by(15) {
            for g in (0..=255u8).step_by(51) {
                for b in (0..=255u8).step_by(85) {
                    let before = [r, g, b];
                    out.push(Correspondence { before, after: f(before) });
                }
            }
        }
        out
    }

    #[test]
    fn test_identical_pairs_give_identity() {
        let samples = pairs(|c| c);
        let lut = solve(8, &samples, &CancelToken::new(), &mut |_| {}).unwrap();
        let identity = Lut3D::identity(8).unwrap();
        for (a, b) in lut.data().iter().zip(identity.data()) {
            for c in 0..3 {
                assert!((a[c] - b[c]).abs() < EPSILON, "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_constant_offset_propagates_to_empty_nodes() {
        // +51 on red everywhere; every node's red output should be node + 0.2
        // (clamped), including nodes no sample landed on.
        let samples = vec![
            Correspondence { before: [0, 0, 0], after: [51, 0, 0] },
            Correspondence { before: [102, 102, 102], after: [153, 102, 102] },
        ];
        let lut = solve(6, &samples, &CancelToken::new(), &mut |_| {}).unwrap();
        for r in 0..6 {
            let v = lut.get(r, 5, 3);
            let expected = (r as f32 / 5.0 + 0.2).min(1.0);
            assert!((v[0] - expected).abs() < EPSILON, "node {r}: {v:?}");
            assert!((v[1] - 1.0).abs() < EPSILON);
            assert!((v[2] - 0.6).abs() < EPSILON);
        }
    }

    #[test]
    fn test_node_value_is_mean_of_its_samples() {
        let samples = vec![
            Correspondence { before: [255, 255, 255], after: [255, 200, 100] },
            Correspondence { before: [255, 255, 255], after: [255, 100, 0] },
        ];
        let lut = solve(2, &samples, &CancelToken::new(), &mut |_| {}).unwrap();
        let v = lut.get(1, 1, 1);
        assert!((v[1] - 150.0 / 255.0).abs() < EPSILON, "{v:?}");
        assert!((v[2] - 50.0 / 255.0).abs() < EPSILON, "{v:?}");
    }

    #[test]
    fn test_samples_vote_for_rounded_node() {
        // 127/255 sits just below the midpoint of a size-2 lattice.
        let samples = vec![
            Correspondence {
                before: [127, 127, 127],
                after: [137, 127, 127],
            };
            4
        ];
        let lut = solve(2, &samples, &CancelToken::new(), &mut |_| {}).unwrap();
        let v = lut.get(0, 0, 0);
        assert!((v[0] - 10.0 / 255.0).abs() < EPSILON, "{v:?}");

        let samples = [Correspondence {
            before: [128, 0, 255],
            after: [138, 0, 255],
        }];
        let lut = solve(32, &samples, &CancelToken::new(), &mut |_| {}).unwrap();
        let v = lut.get(16, 0, 31);
        assert!((v[0] - (16.0 / 31.0 + 10.0 / 255.0)).abs() < EPSILON, "{v:?}");
    }

    #[test]
    fn test_batches_report_cumulative_counts() {
        let samples = vec![Correspondence { before: [1, 2, 3], after: [1, 2, 3] }; BATCH_SIZE + 10];
        let mut reports = Vec::new();
        solve(2, &samples, &CancelToken::new(), &mut |done| reports.push(done)).unwrap();
        assert_eq!(reports, vec![BATCH_SIZE, BATCH_SIZE + 10]);
    }

    #[test]
    fn test_cancel_stops_before_first_batch() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let samples = pairs(|c| c);
        let err = solve(4, &samples, &cancel, &mut |_| panic!("no batch should run")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }
}
