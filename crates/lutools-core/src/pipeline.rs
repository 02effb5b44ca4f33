//! Full-buffer colour pipeline.
//!
//! Rows are processed in parallel; each row reads only the input buffer and
//! the shared, read-only lattices, so no locking is involved.

use rayon::prelude::*;

use crate::image::PixelBuffer;
use crate::transform::evaluate::{LutStage, evaluate_pixel, to_u8, to_unit};
use crate::transform::params::AdjustmentParams;

/// Apply the adjustment chain and LUT stages to every pixel of `src`.
///
/// Returns a new buffer of the same size. With no stages and neutral
/// parameters the output is bit-identical to the input.
pub fn apply(src: &PixelBuffer, stages: &[LutStage], params: &AdjustmentParams) -> PixelBuffer {
    let params = params.clamped();
    let active: Vec<&LutStage> = stages.iter().filter(|s| s.blend > 0.0).collect();
    if active.is_empty() && params.is_neutral() {
        return src.clone();
    }
    let active: Vec<LutStage> = active.into_iter().cloned().collect();

    let (width, height) = src.dimensions();
    let stride = src.stride();
    let input = src.as_bytes();
    let mut out = PixelBuffer::zeroed(width, height);

    out.as_bytes_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = &input[y * stride..(y + 1) * stride];
            for (dst, px) in row.chunks_exact_mut(3).zip(src_row.chunks_exact(3)) {
                let rgb = [to_unit(px[0]), to_unit(px[1]), to_unit(px[2])];
                let graded = evaluate_pixel(rgb, &active, &params);
                dst[0] = to_u8(graded[0]);
                dst[1] = to_u8(graded[1]);
                dst[2] = to_u8(graded[2]);
            }
        });

    out
}
