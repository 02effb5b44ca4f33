//! Before/after correspondence sampling.

use std::collections::HashSet;

use crate::image::PixelBuffer;

/// Pixels sampled in full before striding kicks in (a 1000×750 frame).
pub const SAMPLE_BUDGET: usize = 750_000;

/// One pixel position's colour before and after grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Correspondence {
    pub before: [u8; 3],
    pub after: [u8; 3],
}

/// Step between sampled pixels for an image of `pixel_count` pixels.
///
/// `1` up to [`SAMPLE_BUDGET`], otherwise `ceil(pixel_count / SAMPLE_BUDGET)`.
pub fn sample_stride(pixel_count: usize) -> usize {
    if pixel_count <= SAMPLE_BUDGET {
        1
    } else {
        pixel_count.div_ceil(SAMPLE_BUDGET)
    }
}

/// Pair up pixels of two equally sized images, starting at pixel 0 and
/// stepping by [`sample_stride`] in row-major order.
pub fn collect(before: &PixelBuffer, after: &PixelBuffer) -> Vec<Correspondence> {
    let before = before.pixels();
    let after = after.pixels();
    let stride = sample_stride(before.len());
    before
        .iter()
        .zip(after)
        .step_by(stride)
        .map(|(&before, &after)| Correspondence { before, after })
        .collect()
}

/// Number of unique before/after pairs.
pub fn distinct_count(samples: &[Correspondence]) -> usize {
    samples.iter().copied().collect::<HashSet<_>>().len()
}
