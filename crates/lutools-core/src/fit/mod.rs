//! LUT fitting from before/after image pairs.

pub mod samples;
pub mod solver;

use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::error::{LutoolsError, LutoolsResult};
use crate::image::PixelBuffer;
use crate::transform::lut::{Lut3D, MAX_LUT_SIZE, MIN_LUT_SIZE};

pub use samples::{Correspondence, SAMPLE_BUDGET};
pub use solver::BATCH_SIZE;

/// Fewest unique before/after pairs a fit accepts.
pub const MIN_DISTINCT_CORRESPONDENCES: usize = 64;

/// Fit one lattice per entry of `sizes` mapping `before` onto `after`.
///
/// `progress` receives `(size_index + done / total) / sizes.len()` after
/// every batch, so the sequence is non-decreasing and reaches `1.0` once the
/// last lattice is solved.
pub fn fit_luts(
    before: &PixelBuffer,
    after: &PixelBuffer,
    sizes: &[usize],
    cancel: &CancelToken,
    progress: &mut dyn FnMut(f32),
) -> LutoolsResult<Vec<Lut3D>> {
    check_sizes(sizes)?;
    if before.dimensions() != after.dimensions() {
        return Err(LutoolsError::DimensionMismatch {
            before: before.dimensions(),
            after: after.dimensions(),
        });
    }

    let samples = samples::collect(before, after);
    let distinct = samples::distinct_count(&samples);
    if distinct < MIN_DISTINCT_CORRESPONDENCES {
        return Err(LutoolsError::InsufficientSamples {
            found: distinct,
            required: MIN_DISTINCT_CORRESPONDENCES,
        });
    }
    tracing::debug!(
        samples = samples.len(),
        distinct,
        stride = samples::sample_stride(before.pixels().len()),
        "collected correspondences"
    );

    let total = samples.len() as f32;
    let count = sizes.len() as f32;
    let mut luts = Vec::with_capacity(sizes.len());
    for (i, &size) in sizes.iter().enumerate() {
        let lut = solver::solve(size, &samples, cancel, &mut |done| {
            progress((i as f32 + done as f32 / total) / count);
        })?;
        luts.push(lut);
    }
    Ok(luts)
}

/// Path of the lattice of `size` for an output prefix: `<prefix>_<size>.cube`.
pub fn output_path(prefix: &Path, size: usize) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(format!("_{size}.cube"));
    PathBuf::from(name)
}

/// Reject an empty size list or sizes the lattice cannot hold.
pub fn check_sizes(sizes: &[usize]) -> LutoolsResult<()> {
    if sizes.is_empty() {
        return Err(LutoolsError::InvalidDimensions(
            "at least one LUT size is required".into(),
        ));
    }
    if let Some(bad) = sizes
        .iter()
        .find(|s| !(MIN_LUT_SIZE..=MAX_LUT_SIZE).contains(*s))
    {
        return Err(LutoolsError::InvalidDimensions(format!(
            "LUT size {bad} outside {MIN_LUT_SIZE}..={MAX_LUT_SIZE}"
        )));
    }
    Ok(())
}
