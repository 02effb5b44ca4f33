//! 3D LUT lattice and trilinear lookup.

use std::path::Path;

use crate::error::{LutoolsError, LutoolsResult};
use crate::transform::cube;

/// Smallest lattice the engine accepts.
pub const MIN_LUT_SIZE: usize = 2;
/// Largest lattice the `.cube` format allows.
pub const MAX_LUT_SIZE: usize = 256;

/// A 3D lookup table over the unit RGB cube.
///
/// Entries are stored in `.cube` raster order, red fastest:
/// `index = r + g·size + b·size²`. Every lattice is fully populated and its
/// input domain is always `[0, 1]³`; files with other domains are resampled
/// when parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    size: usize,
    data: Vec<[f32; 3]>,
}

impl Lut3D {
    /// Identity lattice: every node maps to its own coordinate.
    pub fn identity(size: usize) -> LutoolsResult<Self> {
        check_size(size)?;
        let scale = 1.0 / (size - 1) as f32;
        let mut data = Vec::with_capacity(size * size * size);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push([r as f32 * scale, g as f32 * scale, b as f32 * scale]);
                }
            }
        }
        Ok(Self { size, data })
    }

    /// Build a lattice from entries in red-fastest order.
    pub fn from_data(size: usize, data: Vec<[f32; 3]>) -> LutoolsResult<Self> {
        check_size(size)?;
        let expected = size * size * size;
        if data.len() != expected {
            return Err(LutoolsError::SampleCountMismatch {
                expected,
                found: data.len(),
            });
        }
        Ok(Self { size, data })
    }

    /// Build a lattice by evaluating `f` at every node coordinate.
    pub fn from_fn(size: usize, mut f: impl FnMut([f32; 3]) -> [f32; 3]) -> LutoolsResult<Self> {
        let mut lut = Self::identity(size)?;
        for entry in &mut lut.data {
            *entry = f(*entry);
        }
        Ok(lut)
    }

    /// Load a `.cube` file.
    pub fn load_cube(path: &Path) -> LutoolsResult<Self> {
        cube::read_cube(path)
    }

    /// Save as a `.cube` file.
    pub fn save_cube(&self, path: &Path, title: &str) -> LutoolsResult<()> {
        cube::save_cube(path, self, title)
    }

    /// Grid size per axis.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Entries in red-fastest order.
    pub fn data(&self) -> &[[f32; 3]] {
        &self.data
    }

    /// Flat index of node `(r, g, b)`.
    #[inline]
    pub fn index(&self, r: usize, g: usize, b: usize) -> usize {
        r + g * self.size + b * self.size * self.size
    }

    /// Value stored at node `(r, g, b)`.
    #[inline]
    pub fn get(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[self.index(r, g, b)]
    }

    /// Node whose input coordinate is closest to `rgb`.
    pub fn nearest_node(&self, rgb: [f32; 3]) -> [usize; 3] {
        let max = (self.size - 1) as f32;
        rgb.map(|c| (c.clamp(0.0, 1.0) * max).round() as usize)
    }

    /// Look up `rgb` with trilinear interpolation.
    ///
    /// Input is clamped to `[0, 1]`; the upper corner clamps to the last node
    /// so there is no wraparound.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let max = (self.size - 1) as f32;
        let pos = rgb.map(|c| c.clamp(0.0, 1.0) * max);

        let lo = pos.map(|p| (p.floor() as usize).min(self.size - 1));
        let hi = lo.map(|i| (i + 1).min(self.size - 1));
        let t = [
            pos[0] - lo[0] as f32,
            pos[1] - lo[1] as f32,
            pos[2] - lo[2] as f32,
        ];

        let c000 = self.get(lo[0], lo[1], lo[2]);
        let c100 = self.get(hi[0], lo[1], lo[2]);
        let c010 = self.get(lo[0], hi[1], lo[2]);
        let c110 = self.get(hi[0], hi[1], lo[2]);
        let c001 = self.get(lo[0], lo[1], hi[2]);
        let c101 = self.get(hi[0], lo[1], hi[2]);
        let c011 = self.get(lo[0], hi[1], hi[2]);
        let c111 = self.get(hi[0], hi[1], hi[2]);

        let mut out = [0.0_f32; 3];
        for c in 0..3 {
            let c00 = lerp(c000[c], c100[c], t[0]);
            let c10 = lerp(c010[c], c110[c], t[0]);
            let c01 = lerp(c001[c], c101[c], t[0]);
            let c11 = lerp(c011[c], c111[c], t[0]);
            let c0 = lerp(c00, c10, t[1]);
            let c1 = lerp(c01, c11, t[1]);
            out[c] = lerp(c0, c1, t[2]);
        }
        out
    }
}

/// Reject lattice sizes outside `MIN_LUT_SIZE..=MAX_LUT_SIZE`.
pub fn check_size(size: usize) -> LutoolsResult<()> {
    if (MIN_LUT_SIZE..=MAX_LUT_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(LutoolsError::MalformedHeader(format!(
            "LUT size {size} outside {MIN_LUT_SIZE}..={MAX_LUT_SIZE}"
        )))
    }
}

#[inline]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_identity_lookup_returns_input() {
        let lut = Lut3D::identity(17).unwrap();
        for rgb in [[0.0, 0.0, 0.0], [0.25, 0.5, 0.75], [0.333, 0.917, 0.01], [1.0, 1.0, 1.0]] {
            let out = lut.apply(rgb);
            for c in 0..3 {
                assert!((out[c] - rgb[c]).abs() < EPSILON, "{rgb:?} -> {out:?}");
            }
        }
    }

    #[test]
    fn test_apply_at_node_returns_node_value() {
        let lut = Lut3D::from_fn(5, |[r, g, b]| [g, b, r * 0.5]).unwrap();
        let out = lut.apply([0.25, 0.5, 1.0]);
        assert_eq!(out, lut.get(1, 2, 4));
    }

    #[test]
    fn test_apply_clamps_out_of_range_input() {
        let lut = Lut3D::from_fn(3, |[r, g, b]| [1.0 - r, 1.0 - g, 1.0 - b]).unwrap();
        assert_eq!(lut.apply([-0.5, 2.0, 1.0]), lut.get(0, 2, 2));
    }

    #[test]
    fn test_apply_interpolates_midway() {
        let lut = Lut3D::from_fn(2, |[r, _, _]| [r * r, 0.0, 0.0]).unwrap();
        let out = lut.apply([0.5, 0.0, 0.0]);
        assert!((out[0] - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_index_is_red_fastest() {
        let lut = Lut3D::identity(4).unwrap();
        assert_eq!(lut.data()[1], [1.0 / 3.0, 0.0, 0.0]);
        assert_eq!(lut.index(0, 0, 1), 16);
    }

    #[test]
    fn test_nearest_node_rounds() {
        let lut = Lut3D::identity(32).unwrap();
        assert_eq!(lut.nearest_node([128.0 / 255.0; 3]), [16, 16, 16]);
        assert_eq!(lut.nearest_node([0.0, 1.0, 2.0]), [0, 31, 31]);
    }

    #[test]
    fn test_size_one_rejected() {
        let err = Lut3D::identity(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedHeader);
    }

    #[test]
    fn test_from_data_rejects_short_lattice() {
        let err = Lut3D::from_data(2, vec![[0.0; 3]; 7]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SampleCountMismatch);
    }
}
