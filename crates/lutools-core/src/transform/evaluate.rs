//! Core transform evaluation: the full adjustment chain for a single pixel.

use std::sync::Arc;

use crate::grading::sliders::{apply_brightness, apply_contrast, apply_saturation};
use crate::grading::white_balance::{apply_tint, apply_white_balance};
use crate::transform::lut::{Lut3D, lerp};
use crate::transform::params::AdjustmentParams;

/// One LUT in the chain together with how much of it to mix in.
#[derive(Debug, Clone)]
pub struct LutStage {
    /// Shared lattice. Snapshotting the `Arc` lets evaluation run without
    /// holding the engine's handle table.
    pub lut: Arc<Lut3D>,
    /// Fraction of the LUT's effect, `0.0..=1.0`.
    pub blend: f32,
}

impl LutStage {
    pub fn new(lut: Arc<Lut3D>, blend: f32) -> Self {
        Self {
            lut,
            blend: clamp_blend(blend),
        }
    }

    /// Apply this stage: `lerp(in, lut(in), blend)`.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        if self.blend <= 0.0 {
            return rgb;
        }
        let graded = self.lut.apply(rgb);
        if self.blend >= 1.0 {
            return graded;
        }
        [
            lerp(rgb[0], graded[0], self.blend),
            lerp(rgb[1], graded[1], self.blend),
            lerp(rgb[2], graded[2], self.blend),
        ]
    }
}

/// Clamp a blend factor to `[0, 1]`. NaN becomes `0.0`.
pub fn clamp_blend(blend: f32) -> f32 {
    if blend.is_nan() { 0.0 } else { blend.clamp(0.0, 1.0) }
}

/// Applies the complete adjustment chain to one normalized RGB pixel:
/// 1. White balance
/// 2. Tint
/// 3. Each LUT stage in order, each reading the previous stage's output
/// 4. Brightness
/// 5. Contrast around mid-gray
/// 6. Saturation
///
/// The result is not clamped; quantization does that. `params` is expected
/// to be [`AdjustmentParams::clamped`] already.
pub fn evaluate_pixel(rgb: [f32; 3], stages: &[LutStage], params: &AdjustmentParams) -> [f32; 3] {
    let mut c = apply_white_balance(rgb, params.white_balance);
    c = apply_tint(c, params.tint);
    for stage in stages {
        c = stage.apply(c);
    }
    c = apply_brightness(c, params.brightness);
    c = apply_contrast(c, params.contrast);
    apply_saturation(c, params.saturation)
}

/// 8-bit sample to `[0, 1]`.
#[inline]
pub fn to_unit(sample: u8) -> f32 {
    sample as f32 / 255.0
}

/// Clamp to `[0, 1]` and round to the nearest 8-bit value.
#[inline]
pub fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn invert_lut() -> Arc<Lut3D> {
        Arc::new(Lut3D::from_fn(9, |[r, g, b]| [1.0 - r, 1.0 - g, 1.0 - b]).unwrap())
    }

    #[test]
    fn test_neutral_chain_is_identity_on_every_8bit_value() {
        let params = AdjustmentParams::default();
        for v in 0..=255u8 {
            let rgb = [to_unit(v), to_unit(255 - v), to_unit(v / 2)];
            let out = evaluate_pixel(rgb, &[], &params);
            assert_eq!(out.map(to_u8), [v, 255 - v, v / 2]);
        }
    }

    #[test]
    fn test_zero_blend_skips_lut() {
        let stage = LutStage::new(invert_lut(), 0.0);
        let rgb = [0.2, 0.4, 0.6];
        assert_eq!(stage.apply(rgb), rgb);
    }

    #[test]
    fn test_half_blend_mixes_with_input() {
        let stage = LutStage::new(invert_lut(), 0.5);
        let out = stage.apply([0.25, 0.5, 1.0]);
        for c in out {
            assert!((c - 0.5).abs() < EPSILON, "{out:?}");
        }
    }

    #[test]
    fn test_blend_is_clamped() {
        assert_eq!(LutStage::new(invert_lut(), 3.0).blend, 1.0);
        assert_eq!(LutStage::new(invert_lut(), -1.0).blend, 0.0);
        assert_eq!(clamp_blend(f32::NAN), 0.0);
    }

    #[test]
    fn test_stages_compose_in_order() {
        // Invert twice returns the input.
        let stages = [LutStage::new(invert_lut(), 1.0), LutStage::new(invert_lut(), 1.0)];
        let out = evaluate_pixel([0.125, 0.5, 0.875], &stages, &AdjustmentParams::default());
        assert!((out[0] - 0.125).abs() < EPSILON);
        assert!((out[2] - 0.875).abs() < EPSILON);
    }

    #[test]
    fn test_brightness_applies_after_lut() {
        // Inverting 0.2 gives 0.8; brightening afterwards gives 0.95. Had the
        // offset come first the result would be 0.5.
        let stages = [LutStage::new(invert_lut(), 1.0)];
        let params = AdjustmentParams {
            brightness: 0.5,
            ..Default::default()
        };
        let out = evaluate_pixel([0.2; 3], &stages, &params);
        assert!((out[0] - 0.95).abs() < EPSILON, "{out:?}");
    }

    #[test]
    fn test_quantization_rounds_and_clamps() {
        assert_eq!(to_u8(-0.3), 0);
        assert_eq!(to_u8(1.7), 255);
        assert_eq!(to_u8(0.5), 128);
        assert_eq!(to_u8(84.6 / 255.0), 85);
    }
}
