//! Adjustment parameters shared by previews and full-resolution processing.

use serde::{Deserialize, Serialize};

/// The five scalar adjustments applied around the LUT stages.
///
/// Every field is in `[-1, 1]` with `0.0` as the neutral value. Out-of-range
/// values are clamped by [`AdjustmentParams::clamped`] before evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentParams {
    /// Warm/cool shift. Positive boosts red and cuts blue.
    pub white_balance: f32,
    /// Green/magenta shift. Positive boosts green.
    pub tint: f32,
    /// Additive brightness offset.
    pub brightness: f32,
    /// Contrast around mid-gray. Each unit doubles or halves the slope.
    pub contrast: f32,
    /// Saturation. `-1.0` is grayscale, `1.0` doubles chroma.
    pub saturation: f32,
}

impl Default for AdjustmentParams {
    /// Produces an identity (no-op) adjustment.
    fn default() -> Self {
        Self {
            white_balance: 0.0,
            tint: 0.0,
            brightness: 0.0,
            contrast: 0.0,
            saturation: 0.0,
        }
    }
}

impl AdjustmentParams {
    /// Copy with every field clamped to `[-1, 1]`. NaN becomes neutral.
    pub fn clamped(&self) -> Self {
        let clamp = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) };
        Self {
            white_balance: clamp(self.white_balance),
            tint: clamp(self.tint),
            brightness: clamp(self.brightness),
            contrast: clamp(self.contrast),
            saturation: clamp(self.saturation),
        }
    }

    /// True when every adjustment is at its neutral value.
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_neutral() {
        assert!(AdjustmentParams::default().is_neutral());
    }

    #[test]
    fn test_clamped_limits_range() {
        let params = AdjustmentParams {
            white_balance: 3.0,
            tint: -7.5,
            brightness: f32::NAN,
            contrast: 0.25,
            saturation: -1.0,
        }
        .clamped();
        assert_eq!(params.white_balance, 1.0);
        assert_eq!(params.tint, -1.0);
        assert_eq!(params.brightness, 0.0);
        assert_eq!(params.contrast, 0.25);
        assert_eq!(params.saturation, -1.0);
    }

    #[test]
    fn test_missing_fields_deserialize_to_neutral() {
        let params: AdjustmentParams = serde_json::from_str(r#"{"contrast":0.5}"#).unwrap();
        assert_eq!(params.contrast, 0.5);
        assert_eq!(params.saturation, 0.0);
    }
}
