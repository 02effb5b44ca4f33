//! Slider-based grading adjustments (brightness, contrast, saturation).

/// ITU-R BT.601 luma weights.
const LUMA_BT601: [f32; 3] = [0.299, 0.587, 0.114];

/// Offset applied at `brightness = ±1`.
const BRIGHTNESS_RANGE: f32 = 0.3;

/// Contrast pivot.
const MID_GRAY: f32 = 0.5;

/// Apply an additive brightness offset.
///
/// ```text
/// out = in + 0.3 × brightness
/// ```
///
/// `brightness = 0.0` produces no change.
pub fn apply_brightness(rgb: [f32; 3], brightness: f32) -> [f32; 3] {
    if brightness.abs() < 1e-7 {
        return rgb;
    }

    let offset = BRIGHTNESS_RANGE * brightness;
    rgb.map(|c| c + offset)
}

/// Apply contrast around mid-gray.
///
/// The slope doubles at `contrast = 1` and halves at `contrast = -1`.
/// Mid-gray is unchanged at any setting.
///
/// ```text
/// out = (in − 0.5) × 2^contrast + 0.5
/// ```
///
/// `contrast = 0.0` produces no change.
pub fn apply_contrast(rgb: [f32; 3], contrast: f32) -> [f32; 3] {
    if contrast.abs() < 1e-7 {
        return rgb;
    }

    let slope = contrast.exp2();
    rgb.map(|c| (c - MID_GRAY) * slope + MID_GRAY)
}

/// Apply saturation relative to BT.601 luma.
///
/// ```text
/// luma = dot(rgb, bt601)
/// out = luma + (in − luma) × (1 + saturation)
/// ```
///
/// `saturation = 0.0` produces no change; `-1.0` produces grayscale.
pub fn apply_saturation(rgb: [f32; 3], saturation: f32) -> [f32; 3] {
    if saturation.abs() < 1e-7 {
        return rgb;
    }

    let luma = luma(rgb);
    let scale = 1.0 + saturation;
    rgb.map(|c| luma + (c - luma) * scale)
}

/// BT.601 luma of a normalized RGB triple.
pub fn luma(rgb: [f32; 3]) -> f32 {
    rgb[0] * LUMA_BT601[0] + rgb[1] * LUMA_BT601[1] + rgb[2] * LUMA_BT601[2]
}
