//! White balance and tint as linear channel gains.
//!
//! Both adjustments scale channels around zero, so black stays black and the
//! strongest setting moves a channel by 20%.

/// Red/blue gain at `white_balance = ±1`.
const WHITE_BALANCE_GAIN: f32 = 0.2;

/// Green gain at `tint = ±1`. Red and blue move by half this, oppositely.
const TINT_GAIN: f32 = 0.2;

/// Apply a warm/cool shift.
///
/// ```text
/// r' = r × (1 + 0.2·wb)
/// b' = b × (1 − 0.2·wb)
/// ```
///
/// `wb = 0.0` produces no change.
pub fn apply_white_balance(rgb: [f32; 3], white_balance: f32) -> [f32; 3] {
    if white_balance.abs() < 1e-7 {
        return rgb;
    }

    let gain = WHITE_BALANCE_GAIN * white_balance;
    [rgb[0] * (1.0 + gain), rgb[1], rgb[2] * (1.0 - gain)]
}

/// Apply a green/magenta shift.
///
/// ```text
/// g' = g × (1 + 0.2·tint)
/// r' = r × (1 − 0.1·tint)
/// b' = b × (1 − 0.1·tint)
/// ```
///
/// `tint = 0.0` produces no change.
pub fn apply_tint(rgb: [f32; 3], tint: f32) -> [f32; 3] {
    if tint.abs() < 1e-7 {
        return rgb;
    }

    let green = TINT_GAIN * tint;
    let other = 1.0 - 0.5 * green;
    [rgb[0] * other, rgb[1] * (1.0 + green), rgb[2] * other]
}
