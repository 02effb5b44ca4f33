//! Adjustment parameters, per-pixel evaluation and LUT lattices.

pub mod cube;
pub mod evaluate;
pub mod lut;
pub mod params;
