//! Grading tools: channel-gain balance and slider adjustments.

pub mod sliders;
pub mod white_balance;
