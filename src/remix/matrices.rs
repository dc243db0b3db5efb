//! Mixing matrices for the known channel-count pairs
//!
//! Process-wide read-only tables, row-major: one row of input
//! coefficients per output channel. Channel orders are
//! stereo = L R, 5.1 = FL FR FC LFE BL BR,
//! 7.1 = FL FR FC LFE BL BR SL SR.

use std::f32::consts::FRAC_1_SQRT_2;

/// Gain applied to center and surround channels when folding down.
const SURROUND: f32 = FRAC_1_SQRT_2;

/// Surround gain halved again for the mono fold-down rows.
const SURROUND_HALF: f32 = FRAC_1_SQRT_2 / 2.0;

// Mono feeds the front pair at unity; broadcast-style duplication so
// the matrix path and the generic mono upmix agree on L/R.
pub static MIX_1_2: [f32; 2] = [1.0, 1.0];
pub static MIX_1_6: [f32; 6] = [1.0, 1.0, 0.0, 0.0, 0.0, 0.0];
pub static MIX_1_8: [f32; 8] = [1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];

pub static MIX_2_1: [f32; 2] = [0.5, 0.5];

#[rustfmt::skip]
pub static MIX_2_6: [f32; 12] = [
    1.0, 0.0, // FL
    0.0, 1.0, // FR
    0.0, 0.0, // FC
    0.0, 0.0, // LFE
    0.0, 0.0, // BL
    0.0, 0.0, // BR
];

#[rustfmt::skip]
pub static MIX_2_8: [f32; 16] = [
    1.0, 0.0, // FL
    0.0, 1.0, // FR
    0.0, 0.0, // FC
    0.0, 0.0, // LFE
    0.0, 0.0, // BL
    0.0, 0.0, // BR
    0.0, 0.0, // SL
    0.0, 0.0, // SR
];

#[rustfmt::skip]
pub static MIX_6_1: [f32; 6] = [
    0.5, 0.5, SURROUND, 0.5, SURROUND_HALF, SURROUND_HALF,
];

#[rustfmt::skip]
pub static MIX_6_2: [f32; 12] = [
    1.0, 0.0, SURROUND, 0.5, SURROUND, 0.0, // L
    0.0, 1.0, SURROUND, 0.5, 0.0, SURROUND, // R
];

#[rustfmt::skip]
pub static MIX_6_8: [f32; 48] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 0.0, // FL
    0.0, 1.0, 0.0, 0.0, 0.0, 0.0, // FR
    0.0, 0.0, 1.0, 0.0, 0.0, 0.0, // FC
    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, // LFE
    0.0, 0.0, 0.0, 0.0, 1.0, 0.0, // BL
    0.0, 0.0, 0.0, 0.0, 0.0, 1.0, // BR
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, // SL
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, // SR
];

#[rustfmt::skip]
pub static MIX_8_1: [f32; 8] = [
    0.5, 0.5, SURROUND, 0.5, SURROUND_HALF, SURROUND_HALF, SURROUND_HALF, SURROUND_HALF,
];

#[rustfmt::skip]
pub static MIX_8_2: [f32; 16] = [
    1.0, 0.0, SURROUND, 0.5, SURROUND, 0.0, SURROUND, 0.0, // L
    0.0, 1.0, SURROUND, 0.5, 0.0, SURROUND, 0.0, SURROUND, // R
];

#[rustfmt::skip]
pub static MIX_8_6: [f32; 48] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,           // FL
    0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,           // FR
    0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0,           // FC
    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0,           // LFE
    0.0, 0.0, 0.0, 0.0, 1.0, 0.0, SURROUND, 0.0,      // BL
    0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, SURROUND,      // BR
];

/// Look up the mixing matrix for a channel-count pair.
///
/// Returns `None` for pairs outside the known set; callers fall back
/// to mono broadcast or 1:1 channel copy.
pub fn lookup(input_channels: usize, output_channels: usize) -> Option<&'static [f32]> {
    match (input_channels, output_channels) {
        (1, 2) => Some(&MIX_1_2),
        (1, 6) => Some(&MIX_1_6),
        (1, 8) => Some(&MIX_1_8),
        (2, 1) => Some(&MIX_2_1),
        (2, 6) => Some(&MIX_2_6),
        (2, 8) => Some(&MIX_2_8),
        (6, 1) => Some(&MIX_6_1),
        (6, 2) => Some(&MIX_6_2),
        (6, 8) => Some(&MIX_6_8),
        (8, 1) => Some(&MIX_8_1),
        (8, 2) => Some(&MIX_8_2),
        (8, 6) => Some(&MIX_8_6),
        _ => None,
    }
}
