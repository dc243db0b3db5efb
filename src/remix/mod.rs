//! Channel remixing engine
//!
//! Converts N-channel audio to M-channel audio, frame accurate, in
//! both interleaved and planar layouts. Known channel-count pairs go
//! through constant mixing matrices; mono upmixes by broadcast; every
//! other pair resolves through a 1:1 copy with zero fill, so no pair
//! is ever an error.

pub mod matrices;

use crate::constants::MAX_KNOWN_CHANNELS;

/// Remix interleaved audio from `input_channels` to `output_channels`.
///
/// `input` must hold at least `frames * input_channels` samples and
/// `output` at least `frames * output_channels`; every output sample
/// in that range is overwritten.
pub fn remix_interleaved(
    frames: usize,
    input_channels: usize,
    input: &[f32],
    output_channels: usize,
    output: &mut [f32],
) {
    debug_assert!(input.len() >= frames * input_channels);
    debug_assert!(output.len() >= frames * output_channels);
    if frames == 0 {
        return;
    }
    if let Some(matrix) = matrices::lookup(input_channels, output_channels) {
        apply_matrix_interleaved(frames, input_channels, input, output_channels, output, matrix);
    } else if input_channels == 1 {
        upmix_mono_interleaved(frames, input, output_channels, output);
    } else {
        mix_unrecognized_interleaved(frames, input_channels, input, output_channels, output);
    }
}

/// Remix planar audio from `input_channels` to `output_channels`.
///
/// `inputs` holds one slice per input channel, `outputs` one per
/// output channel; each slice must hold at least `frames` samples.
pub fn remix_planar(
    frames: usize,
    inputs: &[&[f32]],
    outputs: &mut [&mut [f32]],
) {
    let input_channels = inputs.len();
    let output_channels = outputs.len();
    debug_assert!(inputs.iter().all(|c| c.len() >= frames));
    debug_assert!(outputs.iter().all(|c| c.len() >= frames));
    if frames == 0 {
        return;
    }
    if let Some(matrix) = matrices::lookup(input_channels, output_channels) {
        apply_matrix_planar(frames, inputs, outputs, matrix);
    } else if input_channels == 1 {
        upmix_mono_planar(frames, inputs[0], outputs);
    } else {
        mix_unrecognized_planar(frames, inputs, outputs);
    }
}

/// Broadcast a mono input to every output channel, unattenuated.
fn upmix_mono_interleaved(frames: usize, input: &[f32], output_channels: usize, output: &mut [f32]) {
    for (i, sample) in input.iter().take(frames).enumerate() {
        let out = &mut output[i * output_channels..(i + 1) * output_channels];
        out.fill(*sample);
    }
}

fn upmix_mono_planar(frames: usize, input: &[f32], outputs: &mut [&mut [f32]]) {
    for channel in outputs.iter_mut() {
        channel[..frames].copy_from_slice(&input[..frames]);
    }
}

/// Fallback for pairs outside the known set: channels map 1:1 up to
/// min(in, out), extra inputs are discarded, extra outputs silenced.
/// No gain compensation; the silence/passthrough semantics are
/// load-bearing for callers.
fn mix_unrecognized_interleaved(
    frames: usize,
    input_channels: usize,
    input: &[f32],
    output_channels: usize,
    output: &mut [f32],
) {
    let needed = input_channels.min(output_channels);
    for i in 0..frames {
        let frame_in = &input[i * input_channels..i * input_channels + needed];
        let frame_out = &mut output[i * output_channels..(i + 1) * output_channels];
        frame_out[..needed].copy_from_slice(frame_in);
        frame_out[needed..].fill(0.0);
    }
}

fn mix_unrecognized_planar(frames: usize, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
    let needed = inputs.len().min(outputs.len());
    for (channel, input) in outputs.iter_mut().zip(inputs.iter()).take(needed) {
        channel[..frames].copy_from_slice(&input[..frames]);
    }
    for channel in outputs.iter_mut().skip(needed) {
        channel[..frames].fill(0.0);
    }
}

/// Matrix-vector multiply per frame: each output channel is the dot
/// product of the input frame with that channel's matrix row.
fn apply_matrix_interleaved(
    frames: usize,
    input_channels: usize,
    input: &[f32],
    output_channels: usize,
    output: &mut [f32],
    matrix: &[f32],
) {
    debug_assert_eq!(matrix.len(), input_channels * output_channels);
    let mut frame = [0.0f32; MAX_KNOWN_CHANNELS];
    for i in 0..frames {
        frame[..input_channels].copy_from_slice(&input[i * input_channels..(i + 1) * input_channels]);
        for row in 0..output_channels {
            let coefficients = &matrix[row * input_channels..(row + 1) * input_channels];
            let mut acc = 0.0;
            for (sample, coefficient) in frame[..input_channels].iter().zip(coefficients) {
                acc += sample * coefficient;
            }
            output[i * output_channels + row] = acc;
        }
    }
}

fn apply_matrix_planar(frames: usize, inputs: &[&[f32]], outputs: &mut [&mut [f32]], matrix: &[f32]) {
    let input_channels = inputs.len();
    debug_assert_eq!(matrix.len(), input_channels * outputs.len());
    let mut frame = [0.0f32; MAX_KNOWN_CHANNELS];
    for i in 0..frames {
        for (slot, channel) in frame[..input_channels].iter_mut().zip(inputs.iter()) {
            *slot = channel[i];
        }
        for (row, output) in outputs.iter_mut().enumerate() {
            let coefficients = &matrix[row * input_channels..(row + 1) * input_channels];
            let mut acc = 0.0;
            for (sample, coefficient) in frame[..input_channels].iter().zip(coefficients) {
                acc += sample * coefficient;
            }
            output[i] = acc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::FRAC_1_SQRT_2;

    fn remix_vec(frames: usize, input_channels: usize, input: &[f32], output_channels: usize) -> Vec<f32> {
        let mut output = vec![f32::NAN; frames * output_channels];
        remix_interleaved(frames, input_channels, input, output_channels, &mut output);
        output
    }

    #[test]
    fn test_zero_frames_is_noop() {
        let mut output = [f32::NAN; 4];
        remix_interleaved(0, 2, &[], 2, &mut output);
        assert!(output.iter().all(|s| s.is_nan()));
    }

    #[test]
    fn test_mono_to_stereo_matrix() {
        let input = [0.25, -0.5, 1.0];
        let output = remix_vec(3, 1, &input, 2);
        assert_eq!(output, vec![0.25, 0.25, -0.5, -0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_stereo_to_mono_averages() {
        let input = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let output = remix_vec(3, 2, &input, 1);
        assert_eq!(output, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_mono_round_trip_gain() {
        // Fixed documented gains: mono -> stereo is unity on both
        // channels, stereo -> mono is 0.5 per channel, so a constant
        // mono source survives the round trip exactly.
        let c = 0.625_f32;
        let stereo = remix_vec(4, 1, &[c; 4], 2);
        assert!(stereo.iter().all(|&s| s == c));
        let mono = remix_vec(4, 2, &stereo, 1);
        assert!(mono.iter().all(|&s| s == c));
    }

    #[test]
    fn test_mono_broadcast_for_unknown_output_count() {
        // (1, 5) is not in the known set: plain broadcast, no attenuation.
        let input = [0.1, -0.9];
        let output = remix_vec(2, 1, &input, 5);
        for frame in 0..2 {
            for channel in 0..5 {
                assert_eq!(output[frame * 5 + channel], input[frame]);
            }
        }
    }

    #[test]
    fn test_fallback_upmix_3_to_5() {
        let input = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let output = remix_vec(2, 3, &input, 5);
        assert_eq!(output[..5], [1.0, 2.0, 3.0, 0.0, 0.0]);
        assert_eq!(output[5..], [4.0, 5.0, 6.0, 0.0, 0.0]);
    }

    #[test]
    fn test_fallback_downmix_5_to_3() {
        let input = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let output = remix_vec(2, 5, &input, 3);
        // Channels 3 and 4 are discarded, not folded in.
        assert_eq!(output, vec![1.0, 2.0, 3.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_fallback_identity_passthrough() {
        let input = [0.1, 0.2, 0.3, 0.4];
        let output = remix_vec(2, 2, &input, 2);
        assert_eq!(output, input.to_vec());
    }

    #[test]
    fn test_surround_downmix_folds_center() {
        // One frame of 5.1 with only the center channel lit.
        let input = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let output = remix_vec(1, 6, &input, 2);
        assert!((output[0] - FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((output[1] - FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_seven_one_to_five_one_folds_sides_into_backs() {
        let mut input = [0.0f32; 8];
        input[6] = 1.0; // SL
        let output = remix_vec(1, 8, &input, 6);
        assert!((output[4] - FRAC_1_SQRT_2).abs() < 1e-6);
        assert_eq!(output[5], 0.0);
    }

    #[test]
    fn test_matrix_linearity() {
        let input: Vec<f32> = (0..12).map(|i| (i as f32 * 0.37).sin() * 0.5).collect();
        let base = remix_vec(2, 6, &input, 2);
        let scaled_input: Vec<f32> = input.iter().map(|s| s * 3.0).collect();
        let scaled = remix_vec(2, 6, &scaled_input, 2);
        for (a, b) in base.iter().zip(&scaled) {
            assert!((a * 3.0 - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_planar_matches_interleaved() {
        let left = [0.5, -0.5, 0.25];
        let right = [0.1, 0.2, 0.3];
        let mut mono = [0.0f32; 3];
        {
            let inputs: [&[f32]; 2] = [&left, &right];
            let mut out_refs: [&mut [f32]; 1] = [&mut mono];
            remix_planar(3, &inputs, &mut out_refs);
        }
        let interleaved = [0.5, 0.1, -0.5, 0.2, 0.25, 0.3];
        let expected = remix_vec(3, 2, &interleaved, 1);
        assert_eq!(mono.to_vec(), expected);
    }

    #[test]
    fn test_planar_fallback_zero_fills() {
        let a = [1.0, 2.0];
        let b = [3.0, 4.0];
        let c = [5.0, 6.0];
        let mut out0 = [f32::NAN; 2];
        let mut out1 = [f32::NAN; 2];
        let mut out2 = [f32::NAN; 2];
        let mut out3 = [f32::NAN; 2];
        let inputs: [&[f32]; 3] = [&a, &b, &c];
        let mut outputs: [&mut [f32]; 4] = [&mut out0, &mut out1, &mut out2, &mut out3];
        remix_planar(2, &inputs, &mut outputs);
        assert_eq!(out0, a);
        assert_eq!(out1, b);
        assert_eq!(out2, c);
        assert_eq!(out3, [0.0, 0.0]);
    }

    proptest! {
        #[test]
        fn prop_every_pair_produces_finite_output(
            frames in 0usize..48,
            input_channels in 1usize..10,
            output_channels in 1usize..10,
            seed in any::<u32>(),
        ) {
            let input: Vec<f32> = (0..frames * input_channels)
                .map(|i| (((seed as usize + i) % 97) as f32 / 48.5) - 1.0)
                .collect();
            let output = remix_vec(frames, input_channels, &input, output_channels);
            prop_assert_eq!(output.len(), frames * output_channels);
            prop_assert!(output.iter().all(|s| s.is_finite()));
        }
    }
}
