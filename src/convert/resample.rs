//! Pluggable sample-rate conversion stage
//!
//! The converter treats resampling as a replaceable stage; the default
//! implementation is plain linear interpolation. Kernel quality is
//! deliberately out of scope here.

/// A streaming sample-rate converter over interleaved frames.
///
/// Implementations carry their own state across calls so block
/// boundaries stay continuous.
pub trait Resampler: Send {
    /// Source frames that must be available in `input` for `process`
    /// to produce `output_frames`. May overestimate; unconsumed frames
    /// remain the caller's to keep.
    fn required_input(&self, output_frames: usize) -> usize;

    /// Produce exactly `output_frames` interleaved frames into
    /// `output`, reading from `input`. Returns the number of source
    /// frames consumed; the caller drops those and retains the rest.
    fn process(
        &mut self,
        channels: usize,
        input: &[f32],
        output: &mut [f32],
        output_frames: usize,
    ) -> usize;
}

/// Linear-interpolation resampler with a fractional read position and
/// the last consumed frame carried across calls.
pub struct LinearResampler {
    /// Source frames advanced per output frame.
    step: f64,
    /// Fractional position between `prev` and the next unconsumed frame.
    phase: f64,
    /// Last consumed source frame, one sample per channel.
    prev: Vec<f32>,
    primed: bool,
}

impl LinearResampler {
    pub fn new(source_rate: u32, target_rate: u32, channels: usize) -> Self {
        Self {
            step: source_rate as f64 / target_rate as f64,
            phase: 0.0,
            prev: vec![0.0; channels],
            primed: false,
        }
    }
}

impl Resampler for LinearResampler {
    fn required_input(&self, output_frames: usize) -> usize {
        let span = self.phase + output_frames as f64 * self.step;
        span.ceil() as usize + 1 + usize::from(!self.primed)
    }

    fn process(
        &mut self,
        channels: usize,
        input: &[f32],
        output: &mut [f32],
        output_frames: usize,
    ) -> usize {
        let mut consumed = 0usize;
        if !self.primed {
            self.prev.copy_from_slice(&input[..channels]);
            consumed = 1;
            self.primed = true;
        }
        for i in 0..output_frames {
            while self.phase >= 1.0 {
                let frame = &input[consumed * channels..(consumed + 1) * channels];
                self.prev.copy_from_slice(frame);
                consumed += 1;
                self.phase -= 1.0;
            }
            let next = &input[consumed * channels..(consumed + 1) * channels];
            let out = &mut output[i * channels..(i + 1) * channels];
            let t = self.phase as f32;
            for ((o, p), n) in out.iter_mut().zip(&self.prev).zip(next) {
                *o = p + (n - p) * t;
            }
            self.phase += self.step;
        }
        consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ratio_passes_through() {
        let mut resampler = LinearResampler::new(44100, 44100, 1);
        let input = [0.1, 0.2, 0.3, 0.4, 0.5];
        let needed = resampler.required_input(4);
        assert!(needed <= input.len() + 1);
        let mut output = [0.0f32; 4];
        let consumed = resampler.process(1, &input, &mut output, 4);
        assert_eq!(output, [0.1, 0.2, 0.3, 0.4]);
        assert!(consumed <= input.len());
    }

    #[test]
    fn test_constant_signal_stays_constant() {
        let mut resampler = LinearResampler::new(48000, 44100, 2);
        let input = vec![0.75f32; 2 * resampler.required_input(32)];
        let mut output = vec![0.0f32; 2 * 32];
        resampler.process(2, &input, &mut output, 32);
        assert!(output.iter().all(|&s| (s - 0.75).abs() < 1e-6));
    }

    #[test]
    fn test_upsampling_interpolates_midpoint() {
        // 2x upsampling of a ramp: every other output lands between
        // source samples.
        let mut resampler = LinearResampler::new(22050, 44100, 1);
        let input = [0.0, 1.0, 2.0, 3.0];
        let mut output = [0.0f32; 6];
        resampler.process(1, &input, &mut output, 6);
        assert_eq!(output, [0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
    }

    #[test]
    fn test_state_carries_across_calls() {
        let mut resampler = LinearResampler::new(22050, 44100, 1);
        let input = [0.0, 1.0, 2.0, 3.0];
        let mut first = [0.0f32; 3];
        let consumed = resampler.process(1, &input, &mut first, 3);
        let mut second = [0.0f32; 3];
        resampler.process(1, &input[consumed..], &mut second, 3);
        assert_eq!(first, [0.0, 0.5, 1.0]);
        assert_eq!(second, [1.5, 2.0, 2.5]);
    }
}
