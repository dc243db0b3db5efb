//! Sample format and rate conversion
//!
//! Bridges the application-facing float domain (app channels, app
//! rate) to the hardware-facing fixed-point domain (device channels,
//! device rate). One converter is owned by each open device and is
//! driven from its mixing thread, once per buffer pull.

pub mod resample;

use crate::remix;
use resample::{LinearResampler, Resampler};

/// Application pull callback: must fully populate the requested number
/// of frames at the negotiated channel count, and must not block
/// indefinitely (it runs on the real-time mixing thread).
pub type FillCallback = Box<dyn FnMut(&mut [f32], usize) + Send>;

/// Full-scale magnitude of the 16-bit output format.
const FULL_SCALE: f32 = 32767.0;

/// Converts the application's float stream to the device's native
/// format: pull from the callback, remix if channel counts differ,
/// resample if rates differ, quantize to i16.
pub struct SampleFormatConverter {
    callback: FillCallback,
    source_channels: usize,
    target_channels: usize,
    source_sample_rate: u32,
    target_sample_rate: u32,
    resampler: Option<Box<dyn Resampler>>,
    /// Raw callback output: source channels at source rate (reused).
    pull_buffer: Vec<f32>,
    /// Pending remixed frames, target channels at source rate; feeds
    /// the resampler and retains unconsumed frames across writes.
    pending: Vec<f32>,
    /// Float block at target channels and rate (reused).
    float_block: Vec<f32>,
    /// Total frames delivered, for diagnostics.
    frames_written: u64,
}

impl SampleFormatConverter {
    pub fn new(
        callback: FillCallback,
        source_channels: usize,
        source_sample_rate: u32,
        target_channels: usize,
        target_sample_rate: u32,
    ) -> Self {
        let resampler: Option<Box<dyn Resampler>> = if source_sample_rate != target_sample_rate {
            Some(Box::new(LinearResampler::new(
                source_sample_rate,
                target_sample_rate,
                target_channels,
            )))
        } else {
            None
        };
        Self {
            callback,
            source_channels,
            target_channels,
            source_sample_rate,
            target_sample_rate,
            resampler,
            pull_buffer: Vec::new(),
            pending: Vec::new(),
            float_block: Vec::new(),
            frames_written: 0,
        }
    }

    /// Replace the resampling stage. Only meaningful when source and
    /// target rates differ; the stage is never consulted otherwise.
    pub fn with_resampler(mut self, resampler: Box<dyn Resampler>) -> Self {
        self.resampler = Some(resampler);
        self
    }

    pub fn source_channels(&self) -> usize {
        self.source_channels
    }

    pub fn target_channels(&self) -> usize {
        self.target_channels
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Fill `dest` with `frames` frames in the device's native i16
    /// format. `dest` must hold `frames * target_channels` samples.
    pub fn write(&mut self, frames: usize, dest: &mut [i16]) {
        debug_assert!(dest.len() >= frames * self.target_channels);
        let samples = frames * self.target_channels;
        if self.float_block.len() < samples {
            self.float_block.resize(samples, 0.0);
        }
        let mut block = std::mem::take(&mut self.float_block);
        self.write_f32(frames, &mut block[..samples]);
        quantize(&block[..samples], &mut dest[..samples]);
        self.float_block = block;
    }

    /// The float stage of `write`: remixed and resampled, before
    /// quantization. Used directly by backends whose native format is
    /// float.
    pub fn write_f32(&mut self, frames: usize, dest: &mut [f32]) {
        debug_assert!(dest.len() >= frames * self.target_channels);
        if frames == 0 {
            return;
        }
        if self.source_sample_rate == self.target_sample_rate {
            // Exactly one callback invocation per write on this path.
            self.pull_block(frames, dest);
        } else {
            self.write_resampled(frames, dest);
        }
        self.frames_written += frames as u64;
    }

    /// Pull one block of `frames` source frames from the callback and
    /// remix it into `dest` at the target channel count.
    fn pull_block(&mut self, frames: usize, dest: &mut [f32]) {
        if self.source_channels == self.target_channels {
            (self.callback)(&mut dest[..frames * self.target_channels], frames);
            return;
        }
        let needed = frames * self.source_channels;
        if self.pull_buffer.len() < needed {
            self.pull_buffer.resize(needed, 0.0);
        }
        let mut pulled = std::mem::take(&mut self.pull_buffer);
        (self.callback)(&mut pulled[..needed], frames);
        remix::remix_interleaved(
            frames,
            self.source_channels,
            &pulled[..needed],
            self.target_channels,
            dest,
        );
        self.pull_buffer = pulled;
    }

    fn write_resampled(&mut self, frames: usize, dest: &mut [f32]) {
        let channels = self.target_channels;
        let Some(mut resampler) = self.resampler.take() else {
            self.pull_block(frames, dest);
            return;
        };
        // Top up the pending queue with whole callback blocks until the
        // resampler has enough source material.
        while self.pending.len() < resampler.required_input(frames) * channels {
            let start = self.pending.len();
            let mut pending = std::mem::take(&mut self.pending);
            pending.resize(start + frames * channels, 0.0);
            self.pull_block(frames, &mut pending[start..]);
            self.pending = pending;
        }
        let consumed = resampler.process(
            channels,
            &self.pending,
            &mut dest[..frames * channels],
            frames,
        );
        self.pending.drain(..consumed * channels);
        self.resampler = Some(resampler);
    }
}

/// Clamp-then-scale quantization: values outside [-1, 1] clip rather
/// than wrap, 1.0 maps to 32767 and -1.0 to -32767.
fn quantize(src: &[f32], dest: &mut [i16]) {
    for (s, d) in src.iter().zip(dest.iter_mut()) {
        *d = (s.clamp(-1.0, 1.0) * FULL_SCALE) as i16;
    }
}
