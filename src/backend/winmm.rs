//! WinMM (waveOut) output backend
//!
//! The oldest Windows output path, kept because it works everywhere:
//! a ring of WAVEHDR buffers submitted with `waveOutWrite`, completion
//! reported through WHDR_DONE and a driver callback that signals the
//! mixing thread's wake channel.

use std::mem;

use crossbeam_channel::{bounded, Receiver, Sender};
use windows::core::GUID;
use windows::Win32::Media::Audio::{
    waveOutClose, waveOutGetDevCapsW, waveOutGetNumDevs, waveOutOpen, waveOutPrepareHeader,
    waveOutReset, waveOutUnprepareHeader, waveOutWrite, CALLBACK_FUNCTION, HWAVEOUT, MM_WOM_DONE,
    WAVEFORMATEXTENSIBLE, WAVEHDR, WAVEOUTCAPSW, WAVE_FORMAT_QUERY, WAVE_MAPPER, WHDR_DONE,
};

use crate::backend::PlatformQueue;
use crate::constants::{CHANNEL_CANDIDATES, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE, PROBE_SAMPLE_RATES};
use crate::convert::{FillCallback, SampleFormatConverter};
use crate::device::driver::BufferedOutput;
use crate::device::factory::{DescriptorCache, DeviceTarget, LatencySpec, OutputDeviceFactory};
use crate::device::{mix_ahead_for_latency, DeviceDescriptor, OutputDevice};
use crate::error::{DeviceError, Result};

const MMSYSERR_NOERROR: u32 = 0;
const WAVE_FORMAT_PCM_TAG: u16 = 1;
const WAVE_FORMAT_EXTENSIBLE_TAG: u16 = 0xFFFE;

/// dwChannelMask by channel count; only 2, 6 and 8 are ever opened in
/// extended format.
const CHANNEL_MASKS: [u32; 9] = [0, 0, 0x3, 0, 0, 0, 0x3F, 0, 0x63F];

const KSDATAFORMAT_SUBTYPE_PCM: GUID = GUID::from_u128(0x00000001_0000_0010_8000_00aa00389b71);

/// Build a 16-bit PCM format description; `extended` selects
/// WAVEFORMATEXTENSIBLE with a channel mask, the legacy path a plain
/// WAVEFORMATEX.
fn make_format(channels: u16, sample_rate: u32, extended: bool) -> WAVEFORMATEXTENSIBLE {
    let mut format = WAVEFORMATEXTENSIBLE::default();
    format.Format.wFormatTag = WAVE_FORMAT_EXTENSIBLE_TAG;
    format.Format.nChannels = channels;
    format.Format.nSamplesPerSec = sample_rate;
    format.Format.wBitsPerSample = 16;
    format.Format.nBlockAlign = channels * 2;
    format.Format.nAvgBytesPerSec = sample_rate * u32::from(channels) * 2;
    format.Format.cbSize = 22;
    format.Samples.wValidBitsPerSample = 16;
    format.dwChannelMask = CHANNEL_MASKS[usize::from(channels)];
    format.SubFormat = KSDATAFORMAT_SUBTYPE_PCM;
    if !extended {
        format.Format.wFormatTag = WAVE_FORMAT_PCM_TAG;
        format.Format.cbSize = 0;
    }
    format
}

/// Driver-side completion callback: forwards every finished buffer to
/// the mixing thread's wake channel. Runs at interrupt time, so it
/// must not block or allocate.
extern "system" fn wave_out_proc(
    _handle: HWAVEOUT,
    message: u32,
    instance: usize,
    _param1: usize,
    _param2: usize,
) {
    if message == MM_WOM_DONE && instance != 0 {
        let wake = unsafe { &*(instance as *const Sender<()>) };
        let _ = wake.try_send(());
    }
}

/// One open waveOut handle plus its WAVEHDR ring.
///
/// Owned exclusively by the mixing thread after construction; the
/// driver callback touches only the wake sender.
pub struct WinmmQueue {
    handle: HWAVEOUT,
    headers: Vec<WAVEHDR>,
    buffers: Vec<Vec<i16>>,
    /// Heap-pinned wake sender the driver callback reads through
    /// `dwInstance`; freed after the handle is closed.
    wake: *mut Sender<()>,
}

// The raw handle and the pinned sender pointer move to the mixing
// thread as a unit; WinMM allows cross-thread use of HWAVEOUT.
unsafe impl Send for WinmmQueue {}

impl WinmmQueue {
    /// Open a waveOut handle, trying extended-format channel counts in
    /// descending order, then legacy stereo as a last resort.
    ///
    /// Returns the queue, the channel count actually opened, and the
    /// wake receiver for the mixing thread.
    fn open(
        device_id: u32,
        requested_channels: usize,
        max_channels: u16,
        sample_rate: u32,
        block_size: usize,
        slots: usize,
    ) -> std::result::Result<(Self, usize, Receiver<()>), DeviceError> {
        let (wake_tx, wake_rx) = bounded::<()>(slots.max(1));
        let wake = Box::into_raw(Box::new(wake_tx));

        let needed_channels = requested_channels.max(2) as u16;
        let mut handle = HWAVEOUT::default();
        let mut out_channels = 0usize;
        for candidate in CHANNEL_CANDIDATES {
            if candidate > needed_channels || candidate > max_channels {
                continue;
            }
            let format = make_format(candidate, sample_rate, true);
            let res = unsafe {
                waveOutOpen(
                    Some(&mut handle),
                    device_id,
                    &format.Format,
                    wave_out_proc as usize,
                    wake as usize,
                    CALLBACK_FUNCTION,
                )
            };
            if res == MMSYSERR_NOERROR {
                out_channels = usize::from(candidate);
                break;
            }
        }
        if out_channels == 0 {
            // Last resort: plain stereo in the legacy format.
            let format = make_format(2, sample_rate, false);
            let res = unsafe {
                waveOutOpen(
                    Some(&mut handle),
                    device_id,
                    &format.Format,
                    wave_out_proc as usize,
                    wake as usize,
                    CALLBACK_FUNCTION,
                )
            };
            if res != MMSYSERR_NOERROR {
                drop(unsafe { Box::from_raw(wake) });
                return Err(DeviceError::NoCompatibleFormat);
            }
            out_channels = 2;
        }

        let samples = block_size * out_channels;
        let mut headers = vec![WAVEHDR::default(); slots];
        for header in &mut headers {
            // Untouched slots must report free to the first ring scan.
            header.dwFlags = WHDR_DONE;
        }
        let queue = Self {
            handle,
            headers,
            buffers: vec![vec![0i16; samples]; slots],
            wake,
        };
        Ok((queue, out_channels, wake_rx))
    }
}

impl PlatformQueue for WinmmQueue {
    fn slot_count(&self) -> usize {
        self.headers.len()
    }

    fn is_complete(&self, slot: usize) -> bool {
        self.headers[slot].dwFlags & WHDR_DONE != 0
    }

    fn submit(&mut self, slot: usize, samples: &[i16]) -> std::result::Result<(), DeviceError> {
        let header = &mut self.headers[slot];
        unsafe {
            waveOutUnprepareHeader(self.handle, header, mem::size_of::<WAVEHDR>() as u32);
        }
        let buffer = &mut self.buffers[slot];
        buffer.copy_from_slice(samples);
        header.lpData = windows::core::PSTR(buffer.as_mut_ptr() as *mut u8);
        header.dwBufferLength = (buffer.len() * mem::size_of::<i16>()) as u32;
        header.dwFlags = 0;
        let res = unsafe {
            let prepared = waveOutPrepareHeader(self.handle, header, mem::size_of::<WAVEHDR>() as u32);
            if prepared != MMSYSERR_NOERROR {
                return Err(DeviceError::SubmitFailed(format!(
                    "waveOutPrepareHeader returned {prepared}"
                )));
            }
            waveOutWrite(self.handle, header, mem::size_of::<WAVEHDR>() as u32)
        };
        if res != MMSYSERR_NOERROR {
            return Err(DeviceError::SubmitFailed(format!(
                "waveOutWrite returned {res}"
            )));
        }
        Ok(())
    }

    fn flush(&mut self) {
        // Ends playback and marks every queued header done.
        unsafe {
            waveOutReset(self.handle);
        }
    }
}

impl Drop for WinmmQueue {
    fn drop(&mut self) {
        unsafe {
            for header in &mut self.headers {
                waveOutUnprepareHeader(self.handle, header, mem::size_of::<WAVEHDR>() as u32);
            }
            waveOutClose(self.handle);
            // No more driver callbacks after close; the pinned sender
            // can go.
            drop(Box::from_raw(self.wake));
        }
    }
}

/// Speculative query-mode opens over the channel/rate candidate
/// matrix; the first accepted combination is the device's native
/// default, otherwise stereo at 44100.
fn probe_capabilities(device_id: u32) -> (u16, u32) {
    for channels in CHANNEL_CANDIDATES {
        for sample_rate in PROBE_SAMPLE_RATES {
            let format = make_format(channels, sample_rate, true);
            let res = unsafe {
                waveOutOpen(
                    None,
                    device_id,
                    &format.Format,
                    0,
                    0,
                    WAVE_FORMAT_QUERY,
                )
            };
            if res == MMSYSERR_NOERROR {
                return (channels, sample_rate);
            }
        }
    }
    (DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE)
}

fn device_name(caps: &WAVEOUTCAPSW) -> String {
    let len = caps.szPname.iter().position(|&c| c == 0).unwrap_or(caps.szPname.len());
    String::from_utf16_lossy(&caps.szPname[..len])
}

/// Factory over the WinMM device table.
pub struct WinmmOutputDeviceFactory {
    cache: DescriptorCache,
}

impl WinmmOutputDeviceFactory {
    pub fn new() -> Self {
        Self {
            cache: DescriptorCache::new(),
        }
    }
}

impl Default for WinmmOutputDeviceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDeviceFactory for WinmmOutputDeviceFactory {
    fn name(&self) -> &str {
        "winmm"
    }

    fn scan(&self) -> Result<()> {
        let count = unsafe { waveOutGetNumDevs() };
        let mut devices = Vec::with_capacity(count as usize);
        for id in 0..count {
            let mut caps = WAVEOUTCAPSW::default();
            let res = unsafe {
                waveOutGetDevCapsW(id as usize, &mut caps, mem::size_of::<WAVEOUTCAPSW>() as u32)
            };
            if res != MMSYSERR_NOERROR {
                tracing::warn!("skipping waveOut device {id}: caps query returned {res}");
                continue;
            }
            let (max_channels, sample_rate) = probe_capabilities(id);
            devices.push(DeviceDescriptor {
                name: device_name(&caps),
                index: id as usize,
                max_channels,
                sample_rate,
            });
        }
        let (mapper_channels, mapper_rate) = probe_capabilities(WAVE_MAPPER);
        let default = DeviceDescriptor {
            name: "default".to_string(),
            index: WAVE_MAPPER as usize,
            max_channels: mapper_channels,
            sample_rate: mapper_rate,
        };
        tracing::info!("winmm scan found {} output devices", devices.len());
        self.cache.replace(devices, default);
        Ok(())
    }

    fn descriptors(&self) -> Vec<DeviceDescriptor> {
        self.cache.snapshot()
    }

    fn create_device(
        &self,
        callback: FillCallback,
        target: DeviceTarget,
        channels: usize,
        sample_rate: u32,
        block_size: usize,
        latency: LatencySpec,
    ) -> Result<Box<dyn OutputDevice>> {
        let (device_id, descriptor) = match target {
            DeviceTarget::Default => (WAVE_MAPPER, self.cache.default_device()),
            DeviceTarget::Index(index) => {
                let descriptor = self.cache.get(index).ok_or(DeviceError::NotFound(index))?;
                (descriptor.index as u32, descriptor)
            }
        };
        let mix_ahead = mix_ahead_for_latency(block_size, sample_rate, latency.start);
        let (queue, out_channels, wake_rx) = WinmmQueue::open(
            device_id,
            channels,
            descriptor.max_channels,
            descriptor.sample_rate,
            block_size,
            mix_ahead + 1,
        )?;
        tracing::info!(
            device = %descriptor.name,
            out_channels,
            sample_rate = descriptor.sample_rate,
            mix_ahead,
            "opened winmm output device"
        );
        let converter = SampleFormatConverter::new(
            callback,
            channels,
            sample_rate,
            out_channels,
            descriptor.sample_rate,
        );
        let device = BufferedOutput::new(
            queue,
            converter,
            block_size,
            out_channels,
            descriptor.sample_rate,
            wake_rx,
        )?;
        Ok(Box::new(device))
    }
}
