//! Buffered output driver
//!
//! Generic over the platform queue: owns the slot ring and the
//! dedicated mixing thread that keeps the hardware fed, and implements
//! the cooperative stop protocol shared by every backend.

use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::backend::PlatformQueue;
use crate::constants::WAKE_WAIT_MS;
use crate::convert::SampleFormatConverter;
use crate::device::{DeviceState, OutputDevice};
use crate::error::DeviceError;

const STATE_CONSTRUCTED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPING: u8 = 2;
const STATE_STOPPED: u8 = 3;

#[derive(Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Queued,
}

/// One open output stream over any [`PlatformQueue`].
///
/// The platform queue, the converter and the slot ring move into the
/// mixing thread at construction; the owning thread keeps only the
/// stop flag, the error channel and the join handle.
pub struct BufferedOutput {
    /// Stop flag: written once by the owning thread, polled by the
    /// mixing thread every loop iteration.
    running: Arc<AtomicBool>,
    /// Lifecycle state; only the owning thread writes it.
    state: AtomicU8,
    thread_handle: Option<JoinHandle<()>>,
    error_rx: Receiver<DeviceError>,
    channels: usize,
    sample_rate: u32,
}

impl BufferedOutput {
    /// Launch the mixing thread over an already-open platform queue.
    ///
    /// `wake_rx` is the completion signal paired with the sender the
    /// backend notifies from its completion callback.
    pub fn new<P: PlatformQueue>(
        queue: P,
        converter: SampleFormatConverter,
        block_size: usize,
        channels: usize,
        sample_rate: u32,
        wake_rx: Receiver<()>,
    ) -> Result<Self, DeviceError> {
        let running = Arc::new(AtomicBool::new(true));
        let state = AtomicU8::new(STATE_CONSTRUCTED);
        let (error_tx, error_rx) = bounded::<DeviceError>(4);

        let thread_running = running.clone();
        let handle = thread::Builder::new()
            .name("audio-out-mixer".to_string())
            .spawn(move || {
                mixer_loop(queue, converter, block_size, channels, thread_running, wake_rx, error_tx);
            })
            .map_err(|e| DeviceError::ThreadSpawn(e.to_string()))?;

        state.store(STATE_RUNNING, Ordering::Release);
        Ok(Self {
            running,
            state,
            thread_handle: Some(handle),
            error_rx,
            channels,
            sample_rate,
        })
    }
}

impl OutputDevice for BufferedOutput {
    fn stop(&mut self) {
        match self.state() {
            DeviceState::Stopping | DeviceState::Stopped => return,
            DeviceState::Constructed | DeviceState::Running => {}
        }
        tracing::info!("output device shutting down");
        self.state.store(STATE_STOPPING, Ordering::Release);
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        self.state.store(STATE_STOPPED, Ordering::Release);
    }

    fn state(&self) -> DeviceState {
        match self.state.load(Ordering::Acquire) {
            STATE_RUNNING => DeviceState::Running,
            STATE_STOPPING => DeviceState::Stopping,
            STATE_STOPPED => DeviceState::Stopped,
            _ => DeviceState::Constructed,
        }
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn take_error(&self) -> Option<DeviceError> {
        self.error_rx.try_recv().ok()
    }
}

impl Drop for BufferedOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The mixing thread body: scan for free slots, fill and submit each,
/// then block on a bounded wait for a completion signal so the stop
/// flag is polled at least every `WAKE_WAIT_MS` milliseconds.
fn mixer_loop<P: PlatformQueue>(
    mut queue: P,
    mut converter: SampleFormatConverter,
    block_size: usize,
    channels: usize,
    running: Arc<AtomicBool>,
    wake_rx: Receiver<()>,
    error_tx: crossbeam_channel::Sender<DeviceError>,
) {
    tracing::debug!("mixing thread started");
    let mut slots = vec![SlotState::Free; queue.slot_count()];
    let mut block = vec![0i16; block_size * channels];
    let mut fatal = false;

    while running.load(Ordering::Acquire) {
        loop {
            // Reconcile completions: queued slots the platform has
            // finished with become free again.
            for (slot, state) in slots.iter_mut().enumerate() {
                if *state == SlotState::Queued && queue.is_complete(slot) {
                    *state = SlotState::Free;
                }
            }
            let Some(slot) = slots.iter().position(|s| *s == SlotState::Free) else {
                break;
            };
            converter.write(block_size, &mut block);
            match queue.submit(slot, &block) {
                Ok(()) => slots[slot] = SlotState::Queued,
                Err(err) => {
                    tracing::error!("buffer submission failed: {err}");
                    let _ = error_tx.try_send(err);
                    fatal = true;
                    break;
                }
            }
        }
        if fatal {
            break;
        }
        let _ = wake_rx.recv_timeout(Duration::from_millis(WAKE_WAIT_MS));
    }

    // Drain: end playback, then wait for every queued slot before the
    // platform handle is released.
    queue.flush();
    for (slot, state) in slots.iter().enumerate() {
        if *state == SlotState::Queued {
            while !queue.is_complete(slot) {
                thread::yield_now();
            }
        }
    }
    drop(queue);
    tracing::debug!("mixing thread exiting normally");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Sender;
    use std::sync::Mutex;

    /// In-memory platform queue: a submitted slot "plays" for a fixed
    /// wall-clock duration before reporting complete, recording
    /// everything submitted.
    struct MockQueue {
        slots: usize,
        playback: Duration,
        queued_at: Arc<Mutex<Vec<Option<std::time::Instant>>>>,
        submitted: Arc<Mutex<Vec<(usize, Vec<i16>)>>>,
        wake_tx: Sender<()>,
        fail_after: Option<usize>,
        flushed: Arc<AtomicBool>,
    }

    impl MockQueue {
        fn new(slots: usize, wake_tx: Sender<()>) -> Self {
            Self {
                slots,
                playback: Duration::from_millis(2),
                queued_at: Arc::new(Mutex::new(vec![None; slots])),
                submitted: Arc::new(Mutex::new(Vec::new())),
                wake_tx,
                fail_after: None,
                flushed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl PlatformQueue for MockQueue {
        fn slot_count(&self) -> usize {
            self.slots
        }

        fn is_complete(&self, slot: usize) -> bool {
            match self.queued_at.lock().unwrap()[slot] {
                None => true,
                Some(at) => at.elapsed() >= self.playback,
            }
        }

        fn submit(&mut self, slot: usize, samples: &[i16]) -> Result<(), DeviceError> {
            let mut submitted = self.submitted.lock().unwrap();
            if let Some(limit) = self.fail_after {
                if submitted.len() >= limit {
                    return Err(DeviceError::SubmitFailed("mock failure".to_string()));
                }
            }
            submitted.push((slot, samples.to_vec()));
            self.queued_at.lock().unwrap()[slot] = Some(std::time::Instant::now());
            let _ = self.wake_tx.try_send(());
            Ok(())
        }

        fn flush(&mut self) {
            self.queued_at.lock().unwrap().fill(None);
            self.flushed.store(true, Ordering::Release);
        }
    }

    fn constant_converter(value: f32, channels: usize) -> SampleFormatConverter {
        SampleFormatConverter::new(
            Box::new(move |buffer: &mut [f32], _| buffer.fill(value)),
            channels,
            44100,
            channels,
            44100,
        )
    }

    fn spawn_device(queue: MockQueue, wake_rx: Receiver<()>) -> BufferedOutput {
        BufferedOutput::new(queue, constant_converter(0.5, 2), 64, 2, 44100, wake_rx)
            .expect("device starts")
    }

    #[test]
    fn test_device_submits_converted_blocks() {
        let (wake_tx, wake_rx) = bounded(8);
        let queue = MockQueue::new(3, wake_tx);
        let submitted = queue.submitted.clone();
        let mut device = spawn_device(queue, wake_rx);
        assert!(device.is_running());

        while submitted.lock().unwrap().len() < 6 {
            thread::sleep(Duration::from_millis(1));
        }
        device.stop();
        assert_eq!(device.state(), DeviceState::Stopped);

        let submitted = submitted.lock().unwrap();
        let expected = (0.5f32 * 32767.0) as i16;
        for (slot, samples) in submitted.iter() {
            assert!(*slot < 3);
            assert_eq!(samples.len(), 64 * 2);
            assert!(samples.iter().all(|&s| s == expected));
        }
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (wake_tx, wake_rx) = bounded(8);
        let queue = MockQueue::new(2, wake_tx);
        let flushed = queue.flushed.clone();
        let mut device = spawn_device(queue, wake_rx);
        device.stop();
        assert_eq!(device.state(), DeviceState::Stopped);
        assert!(flushed.load(Ordering::Acquire));
        device.stop();
        assert_eq!(device.state(), DeviceState::Stopped);
    }

    #[test]
    fn test_drop_without_stop_drains() {
        let (wake_tx, wake_rx) = bounded(8);
        let queue = MockQueue::new(2, wake_tx);
        let flushed = queue.flushed.clone();
        let submitted = queue.submitted.clone();
        {
            let _device = spawn_device(queue, wake_rx);
            while submitted.lock().unwrap().is_empty() {
                thread::sleep(Duration::from_millis(1));
            }
        }
        // Drop stopped the device; the queue was flushed before release.
        assert!(flushed.load(Ordering::Acquire));
    }

    #[test]
    fn test_submit_failure_is_surfaced_and_fatal() {
        let (wake_tx, wake_rx) = bounded(8);
        let mut queue = MockQueue::new(2, wake_tx);
        queue.fail_after = Some(3);
        let flushed = queue.flushed.clone();
        let mut device = spawn_device(queue, wake_rx);

        let error = loop {
            if let Some(err) = device.take_error() {
                break err;
            }
            thread::sleep(Duration::from_millis(1));
        };
        assert!(matches!(error, DeviceError::SubmitFailed(_)));
        // The thread exits on its own after a fatal error; stop still
        // joins it cleanly.
        device.stop();
        assert_eq!(device.state(), DeviceState::Stopped);
        assert!(flushed.load(Ordering::Acquire));
    }

    #[test]
    fn test_queued_slots_never_exceed_ring() {
        let (wake_tx, wake_rx) = bounded(8);
        let queue = MockQueue::new(3, wake_tx);
        let playback = queue.playback;
        let queued_at = queue.queued_at.clone();
        let submitted = queue.submitted.clone();
        let mut device = spawn_device(queue, wake_rx);
        while submitted.lock().unwrap().len() < 10 {
            let queued = queued_at
                .lock()
                .unwrap()
                .iter()
                .filter(|at| matches!(at, Some(t) if t.elapsed() < playback))
                .count();
            assert!(queued <= 3);
            thread::sleep(Duration::from_millis(1));
        }
        device.stop();
    }
}
