//! Microphone capture via cpal.
//!
//! cpal delivers samples on its own callback thread. They are down-mixed to
//! mono (first channel), converted to `i16` and pushed into a small bounded
//! queue; when the queue is full the oldest samples are dropped so the
//! display never lags far behind the input. `read_block` hands out fixed-size
//! blocks and pads short reads with silence instead of failing.

use crate::config::VisualizerConfig;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use std::collections::VecDeque;
use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Queue capacity in blocks
const QUEUE_BLOCKS: usize = 2;

/// Source of fixed-size mono sample blocks
pub trait Capture {
    fn sample_rate(&self) -> u32;

    /// Return exactly `n` samples, waiting at most about one block duration.
    ///
    /// Overflow and short reads are not errors; missing samples are zero.
    fn read_block(&mut self, n: usize) -> Result<Vec<i16>>;
}

struct Queue {
    samples: VecDeque<i16>,
    capacity: usize,
    error: Option<cpal::StreamError>,
    last_data: Instant,
    dropped: u64,
}

impl Queue {
    fn push(&mut self, sample: i16) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
            self.dropped += 1;
        }
        self.samples.push_back(sample);
    }
}

/// Queue shared between the cpal callback and the render loop
struct Shared {
    queue: Mutex<Queue>,
    ready: Condvar,
}

impl Shared {
    fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(Queue {
                samples: VecDeque::with_capacity(capacity),
                capacity,
                error: None,
                last_data: Instant::now(),
                dropped: 0,
            }),
            ready: Condvar::new(),
        }
    }

    /// A panicking callback leaves the queue itself intact, so keep using it
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_frames<T>(&self, data: &[T], channels: usize)
    where
        T: Sample,
        i16: FromSample<T>,
    {
        if data.is_empty() {
            return;
        }
        let mut queue = self.lock();
        for frame in data.chunks(channels) {
            queue.push(i16::from_sample(frame[0]));
        }
        queue.last_data = Instant::now();
        drop(queue);
        self.ready.notify_one();
    }

    fn fail(&self, err: cpal::StreamError) {
        tracing::error!("audio stream error: {}", err);
        self.lock().error = Some(err);
        self.ready.notify_one();
    }

    /// Wait until `n` samples are queued, an error arrives, or `wait` passes,
    /// then take up to `n` samples.
    fn take_block(&self, n: usize, wait: Duration, stall: Option<Duration>) -> Result<Vec<i16>> {
        let deadline = Instant::now() + wait;
        let mut queue = self.lock();
        loop {
            if let Some(err) = queue.error.take() {
                return Err(Error::Stream(err));
            }
            let now = Instant::now();
            if queue.samples.len() >= n || now >= deadline {
                break;
            }
            queue = self
                .ready
                .wait_timeout(queue, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        if let Some(limit) = stall {
            if queue.last_data.elapsed() > limit {
                return Err(Error::CaptureStalled(limit));
            }
        }

        if queue.dropped > 0 {
            tracing::trace!("capture overflow: dropped {} samples", queue.dropped);
            queue.dropped = 0;
        }

        let available = queue.samples.len().min(n);
        let mut block: Vec<i16> = queue.samples.drain(..available).collect();
        drop(queue);

        if available < n {
            tracing::trace!("short read: {} of {} samples", available, n);
            block.resize(n, 0);
        }
        Ok(block)
    }
}

/// Redirects stderr to /dev/null while alive.
///
/// ALSA prints device-probe noise on stderr, which would land on top of the
/// visualizer. Restores the original stderr on drop.
struct StderrGuard {
    saved_fd: i32,
    _dev_null: File,
}

impl StderrGuard {
    fn new() -> Option<Self> {
        let dev_null = File::open("/dev/null").ok()?;

        let saved_fd = unsafe { libc::dup(2) };
        if saved_fd < 0 {
            return None;
        }
        if unsafe { libc::dup2(dev_null.as_raw_fd(), 2) } < 0 {
            unsafe { libc::close(saved_fd) };
            return None;
        }

        Some(Self { saved_fd, _dev_null: dev_null })
    }
}

impl Drop for StderrGuard {
    fn drop(&mut self) {
        unsafe {
            libc::dup2(self.saved_fd, 2);
            libc::close(self.saved_fd);
        }
    }
}

/// Input device names, default device first
pub fn list_devices() -> Result<Vec<String>> {
    let _quiet = StderrGuard::new();
    let host = cpal::default_host();
    let default = host.default_input_device().and_then(|d| d.name().ok());

    let mut names: Vec<String> = host
        .input_devices()?
        .filter_map(|d| d.name().ok())
        .collect();
    if let Some(default) = default {
        if let Some(pos) = names.iter().position(|n| *n == default) {
            let name = names.remove(pos);
            names.insert(0, name);
        }
    }
    Ok(names)
}

/// Live microphone capture
pub struct CpalCapture {
    // Dropping the stream stops the callback
    _stream: cpal::Stream,
    shared: Arc<Shared>,
    sample_rate: u32,
    block_duration: Duration,
    stall_timeout: Option<Duration>,
}

impl CpalCapture {
    /// Open the configured (or default) input device and start streaming.
    pub fn open(config: &VisualizerConfig) -> Result<Self> {
        let quiet = StderrGuard::new();

        let host = cpal::default_host();
        tracing::debug!("audio host: {:?}", host.id());

        let device = match config.device {
            Some(ref wanted) => host
                .input_devices()?
                .find(|d| d.name().map(|n| n == *wanted).unwrap_or(false))
                .ok_or_else(|| Error::DeviceNotFound(wanted.clone()))?,
            None => host.default_input_device().ok_or(Error::NoInputDevice)?,
        };
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported = preferred_config(&device, config.sample_rate)?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let format = supported.sample_format();
        tracing::info!(
            "capturing from {}: {} Hz, {} channel(s), {:?}",
            device_name,
            sample_rate,
            channels,
            format
        );
        if channels == 0 {
            return Err(Error::InvalidConfig("audio device reported 0 channels".into()));
        }

        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = Arc::new(Shared::new(config.block_size * QUEUE_BLOCKS));
        let stream = match format {
            SampleFormat::I8 => build_stream::<i8>(&device, &stream_config, &shared)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, &shared)?,
            SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, &shared)?,
            SampleFormat::U8 => build_stream::<u8>(&device, &stream_config, &shared)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, &shared)?,
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, &shared)?,
            SampleFormat::F64 => build_stream::<f64>(&device, &stream_config, &shared)?,
            other => return Err(Error::UnsupportedSampleFormat(other)),
        };
        stream.play()?;
        drop(quiet);

        Ok(Self {
            _stream: stream,
            shared,
            sample_rate,
            block_duration: Duration::from_secs_f64(config.block_size as f64 / sample_rate as f64),
            stall_timeout: config.stall_timeout(),
        })
    }
}

impl Capture for CpalCapture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_block(&mut self, n: usize) -> Result<Vec<i16>> {
        self.shared.take_block(n, self.block_duration, self.stall_timeout)
    }
}

/// Prefer a config at the requested rate (mono if possible), else the device default.
fn preferred_config(device: &cpal::Device, rate: u32) -> Result<cpal::SupportedStreamConfig> {
    let wanted = cpal::SampleRate(rate);
    let mut ranges: Vec<_> = device
        .supported_input_configs()?
        .filter(|r| r.min_sample_rate() <= wanted && wanted <= r.max_sample_rate())
        .collect();
    ranges.sort_by_key(|r| r.channels());

    match ranges.into_iter().next() {
        Some(range) => Ok(range.with_sample_rate(wanted)),
        None => {
            tracing::debug!("{} Hz not supported, using device default", rate);
            Ok(device.default_input_config()?)
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: &Arc<Shared>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let channels = config.channels as usize;
    let data_shared = Arc::clone(shared);
    let err_shared = Arc::clone(shared);

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| data_shared.push_frames(data, channels),
        move |err| err_shared.fail(err),
        None,
    )?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn full_block_is_returned_in_order() {
        let shared = Shared::new(8);
        shared.push_frames(&[1i16, 2, 3, 4, 5], 1);
        let block = shared.take_block(4, Duration::from_millis(10), None).unwrap();
        assert_eq!(block, vec![1, 2, 3, 4]);
    }

    #[test]
    fn short_read_is_zero_padded() {
        let shared = Shared::new(8);
        shared.push_frames(&[7i16, 8], 1);
        let block = shared.take_block(4, Duration::from_millis(5), None).unwrap();
        assert_eq!(block, vec![7, 8, 0, 0]);
    }

    #[test]
    fn overflow_drops_oldest() {
        let shared = Shared::new(4);
        shared.push_frames(&[1i16, 2, 3, 4, 5, 6], 1);
        let block = shared.take_block(4, Duration::ZERO, None).unwrap();
        assert_eq!(block, vec![3, 4, 5, 6]);
    }

    #[test]
    fn multichannel_keeps_first_channel() {
        let shared = Shared::new(8);
        shared.push_frames(&[10i16, -10, 20, -20, 30, -30], 2);
        let block = shared.take_block(3, Duration::ZERO, None).unwrap();
        assert_eq!(block, vec![10, 20, 30]);
    }

    #[test]
    fn float_samples_are_converted() {
        let shared = Shared::new(8);
        shared.push_frames(&[0.0f32, 1.0, -1.0], 1);
        let block = shared.take_block(3, Duration::ZERO, None).unwrap();
        assert_eq!(block[0], 0);
        assert_eq!(block[1], i16::MAX);
        assert!(block[2] <= -32767);
    }

    #[test]
    fn stream_error_is_fatal() {
        let shared = Shared::new(8);
        shared.fail(cpal::StreamError::DeviceNotAvailable);
        let result = shared.take_block(4, Duration::from_millis(5), None);
        assert!(matches!(result, Err(Error::Stream(_))));
    }

    #[test]
    fn stall_timeout_reports_silence_from_device() {
        let shared = Shared::new(8);
        thread::sleep(Duration::from_millis(20));
        let result = shared.take_block(4, Duration::ZERO, Some(Duration::from_millis(5)));
        assert!(matches!(result, Err(Error::CaptureStalled(_))));
    }

    #[test]
    fn waits_for_samples_from_another_thread() {
        let shared = Arc::new(Shared::new(16));
        let producer = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.push_frames(&[5i16; 4], 1);
        });
        let block = shared.take_block(4, Duration::from_secs(2), None).unwrap();
        handle.join().unwrap();
        assert_eq!(block, vec![5; 4]);
    }
}
