//! Microphone capture for live transcription
//!
//! Records mono audio from the default input device, accumulates samples
//! into fixed-size frames, and pushes each frame onto the provided channel
//! as base64 s16le PCM. Frames are fire-and-forget: if the channel is full
//! or closed the frame is dropped and capture keeps running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::config::AudioConfig;
use crate::error::{KaviraError, Result};

/// cpal streams are not Send, but we only ever touch the stream from the
/// thread that holds the lock. Dropping it from another thread is safe.
struct SendStream(cpal::Stream);

unsafe impl Send for SendStream {}
unsafe impl Sync for SendStream {}

/// Handle to the microphone capture stream
pub struct AudioCapture {
    stream: Mutex<Option<SendStream>>,
    recording: Arc<AtomicBool>,
    buffer: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
}

impl AudioCapture {
    pub fn new() -> Self {
        Self {
            stream: Mutex::new(None),
            recording: Arc::new(AtomicBool::new(false)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            sample_rate: 16_000,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Start capturing from the default input device
    ///
    /// Each completed frame of `config.frame_samples` samples is encoded
    /// and sent over `frames`. Returns an error if already recording or if
    /// no input device is available.
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::Audio` when the device cannot be opened
    pub fn start(&mut self, config: &AudioConfig, frames: mpsc::Sender<String>) -> Result<()> {
        if self.recording.swap(true, Ordering::SeqCst) {
            return Err(KaviraError::Audio("Already recording".to_string()).into());
        }

        self.sample_rate = config.capture_sample_rate;
        self.buffer.lock().clear();

        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            self.recording.store(false, Ordering::SeqCst);
            KaviraError::Audio("No input device available".to_string())
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "unknown".to_string());
        tracing::info!("Recording from input device: {}", device_name);

        let stream_config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(config.capture_sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let frame_samples = config.frame_samples;
        let buffer = Arc::clone(&self.buffer);
        let mut pending: Vec<f32> = Vec::with_capacity(frame_samples * 2);

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    buffer.lock().extend_from_slice(data);
                    pending.extend_from_slice(data);
                    while pending.len() >= frame_samples {
                        let frame: Vec<f32> = pending.drain(..frame_samples).collect();
                        let encoded = super::frame_to_base64(&frame);
                        // Drop the frame if the channel is full or gone
                        let _ = frames.try_send(encoded);
                    }
                },
                |err| {
                    tracing::warn!("Input stream error: {}", err);
                },
                None,
            )
            .map_err(|e| {
                self.recording.store(false, Ordering::SeqCst);
                KaviraError::Audio(format!("Failed to open input stream: {}", e))
            })?;

        stream
            .play()
            .map_err(|e| {
                self.recording.store(false, Ordering::SeqCst);
                KaviraError::Audio(format!("Failed to start input stream: {}", e))
            })?;

        *self.stream.lock() = Some(SendStream(stream));
        Ok(())
    }

    /// Stop capturing
    ///
    /// Safe to call when not recording. A partial trailing frame is
    /// discarded; the retained sample buffer stays available for
    /// [`take_wav_bytes`](Self::take_wav_bytes).
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.lock().take() {
            drop(stream);
            tracing::info!("Recording stopped");
        }
        self.recording.store(false, Ordering::SeqCst);
    }

    /// Drain everything captured since `start` as a WAV file
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::Audio` when encoding fails
    pub fn take_wav_bytes(&self) -> Result<Vec<u8>> {
        let samples = std::mem::take(&mut *self.buffer.lock());
        super::wav_bytes(&samples, self.sample_rate)
    }
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
