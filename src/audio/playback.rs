//! Text-to-speech playback
//!
//! Two engines share one speaker slot. The native engine shells out to the
//! platform synthesizer (`say` on macOS, `espeak` elsewhere); the Gemini
//! engine plays raw PCM returned by the speech model through the default
//! output device. Starting either one stops whatever was playing first, so
//! at most one utterance is ever audible.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tokio::process::Child;

use crate::error::{KaviraError, Result};

struct SendStream(cpal::Stream);

unsafe impl Send for SendStream {}
unsafe impl Sync for SendStream {}

enum ActiveUtterance {
    Child(Child),
    Stream {
        stream: SendStream,
        done: Arc<AtomicBool>,
    },
}

/// Single-slot speech output
pub struct Speaker {
    active: Mutex<Option<ActiveUtterance>>,
}

impl Speaker {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    /// Whether an utterance is still playing
    ///
    /// Reaps finished playback as a side effect: a native child that has
    /// exited or a PCM stream that has drained its samples clears the slot.
    pub fn is_speaking(&self) -> bool {
        let mut active = self.active.lock();
        let finished = match active.as_mut() {
            None => return false,
            Some(ActiveUtterance::Child(child)) => !matches!(child.try_wait(), Ok(None)),
            Some(ActiveUtterance::Stream { done, .. }) => done.load(Ordering::Relaxed),
        };
        if finished {
            *active = None;
        }
        !finished
    }

    /// Speak text through the platform synthesizer
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::Audio` when the synthesizer cannot be spawned
    pub fn speak_native(&self, text: &str) -> Result<()> {
        self.stop();

        let command = if cfg!(target_os = "macos") {
            "say"
        } else {
            "espeak"
        };

        let child = tokio::process::Command::new(command)
            .arg(text)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                KaviraError::Audio(format!("Failed to spawn {}: {}", command, e))
            })?;

        tracing::debug!("Speaking via {}", command);
        *self.active.lock() = Some(ActiveUtterance::Child(child));
        Ok(())
    }

    /// Play raw s16le mono PCM through the default output device
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::Audio` when no output device is available
    pub fn play_pcm(&self, pcm: &[u8], sample_rate: u32) -> Result<()> {
        self.stop();

        let samples = super::pcm_i16_bytes_to_f32(pcm);
        if samples.is_empty() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            KaviraError::Audio("No output device available".to_string())
        })?;

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let sample_count = samples.len();
        let done = Arc::new(AtomicBool::new(false));
        let done_flag = done.clone();
        let mut position = 0usize;
        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for slot in out.iter_mut() {
                        *slot = if position < samples.len() {
                            let s = samples[position];
                            position += 1;
                            s
                        } else {
                            0.0
                        };
                    }
                    if position >= samples.len() {
                        done_flag.store(true, Ordering::Relaxed);
                    }
                },
                |err| {
                    tracing::warn!("Output stream error: {}", err);
                },
                None,
            )
            .map_err(|e| KaviraError::Audio(format!("Failed to open output stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| KaviraError::Audio(format!("Failed to start output stream: {}", e)))?;

        tracing::debug!("Playing {} PCM samples at {} Hz", sample_count, sample_rate);
        *self.active.lock() = Some(ActiveUtterance::Stream {
            stream: SendStream(stream),
            done,
        });
        Ok(())
    }

    /// Stop whatever is playing
    ///
    /// Safe to call when idle.
    pub fn stop(&self) {
        if let Some(utterance) = self.active.lock().take() {
            match utterance {
                ActiveUtterance::Child(mut child) => {
                    let _ = child.start_kill();
                }
                ActiveUtterance::Stream { stream, .. } => {
                    drop(stream);
                }
            }
        }
    }
}

impl Default for Speaker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Speaker {
    fn drop(&mut self) {
        self.stop();
    }
}
