//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches the backend's MP3 output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// How often the wait loop checks for completion or cancellation
const POLL_STEP: Duration = Duration::from_millis(50);

/// Plays decoded announcement audio
///
/// `cancel` is polled during playback; setting it stops the clip mid-stream.
/// Implementations block the calling thread; run them on a blocking task.
pub trait AudioSink: Send + Sync {
    /// Decode MP3 bytes and play them to completion or cancellation
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    fn play_mp3(&self, mp3_data: &[u8], cancel: &AtomicBool) -> Result<()>;
}

/// Plays audio on the default cpal output device
pub struct CpalSink {
    config: StreamConfig,
}

impl CpalSink {
    /// Probe the default output device and pick a playback config
    ///
    /// # Errors
    ///
    /// Returns error if no suitable audio device is available
    pub fn new() -> Result<Self> {
        let device = default_device()?;
        let config = output_config(&device)?;
        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio output ready"
        );
        Ok(Self { config })
    }

    /// Play raw f32 samples, honoring `cancel` mid-clip
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be opened or started
    pub fn play_samples(&self, samples: Vec<f32>, cancel: &AtomicBool) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        // The device handle is not Sync; re-open per clip
        let device = default_device()?;

        let channels = usize::from(self.config.channels);
        let total = samples.len();
        let samples = Arc::new(samples);
        let cursor = Arc::new(AtomicUsize::new(0));

        let feed_samples = Arc::clone(&samples);
        let feed_cursor = Arc::clone(&cursor);
        let stream = device
            .build_output_stream(
                &self.config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = out.len() / channels;
                    let start = feed_cursor.fetch_add(frames, Ordering::AcqRel);
                    for (i, frame) in out.chunks_mut(channels).enumerate() {
                        // Past the end the device keeps running on silence
                        let sample = feed_samples.get(start + i).copied().unwrap_or(0.0);
                        frame.fill(sample);
                    }
                },
                |err| tracing::error!(error = %err, "audio output error"),
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;
        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        // Wait out the clip; the deadline backstops a stalled device
        let clip = Duration::from_millis(total as u64 * 1000 / u64::from(PLAYBACK_SAMPLE_RATE));
        let deadline = Instant::now() + clip + Duration::from_millis(500);
        while cursor.load(Ordering::Acquire) < total {
            if cancel.load(Ordering::Relaxed) {
                tracing::debug!("playback cancelled");
                return Ok(());
            }
            if Instant::now() > deadline {
                tracing::warn!(samples = total, "playback deadline passed, giving up on clip");
                break;
            }
            std::thread::sleep(POLL_STEP);
        }

        // Let the device drain its last buffer before the stream drops
        std::thread::sleep(Duration::from_millis(100));
        Ok(())
    }
}

impl AudioSink for CpalSink {
    fn play_mp3(&self, mp3_data: &[u8], cancel: &AtomicBool) -> Result<()> {
        let samples = decode_mp3(mp3_data)?;
        self.play_samples(samples, cancel)
    }
}

fn default_device() -> Result<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))
}

/// Pick a mono config at the playback rate, or stereo when mono is missing
fn output_config(device: &cpal::Device) -> Result<StreamConfig> {
    let rate = SampleRate(PLAYBACK_SAMPLE_RATE);
    let mut candidates: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .filter(|c| c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
        .collect();
    candidates.sort_by_key(cpal::SupportedStreamConfigRange::channels);

    let supported = candidates
        .into_iter()
        .find(|c| (1..=2).contains(&c.channels()))
        .ok_or_else(|| Error::Audio(format!("no output config at {PLAYBACK_SAMPLE_RATE} Hz")))?;
    Ok(supported.with_sample_rate(rate).config())
}

/// Sine samples at [`PLAYBACK_SAMPLE_RATE`]; used by the speaker self-test
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sine_tone(frequency: f32, seconds: f32, amplitude: f32) -> Vec<f32> {
    let step = frequency * 2.0 * std::f32::consts::PI / PLAYBACK_SAMPLE_RATE as f32;
    let count = (PLAYBACK_SAMPLE_RATE as f32 * seconds) as usize;
    (0..count).map(|i| (step * i as f32).sin() * amplitude).collect()
}

/// Decode MP3 bytes to mono f32 samples; stereo input is downmixed
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        let frame = match decoder.next_frame() {
            Ok(frame) => frame,
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("mp3 decode: {e}"))),
        };
        if frame.channels == 2 {
            samples.extend(frame.data.chunks_exact(2).map(|pair| {
                f32::midpoint(f32::from(pair[0]), f32::from(pair[1])) / 32768.0
            }));
        } else {
            samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
        }
    }

    Ok(samples)
}
