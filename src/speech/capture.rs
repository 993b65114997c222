//! Microphone input
//!
//! A [`Microphone`] holds the opened input device. Audio only flows while a
//! [`Recording`] borrowed from it is alive, so a listen that is abandoned part
//! way through releases the input stream along with it.

use std::fmt::Display;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use hound::{SampleFormat, WavSpec, WavWriter};

use super::endpoint::{Endpoint, UtteranceDetector};
use crate::{Error, Result};

/// Capture rate expected by the endpointing and transcription steps
pub const SAMPLE_RATE: u32 = 16000;

/// Default input device configured for 16 kHz mono
pub struct Microphone {
    device: Device,
    config: StreamConfig,
    pending: Arc<Mutex<Vec<f32>>>,
}

impl Microphone {
    /// Open the default input device
    ///
    /// # Errors
    ///
    /// Returns error if there is no input device or it cannot record 16 kHz mono
    pub fn open() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let rate = SampleRate(SAMPLE_RATE);
        let config = device
            .supported_input_configs()
            .map_err(audio_error)?
            .find(|range| {
                range.channels() == 1
                    && range.min_sample_rate() <= rate
                    && range.max_sample_rate() >= rate
            })
            .map(|range| range.with_sample_rate(rate).config())
            .ok_or_else(|| Error::Audio("input device cannot record 16 kHz mono".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "microphone opened"
        );

        Ok(Self {
            device,
            config,
            pending: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Start streaming from the device
    ///
    /// Samples left over from an earlier recording are discarded.
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn record(&mut self) -> Result<Recording<'_>> {
        if let Ok(mut pending) = self.pending.lock() {
            pending.clear();
        }

        let sink = Arc::clone(&self.pending);
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut pending) = sink.lock() {
                        pending.extend_from_slice(data);
                    }
                },
                |err| tracing::error!(error = %err, "microphone stream error"),
                None,
            )
            .map_err(audio_error)?;
        stream.play().map_err(audio_error)?;

        tracing::debug!("recording");
        Ok(Recording {
            _stream: stream,
            pending: &self.pending,
        })
    }

    /// Record one turn, feeding `detector` every `interval`
    ///
    /// Returns the utterance, or `None` when the detector reports no input.
    /// The input stream is closed when this returns or is dropped.
    ///
    /// # Errors
    ///
    /// Returns error if recording cannot start
    pub async fn utterance(
        &mut self,
        detector: &mut UtteranceDetector,
        interval: Duration,
    ) -> Result<Option<Vec<f32>>> {
        let mut recording = self.record()?;
        loop {
            let chunk = recording.next_chunk(interval).await;
            match detector.process(&chunk) {
                Endpoint::Pending => {}
                Endpoint::NoInput => return Ok(None),
                Endpoint::Complete => return Ok(Some(detector.take_speech_buffer())),
            }
        }
    }
}

/// A live input stream; dropping it stops the device
pub struct Recording<'a> {
    _stream: Stream,
    pending: &'a Mutex<Vec<f32>>,
}

impl Recording<'_> {
    /// Wait `interval`, then take everything captured since the last chunk
    pub async fn next_chunk(&mut self, interval: Duration) -> Vec<f32> {
        tokio::time::sleep(interval).await;
        self.pending
            .lock()
            .map(|mut pending| std::mem::take(&mut *pending))
            .unwrap_or_default()
    }
}

impl Drop for Recording<'_> {
    fn drop(&mut self) {
        tracing::debug!("recording stopped");
    }
}

/// Encode mono samples in `[-1, 1]` as a 16-bit PCM WAV file
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut wav = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = WavWriter::new(&mut wav, spec).map_err(audio_error)?;
    for &sample in samples {
        writer.write_sample(to_pcm16(sample)).map_err(audio_error)?;
    }
    writer.finalize().map_err(audio_error)?;

    Ok(wav.into_inner())
}

#[allow(clippy::cast_possible_truncation)]
fn to_pcm16(sample: f32) -> i16 {
    (sample * f32::from(i16::MAX)).clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

fn audio_error(e: impl Display) -> Error {
    Error::Audio(e.to_string())
}
