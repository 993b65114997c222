//! Utterance endpointing
//!
//! Decides when a listen is over from the energy of incoming audio: no speech
//! before the no-input timeout, trailing silence after speech, or the maximum
//! utterance length.

use std::time::Duration;

use super::capture::SAMPLE_RATE;

/// RMS energy above which a chunk counts as speech
pub const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to count as an utterance (0.3 s at 16 kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence used when no completion timeout is configured
pub const DEFAULT_COMPLETE_TIMEOUT: Duration = Duration::from_millis(500);

/// Longest utterance kept before forcing completion
pub const MAX_UTTERANCE: Duration = Duration::from_secs(30);

/// Verdict after a chunk of audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Keep listening
    Pending,
    /// Nothing was said before the no-input timeout
    NoInput,
    /// An utterance was captured; take it with [`UtteranceDetector::take_speech_buffer`]
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Waiting,
    Speaking,
}

/// Energy-based end-of-utterance detector
pub struct UtteranceDetector {
    phase: Phase,
    speech_buffer: Vec<f32>,
    waited: usize,
    silence_counter: usize,
    no_input_samples: usize,
    complete_samples: usize,
    max_samples: usize,
}

impl UtteranceDetector {
    /// Create a detector for 16 kHz mono audio
    ///
    /// A zero `complete_timeout` selects [`DEFAULT_COMPLETE_TIMEOUT`].
    #[must_use]
    pub fn new(no_input_timeout: Duration, complete_timeout: Duration) -> Self {
        let complete_timeout = if complete_timeout.is_zero() {
            DEFAULT_COMPLETE_TIMEOUT
        } else {
            complete_timeout
        };

        tracing::debug!(
            no_input_ms = no_input_timeout.as_millis(),
            complete_ms = complete_timeout.as_millis(),
            "utterance detector initialized"
        );

        Self {
            phase: Phase::Waiting,
            speech_buffer: Vec::new(),
            waited: 0,
            silence_counter: 0,
            no_input_samples: samples_for(no_input_timeout),
            complete_samples: samples_for(complete_timeout),
            max_samples: samples_for(MAX_UTTERANCE),
        }
    }

    /// Feed the next chunk of captured audio
    pub fn process(&mut self, samples: &[f32]) -> Endpoint {
        let energy = rms_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.phase {
            Phase::Waiting => {
                if is_speech {
                    self.phase = Phase::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected");
                } else {
                    self.waited += samples.len();
                    if self.waited >= self.no_input_samples {
                        tracing::debug!(waited = self.waited, "no input");
                        return Endpoint::NoInput;
                    }
                }
            }
            Phase::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                tracing::trace!(
                    buffer_len = self.speech_buffer.len(),
                    silence = self.silence_counter,
                    is_speech,
                    energy,
                    "speaking"
                );

                if self.speech_buffer.len() >= self.max_samples {
                    tracing::debug!(samples = self.speech_buffer.len(), "utterance hit maximum length");
                    return Endpoint::Complete;
                }

                if self.silence_counter >= self.complete_samples {
                    if self.speech_buffer.len() > MIN_SPEECH_SAMPLES + self.silence_counter {
                        tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                        return Endpoint::Complete;
                    }

                    // Too short to be speech, keep waiting
                    tracing::trace!("noise burst discarded");
                    self.waited += self.speech_buffer.len();
                    self.speech_buffer.clear();
                    self.silence_counter = 0;
                    self.phase = Phase::Waiting;
                    if self.waited >= self.no_input_samples {
                        return Endpoint::NoInput;
                    }
                }
            }
        }

        Endpoint::Pending
    }

    /// Take the captured utterance, clearing it
    pub fn take_speech_buffer(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.speech_buffer)
    }

    /// Whether speech has started in the current listen
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.phase == Phase::Speaking
    }

    /// Reset for a new listen
    pub fn reset(&mut self) {
        self.phase = Phase::Waiting;
        self.speech_buffer.clear();
        self.waited = 0;
        self.silence_counter = 0;
    }
}

#[allow(clippy::cast_possible_truncation)]
fn samples_for(duration: Duration) -> usize {
    (duration.as_millis() * u128::from(SAMPLE_RATE) / 1000) as usize
}

/// Root-mean-square energy of a chunk of samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
