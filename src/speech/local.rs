//! Microphone and speaker speech adapter

use std::time::Duration;

use async_trait::async_trait;

use super::capture::{Microphone, SAMPLE_RATE, samples_to_wav};
use super::endpoint::UtteranceDetector;
use super::playback::AudioPlayback;
use super::stt::SpeechToText;
use super::tts::TextToSpeech;
use super::{Hearing, RecognitionResult, SpeechAdapter, SpeechView};
use crate::{Error, Result};
use crate::config::{DEFAULT_SPEECH_URL, SpeechConfig};

/// How much audio is gathered between endpoint checks
const CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Speech adapter backed by the default audio devices and an
/// OpenAI-compatible STT/TTS API
pub struct LocalSpeech {
    microphone: Option<Microphone>,
    playback: Option<AudioPlayback>,
    detector: UtteranceDetector,
    stt: SpeechToText,
    tts: TextToSpeech,
    view: SpeechView,
}

impl LocalSpeech {
    /// Build the adapter; audio devices are opened by [`SpeechAdapter::prepare`]
    #[must_use]
    pub fn new(config: &SpeechConfig) -> Self {
        if config.api_key.is_none() && config.api_url == DEFAULT_SPEECH_URL {
            tracing::warn!("no speech API key set, transcription and synthesis will be rejected");
        }

        Self {
            microphone: None,
            playback: None,
            detector: UtteranceDetector::new(config.no_input_timeout, config.complete_timeout),
            stt: SpeechToText::from_config(config),
            tts: TextToSpeech::from_config(config),
            view: SpeechView::NotReady,
        }
    }
}

/// Shows a busy view until dropped, then returns to idle
///
/// Dropping covers a listen or speak that is cancelled by its timeout.
struct ViewGuard<'a> {
    view: &'a mut SpeechView,
}

impl<'a> ViewGuard<'a> {
    fn enter(view: &'a mut SpeechView, busy: SpeechView) -> Self {
        *view = busy;
        Self { view }
    }
}

impl Drop for ViewGuard<'_> {
    fn drop(&mut self) {
        *self.view = SpeechView::Idle;
    }
}

#[async_trait(?Send)]
impl SpeechAdapter for LocalSpeech {
    async fn prepare(&mut self) -> Result<()> {
        if self.microphone.is_none() {
            self.microphone = Some(Microphone::open()?);
        }
        if self.playback.is_none() {
            self.playback = Some(AudioPlayback::new()?);
        }
        self.view = SpeechView::Idle;
        tracing::info!("audio devices ready");
        Ok(())
    }

    async fn listen(&mut self) -> Result<Hearing> {
        let Some(microphone) = self.microphone.as_mut() else {
            return Err(Error::Speech("listen before prepare".to_string()));
        };

        let _recognising = ViewGuard::enter(&mut self.view, SpeechView::Recognising);
        self.detector.reset();
        let Some(samples) = microphone.utterance(&mut self.detector, CHUNK_INTERVAL).await? else {
            return Ok(Hearing::NoInput);
        };

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        let text = self.stt.transcribe(&wav).await?;
        let text = text.trim();

        if text.is_empty() {
            tracing::debug!("empty transcription, treating as no input");
            return Ok(Hearing::NoInput);
        }

        Ok(Hearing::Recognized(vec![RecognitionResult::new(text)]))
    }

    async fn speak(&mut self, utterance: &str) -> Result<()> {
        let Some(playback) = self.playback.as_ref() else {
            return Err(Error::Speech("speak before prepare".to_string()));
        };

        if utterance.trim().is_empty() {
            return Ok(());
        }

        let _speaking = ViewGuard::enter(&mut self.view, SpeechView::Speaking);
        let audio = self.tts.synthesize(utterance).await?;
        playback.play_mp3(&audio).await
    }

    fn view(&self) -> SpeechView {
        self.view
    }
}
