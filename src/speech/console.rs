//! Text console speech adapter
//!
//! Utterances are printed, user turns are read one line at a time. Useful
//! headless and in tests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use super::{Hearing, RecognitionResult, SpeechAdapter, SpeechView};
use crate::{Error, Result};

/// Speech adapter over a line reader and a writer
pub struct ConsoleSpeech<R, W> {
    lines: Lines<R>,
    out: W,
    no_input_timeout: Duration,
    view: SpeechView,
}

impl ConsoleSpeech<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Adapter over the process's stdin and stdout
    #[must_use]
    pub fn stdio(no_input_timeout: Duration) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), no_input_timeout)
    }
}

impl<R, W> ConsoleSpeech<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    #[must_use]
    pub fn new(input: R, out: W, no_input_timeout: Duration) -> Self {
        Self {
            lines: input.lines(),
            out,
            no_input_timeout,
            view: SpeechView::NotReady,
        }
    }

    /// The writer utterances are printed to
    pub const fn output(&self) -> &W {
        &self.out
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.out.write_all(line.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl<R, W> SpeechAdapter for ConsoleSpeech<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn prepare(&mut self) -> Result<()> {
        self.view = SpeechView::Idle;
        Ok(())
    }

    async fn listen(&mut self) -> Result<Hearing> {
        self.view = SpeechView::Recognising;
        let read = tokio::time::timeout(self.no_input_timeout, self.lines.next_line()).await;
        self.view = SpeechView::Idle;

        match read {
            Err(_) => {
                tracing::debug!("no console input before timeout");
                Ok(Hearing::NoInput)
            }
            Ok(Ok(Some(line))) => {
                let text = line.trim();
                if text.is_empty() {
                    Ok(Hearing::NoInput)
                } else {
                    Ok(Hearing::Recognized(vec![RecognitionResult::new(text)]))
                }
            }
            Ok(Ok(None)) => Err(Error::Speech("console input closed".to_string())),
            Ok(Err(e)) => Err(e.into()),
        }
    }

    async fn speak(&mut self, utterance: &str) -> Result<()> {
        self.view = SpeechView::Speaking;
        let written = self.write_line(utterance).await;
        self.view = SpeechView::Idle;
        written
    }

    fn view(&self) -> SpeechView {
        self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console(input: &'static str) -> ConsoleSpeech<&'static [u8], Vec<u8>> {
        ConsoleSpeech::new(input.as_bytes(), Vec::new(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_reads_one_line_per_listen() {
        let mut speech = console("hello\n\n  how are you  \n");
        speech.prepare().await.unwrap();
        assert_eq!(speech.view(), SpeechView::Idle);

        assert_eq!(
            speech.listen().await.unwrap(),
            Hearing::Recognized(vec![RecognitionResult::new("hello")])
        );
        assert_eq!(speech.listen().await.unwrap(), Hearing::NoInput);
        assert_eq!(
            speech.listen().await.unwrap(),
            Hearing::Recognized(vec![RecognitionResult::new("how are you")])
        );
    }

    #[tokio::test]
    async fn test_eof_is_an_error() {
        let mut speech = console("");
        let err = speech.listen().await.unwrap_err();
        assert!(matches!(err, Error::Speech(_)));
    }

    #[tokio::test]
    async fn test_speak_prints_utterance() {
        let mut speech = console("");
        speech.speak("Hello! The models are mistral").await.unwrap();
        speech.speak("I can't hear you!").await.unwrap();
        assert_eq!(
            String::from_utf8_lossy(speech.output()),
            "Hello! The models are mistral\nI can't hear you!\n"
        );
        assert_eq!(speech.view(), SpeechView::Idle);
    }

    #[tokio::test]
    async fn test_silence_times_out_as_no_input() {
        let (reader, _writer) = tokio::io::duplex(64);
        let mut speech = ConsoleSpeech::new(
            BufReader::new(reader),
            Vec::new(),
            Duration::from_millis(20),
        );
        assert_eq!(speech.listen().await.unwrap(), Hearing::NoInput);
    }
}
