//! Streaming question ingestion.
//!
//! A [`QuestionSource`] hands out a fresh text stream per request. [`ingest`]
//! frames that text into question segments, validates each one, and forwards
//! accepted questions over a channel, finishing with exactly one
//! [`IngestEvent::Finished`] unless the receiving session is gone.

use futures_util::stream::{BoxStream, StreamExt};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tokio::sync::mpsc;

use crate::config::{Model, QuizSettings};
use crate::error::StreamError;
use crate::quiz::validate::decode_question;
use crate::quiz::Question;

/// Line the generator writes after every question object.
pub const QUESTION_DELIMITER: &str = "###END_OF_QUESTION_JSON###";

pub type TextStream = BoxStream<'static, Result<String, StreamError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub question_count: usize,
    pub model: Model,
    pub context: Option<String>,
}

pub trait QuestionSource {
    /// Opens an independent stream for `request`. Retrying means calling this again.
    fn open(&self, request: &GenerationRequest) -> TextStream;
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestEvent {
    Question(Question),
    /// Always the last event. `Some` when the stream failed.
    Finished(Option<StreamError>),
}

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub max_invalid_streak: usize,
    pub shuffle_options: bool,
}

impl From<&QuizSettings> for IngestOptions {
    fn from(settings: &QuizSettings) -> Self {
        Self {
            max_invalid_streak: settings.max_invalid_streak,
            shuffle_options: settings.shuffle_options,
        }
    }
}

/// Splits incoming text on [`QUESTION_DELIMITER`].
#[derive(Debug, Default)]
pub struct QuestionFramer {
    buffer: String,
}

impl QuestionFramer {
    /// Appends `chunk` and returns every segment completed by it.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut segments = Vec::new();
        while let Some(at) = self.buffer.find(QUESTION_DELIMITER) {
            let segment = self.buffer[..at].trim().to_string();
            self.buffer.drain(..at + QUESTION_DELIMITER.len());
            if !segment.is_empty() {
                segments.push(segment);
            }
        }
        segments
    }

    /// Whatever is left once the stream has ended.
    pub fn finish(self) -> Option<String> {
        let rest = self.buffer.trim();
        (!rest.is_empty()).then(|| rest.to_string())
    }
}

enum Flow {
    More,
    Enough,
    Closed,
    Failed(StreamError),
}

struct Ingestion {
    requested: usize,
    accepted: usize,
    seen: usize,
    invalid_streak: usize,
    options: IngestOptions,
    rng: StdRng,
    events: mpsc::Sender<IngestEvent>,
}

impl Ingestion {
    async fn offer(&mut self, segment: &str) -> Flow {
        self.seen += 1;
        match decode_question(segment, self.seen) {
            Ok(mut question) => {
                self.invalid_streak = 0;
                if self.options.shuffle_options {
                    question.answer_options.shuffle(&mut self.rng);
                }
                if self.events.send(IngestEvent::Question(question)).await.is_err() {
                    return Flow::Closed;
                }
                self.accepted += 1;
                if self.accepted >= self.requested {
                    Flow::Enough
                } else {
                    Flow::More
                }
            }
            Err(err) => {
                log::warn!("Dropping streamed question: {err}");
                self.invalid_streak += 1;
                if self.invalid_streak > self.options.max_invalid_streak {
                    Flow::Failed(StreamError::TooManyInvalid(self.invalid_streak))
                } else {
                    Flow::More
                }
            }
        }
    }
}

/// Reads `chunks` until `requested` questions were accepted, the stream ends,
/// or it fails. Meant to run as its own task.
pub async fn ingest(
    mut chunks: TextStream,
    requested: usize,
    options: IngestOptions,
    events: mpsc::Sender<IngestEvent>,
) {
    let mut ingestion = Ingestion {
        requested,
        accepted: 0,
        seen: 0,
        invalid_streak: 0,
        options,
        rng: StdRng::from_entropy(),
        events,
    };
    let mut framer = QuestionFramer::default();

    let flow = 'read: loop {
        match chunks.next().await {
            Some(Ok(chunk)) => {
                for segment in framer.push(&chunk) {
                    match ingestion.offer(&segment).await {
                        Flow::More => {}
                        stop => break 'read stop,
                    }
                }
            }
            Some(Err(err)) => break Flow::Failed(err),
            None => {
                break match std::mem::take(&mut framer).finish() {
                    Some(rest) => ingestion.offer(&rest).await,
                    None => Flow::More,
                }
            }
        }
    };

    let error = match flow {
        Flow::Closed => {
            log::debug!("Quiz session is gone, discarding the rest of the question stream");
            return;
        }
        Flow::Failed(err) => {
            log::error!(
                "Question stream failed after {} question(s): {err}",
                ingestion.accepted
            );
            Some(err)
        }
        Flow::More | Flow::Enough => {
            if ingestion.accepted < requested {
                log::warn!(
                    "Requested {requested} questions, but only {} were generated",
                    ingestion.accepted
                );
            }
            None
        }
    };

    if ingestion
        .events
        .send(IngestEvent::Finished(error))
        .await
        .is_err()
    {
        log::debug!("Quiz session is gone before the question stream finished");
    }
}
