#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::stream::{self, StreamExt};
use quizmaster::error::{StreamError, SummaryError};
use quizmaster::quiz::stream::{GenerationRequest, QuestionSource, TextStream, QUESTION_DELIMITER};
use quizmaster::quiz::summary::{SummaryRequest, Summarizer};
use quizmaster::store::MemoryStore;
use quizmaster::{QuizApp, QuizSettings};
use tokio::sync::mpsc;

pub type TestApp<Q> = QuizApp<MemoryStore, Q, ScriptedSummarizer>;

/// One question in the generator's wire format. Option `correct` is right.
pub fn wire(text: &str, correct: usize) -> String {
    let options: Vec<String> = ["a", "b", "c"]
        .iter()
        .enumerate()
        .map(|(i, o)| {
            format!(
                r#"{{"text": "{o}", "rationale": "why {o}", "isCorrect": {}}}"#,
                i == correct
            )
        })
        .collect();
    format!(
        r#"{{"question": "{text}", "answerOptions": [{}], "hint": "think about {text}"}}"#,
        options.join(", ")
    )
}

/// `wire` followed by the delimiter line.
pub fn framed(text: &str, correct: usize) -> String {
    format!("{}\n{QUESTION_DELIMITER}\n", wire(text, correct))
}

pub fn settings() -> QuizSettings {
    QuizSettings {
        shuffle_options: false,
        ..QuizSettings::default()
    }
}

/// Replays the same chunks for every request and counts requests.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    chunks: Vec<Result<String, StreamError>>,
    pub requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedSource {
    pub fn new(chunks: Vec<Result<String, StreamError>>) -> Self {
        Self {
            chunks,
            requests: Arc::default(),
        }
    }

    /// A source producing `count` valid questions, `Q0` to `Q{count-1}`, option `a` correct.
    pub fn questions(count: usize) -> Self {
        Self::new((0..count).map(|i| Ok(framed(&format!("Q{i}"), 0))).collect())
    }

    pub fn opened(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl QuestionSource for ScriptedSource {
    fn open(&self, request: &GenerationRequest) -> TextStream {
        self.requests.lock().unwrap().push(request.clone());
        stream::iter(self.chunks.clone()).boxed()
    }
}

/// A source the test feeds by hand, one chunk at a time.
pub struct GatedSource {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Result<String, StreamError>>>>,
}

impl GatedSource {
    pub fn new() -> (Self, mpsc::UnboundedSender<Result<String, StreamError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

impl QuestionSource for GatedSource {
    fn open(&self, _request: &GenerationRequest) -> TextStream {
        match self.rx.lock().unwrap().take() {
            Some(rx) => stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|chunk| (chunk, rx))
            })
            .boxed(),
            None => stream::empty().boxed(),
        }
    }
}

#[derive(Clone)]
pub struct ScriptedSummarizer {
    reply: Result<String, SummaryError>,
    calls: Arc<AtomicUsize>,
    pub priors: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedSummarizer {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: Arc::default(),
            priors: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err(SummaryError::Backend("model overloaded".into())),
            calls: Arc::default(),
            priors: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String, SummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.priors
            .lock()
            .unwrap()
            .push(request.prior_summaries.to_vec());
        self.reply.clone()
    }
}

pub fn app<Q: QuestionSource>(source: Q, summarizer: ScriptedSummarizer) -> TestApp<Q> {
    QuizApp::new(MemoryStore::new(), source, summarizer, settings())
}
