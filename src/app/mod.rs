//! The quiz controller. Owns the collaborators, the live session and the
//! course browser state, and keeps the [`Navigator`] in step with them.

use tokio::sync::{mpsc, watch};

use crate::config::{Model, QuizSettings};
use crate::course::{Course, CourseContent};
use crate::error::{QuizError, StoreError, StreamError};
use crate::quiz::navigation::{GameState, Navigator, Screen};
use crate::quiz::reconcile::{self, Saved};
use crate::quiz::session::{Advance, Arrival, Finish, Phase, QuizSession};
use crate::quiz::stream::{ingest, GenerationRequest, IngestEvent, IngestOptions, QuestionSource};
use crate::quiz::summary::{SummaryRequest, Summarizer};
use crate::quiz::{AnswerOption, Question, QuizAttempt, UserAnswer};
use crate::store::{AttemptId, ContentId, CourseId, QuizId, Store};

pub mod courses;
pub mod quiz_flow;
pub mod saving;

pub struct QuizApp<S, Q, M> {
    store: S,
    source: Q,
    summarizer: M,
    settings: QuizSettings,
    nav: Navigator,
    session: Option<QuizSession>,
    model: Model,
    /// Live while questions are still being streamed into `session`.
    ingest_rx: Option<mpsc::Receiver<IngestEvent>>,
    courses: Vec<Course>,
    current_course: Option<Course>,
    course_contents: Vec<CourseContent>,
    course_attempts: Vec<QuizAttempt>,
    viewing_attempt: Option<QuizAttempt>,
}

impl<S, Q, M> QuizApp<S, Q, M>
where
    S: Store,
    Q: QuestionSource,
    M: Summarizer,
{
    pub fn new(store: S, source: Q, summarizer: M, settings: QuizSettings) -> Self {
        Self {
            store,
            source,
            summarizer,
            model: settings.default_model,
            settings,
            nav: Navigator::new(GameState::CourseList),
            session: None,
            ingest_rx: None,
            courses: Vec::new(),
            current_course: None,
            course_contents: Vec::new(),
            course_attempts: Vec::new(),
            viewing_attempt: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    pub fn state(&self) -> GameState {
        self.nav.state()
    }

    pub fn screen(&self) -> Screen {
        self.nav.screen()
    }

    pub fn subscribe(&self) -> watch::Receiver<Screen> {
        self.nav.subscribe()
    }

    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    /// Model of the running (or last started) quiz.
    pub fn model(&self) -> Model {
        self.model
    }

    pub fn is_generating(&self) -> bool {
        self.ingest_rx.is_some()
    }

    /// Newest first.
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn current_course(&self) -> Option<&Course> {
        self.current_course.as_ref()
    }

    pub fn course_contents(&self) -> &[CourseContent] {
        &self.course_contents
    }

    /// Attempts of the current course, newest first.
    pub fn course_attempts(&self) -> &[QuizAttempt] {
        &self.course_attempts
    }

    pub fn viewing_attempt(&self) -> Option<&QuizAttempt> {
        self.viewing_attempt.as_ref()
    }

    pub fn clear_banner(&self) {
        self.nav.clear_banner();
    }

    /// Shows `err` and hands it back.
    fn fail<T>(&self, err: QuizError) -> Result<T, QuizError> {
        log::error!("{err}");
        self.nav.show_error(err.to_string());
        Err(err)
    }
}
