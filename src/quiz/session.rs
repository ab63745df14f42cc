//! The quiz session state machine.
//!
//! A session owns the growing question list, the cursor, the running score
//! and the recorded answers. It is driven by discrete events (a streamed
//! question arrives, the stream finishes, the user answers, the user moves
//! on) and reports what happened through small return enums so the caller
//! can update the screen. It never talks to storage or the network itself.

use crate::error::{QuizError, StreamError};
use crate::quiz::{AnswerOption, Question, QuizDefinition, UserAnswer};
use crate::store::{CourseId, QuizId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has arrived yet.
    Generating,
    AwaitingAnswer,
    Answered,
    /// The user moved on past the last materialized question while more are still coming.
    Waiting,
    Summarizing,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// First question of the quiz; the quiz can start.
    First,
    /// The user was waiting for this one and is now looking at it.
    Resumed,
    Queued,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finish {
    Ready { advisory: Option<String> },
    /// The user was already waiting past the last question.
    Summarize { advisory: Option<String> },
    /// Nothing usable was produced.
    Empty(Option<StreamError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next,
    Waiting,
    Summarize,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    definition: QuizDefinition,
    phase: Phase,
    cursor: usize,
    score: u32,
    answers: Vec<UserAnswer>,
    selected: Option<AnswerOption>,
    show_hint: bool,
    ingestion_complete: bool,
    summary: Option<String>,
    summary_loading: bool,
}

impl QuizSession {
    /// A session whose questions will be streamed in.
    pub fn generating(
        topic: impl Into<String>,
        model_used: impl Into<String>,
        requested: usize,
        source_course_id: Option<CourseId>,
    ) -> Self {
        Self::with(
            QuizDefinition::new(topic, model_used, requested, source_course_id),
            Phase::Generating,
            false,
        )
    }

    /// A session over an already complete definition (retake).
    pub fn replay(definition: QuizDefinition) -> Result<Self, QuizError> {
        if definition.questions.is_empty() {
            return Err(QuizError::NotFound);
        }
        Ok(Self::with(definition, Phase::AwaitingAnswer, true))
    }

    fn with(definition: QuizDefinition, phase: Phase, ingestion_complete: bool) -> Self {
        Self {
            definition,
            phase,
            cursor: 0,
            score: 0,
            answers: Vec::new(),
            selected: None,
            show_hint: false,
            ingestion_complete,
            summary: None,
            summary_loading: false,
        }
    }

    pub fn definition(&self) -> &QuizDefinition {
        &self.definition
    }

    pub fn questions(&self) -> &[Question] {
        &self.definition.questions
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::Generating => None,
            _ => self.definition.questions.get(self.cursor),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn answers(&self) -> &[UserAnswer] {
        &self.answers
    }

    /// The answer given for the question under the cursor, if any.
    pub fn current_answer(&self) -> Option<&UserAnswer> {
        match self.phase {
            Phase::Answered | Phase::Waiting | Phase::Summarizing | Phase::Complete => {
                self.answers.get(self.cursor)
            }
            _ => None,
        }
    }

    pub fn selected(&self) -> Option<&AnswerOption> {
        self.selected.as_ref()
    }

    pub fn hint_visible(&self) -> bool {
        self.show_hint
    }

    pub fn ingestion_complete(&self) -> bool {
        self.ingestion_complete
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn summary_loading(&self) -> bool {
        self.summary_loading
    }

    pub fn source_course_id(&self) -> Option<CourseId> {
        self.definition.source_course_id
    }

    /// Length the quiz is expected to reach: the request while streaming,
    /// the actual count once the stream is done.
    pub fn expected_len(&self) -> usize {
        if self.ingestion_complete {
            self.definition.questions.len()
        } else {
            self.definition.requested_question_count
        }
    }

    pub fn record_definition_id(&mut self, id: QuizId) {
        self.definition.id = Some(id);
    }

    pub fn push_question(&mut self, question: Question) -> Arrival {
        if self.ingestion_complete {
            log::warn!("Question arrived after the stream finished, ignoring it");
            return Arrival::Ignored;
        }
        self.definition.questions.push(question);
        match self.phase {
            Phase::Generating => {
                self.phase = Phase::AwaitingAnswer;
                Arrival::First
            }
            Phase::Waiting => {
                self.move_to(self.cursor + 1);
                Arrival::Resumed
            }
            _ => Arrival::Queued,
        }
    }

    /// Marks ingestion as over. Runs whether the stream ended normally,
    /// early, or with an error.
    pub fn finish_ingestion(&mut self, error: Option<StreamError>) -> Finish {
        self.ingestion_complete = true;
        let produced = self.definition.questions.len();
        if produced == 0 {
            return Finish::Empty(error);
        }

        let requested = self.definition.requested_question_count;
        let shortfall = (produced < requested).then(|| {
            format!(
                "Note: Generated {produced} out of {requested} requested questions. The quiz will proceed with the generated ones."
            )
        });
        let advisory = match (error, shortfall) {
            (Some(err), Some(note)) => Some(format!("{err}. {note}")),
            (Some(err), None) => Some(err.to_string()),
            (None, note) => note,
        };

        if self.phase == Phase::Waiting {
            self.begin_summary();
            Finish::Summarize { advisory }
        } else {
            Finish::Ready { advisory }
        }
    }

    /// Records an answer for the current question. Returns `false` (and
    /// changes nothing) unless the session is waiting for one.
    pub fn select_answer(&mut self, option: &AnswerOption) -> bool {
        if self.phase != Phase::AwaitingAnswer {
            return false;
        }
        let Some(question) = self.definition.questions.get(self.cursor) else {
            return false;
        };

        let correct = question.correct_option();
        let is_correct = correct.map_or(false, |c| c.text == option.text);
        self.answers.push(UserAnswer {
            question_text: question.text.clone(),
            selected_answer_text: option.text.clone(),
            correct_answer_text: correct.map_or_else(|| "N/A".to_string(), |c| c.text.clone()),
            is_correct,
            rationale: option.rationale.clone(),
        });
        if is_correct {
            self.score += 1;
        }
        self.selected = Some(option.clone());
        self.phase = Phase::Answered;
        true
    }

    /// Answers with the `index`-th option of the current question.
    pub fn select_option(&mut self, index: usize) -> bool {
        let Some(option) = self
            .current_question()
            .and_then(|q| q.answer_options.get(index))
            .cloned()
        else {
            return false;
        };
        self.select_answer(&option)
    }

    pub fn advance(&mut self) -> Advance {
        if self.phase != Phase::Answered {
            return Advance::Ignored;
        }
        self.selected = None;
        self.show_hint = false;

        let materialized = self.definition.questions.len();
        if self.cursor + 1 < materialized {
            self.move_to(self.cursor + 1);
            Advance::Next
        } else if !self.ingestion_complete && materialized < self.definition.requested_question_count {
            self.phase = Phase::Waiting;
            Advance::Waiting
        } else {
            self.begin_summary();
            Advance::Summarize
        }
    }

    pub fn toggle_hint(&mut self) -> bool {
        if self.phase != Phase::AwaitingAnswer {
            return false;
        }
        self.show_hint = !self.show_hint;
        true
    }

    /// Stores the summarizer's result (`None` on failure) and completes the quiz.
    pub fn complete_summary(&mut self, summary: Option<String>) {
        if self.phase != Phase::Summarizing {
            log::warn!("Summary delivered while not summarizing, ignoring it");
            return;
        }
        self.summary = summary;
        self.summary_loading = false;
        self.phase = Phase::Complete;
    }

    /// Leaving with nothing answered is not worth a record.
    pub fn discard_on_exit(&self, partial: bool) -> bool {
        partial && self.answers.is_empty()
    }

    fn move_to(&mut self, index: usize) {
        self.cursor = index;
        self.phase = Phase::AwaitingAnswer;
        self.selected = None;
        self.show_hint = false;
    }

    fn begin_summary(&mut self) {
        self.phase = Phase::Summarizing;
        self.summary = None;
        self.summary_loading = true;
    }
}
