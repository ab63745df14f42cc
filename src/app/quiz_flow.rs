use super::*;

/// Buffered ingestion events; the producer waits once the session falls behind.
const INGEST_BUFFER: usize = 8;

impl<S, Q, M> QuizApp<S, Q, M>
where
    S: Store,
    Q: QuestionSource,
    M: Summarizer,
{
    /// Starts generating a quiz about `topic`. Questions arrive through
    /// [`next_ingest_event`](Self::next_ingest_event).
    pub fn start_quiz(&mut self, topic: &str, count: usize, model: Model) -> Result<(), QuizError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return self.fail(QuizError::InvalidInput("please enter a quiz topic"));
        }
        self.begin_generation(topic.to_string(), count, model, None, None)
    }

    pub(super) fn begin_generation(
        &mut self,
        topic: String,
        count: usize,
        model: Model,
        course: Option<CourseId>,
        context: Option<String>,
    ) -> Result<(), QuizError> {
        if count == 0 {
            return self.fail(QuizError::InvalidInput("a quiz needs at least one question"));
        }
        self.reset_quiz();
        if !self.nav.state().can_go_to(GameState::GeneratingQuiz) {
            self.nav.go(GameState::Setup);
        }
        self.nav.clear_banner();
        self.nav.go(GameState::GeneratingQuiz);
        self.nav.set_loading(format!("Generating question 1 of {count}..."));

        self.model = model;
        let request = GenerationRequest {
            topic: topic.clone(),
            question_count: count,
            model,
            context,
        };
        let chunks = self.source.open(&request);
        let (tx, rx) = mpsc::channel(INGEST_BUFFER);
        tokio::spawn(ingest(chunks, count, IngestOptions::from(&self.settings), tx));

        self.session = Some(QuizSession::generating(topic, model.as_str(), count, course));
        self.ingest_rx = Some(rx);
        Ok(())
    }

    /// Waits for the next ingestion event, or returns `None` when nothing is
    /// being generated. A producer that vanished without finishing reads as
    /// an interrupted stream.
    pub async fn next_ingest_event(&mut self) -> Option<IngestEvent> {
        let rx = self.ingest_rx.as_mut()?;
        Some(
            rx.recv()
                .await
                .unwrap_or(IngestEvent::Finished(Some(StreamError::Interrupted))),
        )
    }

    pub async fn apply_ingest_event(&mut self, event: IngestEvent) -> Result<(), QuizError> {
        let Some(session) = self.session.as_mut() else {
            log::warn!("Ingestion event without a quiz session, dropping it");
            return Ok(());
        };

        match event {
            IngestEvent::Question(question) => {
                let arrival = session.push_question(question);
                let produced = session.questions().len();
                let requested = session.definition().requested_question_count;
                match arrival {
                    Arrival::First | Arrival::Queued => {
                        if arrival == Arrival::First {
                            self.nav.go(GameState::Playing);
                        }
                        if produced < requested {
                            self.nav.set_loading(format!(
                                "Generated question {produced} of {requested}..."
                            ));
                        } else {
                            self.nav.clear_loading();
                        }
                    }
                    Arrival::Resumed => {
                        if !self.chatting() {
                            self.nav.go(GameState::Playing);
                        }
                        self.nav.clear_loading();
                    }
                    Arrival::Ignored => {}
                }
                Ok(())
            }
            IngestEvent::Finished(error) => {
                self.ingest_rx = None;
                match session.finish_ingestion(error) {
                    Finish::Ready { advisory } => {
                        self.nav.clear_loading();
                        if let Some(advisory) = advisory {
                            log::warn!("{advisory}");
                            self.nav.show_advisory(advisory);
                        }
                        Ok(())
                    }
                    Finish::Summarize { advisory } => {
                        if let Some(advisory) = advisory {
                            log::warn!("{advisory}");
                            self.nav.show_advisory(advisory);
                        }
                        // A chat in progress runs the summary when it ends.
                        if !self.chatting() {
                            self.summarize().await;
                        }
                        Ok(())
                    }
                    Finish::Empty(error) => {
                        let back = if session.source_course_id().is_some() {
                            GameState::CourseDetail
                        } else {
                            GameState::Setup
                        };
                        self.reset_quiz();
                        self.nav.go(back);
                        self.fail(error.map_or(QuizError::NoQuestions, QuizError::from))
                    }
                }
            }
        }
    }

    /// Applies ingestion events until the stream is done.
    pub async fn pump(&mut self) -> Result<(), QuizError> {
        while let Some(event) = self.next_ingest_event().await {
            self.apply_ingest_event(event).await?;
        }
        Ok(())
    }

    pub fn select_answer(&mut self, option: &AnswerOption) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if self.nav.state() != GameState::Playing || !session.select_answer(option) {
            return false;
        }
        self.nav.go(GameState::ShowAnswer);
        true
    }

    pub fn select_option(&mut self, index: usize) -> bool {
        let option = self
            .session
            .as_ref()
            .and_then(QuizSession::current_question)
            .and_then(|q| q.answer_options.get(index))
            .cloned();
        match option {
            Some(option) => self.select_answer(&option),
            None => false,
        }
    }

    pub fn toggle_hint(&mut self) -> bool {
        self.session.as_mut().map_or(false, QuizSession::toggle_hint)
    }

    /// Moves past the answered question: to the next one, into waiting for
    /// the stream, or on to the summary.
    pub async fn next_question(&mut self) {
        if self.chatting() {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.advance() {
            Advance::Next => {
                self.nav.go(GameState::Playing);
            }
            Advance::Waiting => {
                let waiting_for = session.cursor() + 2;
                let requested = session.definition().requested_question_count;
                self.nav.go(GameState::Playing);
                self.nav.set_loading(format!(
                    "Waiting for question {waiting_for} of {requested}..."
                ));
            }
            Advance::Summarize => self.summarize().await,
            Advance::Ignored => {}
        }
    }

    async fn summarize(&mut self) {
        self.nav.go(GameState::SummarizingResults);
        self.nav.set_loading("Analyzing your performance...");

        let course = self.session.as_ref().and_then(QuizSession::source_course_id);
        let prior: Vec<String> = match course {
            Some(course) => match self.store.list_attempts_for_course(course).await {
                Ok(mut attempts) => {
                    attempts.sort_by_key(|a| a.attempted_at);
                    attempts.into_iter().filter_map(|a| a.ai_summary).collect()
                }
                Err(err) => {
                    log::warn!("Could not load earlier summaries for course {course}: {err}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let Some(session) = self.session.as_ref() else {
            return;
        };
        let request = SummaryRequest {
            questions: session.questions(),
            answers: session.answers(),
            score: session.score(),
            attempted: session.answers().len(),
            model: self.model,
            prior_summaries: &prior,
        };
        let summary = match self.summarizer.summarize(request).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                log::warn!("No performance summary: {err}");
                self.nav.show_advisory(format!("No summary available: {err}"));
                None
            }
        };

        if let Some(session) = self.session.as_mut() {
            session.complete_summary(summary);
        }
        self.nav.clear_loading();
        self.nav.go(GameState::Results);
    }

    /// Opens the tutor chat on the current question.
    pub fn start_chat(&mut self) -> bool {
        if self.chat_subject().is_none() {
            return false;
        }
        self.nav.enter_chat()
    }

    /// Leaves the tutor chat. A quiz whose stream ended during the chat is
    /// summarized now.
    pub async fn end_chat(&mut self) -> bool {
        if !self.nav.leave_chat() {
            return false;
        }
        let summary_due = self
            .session
            .as_ref()
            .is_some_and(|s| s.phase() == Phase::Summarizing);
        if summary_due {
            self.summarize().await;
        }
        true
    }

    fn chatting(&self) -> bool {
        self.nav.state() == GameState::ChattingQuestion
    }

    /// The question being discussed and, once answered, the user's answer.
    pub fn chat_subject(&self) -> Option<(&Question, Option<&UserAnswer>)> {
        let session = self.session.as_ref()?;
        let question = session.current_question()?;
        Some((question, session.current_answer()))
    }

    pub fn restart_setup(&mut self) {
        self.reset_quiz();
        self.nav.clear_banner();
        self.nav.go(GameState::Setup);
    }

    /// Drops the session. Any ongoing generation is abandoned with it.
    pub fn reset_quiz(&mut self) {
        if self.ingest_rx.take().is_some() {
            log::debug!("Abandoning question generation");
        }
        self.session = None;
        self.nav.clear_loading();
    }
}
