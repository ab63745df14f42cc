use super::*;

impl<S, Q, M> QuizApp<S, Q, M>
where
    S: Store,
    Q: QuestionSource,
    M: Summarizer,
{
    /// Leaves the running quiz, saving it unless it is a partial exit with
    /// nothing answered. A partial exit never stores the summary.
    ///
    /// On a failed save the session stays as it was and this can be called again.
    pub async fn exit_quiz(&mut self, partial: bool) -> Result<Option<Saved>, QuizError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };

        if session.discard_on_exit(partial) {
            log::info!("Leaving an unanswered quiz without saving it");
            let course = session.source_course_id();
            self.reset_quiz();
            self.nav.go(if course.is_some() {
                GameState::CourseDetail
            } else {
                GameState::Setup
            });
            return Ok(None);
        }

        let summary = if partial {
            None
        } else {
            session.summary().map(str::to_string)
        };
        self.nav.set_loading("Saving quiz attempt...");
        self.nav.clear_banner();
        let saved = reconcile::save_attempt(&self.store, session, summary.as_deref()).await;
        self.nav.clear_loading();

        let saved = match saved {
            Ok(saved) => saved,
            Err(err) => return self.fail(err),
        };
        self.reset_quiz();

        match saved.course_id {
            Some(course) => {
                if let Err(err) = self.select_course(course).await {
                    log::warn!("Saved attempt {} but could not reopen its course: {err}", saved.attempt_id);
                    self.nav.clear_banner();
                    self.show_course_list().await?;
                }
            }
            None => self.show_course_list().await?,
        }
        Ok(Some(saved))
    }

    /// Replays a stored quiz definition without generating anything.
    pub async fn retake(&mut self, quiz_id: QuizId) -> Result<(), QuizError> {
        let definition = match self.store.get_quiz_definition(quiz_id).await {
            Ok(Some(definition)) => definition,
            Ok(None) => return self.fail(QuizError::NotFound),
            Err(err) => return self.fail(err.into()),
        };
        let model = definition.model_used.parse().unwrap_or_else(|err| {
            log::warn!("Quiz {quiz_id} names an unusable model ({err}), using the default");
            self.settings.default_model
        });
        let session = match QuizSession::replay(definition) {
            Ok(session) => session,
            Err(err) => return self.fail(err),
        };

        log::info!("Retaking quiz {quiz_id}");
        self.reset_quiz();
        self.viewing_attempt = None;
        self.model = model;
        self.session = Some(session);
        self.nav.clear_banner();
        self.nav.go(GameState::Playing);
        Ok(())
    }

    /// Starts the quiz that was just played over from the first question.
    /// Only a quiz whose generation has finished can be retaken.
    pub fn retake_current(&mut self) -> Result<(), QuizError> {
        let definition = match self.session.as_ref() {
            Some(session) if session.ingestion_complete() && !self.is_generating() => {
                session.definition().clone()
            }
            _ => return self.fail(QuizError::NotFound),
        };
        let session = match QuizSession::replay(definition) {
            Ok(session) => session,
            Err(err) => return self.fail(err),
        };

        self.reset_quiz();
        self.session = Some(session);
        self.nav.clear_banner();
        self.nav.go(GameState::Playing);
        Ok(())
    }
}
