//! Turns a finished (or abandoned) session into durable records.

use chrono::Utc;

use crate::course::{analysis_body, analysis_title};
use crate::error::QuizError;
use crate::quiz::session::QuizSession;
use crate::quiz::QuizAttempt;
use crate::store::{AttemptId, CourseId, QuizId, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Saved {
    pub attempt_id: AttemptId,
    pub quiz_id: QuizId,
    pub course_id: Option<CourseId>,
}

/// Writes the definition (first time only) and a new attempt for `session`.
///
/// The definition id is recorded on the session as soon as it exists, so a
/// retry after a failed attempt write does not create a second definition.
/// For course quizzes the summary is also filed as course content; that
/// write may fail without failing the save.
pub async fn save_attempt<S: Store>(
    store: &S,
    session: &mut QuizSession,
    summary: Option<&str>,
) -> Result<Saved, QuizError> {
    if session.questions().is_empty() {
        return Err(QuizError::NothingToSave);
    }

    let quiz_id = match session.definition().id {
        Some(id) => id,
        None => {
            let id = store.save_quiz_definition(session.definition()).await?;
            log::info!("Saved quiz definition {id}");
            session.record_definition_id(id);
            id
        }
    };

    let definition = session.definition();
    let course_id = definition.source_course_id;
    let attempted_at = Utc::now();
    let attempt = QuizAttempt {
        id: None,
        quiz_definition_id: quiz_id,
        course_id,
        score: session.score(),
        total_questions_in_attempt: session.answers().len(),
        answers: session.answers().to_vec(),
        ai_summary: summary.map(str::to_string),
        attempted_at,
        model_used: definition.model_used.clone(),
        topic: definition.topic.clone(),
    };
    let attempt_id = store.save_quiz_attempt(&attempt).await?;
    log::info!(
        "Saved attempt {attempt_id} for quiz {quiz_id}: {}/{}",
        attempt.score,
        attempt.total_questions_in_attempt
    );

    if let (Some(course_id), Some(summary)) = (course_id, summary) {
        let title = analysis_title(&definition.topic, attempted_at);
        if let Err(err) = store
            .add_course_content(course_id, &title, &analysis_body(summary))
            .await
        {
            log::warn!("Could not file the quiz analysis under course {course_id}: {err}");
        }
    }

    Ok(Saved {
        attempt_id,
        quiz_id,
        course_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fixtures::{definition, question};
    use crate::store::MemoryStore;

    fn answered(count: usize, course: Option<CourseId>) -> QuizSession {
        let mut def = definition(count);
        def.source_course_id = course;
        let mut session = QuizSession::replay(def).unwrap();
        session.select_option(0);
        session
    }

    #[tokio::test]
    async fn partial_attempt_counts_only_answered_questions() {
        let store = MemoryStore::new();
        let mut session = answered(3, None);
        let saved = save_attempt(&store, &mut session, None).await.unwrap();

        let attempt = store.get_attempt(saved.attempt_id).await.unwrap().unwrap();
        assert_eq!(attempt.total_questions_in_attempt, 1);
        assert_eq!(attempt.score, 1);
        assert_eq!(attempt.ai_summary, None);
        assert_eq!(attempt.course_id, None);
        assert_eq!(attempt.quiz_definition_id, saved.quiz_id);
    }

    #[tokio::test]
    async fn saving_twice_reuses_the_definition() {
        let store = MemoryStore::new();
        let mut session = answered(2, None);
        let first = save_attempt(&store, &mut session, None).await.unwrap();
        let second = save_attempt(&store, &mut session, Some("ok")).await.unwrap();
        assert_eq!(first.quiz_id, second.quiz_id);
        assert_ne!(first.attempt_id, second.attempt_id);
        assert_eq!(store.definitions_created(), 1);
        assert_eq!(store.attempt_count(), 2);
    }

    #[tokio::test]
    async fn course_summary_is_filed_as_content() {
        let store = MemoryStore::new();
        let course = store.create_course("Biology").await.unwrap();
        let mut session = answered(2, Some(course));
        save_attempt(&store, &mut session, Some("Review mitosis."))
            .await
            .unwrap();

        let contents = store.list_course_content(course).await.unwrap();
        assert_eq!(contents.len(), 1);
        assert!(contents[0].title.starts_with("Performance Analysis for Quiz: Rust - "));
        assert_eq!(contents[0].text, "AI-generated analysis:\nReview mitosis.");
    }

    #[tokio::test]
    async fn failing_content_write_does_not_fail_the_save() {
        let store = MemoryStore::new();
        let course = store.create_course("Biology").await.unwrap();
        store.fail_content_writes(true);
        let mut session = answered(2, Some(course));
        let saved = save_attempt(&store, &mut session, Some("summary")).await.unwrap();
        assert!(store.get_attempt(saved.attempt_id).await.unwrap().is_some());
        assert!(store.list_course_content(course).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_the_session_for_a_retry() {
        let store = MemoryStore::new();
        let mut session = answered(2, None);
        store.fail_attempt_writes(true);
        assert!(matches!(
            save_attempt(&store, &mut session, None).await,
            Err(QuizError::Persistence(_))
        ));
        assert_eq!(session.answers().len(), 1);
        assert!(session.definition().id.is_some());

        store.fail_attempt_writes(false);
        save_attempt(&store, &mut session, None).await.unwrap();
        assert_eq!(store.definitions_created(), 1);
        assert_eq!(store.attempt_count(), 1);
    }

    #[tokio::test]
    async fn empty_session_has_nothing_to_save() {
        let store = MemoryStore::new();
        let mut session = QuizSession::generating("Rust", "gpt-4", 3, None);
        assert!(matches!(
            save_attempt(&store, &mut session, None).await,
            Err(QuizError::NothingToSave)
        ));
        session.push_question(question("Q0", &["a", "b"], 0));
        assert!(save_attempt(&store, &mut session, None).await.is_ok());
    }
}
