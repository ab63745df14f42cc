pub mod ai_helper;
pub mod navigation;
pub mod reconcile;
pub mod session;
pub mod stream;
pub mod summary;
pub mod validate;

use chrono::{DateTime, Utc};

use crate::store::{AttemptId, CourseId, QuizId};

/// The structure of a generated quiz. `id` stays `None` until the first save.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuizDefinition {
    pub id: Option<QuizId>,
    pub source_course_id: Option<CourseId>,
    pub topic: String,
    pub model_used: String,
    pub requested_question_count: usize,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

impl QuizDefinition {
    pub fn new(
        topic: impl Into<String>,
        model_used: impl Into<String>,
        requested_question_count: usize,
        source_course_id: Option<CourseId>,
    ) -> Self {
        Self {
            id: None,
            source_course_id,
            topic: topic.into(),
            model_used: model_used.into(),
            requested_question_count,
            questions: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub text: String,
    pub answer_options: Vec<AnswerOption>,
    #[serde(default)]
    pub hint: String,
}

impl Question {
    pub fn new(text: impl Into<String>, answer_options: Vec<AnswerOption>, hint: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            answer_options,
            hint: hint.into(),
        }
    }

    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.answer_options.iter().find(|a| a.is_correct)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnswerOption {
    pub text: String,
    pub rationale: String,
    pub is_correct: bool,
}

impl AnswerOption {
    pub fn new(text: impl Into<String>, rationale: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: text.into(),
            rationale: rationale.into(),
            is_correct,
        }
    }
}

/// One answered question. `rationale` belongs to the option the user picked.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserAnswer {
    pub question_text: String,
    pub selected_answer_text: String,
    pub correct_answer_text: String,
    pub is_correct: bool,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuizAttempt {
    pub id: Option<AttemptId>,
    pub quiz_definition_id: QuizId,
    pub course_id: Option<CourseId>,
    pub score: u32,
    pub total_questions_in_attempt: usize,
    pub answers: Vec<UserAnswer>,
    pub ai_summary: Option<String>,
    pub attempted_at: DateTime<Utc>,
    pub model_used: String,
    pub topic: String,
}


#[cfg(test)]
mod tests {
    use super::fixtures::question;

    #[test]
    fn correct_option_finds_the_flagged_answer() {
        let q = question("Which one?", &["x", "y", "z"], 2);
        assert_eq!(q.correct_option().map(|a| a.text.as_str()), Some("z"));
    }
}
