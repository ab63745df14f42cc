use chrono::{DateTime, Utc};

use crate::store::{ContentId, CourseId};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A block of study material attached to a course. Quizzes generated from
/// the course draw on these.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CourseContent {
    pub id: ContentId,
    pub course_id: CourseId,
    pub title: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Joins all contents into the context handed to the question generator.
pub fn combined_context(contents: &[CourseContent]) -> Option<String> {
    if contents.is_empty() {
        return None;
    }
    Some(
        contents
            .iter()
            .map(|c| format!("Content Title: {}\n{}", c.title, c.text))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n"),
    )
}

pub fn analysis_title(topic: &str, at: DateTime<Utc>) -> String {
    format!(
        "Performance Analysis for Quiz: {topic} - {}",
        at.format("%Y-%m-%d")
    )
}

pub fn analysis_body(summary: &str) -> String {
    format!("AI-generated analysis:\n{summary}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn content(id: i64, title: &str, text: &str) -> CourseContent {
        CourseContent {
            id,
            course_id: 1,
            title: title.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn context_joins_titles_and_text() {
        assert_eq!(combined_context(&[]), None);
        let joined = combined_context(&[content(1, "Ch 1", "cells"), content(2, "Ch 2", "atoms")]).unwrap();
        assert_eq!(
            joined,
            "Content Title: Ch 1\ncells\n\n---\n\nContent Title: Ch 2\natoms"
        );
    }

    #[test]
    fn analysis_title_carries_the_date() {
        let at = Utc.with_ymd_and_hms(2024, 5, 17, 10, 0, 0).unwrap();
        assert_eq!(
            analysis_title("Biology", at),
            "Performance Analysis for Quiz: Biology - 2024-05-17"
        );
    }
}
