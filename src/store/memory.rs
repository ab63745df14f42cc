use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::{AttemptId, ContentId, CourseId, QuizId, Store, StoreResult};
use crate::course::{Course, CourseContent};
use crate::error::StoreError;
use crate::quiz::{QuizAttempt, QuizDefinition};

/// In-process store. Ids are handed out per table starting at 1, the way an
/// auto-increment key would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    courses: BTreeMap<CourseId, Course>,
    contents: BTreeMap<ContentId, CourseContent>,
    quizzes: BTreeMap<QuizId, QuizDefinition>,
    attempts: BTreeMap<AttemptId, QuizAttempt>,
    definitions_created: usize,
    fail_attempts: bool,
    fail_contents: bool,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// How many quiz definitions were ever written.
    pub fn definitions_created(&self) -> usize {
        self.tables().map(|t| t.definitions_created).unwrap_or_default()
    }

    pub fn attempt_count(&self) -> usize {
        self.tables().map(|t| t.attempts.len()).unwrap_or_default()
    }

    /// Makes attempt writes fail until switched off again.
    pub fn fail_attempt_writes(&self, fail: bool) {
        if let Ok(mut tables) = self.tables() {
            tables.fail_attempts = fail;
        }
    }

    /// Makes course content writes fail until switched off again.
    pub fn fail_content_writes(&self, fail: bool) {
        if let Ok(mut tables) = self.tables() {
            tables.fail_contents = fail;
        }
    }
}

impl Store for MemoryStore {
    async fn create_course(&self, name: &str) -> StoreResult<CourseId> {
        let mut tables = self.tables()?;
        if tables.courses.values().any(|c| c.name == name) {
            return Err(StoreError::DuplicateCourse(name.to_string()));
        }
        let id = tables.next_id();
        tables.courses.insert(
            id,
            Course {
                id,
                name: name.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_course(&self, id: CourseId) -> StoreResult<Option<Course>> {
        Ok(self.tables()?.courses.get(&id).cloned())
    }

    async fn list_courses(&self) -> StoreResult<Vec<Course>> {
        let mut courses: Vec<Course> = self.tables()?.courses.values().cloned().collect();
        courses.sort_by_key(|c| (c.created_at, c.id));
        Ok(courses)
    }

    async fn rename_course(&self, id: CourseId, name: &str) -> StoreResult<()> {
        let mut tables = self.tables()?;
        if tables.courses.values().any(|c| c.name == name && c.id != id) {
            return Err(StoreError::DuplicateCourse(name.to_string()));
        }
        let course = tables
            .courses
            .get_mut(&id)
            .ok_or(StoreError::Missing("course", id))?;
        course.name = name.to_string();
        Ok(())
    }

    async fn delete_course(&self, id: CourseId) -> StoreResult<()> {
        self.tables()?.courses.remove(&id);
        Ok(())
    }

    async fn add_course_content(&self, course_id: CourseId, title: &str, text: &str) -> StoreResult<ContentId> {
        let mut tables = self.tables()?;
        if tables.fail_contents {
            return Err(StoreError::Unavailable("content writes are failing".to_string()));
        }
        let id = tables.next_id();
        tables.contents.insert(
            id,
            CourseContent {
                id,
                course_id,
                title: title.to_string(),
                text: text.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn list_course_content(&self, course_id: CourseId) -> StoreResult<Vec<CourseContent>> {
        Ok(self
            .tables()?
            .contents
            .values()
            .filter(|c| c.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn update_course_content(&self, id: ContentId, title: &str, text: &str) -> StoreResult<()> {
        let mut tables = self.tables()?;
        let content = tables
            .contents
            .get_mut(&id)
            .ok_or(StoreError::Missing("course content", id))?;
        content.title = title.to_string();
        content.text = text.to_string();
        Ok(())
    }

    async fn delete_course_content(&self, id: ContentId) -> StoreResult<()> {
        self.tables()?.contents.remove(&id);
        Ok(())
    }

    async fn delete_course_contents_for_course(&self, course_id: CourseId) -> StoreResult<()> {
        self.tables()?.contents.retain(|_, c| c.course_id != course_id);
        Ok(())
    }

    async fn save_quiz_definition(&self, definition: &QuizDefinition) -> StoreResult<QuizId> {
        let mut tables = self.tables()?;
        let id = tables.next_id();
        let mut stored = definition.clone();
        stored.id = Some(id);
        tables.quizzes.insert(id, stored);
        tables.definitions_created += 1;
        Ok(id)
    }

    async fn get_quiz_definition(&self, id: QuizId) -> StoreResult<Option<QuizDefinition>> {
        Ok(self.tables()?.quizzes.get(&id).cloned())
    }

    async fn list_quiz_definitions_for_course(&self, course_id: CourseId) -> StoreResult<Vec<QuizDefinition>> {
        Ok(self
            .tables()?
            .quizzes
            .values()
            .filter(|q| q.source_course_id == Some(course_id))
            .cloned()
            .collect())
    }

    async fn delete_quiz_definitions_for_course(&self, course_id: CourseId) -> StoreResult<()> {
        self.tables()?
            .quizzes
            .retain(|_, q| q.source_course_id != Some(course_id));
        Ok(())
    }

    async fn save_quiz_attempt(&self, attempt: &QuizAttempt) -> StoreResult<AttemptId> {
        let mut tables = self.tables()?;
        if tables.fail_attempts {
            return Err(StoreError::Unavailable("attempt writes are failing".to_string()));
        }
        let id = tables.next_id();
        let mut stored = attempt.clone();
        stored.id = Some(id);
        tables.attempts.insert(id, stored);
        Ok(id)
    }

    async fn list_attempts_for_course(&self, course_id: CourseId) -> StoreResult<Vec<QuizAttempt>> {
        Ok(self
            .tables()?
            .attempts
            .values()
            .filter(|a| a.course_id == Some(course_id))
            .cloned()
            .collect())
    }

    async fn get_attempt(&self, id: AttemptId) -> StoreResult<Option<QuizAttempt>> {
        Ok(self.tables()?.attempts.get(&id).cloned())
    }

    async fn delete_attempt(&self, id: AttemptId) -> StoreResult<()> {
        self.tables()?.attempts.remove(&id);
        Ok(())
    }

    async fn delete_attempts_for_course(&self, course_id: CourseId) -> StoreResult<()> {
        self.tables()?
            .attempts
            .retain(|_, a| a.course_id != Some(course_id));
        Ok(())
    }
}
