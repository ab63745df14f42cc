//! Durable storage for courses, course contents, quiz definitions and
//! attempts. Cascading deletes are the caller's job.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::course::{Course, CourseContent};
use crate::error::StoreError;
use crate::quiz::{QuizAttempt, QuizDefinition};

pub type CourseId = i64;
pub type ContentId = i64;
pub type QuizId = i64;
pub type AttemptId = i64;

pub type StoreResult<T> = Result<T, StoreError>;

#[allow(async_fn_in_trait)]
pub trait Store {
    async fn create_course(&self, name: &str) -> StoreResult<CourseId>;
    async fn get_course(&self, id: CourseId) -> StoreResult<Option<Course>>;
    /// Oldest first.
    async fn list_courses(&self) -> StoreResult<Vec<Course>>;
    async fn rename_course(&self, id: CourseId, name: &str) -> StoreResult<()>;
    async fn delete_course(&self, id: CourseId) -> StoreResult<()>;

    async fn add_course_content(&self, course_id: CourseId, title: &str, text: &str) -> StoreResult<ContentId>;
    async fn list_course_content(&self, course_id: CourseId) -> StoreResult<Vec<CourseContent>>;
    async fn update_course_content(&self, id: ContentId, title: &str, text: &str) -> StoreResult<()>;
    async fn delete_course_content(&self, id: ContentId) -> StoreResult<()>;
    async fn delete_course_contents_for_course(&self, course_id: CourseId) -> StoreResult<()>;

    /// Stores a new definition; any `id` already on it is ignored.
    async fn save_quiz_definition(&self, definition: &QuizDefinition) -> StoreResult<QuizId>;
    async fn get_quiz_definition(&self, id: QuizId) -> StoreResult<Option<QuizDefinition>>;
    async fn list_quiz_definitions_for_course(&self, course_id: CourseId) -> StoreResult<Vec<QuizDefinition>>;
    async fn delete_quiz_definitions_for_course(&self, course_id: CourseId) -> StoreResult<()>;

    async fn save_quiz_attempt(&self, attempt: &QuizAttempt) -> StoreResult<AttemptId>;
    async fn list_attempts_for_course(&self, course_id: CourseId) -> StoreResult<Vec<QuizAttempt>>;
    async fn get_attempt(&self, id: AttemptId) -> StoreResult<Option<QuizAttempt>>;
    async fn delete_attempt(&self, id: AttemptId) -> StoreResult<()>;
    async fn delete_attempts_for_course(&self, course_id: CourseId) -> StoreResult<()>;
}
