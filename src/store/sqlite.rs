use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use super::{AttemptId, ContentId, CourseId, QuizId, Store, StoreResult};
use crate::course::{Course, CourseContent};
use crate::error::StoreError;
use crate::quiz::{QuizAttempt, QuizDefinition};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS courses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS course_contents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        course_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        text_content TEXT NOT NULL,
        created_at TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS course_contents_course_id ON course_contents (course_id)",
    r#"CREATE TABLE IF NOT EXISTS quizzes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        course_id INTEGER,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS quizzes_course_id ON quizzes (course_id)",
    r#"CREATE TABLE IF NOT EXISTS quiz_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        quiz_id INTEGER NOT NULL,
        course_id INTEGER,
        body TEXT NOT NULL,
        attempted_at TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS quiz_attempts_quiz_id ON quiz_attempts (quiz_id)",
    "CREATE INDEX IF NOT EXISTS quiz_attempts_course_id ON quiz_attempts (course_id)",
];

/// SQLite-backed store. Quiz definitions and attempts are kept as JSON
/// bodies next to the columns they are looked up by.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct CourseRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ContentRow {
    id: i64,
    course_id: i64,
    title: String,
    text_content: String,
    created_at: DateTime<Utc>,
}

impl From<ContentRow> for CourseContent {
    fn from(row: ContentRow) -> Self {
        Self {
            id: row.id,
            course_id: row.course_id,
            title: row.title,
            text: row.text_content,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct BodyRow {
    id: i64,
    body: String,
}

impl BodyRow {
    fn into_definition(self) -> StoreResult<QuizDefinition> {
        let mut definition: QuizDefinition = serde_json::from_str(&self.body)?;
        definition.id = Some(self.id);
        Ok(definition)
    }

    fn into_attempt(self) -> StoreResult<QuizAttempt> {
        let mut attempt: QuizAttempt = serde_json::from_str(&self.body)?;
        attempt.id = Some(self.id);
        Ok(attempt)
    }
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url`, e.g. `sqlite://quiz.sqlite`.
    pub async fn open(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        Self::connect(options).await
    }

    /// A private database that lives as long as the store.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        log::info!("SQLite store ready");
        Ok(Self { pool })
    }

    async fn delete_where(&self, sql: &str, id: i64) -> StoreResult<()> {
        sqlx::query(sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }
}

fn course_name_error(err: sqlx::Error, name: &str) -> StoreError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => StoreError::DuplicateCourse(name.to_string()),
        _ => StoreError::Database(err),
    }
}

impl Store for SqliteStore {
    async fn create_course(&self, name: &str) -> StoreResult<CourseId> {
        let result = sqlx::query("INSERT INTO courses (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|err| course_name_error(err, name))?;
        Ok(result.last_insert_rowid())
    }

    async fn get_course(&self, id: CourseId) -> StoreResult<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>("SELECT id, name, created_at FROM courses WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Course::from))
    }

    async fn list_courses(&self) -> StoreResult<Vec<Course>> {
        let rows = sqlx::query_as::<_, CourseRow>(
            "SELECT id, name, created_at FROM courses ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Course::from).collect())
    }

    async fn rename_course(&self, id: CourseId, name: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE courses SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| course_name_error(err, name))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing("course", id));
        }
        Ok(())
    }

    async fn delete_course(&self, id: CourseId) -> StoreResult<()> {
        self.delete_where("DELETE FROM courses WHERE id = ?", id).await
    }

    async fn add_course_content(&self, course_id: CourseId, title: &str, text: &str) -> StoreResult<ContentId> {
        let result = sqlx::query(
            "INSERT INTO course_contents (course_id, title, text_content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(course_id)
        .bind(title)
        .bind(text)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_course_content(&self, course_id: CourseId) -> StoreResult<Vec<CourseContent>> {
        let rows = sqlx::query_as::<_, ContentRow>(
            r#"SELECT id, course_id, title, text_content, created_at
               FROM course_contents WHERE course_id = ? ORDER BY created_at, id"#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CourseContent::from).collect())
    }

    async fn update_course_content(&self, id: ContentId, title: &str, text: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE course_contents SET title = ?, text_content = ? WHERE id = ?")
            .bind(title)
            .bind(text)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing("course content", id));
        }
        Ok(())
    }

    async fn delete_course_content(&self, id: ContentId) -> StoreResult<()> {
        self.delete_where("DELETE FROM course_contents WHERE id = ?", id).await
    }

    async fn delete_course_contents_for_course(&self, course_id: CourseId) -> StoreResult<()> {
        self.delete_where("DELETE FROM course_contents WHERE course_id = ?", course_id)
            .await
    }

    async fn save_quiz_definition(&self, definition: &QuizDefinition) -> StoreResult<QuizId> {
        let body = serde_json::to_string(&QuizDefinition {
            id: None,
            ..definition.clone()
        })?;
        let result = sqlx::query("INSERT INTO quizzes (course_id, body, created_at) VALUES (?, ?, ?)")
            .bind(definition.source_course_id)
            .bind(body)
            .bind(definition.created_at)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn get_quiz_definition(&self, id: QuizId) -> StoreResult<Option<QuizDefinition>> {
        sqlx::query_as::<_, BodyRow>("SELECT id, body FROM quizzes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(BodyRow::into_definition)
            .transpose()
    }

    async fn list_quiz_definitions_for_course(&self, course_id: CourseId) -> StoreResult<Vec<QuizDefinition>> {
        sqlx::query_as::<_, BodyRow>(
            "SELECT id, body FROM quizzes WHERE course_id = ? ORDER BY created_at, id",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(BodyRow::into_definition)
        .collect()
    }

    async fn delete_quiz_definitions_for_course(&self, course_id: CourseId) -> StoreResult<()> {
        self.delete_where("DELETE FROM quizzes WHERE course_id = ?", course_id)
            .await
    }

    async fn save_quiz_attempt(&self, attempt: &QuizAttempt) -> StoreResult<AttemptId> {
        let body = serde_json::to_string(&QuizAttempt {
            id: None,
            ..attempt.clone()
        })?;
        let result = sqlx::query(
            "INSERT INTO quiz_attempts (quiz_id, course_id, body, attempted_at) VALUES (?, ?, ?, ?)",
        )
        .bind(attempt.quiz_definition_id)
        .bind(attempt.course_id)
        .bind(body)
        .bind(attempt.attempted_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_attempts_for_course(&self, course_id: CourseId) -> StoreResult<Vec<QuizAttempt>> {
        sqlx::query_as::<_, BodyRow>(
            "SELECT id, body FROM quiz_attempts WHERE course_id = ? ORDER BY attempted_at, id",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(BodyRow::into_attempt)
        .collect()
    }

    async fn get_attempt(&self, id: AttemptId) -> StoreResult<Option<QuizAttempt>> {
        sqlx::query_as::<_, BodyRow>("SELECT id, body FROM quiz_attempts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(BodyRow::into_attempt)
            .transpose()
    }

    async fn delete_attempt(&self, id: AttemptId) -> StoreResult<()> {
        self.delete_where("DELETE FROM quiz_attempts WHERE id = ?", id).await
    }

    async fn delete_attempts_for_course(&self, course_id: CourseId) -> StoreResult<()> {
        self.delete_where("DELETE FROM quiz_attempts WHERE course_id = ?", course_id)
            .await
    }
}
