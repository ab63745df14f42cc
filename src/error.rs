use thiserror::Error;

/// A single streamed question that failed the schema check. The item is
/// dropped; the stream keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("streamed question {0} is not a valid question object: {1}")]
    Malformed(usize, String),
    #[error("streamed question {0} has no question text")]
    MissingText(usize),
    #[error("streamed question {0} has {1} answer options, at least 2 are required")]
    TooFewOptions(usize, usize),
    #[error("streamed question {0}, option {1} has no text")]
    EmptyOptionText(usize, usize),
    #[error("streamed question {0}, option {1} has no rationale")]
    EmptyRationale(usize, usize),
    #[error("streamed question {0} must have exactly one correct answer, found {1}")]
    CorrectCount(usize, usize),
}

/// Generation failed as a whole (transport, backend, or garbage output).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("failed to stream quiz questions: {0}")]
    Transport(String),
    #[error("gave up after {0} malformed questions in a row")]
    TooManyInvalid(usize),
    #[error("the question stream ended unexpectedly")]
    Interrupted,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("could not encode or decode a stored record: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("a course named \"{0}\" already exists")]
    DuplicateCourse(String),
    #[error("{0} {1} does not exist")]
    Missing(&'static str, i64),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummaryError {
    #[error("no answers available to summarize")]
    NothingToSummarize,
    #[error("failed to generate performance summary: {0}")]
    Backend(String),
}

/// Errors that reach the user.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("no questions were generated; try a different topic or model")]
    NoQuestions,
    #[error("storage error: {0}")]
    Persistence(#[from] StoreError),
    #[error("could not find the original quiz questions; it might have been deleted or was incomplete")]
    NotFound,
    #[error("no quiz data to save")]
    NothingToSave,
    #[error("no course is selected")]
    NoCourseSelected,
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("tutor chat failed: {0}")]
    Chat(String),
}
