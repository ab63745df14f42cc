use crate::config::Model;
use crate::error::SummaryError;
use crate::quiz::{Question, UserAnswer};

/// Everything the summarizer gets to see about a finished quiz.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRequest<'a> {
    pub questions: &'a [Question],
    pub answers: &'a [UserAnswer],
    pub score: u32,
    pub attempted: usize,
    pub model: Model,
    /// Earlier summaries for the same course, oldest first.
    pub prior_summaries: &'a [String],
}

impl SummaryRequest<'_> {
    pub fn percentage(&self) -> u32 {
        if self.attempted == 0 {
            return 0;
        }
        ((self.score as f64 / self.attempted as f64) * 100.0).round() as u32
    }
}

#[allow(async_fn_in_trait)]
pub trait Summarizer {
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String, SummaryError>;
}
