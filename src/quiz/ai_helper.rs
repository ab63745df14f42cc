use std::fmt::Write as _;
use std::time::Duration;

use chatgpt::client::ChatGPT;
use chatgpt::config::ChatGPTEngine;
use chatgpt::converse::Conversation;
use chatgpt::types::{CompletionResponse, ResponseChunk};
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

use crate::config::{Config, Model};
use crate::error::{QuizError, StreamError, SummaryError};
use crate::quiz::stream::{GenerationRequest, QuestionSource, TextStream, QUESTION_DELIMITER};
use crate::quiz::summary::{SummaryRequest, Summarizer};
use crate::quiz::{Question, UserAnswer};

const GENERATION_TEMPERATURE: f32 = 0.7;
const SUMMARY_TEMPERATURE: f32 = 0.5;
const TUTOR_TEMPERATURE: f32 = 0.7;

/// OpenAI-backed question source, summarizer and tutor.
#[derive(Debug, Clone)]
pub struct QuizHelper {
    api_key: String,
    timeout: Duration,
}

impl QuizHelper {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            timeout: config.request_timeout,
        }
    }

    fn client(&self, model: Model, temperature: f32) -> chatgpt::Result<ChatGPT> {
        let mut gpt = ChatGPT::new(self.api_key.clone())?;
        gpt.config.engine = engine(model);
        gpt.config.timeout = self.timeout;
        gpt.config.temperature = temperature;
        Ok(gpt)
    }

    /// Opens a tutor conversation about `question`. When `answer` is given
    /// the tutor discusses the user's choice, otherwise it only guides.
    pub fn open_tutor(
        &self,
        question: &Question,
        answer: Option<&UserAnswer>,
        model: Model,
    ) -> Result<Tutor, QuizError> {
        let gpt = self
            .client(model, TUTOR_TEMPERATURE)
            .map_err(|err| QuizError::Chat(err.to_string()))?;
        log::debug!("Opening tutor chat for question: {:?}", question.text);
        Ok(Tutor {
            conversation: gpt.new_conversation_directed(tutor_directive(question, answer)),
            opening: tutor_opening(question, answer),
        })
    }
}

fn engine(model: Model) -> ChatGPTEngine {
    match model {
        Model::Gpt35Turbo => ChatGPTEngine::Gpt35Turbo,
        Model::Gpt4 => ChatGPTEngine::Gpt4,
        Model::Gpt4o => ChatGPTEngine::Custom("gpt-4o"),
    }
}

impl QuestionSource for QuizHelper {
    fn open(&self, request: &GenerationRequest) -> TextStream {
        log::info!(
            "Generating {} question(s) about {:?} with {}",
            request.question_count,
            request.topic,
            request.model
        );
        let prompt = generation_prompt(request);
        let client = self.client(request.model, GENERATION_TEMPERATURE);

        stream::once(async move {
            let (tx, rx) = mpsc::channel(32);
            tokio::spawn(relay(client, prompt, tx));
            stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|chunk| (chunk, rx)) })
        })
        .flatten()
        .boxed()
    }
}

async fn fail(tx: &mpsc::Sender<Result<String, StreamError>>, err: chatgpt::err::Error) {
    log::error!("Could not open the question stream: {err}");
    let _ = tx.send(Err(StreamError::Transport(err.to_string()))).await;
}

/// Forwards the completion's text deltas until the reader goes away.
async fn relay(
    client: chatgpt::Result<ChatGPT>,
    prompt: String,
    tx: mpsc::Sender<Result<String, StreamError>>,
) {
    let gpt = match client {
        Ok(gpt) => gpt,
        Err(err) => return fail(&tx, err).await,
    };
    let chunks = match gpt.send_message_streaming(prompt).await {
        Ok(chunks) => chunks,
        Err(err) => return fail(&tx, err).await,
    };

    tokio::pin!(chunks);
    while let Some(chunk) = chunks.next().await {
        if let ResponseChunk::Content { delta, .. } = chunk {
            if tx.send(Ok(delta)).await.is_err() {
                log::debug!("Question stream reader is gone, closing the completion");
                return;
            }
        }
    }
}

impl Summarizer for QuizHelper {
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String, SummaryError> {
        if request.answers.is_empty() {
            return Err(SummaryError::NothingToSummarize);
        }
        let backend = |err: chatgpt::err::Error| SummaryError::Backend(err.to_string());
        let gpt = self.client(request.model, SUMMARY_TEMPERATURE).map_err(backend)?;

        log::info!(
            "Summarizing quiz performance: {}/{}",
            request.score,
            request.attempted
        );
        let response: CompletionResponse = gpt
            .send_message(summary_prompt(&request))
            .await
            .map_err(backend)?;
        let content = response.message().content.clone();
        log::debug!("Summary: {content:?}");
        Ok(content)
    }
}

/// A running tutor conversation about one question.
pub struct Tutor {
    conversation: Conversation,
    opening: String,
}

impl Tutor {
    /// The greeting shown before the user writes anything.
    pub fn opening(&self) -> &str {
        &self.opening
    }

    pub async fn ask(&mut self, message: &str) -> Result<String, QuizError> {
        let response = self
            .conversation
            .send_message(message.trim())
            .await
            .map_err(|err| QuizError::Chat(err.to_string()))?;
        Ok(response.message().content.clone())
    }
}

pub fn generation_prompt(request: &GenerationRequest) -> String {
    let GenerationRequest {
        topic,
        question_count,
        model,
        context,
    } = request;

    let mut prompt = format!(
        "You write multiple-choice quiz questions.\nWrite {question_count} questions about the topic \"{topic}\".\n"
    );
    match context {
        Some(context) => {
            let _ = write!(
                prompt,
                "\nBase the questions mainly on the material below. If it does not cover {question_count} questions, fill in with general knowledge of the topic.\nMaterial:\n---\n{context}\n---\n"
            );
        }
        None => {
            let _ = write!(prompt, "\nUse general knowledge about \"{topic}\".\n");
        }
    }
    let _ = write!(
        prompt,
        r#"
Output every question as one standalone JSON object of this shape:
{{
  "question": "question text",
  "answerOptions": [
    {{"text": "option text without numbering", "rationale": "what makes this option right or tempting, without saying correct or incorrect", "isCorrect": false}}
  ],
  "hint": "one sentence that nudges without giving the answer away"
}}

Rules:
- Use 4 answer options (2 only for true/false questions).
- Exactly one option per question has "isCorrect": true.
- Every field is required; "isCorrect" is a JSON boolean.
- No "all of the above" or "none of the above" options.
- Escape backslashes in LaTeX.

After each object write a line containing only {QUESTION_DELIMITER}
Do not wrap the questions in an array and write nothing else.
Generate the {question_count} questions now using {model}.
"#
    );
    prompt
}

pub fn summary_prompt(request: &SummaryRequest<'_>) -> String {
    let mut prompt = format!(
        "You are a tutor reviewing a quiz the user just took. Write a constructive analysis of how they did.\n\nScore: {} out of {} ({}%)\n\nAnswers:\n",
        request.score,
        request.attempted,
        request.percentage()
    );

    for (number, answer) in request.answers.iter().enumerate() {
        let verdict = if answer.is_correct { "Correct" } else { "Incorrect" };
        let rationale = if answer.rationale.is_empty() {
            "N/A"
        } else {
            &answer.rationale
        };
        let _ = write!(
            prompt,
            "\nQuestion {}: {}\n  - Answered: \"{}\" ({verdict})\n  - Rationale of that option: {rationale}\n",
            number + 1,
            answer.question_text,
            answer.selected_answer_text
        );
        if answer.is_correct {
            continue;
        }
        let correct = request
            .questions
            .iter()
            .find(|q| q.text == answer.question_text)
            .and_then(Question::correct_option);
        if let Some(correct) = correct {
            let _ = writeln!(
                prompt,
                "  - Correct answer: \"{}\" (rationale: {})",
                correct.text, correct.rationale
            );
        }
    }

    if !request.prior_summaries.is_empty() {
        prompt.push_str("\nEarlier analyses for this course, oldest first:\n");
        for summary in request.prior_summaries {
            let _ = writeln!(prompt, "---\n{summary}");
        }
        prompt.push_str("Mention progress or recurring gaps compared to these.\n");
    }

    prompt.push_str(
        r#"
How to write it:
1. Open with an encouraging remark about the result.
2. List strengths and areas for improvement as bullet points under their own headings.
3. For wrong answers, explain what likely misled the user by contrasting the rationale of their option with that of the correct one.
4. Suggest 2-3 concepts worth reviewing.
5. Keep it to 3-5 short paragraphs and do not repeat the questions verbatim.
6. Format the whole answer as Markdown.
"#,
    );
    prompt
}

pub fn tutor_directive(question: &Question, answer: Option<&UserAnswer>) -> String {
    let mut directive = format!(
        "You are a tutor helping the user with one quiz question.\nQuestion: \"{}\"\nOptions:\n",
        question.text
    );
    for option in &question.answer_options {
        let _ = writeln!(directive, "- {} (rationale: {})", option.text, option.rationale);
    }

    match answer {
        Some(answer) => {
            let verdict = if answer.is_correct { "CORRECT" } else { "INCORRECT" };
            let _ = write!(
                directive,
                "\nThe user already answered \"{}\", which was {verdict}.\n",
                answer.selected_answer_text
            );
            if !answer.is_correct {
                let rationale = question
                    .answer_options
                    .iter()
                    .find(|o| o.text == answer.correct_answer_text)
                    .map_or("N/A", |o| o.rationale.as_str());
                let _ = writeln!(
                    directive,
                    "The correct answer was \"{}\" (rationale: {rationale}).",
                    answer.correct_answer_text
                );
            }
            directive.push_str(
                "Discuss their choice: reinforce the reasoning if they were right, explain the misconception if they were wrong. Do not just say right or wrong, and if they ask for the answer, guide them to it instead.\n",
            );
        }
        None => directive.push_str(
            "\nThe user has not answered yet. Help them understand the concepts behind the question. Never reveal which option is correct and never say whether a particular option is correct; if asked, decline politely and ask what they think.\n",
        ),
    }
    directive.push_str("Ask probing questions, keep explanations short, and use Markdown where it helps.\n");
    directive
}

fn tutor_opening(question: &Question, answer: Option<&UserAnswer>) -> String {
    let excerpt: String = question.text.chars().take(50).collect();
    let mut opening = format!("Hello! I'm here to help you with the question: \"{excerpt}...\". ");
    match answer {
        Some(answer) => {
            let verdict = if answer.is_correct { "correct" } else { "incorrect" };
            let _ = write!(
                opening,
                "You answered \"{}\", which was {verdict}. How can I help you understand this question better?",
                answer.selected_answer_text
            );
        }
        None => opening.push_str("What are your initial thoughts or where are you stuck?"),
    }
    opening
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fixtures::question;

    fn answer(is_correct: bool) -> UserAnswer {
        UserAnswer {
            question_text: "Q0".into(),
            selected_answer_text: if is_correct { "a" } else { "b" }.into(),
            correct_answer_text: "a".into(),
            is_correct,
            rationale: if is_correct { "why a" } else { "why b" }.into(),
        }
    }

    #[test]
    fn generation_prompt_embeds_context_and_delimiter() {
        let mut request = GenerationRequest {
            topic: "Cells".into(),
            question_count: 4,
            model: Model::Gpt4,
            context: None,
        };
        let plain = generation_prompt(&request);
        assert!(plain.contains("Write 4 questions about the topic \"Cells\""));
        assert!(plain.contains("general knowledge about \"Cells\""));
        assert!(plain.contains(QUESTION_DELIMITER));
        assert!(plain.contains("gpt-4"));

        request.context = Some("Content Title: Ch 1\nmitochondria".into());
        let grounded = generation_prompt(&request);
        assert!(grounded.contains("---\nContent Title: Ch 1\nmitochondria\n---"));
    }

    #[test]
    fn summary_prompt_lists_answers_and_history() {
        let questions = vec![question("Q0", &["a", "b"], 0)];
        let answers = vec![answer(false)];
        let prior = vec!["Last time: weak on Q0".to_string()];
        let request = SummaryRequest {
            questions: &questions,
            answers: &answers,
            score: 0,
            attempted: 1,
            model: Model::Gpt35Turbo,
            prior_summaries: &prior,
        };
        let prompt = summary_prompt(&request);
        assert!(prompt.contains("Score: 0 out of 1 (0%)"));
        assert!(prompt.contains("Answered: \"b\" (Incorrect)"));
        assert!(prompt.contains("Rationale of that option: why b"));
        assert!(prompt.contains("Correct answer: \"a\" (rationale: why a)"));
        assert!(prompt.contains("Last time: weak on Q0"));
    }

    #[test]
    fn tutor_directive_hides_the_answer_until_answered() {
        let q = question("Q0", &["a", "b"], 0);
        let before = tutor_directive(&q, None);
        assert!(before.contains("Never reveal which option is correct"));
        assert!(!before.contains("The correct answer was"));

        let after = tutor_directive(&q, Some(&answer(false)));
        assert!(after.contains("\"b\", which was INCORRECT"));
        assert!(after.contains("The correct answer was \"a\" (rationale: why a)"));
    }

    #[test]
    fn tutor_opening_mentions_the_answer() {
        let q = question("Q0", &["a", "b"], 0);
        assert!(tutor_opening(&q, None).ends_with("where are you stuck?"));
        assert!(tutor_opening(&q, Some(&answer(true))).contains("\"a\", which was correct"));
    }
}
