//! Strict decoding of streamed question objects.
//!
//! The generator emits one JSON object per question, optionally wrapped in a
//! Markdown code fence. Anything that does not decode into the wire shape, or
//! that breaks a question invariant, is rejected with a [`ValidationError`].

use serde::Deserialize;

use crate::error::ValidationError;
use crate::quiz::{AnswerOption, Question};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQuestion {
    question: String,
    answer_options: Vec<WireOption>,
    #[serde(default)]
    hint: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOption {
    text: String,
    rationale: String,
    is_correct: bool,
}

/// Decodes the `number`-th (1-based) streamed segment into a question.
pub fn decode_question(segment: &str, number: usize) -> Result<Question, ValidationError> {
    let body = strip_code_fence(segment);
    let wire: WireQuestion = serde_json::from_str(body)
        .map_err(|err| ValidationError::Malformed(number, err.to_string()))?;

    let question = Question {
        text: wire.question,
        answer_options: wire
            .answer_options
            .into_iter()
            .map(|o| AnswerOption::new(o.text, o.rationale, o.is_correct))
            .collect(),
        hint: wire.hint.unwrap_or_default(),
    };
    validate(&question, number)?;
    Ok(question)
}

pub fn validate(question: &Question, number: usize) -> Result<(), ValidationError> {
    if question.text.trim().is_empty() {
        return Err(ValidationError::MissingText(number));
    }
    if question.answer_options.len() < 2 {
        return Err(ValidationError::TooFewOptions(
            number,
            question.answer_options.len(),
        ));
    }
    for (i, option) in question.answer_options.iter().enumerate() {
        if option.text.trim().is_empty() {
            return Err(ValidationError::EmptyOptionText(number, i + 1));
        }
        if option.rationale.trim().is_empty() {
            return Err(ValidationError::EmptyRationale(number, i + 1));
        }
    }
    let correct = question
        .answer_options
        .iter()
        .filter(|o| o.is_correct)
        .count();
    if correct != 1 {
        return Err(ValidationError::CorrectCount(number, correct));
    }
    Ok(())
}

/// Removes a surrounding ```` ```lang ... ``` ```` fence, if any.
pub(crate) fn strip_code_fence(segment: &str) -> &str {
    let trimmed = segment.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    // language tag, e.g. ```json
    inner
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const VALID: &str = r#"{
        "question": "What is the powerhouse of the cell?",
        "answerOptions": [
            {"text": "Nucleus", "rationale": "Holds the genome.", "isCorrect": false},
            {"text": "Mitochondrion", "rationale": "Produces most ATP.", "isCorrect": true}
        ],
        "hint": "Think about respiration."
    }"#;

    #[test]
    fn decodes_a_plain_object() {
        let question = decode_question(VALID, 1).unwrap();
        assert_eq!(question.text, "What is the powerhouse of the cell?");
        assert_eq!(question.answer_options.len(), 2);
        assert_eq!(question.correct_option().unwrap().text, "Mitochondrion");
        assert_eq!(question.hint, "Think about respiration.");
    }

    #[test]
    fn decodes_a_fenced_object() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(decode_question(&fenced, 1).is_ok());
        let bare_fence = format!("```{VALID}```");
        assert!(decode_question(&bare_fence, 1).is_ok());
    }

    #[test]
    fn missing_hint_is_allowed() {
        let raw = r#"{"question": "Q", "answerOptions": [
            {"text": "a", "rationale": "r", "isCorrect": true},
            {"text": "b", "rationale": "r", "isCorrect": false}]}"#;
        assert_eq!(decode_question(raw, 1).unwrap().hint, "");
    }

    #[test]
    fn rejects_broken_items() {
        let cases = [
            (r#"not json"#, "malformed"),
            (r#"{"question": "", "answerOptions": []}"#, "text"),
            (
                r#"{"question": "Q", "answerOptions": [{"text": "a", "rationale": "r", "isCorrect": true}]}"#,
                "options",
            ),
            (
                r#"{"question": "Q", "answerOptions": [
                    {"text": "a", "rationale": "r", "isCorrect": "yes"},
                    {"text": "b", "rationale": "r", "isCorrect": false}]}"#,
                "malformed",
            ),
            (
                r#"{"question": "Q", "answerOptions": [
                    {"text": "a", "rationale": "", "isCorrect": true},
                    {"text": "b", "rationale": "r", "isCorrect": false}]}"#,
                "rationale",
            ),
            (
                r#"{"question": "Q", "answerOptions": [
                    {"text": "a", "rationale": "r", "isCorrect": true},
                    {"text": "  ", "rationale": "r", "isCorrect": false}]}"#,
                "option text",
            ),
            (
                r#"{"question": "Q", "answerOptions": [
                    {"text": "a", "rationale": "r", "isCorrect": true},
                    {"text": "b", "rationale": "r", "isCorrect": true}]}"#,
                "two correct",
            ),
        ];
        for (raw, label) in cases {
            assert!(decode_question(raw, 4).is_err(), "accepted {label}");
        }
    }

    #[test]
    fn reports_the_correct_count() {
        let raw = r#"{"question": "Q", "answerOptions": [
            {"text": "a", "rationale": "r", "isCorrect": false},
            {"text": "b", "rationale": "r", "isCorrect": false}]}"#;
        assert_eq!(
            decode_question(raw, 2),
            Err(ValidationError::CorrectCount(2, 0))
        );
    }

    #[test]
    fn blank_option_text_names_the_option() {
        let raw = r#"{"question": "Q", "answerOptions": [
            {"text": "a", "rationale": "r", "isCorrect": true},
            {"text": "", "rationale": "r", "isCorrect": false}]}"#;
        assert_eq!(
            decode_question(raw, 3),
            Err(ValidationError::EmptyOptionText(3, 2))
        );
    }

    #[test]
    fn accepted_items_always_have_exactly_one_correct_option() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let count = rng.gen_range(0..6);
            let flags: Vec<bool> = (0..count).map(|_| rng.gen_bool(0.4)).collect();
            let options: Vec<String> = flags
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    format!(r#"{{"text": "opt{i}", "rationale": "because {i}", "isCorrect": {c}}}"#)
                })
                .collect();
            let raw = format!(
                r#"{{"question": "Q", "answerOptions": [{}], "hint": ""}}"#,
                options.join(",")
            );
            let expected = count >= 2 && flags.iter().filter(|c| **c).count() == 1;
            match decode_question(&raw, 1) {
                Ok(q) => {
                    assert!(expected);
                    assert_eq!(q.answer_options.iter().filter(|o| o.is_correct).count(), 1);
                }
                Err(_) => assert!(!expected),
            }
        }
    }
}
