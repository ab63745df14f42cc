use std::{fmt, str::FromStr, time::Duration};

use dotenv::dotenv;
use serde::{Deserialize, Serialize};

use crate::error::QuizError;

/// Generation models the quiz can run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Model {
    #[default]
    Gpt35Turbo,
    Gpt4,
    Gpt4o,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Gpt35Turbo => "gpt-3.5-turbo",
            Model::Gpt4 => "gpt-4",
            Model::Gpt4o => "gpt-4o",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gpt-3.5-turbo" => Ok(Model::Gpt35Turbo),
            "gpt-4" => Ok(Model::Gpt4),
            "gpt-4o" => Ok(Model::Gpt4o),
            other => Err(QuizError::Config(format!("unknown model \"{other}\""))),
        }
    }
}

/// Knobs for a quiz run, handed to the session controller at construction.
#[derive(Debug, Clone)]
pub struct QuizSettings {
    pub default_model: Model,
    pub question_count: usize,
    /// Malformed items tolerated in a row before the stream is abandoned.
    pub max_invalid_streak: usize,
    pub shuffle_options: bool,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            default_model: Model::default(),
            question_count: 5,
            max_invalid_streak: 3,
            shuffle_options: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub database_url: String,
    pub request_timeout: Duration,
    pub quiz: QuizSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, QuizError> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, QuizError> {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| QuizError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let defaults = QuizSettings::default();
        let quiz = QuizSettings {
            default_model: parse_or(&lookup, "QUIZ_MODEL", defaults.default_model)?,
            question_count: parse_or(&lookup, "QUIZ_QUESTION_COUNT", defaults.question_count)?,
            max_invalid_streak: parse_or(
                &lookup,
                "QUIZ_MAX_INVALID_STREAK",
                defaults.max_invalid_streak,
            )?,
            shuffle_options: parse_or(&lookup, "QUIZ_SHUFFLE_OPTIONS", defaults.shuffle_options)?,
        };
        if quiz.question_count == 0 {
            return Err(QuizError::Config(
                "QUIZ_QUESTION_COUNT can't be 0".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            database_url: lookup("QUIZ_DATABASE_URL")
                .unwrap_or_else(|| "sqlite://quizmaster.sqlite".to_string()),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "QUIZ_REQUEST_TIMEOUT_SECS",
                30u64,
            )?),
            quiz,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, QuizError>
where
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| QuizError::Config(format!("{key} has an invalid value \"{raw}\""))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let config = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.database_url, "sqlite://quizmaster.sqlite");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.quiz.default_model, Model::Gpt35Turbo);
        assert_eq!(config.quiz.question_count, 5);
        assert_eq!(config.quiz.max_invalid_streak, 3);
        assert!(config.quiz.shuffle_options);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("QUIZ_MODEL", "gpt-4o"),
            ("QUIZ_QUESTION_COUNT", "10"),
            ("QUIZ_SHUFFLE_OPTIONS", "false"),
            ("QUIZ_REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.quiz.default_model, Model::Gpt4o);
        assert_eq!(config.quiz.question_count, 10);
        assert!(!config.quiz.shuffle_options);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_key_and_bad_values_are_rejected() {
        assert!(matches!(
            Config::from_lookup(lookup_from(&[])),
            Err(QuizError::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup_from(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("QUIZ_MODEL", "gemini"),
            ])),
            Err(QuizError::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup_from(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("QUIZ_QUESTION_COUNT", "0"),
            ])),
            Err(QuizError::Config(_))
        ));
    }

    #[test]
    fn model_names_round_trip_through_display() {
        for model in [Model::Gpt35Turbo, Model::Gpt4, Model::Gpt4o] {
            assert_eq!(model.to_string().parse::<Model>().unwrap(), model);
        }
    }
}
