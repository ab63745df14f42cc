//! Core of an AI-assisted quiz app: streamed question generation, the quiz
//! session state machine, navigation, and persistence of attempts and courses.

pub mod app;
pub mod config;
pub mod course;
pub mod error;
pub mod quiz;
pub mod store;

pub use app::QuizApp;
pub use config::{Config, Model, QuizSettings};
pub use error::QuizError;
