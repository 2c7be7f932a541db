//! Turns a provider reply into a canonical question list.
//!
//! Parsing is a tagged choice between two accepted shapes; every other
//! outcome (transport failure, invalid JSON, unexpected shape) becomes a
//! [`GenerationError`] and is converted into sentinel questions here and
//! nowhere else.

use serde_json::Value;
use tracing::{debug, warn};

use crate::llm_providers::{JsonResponseParser, ProviderError};
use crate::models::GeneratedQuestion;

pub const SENTINEL_ANSWER: &str = "Sample answer";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Failed to parse quiz JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Shape(String),
}

/// The reply shapes accepted from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedQuiz {
    /// `{"questions": [...]}`
    Wrapped(Vec<GeneratedQuestion>),
    /// A bare top-level array, for providers that skip the wrapper key
    Bare(Vec<GeneratedQuestion>),
}

impl ParsedQuiz {
    pub fn into_questions(self) -> Vec<GeneratedQuestion> {
        match self {
            ParsedQuiz::Wrapped(questions) | ParsedQuiz::Bare(questions) => questions,
        }
    }
}

pub fn parse_quiz_payload(raw: &str) -> Result<ParsedQuiz, GenerationError> {
    // Fences are only stripped when the reply is not already valid JSON, since
    // question text may itself mention ``` markers.
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(_) => serde_json::from_str(&JsonResponseParser::extract_json_from_response(raw))?,
    };

    match value {
        Value::Object(mut map) => match map.remove("questions") {
            Some(items @ Value::Array(_)) => Ok(ParsedQuiz::Wrapped(questions_from(items)?)),
            Some(_) => Err(GenerationError::Shape(
                "'questions' is present but is not a list".to_string(),
            )),
            None => {
                warn!(
                    keys = ?map.keys().collect::<Vec<_>>(),
                    "No 'questions' key found in provider reply"
                );
                Err(GenerationError::Shape("Response format not recognized".to_string()))
            }
        },
        items @ Value::Array(_) => Ok(ParsedQuiz::Bare(questions_from(items)?)),
        _ => Err(GenerationError::Shape("Response format not recognized".to_string())),
    }
}

fn questions_from(items: Value) -> Result<Vec<GeneratedQuestion>, GenerationError> {
    serde_json::from_value(items)
        .map_err(|e| GenerationError::Shape(format!("Question entries are malformed: {}", e)))
}

/// Resolve a provider outcome into questions. Never fails: on any error the
/// caller receives `count` sentinel questions instead.
///
/// Successful parses are returned as produced, without truncating or padding
/// to `count`.
pub fn normalize(
    raw: Result<String, ProviderError>,
    subject: &str,
    count: usize,
) -> Vec<GeneratedQuestion> {
    let parsed = raw
        .map_err(GenerationError::from)
        .and_then(|content| {
            debug!(
                raw_response = %content.chars().take(200).collect::<String>(),
                "Raw provider reply for quiz generation"
            );
            parse_quiz_payload(&content)
        });

    match parsed {
        Ok(quiz) => {
            let questions = quiz.into_questions();
            if questions.len() != count {
                debug!(
                    requested = count,
                    received = questions.len(),
                    "Provider returned a different number of questions than requested"
                );
            }
            questions
        }
        Err(e) => {
            warn!(subject = %subject, error = %e, "Quiz generation failed, using sentinel questions");
            fallback_questions(subject, count, &e)
        }
    }
}

pub fn fallback_questions(
    subject: &str,
    count: usize,
    error: &GenerationError,
) -> Vec<GeneratedQuestion> {
    let sentinel = GeneratedQuestion {
        text: format!("Sample question about {} (Error occurred: {})", subject, error),
        answer: SENTINEL_ANSWER.to_string(),
    };
    vec![sentinel; count]
}
