use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quiz difficulty as accepted by the generation trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(anyhow::anyhow!(
                "'{}' is not a valid difficulty (expected easy, medium or hard)",
                other
            )),
        }
    }
}

/// Transient request for a new quiz, built by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizRequest {
    pub subject: String,
    pub difficulty: Difficulty,
    pub count: u32,
}

/// A question/answer pair as produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    #[serde(deserialize_with = "scalar_as_string")]
    pub text: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub answer: String,
}

/// Numbers and booleans are kept in their text form (`4` becomes `"4"`).
fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, number or boolean, found {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeResult {
    pub score: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub subject: String,
    pub difficulty: Difficulty,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: i64,
    pub subject: String,
    pub difficulty: Difficulty,
}

/// A stored quiz attempt joined with the quiz it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub user_name: String,
    pub quiz: QuizSummary,
    pub score: u32,
    pub total_questions: u32,
    pub completed_at: DateTime<Utc>,
}

/// History entry with the derived eligibility fields, recomputed on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryView {
    #[serde(flatten)]
    pub entry: HistoryEntry,
    pub score_percentage: u32,
    pub has_certificate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub score: u32,
    pub total: u32,
    pub history_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateQuizRequest {
    pub subject: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswersRequest {
    #[serde(default)]
    pub answers: Vec<String>,
}

/// Outcome of the Connectivity Probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub ok: bool,
    pub message: String,
}
