use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Instant;

use crate::models::*;

// Import logging macros
use crate::log_db_operation;

const HISTORY_SELECT: &str = r#"
    SELECT h.id, h.user_name, h.quiz_id, h.score, h.completed_at,
           q.subject, q.difficulty,
           (SELECT COUNT(*) FROM questions WHERE questions.quiz_id = q.id) AS total_questions
    FROM quiz_history h
    JOIN quizzes q ON q.id = h.quiz_id
"#;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database sees its own empty database,
        // so those pools are pinned to one connection that never expires.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        let db = Database { pool };
        db.migrate().await?;
        log_db_operation!(info, "migrate", "database initialized");
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quizzes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject TEXT NOT NULL,
                difficulty TEXT NOT NULL DEFAULT 'medium',
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                quiz_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quiz_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_name TEXT NOT NULL,
                quiz_id INTEGER NOT NULL,
                score INTEGER NOT NULL,
                completed_at TEXT NOT NULL,
                FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_questions_quiz ON questions(quiz_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_history_user ON quiz_history(user_name)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // Quiz operations

    /// Store a quiz and its questions in one transaction.
    pub async fn create_quiz(
        &self,
        subject: &str,
        difficulty: Difficulty,
        questions: &[GeneratedQuestion],
    ) -> Result<Quiz> {
        let started = Instant::now();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let quiz_id = sqlx::query(
            "INSERT INTO quizzes (subject, difficulty, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(subject)
        .bind(difficulty.as_str())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let mut stored = Vec::with_capacity(questions.len());
        for question in questions {
            let question_id = sqlx::query(
                "INSERT INTO questions (quiz_id, text, answer, created_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(quiz_id)
            .bind(&question.text)
            .bind(&question.answer)
            .bind(now.to_rfc3339())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            stored.push(Question {
                id: question_id,
                text: question.text.clone(),
                answer: question.answer.clone(),
            });
        }

        tx.commit().await?;

        log_db_operation!(
            debug,
            "create_quiz",
            quiz_id = quiz_id,
            duration_ms = started.elapsed().as_millis() as u64
        );

        Ok(Quiz {
            id: quiz_id,
            subject: subject.to_string(),
            difficulty,
            created_at: now,
            questions: stored,
        })
    }

    pub async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>> {
        let row = sqlx::query("SELECT * FROM quizzes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let questions = self.get_questions(id).await?;
                Ok(Some(row_to_quiz(&row, questions)?))
            }
            None => Ok(None),
        }
    }

    pub async fn get_all_quizzes(&self) -> Result<Vec<Quiz>> {
        let rows = sqlx::query("SELECT * FROM quizzes ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await?;

        let mut quizzes = Vec::with_capacity(rows.len());
        for row in rows {
            let questions = self.get_questions(row.get("id")).await?;
            quizzes.push(row_to_quiz(&row, questions)?);
        }

        log_db_operation!(debug, "get_all_quizzes", count = quizzes.len());
        Ok(quizzes)
    }

    async fn get_questions(&self, quiz_id: i64) -> Result<Vec<Question>> {
        let rows = sqlx::query("SELECT id, text, answer FROM questions WHERE quiz_id = ?1 ORDER BY id")
            .bind(quiz_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Question {
                id: row.get("id"),
                text: row.get("text"),
                answer: row.get("answer"),
            })
            .collect())
    }

    /// Stored answers for a quiz in question order, or `None` if the quiz does not exist.
    pub async fn get_correct_answers(&self, quiz_id: i64) -> Result<Option<Vec<String>>> {
        let exists = sqlx::query("SELECT id FROM quizzes WHERE id = ?1")
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        if !exists {
            return Ok(None);
        }

        let answers = sqlx::query("SELECT answer FROM questions WHERE quiz_id = ?1 ORDER BY id")
            .bind(quiz_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| row.get::<String, _>("answer"))
            .collect();

        Ok(Some(answers))
    }

    // History operations

    pub async fn create_history(&self, user_name: &str, quiz_id: i64, score: u32) -> Result<i64> {
        let history_id = sqlx::query(
            "INSERT INTO quiz_history (user_name, quiz_id, score, completed_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(user_name)
        .bind(quiz_id)
        .bind(i64::from(score))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(history_id)
    }

    pub async fn get_history_for_user(&self, user_name: &str) -> Result<Vec<HistoryEntry>> {
        let query = format!(
            "{} WHERE h.user_name = ?1 ORDER BY h.completed_at DESC, h.id DESC",
            HISTORY_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(user_name)
            .fetch_all(&self.pool)
            .await?;

        let entries = rows.iter().map(row_to_history).collect::<Result<Vec<_>>>()?;
        log_db_operation!(debug, "get_history_for_user", count = entries.len());
        Ok(entries)
    }

    /// A history entry, only if it belongs to the given user.
    pub async fn get_history_entry(&self, user_name: &str, id: i64) -> Result<Option<HistoryEntry>> {
        let query = format!("{} WHERE h.id = ?1 AND h.user_name = ?2", HISTORY_SELECT);
        let row = sqlx::query(&query)
            .bind(id)
            .bind(user_name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_history).transpose()
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn row_to_quiz(row: &SqliteRow, questions: Vec<Question>) -> Result<Quiz> {
    Ok(Quiz {
        id: row.get("id"),
        subject: row.get("subject"),
        difficulty: row.get::<String, _>("difficulty").parse()?,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        questions,
    })
}

fn row_to_history(row: &SqliteRow) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.get("id"),
        user_name: row.get("user_name"),
        quiz: QuizSummary {
            id: row.get("quiz_id"),
            subject: row.get("subject"),
            difficulty: row.get::<String, _>("difficulty").parse()?,
        },
        score: u32::try_from(row.get::<i64, _>("score"))?,
        total_questions: u32::try_from(row.get::<i64, _>("total_questions"))?,
        completed_at: parse_timestamp(&row.get::<String, _>("completed_at"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions() -> Vec<GeneratedQuestion> {
        vec![
            GeneratedQuestion {
                text: "What is the capital of France?".to_string(),
                answer: "Paris".to_string(),
            },
            GeneratedQuestion {
                text: "What is 2 + 2?".to_string(),
                answer: "4".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_create_and_fetch_quiz() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let quiz = db.create_quiz("Geography", Difficulty::Easy, &questions()).await.unwrap();
        assert_eq!(quiz.questions.len(), 2);

        let fetched = db.get_quiz(quiz.id).await.unwrap().unwrap();
        assert_eq!(fetched.subject, "Geography");
        assert_eq!(fetched.difficulty, Difficulty::Easy);
        assert_eq!(fetched.questions[0].answer, "Paris");

        assert!(db.get_quiz(quiz.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_correct_answers_in_question_order() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let quiz = db.create_quiz("Geography", Difficulty::Easy, &questions()).await.unwrap();

        let answers = db.get_correct_answers(quiz.id).await.unwrap().unwrap();
        assert_eq!(answers, vec!["Paris".to_string(), "4".to_string()]);
        assert!(db.get_correct_answers(9999).await.unwrap().is_none());

        let empty = db.create_quiz("Nothing", Difficulty::Hard, &[]).await.unwrap();
        assert_eq!(db.get_correct_answers(empty.id).await.unwrap(), Some(vec![]));
    }

    #[tokio::test]
    async fn test_history_is_scoped_to_user() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let quiz = db.create_quiz("Geography", Difficulty::Medium, &questions()).await.unwrap();

        let alice_entry = db.create_history("alice", quiz.id, 2).await.unwrap();
        db.create_history("bob", quiz.id, 1).await.unwrap();

        let history = db.get_history_for_user("alice").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].score, 2);
        assert_eq!(history[0].total_questions, 2);
        assert_eq!(history[0].quiz.subject, "Geography");

        assert!(db.get_history_entry("alice", alice_entry).await.unwrap().is_some());
        assert!(db.get_history_entry("bob", alice_entry).await.unwrap().is_none());
    }
}
