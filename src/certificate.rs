use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::HistoryEntry;

/// Minimum percentage that earns a certificate.
pub const CERTIFICATE_THRESHOLD: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateEligibility {
    pub percentage: u32,
    pub eligible: bool,
}

/// The one eligibility rule, shared by the certificate listing and the
/// download gate. Percentages round half to even.
pub fn eligibility(score: u32, total: u32) -> CertificateEligibility {
    let percentage = if total > 0 {
        (f64::from(score) / f64::from(total) * 100.0).round_ties_even() as u32
    } else {
        0
    };

    CertificateEligibility {
        percentage,
        eligible: percentage >= CERTIFICATE_THRESHOLD,
    }
}

/// Downloadable certificate document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub user_name: String,
    pub quiz_subject: String,
    pub score: u32,
    pub date: String,
    pub certificate_id: String,
}

impl Certificate {
    /// Issue a certificate for a history entry, or `None` when it is below threshold.
    pub fn issue(entry: &HistoryEntry) -> Option<Self> {
        let result = eligibility(entry.score, entry.total_questions);
        if !result.eligible {
            return None;
        }

        Some(Self {
            user_name: entry.user_name.clone(),
            quiz_subject: entry.quiz.subject.clone(),
            score: result.percentage,
            date: entry.completed_at.format("%Y-%m-%d").to_string(),
            certificate_id: certificate_id(entry.id),
        })
    }
}

pub fn certificate_id(history_id: i64) -> String {
    format!("CERT-{:06}", history_id)
}

pub fn download_filename(subject: &str, completed_at: DateTime<Utc>) -> String {
    format!(
        "certificate_{}_{}.json",
        subject.to_lowercase().replace(' ', "_"),
        completed_at.format("%Y%m%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, QuizSummary};
    use chrono::TimeZone;

    fn entry(id: i64, score: u32, total_questions: u32) -> HistoryEntry {
        HistoryEntry {
            id,
            user_name: "alice".to_string(),
            quiz: QuizSummary {
                id: 1,
                subject: "World History".to_string(),
                difficulty: Difficulty::Medium,
            },
            score,
            total_questions,
            completed_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_eligibility_thresholds() {
        assert_eq!(
            eligibility(8, 10),
            CertificateEligibility { percentage: 80, eligible: true }
        );
        assert_eq!(
            eligibility(7, 10),
            CertificateEligibility { percentage: 70, eligible: false }
        );
        assert_eq!(
            eligibility(0, 0),
            CertificateEligibility { percentage: 0, eligible: false }
        );
        assert_eq!(eligibility(10, 10).percentage, 100);
    }

    #[test]
    fn test_eligibility_rounding() {
        assert_eq!(eligibility(2, 3).percentage, 67);
        assert_eq!(eligibility(1, 8).percentage, 12);
        assert_eq!(eligibility(3, 8).percentage, 38);
        assert_eq!(eligibility(5, 8).percentage, 62);
        assert!(!eligibility(3, 4).eligible);
    }

    #[test]
    fn test_issue_certificate() {
        let certificate = Certificate::issue(&entry(42, 9, 10)).unwrap();
        assert_eq!(certificate.certificate_id, "CERT-000042");
        assert_eq!(certificate.score, 90);
        assert_eq!(certificate.date, "2024-03-09");
        assert_eq!(certificate.quiz_subject, "World History");
        assert_eq!(certificate.user_name, "alice");

        assert!(Certificate::issue(&entry(43, 7, 10)).is_none());
        assert!(Certificate::issue(&entry(44, 0, 0)).is_none());
    }

    #[test]
    fn test_download_filename() {
        let completed_at = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        assert_eq!(
            download_filename("World History", completed_at),
            "certificate_world_history_20240309.json"
        );
    }
}
