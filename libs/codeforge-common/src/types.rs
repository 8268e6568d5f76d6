use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

/// Problem document as stored in the catalog. Read-only to the
/// evaluation pipeline; authoring and validation happen elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub title: String,
    pub visible_test_cases: Vec<TestCase>,
    pub hidden_test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Accepted,
    Wrong,
    Error,
}

impl SubmissionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::Wrong => "wrong",
            SubmissionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Persisted record of one graded submission.
///
/// Created in `Pending` state before the batch is dispatched to the
/// judge, then updated exactly once with the terminal verdict.
/// `runtime_secs` is the sum over accepted cases, `memory_kb` the max.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub user_id: String,
    pub problem_id: String,
    pub language: String,
    pub source_code: String,
    pub status: SubmissionStatus,
    pub test_cases_passed: u32,
    pub test_cases_total: u32,
    pub runtime_secs: f64,
    pub memory_kb: u64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// Build the pending row that is persisted before dispatch.
    /// `test_cases_total` is fixed here and never changes afterwards.
    pub fn pending(
        user_id: impl Into<String>,
        problem_id: impl Into<String>,
        language: impl Into<String>,
        source_code: impl Into<String>,
        test_cases_total: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            problem_id: problem_id.into(),
            language: language.into(),
            source_code: source_code.into(),
            status: SubmissionStatus::Pending,
            test_cases_passed: 0,
            test_cases_total,
            runtime_secs: 0.0,
            memory_kb: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}
