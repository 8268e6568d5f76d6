// Persistence seam for graded submissions.
//
// The orchestrator only sees this trait; the Redis implementation
// delegates to the shared document helpers in codeforge-common.

use async_trait::async_trait;
use codeforge_common::redis as store;
use codeforge_common::types::Submission;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::error::EvalError;

#[async_trait]
pub trait SubmissionRepo: Send + Sync {
    /// Persist the pending row before dispatch, so a crash mid-flight
    /// leaves an auditable record.
    async fn create_pending(&self, submission: &Submission) -> Result<(), EvalError>;

    /// The single in-place update with the terminal verdict.
    async fn finalize(&self, submission: &Submission) -> Result<(), EvalError>;

    async fn fetch(&self, id: &Uuid) -> Result<Option<Submission>, EvalError>;

    /// Atomic add-if-absent on the user's solved set; `true` only when
    /// the problem was newly added.
    async fn mark_solved(&self, user_id: &str, problem_id: &str) -> Result<bool, EvalError>;
}

pub struct RedisSubmissionRepo {
    conn: ConnectionManager,
}

impl RedisSubmissionRepo {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SubmissionRepo for RedisSubmissionRepo {
    async fn create_pending(&self, submission: &Submission) -> Result<(), EvalError> {
        let mut conn = self.conn.clone();
        Ok(store::store_submission(&mut conn, submission).await?)
    }

    async fn finalize(&self, submission: &Submission) -> Result<(), EvalError> {
        let mut conn = self.conn.clone();
        Ok(store::store_submission(&mut conn, submission).await?)
    }

    async fn fetch(&self, id: &Uuid) -> Result<Option<Submission>, EvalError> {
        let mut conn = self.conn.clone();
        Ok(store::get_submission(&mut conn, id).await?)
    }

    async fn mark_solved(&self, user_id: &str, problem_id: &str) -> Result<bool, EvalError> {
        let mut conn = self.conn.clone();
        Ok(store::add_solved(&mut conn, user_id, problem_id).await?)
    }
}
