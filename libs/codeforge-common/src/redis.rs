use crate::types::{Problem, Submission};
use redis::{AsyncCommands, RedisResult};
use uuid::Uuid;

/// Redis document layout - defines only key semantics, not runtime logic.
/// Keeps the API and CLI agreeing on where documents live and makes
/// every key deterministic.

pub const PROBLEM_PREFIX: &str = "codeforge:problem";
pub const SUBMISSION_PREFIX: &str = "codeforge:submission";
pub const SOLVED_PREFIX: &str = "codeforge:solved";

/// Key holding one problem document
pub fn problem_key(problem_id: &str) -> String {
    format!("{}:{}", PROBLEM_PREFIX, problem_id)
}

/// Key holding one submission row
pub fn submission_key(submission_id: &Uuid) -> String {
    format!("{}:{}", SUBMISSION_PREFIX, submission_id)
}

/// Key of the per-user solved set
pub fn solved_key(user_id: &str) -> String {
    format!("{}:{}", SOLVED_PREFIX, user_id)
}

fn serde_err(e: serde_json::Error, what: &'static str) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, what, e.to_string()))
}

/// Fetch a problem document; `None` means the id is unknown
pub async fn get_problem(
    conn: &mut redis::aio::ConnectionManager,
    problem_id: &str,
) -> RedisResult<Option<Problem>> {
    let payload: Option<String> = conn.get(problem_key(problem_id)).await?;

    match payload {
        Some(data) => {
            let problem: Problem =
                serde_json::from_str(&data).map_err(|e| serde_err(e, "deserialization error"))?;
            Ok(Some(problem))
        }
        None => Ok(None),
    }
}

/// Persist a submission row. Used both for the initial pending write
/// and for the single terminal update; the row is keyed by id so the
/// update overwrites in place.
pub async fn store_submission(
    conn: &mut redis::aio::ConnectionManager,
    submission: &Submission,
) -> RedisResult<()> {
    let payload =
        serde_json::to_string(submission).map_err(|e| serde_err(e, "serialization error"))?;
    let _: () = conn.set(submission_key(&submission.id), payload).await?;
    Ok(())
}

/// Retrieve a submission row by id
pub async fn get_submission(
    conn: &mut redis::aio::ConnectionManager,
    submission_id: &Uuid,
) -> RedisResult<Option<Submission>> {
    let payload: Option<String> = conn.get(submission_key(submission_id)).await?;

    match payload {
        Some(data) => {
            let submission: Submission =
                serde_json::from_str(&data).map_err(|e| serde_err(e, "deserialization error"))?;
            Ok(Some(submission))
        }
        None => Ok(None),
    }
}

/// Add a problem to the user's solved set.
///
/// SADD is atomic on the server, so two concurrent accepted submissions
/// for the same problem cannot duplicate the entry or lose an update.
/// Returns `true` only when the problem was newly added.
pub async fn add_solved(
    conn: &mut redis::aio::ConnectionManager,
    user_id: &str,
    problem_id: &str,
) -> RedisResult<bool> {
    let added: i64 = conn.sadd(solved_key(user_id), problem_id).await?;
    Ok(added == 1)
}
