use thiserror::Error;

/// Failure taxonomy of the evaluation pipeline.
///
/// The first two variants are caller errors and surface as 4xx at the
/// HTTP edge. The three infrastructure variants are folded into a
/// terminal `error` verdict with a diagnostic instead of propagating,
/// so an entry point never returns with the submission still pending.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unsupported language: {name}")]
    UnsupportedLanguage { name: String },

    #[error("problem not found: {id}")]
    ProblemNotFound { id: String },

    #[error("judge dispatch failed: {0}")]
    DispatchFailed(String),

    #[error("judge unavailable: {0}")]
    JudgeUnavailable(String),

    #[error("evaluation timed out after {secs}s")]
    EvaluationTimeout { secs: u64 },

    #[error("store error: {0}")]
    Store(String),
}

impl EvalError {
    /// True for failures of the judge service itself, which resolve to
    /// a submission status of `error` rather than an HTTP error.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            EvalError::DispatchFailed(_)
                | EvalError::JudgeUnavailable(_)
                | EvalError::EvaluationTimeout { .. }
        )
    }
}

impl From<redis::RedisError> for EvalError {
    fn from(e: redis::RedisError) -> Self {
        EvalError::Store(e.to_string())
    }
}
