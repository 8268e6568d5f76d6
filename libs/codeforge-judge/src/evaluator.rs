/// Verdict Aggregator - Judge-Agnostic Verdict Logic
///
/// **Core Responsibility:**
/// Reduce the ordered terminal per-test-case results into one overall
/// verdict: status, passed count, cumulative runtime, peak memory, and
/// the first failing case's diagnostic.
///
/// **Critical Properties:**
/// - Knows nothing about HTTP or the judge's wire format
/// - Knows nothing about Redis
/// - Pure function: (ordered terminal results) -> verdict
///
/// **Precedence Rules:**
/// - `error` dominates `wrong`; `wrong` dominates `accepted`
/// - Overall `accepted` only when every case is accepted
/// - Precedence is positional-order independent: one runtime error
///   anywhere forces overall `error`
/// - The first diagnostic of the winning severity is kept; later
///   failures never overwrite it
use codeforge_common::types::SubmissionStatus;

use crate::client::{TokenResult, STATUS_ACCEPTED, STATUS_COMPILE_ERROR, STATUS_RUNTIME_ERROR};
use crate::error::EvalError;

/// Aggregated outcome of one evaluation, before it is persisted or
/// returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub status: SubmissionStatus,
    pub test_cases_passed: u32,
    /// Sum of per-case runtimes, seconds
    pub runtime_secs: f64,
    /// Max of per-case peak memory, KB
    pub memory_kb: u64,
    pub error_message: Option<String>,
}

impl Verdict {
    /// Terminal verdict for an evaluation the judge never finished
    /// (dispatch failure, retry budget exhausted, wall-clock timeout).
    pub fn infrastructure_failure(err: &EvalError) -> Self {
        Self {
            status: SubmissionStatus::Error,
            test_cases_passed: 0,
            runtime_secs: 0.0,
            memory_kb: 0,
            error_message: Some(err.to_string()),
        }
    }
}

fn status_label(status_id: u32) -> &'static str {
    match status_id {
        STATUS_RUNTIME_ERROR => "runtime error",
        STATUS_COMPILE_ERROR => "compile error",
        _ => "rejected",
    }
}

/// Diagnostic for a non-accepted case: its stderr when the judge
/// captured any, otherwise a description naming the 1-based case index.
/// Never empty.
fn diagnostic(index: usize, result: &TokenResult) -> String {
    match result.stderr.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => format!("{} on test case {}", status_label(result.status_id), index + 1),
    }
}

/// Reduce ordered terminal results into the overall verdict.
///
/// Runtime and memory accumulate over accepted cases; when
/// `count_failed_case_stats` is set, failed cases' numbers are folded
/// in as well.
pub fn aggregate(results: &[TokenResult], count_failed_case_stats: bool) -> Verdict {
    let mut status = SubmissionStatus::Accepted;
    let mut test_cases_passed = 0u32;
    let mut runtime_secs = 0.0f64;
    let mut memory_kb = 0u64;
    let mut first_error: Option<String> = None;
    let mut first_wrong: Option<String> = None;

    for (index, result) in results.iter().enumerate() {
        debug_assert!(result.is_terminal(), "aggregate fed a non-terminal result");

        let accepted = result.status_id == STATUS_ACCEPTED;
        if accepted || count_failed_case_stats {
            let case_runtime = result
                .time
                .as_deref()
                .and_then(|t| t.parse::<f64>().ok())
                .unwrap_or(0.0);
            runtime_secs += case_runtime;
            memory_kb = memory_kb.max(result.memory.unwrap_or(0));
        }

        match result.status_id {
            STATUS_ACCEPTED => test_cases_passed += 1,
            STATUS_RUNTIME_ERROR | STATUS_COMPILE_ERROR => {
                status = SubmissionStatus::Error;
                if first_error.is_none() {
                    first_error = Some(diagnostic(index, result));
                }
            }
            _ => {
                if status != SubmissionStatus::Error {
                    status = SubmissionStatus::Wrong;
                }
                if first_wrong.is_none() {
                    first_wrong = Some(diagnostic(index, result));
                }
            }
        }
    }

    let error_message = match status {
        SubmissionStatus::Error => first_error,
        SubmissionStatus::Wrong => first_wrong,
        _ => None,
    };

    Verdict {
        status,
        test_cases_passed,
        runtime_secs,
        memory_kb,
        error_message,
    }
}
