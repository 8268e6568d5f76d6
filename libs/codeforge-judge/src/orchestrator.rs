/// Evaluation Orchestrator - High-Level Glue
///
/// **Responsibility:**
/// Compose resolver, dispatcher, poller, aggregator, and record layer
/// into the two entry points:
/// 1. `run_trial` - visible test cases, nothing persisted
/// 2. `submit` - hidden test cases, persisted, may mark the problem solved
///
/// This module is the glue layer - it knows nothing about:
/// - The judge's wire format (client's job)
/// - The failure/backoff policy (poller's job)
/// - Verdict precedence (evaluator's job)
///
/// Infrastructure failures (dispatch failure, retry budget exhausted,
/// wall-clock timeout) never escape as errors from the entry points;
/// they settle into a terminal `error` verdict with a diagnostic so the
/// caller never sees a pending or ambiguous state.
use codeforge_common::config::EvalConfig;
use codeforge_common::types::{Problem, Submission, SubmissionStatus, TestCase};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::{ExecutionRequest, JudgeService};
use crate::error::EvalError;
use crate::evaluator::{self, Verdict};
use crate::languages;
use crate::poller;
use crate::repo::SubmissionRepo;

/// Ephemeral result of a trial run; shaped like a submission row but
/// never persisted and carrying no identifier.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub problem_id: String,
    pub language: String,
    pub status: SubmissionStatus,
    pub test_cases_passed: u32,
    pub test_cases_total: u32,
    pub runtime_secs: f64,
    pub memory_kb: u64,
    pub error_message: Option<String>,
}

/// Evaluate source against the problem's visible test cases.
/// Side-effect-free apart from judge-service quota.
pub async fn run_trial<J: JudgeService>(
    judge: &J,
    problem: &Problem,
    source_code: &str,
    language: &str,
    config: &EvalConfig,
) -> Result<EvalReport, EvalError> {
    let language_id = languages::resolve(language)?;
    let cases = &problem.visible_test_cases;

    let verdict = settle(
        evaluate_cases(judge, language_id, source_code, cases, config).await,
        &problem.id,
    )?;

    Ok(EvalReport {
        problem_id: problem.id.clone(),
        language: language.to_string(),
        status: verdict.status,
        test_cases_passed: verdict.test_cases_passed,
        test_cases_total: cases.len() as u32,
        runtime_secs: verdict.runtime_secs,
        memory_kb: verdict.memory_kb,
        error_message: verdict.error_message,
    })
}

/// Evaluate source against the problem's hidden test cases and persist
/// the outcome. The row is created pending before dispatch and updated
/// exactly once with the terminal verdict; on full acceptance the
/// problem is added to the user's solved set (idempotently).
pub async fn submit<J: JudgeService, R: SubmissionRepo>(
    judge: &J,
    repo: &R,
    user_id: &str,
    problem: &Problem,
    source_code: &str,
    language: &str,
    config: &EvalConfig,
) -> Result<Submission, EvalError> {
    let language_id = languages::resolve(language)?;
    let cases = &problem.hidden_test_cases;

    let mut submission = Submission::pending(
        user_id,
        problem.id.clone(),
        language,
        source_code,
        cases.len() as u32,
    );
    repo.create_pending(&submission).await?;
    info!(
        submission_id = %submission.id,
        problem_id = %problem.id,
        user_id,
        test_cases = cases.len(),
        "submission created"
    );

    let verdict = settle(
        evaluate_cases(judge, language_id, source_code, cases, config).await,
        &problem.id,
    )?;

    apply_verdict(&mut submission, verdict);
    repo.finalize(&submission).await?;
    info!(
        submission_id = %submission.id,
        status = %submission.status,
        passed = submission.test_cases_passed,
        total = submission.test_cases_total,
        "submission recorded"
    );

    if submission.status == SubmissionStatus::Accepted {
        let newly_solved = repo.mark_solved(user_id, &problem.id).await?;
        if newly_solved {
            info!(user_id, problem_id = %problem.id, "problem marked solved");
        }
    }

    Ok(submission)
}

/// Dispatched -> Polling -> Aggregated, shared by both entry points.
async fn evaluate_cases<J: JudgeService>(
    judge: &J,
    language_id: u32,
    source_code: &str,
    cases: &[TestCase],
    config: &EvalConfig,
) -> Result<Verdict, EvalError> {
    let requests: Vec<ExecutionRequest> = cases
        .iter()
        .map(|case| ExecutionRequest {
            source_code: source_code.to_string(),
            language_id,
            stdin: case.input.clone(),
            expected_output: case.expected_output.clone(),
        })
        .collect();

    let tokens = judge.dispatch_batch(&requests).await?;
    // Verified here as well as in the client: token[i] <-> case[i] is
    // what the aggregator's per-case indexing stands on.
    if tokens.len() != requests.len() {
        return Err(EvalError::DispatchFailed(format!(
            "submitted {} requests, judge returned {} tokens",
            requests.len(),
            tokens.len()
        )));
    }
    debug!(tokens = tokens.len(), "batch dispatched");

    let results = poller::poll_until_terminal(judge, &tokens, config).await?;
    Ok(evaluator::aggregate(&results, config.count_failed_case_stats))
}

/// Fold infrastructure failures into a terminal error verdict; caller
/// errors keep propagating.
fn settle(result: Result<Verdict, EvalError>, problem_id: &str) -> Result<Verdict, EvalError> {
    match result {
        Ok(verdict) => Ok(verdict),
        Err(e) if e.is_infrastructure() => {
            warn!(problem_id, error = %e, "evaluation failed before aggregation");
            Ok(Verdict::infrastructure_failure(&e))
        }
        Err(e) => Err(e),
    }
}

fn apply_verdict(submission: &mut Submission, verdict: Verdict) {
    submission.status = verdict.status;
    submission.test_cases_passed = verdict.test_cases_passed;
    submission.runtime_secs = verdict.runtime_secs;
    submission.memory_kb = verdict.memory_kb;
    submission.error_message = verdict.error_message;
    submission.updated_at = chrono::Utc::now();
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::client::{TokenResult, STATUS_ACCEPTED, STATUS_PROCESSING, STATUS_RUNTIME_ERROR};

    /// Judge stub that tags each token with its request index, so
    /// ordering bugs anywhere in the pipeline surface in the verdict.
    struct StubJudge {
        outcomes: Vec<u32>,
        fail_dispatch: bool,
        fail_polls: bool,
        pending_polls: u32,
        reverse_results: bool,
        dispatch_calls: AtomicUsize,
        poll_calls: AtomicUsize,
    }

    impl StubJudge {
        fn with_outcomes(outcomes: Vec<u32>) -> Self {
            Self {
                outcomes,
                fail_dispatch: false,
                fail_polls: false,
                pending_polls: 0,
                reverse_results: false,
                dispatch_calls: AtomicUsize::new(0),
                poll_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl JudgeService for StubJudge {
        async fn dispatch_batch(
            &self,
            requests: &[ExecutionRequest],
        ) -> Result<Vec<String>, EvalError> {
            self.dispatch_calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_dispatch {
                return Err(EvalError::DispatchFailed(
                    "judge rejected the batch".to_string(),
                ));
            }
            Ok((0..requests.len()).map(|i| format!("tok-{i}")).collect())
        }

        async fn poll_batch(&self, tokens: &[String]) -> Result<Vec<TokenResult>, EvalError> {
            let call = self.poll_calls.fetch_add(1, Ordering::Relaxed) as u32;
            if self.fail_polls {
                return Err(EvalError::JudgeUnavailable("connection refused".to_string()));
            }
            if call < self.pending_polls {
                return Ok(tokens
                    .iter()
                    .map(|t| TokenResult {
                        token: t.clone(),
                        status_id: STATUS_PROCESSING,
                        stdout: None,
                        stderr: None,
                        time: None,
                        memory: None,
                    })
                    .collect());
            }

            let mut results: Vec<TokenResult> = tokens
                .iter()
                .map(|t| {
                    let index: usize = t.trim_start_matches("tok-").parse().unwrap();
                    let status_id = self.outcomes[index];
                    TokenResult {
                        token: t.clone(),
                        status_id,
                        stdout: Some(format!("out-{index}")),
                        stderr: if status_id == STATUS_ACCEPTED {
                            None
                        } else {
                            Some(format!("case {index} blew up"))
                        },
                        time: Some("0.1".to_string()),
                        memory: Some(1024 * (index as u64 + 1)),
                    }
                })
                .collect();
            if self.reverse_results {
                results.reverse();
            }
            Ok(results)
        }
    }

    #[derive(Default)]
    struct MemoryRepo {
        rows: Mutex<HashMap<Uuid, Submission>>,
        solved: Mutex<HashSet<(String, String)>>,
        statuses_at_create: Mutex<Vec<SubmissionStatus>>,
        finalize_calls: AtomicUsize,
    }

    #[async_trait]
    impl SubmissionRepo for MemoryRepo {
        async fn create_pending(&self, submission: &Submission) -> Result<(), EvalError> {
            self.statuses_at_create
                .lock()
                .unwrap()
                .push(submission.status);
            self.rows
                .lock()
                .unwrap()
                .insert(submission.id, submission.clone());
            Ok(())
        }

        async fn finalize(&self, submission: &Submission) -> Result<(), EvalError> {
            self.finalize_calls.fetch_add(1, Ordering::Relaxed);
            self.rows
                .lock()
                .unwrap()
                .insert(submission.id, submission.clone());
            Ok(())
        }

        async fn fetch(&self, id: &Uuid) -> Result<Option<Submission>, EvalError> {
            Ok(self.rows.lock().unwrap().get(id).cloned())
        }

        async fn mark_solved(&self, user_id: &str, problem_id: &str) -> Result<bool, EvalError> {
            Ok(self
                .solved
                .lock()
                .unwrap()
                .insert((user_id.to_string(), problem_id.to_string())))
        }
    }

    fn problem(visible: usize, hidden: usize) -> Problem {
        let case = |i: usize| TestCase {
            input: format!("in-{i}"),
            expected_output: format!("out-{i}"),
        };
        Problem {
            id: "two-sum".to_string(),
            title: "Two Sum".to_string(),
            visible_test_cases: (0..visible).map(case).collect(),
            hidden_test_cases: (0..hidden).map(case).collect(),
        }
    }

    const SOURCE: &str = "int main() { return 0; }";

    #[tokio::test]
    async fn test_submit_all_accepted_marks_solved() {
        let judge = StubJudge::with_outcomes(vec![STATUS_ACCEPTED; 3]);
        let repo = MemoryRepo::default();
        let problem = problem(1, 3);

        let submission = submit(
            &judge,
            &repo,
            "user-1",
            &problem,
            SOURCE,
            "cpp",
            &EvalConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Accepted);
        assert_eq!(submission.test_cases_passed, 3);
        assert_eq!(submission.test_cases_total, 3);

        // row was created pending, then finalized exactly once
        assert_eq!(
            *repo.statuses_at_create.lock().unwrap(),
            vec![SubmissionStatus::Pending]
        );
        assert_eq!(repo.finalize_calls.load(Ordering::Relaxed), 1);
        let stored = repo.fetch(&submission.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubmissionStatus::Accepted);

        assert_eq!(repo.solved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resubmitting_solved_problem_is_idempotent() {
        let judge = StubJudge::with_outcomes(vec![STATUS_ACCEPTED; 2]);
        let repo = MemoryRepo::default();
        let problem = problem(1, 2);
        let config = EvalConfig::default();

        for _ in 0..2 {
            let submission = submit(&judge, &repo, "user-1", &problem, SOURCE, "cpp", &config)
                .await
                .unwrap();
            assert_eq!(submission.status, SubmissionStatus::Accepted);
        }

        assert_eq!(repo.solved.lock().unwrap().len(), 1);
        // both submissions kept their own rows
        assert_eq!(repo.rows.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_wrong_answer_does_not_touch_solved_set() {
        let judge = StubJudge::with_outcomes(vec![STATUS_ACCEPTED, 5]);
        let repo = MemoryRepo::default();

        let submission = submit(
            &judge,
            &repo,
            "user-1",
            &problem(1, 2),
            SOURCE,
            "java",
            &EvalConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Wrong);
        assert_eq!(submission.test_cases_passed, 1);
        assert!(submission.error_message.is_some());
        assert!(repo.solved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_language_rejected_before_dispatch() {
        let judge = StubJudge::with_outcomes(vec![STATUS_ACCEPTED]);
        let repo = MemoryRepo::default();

        let err = submit(
            &judge,
            &repo,
            "user-1",
            &problem(1, 1),
            SOURCE,
            "brainfuck",
            &EvalConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EvalError::UnsupportedLanguage { .. }));
        assert_eq!(judge.dispatch_calls.load(Ordering::Relaxed), 0);
        assert!(repo.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_settles_into_error_submission() {
        let mut judge = StubJudge::with_outcomes(vec![STATUS_ACCEPTED]);
        judge.fail_dispatch = true;
        let repo = MemoryRepo::default();

        let submission = submit(
            &judge,
            &repo,
            "user-1",
            &problem(1, 1),
            SOURCE,
            "cpp",
            &EvalConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Error);
        assert!(submission.status.is_terminal());
        let message = submission.error_message.as_deref().unwrap();
        assert!(!message.is_empty());
        assert_eq!(repo.finalize_calls.load(Ordering::Relaxed), 1);
        assert!(repo.solved.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_exhaustion_settles_into_error_submission() {
        let mut judge = StubJudge::with_outcomes(vec![STATUS_ACCEPTED]);
        judge.fail_polls = true;
        let repo = MemoryRepo::default();

        let submission = submit(
            &judge,
            &repo,
            "user-1",
            &problem(1, 1),
            SOURCE,
            "cpp",
            &EvalConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Error);
        assert!(submission
            .error_message
            .as_deref()
            .unwrap()
            .contains("poll failures"));
    }

    #[tokio::test]
    async fn test_trial_run_reports_without_persisting() {
        let judge = StubJudge::with_outcomes(vec![STATUS_ACCEPTED, STATUS_RUNTIME_ERROR]);
        let problem = problem(2, 5);

        let report = run_trial(&judge, &problem, SOURCE, "js", &EvalConfig::default())
            .await
            .unwrap();

        // trial uses the visible subset, not the hidden superset
        assert_eq!(report.test_cases_total, 2);
        assert_eq!(report.status, SubmissionStatus::Error);
        assert_eq!(report.test_cases_passed, 1);
        assert_eq!(report.error_message.as_deref(), Some("case 1 blew up"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_through_processing_polls() {
        let mut judge = StubJudge::with_outcomes(vec![STATUS_ACCEPTED; 2]);
        judge.pending_polls = 3;
        let repo = MemoryRepo::default();

        let submission = submit(
            &judge,
            &repo,
            "user-1",
            &problem(1, 2),
            SOURCE,
            "cpp",
            &EvalConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Accepted);
        assert_eq!(judge.poll_calls.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn test_shuffled_judge_results_still_map_to_cases() {
        // both cases fail with distinct diagnostics; first-error-wins
        // would pick the wrong one if ordering were not restored
        let mut judge = StubJudge::with_outcomes(vec![STATUS_RUNTIME_ERROR, STATUS_RUNTIME_ERROR]);
        judge.reverse_results = true;
        let repo = MemoryRepo::default();

        let submission = submit(
            &judge,
            &repo,
            "user-1",
            &problem(1, 2),
            SOURCE,
            "cpp",
            &EvalConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Error);
        assert_eq!(
            submission.error_message.as_deref(),
            Some("case 0 blew up")
        );
    }
}
