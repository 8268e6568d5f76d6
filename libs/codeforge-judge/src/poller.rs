/// Result Poller - Bounded Wait for Terminal Results
///
/// **Core Responsibility:**
/// Query the judge for a batch of tokens until every one has reached a
/// terminal status, without ever waiting forever.
///
/// **Degradation Policy:**
/// - A failed or malformed poll consumes one unit of a consecutive-
///   failure budget and is retried with exponential backoff; a
///   successful poll refills the budget.
/// - Exhausting the budget raises `JudgeUnavailable`.
/// - The whole wait runs under a wall-clock timeout that raises
///   `EvaluationTimeout`.
///
/// The only suspension points are the sleeps, so dropping the future
/// (client disconnect, shutdown) cancels the wait without leaking a
/// task. Results are re-ordered by token before being returned, so the
/// caller can rely on results[i] matching tokens[i] even if the judge
/// answers in a different order.
use std::collections::HashMap;
use std::time::Duration;

use codeforge_common::config::EvalConfig;
use tracing::{debug, warn};

use crate::client::{JudgeService, TokenResult};
use crate::error::EvalError;

/// Wait until every token is terminal and return the results in token
/// order. See the module docs for the failure policy.
pub async fn poll_until_terminal<J: JudgeService + ?Sized>(
    judge: &J,
    tokens: &[String],
    config: &EvalConfig,
) -> Result<Vec<TokenResult>, EvalError> {
    match tokio::time::timeout(config.eval_timeout, poll_loop(judge, tokens, config)).await {
        Ok(result) => result,
        Err(_) => Err(EvalError::EvaluationTimeout {
            secs: config.eval_timeout.as_secs(),
        }),
    }
}

async fn poll_loop<J: JudgeService + ?Sized>(
    judge: &J,
    tokens: &[String],
    config: &EvalConfig,
) -> Result<Vec<TokenResult>, EvalError> {
    let mut consecutive_failures = 0u32;

    loop {
        let failure = match judge.poll_batch(tokens).await {
            Ok(results) => match order_by_tokens(tokens, results) {
                Some(ordered) => {
                    if ordered.iter().all(TokenResult::is_terminal) {
                        return Ok(ordered);
                    }
                    let pending = ordered.iter().filter(|r| !r.is_terminal()).count();
                    debug!(pending, total = tokens.len(), "batch still in progress");
                    consecutive_failures = 0;
                    tokio::time::sleep(config.poll_interval).await;
                    continue;
                }
                // A short or mismatched batch must never be read as
                // "all terminal"; treat it like a failed poll.
                None => "judge returned an incomplete or mismatched batch".to_string(),
            },
            Err(e) => e.to_string(),
        };

        consecutive_failures += 1;
        warn!(
            failures = consecutive_failures,
            budget = config.max_poll_failures,
            error = %failure,
            "poll attempt failed"
        );

        if consecutive_failures >= config.max_poll_failures {
            return Err(EvalError::JudgeUnavailable(format!(
                "giving up after {} consecutive poll failures: {}",
                consecutive_failures, failure
            )));
        }

        tokio::time::sleep(backoff_delay(config, consecutive_failures)).await;
    }
}

/// Exponential backoff: base * 2^(failures-1), capped.
fn backoff_delay(config: &EvalConfig, consecutive_failures: u32) -> Duration {
    let exponent = consecutive_failures.saturating_sub(1).min(10);
    config
        .poll_backoff_base
        .saturating_mul(1u32 << exponent)
        .min(config.poll_backoff_cap)
}

/// Re-order results to match the request's token order. Returns `None`
/// when any token is missing or duplicated, or the count is off.
fn order_by_tokens(tokens: &[String], results: Vec<TokenResult>) -> Option<Vec<TokenResult>> {
    if results.len() != tokens.len() {
        return None;
    }

    let mut by_token: HashMap<String, TokenResult> = results
        .into_iter()
        .map(|result| (result.token.clone(), result))
        .collect();

    tokens
        .iter()
        .map(|token| by_token.remove(token))
        .collect()
}
