// CLI commands for poking the evaluation pipeline
use anyhow::{Context, Result};
use codeforge_common::config::EvalConfig;
use codeforge_common::types::{Problem, TestCase};
use codeforge_judge::client::Judge0Client;
use codeforge_judge::{languages, orchestrator};
use std::fs;
use std::path::Path;

/// Trial-run a single source file against one test case, straight
/// through the orchestrator (no API server involved).
pub async fn run(
    source: &Path,
    language: &str,
    input: &Path,
    expected: &Path,
    judge_url: Option<&str>,
    json: bool,
) -> Result<()> {
    let source_code = fs::read_to_string(source)
        .with_context(|| format!("Failed to read source file {}", source.display()))?;
    let stdin = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file {}", input.display()))?;
    let expected_output = fs::read_to_string(expected)
        .with_context(|| format!("Failed to read expected-output file {}", expected.display()))?;

    let mut config = EvalConfig::from_env();
    if let Some(url) = judge_url {
        config.judge_url = url.to_string();
    }

    let judge = Judge0Client::new(&config);
    let problem = Problem {
        id: "adhoc".to_string(),
        title: "Ad-hoc trial".to_string(),
        visible_test_cases: vec![TestCase {
            input: stdin,
            expected_output,
        }],
        hidden_test_cases: Vec::new(),
    };

    if !json {
        println!("→ Dispatching 1 test case to {}", config.judge_url);
    }

    let report = orchestrator::run_trial(&judge, &problem, &source_code, language, &config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("Status:       {}", report.status);
    println!(
        "Cases passed: {}/{}",
        report.test_cases_passed, report.test_cases_total
    );
    println!("Runtime:      {:.3}s", report.runtime_secs);
    println!("Peak memory:  {} KB", report.memory_kb);
    if let Some(message) = &report.error_message {
        println!("Diagnostic:   {}", message);
    }

    Ok(())
}

/// Print the language table
pub fn list_languages() {
    println!("Supported languages:");
    for name in languages::supported_names() {
        if let Ok(id) = languages::resolve(name) {
            println!("  {:<12} -> {}", name, id);
        }
    }
}
