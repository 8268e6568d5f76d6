mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codeforge-cli")]
#[command(about = "CodeForge CLI - Run code against the judge service without the API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a source file against one test case as a trial run
    Run {
        /// Path to the source file
        #[arg(short, long)]
        source: PathBuf,

        /// Language name (e.g. cpp, java, javascript)
        #[arg(short, long)]
        language: String,

        /// Path to the stdin fed to the program
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the expected output
        #[arg(short, long)]
        expected: PathBuf,

        /// Judge service base URL (defaults to JUDGE_URL)
        #[arg(long)]
        judge_url: Option<String>,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the supported languages and their judge ids
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            language,
            input,
            expected,
            judge_url,
            json,
        } => {
            commands::run(
                &source,
                &language,
                &input,
                &expected,
                judge_url.as_deref(),
                json,
            )
            .await
        }
        Commands::Languages => {
            commands::list_languages();
            Ok(())
        }
    }
}
