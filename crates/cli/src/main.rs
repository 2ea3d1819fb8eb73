//! `wfid` - scheduler-facing front end for the subject deletion action.
//!
//! The hosting scheduler execs one subcommand per lifecycle entry point and
//! reads the result record from stdout; logs go to stderr. Exit codes encode
//! the classification for `invoke`: 0 success, 2 retryable failure, 1 fatal
//! failure. `error` and `halt` report and exit 0.

use std::collections::HashMap;
use std::io::Read as _;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use wfid_action::{ExecutionContext, InvocationParams};

/// Exit code telling the scheduler to retry with backoff.
const EXIT_RETRYABLE: u8 = 2;
/// Exit code for failures that must not be retried.
const EXIT_FATAL: u8 = 1;

/// Workforce-pool subject deletion action
#[derive(Parser)]
#[command(name = "wfid")]
#[command(about = "Idempotent workforce-pool subject deletion action")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Invocation params JSON file ("-" reads stdin)
    #[arg(long, global = true)]
    params_file: Option<PathBuf>,

    /// Inline invocation params JSON
    #[arg(long, global = true, conflicts_with = "params_file")]
    params: Option<String>,

    /// Execution context JSON file with {secrets, env, outputs};
    /// defaults to the process environment
    #[arg(long, global = true)]
    context_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, authenticate, and delete the subject (one attempt)
    Invoke,

    /// Report a previously classified failure as a normalized record
    Error {
        /// Message of the classified failure
        #[arg(long)]
        message: String,

        /// Whether the failure was classified retryable
        #[arg(long)]
        retryable: bool,
    },

    /// Acknowledge cancellation without contacting the network
    Halt {
        /// Why the invocation was halted
        #[arg(long)]
        reason: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("wfid: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let params = load_params(&cli)?;
    let ctx = load_context(cli.context_file.as_deref())?;

    match cli.command {
        Commands::Invoke => match wfid_action::invoke(&params, &ctx).await {
            Ok(result) => {
                print_json(&result)?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                let record = wfid_action::error(&params, &e.to_string(), e.retryable());
                print_json(&record)?;
                Ok(ExitCode::from(if e.retryable() {
                    EXIT_RETRYABLE
                } else {
                    EXIT_FATAL
                }))
            }
        },
        Commands::Error { message, retryable } => {
            let record = wfid_action::error(&params, &message, retryable);
            print_json(&record)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Halt { reason } => {
            let result = wfid_action::halt(&params, reason);
            print_json(&result)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_params(cli: &Cli) -> Result<InvocationParams> {
    let raw = match (&cli.params_file, &cli.params) {
        (Some(path), _) if path.as_os_str() == "-" => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading params from stdin")?;
            buf
        }
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("reading params file {}", path.display()))?,
        (None, Some(inline)) => inline.clone(),
        // Absent params still let `halt` acknowledge with sentinels.
        (None, None) => return Ok(InvocationParams::default()),
    };

    serde_json::from_str(&raw).context("parsing invocation params")
}

fn load_context(path: Option<&std::path::Path>) -> Result<ExecutionContext> {
    if let Some(path) = path {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading context file {}", path.display()))?;
        return serde_json::from_str(&raw).context("parsing execution context");
    }

    // No context file: secrets and env overrides both come from the process
    // environment the scheduler prepared.
    let vars: HashMap<String, String> = std::env::vars().collect();
    debug!(count = vars.len(), "building context from process environment");
    Ok(ExecutionContext {
        secrets: vars.clone(),
        env: vars,
        outputs: HashMap::new(),
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
