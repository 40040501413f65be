//! Inspect how promptfit treats a model, a conversation, a diff, or a model
//! response.
//!
//! Input is read from stdin where a command needs a body. Logs go to stderr
//! and are controlled by `RUST_LOG` (default `warn`).
//!
//! # Examples
//!
//! ```sh
//! # Is this model small, and what window is assumed?
//! promptfit classify qwen2.5-coder:7b
//! promptfit classify acme-edge --max-tokens 4000
//!
//! # Trim a JSON message array for a model
//! cat messages.json | promptfit trim phi-2 > trimmed.json
//!
//! # Summarize a diff when it is worth it
//! git diff | promptfit diff
//!
//! # Check a response for a missing start action
//! cat response.txt | promptfit scan
//!
//! # Use custom thresholds and patterns
//! promptfit --config promptfit.json classify acme-edge-v2
//! ```

use clap::{Parser, Subcommand};
use promptfit::session::{extract_start_commands, has_missing_start_command};
use promptfit::{Message, ModelDescriptor, PromptFit, PromptFitConfig};
use serde::Serialize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Inspect prompt budgeting decisions for small language models.
#[derive(Parser)]
#[command(name = "promptfit")]
struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a model and print the decision as JSON
    Classify {
        /// Model identifier
        model: String,

        /// Provider-declared context capacity in tokens
        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Trim a JSON message array read from stdin
    Trim {
        /// Model identifier
        model: String,

        /// Provider-declared context capacity in tokens
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Print the trim report to stderr
        #[arg(long)]
        report: bool,
    },

    /// Summarize a unified diff read from stdin
    Diff,

    /// Scan a model response read from stdin for start actions
    Scan,
}

#[derive(Serialize)]
struct ScanOutput {
    missing_start: bool,
    start_commands: Vec<String>,
}

// ── Helpers ────────────────────────────────────────────────────────

fn read_stdin_content() -> Result<String, String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| format!("failed to read stdin: {e}"))?;
    Ok(buf)
}

fn descriptor(model: &str, max_tokens: Option<usize>) -> ModelDescriptor {
    let descriptor = ModelDescriptor::new(model);
    match max_tokens {
        Some(tokens) => descriptor.with_declared_max_tokens(tokens),
        None => descriptor,
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("failed to serialize output: {e}"))
}

fn build(cli: &Cli) -> Result<PromptFit, String> {
    let config = match &cli.config {
        Some(path) => PromptFitConfig::load(path).map_err(|e| e.to_string())?,
        None => PromptFitConfig::default(),
    };
    PromptFit::from_config(&config).map_err(|e| e.to_string())
}

impl Command {
    fn reads_stdin(&self) -> bool {
        !matches!(self, Command::Classify { .. })
    }
}

/// Run one subcommand against `input`, the body read from stdin.
fn execute(fit: &PromptFit, command: &Command, input: &str) -> Result<String, String> {
    match command {
        Command::Classify { model, max_tokens } => {
            let classification = fit.classifier().classify(&descriptor(model, *max_tokens));
            to_json(&classification)
        }
        Command::Trim {
            model,
            max_tokens,
            report,
        } => {
            let messages: Vec<Message> = serde_json::from_str(input)
                .map_err(|e| format!("failed to parse messages from stdin: {e}"))?;
            let (trimmed, trim_report) = fit
                .trimmer()
                .trim_with_report(&messages, &descriptor(model, *max_tokens));
            if *report {
                eprintln!("{}", to_json(&trim_report)?);
            }
            to_json(&trimmed)
        }
        Command::Diff => Ok(fit.summarize_diff(input)),
        Command::Scan => to_json(&ScanOutput {
            missing_start: has_missing_start_command(input),
            start_commands: extract_start_commands(input),
        }),
    }
}

fn run(cli: &Cli) -> Result<String, String> {
    let fit = build(cli)?;
    let input = if cli.command.reads_stdin() {
        read_stdin_content()?
    } else {
        String::new()
    };
    execute(&fit, &cli.command, &input)
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(&cli) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
