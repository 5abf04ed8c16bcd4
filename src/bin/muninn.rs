//! muninn: command-line front end for the orchestrator.
//!
//! Runs one operation per invocation against the configured upstream and
//! prints the result (JSON for structured operations, plain text for
//! generated documents).

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

use muninn::{Config, MuninnBuilder, Orchestrator, Secrets};

/// Muninn CLI
#[derive(Parser)]
#[command(name = "muninn")]
#[command(version = muninn::PKG_VERSION)]
#[command(about = "Cached, budgeted AI calls for job-application documents")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "MUNINN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score a resume against a job description
    Score {
        /// Resume file
        #[arg(short, long)]
        resume: PathBuf,
        /// Job description file (or omit to read from stdin)
        #[arg(short, long)]
        job: Option<PathBuf>,
    },

    /// Extract a structured job posting
    ExtractJob {
        /// Posting file (or omit to read from stdin)
        file: Option<PathBuf>,
    },

    /// List matching and missing skills
    SkillGap {
        /// Resume file
        #[arg(short, long)]
        resume: PathBuf,
        /// Job description file (or omit to read from stdin)
        #[arg(short, long)]
        job: Option<PathBuf>,
    },

    /// Generate a resume from a candidate profile
    Resume {
        /// Candidate profile file (or omit to read from stdin)
        #[arg(short, long)]
        profile: Option<PathBuf>,
        /// Job description to tailor to
        #[arg(short, long)]
        job: Option<PathBuf>,
    },

    /// Write a cover letter
    CoverLetter {
        /// Candidate profile file
        #[arg(short, long)]
        profile: PathBuf,
        /// Job description file (or omit to read from stdin)
        #[arg(short, long)]
        job: Option<PathBuf>,
        /// Company the letter is addressed to
        #[arg(long)]
        company: Option<String>,
    },

    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    // Commands that don't require an upstream
    if let Command::Config = args.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let orchestrator = build_orchestrator(&config)?;
    info!(version = muninn::version_string(), "muninn starting");

    match args.command {
        Command::Score { resume, job } => {
            let resume = read_file(&resume)?;
            let job = resolve_input(job.as_deref(), "score")?;
            let score = orchestrator.score_ats(&resume, &job).await?;
            println!("{}", serde_json::to_string_pretty(&score)?);
        }

        Command::ExtractJob { file } => {
            let text = resolve_input(file.as_deref(), "extract-job")?;
            let posting = orchestrator.extract_job_posting(&text).await?;
            println!("{}", serde_json::to_string_pretty(&posting)?);
        }

        Command::SkillGap { resume, job } => {
            let resume = read_file(&resume)?;
            let job = resolve_input(job.as_deref(), "skill-gap")?;
            let analysis = orchestrator.analyze_skill_gap(&resume, &job).await?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }

        Command::Resume { profile, job } => {
            let profile = resolve_input(profile.as_deref(), "resume")?;
            let job = job.as_deref().map(read_file).transpose()?;
            let resume = orchestrator.generate_resume(&profile, job.as_deref()).await?;
            println!("{resume}");
        }

        Command::CoverLetter {
            profile,
            job,
            company,
        } => {
            let profile = read_file(&profile)?;
            let job = resolve_input(job.as_deref(), "cover-letter")?;
            let letter = orchestrator
                .generate_cover_letter(&profile, &job, company.as_deref())
                .await?;
            println!("{letter}");
        }

        Command::Config => unreachable!("handled above"),
    }

    let stats = orchestrator.usage_stats();
    info!(
        requests_today = stats.daily.requests,
        cost_today = stats.daily.cost,
        "usage"
    );
    orchestrator.shutdown();

    Ok(())
}

/// Build the orchestrator from file configuration plus the API key.
fn build_orchestrator(config: &Config) -> Result<Orchestrator, muninn::MuninnError> {
    let secrets = Secrets::load()?;
    let key = secrets.api_key().ok_or_else(|| {
        muninn::MuninnError::Configuration(
            "no API key: set [upstream] api_key in ~/.muninn/secrets.toml or MUNINN_API_KEY"
                .to_string(),
        )
    })?;
    MuninnBuilder::from_config(config)?.http(key).build()
}

fn read_file(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path).map_err(|e| format!("failed to read {path:?}: {e}").into())
}

/// Read input from a file argument, or from stdin when piped.
fn resolve_input(path: Option<&Path>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return read_file(path);
    }
    if io::stdin().is_terminal() {
        return Err(format!("{command}: no input provided (pass a file or pipe via stdin)").into());
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        return Err(format!("{command}: stdin was empty").into());
    }
    Ok(trimmed.to_string())
}
