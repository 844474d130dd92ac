use crate::expectation::rule::{self, ExpectationDocument};
use crate::judge::http::JudgeHttpClient;
use crate::orchestrator::{Orchestrator, RunConfig};
use crate::plan::{self, PlanRequest};
use crate::{config, logging, rejudge, report};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct CLIArgs {
    /// Harness configuration (API base, users, polling)
    #[clap(long, default_value = "config.toml")]
    pub config: String,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit solutions concurrently, wait for their verdicts and check them
    Pressure(PressureArgs),
    /// Rejudge one submission repeatedly and record every verdict
    Rejudge(RejudgeArgs),
    /// Set the handwritten score of a submission
    Grade(GradeArgs),
}

#[derive(Args, Debug)]
pub struct PressureArgs {
    #[clap(short, long, default_value = "first_admin")]
    pub user: String,

    /// Number of submissions; with --expectations, 0 means one per configured count
    #[clap(short, long, default_value_t = 0)]
    pub count: usize,

    #[clap(short, long, default_value_t = 0)]
    pub lang: i64,

    /// Source archive, or a directory of them
    #[clap(short = 'f', long = "file", default_value = "")]
    pub source: String,

    /// Submit in random order
    #[clap(short, long)]
    pub random: bool,

    /// Seconds between status rounds (overrides the configuration file)
    #[clap(short, long)]
    pub delay: Option<f64>,

    /// Seconds to wait for all verdicts
    #[clap(long, default_value_t = 3600.0)]
    pub max_time: f64,

    #[clap(short, long, default_value_t = 1)]
    pub pid: i64,

    /// JSON document with the expected verdict of every source
    #[clap(long)]
    pub expectations: Option<PathBuf>,

    #[clap(long, default_value = "result.json")]
    pub fname: PathBuf,
}

#[derive(Args, Debug)]
pub struct RejudgeArgs {
    #[clap(short, long, default_value = "first_admin")]
    pub user: String,

    #[clap(short, long)]
    pub sid: String,

    #[clap(short, long, default_value_t = 1)]
    pub count: usize,

    #[clap(short, long)]
    pub delay: Option<f64>,

    #[clap(long, default_value_t = 3600.0)]
    pub max_time: f64,

    #[clap(long, default_value = "result.json")]
    pub fname: PathBuf,
}

#[derive(Args, Debug)]
pub struct GradeArgs {
    pub sid: String,

    pub score: i64,

    #[clap(short, long, default_value = "student1")]
    pub user: String,
}

pub async fn main() -> Result<()> {
    let cli_args = CLIArgs::parse();
    logging::init();

    let config = std::fs::read_to_string(&cli_args.config)
        .with_context(|| format!("Failed to read config from {}", cli_args.config))?;

    let config: config::Config = toml::from_str(&config).context("Config is invalid")?;

    match cli_args.command {
        Command::Pressure(args) => pressure(&config, args).await,
        Command::Rejudge(args) => rejudge(&config, args).await,
        Command::Grade(args) => grade(&config, args).await,
    }
}

async fn login(config: &config::Config, user: &str) -> Result<JudgeHttpClient> {
    let password = config.password_of(user).with_context(|| {
        format!("User {user} has no password in the configuration file (section users)")
    })?;
    let client = JudgeHttpClient::new(&config.api_base)?;
    client
        .login(user, password)
        .await
        .with_context(|| format!("Failed to log in as {user}"))?;
    Ok(client)
}

fn load_expectations(path: &Path) -> Result<ExpectationDocument> {
    let document = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read expectations from {}", path.display()))?;
    let document: serde_json::Value = serde_json::from_str(&document)
        .with_context(|| format!("Expectations in {} are not valid JSON", path.display()))?;
    Ok(rule::parse_document(&document)?)
}

async fn pressure(config: &config::Config, args: PressureArgs) -> Result<()> {
    let expectations = args
        .expectations
        .as_deref()
        .map(load_expectations)
        .transpose()?;

    let plan = plan::build_plan(
        &PlanRequest {
            count: args.count,
            language: args.lang,
            problem_id: args.pid,
            source: args.source.clone(),
            randomize: args.random,
        },
        expectations.as_ref(),
        &mut rand::thread_rng(),
    )?;
    if plan.is_empty() {
        bail!("Nothing to submit: pass --count or --expectations");
    }

    let run_config = RunConfig {
        poll: config.poll.settings(args.delay)?,
        global_timeout: config::seconds("--max-time", args.max_time)?,
    };
    let client = login(config, &args.user).await?;

    let report = match Orchestrator::new(&client, &client, run_config)
        .run(&plan, expectations.as_ref())
        .await
    {
        Ok(report) => report,
        Err(e) => {
            error!("Pressure run aborted: {e}");
            let failure = serde_json::json!({"passTest": false, "error": e.to_string()});
            report::write_report(&args.fname, &failure).await?;
            return Err(e).context("Pressure run aborted");
        }
    };

    report::write_report(&args.fname, &report).await?;
    if !report.pass_test {
        bail!("Pressure test failed, see {}", args.fname.display());
    }
    info!(report = %args.fname.display(), "Pressure test passed");
    Ok(())
}

async fn rejudge(config: &config::Config, args: RejudgeArgs) -> Result<()> {
    let settings = config.poll.settings(args.delay)?;
    let max_wait = config::seconds("--max-time", args.max_time)?;
    let client = login(config, &args.user).await?;

    let report =
        rejudge::rejudge_repeatedly(&client, &args.sid, args.count, settings, max_wait).await?;
    report::write_report(&args.fname, &report).await?;
    if report.time_out {
        bail!("A rejudge of {} did not finish in time", args.sid);
    }
    Ok(())
}

async fn grade(config: &config::Config, args: GradeArgs) -> Result<()> {
    let client = login(config, &args.user).await?;
    client
        .grade(&args.sid, args.score)
        .await
        .with_context(|| format!("Failed to set the score of {}", args.sid))?;
    info!(submission_id = %args.sid, score = args.score, "Updated handwritten grade");
    Ok(())
}
