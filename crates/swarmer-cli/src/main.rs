mod config;
mod offline;
mod report;

use clap::{Parser, Subcommand, ValueEnum};
use config::SwarmerConfig;
use offline::{OfflineGenerator, StaticPlanner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use swarmer_agent::{parse_plan, LlmPlanner, LlmTextGenerator};
use swarmer_builtins::LocalFileStore;
use swarmer_core::FileStore;
use swarmer_memory::InMemoryKnowledgeStore;
use swarmer_orchestrator::{Scheduler, SchedulerConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "swarmer", about = "Swarmer: dependency-aware scheduling for agent swarms")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "swarmer.toml")]
    config: PathBuf,

    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a goal and run scheduling rounds
    Run {
        /// Project goal (prompted for when omitted)
        #[arg(short, long)]
        goal: Option<String>,
        /// Project overview given to every agent (defaults to the goal)
        #[arg(short, long)]
        overview: Option<String>,
        /// Round limit (overrides config)
        #[arg(short, long)]
        rounds: Option<u32>,
        /// Run rounds without asking between them
        #[arg(long)]
        auto: bool,
        /// Print round reports as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Check a JSON plan offline: schema, duplicates, dependency graph
    Validate {
        /// Plan file with `tasks` and `agents` arrays
        plan: PathBuf,
    },
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; keys may come from the real environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.log_format);

    match cli.command {
        Commands::Run {
            goal,
            overview,
            rounds,
            auto,
            json,
        } => {
            let config = SwarmerConfig::load(&cli.config, true).await?;
            run(config, goal, overview, rounds, auto, json).await
        }
        Commands::Validate { plan } => {
            let config = SwarmerConfig::load(&cli.config, false).await?;
            validate(config.scheduler, &plan).await
        }
    }
}

async fn run(
    config: SwarmerConfig,
    goal: Option<String>,
    overview: Option<String>,
    rounds: Option<u32>,
    auto: bool,
    json: bool,
) -> anyhow::Result<()> {
    let model = config.resolved_model()?;
    let max_rounds = rounds.unwrap_or(config.scheduler.max_rounds);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let goal = match goal {
        Some(goal) => goal,
        None => prompt(&mut stdin, "Enter the project goal: ").await?,
    };
    if goal.trim().is_empty() {
        anyhow::bail!("a project goal is required");
    }
    let overview = overview.unwrap_or_else(|| goal.clone());

    let generator = Arc::new(LlmTextGenerator::new(model.clone()));
    let planner = LlmPlanner::new(model);
    let files = Arc::new(LocalFileStore::new(&config.files_dir));
    let mut scheduler = Scheduler::new(config.scheduler, generator)?
        .with_knowledge(Arc::new(InMemoryKnowledgeStore::new()))
        .with_files(files.clone());

    let summary = scheduler.initialize(&planner, &goal, &overview).await?;
    println!(
        "Planned {} task(s) for {} agent(s).",
        summary.tasks_admitted,
        scheduler.registry().len()
    );
    for task in scheduler.store().backlog() {
        let deps = if task.dependencies.is_empty() {
            String::new()
        } else {
            format!(" after {}", task.dependencies.join(", "))
        };
        println!(
            "  {} (p{}, {}){deps}: {}",
            task.id, task.base_priority, task.role, task.description
        );
    }

    let mut rounds_run = 0;
    while rounds_run < max_rounds {
        let outcome = tokio::select! {
            result = scheduler.run_round() => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(result) = outcome else {
            let reset = scheduler.recover_in_flight();
            warn!(tasks = reset.len(), "Round interrupted, in-flight tasks returned to backlog");
            break;
        };
        let round_report = result?;
        rounds_run += 1;

        if json {
            println!("{}", serde_json::to_string(&round_report)?);
        } else {
            println!("{}", report::render_round(&round_report));
        }
        if round_report.done || scheduler.store().is_empty() {
            break;
        }
        if !auto && rounds_run < max_rounds {
            let answer = prompt(&mut stdin, "Press Enter for the next round or 'q' to quit: ").await?;
            if answer.trim().eq_ignore_ascii_case("q") {
                info!(rounds = rounds_run, "Stopped by user");
                break;
            }
        }
    }
    if rounds_run == max_rounds && !scheduler.store().is_empty() {
        warn!(max_rounds, "Round limit reached with work remaining");
    }

    println!("\n{}", report::render_summary(&scheduler));
    print_artifacts(files.as_ref()).await;
    Ok(())
}

async fn validate(scheduler_config: SchedulerConfig, plan_path: &Path) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(plan_path).await.map_err(|e| {
        anyhow::anyhow!("Failed to read plan file '{}': {e}", plan_path.display())
    })?;
    let plan = parse_plan(&text)?;
    let config = SchedulerConfig {
        seed_coordinator: false,
        ..scheduler_config
    };
    let mut scheduler = Scheduler::new(config, Arc::new(OfflineGenerator))?;
    let summary = scheduler
        .initialize(&StaticPlanner::new(plan), "", "")
        .await?;

    println!(
        "Plan OK: {} task(s), {} agent(s).",
        summary.tasks_admitted,
        summary.agents.len()
    );
    let ready: Vec<&str> = scheduler
        .store()
        .ready_tasks()
        .into_iter()
        .map(|t| t.id.as_str())
        .collect();
    println!("Ready in round 1: {}", ready.join(", "));
    Ok(())
}

async fn prompt(stdin: &mut Lines<BufReader<Stdin>>, text: &str) -> anyhow::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(stdin.next_line().await?.unwrap_or_default())
}

async fn print_artifacts(files: &dyn FileStore) {
    let names = match files.list().await {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "Could not list project files");
            return;
        }
    };
    if names.is_empty() {
        return;
    }
    println!("\nProject files:");
    for name in &names {
        match files.read(name).await {
            Ok(content) => println!("--- {name}\n{}\n", report::preview(&content)),
            Err(e) => warn!(file = %name, error = %e, "Could not read project file"),
        }
    }
}
