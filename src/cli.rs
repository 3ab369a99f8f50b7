use crate::bank::repository::{FileQuestionRepository, QuestionRepository};
use crate::config::config::TrainerConfig;
use crate::core::sandbox::CodeSandbox;
use crate::planner::progress::MemoryProgressStore;
use crate::practice::service::{PracticeMode, PracticeService};
use crate::practice::wire::GradeRequest;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Stale run directories older than this are swept on startup
const STALE_WORKSPACE_AGE: Duration = Duration::from_secs(60 * 60);

#[derive(Parser)]
#[command(author, version, about = "C practice trainer: sandboxed execution and grading", long_about = None)]
struct Cli {
    /// JSON configuration file (environment overrides still apply)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a C program
    Run {
        /// Source file, or '-' for stdin
        #[arg(long)]
        code_file: PathBuf,
        /// Data piped to the program's stdin
        #[arg(long, default_value = "")]
        input: String,
        /// Wall-clock limit in seconds (overrides config)
        #[arg(long)]
        time: Option<u64>,
        /// Memory limit in MB (overrides config)
        #[arg(long)]
        mem: Option<u64>,
    },
    /// Syntax-check a C program without running it
    Check {
        /// Source file, or '-' for stdin
        #[arg(long)]
        code_file: PathBuf,
    },
    /// Grade an answer against a bank question
    Grade {
        #[arg(long)]
        question_id: String,
        /// Answer text
        #[arg(long, conflicts_with = "answer_file")]
        answer: Option<String>,
        /// File holding the answer, or '-' for stdin
        #[arg(long)]
        answer_file: Option<PathBuf>,
        #[arg(long, default_value = "cli")]
        user: String,
    },
    /// Plan a practice session
    Plan {
        #[arg(long, default_value = "cli")]
        user: String,
        /// smart, mixed or category:<name>
        #[arg(long, default_value = "smart")]
        mode: String,
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Seed for a reproducible plan
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Parse every bank file and report problems
    VerifyBank,
    /// Check that the C toolchain is installed
    CheckDeps {
        /// Verbose output showing version information
        #[arg(long)]
        verbose: bool,
    },
}

/// Session plan as printed by `plan`
#[derive(Serialize)]
struct PlanOutput {
    mode: String,
    question_ids: Vec<String>,
    categories: Vec<String>,
}

pub fn run() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = TrainerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    log::debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Run {
            code_file,
            input,
            time,
            mem,
        } => {
            let mut config = config;
            if let Some(secs) = time {
                config.sandbox = config.sandbox.with_timeout_secs(secs);
            }
            if let Some(mb) = mem {
                config.sandbox.memory_limit_mb = mb;
            }
            config.validate()?;

            let source = read_source(&code_file)?;
            let sandbox = sandbox(&config);
            let outcome = sandbox.compile_and_run(&source, &input)?;
            print_json(&outcome)?;

            if !outcome.success {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Check { code_file } => {
            let source = read_source(&code_file)?;
            let report = sandbox(&config).validate_syntax(&source)?;
            print_json(&report)?;

            if !report.valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Grade {
            question_id,
            answer,
            answer_file,
            user,
        } => {
            let answer = match (answer, answer_file) {
                (Some(answer), _) => answer,
                (None, Some(path)) => read_source(&path)?,
                (None, None) => anyhow::bail!("either --answer or --answer-file is required"),
            };

            let service = practice_service(&config);
            let request = GradeRequest {
                question_id,
                answer,
                hints_used: 0,
            };
            let response = service.submit(&user, &request, 0)?;
            print_json(&response)
        }
        Commands::Plan {
            user,
            mode,
            count,
            seed,
        } => {
            let mode: PracticeMode = mode.parse()?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            let service = practice_service(&config);
            let plan = service.start_session(&user, &mode, count, &mut rng)?;
            print_json(&PlanOutput {
                mode: mode.to_string(),
                question_ids: plan.ids(),
                categories: plan.questions.iter().map(|q| q.category.clone()).collect(),
            })
        }
        Commands::VerifyBank => {
            let repository = FileQuestionRepository::new(&config.questions_dir);
            let report = repository.verify();

            for file in &report.files {
                let marker = if file.present && file.issues.is_empty() { "✅" } else { "❌" };
                eprintln!("{} {} - {} questions", marker, file.category, file.question_count);
                for issue in &file.issues {
                    eprintln!("   {}", issue);
                }
            }
            for id in &report.duplicate_ids {
                eprintln!("⚠️  duplicate question id: {}", id);
            }
            print_json(&report)?;

            if !report.is_clean() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::CheckDeps { verbose } => check_toolchain(&config, verbose),
    }
}

fn sandbox(config: &TrainerConfig) -> CodeSandbox {
    let sandbox = CodeSandbox::from_config(config);
    match sandbox.workspaces().cleanup_stale_workspaces(STALE_WORKSPACE_AGE) {
        Ok(0) => {}
        Ok(removed) => log::info!("Removed {} stale run directories", removed),
        Err(e) => log::warn!("Stale run directory sweep failed: {}", e),
    }
    sandbox
}

fn practice_service(config: &TrainerConfig) -> PracticeService {
    let repository: Arc<dyn QuestionRepository> =
        Arc::new(FileQuestionRepository::new(&config.questions_dir));
    PracticeService::new(
        repository,
        Arc::new(sandbox(config)),
        Arc::new(MemoryProgressStore::new()),
    )
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("reading stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn check_toolchain(config: &TrainerConfig, verbose: bool) -> Result<()> {
    println!("🔍 Checking C toolchain...");
    println!();

    let sandbox = CodeSandbox::from_config(config);
    match sandbox.toolchain_version() {
        Some(version) => {
            println!("✅ C ({}) - OK", config.sandbox.compiler);
            if verbose {
                println!("  {} -> {}", config.sandbox.compiler, version);
                println!("  work dir -> {}", config.work_dir.display());
                println!("  questions -> {}", config.questions_dir.display());
            }
            println!();
            println!("🎉 Toolchain is available.");
            Ok(())
        }
        None => {
            println!("❌ C ({}) - MISSING", config.sandbox.compiler);
            println!();
            println!("💡 Install instructions:");
            println!("  Ubuntu/Debian: sudo apt install gcc");
            println!("  Fedora/RHEL:   sudo dnf install gcc");
            std::process::exit(1);
        }
    }
}
