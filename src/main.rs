use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use solvekit::config::{ConfigLoader, ConfigValidator, SolveConfig};
use solvekit::pipeline::{IterativeSolverPipeline, StaticSolverPipeline};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Configure and run retrieval/planning solver pipelines
#[derive(Parser)]
#[command(name = "solvekit")]
#[command(about = "Configure and run retrieval/planning solver pipelines", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a configuration file and report every issue found
    Validate {
        /// Path to the configuration file
        config: PathBuf,

        /// Also flag unknown top-level keys and prompt selectors
        #[arg(long)]
        strict: bool,
    },
    /// Print the effective configuration with defaults and LLM fallbacks applied
    Show {
        /// Path to the configuration file
        config: PathBuf,
    },
    /// Run a solver pipeline against a question ("-" reads questions from stdin)
    Ask {
        question: String,

        /// Path to the configuration file
        #[arg(short = 'c', long, default_value = "solvekit.yaml")]
        config: PathBuf,

        /// Which pipeline section to run
        #[arg(long, value_enum, default_value_t = PipelineKind::Iterative)]
        pipeline: PipelineKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PipelineKind {
    Iterative,
    Static,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Validate { config, .. }
        | Commands::Show { config }
        | Commands::Ask { config, .. } => config.clone(),
    };
    let log_level = log_filter(cli.verbose, config_log_level(&config_path).as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_line_number(cli.verbose >= 3)
        .init();

    debug!("solvekit started with verbosity level: {}", cli.verbose);

    let result = match cli.command {
        Commands::Validate { config, strict } => run_validate(config, strict),
        Commands::Show { config } => run_show(config).await,
        Commands::Ask {
            question,
            config,
            pipeline,
        } => run_ask(question, config, pipeline).await,
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}

/// Flags win, then the environment, then the config's `log.level`.
fn log_filter(verbose: u8, config_level: Option<&str>) -> String {
    match verbose {
        0 => std::env::var("SOLVEKIT_LOG_LEVEL")
            .ok()
            .or_else(|| config_level.map(str::to_string))
            .unwrap_or_else(|| "info".to_string()),
        1 => "debug".to_string(),
        2 => "trace".to_string(),
        _ => "trace,hyper=debug,tower=debug".to_string(),
    }
}

/// The subscriber is installed before the loader runs, so peek at the
/// document directly; an unreadable or malformed file falls back to the
/// default level and is reported properly by the command itself.
fn config_log_level(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let config = SolveConfig::from_yaml_str(&content).ok()?;
    Some(config.log_level().to_string())
}

fn run_validate(config: PathBuf, strict: bool) -> Result<()> {
    let validator = ConfigValidator::new(strict);
    let result = validator.validate_file(&config)?;

    for issue in &result.issues {
        println!("✗ {issue}");
    }
    for suggestion in &result.suggestions {
        println!("→ {suggestion}");
    }

    if result.is_valid {
        println!("✓ {} is valid", config.display());
        Ok(())
    } else {
        Err(anyhow!(
            "{} has {} issue(s)",
            config.display(),
            result.issues.len()
        ))
    }
}

async fn run_show(config: PathBuf) -> Result<()> {
    let loader = ConfigLoader::load(&config).await?;
    let effective = loader.get_config().redacted();
    print!("{}", serde_yaml::to_string(&effective)?);
    Ok(())
}

async fn run_ask(question: String, config: PathBuf, pipeline: PipelineKind) -> Result<()> {
    let mut loader = ConfigLoader::load(&config).await?;

    if question == "-" {
        // Long-lived session: pick up config edits between questions.
        loader.enable_hot_reload().await?;
        loader.watch_config_file()?;

        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            if stdin.read_line(&mut line)? == 0 {
                break;
            }
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            let answer = solve(&loader, question, pipeline).await?;
            println!("{answer}");
        }
        Ok(())
    } else {
        let answer = solve(&loader, &question, pipeline).await?;
        println!("{answer}");
        Ok(())
    }
}

async fn solve(loader: &ConfigLoader, question: &str, kind: PipelineKind) -> Result<String> {
    let config = loader.get_config();
    match kind {
        PipelineKind::Iterative => {
            let pipeline_config = config
                .iterative_solver_pipeline
                .as_ref()
                .ok_or_else(|| anyhow!("config has no 'iterative_solver_pipeline' section"))?;
            let pipeline = IterativeSolverPipeline::from_config(&config, pipeline_config)?;
            Ok(pipeline.solve(question).await?)
        }
        PipelineKind::Static => {
            let pipeline_config = config
                .static_solver_pipeline
                .as_ref()
                .ok_or_else(|| anyhow!("config has no 'static_solver_pipeline' section"))?;
            let pipeline = StaticSolverPipeline::from_config(&config, pipeline_config)?;
            Ok(pipeline.solve(question).await?)
        }
    }
}
