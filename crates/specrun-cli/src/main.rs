//! specrun CLI - HTTP conformance scenarios against a live server

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use specrun_core::config::CONFIG_CANDIDATES;
use specrun_core::{
    Config, FailureKind, ScenarioRegistry, Selection, Verdict, VerdictStatus, fixtures,
};
use specrun_runner::{Executor, ReqwestTransport, RunError};

#[derive(Parser)]
#[command(name = "specrun")]
#[command(about = "Run HTTP conformance scenarios against a live server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Config file (default: .specrun.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, global = true, default_value = "info")]
    log_level: Level,
}

/// Where scenarios come from
#[derive(Args, Clone)]
struct SourceArgs {
    /// Fixture directory (json / yaml scenario files)
    #[arg(long)]
    scenarios: Option<PathBuf>,

    /// Leave out the built-in scenario catalogue
    #[arg(long)]
    no_builtin: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios against a live server, stopping at the first failure
    ServerTest {
        #[command(flatten)]
        source: SourceArgs,

        /// Server origin, e.g. http://localhost:3000
        #[arg(long)]
        base_path: Option<String>,

        /// Run only this scenario
        #[arg(long, conflicts_with = "scenarios_file")]
        scenario: Option<String>,

        /// Run the scenarios named in this file, one per line
        #[arg(long)]
        scenarios_file: Option<PathBuf>,

        /// Transport timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// List registered scenarios
    List {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Load fixtures and check each declared request against its own checks
    Validate {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Export JSON Schema for scenario fixture files
    Schema,

    /// Initialize config file
    Init,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: cannot install logger: {e}");
    }

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    match cli.command {
        Commands::ServerTest {
            source,
            base_path,
            scenario,
            scenarios_file,
            timeout_secs,
        } => {
            let base_path = base_path.unwrap_or_else(|| cfg.base_path.clone());
            let timeout = timeout_secs.or(cfg.timeout_secs).map(Duration::from_secs);

            let outcome = build_registry(&source, &cfg)
                .map_err(RunError::from)
                .and_then(|registry| {
                    let selection = match (scenario, scenarios_file) {
                        (Some(name), _) => Selection::Single(name),
                        (None, Some(path)) => Selection::from_file(&path)?,
                        (None, None) => Selection::All,
                    };
                    Ok((registry, selection))
                });
            let (registry, selection) = match outcome {
                Ok(loaded) => loaded,
                Err(e) => return Ok(report_failure(cli.output, &e)),
            };

            if cli.output != OutputFormat::Silent {
                eprintln!("Config:");
                eprintln!("  base_path: {base_path}");
                eprintln!("  scenarios: {} registered", registry.len());
                if !cfg.headers.is_empty() {
                    eprintln!("  headers:   {} configured", cfg.headers.len());
                }
                eprintln!();
            }

            let executor = Executor::new(ReqwestTransport::new(timeout)?, &base_path)
                .with_headers(cfg.headers.clone());
            match executor.run(&registry, &selection) {
                Ok(report) => {
                    let verdict = Verdict::from_report(&report);
                    match cli.output {
                        OutputFormat::Terminal => {
                            println!("\n{}: {}", verdict.status, verdict.reason);
                            for m in &report.methods {
                                println!(
                                    "  {} {} {} -> {} ({} ms)",
                                    m.scenario, m.method, m.url, m.status, m.elapsed_ms
                                );
                            }
                            if !report.skipped.is_empty() {
                                println!("  Skipped (client-side only): {}", report.skipped.join(", "));
                            }
                            println!("  Exit code: {}", verdict.exit_code);
                        }
                        OutputFormat::Json => {
                            let json_output = serde_json::json!({
                                "verdict": verdict,
                                "report": report,
                            });
                            println!("{}", serde_json::to_string_pretty(&json_output)?);
                        }
                        OutputFormat::Silent => {}
                    }
                    Ok(verdict.exit_code)
                }
                Err(e) => Ok(report_failure(cli.output, &e)),
            }
        }

        Commands::List { source } => {
            let registry = build_registry(&source, &cfg)?;
            match cli.output {
                OutputFormat::Terminal => {
                    for s in registry.iter() {
                        let verbs: Vec<&str> = s.mock_methods.iter().map(|m| m.method.as_str()).collect();
                        println!("{:?}\t{}\t{}\t{}", s.kind, s.name, s.uri, verbs.join(","));
                    }
                    println!("\n{} scenarios", registry.len());
                }
                OutputFormat::Json => {
                    let scenarios: Vec<_> = registry.iter().collect();
                    println!("{}", serde_json::to_string_pretty(&scenarios)?);
                }
                OutputFormat::Silent => {}
            }
            Ok(0)
        }

        Commands::Validate { source } => {
            let registry = match build_registry(&source, &cfg) {
                Ok(registry) => registry,
                Err(e) => return Ok(report_failure(cli.output, &RunError::from(e))),
            };
            let problems = self_check(&registry);
            if cli.output != OutputFormat::Silent {
                for p in &problems {
                    println!("  FAIL: {p}");
                }
                println!(
                    "{} scenarios loaded, {} inconsistent",
                    registry.len(),
                    problems.len()
                );
            }
            Ok(if problems.is_empty() {
                0
            } else {
                FailureKind::Conformance.exit_code()
            })
        }

        Commands::Schema => {
            let schema = specrun_core::schema::generate_schema();
            println!("{schema}");
            Ok(0)
        }

        Commands::Init => {
            let config_path = CONFIG_CANDIDATES[0];
            if Path::new(config_path).exists() {
                eprintln!("{config_path} already exists");
                return Ok(1);
            }

            std::fs::write(config_path, Config::example())?;
            println!("Created {config_path}");
            println!("\nEdit the file to configure:");
            println!("  - base_path: server to test");
            println!("  - scenarios: fixture directory");
            println!("  - headers: auth tokens, API keys");
            Ok(0)
        }
    }
}

/// Built-ins first (unless disabled), then the fixture directory.
fn build_registry(source: &SourceArgs, cfg: &Config) -> Result<ScenarioRegistry, specrun_core::LoadError> {
    let mut builder = ScenarioRegistry::builder();
    if cfg.builtin && !source.no_builtin {
        fixtures::register_builtin(&mut builder)?;
    }
    if let Some(dir) = source.scenarios.as_ref().or(cfg.scenarios.as_ref()) {
        builder.load_dir(dir)?;
    }
    Ok(builder.build())
}

/// Each declared request replayed against its own mock-side checks.
fn self_check(registry: &ScenarioRegistry) -> Vec<String> {
    let mut problems = Vec::new();
    for scenario in registry.iter() {
        for method in &scenario.mock_methods {
            let req = method.declared_request(&scenario.uri);
            if let Err(e) = method.validate_request(&req) {
                problems.push(format!("{} ({}): {e}", scenario.name, method.method));
            }
        }
    }
    problems
}

fn report_failure(output: OutputFormat, error: &RunError) -> i32 {
    let verdict = Verdict::failed(error.kind(), error.to_string());
    match output {
        OutputFormat::Terminal => {
            println!("\n{}: {}", VerdictStatus::Fail, verdict.reason);
            println!("  Failure kind: {}", error.kind());
            println!("  Exit code: {}", verdict.exit_code);
        }
        OutputFormat::Json => {
            let json_output = serde_json::json!({
                "verdict": verdict,
                "kind": error.kind(),
            });
            match serde_json::to_string_pretty(&json_output) {
                Ok(text) => println!("{text}"),
                Err(e) => eprintln!("Error: {e}"),
            }
        }
        OutputFormat::Silent => {}
    }
    verdict.exit_code
}
