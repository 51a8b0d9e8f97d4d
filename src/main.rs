use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use draftsmith::cli::commands::{config, generate, ingest, init, scan};

#[derive(Parser)]
#[command(name = "draftsmith")]
#[command(
    version,
    about = "Multi-agent Java feature generator with policy checks and review"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Draftsmith in the current directory
    Init {
        #[arg(long, short, help = "Overwrite existing initialization")]
        force: bool,
    },

    /// Generate a feature from a natural-language request
    Generate {
        #[arg(help = "Feature request, e.g. \"Add product reviews with CRUD\"")]
        request: String,
        #[arg(long = "target", short = 't', help = "Fully qualified class to generate (repeatable, in order)")]
        targets: Vec<String>,
        #[arg(long, help = "Attempts per target before it is abandoned")]
        max_attempts: Option<u32>,
        #[arg(long, help = "Write redacted per-stage transcripts")]
        trace: bool,
        #[arg(long, help = "LLM provider (ollama, ollama-cli, openai)")]
        provider: Option<String>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
        #[arg(long, short, help = "Project root to write generated sources under")]
        output: Option<PathBuf>,
        #[arg(long = "dry-run", help = "Run the pipeline and print results without writing files")]
        dry_run: bool,
        #[arg(long, help = "Feature id used to store contracts")]
        feature_id: Option<String>,
    },

    /// Build the method call graph of a Java source tree
    Scan {
        #[arg(help = "Source root (default: current directory)")]
        path: Option<PathBuf>,
        #[arg(long, help = "Glob of relative paths to skip (repeatable)")]
        exclude: Vec<String>,
        #[arg(long, help = "Store edges in the project database instead of printing")]
        store: bool,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Index existing code for retrieval during generation
    Ingest {
        #[arg(help = "Source root (default: project root)")]
        path: Option<PathBuf>,
        #[arg(long, help = "Drop previously indexed snippets first")]
        reset: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, toml, json, yaml"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mDraftsmith encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { force } => init::run(force)?,
        Commands::Generate {
            request,
            targets,
            max_attempts,
            trace,
            provider,
            model,
            output,
            dry_run,
            feature_id,
        } => generate::run(generate::GenerateOptions {
            request,
            targets,
            max_attempts,
            trace,
            provider,
            model,
            output,
            dry_run,
            feature_id,
        })?,
        Commands::Scan {
            path,
            exclude,
            store,
            format,
        } => scan::run(scan::ScanOptions {
            path,
            exclude,
            store,
            format,
        })?,
        Commands::Ingest { path, reset } => ingest::run(path, reset)?,
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => config::show(global, &format)?,
            ConfigAction::Path => config::path()?,
            ConfigAction::Init { global, force } => {
                if global {
                    config::init_global(force)?;
                } else {
                    config::init_project(force)?;
                }
            }
        },
    }

    Ok(())
}
