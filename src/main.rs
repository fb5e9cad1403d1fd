use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use doc_lint::{
    default_jobs, print_run_summary, read_documents, report_fatal_error, AllowList,
    DocLintPreprocessor, LintConfig, Linter, ReportFormat,
};
use mdbook::preprocess::{CmdPreprocessor, Preprocessor};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::time::Instant;

/// Exit code when the run completed but found problems
const EXIT_FINDINGS: i32 = 1;

/// Exit code when the run could not complete
const EXIT_FATAL: i32 = 2;

#[derive(Parser)]
#[command(name = "doc-lint", version, about = "Lint code fences and API references in MDX documentation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint documents and print a report
    Check(CheckArgs),
    /// Check whether a renderer is supported (mdBook preprocessor protocol)
    Supports {
        /// Renderer name
        renderer: String,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// Allow-list of known API names and their canonical URLs
    #[arg(long, short = 'a')]
    allow_list: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Report format
    #[arg(long, short = 'f', value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Write the report to this file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Maximum number of documents linted at once (defaults to CPU count)
    #[arg(long, short = 'j')]
    jobs: Option<usize>,

    /// Documents to lint
    #[arg(required = true)]
    documents: Vec<PathBuf>,
}

pub fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Supports { renderer }) => {
            let preprocessor = DocLintPreprocessor::new();
            if preprocessor.supports_renderer(&renderer) {
                exit(0);
            } else {
                exit(1);
            }
        }
        Some(Commands::Check(args)) => run_check(args),
        None => handle_preprocessing().map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => exit(EXIT_FINDINGS),
        Err(e) => {
            report_fatal_error(&e);
            exit(EXIT_FATAL);
        }
    }
}

/// Lints the given documents. Returns whether the run passed.
fn run_check(args: CheckArgs) -> Result<bool> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(check(args))
}

async fn check(args: CheckArgs) -> Result<bool> {
    let config = match &args.config {
        Some(path) => LintConfig::from_file(path)?,
        None => LintConfig::default(),
    };

    let allow_list_path = match args.allow_list {
        Some(path) => path,
        None => config
            .allow_list
            .as_ref()
            .map(PathBuf::from)
            .context("No allow-list given: pass --allow-list or set `allow-list` in the config file")?,
    };

    // Fatal: nothing is linted without an allow-list
    let allow_list = AllowList::load(&allow_list_path).await?;
    log::info!(
        "Loaded {} allow-list entries from {}",
        allow_list.len(),
        allow_list_path.display()
    );

    let linter = Arc::new(Linter::new(&config, allow_list)?);
    let sources = read_documents(&args.documents).await?;

    let start = Instant::now();
    let report = linter
        .lint_all(sources, args.jobs.unwrap_or_else(default_jobs))
        .await?;
    let elapsed = start.elapsed();

    let rendered = report.render(args.format)?;
    match &args.output {
        Some(path) => tokio::fs::write(path, rendered.as_bytes())
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    print_run_summary(&report, elapsed);

    Ok(!report.fails(config.fail_on))
}

fn handle_preprocessing() -> Result<()> {
    let (ctx, book) = CmdPreprocessor::parse_input(io::stdin())?;

    let preprocessor = DocLintPreprocessor::new();
    let processed_book = preprocessor.run(&ctx, book)?;

    serde_json::to_writer(io::stdout(), &processed_book)?;

    Ok(())
}
