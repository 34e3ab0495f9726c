//! snipcheck - run the built-in playground snippets and grade their output
//!
//! ## Commands
//!
//! - `run`: execute the catalog (or a filtered selection) and print a report
//! - `list`: show registered snippets with their tags
//! - `tags`: show the distinct tags

mod catalog;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use snipcheck_core::{
    HarnessConfig, HarnessError, MatchMode, ReportAggregator, ReportFormat, RunController,
    RunReport, SnippetFilter,
};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "snipcheck")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Snippet execution and output assertion harness", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the snippet catalog and grade each snippet against its fixture
    Run(RunArgs),

    /// List registered snippets
    List {
        /// Tag or name filter (`tag:<t>`, `name:<id>`, or either)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List the distinct snippet tags
    Tags,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Tag or name filter (`tag:<t>`, `name:<id>`, or either)
    #[arg(short, long, env = "SNIPCHECK_FILTER")]
    filter: Option<String>,

    /// Per-snippet timeout in milliseconds (0 disables the limit)
    #[arg(short, long, env = "SNIPCHECK_TIMEOUT_MS")]
    timeout: Option<u64>,

    /// Number of concurrent workers
    #[arg(short, long, env = "SNIPCHECK_PARALLELISM")]
    parallel: Option<usize>,

    /// Route every worker through one shared output channel
    #[arg(long, env = "SNIPCHECK_SHARED_CHANNEL")]
    shared_channel: bool,

    /// Ignore trailing whitespace when comparing lines
    #[arg(long, env = "SNIPCHECK_TRIM_TRAILING_WHITESPACE")]
    trim_trailing_whitespace: bool,

    /// Directory of `<snippet-id>.expected` fixture overrides
    #[arg(long, env = "SNIPCHECK_FIXTURES_DIR")]
    fixtures: Option<PathBuf>,

    /// Report format: text or json
    #[arg(long, env = "SNIPCHECK_FORMAT")]
    format: Option<ReportFormat>,

    /// JSON configuration file; flags override its values
    #[arg(short, long, env = "SNIPCHECK_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(parse_exit_code(&err));
        }
    };

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    snipcheck_core::init_tracing(cli.json_logs, level);

    let code = match dispatch(cli.command).await {
        Ok(code) => code,
        Err(err) => report_failure(&err, &mut std::io::stderr()),
    };
    std::process::exit(code);
}

async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::List { filter } => cmd_list(filter.as_deref()),
        Commands::Tags => cmd_tags(),
    }
}

/// Help and version requests succeed; any other argument error is a
/// configuration error.
fn parse_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 3,
    }
}

/// Harness errors carry their own exit code; anything else is a plain failure.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<HarnessError>()
        .map_or(1, HarnessError::exit_code)
}

/// Write the one-line failure message and pick the exit code.
fn report_failure(err: &anyhow::Error, stderr: &mut impl Write) -> i32 {
    let _ = writeln!(stderr, "error: {err:#}");
    exit_code_for(err)
}

/// Layer the config file (if any) under command-line flags.
fn resolve_config(args: &RunArgs) -> Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_json_file(path)?,
        None => HarnessConfig::default(),
    };

    if let Some(timeout) = args.timeout {
        config.timeout_ms = timeout;
    }
    if let Some(parallel) = args.parallel {
        config.parallelism = parallel;
    }
    if args.shared_channel {
        config.isolated_channels = false;
    }
    if args.trim_trailing_whitespace {
        config.match_mode = MatchMode::TrimTrailingWhitespace;
    }
    if let Some(dir) = &args.fixtures {
        config.fixtures_dir = Some(dir.clone());
    }
    if let Some(format) = args.format {
        config.format = format;
    }

    config.validate()?;
    Ok(config)
}

fn parse_filter(raw: Option<&str>) -> Result<Option<SnippetFilter>> {
    Ok(raw.map(SnippetFilter::parse).transpose()?)
}

async fn execute_run(args: &RunArgs) -> Result<(HarnessConfig, RunReport)> {
    let config = resolve_config(args)?;
    let filter = parse_filter(args.filter.as_deref())?;
    let registry = catalog::build(config.fixtures_dir.as_deref())
        .context("Failed to build snippet catalog")?;
    let controller = RunController::new(config.run_config())?;

    let mut reporter = ReportAggregator::new();
    let report = controller
        .execute(&registry, filter.as_ref(), config.timeout_ms, &mut reporter)
        .await?;
    Ok((config, report))
}

fn render(report: &RunReport, format: ReportFormat) -> Result<String> {
    Ok(match format {
        ReportFormat::Text => report.render_text(),
        ReportFormat::Json => report.to_json()?,
    })
}

async fn cmd_run(args: RunArgs) -> Result<i32> {
    let (config, report) = execute_run(&args).await?;
    println!("{}", render(&report, config.format)?);

    info!(
        run_id = %report.run_id,
        exit_code = report.exit_code(),
        "Run complete"
    );
    Ok(report.exit_code())
}

fn cmd_list(filter: Option<&str>) -> Result<i32> {
    let filter = parse_filter(filter)?;
    let registry = catalog::build(None)?;

    let mut shown = 0;
    for snippet in registry.list(filter.as_ref()) {
        let tags: Vec<&str> = snippet.tags().iter().map(String::as_str).collect();
        let fixture = if snippet.expected().is_some() {
            "fixture"
        } else {
            "demo"
        };
        println!("{:<32} {:<8} [{}]", snippet.id(), fixture, tags.join(", "));
        shown += 1;
    }
    println!();
    println!("{} of {} snippets", shown, registry.len());
    Ok(0)
}

fn cmd_tags() -> Result<i32> {
    let registry = catalog::build(None)?;
    for tag in registry.tags() {
        println!("{tag}");
    }
    Ok(0)
}
