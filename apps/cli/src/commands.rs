//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tabledown_core::delimiter::display_delimiter;
use tabledown_core::pipeline::{ProgressReporter, RunReport};
use tabledown_shared::{AppConfig, PipelineConfig, init_config, load_config, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// tabledown — turn CSV/TSV exports into Markdown documents.
#[derive(Parser)]
#[command(
    name = "tabledown",
    version,
    about = "Convert a CSV/TSV export into one Markdown file per row.",
    long_about = None,
    args_conflicts_with_subcommands = true,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.tabledown/tabledown.toml).
    #[arg(long = "config", global = true, env = "TABLEDOWN_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Delimited text file to convert.
    pub input: Option<PathBuf>,

    /// Directory receiving the Markdown files (created if missing).
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Subcommands besides the default conversion.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tabledown=info",
        1 => "tabledown=debug",
        _ => "tabledown=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config_file.as_deref()),
        },
        None => match (cli.input, cli.output_dir) {
            (Some(input), Some(output_dir)) => {
                cmd_convert(&input, &output_dir, cli.config_file.as_deref())
            }
            _ => {
                eprintln!("Usage: tabledown <INPUT> <OUTPUT_DIR>");
                std::process::exit(1);
            }
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_convert(input: &Path, output_dir: &Path, config_path: Option<&Path>) -> Result<()> {
    if !input.is_file() {
        return Err(eyre!("Input file does not exist: {}", input.display()));
    }

    let config = resolve_config(config_path)?;
    let run_config = PipelineConfig::new(&config, input, output_dir)?;

    info!(
        input = %input.display(),
        output_dir = %output_dir.display(),
        "converting"
    );

    let reporter = CliProgress::new();
    let report = tabledown_core::pipeline::convert_file(&run_config, &reporter)?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    let delimiter = display_delimiter(report.delimiter.delimiter);
    let delimiter_note = if report.delimiter.fell_back {
        " (fallback)"
    } else {
        ""
    };

    println!();
    println!("  Markdown conversion complete!");
    println!(
        "  Encoding:  {} (confidence {:.2})",
        report.encoding.label(),
        report.encoding.confidence
    );
    println!("  Delimiter: {delimiter}{delimiter_note}");
    println!("  Schema:    {}", report.schema);
    println!("  Written:   {}", report.documents_written());
    println!("  Skipped:   {}", report.rows_skipped);
    println!("  Output:    {}", report.output_dir.display());
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        Self::with_bar(ProgressBar::new_spinner())
    }

    fn with_bar(spinner: ProgressBar) -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_written(&self, path: &Path, count: usize) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.spinner.set_message(format!("Writing [{count}] {name}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

// A failed run never reaches `done`.
impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
