//! tabledown CLI — converts CSV/TSV exports into one Markdown file per row.
//!
//! Usage: `tabledown <INPUT> <OUTPUT_DIR>`

mod commands;

use clap::Parser;
use clap::error::ErrorKind;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            // Usage errors exit with 1, not clap's default 2.
            let _ = e.print();
            std::process::exit(1);
        }
    };

    commands::init_tracing(&cli);
    commands::run(cli)
}
