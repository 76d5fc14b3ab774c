//! reviewgen CLI: AI product review generation from live web research.
//!
//! Searches the web for a product, scrapes the sources it finds and streams
//! a structured review written by a language model.

mod commands;
mod progress;
mod render;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
