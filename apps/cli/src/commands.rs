//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use futures::StreamExt;
use tracing::{info, warn};

use reviewgen_core::{PipelineOptions, ReviewPipeline};
use reviewgen_llm::{ChatSynthesizer, Provider};
use reviewgen_shared::{AppConfig, init_config, load_config};
use reviewgen_web::{PageScraper, WebSearcher};

use crate::progress::{CliProgress, SpinnerAwareStderr};
use crate::render::{self, EMPTY_PRODUCT, FailureReport, NOTHING_GENERATED};

/// Products offered as starting points.
pub(crate) const EXAMPLE_PRODUCTS: &[&str] = &[
    "iPhone 15 Pro Max",
    "Sony WH-1000XM5 Headphones",
    "MacBook Pro M3",
    "PlayStation 5",
    "Samsung Galaxy S24 Ultra",
];

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// reviewgen: research a product on the web and stream an AI-written review.
#[derive(Parser)]
#[command(
    name = "reviewgen",
    version,
    about = "Research a product on the web and stream a balanced, cited review.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a review for a product.
    Review(ReviewArgs),

    /// List example products.
    Examples,

    /// List supported providers with their default model and key variable.
    Providers,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
pub(crate) struct ReviewArgs {
    /// Product to review, e.g. "Sony WH-1000XM5 Headphones".
    pub product: String,

    /// Language-model provider: openai, gemini, claude or grok.
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Model name (defaults to the provider's default model).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Environment variable holding the API key.
    #[arg(long)]
    pub api_key_env: Option<String>,

    /// Search attempts before giving up.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,

    /// Do not stream the review to stdout.
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write the review as HTML to this file.
    #[arg(long, value_name = "FILE")]
    pub html: Option<PathBuf>,

    /// Also write the raw Markdown review to this file.
    #[arg(long, value_name = "FILE")]
    pub markdown: Option<PathBuf>,
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

/// Initialize tracing based on CLI flags. Logs go to stderr so the review
/// on stdout stays clean, and are written around the spinner.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "reviewgen=warn",
        1 => "reviewgen=info",
        2 => "reviewgen=debug",
        _ => "reviewgen=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(|| SpinnerAwareStderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(|| SpinnerAwareStderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Review(args) => cmd_review(args).await,
        Command::Examples => cmd_examples(),
        Command::Providers => cmd_providers(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// review
// ---------------------------------------------------------------------------

async fn cmd_review(args: ReviewArgs) -> Result<ExitCode> {
    let product = args.product.trim().to_string();
    if product.is_empty() {
        eprintln!("{EMPTY_PRODUCT}");
        return Ok(ExitCode::FAILURE);
    }

    let mut config = load_config()?;
    apply_overrides(&mut config, &args);

    let (pipeline, progress) = match build_pipeline(&config, args.quiet) {
        Ok(built) => built,
        Err(report) => {
            eprintln!("{report}");
            return Ok(ExitCode::FAILURE);
        }
    };

    info!(product = %product, provider = %config.llm.provider, "generating review");

    let mut stream = pipeline.run(&product);
    let mut review = String::new();
    let mut stdout = std::io::stdout();

    while let Some(chunk) = stream.next().await {
        progress.finish();
        match chunk {
            Ok(text) => {
                if !args.quiet {
                    write!(stdout, "{text}")?;
                    stdout.flush()?;
                }
                review.push_str(&text);
            }
            Err(e) => {
                if !args.quiet && !review.is_empty() {
                    writeln!(stdout)?;
                }
                eprintln!("{}", FailureReport::new(&e));
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    progress.finish();

    if render::is_blank(&review) {
        warn!(product = %product, "run produced no text");
        eprintln!("{NOTHING_GENERATED}");
        return Ok(ExitCode::SUCCESS);
    }

    if !args.quiet {
        writeln!(stdout)?;
    }

    if let Some(path) = &args.markdown {
        render::write_markdown(path, &review)?;
        eprintln!("Markdown written to {}", path.display());
    }
    if let Some(path) = &args.html {
        render::write_html(path, &product, &review)?;
        eprintln!("HTML written to {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn apply_overrides(config: &mut AppConfig, args: &ReviewArgs) {
    if let Some(provider) = &args.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &args.model {
        config.llm.model = Some(model.clone());
    }
    if let Some(env) = &args.api_key_env {
        config.llm.api_key_env = Some(env.clone());
    }
    if let Some(attempts) = args.max_attempts {
        config.search.max_attempts = attempts;
    }
}

/// Wire the production capabilities. Configuration problems (unknown
/// provider, blank model, missing key) come back as a classified report.
fn build_pipeline(
    config: &AppConfig,
    quiet: bool,
) -> std::result::Result<(ReviewPipeline, Arc<CliProgress>), FailureReport> {
    let synthesizer = ChatSynthesizer::from_config(&config.llm).map_err(FailureReport::new)?;
    let searcher = WebSearcher::new(&config.search, &config.scrape).map_err(FailureReport::new)?;
    let scraper = PageScraper::new(&config.scrape).map_err(FailureReport::new)?;

    let progress = Arc::new(CliProgress::new(quiet));
    let pipeline = ReviewPipeline::new(Arc::new(searcher), Arc::new(scraper), Arc::new(synthesizer))
        .with_options(PipelineOptions::from(&config.search))
        .with_progress(progress.clone());

    Ok((pipeline, progress))
}

// ---------------------------------------------------------------------------
// Listings and config
// ---------------------------------------------------------------------------

fn cmd_examples() -> Result<ExitCode> {
    for product in EXAMPLE_PRODUCTS {
        println!("{product}");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_providers() -> Result<ExitCode> {
    println!("  {:<8} {:<28} {}", "NAME", "DEFAULT MODEL", "API KEY VARIABLE");
    for provider in Provider::ALL {
        println!(
            "  {:<8} {:<28} {}",
            provider.name(),
            provider.default_model(),
            provider.api_key_env()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_init() -> Result<ExitCode> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show() -> Result<ExitCode> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(ExitCode::SUCCESS)
}
