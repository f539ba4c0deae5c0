use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use sitescout_core::llm::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use sitescout_core::{
    BatchSummary, FetchConfig, Generator, HttpFetcher, LlmConfig, LlmReasoner, ScoutConfig, write_report,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Explore article sites and generate validated extraction selectors
#[derive(Parser, Debug)]
#[command(name = "sitescout")]
#[command(author = "Sitescout Contributors")]
#[command(version)]
#[command(about = "Explore article sites and generate validated extraction selectors", long_about = None)]
struct Args {
    /// Site URLs to process (directories with --local)
    #[arg(value_name = "URL", required = true)]
    urls: Vec<String>,

    /// Treat each argument as a directory of saved HTML pages
    #[arg(long)]
    local: bool,

    /// Directory for generated selector reports
    #[arg(short, long, default_value = "scrapers", value_name = "DIR")]
    output: PathBuf,

    /// Maximum exploration iterations per site
    #[arg(long, default_value = "15", value_name = "NUM")]
    max_iterations: u32,

    /// Stop exploring once this many article URLs are known
    #[arg(long, default_value = "30", value_name = "NUM")]
    max_articles: usize,

    /// Selector revisions after the initial proposal
    #[arg(long, default_value = "2", value_name = "NUM")]
    max_retries: u32,

    /// Article pages sampled for validation
    #[arg(long, default_value = "5", value_name = "NUM")]
    samples: usize,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "15", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Model identifier
    #[arg(long, env = "SITESCOUT_MODEL", default_value = DEFAULT_MODEL, value_name = "MODEL")]
    model: String,

    /// Chat-completions endpoint
    #[arg(long, env = "SITESCOUT_API_URL", default_value = DEFAULT_ENDPOINT, value_name = "URL")]
    api_url: String,

    /// API key for the model endpoint
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true, value_name = "KEY")]
    api_key: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sitescout_core=debug,sitescout=debug" } else { "sitescout_core=warn,sitescout=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn scout_config(args: &Args) -> ScoutConfig {
    let mut fetch = FetchConfig { timeout: args.timeout, ..Default::default() };
    if let Some(ua) = &args.user_agent {
        fetch.user_agent = ua.clone();
    }

    ScoutConfig::builder()
        .max_iterations(args.max_iterations)
        .max_articles(args.max_articles)
        .max_retries(args.max_retries)
        .sample_count(args.samples)
        .fetch(fetch)
        .build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    let api_key = args
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .context("No API key: pass --api-key or set OPENROUTER_API_KEY")?;

    if !args.local {
        for url in &args.urls {
            Url::parse(url).with_context(|| format!("Invalid site URL: {}", url))?;
        }
    }

    let config = scout_config(&args);
    config.validate().context("Invalid configuration")?;

    let llm = LlmConfig { endpoint: args.api_url.clone(), model: args.model.clone(), ..LlmConfig::new(api_key) };
    let reasoner = LlmReasoner::new(&llm).context("Failed to create model client")?;
    if args.verbose {
        echo::print_info(&format!("Model: {}", reasoner.model()));
    }
    let fetcher = HttpFetcher::new(config.fetch.clone()).context("Failed to create HTTP client")?;
    let generator = Generator::new(Arc::new(reasoner), Arc::new(fetcher), config);

    let total = args.urls.len();
    let mut summary = BatchSummary::default();

    for (i, site) in args.urls.iter().enumerate() {
        let verb = if args.local { "Reading" } else { "Exploring" };
        echo::print_step(i + 1, total, &format!("{} {}", verb, site.bright_white().underline()));

        let result = if args.local {
            generator.generate_local(Path::new(site)).await
        } else {
            generator.generate(site).await
        };
        match result {
            Ok(report) => {
                let path = write_report(&report, &args.output)
                    .with_context(|| format!("Failed to write report for {}", site))?;
                echo::print_outcome(&report);
                if args.verbose {
                    echo::print_report(&report);
                }
                info!(%site, path = %path.display(), "report written");
                echo::print_info(&format!("Report written to {}", path.display()));
                summary.record_report(&report, Some(path));
            }
            Err(err) => {
                error!(%site, error = %err, "generation failed");
                if let Some(state) = err.partial_state() {
                    echo::print_info(&format!("{} article URLs confirmed before the failure", state.articles.len()));
                }
                echo::print_error(&format!("{}: {}", site, err));
                summary.record_error(site.clone(), &err);
            }
        }
        eprintln!();
    }

    if total > 1 {
        let path = summary.write(&args.output).context("Failed to write batch summary")?;
        echo::print_batch_summary(&summary);
        echo::print_info(&format!("Batch summary written to {}", path.display()));
    }

    if summary.failed() == total {
        anyhow::bail!("No site could be processed");
    }
    Ok(())
}
