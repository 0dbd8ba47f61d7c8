use anyhow::{Context, Result};
use clap::Parser;
use pac_engine::{ConfigLoader, PacSelector};
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pac-eval")]
#[command(about = "Evaluate a proxy auto-config script for one or more URLs")]
struct Args {
    /// PAC script location: file:// or http(s):// URI, or a path
    #[arg(long, short = 'p', env = "PAC_EVAL_PAC")]
    pac: Option<String>,

    /// Config file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,

    /// URLs to find proxies for
    #[arg(required = true)]
    urls: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let env_filter = if args.verbose {
        EnvFilter::from_default_env()
            .add_directive(tracing_subscriber::filter::LevelFilter::DEBUG.into())
    } else {
        EnvFilter::from_default_env()
            .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config =
        ConfigLoader::load_or_default(args.config).context("Failed to load configuration")?;
    if let Some(pac) = args.pac {
        config.pac.url = Some(pac);
    }
    if config.pac.url.is_none() {
        anyhow::bail!("No PAC location given; use --pac or set pac.url in the config file");
    }

    let selector = PacSelector::from_config(&config).context("Invalid configuration")?;

    for url in &args.urls {
        println!("{} -> {}", url, selector.select_str(url));
    }

    Ok(())
}
