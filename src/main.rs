use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gitreview::analyzer::Analyzer;
use gitreview::categorize::{Category, categorize};
use gitreview::cli::Cli;
use gitreview::config::Config;
use gitreview::discovery::discover;
use gitreview::error::{Error, Result};
use gitreview::output::{categories_json, emit_journal};
use gitreview::process::ShellExecutor;
use gitreview::review::{CommandLauncher, Reviewer, StdinConsole};

fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    info!(?config, "config loaded");

    if let Err(e) = run(config).await {
        if matches!(&e, Error::Interrupted) {
            std::process::exit(130);
        }
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    if !config.fetch {
        info!("running git fetch with --dry-run (updated repositories will not be reviewed)");
    }

    let paths = discover(&config)?;
    let analyzer = Analyzer::new(config.workers, ShellExecutor, config.commands());
    let reports = analyzer.analyze_all(paths).await;
    let categories = categorize(&reports, &config.categorize_settings());

    if config.json {
        println!("{}", categories_json(&categories)?);
        return Ok(());
    }

    let mut reviewer = Reviewer::new(
        StdinConsole,
        CommandLauncher::new(config.gui.clone()),
        config.review,
    );
    reviewer.review_all(&categories)?;

    if categories.len(Category::Journal) > 0 {
        reviewer.conclude()?;
        emit_journal(
            &categories,
            &config.outfile,
            chrono::Local::now().date_naive(),
        )?;
    }
    Ok(())
}
