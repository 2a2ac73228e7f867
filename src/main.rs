//! obsup - install and update OBS Studio and its plugins.

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use console::style;
use obsup::config::InstallConfig;
use obsup::http::{create_http_client, HttpClientConfig};
use obsup::installer::{InstallerBuilder, RunReport, Stage};
use obsup::progress::StyleOptions;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Install OBS Studio and a set of plugins, or bring them up to date.
#[derive(Parser, Debug)]
#[command(name = "obsup", author, version, about)]
struct Cli {
    /// Configuration document: a local path or an http(s) URL
    #[arg(long, short = 'j')]
    config: Option<String>,

    /// Installation directory (defaults to ~/cgg-obs)
    #[arg(long, short = 't')]
    target: Option<PathBuf>,

    /// Downloads cache directory (defaults to <target>/downloads)
    #[arg(long, short = 'd')]
    downloads: Option<PathBuf>,

    /// GitHub personal access token
    #[arg(long, short = 'g', env = "GITHUB_TOKEN", hide_env_values = true)]
    github: Option<String>,

    /// Only install the named object
    #[arg(long)]
    only: Option<String>,

    /// Retries for lookups and transfers
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// Prune cached archives older than this many days
    #[arg(long)]
    prune_days: Option<u32>,

    /// Do not draw progress bars
    #[arg(long)]
    no_progress: bool,

    /// Log debug output
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "obsup=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &RunReport) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Object", "Status", "File", "Version", "Details"]);

    for outcome in &report.outcomes {
        let color = match outcome.stage {
            Stage::Done => Color::Green,
            Stage::Skipped => Color::Blue,
            Stage::Cancelled => Color::Yellow,
            _ => Color::Red,
        };
        let mut details = match (&outcome.error, outcome.reason) {
            (Some(error), _) => error.clone(),
            (None, Some(reason)) => reason.to_string(),
            (None, None) => String::new(),
        };
        if let Some(move_error) = &outcome.move_error {
            if !details.is_empty() {
                details.push_str("; ");
            }
            details.push_str(&format!("move: {}", move_error));
        }
        table.add_row(vec![
            Cell::new(&outcome.name),
            Cell::new(outcome.stage).fg(color),
            Cell::new(outcome.filename.as_deref().unwrap_or("-")),
            Cell::new(outcome.version.as_deref().unwrap_or("-")),
            Cell::new(details),
        ]);
    }

    println!("{table}");
    println!(
        "{} installed, {} up to date, {} failed",
        style(report.installed()).green(),
        style(report.skipped()).blue(),
        style(report.failed()).red()
    );
    if let Some(error) = &report.state_error {
        println!("{} {}", style("Version state not saved:").red().bold(), error);
    }
    if !report.pruned.is_empty() {
        println!("Pruned {} stale archives", report.pruned.len());
    }
    if let Some(log) = &report.log_file {
        println!("Run log: {}", log.display());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let target = match cli.target {
        Some(target) => target,
        None => dirs::home_dir()
            .ok_or_else(|| eyre!("cannot determine the home directory, pass --target"))?
            .join("cgg-obs"),
    };

    let client = create_http_client(HttpClientConfig {
        retries: cli.retries,
        ..Default::default()
    })?;
    let config = InstallConfig::load(cli.config.as_deref(), &client)
        .await
        .wrap_err("cannot load the configuration")?;

    let style_options = if cli.no_progress {
        StyleOptions::hidden()
    } else {
        StyleOptions::default()
    };

    let mut builder = InstallerBuilder::new()
        .install_dir(target)
        .retries(cli.retries)
        .github_token(cli.github)
        .style_options(style_options)
        .cache_retention_days(cli.prune_days);
    if let Some(downloads) = cli.downloads {
        builder = builder.cache_dir(downloads);
    }
    let installer = builder.build()?;

    let cancel = installer.cancel_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", style("Cancelling after the current step...").yellow());
            cancel.cancel();
        }
    });

    let report = match cli.only {
        Some(name) => installer.install_only(&config, &name).await?,
        None => installer.run(&config).await,
    };
    print_report(&report);

    if report.is_success() {
        Ok(())
    } else {
        std::process::exit(1)
    }
}
