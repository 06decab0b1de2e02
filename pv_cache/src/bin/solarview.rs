use std::{fs::File, io::BufWriter, path::PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use pv_cache::{
    config::{DEFAULT_CONFIG_PATH, PASSWORD_ENV, Settings, load_config_path},
    export::write_matrix_csv,
    persist::{JsonFileRepo, LoadOutcome, YearRepo},
    providers::build_provider,
    summary::YearSummary,
    sync::{SyncOptions, sync_year_with_progress},
    tz::today_in,
};
use shared_utils::env::get_env_var_opt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Incremental PV production cache")]
struct Cli {
    /// Configuration file.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Fetch missing and open days of a year and save them.
    Sync {
        /// Year to sync; defaults to the current year at the site.
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..=9999))]
        year: Option<i32>,
    },
    /// List locally stored years.
    Years,
    /// Coverage and energy summary of a stored year.
    Show {
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..=9999))]
        year: i32,
    },
    /// Write the day × slot matrix of a stored year as CSV.
    Export {
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..=9999))]
        year: i32,
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = load_config_path(&cli.config)
        .and_then(|cfg| cfg.validate(get_env_var_opt(PASSWORD_ENV)))
        .with_context(|| format!("invalid configuration in {}", cli.config.display()))?;

    let repo = JsonFileRepo::new(&settings.storage.dir, settings.storage.pattern.clone());

    match cli.cmd {
        Cmd::Sync { year } => run_sync(settings, &repo, year).await,
        Cmd::Years => {
            let years = repo.years_available()?;
            if years.is_empty() {
                println!("no stored years in {}", repo.dir().display());
            }
            for y in years {
                println!("{y}");
            }
            Ok(())
        }
        Cmd::Show { year } => {
            let store = match repo.load(year)? {
                LoadOutcome::Loaded(store) => store,
                LoadOutcome::Missing => bail!("no stored data for {year}"),
                LoadOutcome::Corrupt(reason) => bail!("stored file for {year} is corrupt: {reason}"),
            };
            print!("{}", YearSummary::of(&store));
            Ok(())
        }
        Cmd::Export { year, out } => {
            let store = repo.get(year, settings.grid)?;
            if store.is_empty() {
                info!(year, "no stored data, exporting an all-NA matrix");
            }
            let file = File::create(&out).with_context(|| format!("cannot create {}", out.display()))?;
            write_matrix_csv(&store.matrix_for_rendering(), BufWriter::new(file))
                .with_context(|| format!("cannot write {}", out.display()))?;
            info!(year, out = %out.display(), "exported matrix");
            Ok(())
        }
    }
}

async fn run_sync(settings: Settings, repo: &JsonFileRepo, year: Option<i32>) -> Result<()> {
    let now = Utc::now();
    let today = today_in(settings.timezone, now);
    let year = year.unwrap_or_else(|| today.year());

    let opt = SyncOptions {
        today,
        now,
        grid: settings.grid,
        policy: settings.policy,
        max_consecutive_failures: settings.max_consecutive_failures,
    };
    let provider = build_provider(settings.fetcher).context("cannot set up the fetcher")?;

    info!(year, %today, "starting sync");
    let mut last_pct = 0;
    let report = sync_year_with_progress(repo, provider.as_ref(), year, &opt, &mut |p| {
        let pct = p.done * 100 / p.total.max(1);
        if pct / 10 > last_pct / 10 || p.done == p.total {
            info!(done = p.done, total = p.total, day = %p.day, "progress {pct}%");
            last_pct = pct;
        }
    })
    .await?;

    print!("{report}");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}
