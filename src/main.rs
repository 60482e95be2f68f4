use anyhow::{Context, Result};
use clap::Parser;
use glob::glob;
use heroscraper::{config::Config, pipeline, process::RawEntity};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "heroscraper")]
#[command(about = "Normalize scraped hero pages into keyed CSV files")]
struct Args {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory (overrides config and HEROSCRAPER_DATA_DIR)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Glob of raw entity JSON files (overrides config and HEROSCRAPER_INPUT)
    #[arg(short, long)]
    input: Option<String>,

    /// Re-process entities already listed in a ledger
    #[arg(long)]
    force: bool,

    /// Skip the full display tables under `tables/`
    #[arg(long)]
    no_tables: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // ─── 1) config: file, then env, then flags ───────────────────────
    let mut cfg = Config::load_or_default(args.config.as_deref())?.with_env()?;
    if let Some(dir) = args.data_dir {
        cfg.data_dir = dir;
    }
    if let Some(input) = args.input {
        cfg.input = input;
    }
    if args.no_tables {
        cfg.write_tables = false;
    }
    cfg.validate()?;

    // ─── 2) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!(data_dir = %cfg.data_dir.display(), input = %cfg.input, "startup");

    // ─── 3) discover inputs ──────────────────────────────────────────
    let mut paths = Vec::new();
    for entry in glob(&cfg.input).with_context(|| format!("bad input glob {:?}", cfg.input))? {
        match entry {
            Ok(p) => paths.push(p),
            Err(e) => warn!("unreadable input path: {}", e),
        }
    }
    paths.sort();
    if paths.is_empty() {
        info!("no input files; exit");
        return Ok(());
    }
    info!("{} input files", paths.len());

    // ─── 4) normalize + persist ──────────────────────────────────────
    let mut pipeline = pipeline::open(&cfg.data_dir, cfg.write_tables, args.force);
    let summary = pipeline.run(paths.iter().map(RawEntity::load));
    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        failed = summary.failed,
        memo = pipeline.normalizer().projector().cached(),
        "done"
    );
    Ok(())
}
