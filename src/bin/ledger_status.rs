use anyhow::Result;
use clap::Parser;
use heroscraper::{config::Config, history::load_counts};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ledger-status")]
#[command(about = "Show how many entities each completion ledger holds")]
struct Args {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::load_or_default(args.config.as_deref())?.with_env()?;
    let data_dir = args.data_dir.unwrap_or(cfg.data_dir);

    println!("ledgers in {}", data_dir.display());
    let mut total = 0;
    for (category, count) in load_counts(&data_dir)? {
        println!("  {:<14} {:>6}", category.ledger_file(), count);
        total += count;
    }
    println!("  {:<14} {:>6}", "total", total);
    Ok(())
}
