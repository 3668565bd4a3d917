use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use fpbase_core::io::table::read_measurements_path;
use fpbase_core::pipeline::summarize_groups;

#[derive(Args)]
pub struct InfoArgs {
    /// Input measurement table (CSV)
    pub file: PathBuf,

    /// Pipeline config file (TOML) whose quality filters are applied
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let config = super::config::load(args.config.as_deref())?;
    let rows = read_measurements_path(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let groups = summarize_groups(&rows, &config)?;

    println!("File:        {}", args.file.display());
    println!("Rows:        {}", rows.len());
    let (first, last) = rows
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), m| {
            (lo.min(m.mjd), hi.max(m.mjd))
        });
    if first <= last {
        println!("Time span:   MJD {first:.3} .. {last:.3} ({:.1} d)", last - first);
    }
    let kept: usize = groups.values().sum();
    println!("After QA:    {} rows in {} groups", kept, groups.len());

    if !groups.is_empty() {
        println!();
        println!(
            "  {:<10} {:>6} {:>5} {:>4} {:>7} {:>6}",
            "fcqfid", "field", "chip", "quad", "filter", "rows"
        );
        for (key, count) in &groups {
            println!(
                "  {:<10} {:>6} {:>5} {:>4} {:>7} {:>6}",
                key.fcqfid(),
                key.field(),
                key.chip(),
                key.quadrant(),
                key.filter(),
                count
            );
        }
    }

    Ok(())
}
