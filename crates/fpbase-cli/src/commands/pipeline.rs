use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use fpbase_core::io::diagnostics_io::write_diagnostics_path;
use fpbase_core::io::table::{read_measurements_path, write_corrected_path};
use fpbase_core::pipeline::config::{FallTime, InclusionPolicy, PipelineConfig};
use fpbase_core::pipeline::{run_pipeline_reported, PipelineStage, ProgressReporter};
use fpbase_core::reference::{NoReferenceEpochs, ReferenceEpochSource, StaticReferenceEpochs};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::summary::{print_result_summary, print_run_summary};

#[derive(Clone, Copy, ValueEnum)]
pub enum InclusionArg {
    Corrected,
    KeepAll,
    WindowOnly,
}

impl From<InclusionArg> for InclusionPolicy {
    fn from(arg: InclusionArg) -> Self {
        match arg {
            InclusionArg::Corrected => Self::Corrected,
            InclusionArg::KeepAll => Self::KeepAll,
            InclusionArg::WindowOnly => Self::TransientWindowOnly,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Input measurement table (CSV)
    pub file: PathBuf,

    /// Pipeline config file (TOML); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Corrected output table (CSV)
    #[arg(short, long, default_value = "corrected.csv")]
    pub output: PathBuf,

    /// Write run diagnostics as JSON
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,

    /// Reference image end epochs (CSV with fcqfid,end_mjd columns)
    #[arg(long)]
    pub reference_epochs: Option<PathBuf>,

    /// Reference epoch service endpoint
    #[cfg(feature = "http")]
    #[arg(long, conflicts_with = "reference_epochs")]
    pub reference_url: Option<String>,

    /// Overall time limit for the reference lookup, in seconds
    #[cfg(feature = "http")]
    #[arg(long, default_value = "30")]
    pub reference_timeout: u64,

    /// Days the reference image must end before a group's peak
    #[arg(long)]
    pub margin: Option<f64>,

    /// Disable the reference epoch gate
    #[arg(long, conflicts_with = "margin")]
    pub no_reference_gate: bool,

    /// Minimum peak signal-to-noise for a group to set the peak epoch
    #[arg(long)]
    pub min_snr: Option<f64>,

    /// Minimum rows per field and filter
    #[arg(long)]
    pub min_samples: Option<usize>,

    /// Keep only primary-grid fields
    #[arg(long)]
    pub primary_grid_only: bool,

    /// Days before peak excluded from the pre-peak baseline
    #[arg(long)]
    pub risetime: Option<f64>,

    /// Days after peak excluded from the post-peak baseline
    #[arg(long)]
    pub falltime: Option<f64>,

    /// Estimate the fall time from the peak magnitude (Co-56 decay)
    #[arg(long, conflicts_with = "falltime")]
    pub decay: bool,

    /// Which rows to write
    #[arg(long, value_enum)]
    pub include: Option<InclusionArg>,

    /// Compute statistics on native zeropoints instead of a common pivot
    #[arg(long)]
    pub no_normalize: bool,
}

/// Drives an indicatif bar from pipeline stage events.
///
/// The bar counts stages; per-group progress within a stage goes into the
/// message.
struct BarReporter {
    bar: ProgressBar,
    stage: Mutex<String>,
    current_total: AtomicUsize,
}

impl BarReporter {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(7);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:30} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        Ok(Self {
            bar,
            stage: Mutex::new(String::new()),
            current_total: AtomicUsize::new(0),
        })
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        let label = stage.to_string();
        self.current_total.store(total_items.unwrap_or(0), Ordering::Relaxed);
        self.bar.set_message(label.clone());
        if let Ok(mut current) = self.stage.lock() {
            *current = label;
        }
    }

    fn advance(&self, items_done: usize) {
        let total = self.current_total.load(Ordering::Relaxed);
        if let Ok(current) = self.stage.lock() {
            self.bar.set_message(format!("{} ({items_done}/{total})", *current));
        }
    }

    fn finish_stage(&self) {
        self.bar.inc(1);
    }
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut config = super::config::load(args.config.as_deref())?;
    apply_overrides(&mut config, args);

    let source = reference_source(args)?;
    print_run_summary(&config, &args.file, &args.output, source.name());

    let rows = read_measurements_path(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    info!(rows = rows.len(), reference = source.name(), "Measurement table loaded");

    let reporter = Arc::new(BarReporter::new()?);
    let output = run_pipeline_reported(&rows, &config, source.as_ref(), reporter.clone())?;
    reporter.bar.finish_with_message("Done");

    write_corrected_path(&args.output, &output.rows)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    if let Some(ref path) = args.diagnostics {
        write_diagnostics_path(path, &output.diagnostics)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    print_result_summary(&output.diagnostics, output.rows.len());
    println!("Output saved to {}", args.output.display());
    Ok(())
}

fn apply_overrides(config: &mut PipelineConfig, args: &RunArgs) {
    if let Some(margin) = args.margin {
        config.reference.margin_days = Some(margin);
    }
    if args.no_reference_gate {
        config.reference.margin_days = None;
    }
    if let Some(snr) = args.min_snr {
        config.peak.min_peak_snr = snr;
    }
    if let Some(n) = args.min_samples {
        config.quality.min_samples_per_group = n;
    }
    if args.primary_grid_only {
        config.quality.primary_grid_only = true;
    }
    if let Some(days) = args.risetime {
        config.window.risetime_days = days;
    }
    if let Some(days) = args.falltime {
        config.window.falltime = FallTime::Fixed(days);
    }
    if args.decay {
        config.window.falltime = FallTime::Decay;
    }
    if let Some(include) = args.include {
        config.output.inclusion = include.into();
    }
    if args.no_normalize {
        config.output.normalize_zeropoint = false;
    }
}

fn reference_source(args: &RunArgs) -> Result<Box<dyn ReferenceEpochSource>> {
    #[cfg(feature = "http")]
    if let Some(ref url) = args.reference_url {
        use fpbase_core::reference::{HttpReferenceEpochs, RetryPolicy};

        let policy = RetryPolicy {
            deadline: std::time::Duration::from_secs(args.reference_timeout),
            ..Default::default()
        };
        return Ok(Box::new(HttpReferenceEpochs::new(url.clone(), policy)?));
    }

    if let Some(ref path) = args.reference_epochs {
        let epochs = StaticReferenceEpochs::from_csv_path(path)
            .with_context(|| format!("Failed to read reference epochs {}", path.display()))?;
        return Ok(Box::new(epochs));
    }

    Ok(Box::new(NoReferenceEpochs))
}
