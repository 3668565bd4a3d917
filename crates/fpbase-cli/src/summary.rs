use std::path::Path;

use console::Style;
use fpbase_core::pipeline::config::PipelineConfig;
use fpbase_core::pipeline::BaselineDiagnostics;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    warning: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            warning: Style::new().yellow().bold(),
            path: Style::new().underlined(),
        }
    }
}

fn list_or_none(values: &[u8]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn print_run_summary(config: &PipelineConfig, input: &Path, output: &Path, reference: &str) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Baseline Correction"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(19)));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Input"), s.path.apply_to(input.display()));
    println!("  {:<14}{}", s.label.apply_to("Output"), s.path.apply_to(output.display()));
    println!();

    let q = &config.quality;
    println!("  {}", s.header.apply_to("Quality"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Pass flag"),
        s.value.apply_to(if q.require_pass_flag { "required" } else { "ignored" })
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Grid"),
        s.value.apply_to(if q.primary_grid_only { "primary only" } else { "all" })
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Min rows"),
        s.value.apply_to(q.min_samples_per_group)
    );
    println!();

    let p = &config.peak;
    println!("  {}", s.header.apply_to("Peak"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Window"),
        s.value.apply_to(format!("{} d", p.window_days))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Min SNR"),
        s.value.apply_to(p.min_peak_snr)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Skip filters"),
        s.value.apply_to(list_or_none(&p.excluded_filters))
    );
    println!();

    println!("  {}", s.header.apply_to("Transient Window"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Rise"),
        s.value.apply_to(format!("{} d", config.window.risetime_days))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Fall"),
        s.method.apply_to(config.window.falltime)
    );
    println!();

    match config.reference.active_margin() {
        Some(margin) => {
            println!("  {}", s.header.apply_to("Reference Gate"));
            println!("    {:<14}{}", s.label.apply_to("Source"), s.method.apply_to(reference));
            println!(
                "    {:<14}{}",
                s.label.apply_to("Margin"),
                s.value.apply_to(format!("{margin} d"))
            );
        }
        None => println!(
            "  {:<16}{}",
            s.header.apply_to("Reference Gate"),
            s.disabled.apply_to("disabled")
        ),
    }
    println!();

    println!("  {}", s.header.apply_to("Output"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Rows"),
        s.method.apply_to(config.output.inclusion)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("No baseline"),
        s.value.apply_to(list_or_none(&config.baseline.excluded_filters))
    );
    if config.output.normalize_zeropoint {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Zeropoint"),
            s.value.apply_to(format!("pivot {}", config.output.pivot_zeropoint))
        );
    } else {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Zeropoint"),
            s.disabled.apply_to("native")
        );
    }
    println!();
}

pub fn print_result_summary(diagnostics: &BaselineDiagnostics, rows_written: usize) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Result"));
    match diagnostics.peak {
        Some(peak) => {
            println!(
                "    {:<14}{}",
                s.label.apply_to("Peak"),
                s.value.apply_to(format!(
                    "MJD {:.3} ({} group(s))",
                    peak.time, peak.contributors
                ))
            );
            if peak.scatter_warning {
                println!(
                    "    {:<14}{}",
                    "",
                    s.warning.apply_to(format!(
                        "peak times scatter by {:.1} d",
                        peak.scatter_days.unwrap_or_default()
                    ))
                );
            }
        }
        None => println!(
            "    {:<14}{}",
            s.label.apply_to("Peak"),
            s.disabled.apply_to("none found")
        ),
    }

    let (pre, post, none) = diagnostics.side_counts();
    println!(
        "    {:<14}{}",
        s.label.apply_to("Baselines"),
        s.value.apply_to(format!("{pre} pre, {post} post, {none} none"))
    );
    let gated = diagnostics
        .groups
        .values()
        .filter(|g| g.excluded_by_reference)
        .count();
    if gated > 0 {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Gated"),
            s.value.apply_to(format!("{gated} group(s)"))
        );
    }
    if diagnostics.reference_lookup_failed {
        println!(
            "    {:<14}{}",
            s.label.apply_to("References"),
            s.warning.apply_to("lookup failed; no groups gated")
        );
    }
    println!(
        "    {:<14}{}",
        s.label.apply_to("Rows"),
        s.value.apply_to(format!(
            "{rows_written} written ({} after quality filters)",
            diagnostics.quality.output_rows
        ))
    );
    println!();
}
