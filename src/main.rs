use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use composite_density::{SampleSnapshot, SolverOptions, WeightingMode, DEFAULT_FLAG_THRESHOLD};
use quadcomp::assets::PresetLoader;
use quadcomp::models::SessionConfig;
use quadcomp::services::{CorrectionService, DiagnosticsStore, SessionTrace};

#[derive(Parser)]
#[command(name = "quadcomp")]
#[command(about = "Composite density correction for multi-ink quad calibration")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Correct the base curves of a session
    Correct {
        /// Session file (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Write corrected curves and summary as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write per-sample diagnostics as JSON
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Override the weighting mode: isolated, equal, normalized or momentum
        #[arg(short, long)]
        mode: Option<WeightingMode>,

        /// Skip auto-raise even if the session enables it
        #[arg(long)]
        no_auto_raise: bool,
    },
    /// Inspect a recorded trace
    Inspect {
        /// Trace file written by `correct --trace`
        #[arg(short, long)]
        trace: PathBuf,

        /// Sample to select
        #[arg(short, long)]
        index: Option<usize>,

        /// Step the selection by this many samples
        #[arg(short, long, allow_hyphen_values = true)]
        step: Option<isize>,

        /// Percentage-point jump that flags a sample
        #[arg(long, default_value_t = DEFAULT_FLAG_THRESHOLD)]
        threshold: f64,
    },
    /// Extract the embedded example session and measurement
    Init {
        /// Target directory (default: current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Overwrite existing files
        #[arg(long, short)]
        force: bool,

        /// List embedded presets without extracting
        #[arg(long)]
        list: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Correct {
            config,
            output,
            trace,
            mode,
            no_auto_raise,
        }) => {
            init_tracing();
            run_correct_command(&config, output, trace, mode, no_auto_raise)
        }
        Some(Commands::Inspect {
            trace,
            index,
            step,
            threshold,
        }) => {
            init_tracing();
            run_inspect_command(&trace, index, step, threshold)
        }
        Some(Commands::Init { dir, force, list }) => run_init_command(dir, force, list),
        None => {
            run_status_command();
            Ok(())
        }
    }
}

/// Minimal logging for CLI
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quadcomp=info,composite_density=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();
}

/// Run a session and write the results
fn run_correct_command(
    config_path: &PathBuf,
    output: Option<PathBuf>,
    trace_path: Option<PathBuf>,
    mode: Option<WeightingMode>,
    no_auto_raise: bool,
) -> anyhow::Result<()> {
    let mut config = SessionConfig::load(config_path)?;
    if no_auto_raise {
        config.auto_raise.enabled = false;
    }
    if trace_path.is_some() {
        config.diagnostics.enabled = true;
    }
    let mode = mode.unwrap_or(config.weighting_mode);

    let mut service = CorrectionService::new(config)?;
    let outcome = service.run_mode(mode, None)?;
    let summary = &outcome.result.summary;

    println!(
        "Session {} ({}): {} channels, ladder {}",
        summary.session_id,
        summary.weighting_mode,
        summary.channel_names.len(),
        summary.density_ladder.join(" -> ")
    );
    if let Some(ref report) = outcome.auto_raise {
        for raise in report.raised() {
            println!(
                "  raised {} ink limit {} -> {}",
                raise.channel, raise.previous_limit, raise.new_limit
            );
        }
    }
    for curve in &outcome.result.curves {
        let overflow = summary
            .coverage_for(&curve.channel)
            .map(|c| c.overflow_count)
            .unwrap_or(0);
        println!(
            "  {:<4} end {:>5}  clamped {}",
            curve.channel,
            curve.curve.end_value(),
            overflow
        );
    }
    println!(
        "  ink delta {:+.4}, unmet samples {}, warnings {}, flags {}",
        summary.totals.ink_delta,
        summary.unmet.samples,
        summary.warnings.len(),
        outcome.flags.len()
    );
    if let Some(ref slope) = summary.slope {
        for channel in slope.channels.iter().filter(|c| c.adjusted) {
            println!(
                "  slope {:<4} max step {:.2}% -> {:.2}% ({} kernel windows{})",
                channel.channel,
                channel.max_step_before_percent,
                channel.max_step_after_percent,
                channel.kernel_windows,
                if channel.limited { ", limited" } else { "" }
            );
        }
    }
    for warning in &summary.warnings {
        println!("  warning: {warning}");
    }

    if let Some(path) = output {
        std::fs::write(&path, serde_json::to_string_pretty(&outcome)?)?;
        println!("Wrote {}", path.display());
    }
    if let Some(path) = trace_path {
        match outcome.trace {
            Some(ref trace) => {
                trace.save(&path)?;
                println!("Wrote {}", path.display());
            }
            None => tracing::warn!("No trace was recorded"),
        }
    }

    Ok(())
}

/// Print summary, flags and a selected snapshot of a trace
fn run_inspect_command(
    trace_path: &PathBuf,
    index: Option<usize>,
    step: Option<isize>,
    threshold: f64,
) -> anyhow::Result<()> {
    let trace = SessionTrace::load(trace_path)?;
    let store = DiagnosticsStore::new(true);
    store.store_trace(trace, threshold);

    if let Some(index) = index {
        if !store.select(index) {
            anyhow::bail!("No snapshot for sample {index}");
        }
    }
    if let Some(step) = step {
        store.step(step);
    }

    if let Some(summary) = store.summary() {
        println!(
            "Session {} ({}) recorded {}",
            summary.session_id,
            summary.weighting_mode,
            store
                .recorded_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "(unknown)".to_string())
        );
        println!("  ladder: {}", summary.density_ladder.join(" -> "));
        println!("  blend window: {} samples", summary.blend_window);
        println!(
            "  unmet samples: {} (max {:.5})",
            summary.unmet.samples, summary.unmet.max_remaining
        );
    }
    if let Some(report) = store.auto_raise() {
        println!(
            "  auto-raise: target {}%, {} raised",
            report.target_percent,
            report.raised().count()
        );
    }

    let flags = store.flags();
    println!("\nFlags ({} at {threshold} points):", flags.len());
    for flag in &flags {
        println!(
            "  #{:<3} {:>6.2}%  {:?} {:.3}  {}",
            flag.index,
            flag.input_percent,
            flag.kind,
            flag.magnitude,
            flag.channels.join(", ")
        );
    }

    if let Some(snapshot) = store.selected() {
        print_snapshot(&snapshot);
        if let Some(profile) = store.density_profile(snapshot.input_percent) {
            let shares: Vec<String> = profile
                .channels
                .iter()
                .map(|c| format!("{} {:.1}%", c.channel, c.share * 100.0))
                .collect();
            println!("  density {:.4}: {}", profile.total_density, shares.join(", "));
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &SampleSnapshot) {
    println!(
        "\nSample {} ({:.2}%): delta {:+.5}, applied {:+.5}, unmet {:+.5}, ease {:.3}",
        snapshot.index,
        snapshot.input_percent,
        snapshot.delta_density,
        snapshot.applied_density,
        snapshot.unmet_density,
        snapshot.sign_flip_ease
    );
    println!(
        "  {:<4} {:>9} {:>9} {:>9} {:>9} {:>10} {:>9}",
        "ch", "before", "after", "delta", "floor", "reserve", "cap"
    );
    for channel in &snapshot.channels {
        println!(
            "  {:<4} {:>9.5} {:>9.5} {:>+9.5} {:>9.5} {:>10} {:>9.5}{}",
            channel.channel,
            channel.normalized_before,
            channel.normalized_after,
            channel.normalized_delta,
            channel.coverage_floor_normalized,
            format!("{:?}", channel.reserve_state).to_lowercase(),
            channel.blend_cap_normalized,
            if channel.slope_adjusted { "  (slope)" } else { "" }
        );
    }
    for block in &snapshot.blocked {
        println!("  blocked {} ({:?})", block.channel, block.reason);
    }
    for transfer in &snapshot.transfers {
        println!(
            "  moved {:+.5} density {} -> {}",
            transfer.density, transfer.from, transfer.to
        );
    }
}

/// Extract embedded presets to the filesystem
fn run_init_command(dir: Option<PathBuf>, force: bool, list: bool) -> anyhow::Result<()> {
    if list {
        println!("Embedded presets:\n");
        for f in PresetLoader::list_embedded() {
            println!("  {f}");
        }
        return Ok(());
    }

    let loader = PresetLoader::new(dir);
    let report = loader.init(force)?;

    if !report.written.is_empty() {
        println!("Extracted {} files:", report.written.len());
        for f in &report.written {
            println!("  + {f}");
        }
    }
    if !report.skipped.is_empty() {
        println!(
            "\nSkipped {} existing files (use --force to overwrite):",
            report.skipped.len()
        );
        for f in &report.skipped {
            println!("  - {f}");
        }
    }

    if report.written.is_empty() && report.skipped.is_empty() {
        println!("No files to extract.");
    }

    Ok(())
}

/// Display version, modes and default settings
fn run_status_command() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    let defaults = SolverOptions::default();

    println!("quadcomp v{VERSION}");
    println!("Composite density correction for multi-ink quad calibration\n");

    println!("Weighting modes:");
    for mode in WeightingMode::ALL {
        println!("  {mode}");
    }

    println!("\nDefaults:");
    println!(
        "  Blend window:   {} samples (span {}, alpha {})",
        defaults.smoothing.sample_count(),
        defaults.smoothing.target_span,
        defaults.smoothing.alpha
    );
    println!(
        "  Reserve band:   from {}% of ceiling, taper exponent {}",
        defaults.reserve.start_fraction * 100.0,
        defaults.reserve.taper_exponent
    );
    println!("  Coverage:       buffer {}", defaults.coverage_buffer);
    println!(
        "  Slope pass:     {} (threshold {}%, kernel {})",
        if defaults.slope.enabled { "on" } else { "off" },
        defaults.slope.threshold_percent,
        defaults.slope.kernel
    );
    println!("  Flag threshold: {DEFAULT_FLAG_THRESHOLD} points");

    println!("\nCommands:");
    println!("  quadcomp correct   Correct a session's base curves");
    println!("  quadcomp inspect   Inspect a recorded trace");
    println!("  quadcomp init      Extract the example session");
    println!("\nRun 'quadcomp --help' for more details.");
}
