use crate::catalog::StageCatalog;
use crate::model::{CompletedPolicy, ProgressEvent, SimConfig};
use crate::scenarios::{self, Scenario};
use crate::tracker::RunTracker;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "phasewalk",
    version,
    about = "Staged compilation-phase progress simulator with optional TUI"
)]
pub struct Cli {
    /// Builtin scenario to run (see --list)
    #[arg(long, default_value = "walkthrough")]
    pub scenario: String,

    /// List builtin scenarios and exit
    #[arg(long)]
    pub list: bool,

    /// Run a custom stage catalog from a JSON file instead of a builtin scenario
    #[arg(long)]
    pub catalog: Option<std::path::PathBuf>,

    /// Delay before each phase completes
    #[arg(long, default_value = "1s")]
    pub phase_delay: humantime::Duration,

    /// Settle delay after the last phase completes
    #[arg(long, default_value = "500ms")]
    pub settle_delay: humantime::Duration,

    /// What `start` does on a run that already completed its catalog
    #[arg(long, value_enum, default_value_t = CompletedPolicy::RequireReset)]
    pub on_complete: CompletedPolicy,

    /// Animate the run as text lines and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Run silently and print the final progress as JSON (no TUI)
    #[arg(long)]
    pub json: bool,
}

/// Build a `SimConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> SimConfig {
    SimConfig {
        phase_delay: Duration::from(args.phase_delay),
        settle_delay: Duration::from(args.settle_delay),
        on_complete: args.on_complete,
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.list {
        return list_scenarios();
    }

    if args.json {
        return run_json(args).await;
    }

    if !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
    }

    run_text(args).await
}

fn list_scenarios() -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for s in scenarios::builtin() {
        writeln!(out, "{:<12} {}: {}", s.id, s.title, s.description)?;
    }
    Ok(())
}

/// Resolve what to run: a builtin scenario, or a custom catalog file with the
/// file stem as its run id.
fn resolve_target(args: &Cli) -> Result<(String, Arc<StageCatalog>, Option<Scenario>)> {
    if let Some(path) = args.catalog.as_deref() {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {}", path.display()))?;
        let catalog: StageCatalog = serde_json::from_str(&raw)
            .with_context(|| format!("invalid stage catalog in {}", path.display()))?;
        let run_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("custom")
            .to_string();
        return Ok((run_id, Arc::new(catalog), None));
    }
    let scenario = scenarios::find(&args.scenario).with_context(|| {
        format!(
            "unknown scenario '{}' (use --list to see builtin scenarios)",
            args.scenario
        )
    })?;
    Ok((
        scenario.id.to_string(),
        Arc::clone(&scenario.catalog),
        Some(scenario),
    ))
}

/// Animate one run as text: phase lines to stderr as they complete, the
/// scenario output to stdout once the run settles.
async fn run_text(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let (run_id, catalog, scenario) = resolve_target(&args)?;
    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let tracker = RunTracker::with_events(cfg, evt_tx);

    if let Some(s) = &scenario {
        let _ = out_tx.send(OutputLine::Stderr(format!("== {} ==", s.title)));
        for line in s.code.lines() {
            let _ = out_tx.send(OutputLine::Stderr(format!("    {line}")));
        }
    }

    let total = catalog.len();
    tracker.start(&run_id, catalog);

    while let Some(ev) = evt_rx.recv().await {
        match ev {
            ProgressEvent::RunStarted { .. } => {}
            ProgressEvent::PhaseCompleted { index, name, .. } => {
                let _ = out_tx.send(OutputLine::Stderr(format!(
                    "[{}/{}] {} ✓",
                    index + 1,
                    total,
                    name
                )));
            }
            ProgressEvent::RunCompleted { .. } => break,
            ProgressEvent::RunReset { .. } => {}
        }
    }

    if let Some(s) = &scenario {
        for line in s.output.lines() {
            let _ = out_tx.send(OutputLine::Stdout(line.to_string()));
        }
    } else {
        for cell in tracker.progress(&run_id).phases {
            let _ = out_tx.send(OutputLine::Stdout(cell.name));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Run silently to completion and print the final progress as pretty JSON.
async fn run_json(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let (run_id, catalog, _) = resolve_target(&args)?;
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let tracker = RunTracker::with_events(cfg, evt_tx);

    tracker.start(&run_id, catalog);
    while let Some(ev) = evt_rx.recv().await {
        if matches!(ev, ProgressEvent::RunCompleted { .. }) {
            break;
        }
    }

    let progress = tracker.progress(&run_id);
    println!("{}", serde_json::to_string_pretty(&progress)?);
    Ok(())
}
