mod board;
mod help;

use crate::cli::{build_config, Cli};
use crate::model::ProgressEvent;
use crate::orchestrator::{self, UiCommand};
use crate::scenarios::{self, Scenario};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::collections::HashMap;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Per-run counters mirrored from progress events; the board projection is
/// derived from these on every draw.
#[derive(Debug, Clone, Copy, Default)]
struct RunView {
    completed: usize,
    advancing: bool,
}

struct UiState {
    scenarios: Vec<Scenario>,
    selected: usize,
    runs: HashMap<String, RunView>,
    info: String,
    show_help: bool,
}

impl UiState {
    fn new(scenarios: Vec<Scenario>) -> Self {
        Self {
            scenarios,
            selected: 0,
            runs: HashMap::new(),
            info: String::new(),
            show_help: false,
        }
    }

    fn selected_scenario(&self) -> &Scenario {
        &self.scenarios[self.selected]
    }

    fn view(&self, run_id: &str) -> RunView {
        self.runs.get(run_id).copied().unwrap_or_default()
    }

    fn apply_event(&mut self, ev: ProgressEvent) {
        match ev {
            ProgressEvent::RunStarted { run_id } => {
                self.runs.insert(
                    run_id,
                    RunView {
                        completed: 0,
                        advancing: true,
                    },
                );
            }
            ProgressEvent::PhaseCompleted { run_id, index, name } => {
                let view = self.runs.entry(run_id).or_default();
                view.completed = index + 1;
                self.info = format!("{name} complete");
            }
            ProgressEvent::RunCompleted { run_id } => {
                if let Some(view) = self.runs.get_mut(&run_id) {
                    view.advancing = false;
                }
                self.info = "Run complete".into();
            }
            ProgressEvent::RunReset { run_id } => {
                self.runs.insert(run_id, RunView::default());
                self.info = "Reset".into();
            }
        }
    }
}

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure between the UI thread and the controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let cfg = build_config(&args);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let res = orchestrator::run_controller(cfg, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut event_rx: UnboundedReceiver<ProgressEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(scenarios::builtin());

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep the render loop responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| board::draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('r')) => {
                        let scenario = state.selected_scenario().clone();
                        let view = state.view(scenario.id);
                        if view.advancing {
                            state.info = "Already running".into();
                        } else if view.completed == scenario.catalog.len() {
                            state.info = "Completed; reset first (x)".into();
                        } else {
                            state.info = format!("Running {}", scenario.title);
                        }
                        // Redundant starts are no-ops inside the tracker.
                        let _ = cmd_tx.send(UiCommand::Run {
                            run_id: scenario.id.to_string(),
                            catalog: Arc::clone(&scenario.catalog),
                        });
                    }
                    (_, KeyCode::Char('x')) => {
                        let run_id = state.selected_scenario().id.to_string();
                        let _ = cmd_tx.send(UiCommand::Reset { run_id });
                    }
                    (_, KeyCode::Tab) | (_, KeyCode::Right) => {
                        state.selected = (state.selected + 1) % state.scenarios.len();
                    }
                    (_, KeyCode::BackTab) | (_, KeyCode::Left) => {
                        state.selected =
                            (state.selected + state.scenarios.len() - 1) % state.scenarios.len();
                    }
                    (_, KeyCode::Char('?')) => {
                        state.show_help = !state.show_help;
                    }
                    (_, KeyCode::Esc) => {
                        state.show_help = false;
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    execute!(io::stdout(), LeaveAlternateScreen).ok();
    res
}
