//! Run lifecycle controller.
//!
//! The UI runs on a dedicated thread and cannot spawn tokio tasks, so this
//! controller owns the `RunTracker` and applies UI commands to it. Progress
//! events flow back to the UI on the tracker's event channel.

use crate::catalog::StageCatalog;
use crate::model::{ProgressEvent, SimConfig};
use crate::tracker::RunTracker;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers to control runs.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Run {
        run_id: String,
        catalog: Arc<StageCatalog>,
    },
    Reset {
        run_id: String,
    },
    Quit,
}

/// Apply UI commands to the tracker until the UI quits or the process gets
/// interrupted. Starting an already-advancing run and resetting an unknown
/// one are no-ops inside the tracker, so commands need no pre-checks here.
pub(crate) async fn run_controller(
    cfg: SimConfig,
    event_tx: UnboundedSender<ProgressEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let tracker = RunTracker::with_events(cfg, event_tx);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Run { run_id, catalog }) => {
                        tracker.start(&run_id, catalog);
                    }
                    Some(UiCommand::Reset { run_id }) => {
                        tracker.reset(&run_id);
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
