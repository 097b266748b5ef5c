use crate::catalog::StageCatalog;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Policy for `start` on a run that already completed its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CompletedPolicy {
    /// `start` on a completed run is a no-op; an explicit `reset` is required
    /// before it can advance again.
    RequireReset,
    /// `start` on a completed run restarts it from zero.
    Restart,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Delay before each phase completes.
    #[serde(with = "humantime_serde")]
    pub phase_delay: Duration,
    /// Extra delay after the last phase before the run settles to not-advancing.
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    pub on_complete: CompletedPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            phase_delay: Duration::from_secs(1),
            settle_delay: Duration::from_millis(500),
            on_complete: CompletedPolicy::RequireReset,
        }
    }
}

/// Display status of a single phase, derived from run progress on each read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Completed,
}

/// One cell of the consumer-facing phase board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub name: String,
    pub status: PhaseStatus,
}

/// Snapshot of a run's progress plus the per-phase projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunProgress {
    pub run_id: String,
    pub completed: usize,
    pub advancing: bool,
    pub phases: Vec<PhaseProgress>,
}

impl RunProgress {
    /// Initial state for a run id the tracker has never seen.
    pub fn initial(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            completed: 0,
            advancing: false,
            phases: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.phases.is_empty() && self.completed == self.phases.len() && !self.advancing
    }
}

/// Project a run's counters onto the catalog: phases below `completed` are
/// done, the phase at `completed` is in progress while the run advances,
/// everything after is pending. Recomputed on each read, never stored.
pub fn project(catalog: &StageCatalog, completed: usize, advancing: bool) -> Vec<PhaseProgress> {
    catalog
        .phases()
        .iter()
        .enumerate()
        .map(|(i, phase)| PhaseProgress {
            name: phase.name.clone(),
            status: if i < completed {
                PhaseStatus::Completed
            } else if i == completed && advancing {
                PhaseStatus::InProgress
            } else {
                PhaseStatus::Pending
            },
        })
        .collect()
}

/// Progress events emitted by the tracker and consumed by UI/CLI layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgressEvent {
    RunStarted {
        run_id: String,
    },
    PhaseCompleted {
        run_id: String,
        index: usize,
        name: String,
    },
    RunCompleted {
        run_id: String,
    },
    RunReset {
        run_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Phase, StageCatalog};

    fn catalog() -> StageCatalog {
        StageCatalog::new(vec![
            Phase::named("Lexical"),
            Phase::named("Syntax"),
            Phase::named("Semantic"),
            Phase::named("Execution"),
        ])
        .unwrap()
    }

    #[test]
    fn projection_labels_follow_completed_count() {
        let c = catalog();
        let p = project(&c, 1, true);
        assert_eq!(p[0].status, PhaseStatus::Completed);
        assert_eq!(p[1].status, PhaseStatus::InProgress);
        assert_eq!(p[2].status, PhaseStatus::Pending);
        assert_eq!(p[3].status, PhaseStatus::Pending);
    }

    #[test]
    fn projection_idle_is_all_pending() {
        let c = catalog();
        assert!(project(&c, 0, false)
            .iter()
            .all(|p| p.status == PhaseStatus::Pending));
    }

    #[test]
    fn projection_settled_run_has_no_in_progress_cell() {
        let c = catalog();
        let p = project(&c, 4, false);
        assert!(p.iter().all(|p| p.status == PhaseStatus::Completed));
    }
}
