//! Run tracker: owns per-run progress and the timed advancement loop.
//!
//! Each run advances through its catalog one phase per `phase_delay`, settles
//! after the last phase, and can be reset at any point. A generation counter
//! per run supersedes in-flight advancement tasks so a stale timer can never
//! resurrect progress after a reset.

use crate::catalog::StageCatalog;
use crate::model::{project, CompletedPolicy, ProgressEvent, RunProgress, SimConfig};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

struct RunState {
    catalog: Arc<StageCatalog>,
    completed: usize,
    advancing: bool,
    // Bumped on every start/reset; an advancement task only mutates state
    // while its captured generation is still current.
    generation: u64,
}

/// Tracks all runs and drives their advancement on the tokio runtime.
#[derive(Clone)]
pub struct RunTracker {
    cfg: SimConfig,
    runs: Arc<Mutex<HashMap<String, RunState>>>,
    event_tx: Option<UnboundedSender<ProgressEvent>>,
}

impl RunTracker {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            cfg,
            runs: Arc::new(Mutex::new(HashMap::new())),
            event_tx: None,
        }
    }

    /// Like `new`, but progress events are emitted on `event_tx` as runs
    /// start, advance, complete, and reset.
    pub fn with_events(cfg: SimConfig, event_tx: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            event_tx: Some(event_tx),
            ..Self::new(cfg)
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Begin advancing `run_id` through `catalog` and return immediately.
    ///
    /// The run is created on first use. Starting a run that is already
    /// advancing is a no-op, as is starting a completed run under the
    /// `require-reset` policy. Progress is observed via [`progress`].
    ///
    /// [`progress`]: RunTracker::progress
    pub fn start(&self, run_id: &str, catalog: Arc<StageCatalog>) {
        let my_gen;
        {
            let mut runs = lock(&self.runs);
            let run = runs
                .entry(run_id.to_string())
                .or_insert_with(|| RunState {
                    catalog: Arc::clone(&catalog),
                    completed: 0,
                    advancing: false,
                    generation: 0,
                });
            if run.advancing {
                return;
            }
            if run.completed == run.catalog.len()
                && self.cfg.on_complete == CompletedPolicy::RequireReset
            {
                return;
            }
            run.catalog = Arc::clone(&catalog);
            run.completed = 0;
            run.advancing = true;
            run.generation += 1;
            my_gen = run.generation;
        }
        self.emit(ProgressEvent::RunStarted {
            run_id: run_id.to_string(),
        });

        let runs = Arc::clone(&self.runs);
        let event_tx = self.event_tx.clone();
        let run_id = run_id.to_string();
        let phase_delay = self.cfg.phase_delay;
        let settle_delay = self.cfg.settle_delay;
        tokio::spawn(async move {
            for index in 0..catalog.len() {
                tokio::time::sleep(phase_delay).await;
                {
                    let mut runs = lock(&runs);
                    let Some(run) = runs.get_mut(&run_id) else {
                        return;
                    };
                    if run.generation != my_gen || !run.advancing {
                        return;
                    }
                    run.completed = index + 1;
                }
                if let Some(tx) = &event_tx {
                    let _ = tx.send(ProgressEvent::PhaseCompleted {
                        run_id: run_id.clone(),
                        index,
                        name: catalog.phases()[index].name.clone(),
                    });
                }
            }
            tokio::time::sleep(settle_delay).await;
            {
                let mut runs = lock(&runs);
                let Some(run) = runs.get_mut(&run_id) else {
                    return;
                };
                if run.generation != my_gen || !run.advancing {
                    return;
                }
                run.advancing = false;
            }
            if let Some(tx) = &event_tx {
                let _ = tx.send(ProgressEvent::RunCompleted { run_id });
            }
        });
    }

    /// Return `run_id` to its initial state, cancelling any advancement in
    /// flight. No-op for ids the tracker has never seen.
    pub fn reset(&self, run_id: &str) {
        let known = {
            let mut runs = lock(&self.runs);
            match runs.get_mut(run_id) {
                Some(run) => {
                    run.completed = 0;
                    run.advancing = false;
                    run.generation += 1;
                    true
                }
                None => false,
            }
        };
        if known {
            self.emit(ProgressEvent::RunReset {
                run_id: run_id.to_string(),
            });
        }
    }

    /// Snapshot `run_id`'s progress. Never blocks, never fails; unknown ids
    /// yield the initial state with an empty board (project the catalog with
    /// [`crate::model::project`] for an all-pending board before first start).
    pub fn progress(&self, run_id: &str) -> RunProgress {
        let runs = lock(&self.runs);
        match runs.get(run_id) {
            Some(run) => RunProgress {
                run_id: run_id.to_string(),
                completed: run.completed,
                advancing: run.advancing,
                phases: project(&run.catalog, run.completed, run.advancing),
            },
            None => RunProgress::initial(run_id),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // Lock is never held across an await and no holder panics mid-update.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Phase;
    use crate::model::PhaseStatus;
    use std::time::Duration;

    fn catalog() -> Arc<StageCatalog> {
        Arc::new(
            StageCatalog::new(vec![
                Phase::named("Lexical"),
                Phase::named("Syntax"),
                Phase::named("Semantic"),
                Phase::named("Execution"),
            ])
            .unwrap(),
        )
    }

    fn cfg() -> SimConfig {
        SimConfig::default()
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn run_completes_after_catalog_length_delays_plus_settle() {
        let tracker = RunTracker::new(cfg());
        tracker.start("ex1", catalog());
        sleep_ms(4600).await; // 4 x 1s + 500ms settle, with headroom
        let p = tracker.progress("ex1");
        assert_eq!(p.completed, 4);
        assert!(!p.advancing);
        assert!(p.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn projection_tracks_the_advancing_run() {
        let tracker = RunTracker::new(cfg());
        tracker.start("ex1", catalog());

        sleep_ms(500).await; // t = 0.5
        let p = tracker.progress("ex1");
        assert_eq!((p.completed, p.advancing), (0, true));
        assert_eq!(p.phases[0].status, PhaseStatus::InProgress);
        assert!(p.phases[1..]
            .iter()
            .all(|c| c.status == PhaseStatus::Pending));

        sleep_ms(1000).await; // t = 1.5
        let p = tracker.progress("ex1");
        assert_eq!((p.completed, p.advancing), (1, true));
        assert_eq!(p.phases[0].status, PhaseStatus::Completed);
        assert_eq!(p.phases[1].status, PhaseStatus::InProgress);

        sleep_ms(3100).await; // t = 4.6, past settle
        let p = tracker.progress("ex1");
        assert_eq!((p.completed, p.advancing), (4, false));
        assert!(p
            .phases
            .iter()
            .all(|c| c.status == PhaseStatus::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_advancing_is_a_no_op() {
        let tracker = RunTracker::new(cfg());
        tracker.start("ex1", catalog());
        tracker.start("ex1", catalog());
        sleep_ms(1500).await;
        // A second advancement task would have pushed completed to 2 by now.
        assert_eq!(tracker.progress("ex1").completed, 1);
        sleep_ms(3100).await;
        let p = tracker.progress("ex1");
        assert_eq!((p.completed, p.advancing), (4, false));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_in_flight_advancement() {
        let tracker = RunTracker::new(cfg());
        tracker.start("ex1", catalog());
        sleep_ms(1500).await;
        assert_eq!(tracker.progress("ex1").completed, 1);

        tracker.reset("ex1");
        let p = tracker.progress("ex1");
        assert_eq!((p.completed, p.advancing), (0, false));
        assert!(p.phases.iter().all(|c| c.status == PhaseStatus::Pending));

        // The superseded task must not resurrect progress on its next wake.
        sleep_ms(3000).await;
        let p = tracker.progress("ex1");
        assert_eq!((p.completed, p.advancing), (0, false));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_reset_owns_the_run() {
        let tracker = RunTracker::new(cfg());
        tracker.start("ex1", catalog());
        sleep_ms(1500).await;
        tracker.reset("ex1");
        tracker.start("ex1", catalog());
        // Old task's next wake lands at t = 2.0; it must be inert by then.
        sleep_ms(1200).await;
        assert_eq!(tracker.progress("ex1").completed, 1);
        sleep_ms(3500).await;
        let p = tracker.progress("ex1");
        assert_eq!((p.completed, p.advancing), (4, false));
    }

    #[tokio::test(start_paused = true)]
    async fn runs_advance_independently() {
        let tracker = RunTracker::new(cfg());
        tracker.start("ex1", catalog());
        sleep_ms(500).await;
        tracker.start("ex2", catalog());
        sleep_ms(1100).await; // ex1 at t=1.6, ex2 at t=1.1
        tracker.reset("ex1");
        assert_eq!(tracker.progress("ex1").completed, 0);
        assert_eq!(tracker.progress("ex2").completed, 1);
        sleep_ms(4000).await;
        assert_eq!(tracker.progress("ex1").completed, 0);
        let p = tracker.progress("ex2");
        assert_eq!((p.completed, p.advancing), (4, false));
    }

    #[tokio::test(start_paused = true)]
    async fn completed_count_is_monotonic_between_start_and_reset() {
        let tracker = RunTracker::new(cfg());
        tracker.start("ex1", catalog());
        let mut last = 0;
        for _ in 0..20 {
            sleep_ms(250).await;
            let now = tracker.progress("ex1").completed;
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_run_requires_reset_before_rerun() {
        let tracker = RunTracker::new(cfg());
        tracker.start("ex1", catalog());
        sleep_ms(4600).await;
        assert!(tracker.progress("ex1").is_complete());

        tracker.start("ex1", catalog());
        sleep_ms(1200).await;
        // Still settled at full progress: the start did not take.
        let p = tracker.progress("ex1");
        assert_eq!((p.completed, p.advancing), (4, false));

        tracker.reset("ex1");
        tracker.start("ex1", catalog());
        sleep_ms(1100).await;
        let p = tracker.progress("ex1");
        assert_eq!((p.completed, p.advancing), (1, true));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_policy_reruns_completed_runs() {
        let tracker = RunTracker::new(SimConfig {
            on_complete: CompletedPolicy::Restart,
            ..SimConfig::default()
        });
        tracker.start("ex1", catalog());
        sleep_ms(4600).await;
        assert!(tracker.progress("ex1").is_complete());

        tracker.start("ex1", catalog());
        let p = tracker.progress("ex1");
        assert_eq!((p.completed, p.advancing), (0, true));
        sleep_ms(1100).await;
        assert_eq!(tracker.progress("ex1").completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_run_yields_initial_state() {
        let tracker = RunTracker::new(cfg());
        let p = tracker.progress("nope");
        assert_eq!((p.completed, p.advancing), (0, false));
        assert!(p.phases.is_empty());

        // Reset on an unknown id neither fails nor creates a run.
        tracker.reset("nope");
        assert!(tracker.progress("nope").phases.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn events_arrive_in_catalog_order() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let tracker = RunTracker::with_events(cfg(), tx);
        tracker.start("ex1", catalog());
        sleep_ms(4600).await;

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        assert!(matches!(&events[0], ProgressEvent::RunStarted { run_id } if run_id == "ex1"));
        let completions: Vec<usize> = events
            .iter()
            .filter_map(|ev| match ev {
                ProgressEvent::PhaseCompleted { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(completions, [0, 1, 2, 3]);
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::RunCompleted { run_id }) if run_id == "ex1"
        ));
    }
}
