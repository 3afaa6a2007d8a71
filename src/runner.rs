use crate::history::HistoryLog;
use crate::model::{KitchenEvent, Recipe, RecipeStep, RunnerPhase, RunnerSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The advancement loop was cancelled at a tick or pause-wait boundary.
struct Interrupted;

/// Per-recipe sequential step executor.
///
/// One runner owns one recipe's step sequence and drives it through simulated
/// time on its own tokio task. Commands follow the state machine
/// Idle → Running → {Paused ⇄ Running} → Completed | Cancelled; a command that
/// is invalid in the current phase is a silent no-op, never an error.
pub struct RecipeRunner {
    id: usize,
    name: String,
    steps: Arc<[RecipeStep]>,
    tick_interval: Duration,
    state_tx: watch::Sender<RunnerSnapshot>,
    cancel: CancellationToken,
    event_tx: mpsc::UnboundedSender<KitchenEvent>,
    history: HistoryLog,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl RecipeRunner {
    /// Build an idle runner. The recipe's steps are copied in; nothing shares
    /// them mutably afterwards.
    pub fn new(
        id: usize,
        recipe: Recipe,
        tick_interval: Duration,
        history: HistoryLog,
        event_tx: mpsc::UnboundedSender<KitchenEvent>,
    ) -> Self {
        let total_duration = recipe.total_duration();
        let (state_tx, _) = watch::channel(RunnerSnapshot {
            recipe: recipe.name.clone(),
            phase: RunnerPhase::Idle,
            current_step: "Ready to start".to_string(),
            step_index: None,
            step_count: recipe.steps.len(),
            elapsed_in_step: 0,
            total_elapsed: 0,
            total_duration,
            progress_percent: 0.0,
            time_left_seconds: total_duration,
        });
        Self {
            id,
            name: recipe.name,
            steps: recipe.steps.into(),
            tick_interval,
            state_tx,
            cancel: CancellationToken::new(),
            event_tx,
            history,
            task: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> RunnerPhase {
        self.state_tx.borrow().phase
    }

    pub fn snapshot(&self) -> RunnerSnapshot {
        self.state_tx.borrow().clone()
    }

    /// Observe live state; the receiver sees every phase transition and the
    /// latest tick.
    pub fn subscribe(&self) -> watch::Receiver<RunnerSnapshot> {
        self.state_tx.subscribe()
    }

    /// Begin the step-advancement loop on an independently scheduled task.
    /// Valid only from `Idle`; any later call is a no-op, so a double start can
    /// never spawn a duplicate loop.
    pub fn start(&mut self) {
        let started = self.state_tx.send_if_modified(|s| {
            if s.phase == RunnerPhase::Idle {
                s.phase = RunnerPhase::Running;
                true
            } else {
                false
            }
        });
        if !started {
            return;
        }
        debug!(recipe = %self.name, "runner started");
        let _ = self.event_tx.send(KitchenEvent::PhaseChanged {
            runner: self.id,
            phase: RunnerPhase::Running,
        });
        let advance = AdvanceLoop {
            id: self.id,
            name: self.name.clone(),
            steps: Arc::clone(&self.steps),
            tick_interval: self.tick_interval,
            state_tx: self.state_tx.clone(),
            cancel: self.cancel.clone(),
            event_tx: self.event_tx.clone(),
            history: self.history.clone(),
        };
        self.task = Some(tokio::spawn(advance.run()));
    }

    /// Freeze progress at the next second boundary. Valid only while `Running`.
    pub fn pause(&self) {
        let paused = self.state_tx.send_if_modified(|s| {
            if s.phase == RunnerPhase::Running {
                s.phase = RunnerPhase::Paused;
                true
            } else {
                false
            }
        });
        if paused {
            debug!(recipe = %self.name, "runner paused");
            let _ = self.event_tx.send(KitchenEvent::PhaseChanged {
                runner: self.id,
                phase: RunnerPhase::Paused,
            });
        }
    }

    /// Release a paused loop to continue from exactly where it left off.
    /// Valid only while `Paused`.
    pub fn resume(&self) {
        let resumed = self.state_tx.send_if_modified(|s| {
            if s.phase == RunnerPhase::Paused {
                s.phase = RunnerPhase::Running;
                true
            } else {
                false
            }
        });
        if resumed {
            debug!(recipe = %self.name, "runner resumed");
            let _ = self.event_tx.send(KitchenEvent::PhaseChanged {
                runner: self.id,
                phase: RunnerPhase::Running,
            });
        }
    }

    /// Signal cancellation. Valid from `Running` or `Paused`; the loop observes
    /// the signal at the next tick or pause-wait boundary, unblocks any pending
    /// wait, and exits without completing or writing history.
    pub fn cancel(&self) {
        let armed = matches!(
            self.state_tx.borrow().phase,
            RunnerPhase::Running | RunnerPhase::Paused
        );
        if armed {
            debug!(recipe = %self.name, "runner cancellation requested");
            self.cancel.cancel();
        }
    }

    /// Wait for the advancement loop to finish, if one was ever started.
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Everything the advancement loop needs, detached from the handle so the task
/// owns its own clones.
struct AdvanceLoop {
    id: usize,
    name: String,
    steps: Arc<[RecipeStep]>,
    tick_interval: Duration,
    state_tx: watch::Sender<RunnerSnapshot>,
    cancel: CancellationToken,
    event_tx: mpsc::UnboundedSender<KitchenEvent>,
    history: HistoryLog,
}

impl AdvanceLoop {
    async fn run(self) {
        match self.advance().await {
            Ok(()) => self.finish_completed(),
            Err(Interrupted) => self.finish_cancelled(),
        }
    }

    /// Steps execute strictly in declaration order, one tick per simulated
    /// second. Cancellation and pause are observed at tick boundaries only.
    async fn advance(&self) -> Result<(), Interrupted> {
        let mut state_rx = self.state_tx.subscribe();
        for (i, step) in self.steps.iter().enumerate() {
            self.check_cancel()?;
            self.publish_step_start(i, step);
            self.wait_while_paused(&mut state_rx).await?;
            for _ in 0..step.duration_seconds {
                self.check_cancel()?;
                self.wait_while_paused(&mut state_rx).await?;
                self.tick_sleep().await?;
                self.commit_tick(i);
            }
        }
        // A pause that lands on the final tick holds the completion transition
        // until resumed.
        self.wait_while_paused(&mut state_rx).await?;
        self.check_cancel()?;
        Ok(())
    }

    fn check_cancel(&self) -> Result<(), Interrupted> {
        if self.cancel.is_cancelled() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// One simulated second of wall time. Interruptible by cancel, not by
    /// pause; a tick already in flight commits before the loop suspends.
    async fn tick_sleep(&self) -> Result<(), Interrupted> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Interrupted),
            _ = tokio::time::sleep(self.tick_interval) => Ok(()),
        }
    }

    /// Block while the phase is `Paused`. No simulated time advances here, and
    /// cancellation unblocks the wait immediately.
    async fn wait_while_paused(
        &self,
        state_rx: &mut watch::Receiver<RunnerSnapshot>,
    ) -> Result<(), Interrupted> {
        loop {
            if state_rx.borrow_and_update().phase != RunnerPhase::Paused {
                return Ok(());
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(Interrupted),
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn publish_step_start(&self, step_index: usize, step: &RecipeStep) {
        self.state_tx.send_modify(|s| {
            s.step_index = Some(step_index);
            s.elapsed_in_step = 0;
            s.current_step = step.description.clone();
            s.progress_percent = progress_percent(step_index, 0, &self.steps);
        });
        let _ = self.event_tx.send(KitchenEvent::StepStarted {
            runner: self.id,
            step_index,
            description: step.description.clone(),
        });
    }

    fn commit_tick(&self, step_index: usize) {
        self.state_tx.send_modify(|s| {
            s.elapsed_in_step += 1;
            s.total_elapsed += 1;
            s.time_left_seconds = s.total_duration.saturating_sub(s.total_elapsed);
            s.progress_percent = progress_percent(step_index, s.elapsed_in_step, &self.steps);
        });
        let snapshot = self.state_tx.borrow().clone();
        let _ = self.event_tx.send(KitchenEvent::Tick {
            runner: self.id,
            snapshot,
        });
    }

    fn finish_completed(&self) {
        self.state_tx.send_modify(|s| {
            s.phase = RunnerPhase::Completed;
            s.current_step = "Done!".to_string();
            s.progress_percent = 100.0;
            s.time_left_seconds = 0;
        });
        let record = self.history.record_completion(&self.name);
        debug!(recipe = %self.name, "runner completed");
        let _ = self.event_tx.send(KitchenEvent::RecipeCompleted {
            runner: self.id,
            record,
        });
    }

    fn finish_cancelled(&self) {
        self.state_tx.send_modify(|s| {
            s.phase = RunnerPhase::Cancelled;
            s.current_step = "Recipe cancelled".to_string();
        });
        debug!(recipe = %self.name, "runner cancelled");
        let _ = self
            .event_tx
            .send(KitchenEvent::RecipeCancelled { runner: self.id });
    }
}

/// Progress in [0, 100]: completed steps plus the fraction of the current
/// step, each step weighted equally regardless of duration. A zero-duration
/// step contributes no fraction of its own; it falls through on the next
/// boundary.
pub(crate) fn progress_percent(
    step_index: usize,
    elapsed_in_step: u64,
    steps: &[RecipeStep],
) -> f64 {
    let n = steps.len();
    if n == 0 {
        return 100.0;
    }
    let duration = steps[step_index].duration_seconds;
    let step_fraction = if duration == 0 {
        0.0
    } else {
        elapsed_in_step as f64 / duration as f64
    };
    (step_index as f64 + step_fraction) / n as f64 * 100.0
}
