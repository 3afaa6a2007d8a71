//! Kitchen-level orchestration.
//!
//! This module owns the collection of runners for one simulation run: it
//! builds one runner per loaded recipe, starts them independently, routes
//! pause/resume/cancel to individual runners, and aggregates the final report.
//! The completion history lives at this level and survives restarts.

mod controller;

pub use controller::{run_controller, UiCommand};

use crate::history::HistoryLog;
use crate::model::{
    KitchenData, KitchenEvent, KitchenReport, RecipeIntro, RecipeOutcome, RunConfig,
};
use crate::runner::RecipeRunner;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

/// One simulation run's worth of runners plus the shared history log.
pub struct Kitchen {
    runners: Vec<RecipeRunner>,
    history: HistoryLog,
}

impl Kitchen {
    /// Build an idle runner per recipe, announcing the line-up to the
    /// presentation layer. Recipes are filtered here so every mode agrees on
    /// what "the kitchen" contains.
    pub fn new(
        cfg: &RunConfig,
        data: &KitchenData,
        history: HistoryLog,
        event_tx: UnboundedSender<KitchenEvent>,
    ) -> Self {
        let recipes: Vec<_> = data
            .recipes
            .iter()
            .filter(|r| match cfg.recipe_filter.as_deref() {
                Some(filter) => r.name.to_lowercase().contains(&filter.to_lowercase()),
                None => true,
            })
            .cloned()
            .collect();

        let intros: Vec<RecipeIntro> = recipes.iter().map(RecipeIntro::for_recipe).collect();
        let _ = event_tx.send(KitchenEvent::SimulationStarted { recipes: intros });

        let runners = recipes
            .into_iter()
            .enumerate()
            .map(|(id, recipe)| {
                RecipeRunner::new(
                    id,
                    recipe,
                    cfg.tick_interval,
                    history.clone(),
                    event_tx.clone(),
                )
            })
            .collect();

        Self { runners, history }
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Start every runner in recipe-list order, fire-and-forget. No runner
    /// waits for another; there is no cross-runner ordering guarantee.
    pub fn start_all(&mut self) {
        info!(recipes = self.runners.len(), "starting simulation");
        for runner in &mut self.runners {
            runner.start();
        }
    }

    pub fn pause(&self, runner: usize) {
        if let Some(r) = self.runners.get(runner) {
            r.pause();
        }
    }

    pub fn resume(&self, runner: usize) {
        if let Some(r) = self.runners.get(runner) {
            r.resume();
        }
    }

    pub fn cancel(&self, runner: usize) {
        if let Some(r) = self.runners.get(runner) {
            r.cancel();
        }
    }

    pub fn cancel_all(&self) {
        for runner in &self.runners {
            runner.cancel();
        }
    }

    /// Number of runners that have not yet reached a terminal phase.
    pub fn active(&self) -> usize {
        self.runners
            .iter()
            .filter(|r| !r.phase().is_terminal())
            .count()
    }

    /// Wait for every started advancement loop to exit.
    pub async fn wait_all(&mut self) {
        for runner in &mut self.runners {
            runner.wait().await;
        }
    }

    /// Final outcome per recipe plus the accumulated history.
    pub fn report(&self) -> KitchenReport {
        let recipes = self
            .runners
            .iter()
            .map(|r| {
                let s = r.snapshot();
                RecipeOutcome {
                    name: s.recipe,
                    phase: s.phase,
                    progress_percent: s.progress_percent,
                    total_elapsed: s.total_elapsed,
                    total_duration: s.total_duration,
                    time_left_seconds: s.time_left_seconds,
                }
            })
            .collect();
        KitchenReport {
            timestamp_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            recipes,
            history: self.history.snapshot(),
        }
    }
}
