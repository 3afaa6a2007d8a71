//! Simulation lifecycle controller.
//!
//! Routes UI commands to individual runners and keeps the kitchen alive across
//! restarts. The history log is created here and handed to every generation of
//! runners, so completions accumulate for the lifetime of the controller.

use crate::history::HistoryLog;
use crate::model::{KitchenData, KitchenEvent, RunConfig};
use crate::orchestrator::Kitchen;
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers to control the running simulation.
#[derive(Debug, Clone)]
pub enum UiCommand {
    Pause(usize),
    Resume(usize),
    Cancel(usize),
    /// Cancel the current generation of runners and start a fresh one from the
    /// same data. History carries over.
    Restart,
    Quit,
}

/// Drive the simulation until the UI asks to quit.
///
/// Runners run autonomously; this loop only dispatches commands. A runner
/// finishing (or all of them finishing) does not end the loop — the user may
/// still restart or inspect history.
pub async fn run_controller(
    cfg: &RunConfig,
    data: &KitchenData,
    event_tx: UnboundedSender<KitchenEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let history = HistoryLog::new();
    let mut kitchen = Kitchen::new(cfg, data, history.clone(), event_tx.clone());
    kitchen.start_all();

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            UiCommand::Pause(i) => kitchen.pause(i),
            UiCommand::Resume(i) => kitchen.resume(i),
            UiCommand::Cancel(i) => kitchen.cancel(i),
            UiCommand::Restart => {
                // Old runners observe the cancel within a tick and die off on
                // their own; cancelled runners never write history, so the new
                // generation can start immediately without overlap hazards.
                kitchen.cancel_all();
                let _ = event_tx.send(KitchenEvent::Info("Restarting simulation…".into()));
                kitchen = Kitchen::new(cfg, data, history.clone(), event_tx.clone());
                kitchen.start_all();
            }
            UiCommand::Quit => break,
        }
    }

    // Covers both Quit and a dropped command channel; cancelling an already
    // terminal runner is a no-op.
    kitchen.cancel_all();
    kitchen.wait_all().await;
    Ok(())
}
