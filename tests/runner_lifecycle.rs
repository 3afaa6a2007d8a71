//! Runner state-machine tests, driven on tokio's paused clock so simulated
//! seconds advance deterministically.

use kitchen_sim::history::HistoryLog;
use kitchen_sim::model::{KitchenEvent, Recipe, RecipeStep, RunnerPhase};
use kitchen_sim::runner::RecipeRunner;
use std::time::Duration;
use tokio::sync::mpsc;

const TICK: Duration = Duration::from_secs(1);

fn recipe(name: &str, steps: &[(&str, u64)]) -> Recipe {
    Recipe {
        name: name.into(),
        difficulty: String::new(),
        equipment: Vec::new(),
        steps: steps
            .iter()
            .map(|(desc, dur)| RecipeStep {
                description: (*desc).to_string(),
                duration_seconds: *dur,
            })
            .collect(),
    }
}

fn runner(name: &str, steps: &[(&str, u64)]) -> (RecipeRunner, HistoryLog, mpsc::UnboundedReceiver<KitchenEvent>) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let history = HistoryLog::new();
    let r = RecipeRunner::new(0, recipe(name, steps), TICK, history.clone(), event_tx);
    (r, history, event_rx)
}

/// Let the advancement loop run up to its next suspension point.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn advance_secs(n: u64) {
    for _ in 0..n {
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
    }
}

#[tokio::test(start_paused = true)]
async fn runs_a_recipe_to_completion() {
    let (mut runner, history, mut event_rx) = runner("Pasta", &[("Boil water", 2), ("Add pasta", 3)]);
    let mut state = runner.subscribe();

    assert_eq!(runner.phase(), RunnerPhase::Idle);
    assert_eq!(runner.snapshot().total_duration, 5);
    assert_eq!(runner.snapshot().time_left_seconds, 5);

    runner.start();
    {
        let s = state
            .wait_for(|s| s.step_index == Some(1))
            .await
            .expect("runner dropped");
        assert_eq!(s.total_elapsed, 2, "second step starts after 2 simulated seconds");
        assert_eq!(s.current_step, "Add pasta");
        assert_eq!(s.progress_percent, 50.0);
    }
    {
        let s = state
            .wait_for(|s| s.phase == RunnerPhase::Completed)
            .await
            .expect("runner dropped");
        assert_eq!(s.progress_percent, 100.0);
        assert_eq!(s.time_left_seconds, 0);
        assert_eq!(s.total_elapsed, 5);
        assert_eq!(s.current_step, "Done!");
    }
    runner.wait().await;

    let entries = history.snapshot();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with("Pasta completed at "));

    let mut step_starts = Vec::new();
    let mut ticks = 0;
    let mut completions = 0;
    while let Ok(ev) = event_rx.try_recv() {
        match ev {
            KitchenEvent::StepStarted { step_index, .. } => step_starts.push(step_index),
            KitchenEvent::Tick { .. } => ticks += 1,
            KitchenEvent::RecipeCompleted { .. } => completions += 1,
            _ => {}
        }
    }
    assert_eq!(step_starts, vec![0, 1]);
    assert_eq!(ticks, 5);
    assert_eq!(completions, 1);
}

#[tokio::test(start_paused = true)]
async fn progress_is_monotone_while_running() {
    let (mut runner, _history, mut event_rx) = runner("Curry", &[("Chop", 2), ("Simmer", 3)]);
    let mut state = runner.subscribe();

    runner.start();
    state
        .wait_for(|s| s.phase == RunnerPhase::Completed)
        .await
        .expect("runner dropped");
    runner.wait().await;

    let mut last = 0.0;
    while let Ok(ev) = event_rx.try_recv() {
        if let KitchenEvent::Tick { snapshot, .. } = ev {
            assert!(
                snapshot.progress_percent >= last,
                "progress regressed: {} < {last}",
                snapshot.progress_percent
            );
            last = snapshot.progress_percent;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn pause_freezes_simulated_time_and_resume_continues() {
    let (mut runner, history, _event_rx) = runner("Stew", &[("Simmer", 10)]);

    runner.start();
    settle().await;
    advance_secs(3).await;
    assert_eq!(runner.snapshot().elapsed_in_step, 3);
    assert_eq!(runner.phase(), RunnerPhase::Running);

    runner.pause();
    settle().await;
    assert_eq!(runner.phase(), RunnerPhase::Paused);
    // The tick already in flight commits before the loop suspends.
    advance_secs(1).await;
    assert_eq!(runner.snapshot().elapsed_in_step, 4);

    // Frozen: the wall clock moves, simulated time does not.
    let frozen = runner.snapshot();
    advance_secs(30).await;
    let still = runner.snapshot();
    assert_eq!(still.elapsed_in_step, 4);
    assert_eq!(still.total_elapsed, 4);
    assert_eq!(still.progress_percent, frozen.progress_percent);
    assert!(history.is_empty());

    runner.resume();
    settle().await;
    assert_eq!(runner.phase(), RunnerPhase::Running);
    advance_secs(6).await;
    assert_eq!(runner.phase(), RunnerPhase::Completed);
    assert_eq!(runner.snapshot().total_elapsed, 10);
    assert_eq!(history.len(), 1);
    runner.wait().await;
}

#[tokio::test(start_paused = true)]
async fn pause_on_the_final_tick_holds_completion_until_resume() {
    let (mut runner, history, _event_rx) = runner("Toast", &[("Toast bread", 2)]);

    runner.start();
    settle().await;
    advance_secs(1).await;
    runner.pause();
    settle().await;
    advance_secs(1).await;

    // All ticks are committed, but the pause gate sits before the completion
    // transition.
    let s = runner.snapshot();
    assert_eq!(s.total_elapsed, 2);
    assert_eq!(s.phase, RunnerPhase::Paused);
    assert!(history.is_empty());

    advance_secs(60).await;
    assert_eq!(runner.phase(), RunnerPhase::Paused);

    runner.resume();
    settle().await;
    assert_eq!(runner.phase(), RunnerPhase::Completed);
    assert_eq!(history.len(), 1);
    runner.wait().await;
}

#[tokio::test(start_paused = true)]
async fn cancel_unblocks_a_paused_runner_without_waiting() {
    let (mut runner, history, _event_rx) = runner("Roast", &[("Roast", 10)]);

    runner.start();
    settle().await;
    advance_secs(1).await;
    runner.pause();
    advance_secs(1).await; // in-flight tick commits, loop suspends in the pause wait

    // No clock movement after this point: cancellation alone must unblock.
    runner.cancel();
    settle().await;
    assert_eq!(runner.phase(), RunnerPhase::Cancelled);
    assert_eq!(runner.snapshot().current_step, "Recipe cancelled");
    assert!(runner.snapshot().time_left_seconds > 0);
    assert!(history.is_empty());
    runner.wait().await;

    // Terminal: resume and pause are dead ends now.
    runner.resume();
    runner.pause();
    settle().await;
    assert_eq!(runner.phase(), RunnerPhase::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_a_pending_tick_wait() {
    let (mut runner, history, _event_rx) = runner("Bake", &[("Bake", 10)]);

    runner.start();
    settle().await;
    advance_secs(1).await;

    // The loop is one second into its next tick wait; cancel must not wait it out.
    runner.cancel();
    settle().await;
    assert_eq!(runner.phase(), RunnerPhase::Cancelled);
    assert_eq!(runner.snapshot().total_elapsed, 1);
    assert!(history.is_empty());
    runner.wait().await;
}

#[tokio::test(start_paused = true)]
async fn commands_are_idempotent_and_invalid_transitions_are_ignored() {
    let (mut runner, history, _event_rx) = runner("Soup", &[("Boil", 2)]);
    let mut state = runner.subscribe();

    // Not started yet: pause, resume and cancel all fall on deaf ears.
    runner.pause();
    runner.resume();
    runner.cancel();
    settle().await;
    assert_eq!(runner.phase(), RunnerPhase::Idle);

    // Double start never spawns a second loop.
    runner.start();
    runner.start();
    settle().await;

    runner.pause();
    runner.pause();
    settle().await;
    assert_eq!(runner.phase(), RunnerPhase::Paused);

    runner.resume();
    runner.resume();
    settle().await;
    assert_eq!(runner.phase(), RunnerPhase::Running);

    state
        .wait_for(|s| s.phase == RunnerPhase::Completed)
        .await
        .expect("runner dropped");
    runner.wait().await;

    // One loop, one history entry, exactly the recipe's worth of ticks.
    assert_eq!(runner.snapshot().total_elapsed, 2);
    assert_eq!(history.len(), 1);

    // start() after a terminal phase is a no-op too.
    runner.start();
    settle().await;
    assert_eq!(runner.phase(), RunnerPhase::Completed);
    assert_eq!(history.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_recipe_completes_immediately_and_still_logs() {
    let (mut runner, history, _event_rx) = runner("Glass of Water", &[]);
    let mut state = runner.subscribe();

    runner.start();
    let s = state
        .wait_for(|s| s.phase == RunnerPhase::Completed)
        .await
        .expect("runner dropped");
    assert_eq!(s.progress_percent, 100.0);
    assert_eq!(s.time_left_seconds, 0);
    drop(s);
    runner.wait().await;
    assert_eq!(history.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_duration_step_publishes_and_falls_through() {
    let (mut runner, history, mut event_rx) = runner("Pancakes", &[("Preheat pan", 0), ("Cook", 1)]);
    let mut state = runner.subscribe();

    runner.start();
    state
        .wait_for(|s| s.phase == RunnerPhase::Completed)
        .await
        .expect("runner dropped");
    runner.wait().await;

    assert_eq!(runner.snapshot().total_elapsed, 1);
    assert_eq!(history.len(), 1);

    let mut step_starts = Vec::new();
    while let Ok(ev) = event_rx.try_recv() {
        if let KitchenEvent::StepStarted { step_index, description, .. } = ev {
            step_starts.push((step_index, description));
        }
    }
    assert_eq!(step_starts[0], (0, "Preheat pan".to_string()));
    assert_eq!(step_starts[1], (1, "Cook".to_string()));
}

#[tokio::test(start_paused = true)]
async fn concurrent_completions_all_reach_the_shared_history() {
    let (event_tx, _event_rx) = mpsc::unbounded_channel();
    let history = HistoryLog::new();
    let mut runners: Vec<RecipeRunner> = (0..4)
        .map(|i| {
            RecipeRunner::new(
                i,
                recipe(&format!("Recipe {i}"), &[("Work", 1 + i as u64)]),
                TICK,
                history.clone(),
                event_tx.clone(),
            )
        })
        .collect();

    for r in &mut runners {
        r.start();
    }
    for r in &mut runners {
        r.wait().await;
    }

    assert_eq!(history.len(), 4);
    for r in &runners {
        assert_eq!(r.phase(), RunnerPhase::Completed);
    }
}
