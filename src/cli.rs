use crate::history::HistoryLog;
use crate::loader;
use crate::model::{format_time_left, KitchenEvent, RecipeIntro, RunConfig};
use crate::orchestrator::Kitchen;
use crate::text_summary::build_text_summary;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
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
    name = "kitchen-sim",
    version,
    about = "Concurrent kitchen recipe simulator with optional TUI"
)]
pub struct Cli {
    /// Path to the kitchen data file (recipes + ingredients)
    #[arg(long, default_value = "data/recipes.json")]
    pub data: std::path::PathBuf,

    /// Print the final kitchen report as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Stream progress lines and a summary, then exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// List the recipes in the data file and exit
    #[arg(long)]
    pub list: bool,

    /// Wall-clock length of one simulated second
    #[arg(long, default_value = "1s")]
    pub tick: humantime::Duration,

    /// Only run recipes whose name contains this text (case-insensitive)
    #[arg(long)]
    pub recipe: Option<String>,
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!(
            "--json and --text are mutually exclusive output modes"
        ));
    }

    if args.list {
        return run_list(&args);
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args).await;
        }
    }

    if args.json {
        return run_json(args).await;
    }

    run_text(args).await
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        tick_interval: args.tick.into(),
        recipe_filter: args.recipe.clone(),
    }
}

fn run_list(args: &Cli) -> Result<()> {
    let data = loader::load_kitchen_data(&args.data)?;
    for recipe in &data.recipes {
        println!(
            "{} ({} steps, {})",
            recipe.name,
            recipe.steps.len(),
            format_time_left(recipe.total_duration())
        );
        for step in &recipe.steps {
            println!("  - {} ({}s)", step.description, step.duration_seconds);
        }
    }
    Ok(())
}

/// Run every runner to a terminal phase, feeding each event to `on_event`.
/// Ctrl-C cancels the whole kitchen; the loop then drains the terminal events.
async fn drive_kitchen(
    kitchen: &mut Kitchen,
    event_rx: &mut mpsc::UnboundedReceiver<KitchenEvent>,
    mut on_event: impl FnMut(&KitchenEvent),
) {
    let mut remaining = kitchen.len();
    while remaining > 0 {
        tokio::select! {
            ev = event_rx.recv() => match ev {
                Some(ev) => {
                    if matches!(
                        ev,
                        KitchenEvent::RecipeCompleted { .. } | KitchenEvent::RecipeCancelled { .. }
                    ) {
                        remaining -= 1;
                    }
                    on_event(&ev);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => kitchen.cancel_all(),
        }
    }
    kitchen.wait_all().await;
}

async fn run_text(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let data = loader::load_kitchen_data(&args.data)?;
    let (out_tx, out_handle) = spawn_output_writer();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<KitchenEvent>();

    let mut kitchen = Kitchen::new(&cfg, &data, HistoryLog::new(), event_tx);
    if kitchen.is_empty() {
        let _ = out_tx.send(OutputLine::Stderr("No recipes matched.".into()));
    }
    kitchen.start_all();

    // Names by runner id, for event lines; seeded by SimulationStarted.
    let mut intros: Vec<RecipeIntro> = Vec::new();
    drive_kitchen(&mut kitchen, &mut event_rx, |ev| {
        let line = match ev {
            KitchenEvent::SimulationStarted { recipes } => {
                intros = recipes.clone();
                Some(format!("== Kitchen: {} recipes ==", recipes.len()))
            }
            KitchenEvent::StepStarted {
                runner,
                step_index,
                description,
            } => intros.get(*runner).map(|intro| {
                format!(
                    "{} {}: step {}/{}: {}",
                    intro.emoji,
                    intro.name,
                    step_index + 1,
                    intro.step_count,
                    description
                )
            }),
            KitchenEvent::Tick { snapshot, .. } => Some(format!(
                "{}: {:>5.1}%  left {}",
                snapshot.recipe,
                snapshot.progress_percent,
                snapshot.time_left_formatted()
            )),
            KitchenEvent::PhaseChanged { runner, phase } => intros
                .get(*runner)
                .map(|intro| format!("{}: {:?}", intro.name, phase)),
            KitchenEvent::RecipeCompleted { record, .. } => Some(format!("✔ {record}")),
            KitchenEvent::RecipeCancelled { runner } => intros
                .get(*runner)
                .map(|intro| format!("✘ {} cancelled", intro.name)),
            KitchenEvent::Info(msg) => Some(msg.clone()),
        };
        if let Some(line) = line {
            let _ = out_tx.send(OutputLine::Stderr(line));
        }
    })
    .await;

    let report = kitchen.report();
    for line in build_text_summary(&report).lines {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

async fn run_json(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let data = loader::load_kitchen_data(&args.data)?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<KitchenEvent>();

    let mut kitchen = Kitchen::new(&cfg, &data, HistoryLog::new(), event_tx);
    kitchen.start_all();

    // Events are consumed and dropped; JSON mode only reports the end state.
    drive_kitchen(&mut kitchen, &mut event_rx, |_| {}).await;

    let report = kitchen.report();
    let out = serde_json::to_string_pretty(&report).context("serialize kitchen report")?;
    println!("{out}");
    Ok(())
}
