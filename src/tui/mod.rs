mod help;

use crate::cli::{build_config, Cli};
use crate::loader;
use crate::model::{
    format_time_left, KitchenEvent, RecipeIntro, RunnerPhase, RunnerSnapshot,
};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Terminal,
};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Presentation state for one recipe card. Owned by the UI thread and updated
/// only from kitchen events; no state is shared with the runners.
struct RecipeCard {
    name: String,
    emoji: String,
    difficulty: String,
    step_count: usize,
    phase: RunnerPhase,
    current_step: String,
    step_index: Option<usize>,
    progress_percent: f64,
    time_left_seconds: u64,
}

impl RecipeCard {
    fn from_intro(intro: &RecipeIntro) -> Self {
        Self {
            name: intro.name.clone(),
            emoji: intro.emoji.clone(),
            difficulty: intro.difficulty.clone(),
            step_count: intro.step_count,
            phase: RunnerPhase::Idle,
            current_step: "Ready to start".to_string(),
            step_index: None,
            progress_percent: 0.0,
            time_left_seconds: intro.total_duration,
        }
    }

    fn apply_snapshot(&mut self, s: &RunnerSnapshot) {
        self.phase = s.phase;
        self.current_step = s.current_step.clone();
        self.step_index = s.step_index;
        self.progress_percent = s.progress_percent;
        self.time_left_seconds = s.time_left_seconds;
    }
}

#[derive(Default)]
struct UiState {
    selected: usize,
    cards: Vec<RecipeCard>,
    history: Vec<String>,
    info: String,
    show_help: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let data = loader::load_kitchen_data(&args.data)?;

    // Unbounded channels avoid backpressure between the runners and the UI thread.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<KitchenEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let res = orchestrator::run_controller(&cfg, &data, event_tx, cmd_rx).await;

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
    mut event_rx: UnboundedReceiver<KitchenEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::default();
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
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
                    (_, KeyCode::Char('p')) => {
                        let _ = cmd_tx.send(UiCommand::Pause(state.selected));
                    }
                    (_, KeyCode::Char('r')) => {
                        let _ = cmd_tx.send(UiCommand::Resume(state.selected));
                    }
                    (_, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Cancel(state.selected));
                    }
                    (_, KeyCode::Char('n')) => {
                        let _ = cmd_tx.send(UiCommand::Restart);
                    }
                    (_, KeyCode::Char('?')) => {
                        state.show_help = !state.show_help;
                    }
                    (_, KeyCode::Esc) => {
                        state.show_help = false;
                    }
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => {
                        state.selected = state.selected.saturating_sub(1);
                    }
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => {
                        if state.selected + 1 < state.cards.len() {
                            state.selected += 1;
                        }
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn apply_event(state: &mut UiState, ev: KitchenEvent) {
    match ev {
        KitchenEvent::SimulationStarted { recipes } => {
            state.cards = recipes.iter().map(RecipeCard::from_intro).collect();
            state.selected = state.selected.min(state.cards.len().saturating_sub(1));
            state.info = format!("Simulation started: {} recipes", state.cards.len());
        }
        KitchenEvent::StepStarted {
            runner,
            step_index,
            description,
        } => {
            if let Some(card) = state.cards.get_mut(runner) {
                card.step_index = Some(step_index);
                card.current_step = description;
            }
        }
        KitchenEvent::Tick { runner, snapshot } => {
            if let Some(card) = state.cards.get_mut(runner) {
                card.apply_snapshot(&snapshot);
            }
        }
        KitchenEvent::PhaseChanged { runner, phase } => {
            if let Some(card) = state.cards.get_mut(runner) {
                card.phase = phase;
            }
        }
        KitchenEvent::RecipeCompleted { runner, record } => {
            if let Some(card) = state.cards.get_mut(runner) {
                card.phase = RunnerPhase::Completed;
                card.current_step = "Done!".to_string();
                card.progress_percent = 100.0;
                card.time_left_seconds = 0;
            }
            state.history.push(record);
        }
        KitchenEvent::RecipeCancelled { runner } => {
            if let Some(card) = state.cards.get_mut(runner) {
                card.phase = RunnerPhase::Cancelled;
                card.current_step = "Recipe cancelled".to_string();
            }
        }
        KitchenEvent::Info(msg) => state.info = msg,
    }
}

fn phase_color(phase: RunnerPhase) -> Color {
    match phase {
        RunnerPhase::Idle => Color::DarkGray,
        RunnerPhase::Running => Color::Green,
        RunnerPhase::Paused => Color::Yellow,
        RunnerPhase::Cancelled => Color::Red,
        RunnerPhase::Completed => Color::Cyan,
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    if state.show_help {
        help::draw_help(area, f);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(area);

    draw_cards(rows[0], f, state);
    draw_history(rows[1], f, state);
    draw_status(rows[2], f, state);
}

fn draw_cards(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    if state.cards.is_empty() {
        let p = Paragraph::new("No recipes loaded.")
            .block(Block::default().borders(Borders::ALL).title("Kitchen"));
        f.render_widget(p, area);
        return;
    }

    let constraints: Vec<Constraint> = state
        .cards
        .iter()
        .map(|_| Constraint::Length(4))
        .collect();
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, card) in state.cards.iter().enumerate() {
        let Some(slot) = slots.get(i) else { break };

        let selected = i == state.selected;
        let border_style = if selected {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let title = if card.difficulty.is_empty() {
            format!("{} {}", card.emoji, card.name)
        } else {
            format!("{} {} ({})", card.emoji, card.name, card.difficulty)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title);
        let inner = block.inner(*slot);
        f.render_widget(block, *slot);

        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(phase_color(card.phase)))
            .ratio((card.progress_percent / 100.0).clamp(0.0, 1.0))
            .label(format!("{:.0}%", card.progress_percent));
        f.render_widget(gauge, parts[0]);

        let step = match card.step_index {
            Some(idx) => format!(
                "step {}/{}: {}",
                idx + 1,
                card.step_count,
                card.current_step
            ),
            None => card.current_step.clone(),
        };
        let detail = Line::from(vec![
            Span::styled(
                format!("{:?}", card.phase),
                Style::default().fg(phase_color(card.phase)),
            ),
            Span::raw("  "),
            Span::raw(step),
            Span::raw("  ·  left "),
            Span::raw(format_time_left(card.time_left_seconds)),
        ]);
        f.render_widget(Paragraph::new(detail), parts[1]);
    }
}

fn draw_history(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    // Latest completion first.
    let items: Vec<ListItem> = state
        .history
        .iter()
        .rev()
        .map(|entry| ListItem::new(entry.as_str()))
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("History ({})", state.history.len())),
    );
    f.render_widget(list, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let hints = "q quit · ↑/↓ select · p pause · r resume · c cancel · n restart · ? help";
    let line = if state.info.is_empty() {
        Line::from(hints)
    } else {
        Line::from(vec![
            Span::styled(state.info.clone(), Style::default().fg(Color::Gray)),
            Span::raw("  |  "),
            Span::raw(hints),
        ])
    };
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}
