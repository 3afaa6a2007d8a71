use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pacing and selection options for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Wall-clock length of one simulated second.
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    /// Case-insensitive substring filter on recipe names; `None` runs everything.
    #[serde(default)]
    pub recipe_filter: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            recipe_filter: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeStep {
    /// The data file writes this as `step`.
    #[serde(alias = "step", alias = "Step")]
    pub description: String,
    /// Whole simulated seconds; the unsigned type rejects negative durations at
    /// the deserialization boundary.
    #[serde(alias = "duration", alias = "Duration")]
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Difficulty")]
    pub difficulty: String,
    #[serde(default, alias = "Equipment")]
    pub equipment: Vec<String>,
    #[serde(default, alias = "Steps")]
    pub steps: Vec<RecipeStep>,
}

impl Recipe {
    /// Sum of all step durations in simulated seconds. Fixed for the lifetime
    /// of a runner once it copies the steps at construction.
    pub fn total_duration(&self) -> u64 {
        self.steps.iter().map(|s| s.duration_seconds).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(alias = "Name")]
    pub name: String,
    /// Kept verbatim; the data file writes quantities as strings ("500", "2.5").
    #[serde(default, alias = "Quantity")]
    pub quantity: String,
    #[serde(default, alias = "Unit")]
    pub unit: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KitchenData {
    #[serde(default, alias = "Ingredients")]
    pub ingredients: Vec<Ingredient>,
    #[serde(default, alias = "Recipes")]
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerPhase {
    Idle,
    Running,
    Paused,
    Cancelled,
    Completed,
}

impl RunnerPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunnerPhase::Cancelled | RunnerPhase::Completed)
    }
}

/// Live state of one runner, published over a watch channel. Every field is
/// derived inside the runner; observers only read.
#[derive(Debug, Clone, Serialize)]
pub struct RunnerSnapshot {
    pub recipe: String,
    pub phase: RunnerPhase,
    /// Description of the step in progress, or a status string outside the loop
    /// ("Ready to start", "Done!", "Recipe cancelled").
    pub current_step: String,
    /// `None` until the loop publishes the first step; phase `Completed` is the
    /// finished sentinel.
    pub step_index: Option<usize>,
    pub step_count: usize,
    pub elapsed_in_step: u64,
    pub total_elapsed: u64,
    pub total_duration: u64,
    pub progress_percent: f64,
    pub time_left_seconds: u64,
}

impl RunnerSnapshot {
    pub fn time_left_formatted(&self) -> String {
        format_time_left(self.time_left_seconds)
    }
}

/// Events emitted by runners and the kitchen controller for presentation layers.
#[derive(Debug, Clone)]
pub enum KitchenEvent {
    /// A fresh set of runners was constructed; presentation state resets here.
    SimulationStarted { recipes: Vec<RecipeIntro> },
    StepStarted {
        runner: usize,
        step_index: usize,
        description: String,
    },
    /// One simulated second committed.
    Tick {
        runner: usize,
        snapshot: RunnerSnapshot,
    },
    PhaseChanged {
        runner: usize,
        phase: RunnerPhase,
    },
    RecipeCompleted {
        runner: usize,
        record: String,
    },
    RecipeCancelled {
        runner: usize,
    },
    Info(String),
}

/// Static facts about a recipe, enough for a presentation layer to lay out a
/// card before any progress arrives.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeIntro {
    pub name: String,
    pub emoji: String,
    pub difficulty: String,
    pub step_count: usize,
    pub total_duration: u64,
}

impl RecipeIntro {
    pub fn for_recipe(recipe: &Recipe) -> Self {
        Self {
            name: recipe.name.clone(),
            emoji: emoji_for_recipe(&recipe.name).to_string(),
            difficulty: recipe.difficulty.clone(),
            step_count: recipe.steps.len(),
            total_duration: recipe.total_duration(),
        }
    }
}

/// Final outcome of a whole simulation run, for the headless output modes.
#[derive(Debug, Clone, Serialize)]
pub struct KitchenReport {
    pub timestamp_utc: String,
    pub recipes: Vec<RecipeOutcome>,
    pub history: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeOutcome {
    pub name: String,
    pub phase: RunnerPhase,
    pub progress_percent: f64,
    pub total_elapsed: u64,
    pub total_duration: u64,
    pub time_left_seconds: u64,
}

/// "Xh Ym Zs", with the hours component omitted when zero.
pub fn format_time_left(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours >= 1 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

/// Pick a display tag from the recipe name.
pub fn emoji_for_recipe(name: &str) -> &'static str {
    let n = name.to_ascii_lowercase();
    if n.contains("pizza") {
        "🍕"
    } else if n.contains("pasta") {
        "🍝"
    } else if n.contains("chicken") {
        "🍗"
    } else if n.contains("beef") {
        "🥩"
    } else if n.contains("chocolate") || n.contains("pancake") {
        "🥞"
    } else if n.contains("seafood") || n.contains("paella") {
        "🦐"
    } else if n.contains("vegetable") || n.contains("stir fry") {
        "🥦"
    } else if n.contains("lamb") || n.contains("curry") {
        "🍛"
    } else {
        "🍽️"
    }
}
