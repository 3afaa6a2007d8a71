pub mod cli;
pub mod history;
pub mod loader;
pub mod model;
pub mod orchestrator;
pub mod runner;
pub mod text_summary;
#[cfg(feature = "tui")]
pub mod tui;

pub use history::HistoryLog;
pub use model::{KitchenData, KitchenEvent, Recipe, RecipeStep, RunConfig, RunnerPhase};
pub use orchestrator::Kitchen;
pub use runner::RecipeRunner;
