//! Kitchen data file loading.

use crate::model::KitchenData;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Read recipes and ingredients from a JSON file.
///
/// A recipe with zero steps is accepted; its runner completes immediately.
/// Negative durations never get past deserialization.
pub fn load_kitchen_data(path: &Path) -> Result<KitchenData> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read kitchen data file {}", path.display()))?;
    let data: KitchenData = serde_json::from_str(&raw)
        .with_context(|| format!("parse kitchen data file {}", path.display()))?;
    debug!(
        recipes = data.recipes.len(),
        ingredients = data.ingredients.len(),
        "kitchen data loaded"
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_a_data_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "ingredients": [{{ "name": "Spaghetti", "quantity": "400", "unit": "g" }}],
                "recipes": [
                    {{ "name": "Pasta Carbonara",
                       "difficulty": "Easy",
                       "steps": [
                           {{ "step": "Boil water", "duration": 2 }},
                           {{ "step": "Add pasta", "duration": 3 }}
                       ] }}
                ]
            }}"#
        )
        .unwrap();

        let data = load_kitchen_data(file.path()).unwrap();
        assert_eq!(data.recipes.len(), 1);
        assert_eq!(data.recipes[0].total_duration(), 5);
        assert_eq!(data.ingredients.len(), 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_kitchen_data(Path::new("/nonexistent/recipes.json")).unwrap_err();
        assert!(err.to_string().contains("read kitchen data file"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(load_kitchen_data(file.path()).is_err());
    }
}
