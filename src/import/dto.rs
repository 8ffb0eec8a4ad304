use serde::Deserialize;

use crate::recipes::dto::RemoteRecipeSummary;

#[derive(Debug, Clone, Deserialize)]
pub struct SpoonacularIngredient {
    pub original: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpoonacularStep {
    pub number: u32,
    pub step: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpoonacularInstructionGroup {
    #[serde(default)]
    pub steps: Vec<SpoonacularStep>,
}

/// `GET /recipes/{id}/information`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpoonacularRecipeDetail {
    pub id: i64,
    pub title: String,
    pub servings: Option<i32>,
    pub ready_in_minutes: Option<i32>,
    #[serde(default)]
    pub extended_ingredients: Vec<SpoonacularIngredient>,
    #[serde(default)]
    pub analyzed_instructions: Vec<SpoonacularInstructionGroup>,
}

/// `GET /recipes/complexSearch`
#[derive(Debug, Clone, Deserialize)]
pub struct SpoonacularSearchResponse {
    #[serde(default)]
    pub results: Vec<RemoteRecipeSummary>,
}

/// `POST /users/connect`
#[derive(Debug, Clone, Deserialize)]
pub struct SpoonacularConnectResponse {
    pub hash: String,
}

/// A fetched recipe, already flattened to the catalog's text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRecipe {
    pub title: String,
    pub servings: Option<i32>,
    pub ready_in_minutes: Option<i32>,
    pub ingredients_text: String,
    pub instructions: String,
}

impl From<SpoonacularRecipeDetail> for ImportedRecipe {
    fn from(d: SpoonacularRecipeDetail) -> Self {
        let ingredients_text = d
            .extended_ingredients
            .iter()
            .map(|i| i.original.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let instructions = d
            .analyzed_instructions
            .iter()
            .flat_map(|g| g.steps.iter())
            .map(|s| format!("{}. {}\n", s.number, s.step))
            .collect::<String>();
        Self {
            title: d.title,
            servings: d.servings,
            ready_in_minutes: d.ready_in_minutes,
            ingredients_text,
            instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_flattens_into_text_fields() {
        let json = r#"{
            "id": 716429,
            "title": "Pasta with Garlic",
            "servings": 2,
            "readyInMinutes": 45,
            "extendedIngredients": [{"original": "1 tbsp butter"}, {"original": "2 cloves garlic"}],
            "analyzedInstructions": [
                {"steps": [{"number": 1, "step": "Boil water."}, {"number": 2, "step": "Add pasta."}]}
            ]
        }"#;
        let detail: SpoonacularRecipeDetail = serde_json::from_str(json).unwrap();
        let imported = ImportedRecipe::from(detail);
        assert_eq!(imported.title, "Pasta with Garlic");
        assert_eq!(imported.ingredients_text, "1 tbsp butter, 2 cloves garlic");
        assert_eq!(imported.instructions, "1. Boil water.\n2. Add pasta.\n");
        assert_eq!(imported.ready_in_minutes, Some(45));
    }

    #[test]
    fn missing_lists_flatten_to_empty_text() {
        let detail: SpoonacularRecipeDetail =
            serde_json::from_str(r#"{"id": 1, "title": "Toast"}"#).unwrap();
        let imported = ImportedRecipe::from(detail);
        assert_eq!(imported.ingredients_text, "");
        assert_eq!(imported.instructions, "");
    }
}
