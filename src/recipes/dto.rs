use serde::{Deserialize, Serialize};

use crate::recipes::repo_types::{Category, PageRequest};

/// Body for create and update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients_text: String,
    #[serde(default)]
    pub instructions: String,
    pub prep_time_minutes: Option<i32>,
    pub servings: Option<i32>,
    /// Raw category name; checked by `validate_recipe`.
    pub category: Option<String>,
    /// Ingredient names to reconcile against the shared ingredient table.
    #[serde(default)]
    pub ingredients: Vec<String>,
}

impl RecipeRequest {
    /// The parsed category. Unknown names read as `None`, so validate first.
    pub fn category(&self) -> Option<Category> {
        self.category.as_deref().and_then(|c| c.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}
fn default_size() -> u32 { 20 }

impl From<Pagination> for PageRequest {
    fn from(p: Pagination) -> Self {
        PageRequest::new(p.page, p.size)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
    pub ingredient: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuickParams {
    pub max: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct PrepTimeRange {
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Deserialize)]
pub struct RemoteSearchParams {
    pub query: String,
    #[serde(default = "default_remote_number")]
    pub number: u32,
}
fn default_remote_number() -> u32 { 5 }

/// Upstream search hit, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecipeSummary {
    pub id: i64,
    pub title: String,
    pub image: Option<String>,
}
