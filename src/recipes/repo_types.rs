use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{db::StoreError, ingredients::repo_types::Ingredient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum Category {
    Breakfast,
    Lunch,
    Dinner,
    Dessert,
    Snack,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Breakfast => "BREAKFAST",
            Category::Lunch => "LUNCH",
            Category::Dinner => "DINNER",
            Category::Dessert => "DESSERT",
            Category::Snack => "SNACK",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts any casing: `dinner`, `Dinner`, `DINNER`.
impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BREAKFAST" => Ok(Category::Breakfast),
            "LUNCH" => Ok(Category::Lunch),
            "DINNER" => Ok(Category::Dinner),
            "DESSERT" => Ok(Category::Dessert),
            "SNACK" => Ok(Category::Snack),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipeSource {
    UserCreated,
    Imported,
}

impl RecipeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeSource::UserCreated => "USER_CREATED",
            RecipeSource::Imported => "IMPORTED",
        }
    }
}

impl FromStr for RecipeSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER_CREATED" => Ok(RecipeSource::UserCreated),
            "IMPORTED" => Ok(RecipeSource::Imported),
            _ => Err(format!("unknown recipe source: {s}")),
        }
    }
}

/// Raw `recipes` row; enums are stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub ingredients_text: String,
    pub instructions: String,
    pub prep_time_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub category: Option<String>,
    pub source: String,
    pub owner_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub ingredients_text: String,
    pub instructions: String,
    pub prep_time_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub category: Option<Category>,
    pub source: RecipeSource,
    pub owner_id: i64,
    pub ingredients: Vec<Ingredient>,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = StoreError;

    fn try_from(r: RecipeRow) -> Result<Self, Self::Error> {
        let category = r
            .category
            .as_deref()
            .map(Category::from_str)
            .transpose()
            .map_err(StoreError::Corrupt)?;
        let source = RecipeSource::from_str(&r.source).map_err(StoreError::Corrupt)?;
        Ok(Self {
            id: r.id,
            name: r.name,
            description: r.description,
            ingredients_text: r.ingredients_text,
            instructions: r.instructions,
            prep_time_minutes: r.prep_time_minutes,
            servings: r.servings,
            category,
            source,
            owner_id: r.owner_id,
            ingredients: Vec::new(),
        })
    }
}

/// Columns written on create. Ingredients are attached separately.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub description: Option<String>,
    pub ingredients_text: String,
    pub instructions: String,
    pub prep_time_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub category: Option<Category>,
    pub source: RecipeSource,
    pub owner_id: i64,
}

/// Columns an owner may overwrite on update.
#[derive(Debug, Clone)]
pub struct RecipeChanges {
    pub name: String,
    pub description: Option<String>,
    pub instructions: String,
    pub prep_time_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub category: Option<Category>,
}

/// Which recipes a read may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every row, regardless of source or owner.
    Everything,
    /// User-created rows plus imported rows owned by the viewer, if any.
    VisibleTo(Option<i64>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeFilter {
    NameContains(String),
    IngredientsContain(String),
    Category(Category),
    PrepTimeBelow(i32),
    PrepTimeBetween(i32, i32),
    Servings(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub const MAX_SIZE: u32 = 100;

    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, Self::MAX_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: i64) -> Self {
        let size = i64::from(request.size);
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: (total_elements + size - 1) / size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_any_case() {
        assert_eq!("breakfast".parse::<Category>(), Ok(Category::Breakfast));
        assert_eq!("Dinner".parse::<Category>(), Ok(Category::Dinner));
        assert!("brunch".parse::<Category>().is_err());
        let c: Category = serde_json::from_str("\"lunch\"").unwrap();
        assert_eq!(c, Category::Lunch);
        assert_eq!(serde_json::to_string(&Category::Dessert).unwrap(), "\"DESSERT\"");
    }

    #[test]
    fn page_counts_round_up() {
        let p = Page::new(vec![1, 2], PageRequest::new(0, 2), 5);
        assert_eq!(p.total_pages, 3);
        let empty: Page<i32> = Page::new(vec![], PageRequest::new(0, 20), 0);
        assert_eq!(empty.total_pages, 0);
        assert_eq!(PageRequest::new(3, 0).size, 1);
        assert_eq!(PageRequest::new(2, 500).offset(), 200);
    }

    #[test]
    fn corrupt_enum_text_is_reported() {
        let row = RecipeRow {
            id: 1,
            name: "Stew".into(),
            description: None,
            ingredients_text: "beef".into(),
            instructions: "simmer".into(),
            prep_time_minutes: None,
            servings: None,
            category: Some("BRUNCH".into()),
            source: "USER_CREATED".into(),
            owner_id: 1,
        };
        assert!(matches!(Recipe::try_from(row), Err(StoreError::Corrupt(_))));
    }
}
