use crate::{
    error::{AppError, AppResult, FieldErrors},
    recipes::{dto::RecipeRequest, repo_types::Category},
};

pub const MIN_PREP_MINUTES: i32 = 1;
pub const MAX_PREP_MINUTES: i32 = 480;

const MAX_NAME_LEN: usize = 100;
const MAX_INGREDIENTS_LEN: usize = 1000;
const MAX_INSTRUCTIONS_LEN: usize = 5000;

fn check_text(errors: &mut FieldErrors, field: &'static str, value: &str, label: &str, max: usize) {
    if value.trim().is_empty() {
        errors.push(field, format!("{label} cannot be left empty"));
    } else if value.chars().count() > max {
        errors.push(field, format!("{label} must be between 1-{max} characters"));
    }
}

/// Field constraints for a recipe body. Every failure is reported, not just the first.
/// Prep time is checked separately by [`check_prep_time`].
pub fn validate_recipe(req: &RecipeRequest) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    check_text(&mut errors, "name", &req.name, "Recipe name", MAX_NAME_LEN);
    check_text(&mut errors, "ingredientsText", &req.ingredients_text, "Ingredients", MAX_INGREDIENTS_LEN);
    check_text(&mut errors, "instructions", &req.instructions, "Instructions", MAX_INSTRUCTIONS_LEN);
    if let Some(raw) = req.category.as_deref() {
        if raw.parse::<Category>().is_err() {
            errors.push("category", format!("Unknown category: {raw}"));
        }
    }
    if req.ingredients.iter().any(|n| n.trim().is_empty()) {
        errors.push("ingredients", "Ingredient names cannot be left empty");
    }
    errors.into_result()
}

/// `None` is allowed; otherwise the value must lie in `1..=480`.
pub fn check_prep_time(minutes: Option<i32>) -> AppResult<()> {
    match minutes {
        Some(t) if !(MIN_PREP_MINUTES..=MAX_PREP_MINUTES).contains(&t) => {
            Err(AppError::InvalidPrepTime(t))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RecipeRequest {
        RecipeRequest {
            name: "Stew".into(),
            ingredients_text: "beef, carrots".into(),
            instructions: "Simmer for two hours".into(),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_complete_body() {
        assert!(validate_recipe(&valid()).is_ok());
    }

    #[test]
    fn reports_all_blank_fields_together() {
        let req = RecipeRequest {
            ingredients: vec!["Flour".into(), "  ".into()],
            ..Default::default()
        };
        match validate_recipe(&req).unwrap_err() {
            AppError::ValidationFailed(fields) => {
                assert_eq!(fields.len(), 4);
                for f in ["name", "ingredientsText", "instructions", "ingredients"] {
                    assert!(fields.contains(f), "missing {f}");
                }
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_overlong_name() {
        let req = RecipeRequest { name: "x".repeat(101), ..valid() };
        assert!(matches!(validate_recipe(&req), Err(AppError::ValidationFailed(_))));
        let req = RecipeRequest { name: "x".repeat(100), ..valid() };
        assert!(validate_recipe(&req).is_ok());
    }

    #[test]
    fn category_names_any_case_or_field_error() {
        let req = RecipeRequest { category: Some("dinner".into()), ..valid() };
        assert!(validate_recipe(&req).is_ok());
        assert_eq!(req.category(), Some(Category::Dinner));

        let req = RecipeRequest { category: Some("BRUNCH".into()), ..valid() };
        match validate_recipe(&req).unwrap_err() {
            AppError::ValidationFailed(fields) => {
                assert_eq!(fields.len(), 1);
                assert!(fields.contains("category"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn prep_time_bounds() {
        for ok in [None, Some(1), Some(30), Some(480)] {
            assert!(check_prep_time(ok).is_ok(), "{ok:?}");
        }
        for bad in [0, -5, 481] {
            assert!(matches!(check_prep_time(Some(bad)), Err(AppError::InvalidPrepTime(t)) if t == bad));
        }
    }
}
