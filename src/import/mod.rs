mod client;
pub mod dto;

pub use client::{RecipeImportClient, SpoonacularClient};
