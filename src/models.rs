use serde::{Deserialize, Serialize};

// Body of POST /api/recipes/generate
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GenerateRecipeRequest {
    pub ingredients: Vec<String>,
}

// One line of a recipe's ingredient list
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct RecipeIngredient {
    pub name: String,
    #[serde(default)]
    pub quantity: String,
}

// Recipe as produced by the generator
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Recipe {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub prep_time_minutes: Option<u32>,
    #[serde(default)]
    pub cook_time_minutes: Option<u32>,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GenerateRecipeResponse {
    pub cache_key: String,
    pub ingredients: Vec<String>,
    pub recipe: Recipe,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClearCacheResponse {
    pub cleared: usize,
}
