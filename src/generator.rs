//! Recipe generation through an OpenAI-compatible chat-completion API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::cache::GenerationAborted;
use crate::models::Recipe;

const SYSTEM_PROMPT: &str = "You are a helpful chef. Reply with a single JSON object \
and nothing else, using the keys: title (string), description (string), servings \
(integer), prep_time_minutes (integer), cook_time_minutes (integer), ingredients \
(array of objects with name and quantity strings) and instructions (array of strings, \
one step each).";

// Upstream error bodies are cut to this many characters
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("request to AI provider failed: {0}")]
    Request(String),
    #[error("AI provider rate limit reached")]
    RateLimited,
    #[error("AI provider returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("AI provider returned an unusable recipe: {0}")]
    Malformed(String),
    #[error("no API key configured for the AI provider")]
    MissingApiKey,
    #[error(transparent)]
    Aborted(#[from] GenerationAborted),
}

/// Produces a recipe from normalized ingredient names.
#[async_trait]
pub trait RecipeGenerator: Send + Sync {
    async fn generate(&self, ingredients: &[String]) -> Result<Recipe, GenerationError>;
}

pub struct OpenAiRecipeGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiRecipeGenerator {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body(&self, ingredients: &[String]) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(ingredients),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl RecipeGenerator for OpenAiRecipeGenerator {
    async fn generate(&self, ingredients: &[String]) -> Result<Recipe, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey)?;

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&self.request_body(ingredients))
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(format!("invalid completion body: {e}")))?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Malformed("completion has no content".to_string()))?;

        debug!(model = %self.model, ingredients = ingredients.len(), "Recipe completion received");
        parse_recipe(&content)
    }
}

pub fn user_prompt(ingredients: &[String]) -> String {
    format!(
        "Create one recipe that uses these ingredients: {}. Common pantry staples may be added.",
        ingredients.join(", ")
    )
}

/// Parse the model's reply into a recipe, tolerating a Markdown code fence.
pub fn parse_recipe(content: &str) -> Result<Recipe, GenerationError> {
    let recipe: Recipe = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| GenerationError::Malformed(e.to_string()))?;

    if recipe.title.trim().is_empty() {
        return Err(GenerationError::Malformed("recipe has no title".to_string()));
    }
    if recipe.instructions.is_empty() {
        return Err(GenerationError::Malformed(
            "recipe has no instructions".to_string(),
        ));
    }
    Ok(recipe)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, routing::post};

    const RECIPE_JSON: &str = r#"{
        "title": "Tomato Onion Soup",
        "description": "A simple soup.",
        "servings": 2,
        "ingredients": [{"name": "tomato", "quantity": "4"}, {"name": "onion", "quantity": "1"}],
        "instructions": ["Chop everything.", "Simmer for 20 minutes."]
    }"#;

    /// Serve `reply` on `/v1/chat/completions` from an ephemeral local port.
    async fn fake_provider(status: StatusCode, reply: serde_json::Value) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap| {
                let reply = reply.clone();
                async move {
                    let authorized = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        == Some("Bearer test-key");
                    if authorized {
                        (status, Json(reply))
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(serde_json::json!({})))
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1/")
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn test_parse_recipe_plain_json() {
        let recipe = parse_recipe(RECIPE_JSON).unwrap();
        assert_eq!(recipe.title, "Tomato Onion Soup");
        assert_eq!(recipe.servings, Some(2));
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.cook_time_minutes, None);
    }

    #[test]
    fn test_parse_recipe_strips_code_fence() {
        let fenced = format!("```json\n{RECIPE_JSON}\n```");
        assert_eq!(parse_recipe(&fenced).unwrap().title, "Tomato Onion Soup");
    }

    #[test]
    fn test_parse_recipe_rejects_missing_instructions() {
        let err = parse_recipe(r#"{"title": "Toast", "instructions": []}"#).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn test_parse_recipe_rejects_prose() {
        let err = parse_recipe("Sure! Here is a recipe for soup.").unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn test_request_body_shape() {
        let generator =
            OpenAiRecipeGenerator::new(reqwest::Client::new(), "http://x/v1/", "gpt-test", None);
        let body = serde_json::to_value(
            generator.request_body(&["onion".to_string(), "tomato".to_string()]),
        )
        .unwrap();
        assert_eq!(generator.completions_url(), "http://x/v1/chat/completions");
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(
            body["messages"][1]["content"]
                .as_str()
                .unwrap()
                .contains("onion, tomato")
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let generator = OpenAiRecipeGenerator::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            "gpt-test",
            None,
        );
        let err = generator.generate(&["egg".to_string()]).await.unwrap_err();
        assert_eq!(err, GenerationError::MissingApiKey);
    }

    #[tokio::test]
    async fn test_generate_against_fake_provider() {
        let base = fake_provider(StatusCode::OK, completion(RECIPE_JSON)).await;
        let generator = OpenAiRecipeGenerator::new(
            reqwest::Client::new(),
            &base,
            "gpt-test",
            Some("test-key".to_string()),
        );
        let recipe = generator
            .generate(&["onion".to_string(), "tomato".to_string()])
            .await
            .unwrap();
        assert_eq!(recipe.instructions.len(), 2);
    }

    #[tokio::test]
    async fn test_provider_rate_limit_is_reported() {
        let base = fake_provider(StatusCode::TOO_MANY_REQUESTS, serde_json::json!({})).await;
        let generator = OpenAiRecipeGenerator::new(
            reqwest::Client::new(),
            &base,
            "gpt-test",
            Some("test-key".to_string()),
        );
        let err = generator.generate(&["egg".to_string()]).await.unwrap_err();
        assert_eq!(err, GenerationError::RateLimited);
    }

    #[tokio::test]
    async fn test_provider_error_status_is_reported() {
        let base = fake_provider(
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({"error": "boom"}),
        )
        .await;
        let generator = OpenAiRecipeGenerator::new(
            reqwest::Client::new(),
            &base,
            "gpt-test",
            Some("test-key".to_string()),
        );
        let err = generator.generate(&["egg".to_string()]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Upstream { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let base = fake_provider(StatusCode::OK, serde_json::json!({"choices": []})).await;
        let generator = OpenAiRecipeGenerator::new(
            reqwest::Client::new(),
            &base,
            "gpt-test",
            Some("test-key".to_string()),
        );
        let err = generator.generate(&["egg".to_string()]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }
}
