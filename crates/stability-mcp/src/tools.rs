//! MCP tool implementations.

use std::sync::Arc;

use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content};
use rmcp::{tool, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Number;
use stability_contracts::models::{
    DEFAULT_ASPECT_RATIO, DEFAULT_MODEL, DEFAULT_OUTPUT_FORMAT, DEFAULT_SEED, DEFAULT_STRENGTH,
    MAX_SEED,
};
use stability_contracts::GenerationRequest;
use stability_engine::StabilityEngine;

use crate::format;
use crate::server::StabilityMcpServer;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateImageParams {
    /// Text description of the desired image
    pub prompt: String,
    /// Model key: stable-image-core, stable-image-ultra, sd3.5-large, sd3.5-large-turbo, sd3.5-medium, sd3.5-flash
    #[serde(default = "default_model")]
    pub model: String,
    /// Aspect ratio: 21:9, 16:9, 3:2, 5:4, 1:1, 4:5, 2:3, 9:16, 9:21, 4:3, 3:4
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    /// Seed for reproducible output; 0 lets the service pick one
    #[serde(default = "default_seed")]
    #[schemars(with = "i64")]
    pub seed: Number,
    /// Output format: png or jpeg
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// What to keep out of the image (not supported by sd3.5-flash)
    #[serde(default)]
    pub negative_prompt: String,
    /// Path to an input image; switches to image-to-image
    #[serde(default)]
    pub image_path: String,
    /// How far image-to-image may move from the input (0.0 to 1.0)
    #[serde(default = "default_strength")]
    pub strength: f64,
}

fn default_model() -> String {
    DEFAULT_MODEL.key().to_string()
}

fn default_aspect_ratio() -> String {
    DEFAULT_ASPECT_RATIO.as_str().to_string()
}

fn default_output_format() -> String {
    DEFAULT_OUTPUT_FORMAT.as_str().to_string()
}

fn default_seed() -> Number {
    Number::from(DEFAULT_SEED)
}

/// Integral seeds that fit `i64`, including whole floats such as `42.0`.
fn seed_value(seed: &Number) -> Option<i64> {
    seed.as_i64().or_else(|| {
        seed.as_f64()
            .filter(|value| value.fract() == 0.0)
            .filter(|value| *value >= i64::MIN as f64 && *value < i64::MAX as f64)
            .map(|value| value as i64)
    })
}

fn default_strength() -> f64 {
    DEFAULT_STRENGTH
}

impl GenerateImageParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: default_model(),
            aspect_ratio: default_aspect_ratio(),
            seed: default_seed(),
            output_format: default_output_format(),
            negative_prompt: String::new(),
            image_path: String::new(),
            strength: default_strength(),
        }
    }

    /// Converts to an engine request. A seed that is not an integer in the
    /// `i64` range comes back as a validation message alongside it.
    pub fn into_request(self) -> (GenerationRequest, Option<String>) {
        let image_path = Some(self.image_path.trim().to_string()).filter(|path| !path.is_empty());
        let strength = image_path.as_ref().map(|_| self.strength);
        let seed = seed_value(&self.seed);
        let seed_error = match seed {
            Some(_) => None,
            None => Some(format!(
                "Invalid seed '{}'. Must be between 0 and {MAX_SEED}",
                self.seed
            )),
        };
        let request = GenerationRequest {
            prompt: self.prompt,
            model: self.model,
            aspect_ratio: self.aspect_ratio,
            output_format: self.output_format,
            seed: seed.unwrap_or(DEFAULT_SEED),
            negative_prompt: Some(self.negative_prompt).filter(|text| !text.is_empty()),
            image_path,
            strength,
        };
        (request, seed_error)
    }
}

#[tool_router]
impl StabilityMcpServer {
    #[tool(
        description = "Generate an image with Stability AI. Leave image_path empty for text-to-image, or point it at an existing PNG/JPEG to transform that image (strength controls how far it may change). The image and a JSON metadata sidecar are saved to the storage directory."
    )]
    async fn generate_image(
        &self,
        Parameters(params): Parameters<GenerateImageParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        Ok(generate_image_impl(Arc::clone(&self.engine), params).await)
    }

    #[tool(description = "List the available Stability AI models and their capabilities.")]
    fn list_models(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        Ok(list_models_impl(&self.engine))
    }

    #[tool(
        description = "Show where generated images are stored and how many files and bytes the directory holds."
    )]
    fn get_storage_info(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        Ok(storage_info_impl(&self.engine))
    }
}

impl StabilityMcpServer {
    pub(crate) fn create_tool_router() -> rmcp::handler::server::router::tool::ToolRouter<Self> {
        Self::tool_router()
    }
}

/// Runs the blocking generation pipeline off the async runtime.
pub async fn generate_image_impl(
    engine: Arc<StabilityEngine>,
    params: GenerateImageParams,
) -> CallToolResult {
    let (request, seed_error) = params.into_request();
    if let Some(seed_error) = seed_error {
        let mut errors = request.validate(engine.registry());
        if engine.registry().resolve(&request.model).is_some() {
            errors.push(seed_error);
        }
        tracing::error!(errors = ?errors, "Rejected generation request");
        return error_text(format::validation_failure(&errors));
    }

    let worker_request = request.clone();
    let outcome =
        tokio::task::spawn_blocking(move || engine.generate(&worker_request)).await;

    match outcome {
        Ok(Ok(outcome)) => {
            tracing::info!(
                path = %outcome.artifact.image_path.display(),
                seed = outcome.result.seed,
                bytes = outcome.artifact.file_size,
                "Image saved"
            );
            success_text(format::generation_success(&request, &outcome))
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, model = %request.model, "Image generation failed");
            error_text(format::generation_failure(&err))
        }
        Err(join_err) => {
            tracing::error!(error = %join_err, "Generation worker did not complete");
            error_text(format::unexpected_error(&join_err.to_string()))
        }
    }
}

pub fn list_models_impl(engine: &StabilityEngine) -> CallToolResult {
    success_text(format::model_listing(engine.registry()))
}

pub fn storage_info_impl(engine: &StabilityEngine) -> CallToolResult {
    match engine.storage().stats() {
        Ok(stats) => success_text(format::storage_info(&stats)),
        Err(err) => {
            tracing::error!(error = %err, "Failed to read storage statistics");
            error_text(format!("❌ Error getting storage info: {err}"))
        }
    }
}

fn success_text(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

fn error_text(text: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(text)])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::GenerateImageParams;

    fn params(value: serde_json::Value) -> GenerateImageParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn omitted_arguments_take_documented_defaults() {
        let params = params(json!({ "prompt": "a lighthouse" }));
        assert_eq!(params.model, "stable-image-core");
        assert_eq!(params.aspect_ratio, "1:1");
        assert_eq!(params.output_format, "png");
        assert_eq!(params.seed.as_i64(), Some(0));
        assert_eq!(params.strength, 0.7);
        assert!(params.negative_prompt.is_empty());
        assert!(params.image_path.is_empty());
    }

    #[test]
    fn empty_strings_become_absent_fields() {
        let (request, seed_error) = GenerateImageParams::new("a lighthouse").into_request();
        assert_eq!(seed_error, None);
        assert_eq!(request.seed, 0);
        assert_eq!(request.negative_prompt, None);
        assert_eq!(request.image_path, None);
        assert_eq!(request.strength, None);
    }

    #[test]
    fn image_path_carries_strength() {
        let mut params = GenerateImageParams::new("make it winter");
        params.image_path = "  /tmp/in.png ".to_string();
        params.strength = 0.4;
        params.negative_prompt = "people".to_string();
        let (request, _) = params.into_request();
        assert_eq!(request.image_path.as_deref(), Some("/tmp/in.png"));
        assert_eq!(request.strength, Some(0.4));
        assert_eq!(request.negative_prompt.as_deref(), Some("people"));
    }

    #[test]
    fn whole_and_negative_seeds_pass_through() {
        let (request, seed_error) = params(json!({ "prompt": "p", "seed": 42.0 })).into_request();
        assert_eq!((request.seed, seed_error), (42, None));

        let (request, seed_error) = params(json!({ "prompt": "p", "seed": -5 })).into_request();
        assert_eq!((request.seed, seed_error), (-5, None));
    }

    #[test]
    fn unrepresentable_seeds_become_validation_messages() {
        let (_, seed_error) =
            params(json!({ "prompt": "p", "seed": u64::MAX })).into_request();
        assert_eq!(
            seed_error.as_deref(),
            Some("Invalid seed '18446744073709551615'. Must be between 0 and 4294967294")
        );

        let (_, seed_error) = params(json!({ "prompt": "p", "seed": 1.5 })).into_request();
        assert_eq!(
            seed_error.as_deref(),
            Some("Invalid seed '1.5'. Must be between 0 and 4294967294")
        );
    }
}
