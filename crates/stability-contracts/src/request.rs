use serde::{Deserialize, Serialize};

use crate::models::{
    validation_errors, GenerationMode, ModelRegistry, ValidationInput, DEFAULT_ASPECT_RATIO,
    DEFAULT_MODEL, DEFAULT_OUTPUT_FORMAT, DEFAULT_SEED,
};

/// One generation call. Seed stays signed so out-of-range values reach the
/// validator instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default = "default_seed")]
    pub seed: i64,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub strength: Option<f64>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: default_model(),
            aspect_ratio: default_aspect_ratio(),
            output_format: default_output_format(),
            seed: default_seed(),
            negative_prompt: None,
            image_path: None,
            strength: None,
        }
    }

    pub fn mode(&self) -> GenerationMode {
        if self.image_path().is_some() {
            GenerationMode::ImageToImage
        } else {
            GenerationMode::TextToImage
        }
    }

    /// The input image, with blank paths treated as absent.
    pub fn image_path(&self) -> Option<&str> {
        self.image_path
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn negative_prompt(&self) -> Option<&str> {
        self.negative_prompt
            .as_deref()
            .filter(|value| !value.is_empty())
    }

    /// Strength only matters for image-to-image; it is dropped otherwise.
    pub fn effective_strength(&self) -> Option<f64> {
        self.image_path().and(self.strength)
    }

    /// Parameter checks plus a non-blank prompt. An unknown model still
    /// yields only the model error.
    pub fn validate(&self, registry: &ModelRegistry) -> Vec<String> {
        let mut errors = validation_errors(
            registry,
            &ValidationInput {
                model: &self.model,
                aspect_ratio: &self.aspect_ratio,
                output_format: &self.output_format,
                seed: self.seed,
                strength: self.effective_strength(),
                negative_prompt: self.negative_prompt(),
                image_path: self.image_path(),
            },
        );
        if registry.resolve(&self.model).is_some() && self.prompt.trim().is_empty() {
            errors.insert(0, "Prompt must not be empty".to_string());
        }
        errors
    }
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

fn default_seed() -> i64 {
    DEFAULT_SEED
}
