use super::params::{AspectRatio, OutputFormat};
use super::registry::{ModelRegistry, MAX_SEED};

/// Everything the validator looks at, borrowed from the caller's request.
#[derive(Debug, Clone, Copy)]
pub struct ValidationInput<'a> {
    pub model: &'a str,
    pub aspect_ratio: &'a str,
    pub output_format: &'a str,
    pub seed: i64,
    pub strength: Option<f64>,
    pub negative_prompt: Option<&'a str>,
    pub image_path: Option<&'a str>,
}

pub fn validate_seed(seed: i64) -> bool {
    (0..=MAX_SEED as i64).contains(&seed)
}

pub fn validate_strength(strength: f64) -> bool {
    (0.0..=1.0).contains(&strength)
}

pub fn validate_aspect_ratio(aspect_ratio: &str) -> bool {
    AspectRatio::parse(aspect_ratio).is_some()
}

pub fn validate_output_format(output_format: &str) -> bool {
    OutputFormat::parse(output_format).is_some()
}

/// Collects every violation; an empty list means the parameters are valid.
///
/// An unknown model stops the pipeline early: the remaining checks depend on
/// its capability flags.
pub fn validation_errors(registry: &ModelRegistry, input: &ValidationInput<'_>) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(model) = registry.resolve(input.model) else {
        errors.push(format!(
            "Invalid model '{}'. Available models: {}",
            input.model,
            registry.keys().join(", ")
        ));
        return errors;
    };

    if !validate_aspect_ratio(input.aspect_ratio) {
        errors.push(format!(
            "Invalid aspect ratio '{}'. Valid ratios: {}",
            input.aspect_ratio,
            AspectRatio::tokens().join(", ")
        ));
    }

    if !validate_output_format(input.output_format) {
        errors.push(format!(
            "Invalid output format '{}'. Valid formats: {}",
            input.output_format,
            OutputFormat::tokens().join(", ")
        ));
    }

    if !validate_seed(input.seed) {
        errors.push(format!(
            "Invalid seed '{}'. Must be between 0 and {}",
            input.seed, model.max_seed
        ));
    }

    let has_image = input.image_path.is_some_and(|path| !path.is_empty());

    if let (true, Some(strength)) = (has_image, input.strength) {
        if !model.supports_strength {
            errors.push(format!(
                "Model '{}' does not support strength parameter",
                input.model
            ));
        } else if !validate_strength(strength) {
            errors.push(format!(
                "Invalid strength '{strength}'. Must be between 0.0 and 1.0"
            ));
        }
    }

    if input.negative_prompt.is_some_and(|text| !text.is_empty()) && !model.supports_negative_prompt
    {
        errors.push(format!(
            "Model '{}' does not support negative prompts",
            input.model
        ));
    }

    if has_image && !model.supports_image_to_image {
        errors.push(format!(
            "Model '{}' does not support image-to-image generation",
            input.model
        ));
    }

    errors
}
