mod params;
mod registry;
mod validation;

pub use params::{
    AspectRatio, GenerationMode, OutputFormat, DEFAULT_ASPECT_RATIO, DEFAULT_MODEL,
    DEFAULT_OUTPUT_FORMAT, DEFAULT_SEED, DEFAULT_STRENGTH,
};
pub use registry::{ModelDescriptor, ModelRegistry, StabilityModel, MAX_SEED};
pub use validation::{
    validate_aspect_ratio, validate_output_format, validate_seed, validate_strength,
    validation_errors, ValidationInput,
};
