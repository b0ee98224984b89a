use std::fs;
use std::path::Path;
use std::time::Duration;

use image::ImageReader;
use reqwest::blocking::multipart::{Form as MultipartForm, Part as MultipartPart};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::StatusCode;
use stability_contracts::models::{GenerationMode, ModelDescriptor, ModelRegistry};
use stability_contracts::GenerationRequest;

use crate::error::{error_chain_text, StabilityError};

pub const DEFAULT_API_BASE: &str = "https://api.stability.ai";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const FINISH_REASON_HEADER: &str = "finish-reason";
const SEED_HEADER: &str = "seed";
const DEFAULT_FINISH_REASON: &str = "SUCCESS";
const CONTENT_FILTERED: &str = "CONTENT_FILTERED";

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub image: Vec<u8>,
    pub seed: u64,
    pub finish_reason: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: String,
    pub width: u32,
    pub height: u32,
}

/// Confirms the file exists and decodes as an image.
pub fn inspect_image(path: &Path) -> Result<ImageInfo, StabilityError> {
    if !path.is_file() {
        return Err(StabilityError::ImageNotFound(path.to_path_buf()));
    }
    let invalid = |reason: String| StabilityError::InvalidImage {
        path: path.to_path_buf(),
        reason,
    };
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|err| invalid(err.to_string()))?;
    let format = reader
        .format()
        .map(|format| format!("{format:?}").to_ascii_lowercase())
        .ok_or_else(|| invalid("unrecognized image format".to_string()))?;
    let decoded = reader.decode().map_err(|err| invalid(err.to_string()))?;
    Ok(ImageInfo {
        format,
        width: decoded.width(),
        height: decoded.height(),
    })
}

/// Text fields of the multipart body, in send order.
///
/// Models sharing a route also need their key and the mode token. Negative
/// prompt and strength go out only when the model supports them and the
/// caller supplied them.
pub fn request_fields(
    registry: &ModelRegistry,
    model: &ModelDescriptor,
    request: &GenerationRequest,
) -> Vec<(&'static str, String)> {
    let mode = request.mode();
    let mut fields = vec![("prompt", request.prompt.clone())];

    if mode == GenerationMode::TextToImage {
        fields.push(("aspect_ratio", request.aspect_ratio.clone()));
    }
    fields.push(("seed", request.seed.to_string()));
    fields.push(("output_format", request.output_format.clone()));

    if mode == GenerationMode::ImageToImage && model.supports_strength {
        if let Some(strength) = request.effective_strength() {
            fields.push(("strength", strength.to_string()));
        }
    }

    if registry.route_is_shared(model.route) {
        fields.push(("model", model.key().to_string()));
        fields.push(("mode", mode.as_str().to_string()));
    }

    if model.supports_negative_prompt {
        if let Some(negative_prompt) = request.negative_prompt() {
            fields.push(("negative_prompt", negative_prompt.to_string()));
        }
    }

    fields
}

#[derive(Debug, Clone)]
pub struct StabilityClient {
    api_base: String,
    api_key: String,
    registry: ModelRegistry,
}

impl StabilityClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            registry: ModelRegistry::new(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into();
        let trimmed = api_base.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            self.api_base = trimmed.to_string();
        }
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Runs one generation. Single attempt; the HTTP client lives only for
    /// this call.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, StabilityError> {
        let model = self
            .registry
            .resolve(&request.model)
            .ok_or_else(|| StabilityError::Other(format!("Invalid model: {}", request.model)))?;
        let mode = request.mode();
        if mode == GenerationMode::ImageToImage && !model.supports_image_to_image {
            return Err(StabilityError::Other(format!(
                "Model {} does not support image-to-image generation",
                model.key()
            )));
        }

        let fields = request_fields(&self.registry, model, request);
        let form = build_form(&fields, request.image_path().map(Path::new))?;
        let endpoint = format!("{}{}", self.api_base, model.route);

        tracing::info!(
            endpoint = %endpoint,
            model = model.key(),
            mode = mode.as_str(),
            "Making request to Stability API"
        );
        tracing::debug!(
            fields = ?fields.iter().map(|(key, _)| *key).collect::<Vec<_>>(),
            "request parameters"
        );

        let http = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        let response = http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "image/*")
            .multipart(form)
            .send()?;

        read_generation_response(response, model.key())
    }
}

fn build_form(
    fields: &[(&'static str, String)],
    image_path: Option<&Path>,
) -> Result<MultipartForm, StabilityError> {
    let mut form = MultipartForm::new();
    for (key, value) in fields {
        form = form.text(*key, value.clone());
    }

    match image_path {
        Some(path) => {
            let info = inspect_image(path)?;
            tracing::info!(
                path = %path.display(),
                format = %info.format,
                width = info.width,
                height = info.height,
                "attaching input image"
            );
            let bytes = fs::read(path).map_err(|err| StabilityError::InvalidImage {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
            let file_name = path
                .file_name()
                .and_then(|value| value.to_str())
                .unwrap_or("image")
                .to_string();
            let part = MultipartPart::bytes(bytes)
                .file_name(file_name)
                .mime_str(mime_for_path(path).unwrap_or("image/png"))?;
            form = form.part("image", part);
        }
        // The remote multipart parser rejects bodies without a file part.
        None => form = form.part("none", MultipartPart::text("")),
    }
    Ok(form)
}

fn read_generation_response(
    response: HttpResponse,
    model: &str,
) -> Result<GenerationResult, StabilityError> {
    let status = response.status();
    if !status.is_success() {
        let body = match response.text() {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(
                    status = status.as_u16(),
                    error = %error_chain_text(&err),
                    "failed to read error response body"
                );
                String::new()
            }
        };
        return Err(classify_failure(status, body));
    }

    let headers = response.headers().clone();
    let image = response.bytes()?.to_vec();
    interpret_success(&headers, image, model)
}

fn classify_failure(status: StatusCode, body: String) -> StabilityError {
    match status.as_u16() {
        401 => StabilityError::Authentication,
        402 => StabilityError::InsufficientCredits,
        400 => StabilityError::BadRequest(body),
        429 => StabilityError::RateLimited,
        status => StabilityError::Api { status, body },
    }
}

fn interpret_success(
    headers: &HeaderMap,
    image: Vec<u8>,
    model: &str,
) -> Result<GenerationResult, StabilityError> {
    let finish_reason = header_text(headers, FINISH_REASON_HEADER)
        .unwrap_or_else(|| DEFAULT_FINISH_REASON.to_string());
    let seed = header_text(headers, SEED_HEADER)
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(0);

    if finish_reason == CONTENT_FILTERED {
        return Err(StabilityError::ContentFiltered);
    }

    Ok(GenerationResult {
        image,
        seed,
        finish_reason,
        model: model.to_string(),
    })
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
