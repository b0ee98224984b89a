//! Error taxonomy for generation and storage failures.

use std::path::PathBuf;

use crate::client::GenerationResult;

#[derive(Debug, thiserror::Error)]
pub enum StabilityError {
    #[error("Invalid API key. Please check your STABILITY_API_KEY.")]
    Authentication,

    #[error("Insufficient credits. Please check your Stability AI account balance.")]
    InsufficientCredits,

    #[error("Bad request: {0}. Please check your parameters.")]
    BadRequest(String),

    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimited,

    #[error(
        "Generated content was filtered due to NSFW detection. \
         Try a different prompt or add negative prompts to avoid restricted content."
    )]
    ContentFiltered,

    #[error("Network error: {0}. Please check your internet connection.")]
    Network(String),

    #[error("Image file not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("Invalid image file: {}. Error: {reason}", .path.display())]
    InvalidImage { path: PathBuf, reason: String },

    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

impl StabilityError {
    /// Classification tag reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            StabilityError::Authentication => "authentication_error",
            StabilityError::InsufficientCredits => "insufficient_credits",
            StabilityError::BadRequest(_) => "bad_request",
            StabilityError::RateLimited => "rate_limit",
            StabilityError::ContentFiltered => "content_filtered",
            StabilityError::Network(_) => "network_error",
            StabilityError::ImageNotFound(_) | StabilityError::InvalidImage { .. } => "file_error",
            StabilityError::Api { .. } | StabilityError::Other(_) => "generic_api_error",
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            StabilityError::Authentication => Some(401),
            StabilityError::InsufficientCredits => Some(402),
            StabilityError::BadRequest(_) => Some(400),
            StabilityError::RateLimited => Some(429),
            StabilityError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Credit exhaustion is not always reported as 402; the message is checked too.
    pub fn is_credit_problem(&self) -> bool {
        matches!(self, StabilityError::InsufficientCredits)
            || self.to_string().to_ascii_lowercase().contains("credits")
    }

    /// Transport failures may succeed on a later attempt; API rejections will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, StabilityError::Network(_))
    }
}

impl From<reqwest::Error> for StabilityError {
    fn from(err: reqwest::Error) -> Self {
        StabilityError::Network(error_chain_text(&err))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error(
        "Cannot create or access storage directory: {}. Error: {source}. \
         Please check the IMAGE_STORAGE_PATH configuration.",
        .path.display()
    )]
    Unavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "No write permission for storage directory: {}. \
         Please check directory permissions or choose a different path.",
        .path.display()
    )]
    NotWritable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to save image and metadata: {0}")]
    Save(String),

    #[error("Failed to read storage directory {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn kind(&self) -> &'static str {
        "storage_error"
    }
}

/// Failure of the full validate → generate → persist pipeline.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Parameter validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Generation(#[from] StabilityError),

    /// The remote call succeeded but the artifact could not be written.
    #[error("Image generated but failed to save: {source}")]
    Storage {
        result: Box<GenerationResult>,
        #[source]
        source: StorageError,
    },
}

pub(crate) fn error_chain_text(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut cause = err.source();
    while let Some(inner) = cause {
        let text = inner.to_string();
        if parts.last().map(|last| last != &text).unwrap_or(true) {
            parts.push(text);
        }
        cause = inner.source();
    }
    parts.join(": ")
}
