//! Network and disk side of Stability AI image generation: the HTTP client,
//! artifact storage, and the pipeline that ties them to parameter validation.

pub mod client;
pub mod error;
pub mod storage;

use serde_json::{json, Map, Value};
use stability_contracts::models::{GenerationMode, ModelRegistry};
use stability_contracts::GenerationRequest;

pub use client::{inspect_image, GenerationResult, ImageInfo, StabilityClient};
pub use error::{GenerateError, StabilityError, StorageError};
pub use storage::{StorageManager, StorageStats, StoredArtifact};

const PROMPT_LOG_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub mode: GenerationMode,
    pub result: GenerationResult,
    pub artifact: StoredArtifact,
}

/// Validate, dispatch, persist, and optionally prune, one request at a time.
#[derive(Debug, Clone)]
pub struct StabilityEngine {
    registry: ModelRegistry,
    client: StabilityClient,
    storage: StorageManager,
    max_files: Option<usize>,
}

impl StabilityEngine {
    pub fn new(client: StabilityClient, storage: StorageManager) -> Self {
        Self {
            registry: ModelRegistry::new(),
            client,
            storage,
            max_files: None,
        }
    }

    /// Keep at most `max_files` images after each save.
    pub fn with_retention(mut self, max_files: Option<usize>) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome, GenerateError> {
        let errors = request.validate(&self.registry);
        if !errors.is_empty() {
            return Err(GenerateError::Validation(errors));
        }

        let mode = request.mode();
        tracing::info!(
            model = %request.model,
            mode = mode.as_str(),
            prompt = %truncate_text(&request.prompt, PROMPT_LOG_CHARS),
            "Generating image"
        );

        let result = self.client.generate(request)?;
        let metadata = generation_metadata(request, &result);
        let artifact = match self.storage.persist(&result.image, metadata) {
            Ok(artifact) => artifact,
            Err(source) => {
                return Err(GenerateError::Storage {
                    result: Box::new(result),
                    source,
                })
            }
        };

        if let Some(max_files) = self.max_files {
            match self.storage.prune_oldest(max_files) {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, max_files, "Pruned old images"),
                Err(err) => tracing::warn!(error = %err, "Failed to prune storage directory"),
            }
        }

        Ok(GenerationOutcome {
            mode,
            result,
            artifact,
        })
    }
}

/// Sidecar fields describing how an image was produced. Storage adds the
/// file facts on top.
pub fn generation_metadata(request: &GenerationRequest, result: &GenerationResult) -> Map<String, Value> {
    let mode = request.mode();
    let mut metadata = json!({
        "prompt": request.prompt,
        "model": request.model,
        "aspect_ratio": request.aspect_ratio,
        "seed": result.seed,
        "output_format": request.output_format,
        "negative_prompt": request.negative_prompt().unwrap_or_default(),
        "finish_reason": result.finish_reason,
        "generation_type": mode.as_str(),
    })
    .as_object()
    .cloned()
    .unwrap_or_default();

    if let Some(image_path) = request.image_path() {
        metadata.insert(
            "input_image_path".to_string(),
            Value::String(image_path.to_string()),
        );
        if let Some(strength) = request.effective_strength() {
            metadata.insert("strength".to_string(), json!(strength));
        }
    }
    metadata
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::{json, Value};
    use stability_contracts::GenerationRequest;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{
        generation_metadata, truncate_text, GenerateError, GenerationResult, StabilityClient,
        StabilityEngine, StorageManager,
    };

    fn result(seed: u64) -> GenerationResult {
        GenerationResult {
            image: vec![1, 2, 3],
            seed,
            finish_reason: "SUCCESS".to_string(),
            model: "stable-image-core".to_string(),
        }
    }

    #[test]
    fn metadata_for_text_to_image() {
        let request = GenerationRequest::new("a red fox");
        let metadata = generation_metadata(&request, &result(77));
        assert_eq!(metadata["seed"], json!(77));
        assert_eq!(metadata["generation_type"], json!("text-to-image"));
        assert_eq!(metadata["negative_prompt"], json!(""));
        assert!(!metadata.contains_key("input_image_path"));
        assert!(!metadata.contains_key("strength"));
    }

    #[test]
    fn metadata_for_image_to_image() {
        let mut request = GenerationRequest::new("make it winter");
        request.image_path = Some("/tmp/in.png".to_string());
        request.strength = Some(0.25);
        let metadata = generation_metadata(&request, &result(5));
        assert_eq!(metadata["generation_type"], json!("image-to-image"));
        assert_eq!(metadata["input_image_path"], json!("/tmp/in.png"));
        assert_eq!(metadata["strength"], json!(0.25));
    }

    #[test]
    fn truncate_text_appends_ellipsis() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc…");
    }

    #[test]
    fn validation_errors_stop_before_the_network() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = StabilityEngine::new(
            StabilityClient::new("key").with_api_base("http://127.0.0.1:9"),
            StorageManager::new(Some(temp.path().to_path_buf())),
        );
        let mut request = GenerationRequest::new("a red fox");
        request.model = "sd3.5-flash".to_string();
        request.negative_prompt = Some("blurry".to_string());
        request.seed = -1;

        match engine.generate(&request) {
            Err(GenerateError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().any(|error| error.contains("sd3.5-flash")));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(fs::read_dir(temp.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blank_prompt_is_never_dispatched() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8]))
            .expect(0)
            .mount(&server)
            .await;

        let temp = tempfile::tempdir()?;
        let engine = StabilityEngine::new(
            StabilityClient::new("key").with_api_base(server.uri()),
            StorageManager::new(Some(temp.path().to_path_buf())),
        );
        let outcome =
            tokio::task::spawn_blocking(move || engine.generate(&GenerationRequest::new("   ")))
                .await?;

        match outcome {
            Err(GenerateError::Validation(errors)) => {
                assert_eq!(errors, vec!["Prompt must not be empty".to_string()]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn generate_persists_artifact_and_prunes() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("seed", "31337")
                    .insert_header("finish-reason", "SUCCESS")
                    .set_body_bytes(vec![4u8, 5, 6]),
            )
            .mount(&server)
            .await;

        let temp = tempfile::tempdir()?;
        for stem in ["old_a", "old_b"] {
            fs::write(temp.path().join(format!("{stem}.png")), b"old")?;
            fs::write(temp.path().join(format!("{stem}_metadata.json")), b"{}")?;
            filetime::set_file_mtime(
                temp.path().join(format!("{stem}.png")),
                filetime::FileTime::from_unix_time(1_000_000, 0),
            )?;
        }

        let engine = StabilityEngine::new(
            StabilityClient::new("key").with_api_base(server.uri()),
            StorageManager::new(Some(temp.path().to_path_buf())),
        )
        .with_retention(Some(1));

        let outcome = tokio::task::spawn_blocking(move || {
            engine.generate(&GenerationRequest::new("a red fox"))
        })
        .await??;

        assert_eq!(outcome.result.seed, 31337);
        assert_eq!(fs::read(&outcome.artifact.image_path)?, vec![4u8, 5, 6]);
        let record: Value =
            serde_json::from_str(&fs::read_to_string(&outcome.artifact.metadata_path)?)?;
        assert_eq!(record["seed"], json!(31337));
        assert_eq!(record["finish_reason"], json!("SUCCESS"));
        assert!(!temp.path().join("old_a.png").exists());
        assert!(!temp.path().join("old_b_metadata.json").exists());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn storage_failure_keeps_the_generation_result() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![8u8]))
            .mount(&server)
            .await;

        let temp = tempfile::tempdir()?;
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"file, not a directory")?;

        let engine = StabilityEngine::new(
            StabilityClient::new("key").with_api_base(server.uri()),
            StorageManager::new(Some(blocker)),
        );
        let outcome = tokio::task::spawn_blocking(move || {
            engine.generate(&GenerationRequest::new("a red fox"))
        })
        .await?;

        match outcome {
            Err(GenerateError::Storage { result, source }) => {
                assert_eq!(result.image, vec![8u8]);
                assert_eq!(source.kind(), "storage_error");
            }
            other => panic!("expected storage failure, got {other:?}"),
        }
        Ok(())
    }
}
