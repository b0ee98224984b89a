//! Human-readable tool responses.

use stability_contracts::models::{ModelDescriptor, ModelRegistry, DEFAULT_MODEL};
use stability_contracts::GenerationRequest;
use stability_engine::{GenerateError, GenerationOutcome, StabilityError, StorageStats};

pub fn generation_success(request: &GenerationRequest, outcome: &GenerationOutcome) -> String {
    format!(
        "✅ Image generated successfully!\n\n\
         **Model:** {}\n\
         **Type:** {}\n\
         **Seed:** {}\n\
         **Format:** {}\n\
         **File:** {}\n\
         **Metadata:** {}\n\
         **Status:** 📁 Saved to disk\n\n\
         The image and its metadata have been saved and can be opened from the file path above.",
        request.model,
        outcome.mode.label(),
        outcome.result.seed,
        request.output_format,
        outcome.artifact.image_path.display(),
        outcome.artifact.metadata_path.display(),
    )
}

pub fn generation_failure(err: &GenerateError) -> String {
    match err {
        GenerateError::Validation(errors) => validation_failure(errors),
        GenerateError::Generation(err) => stability_failure(err),
        GenerateError::Storage { source, .. } => {
            format!("❌ Image generated but failed to save: {source}")
        }
    }
}

pub fn validation_failure(errors: &[String]) -> String {
    let bullets = errors
        .iter()
        .map(|error| format!("• {error}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Parameter validation failed:\n{bullets}")
}

pub fn stability_failure(err: &StabilityError) -> String {
    let mut message = format!("❌ **Stability AI Error:** {err}");
    let kind = err.kind();
    if kind == "authentication_error" {
        message.push_str(
            "\n\n💡 **Solution:** Please check your STABILITY_API_KEY in your MCP client settings.",
        );
    } else if kind == "content_filtered" {
        message.push_str(
            "\n\n💡 **Suggestions:**\n\
             • Try a different prompt\n\
             • Add negative prompts to avoid restricted content\n\
             • Use more general/abstract descriptions",
        );
    } else if err.is_credit_problem() {
        message.push_str(
            "\n\n💡 **Solution:** Please check your Stability AI account balance at https://platform.stability.ai/",
        );
    } else if kind == "network_error" {
        message.push_str("\n\n💡 **Solution:** Please check your internet connection and try again.");
    }
    message
}

pub fn unexpected_error(detail: &str) -> String {
    format!("❌ **Unexpected Error:** {detail}\n\nPlease check the server logs for more details.")
}

pub fn model_listing(registry: &ModelRegistry) -> String {
    let (flagship, family): (Vec<&ModelDescriptor>, Vec<&ModelDescriptor>) =
        registry.list().partition(|model| model.is_flagship());

    let mut out = String::from("**Available Stability AI Models:**\n\n");
    if !flagship.is_empty() {
        out.push_str("**🚀 Core/Ultra Models (Recommended):**\n");
        for model in flagship {
            let marker = if model.model == DEFAULT_MODEL {
                " ⭐ (Default)"
            } else {
                ""
            };
            out.push_str(&model_line(model, marker));
        }
        out.push('\n');
    }
    if !family.is_empty() {
        out.push_str("**🔧 SD3.5 Family Models:**\n");
        for model in family {
            out.push_str(&model_line(model, ""));
        }
    }
    out.push_str(
        "\n**Usage Tips:**\n\
         • Core/Ultra models work best with natural language prompts\n\
         • SD3.5 models offer more technical control and detailed parameters\n\
         • Use `stable-image-core` for fast, cost-effective generation\n\
         • Use `stable-image-ultra` for highest quality results\n\
         • Use `sd3.5-flash` for rapid iteration and previews",
    );
    out
}

fn model_line(model: &ModelDescriptor, marker: &str) -> String {
    let mut capabilities = Vec::new();
    if model.supports_negative_prompt {
        capabilities.push("negative prompt");
    }
    if model.supports_image_to_image {
        capabilities.push("image-to-image");
    }
    if model.supports_strength {
        capabilities.push("strength");
    }
    format!(
        "• **{}**{marker}: {} (supports: {})\n",
        model.key(),
        model.description,
        capabilities.join(", ")
    )
}

pub fn storage_info(stats: &StorageStats) -> String {
    format!(
        "**📁 Image Storage Information:**\n\n\
         **Storage Path:** {}\n\
         **Total Files:** {}\n\
         **Image Files:** {}\n\
         **Metadata Files:** {}\n\
         **Total Size:** {:.2} MB\n\n\
         💡 **Tip:** Images are saved automatically after generation and can be opened from their file paths.",
        stats.storage_path.display(),
        stats.total_files,
        stats.image_files,
        stats.metadata_files,
        stats.total_size_mb(),
    )
}
