//! MCP server implementation for Stability AI image generation.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{tool_handler, ServerHandler};
use stability_engine::StabilityEngine;

const INSTRUCTIONS: &str = "Stability AI image generation server. Use generate_image for \
text-to-image or image-to-image generation (pass image_path to transform an existing image), \
list_models to see the available models and what each supports, and get_storage_info to \
inspect where generated images are saved.";

#[derive(Clone)]
pub struct StabilityMcpServer {
    pub(crate) engine: Arc<StabilityEngine>,
    pub(crate) tool_router: ToolRouter<Self>,
}

impl StabilityMcpServer {
    pub fn new(engine: StabilityEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            tool_router: Self::create_tool_router(),
        }
    }

    pub fn engine(&self) -> &Arc<StabilityEngine> {
        &self.engine
    }
}

#[tool_handler]
impl ServerHandler for StabilityMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
