//! Command-line and environment configuration for the server binary.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use stability_engine::client::DEFAULT_API_BASE;
use stability_engine::{StabilityClient, StabilityEngine, StorageManager};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "stability-mcp",
    version,
    about = "MCP server for Stability AI image generation"
)]
pub struct Config {
    /// Stability AI API key
    #[arg(long, env = "STABILITY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the Stability AI REST API
    #[arg(long, env = "STABILITY_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Directory for generated images (default: ./images)
    #[arg(long, env = "IMAGE_STORAGE_PATH")]
    pub storage_path: Option<PathBuf>,

    /// Keep at most this many images, deleting the oldest after each save
    #[arg(long, env = "IMAGE_MAX_FILES")]
    pub max_files: Option<usize>,

    /// Transport mode: "stdio"
    #[arg(long, default_value = "stdio", env = "STABILITY_MCP_TRANSPORT")]
    pub transport: String,
}

impl Config {
    pub fn api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => bail!(
                "STABILITY_API_KEY environment variable not set. \
                 Please configure your API key in your MCP client settings."
            ),
        }
    }

    pub fn storage(&self) -> StorageManager {
        StorageManager::new(self.storage_path.clone())
    }

    pub fn engine(&self) -> Result<StabilityEngine> {
        let client = StabilityClient::new(self.api_key()?).with_api_base(self.api_base.clone());
        Ok(StabilityEngine::new(client, self.storage()).with_retention(self.max_files))
    }
}
