//! Stability AI MCP server
//!
//! Exposes Stability AI image generation to AI agents via the Model Context
//! Protocol: one generation tool plus model and storage introspection.

pub mod config;
pub mod format;
pub mod server;
pub mod tools;

pub use config::Config;
pub use server::StabilityMcpServer;
