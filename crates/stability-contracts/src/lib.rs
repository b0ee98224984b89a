//! Model catalog, request shape, and parameter rules for Stability AI image
//! generation. Nothing in this crate touches the network or the filesystem.

pub mod models;
pub mod request;

pub use request::GenerationRequest;
