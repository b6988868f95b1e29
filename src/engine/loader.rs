//! Component loading infrastructure.
//!
//! A **loader** turns a constructed component path (`<root>/<name>.<ext>`) into
//! a loaded [`Component`](crate::engine::component::Component). The resolver
//! builds the path and owns the error mapping; loaders only answer "what lives
//! at this path right now".
//!
//! This module exports two reference implementations:
//! - [`RegistryLoader`]: ahead-of-time table of compiled components keyed by path.
//! - [`StaticFileLoader`]: reads a markup file from disk on every load.
//!
//! ## Design notes
//! - Loaders are shared by all in-flight requests and must be `Send + Sync`.
//! - Nothing is cached across requests by the pipeline. Loaders that cache must
//!   still reflect removals, so a missing view always resolves as missing.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use extsx::{Node, Props, RegistryLoader};
//!
//! let loader = RegistryLoader::new();
//! loader.register("views/home.tsx", |_: &Props| -> anyhow::Result<Node> {
//!     Ok(Node::text("home"))
//! });
//! assert!(loader.contains("views/home.tsx"));
//! ```
mod registry;
mod static_file;

use std::path::Path;

use async_trait::async_trait;

use crate::engine::component::ComponentHandle;

pub use registry::RegistryLoader;
pub use static_file::StaticFileLoader;

/// Loads the component stored at a path.
///
/// Any failure (missing entry, unreadable file, compile error) is returned as
/// an error; the resolver turns it into a resolution failure and logs the cause.
#[async_trait]
pub trait ComponentLoader: Send + Sync {
    async fn load(&self, path: &Path) -> anyhow::Result<ComponentHandle>;
}
