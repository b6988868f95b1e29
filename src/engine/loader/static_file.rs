use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::engine::component::{Component, ComponentHandle, Node, Props};
use crate::engine::loader::ComponentLoader;

/// Loads pre-rendered markup files (e.g. `views/maintenance.html`) as views.
///
/// The file is read on every load, so edits and deletions show up on the next
/// request. The resulting component ignores its props and emits the file
/// contents verbatim; it is meant for static pages and error views, not layouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticFileLoader;

impl StaticFileLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ComponentLoader for StaticFileLoader {
    async fn load(&self, path: &Path) -> Result<ComponentHandle> {
        let markup = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read '{}'", path.display()))?;

        Ok(Arc::new(StaticMarkupView { markup }))
    }
}

struct StaticMarkupView {
    markup: String,
}

impl Component for StaticMarkupView {
    fn render(&self, _props: &Props) -> Result<Node> {
        Ok(Node::raw(self.markup.as_str()))
    }
}
