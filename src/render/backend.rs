use crate::engine::component::Node;

/// Core markup backend interface: turns a fully composed component tree into
/// a document string. Called once per render, on a blocking worker thread.
pub trait MarkupRenderer: Send + Sync {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &str;

    /// Render the composed tree to a complete document.
    fn render_to_markup(&self, tree: &Node) -> anyhow::Result<String>;
}
