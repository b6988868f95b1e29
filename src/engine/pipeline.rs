//! Render pipeline: resolution, composition and error recovery.
//!
//! One [`ViewEngine`] is created at mount time and cloned into every request
//! handler. Each render call walks the stages of [`RenderStage`] strictly in
//! order:
//!
//! ```text
//! Idle → ResolvingView → ResolvingTemplate → Merging → Composing → Rendering → Streaming → Done
//! ```
//!
//! A failure while resolving, composing or rendering moves the call into
//! `ErrorRecovery`: unless the failing view *is* the error view (or the error
//! view is disabled), the error view is resolved and rendered once, inside the
//! built-in layout, with `{ "error": ... }` as its only data. If that fails too,
//! the caller gets [`RenderResult::Failed`] and the terminal handler takes over.
//! Nothing is retried beyond this single recovery attempt.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::engine::component::Node;
use crate::engine::compositor::{compose, ResolvedTemplate};
use crate::engine::config::SetupOptions;
use crate::engine::context::{RenderContext, RenderOutcome, RequestId};
use crate::engine::errors::{panic_message, RenderError, UnitKind};
use crate::engine::loader::ComponentLoader;
use crate::engine::merge::merge_over;
use crate::engine::resolver::ComponentResolver;
use crate::engine::sink::HttpResponseSink;
use crate::engine::streamer::DEFAULT_CHUNK_SIZE;
use crate::engine::templates::{select, SelectedTemplate, TemplateOverride};
use crate::render::{MarkupRenderer, StaticMarkup};

/// Stage of a single render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Idle,
    ResolvingView,
    ResolvingTemplate,
    Merging,
    Composing,
    Rendering,
    Streaming,
    ErrorRecovery,
    Done,
}

/// Per-call render options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    /// Layout override for this call.
    pub template: TemplateOverride,
    /// Config layer merged over the global config.
    pub config: Option<Value>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template = TemplateOverride::Named(name.into());
        self
    }

    pub fn no_template(mut self) -> Self {
        self.template = TemplateOverride::Disabled;
        self
    }

    pub fn config(mut self, config: impl Into<Value>) -> Self {
        self.config = Some(config.into());
        self
    }
}

/// Outcome of producing a document, before any byte is delivered.
#[derive(Debug, Clone)]
pub enum RenderResult {
    /// A document is ready. `recovered_from` is set when it is the error view.
    Document {
        html: String,
        recovered_from: Option<RenderError>,
    },
    /// Nothing could be rendered; the terminal handler should respond.
    Failed(RenderError),
}

impl RenderResult {
    pub fn html(&self) -> Option<&str> {
        match self {
            RenderResult::Document { html, .. } => Some(html),
            RenderResult::Failed(_) => None,
        }
    }
}

struct EngineShared {
    options: SetupOptions,
    resolver: ComponentResolver,
    markup: Arc<dyn MarkupRenderer>,
    chunk_size: usize,
}

/// The mounted view engine. Cheap to clone; all clones share the same
/// read-only options, loader and markup backend.
#[derive(Clone)]
pub struct ViewEngine {
    shared: Arc<EngineShared>,
}

impl std::fmt::Debug for ViewEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewEngine")
            .field("options", &self.shared.options)
            .field("markup", &self.shared.markup.name())
            .finish_non_exhaustive()
    }
}

impl ViewEngine {
    /// Mounts an engine with the [`StaticMarkup`] backend.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// use extsx::{RegistryLoader, SetupOptions, ViewEngine};
    ///
    /// let engine = ViewEngine::new(SetupOptions::default(), Arc::new(RegistryLoader::new()));
    /// assert_eq!(engine.options().extension, "tsx");
    /// ```
    pub fn new(options: SetupOptions, loader: Arc<dyn ComponentLoader>) -> Self {
        Self::with_renderer(options, loader, Arc::new(StaticMarkup::new()))
    }

    pub fn with_renderer(
        options: SetupOptions,
        loader: Arc<dyn ComponentLoader>,
        markup: Arc<dyn MarkupRenderer>,
    ) -> Self {
        let resolver = ComponentResolver::new(&options, loader);
        log::debug!(
            "view engine mounted: views in '{}', templates in '{}', backend {}",
            options.view_root().display(),
            options.template_root().display(),
            markup.name()
        );

        Self {
            shared: Arc::new(EngineShared {
                options,
                resolver,
                markup,
                chunk_size: DEFAULT_CHUNK_SIZE,
            }),
        }
    }

    pub fn options(&self) -> &SetupOptions {
        &self.shared.options
    }

    pub fn resolver(&self) -> &ComponentResolver {
        &self.shared.resolver
    }

    /// Static asset directory the host should serve, if enabled.
    pub fn public_dir(&self) -> Option<PathBuf> {
        self.shared.options.public_dir()
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.shared.chunk_size
    }

    /// Creates the render context for one request.
    pub fn context(&self) -> RenderContext {
        RenderContext::new(self.clone(), CancellationToken::new())
    }

    /// Creates the render context for one request, tied to the host's
    /// cancellation (e.g. client disconnect).
    pub fn context_with_cancel(&self, cancel: CancellationToken) -> RenderContext {
        RenderContext::new(self.clone(), cancel)
    }

    /// Renders a view into a complete document without delivering it.
    pub async fn render_document(
        &self,
        view: &str,
        data: Option<Value>,
        options: RenderOptions,
    ) -> RenderResult {
        self.render_with_id(RequestId::new(), view, data, options).await
    }

    /// Renders a view into a buffered [`http::Response`].
    pub async fn render_http(
        &self,
        view: &str,
        data: Option<Value>,
        options: RenderOptions,
    ) -> (RenderOutcome, http::Response<Vec<u8>>) {
        let mut sink = HttpResponseSink::new();
        let outcome = self.context().render(view, data, options, &mut sink).await;
        (outcome, sink.into_response())
    }

    pub(crate) async fn render_with_id(
        &self,
        id: RequestId,
        view: &str,
        data: Option<Value>,
        options: RenderOptions,
    ) -> RenderResult {
        match self.attempt(id, view, data, &options).await {
            Ok(html) => RenderResult::Document {
                html,
                recovered_from: None,
            },
            Err(error) => self.recover(id, view, error).await,
        }
    }

    async fn attempt(
        &self,
        id: RequestId,
        view: &str,
        data: Option<Value>,
        options: &RenderOptions,
    ) -> Result<String, RenderError> {
        let setup = &self.shared.options;
        let resolver = &self.shared.resolver;

        enter(id, RenderStage::ResolvingView, view);
        let unit = resolver.resolve(UnitKind::View, view).await?;

        enter(id, RenderStage::ResolvingTemplate, view);
        let template = match select(&options.template, &setup.default_template) {
            SelectedTemplate::None => ResolvedTemplate::None,
            SelectedTemplate::BuiltIn => ResolvedTemplate::BuiltIn,
            SelectedTemplate::Named(name) => {
                ResolvedTemplate::Unit(resolver.resolve(UnitKind::Template, &name).await?)
            }
        };

        enter(id, RenderStage::Merging, view);
        let config = merge_over(&setup.global_config, options.config.as_ref());
        let data = merge_over(&setup.global_data, data.as_ref());

        enter(id, RenderStage::Composing, view);
        let tree = compose(&unit, data, &template, config)?;

        enter(id, RenderStage::Rendering, view);
        self.render_markup(tree).await
    }

    async fn recover(&self, id: RequestId, view: &str, error: RenderError) -> RenderResult {
        enter(id, RenderStage::ErrorRecovery, view);

        let Some(error_view) = self.shared.options.error_view.as_deref() else {
            log::debug!("[{id}] no error view configured, giving up on '{view}'");
            return RenderResult::Failed(error);
        };
        let resolver = &self.shared.resolver;
        if resolver.path_for(UnitKind::View, error_view) == resolver.path_for(UnitKind::View, view) {
            log::warn!("[{id}] error view '{view}' failed itself: {error}");
            return RenderResult::Failed(error);
        }

        log::warn!("[{id}] rendering '{view}' failed, using error view '{error_view}': {error}");
        match self.render_error_view(id, error_view, &error).await {
            Ok(html) => RenderResult::Document {
                html,
                recovered_from: Some(error),
            },
            Err(cause) => {
                log::error!("[{id}] error view '{error_view}' failed: {cause}");
                RenderResult::Failed(RenderError::Recovery {
                    original: Box::new(error),
                    cause: Box::new(cause),
                })
            }
        }
    }

    /// Error path: custom layouts and call-level config are skipped so that the
    /// failure that triggered recovery is less likely to break it again.
    async fn render_error_view(
        &self,
        id: RequestId,
        name: &str,
        error: &RenderError,
    ) -> Result<String, RenderError> {
        let unit = self.shared.resolver.resolve(UnitKind::View, name).await?;

        enter(id, RenderStage::Composing, name);
        let config = merge_over(&self.shared.options.global_config, None);
        let tree = compose(
            &unit,
            json!({ "error": error.to_value() }),
            &ResolvedTemplate::BuiltIn,
            config,
        )?;

        enter(id, RenderStage::Rendering, name);
        self.render_markup(tree).await
    }

    /// Runs the markup backend on the blocking pool; its errors and panics
    /// become [`RenderError::Render`].
    async fn render_markup(&self, tree: Node) -> Result<String, RenderError> {
        let markup = self.shared.markup.clone();
        let joined = tokio::task::spawn_blocking(move || markup.render_to_markup(&tree)).await;

        match joined {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => Err(RenderError::Render(format!("{e:#}"))),
            Err(e) if e.is_panic() => Err(RenderError::Render(format!(
                "markup backend panicked: {}",
                panic_message(e.into_panic().as_ref())
            ))),
            Err(e) => Err(RenderError::Render(format!("markup task failed: {e}"))),
        }
    }
}

pub(crate) fn enter(id: RequestId, stage: RenderStage, view: &str) {
    log::debug!("[{id}] {stage:?} '{view}'");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::component::{Element, Props};
    use crate::engine::errors::ErrorKind;
    use crate::engine::loader::RegistryLoader;
    use anyhow::anyhow;

    fn home(props: &Props) -> anyhow::Result<Node> {
        let user = props.str("user").unwrap_or("nobody");
        Ok(Element::new("p").child(Node::text(format!("Hello {user}"))).into())
    }

    fn error_view(props: &Props) -> anyhow::Result<Node> {
        let kind = props.values["error"]["kind"].as_str().unwrap_or("?");
        Ok(Element::new("h1").child(Node::text(format!("Oops: {kind}"))).into())
    }

    fn broken(_: &Props) -> anyhow::Result<Node> {
        Err(anyhow!("view exploded"))
    }

    fn loader() -> Arc<RegistryLoader> {
        let loader = RegistryLoader::new();
        loader.register("views/home.tsx", home);
        loader.register("views/error.tsx", error_view);
        loader.register("views/broken.tsx", broken);
        Arc::new(loader)
    }

    fn engine(options: SetupOptions) -> ViewEngine {
        ViewEngine::new(options, loader())
    }

    #[tokio::test]
    async fn renders_view_inside_built_in_layout() {
        let result = engine(SetupOptions::default())
            .render_document("home", Some(json!({ "user": "Ann" })), RenderOptions::new())
            .await;

        let html = result.html().unwrap();
        assert!(html.starts_with("<!DOCTYPE html><html><head><title>Default</title>"));
        assert!(html.contains("<body><p>Hello Ann</p></body>"));
    }

    #[tokio::test]
    async fn global_and_call_layers_are_merged() {
        let options = SetupOptions::builder()
            .global_config(json!({ "head": { "title": "Site", "links": [{ "rel": "stylesheet", "href": "/a.css" }] } }))
            .global_data(json!({ "user": "Global" }))
            .build()
            .unwrap();

        let html = engine(options)
            .render_document(
                "home",
                Some(json!({ "user": "Call" })),
                RenderOptions::new().config(json!({
                    "head": { "links": [{ "rel": "stylesheet", "href": "/b.css" }] }
                })),
            )
            .await
            .html()
            .unwrap()
            .to_string();

        assert!(html.contains("<title>Site</title>"));
        let a = html.find("/a.css").unwrap();
        let b = html.find("/b.css").unwrap();
        assert!(a < b);
        assert!(html.contains("Hello Call"));
    }

    #[tokio::test]
    async fn missing_view_recovers_with_error_view() {
        let result = engine(SetupOptions::default())
            .render_document("missing", None, RenderOptions::new())
            .await;

        match result {
            RenderResult::Document { html, recovered_from } => {
                assert!(html.contains("<h1>Oops: ResolutionFailure</h1>"));
                assert!(html.contains("<html>"));
                assert_eq!(recovered_from.unwrap().kind(), ErrorKind::Resolution);
            }
            RenderResult::Failed(e) => panic!("expected recovery, got {e}"),
        }
    }

    #[tokio::test]
    async fn named_template_missing_is_not_replaced_by_built_in() {
        let result = engine(SetupOptions::builder().no_error_view().build().unwrap())
            .render_document("home", None, RenderOptions::new().template("custom"))
            .await;

        match result {
            RenderResult::Failed(RenderError::Resolution { kind, name, .. }) => {
                assert_eq!(kind, UnitKind::Template);
                assert_eq!(name, "custom");
            }
            other => panic!("expected a template resolution failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn call_override_skips_a_broken_global_template() {
        let loader = loader();
        loader.register("templates/custom.tsx", |props: &Props| -> anyhow::Result<Node> {
            Ok(Element::new("main").children(props.children.clone()).into())
        });
        let options = SetupOptions::builder().default_template("missing").build().unwrap();

        let result = ViewEngine::new(options, loader)
            .render_document("home", None, RenderOptions::new().template("custom"))
            .await;
        assert_eq!(result.html(), Some("<!DOCTYPE html><main><p>Hello nobody</p></main>"));
    }

    #[tokio::test]
    async fn no_template_renders_standalone() {
        let options = SetupOptions::builder().default_template("missing").build().unwrap();
        let result = engine(options)
            .render_document("home", None, RenderOptions::new().no_template())
            .await;
        assert_eq!(result.html(), Some("<!DOCTYPE html><p>Hello nobody</p>"));

        let disabled = SetupOptions::builder().no_default_template().build().unwrap();
        let result = engine(disabled).render_document("home", None, RenderOptions::new()).await;
        assert_eq!(result.html(), Some("<!DOCTYPE html><p>Hello nobody</p>"));
    }

    #[tokio::test]
    async fn failing_error_view_is_not_retried() {
        let options = SetupOptions::builder().error_view("broken").build().unwrap();
        let result = engine(options)
            .render_document("broken", None, RenderOptions::new())
            .await;

        match result {
            RenderResult::Failed(e) => assert_eq!(e.kind(), ErrorKind::Composition),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_view_aliases_are_not_retried() {
        let options = SetupOptions::builder().error_view("broken").build().unwrap();
        for alias in ["./broken", "broken/", "./broken/"] {
            let result = engine(options.clone())
                .render_document(alias, None, RenderOptions::new())
                .await;

            match result {
                RenderResult::Failed(e) => assert_eq!(e.kind(), ErrorKind::Composition, "{alias}"),
                other => panic!("expected failure for {alias}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn recovery_failure_wraps_both_errors() {
        let options = SetupOptions::builder().error_view("broken").build().unwrap();
        let result = engine(options)
            .render_document("missing", None, RenderOptions::new())
            .await;

        match result {
            RenderResult::Failed(e) => {
                assert_eq!(e.kind(), ErrorKind::Recovery);
                assert_eq!(e.original().kind(), ErrorKind::Resolution);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    struct PanickingBackend;

    impl MarkupRenderer for PanickingBackend {
        fn name(&self) -> &str {
            "PanickingBackend"
        }

        fn render_to_markup(&self, _tree: &Node) -> anyhow::Result<String> {
            panic!("backend down")
        }
    }

    #[tokio::test]
    async fn backend_panics_become_render_failures() {
        let options = SetupOptions::builder().no_error_view().build().unwrap();
        let engine = ViewEngine::with_renderer(options, loader(), Arc::new(PanickingBackend));

        match engine.render_document("home", None, RenderOptions::new()).await {
            RenderResult::Failed(e) => {
                assert_eq!(e.kind(), ErrorKind::Render);
                assert!(e.to_string().contains("backend down"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
