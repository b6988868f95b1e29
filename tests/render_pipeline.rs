use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use futures::StreamExt;
use extsx::{
    config, merge_over, ChannelSink, ComponentHandle, ComponentLoader, CreateConfig, Element,
    ErrorKind, HttpResponseSink, Node, Props, RegistryLoader, RenderError, RenderOptions,
    RenderOutcome, ResponseSink, SetupOptions, SinkEvent, StaticFileLoader, UnrecoverableErrorHandler,
    ViewEngine,
};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use serde_json::json;

/// Wraps a loader and records every path it is asked for.
struct CountingLoader {
    inner: RegistryLoader,
    requests: Mutex<Vec<PathBuf>>,
}

impl CountingLoader {
    fn new(inner: RegistryLoader) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_path() == Path::new(path))
            .count()
    }
}

#[async_trait]
impl ComponentLoader for CountingLoader {
    async fn load(&self, path: &Path) -> anyhow::Result<ComponentHandle> {
        self.requests.lock().unwrap().push(path.to_path_buf());
        self.inner.load(path).await
    }
}

/// Terminal handler that counts its calls and answers with a fixed body.
#[derive(Default)]
struct CountingHandler {
    calls: AtomicUsize,
    last_kind: Mutex<Option<ErrorKind>>,
}

#[async_trait]
impl UnrecoverableErrorHandler for CountingHandler {
    async fn handle(&self, error: &RenderError, sink: &mut dyn ResponseSink) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_kind.lock().unwrap() = Some(error.kind());

        sink.set_status(StatusCode::SERVICE_UNAVAILABLE);
        sink.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let _ = sink.write(b"unavailable").await;
    }
}

fn home(props: &Props) -> anyhow::Result<Node> {
    let user = props.str("user").unwrap_or("guest");
    Ok(Element::new("main")
        .attr("id", "home")
        .child(Node::text(format!("Welcome {user}")))
        .into())
}

fn error_page(props: &Props) -> anyhow::Result<Node> {
    let error = &props.values["error"];
    Ok(Element::new("div")
        .attr("class", "error")
        .attr("data-kind", error["kind"].as_str().unwrap_or(""))
        .attr("data-name", error["name"].as_str().unwrap_or(""))
        .into())
}

fn throws(_: &Props) -> anyhow::Result<Node> {
    Err(anyhow!("component threw"))
}

fn site_loader() -> RegistryLoader {
    let loader = RegistryLoader::new();
    loader.register("views/home.tsx", home);
    loader.register("views/error.tsx", error_page);
    loader.register("views/throws.tsx", throws);
    loader.register("templates/site.tsx", |props: &Props| -> anyhow::Result<Node> {
        Ok(Element::new("div")
            .attr("class", "layout")
            .children(props.children.clone())
            .into())
    });
    loader
}

fn body(sink: HttpResponseSink) -> String {
    String::from_utf8(sink.into_response().into_body()).unwrap()
}

#[tokio::test]
async fn view_is_wrapped_in_the_built_in_layout() {
    let engine = ViewEngine::new(SetupOptions::default(), Arc::new(site_loader()));
    let mut sink = HttpResponseSink::new();

    let outcome = engine
        .context()
        .render("home", Some(json!({ "user": "Ann" })), RenderOptions::new(), &mut sink)
        .await;

    assert!(matches!(outcome, RenderOutcome::Rendered));
    let html = body(sink);
    assert!(html.starts_with("<!DOCTYPE html><html>"));
    assert!(html.contains("<body><main id=\"home\">Welcome Ann</main></body>"));
}

#[tokio::test]
async fn global_named_layout_wraps_the_view() {
    let options = SetupOptions::builder().default_template("site").build().unwrap();
    let engine = ViewEngine::new(options, Arc::new(site_loader()));

    let (outcome, response) = engine
        .render_http("home", Some(json!({ "user": "Ann" })), RenderOptions::new())
        .await;

    assert!(matches!(outcome, RenderOutcome::Rendered));
    assert_eq!(
        response.body().as_slice(),
        b"<!DOCTYPE html><div class=\"layout\"><main id=\"home\">Welcome Ann</main></div>"
    );
}

#[tokio::test]
async fn disabled_layout_renders_only_the_view() {
    for options in [
        SetupOptions::default(),
        SetupOptions::builder().default_template("site").build().unwrap(),
        SetupOptions::builder().no_default_template().build().unwrap(),
    ] {
        let engine = ViewEngine::new(options, Arc::new(site_loader()));
        let (_, response) = engine
            .render_http("home", Some(json!({})), RenderOptions::new().no_template())
            .await;

        assert_eq!(
            response.body().as_slice(),
            b"<!DOCTYPE html><main id=\"home\">Welcome guest</main>"
        );
    }
}

#[test]
fn styles_are_concatenated_global_first() {
    let global = json!({ "head": { "styles": ["/a.css"] } });
    let call = json!({ "head": { "styles": ["/b.css"] } });

    let merged = merge_over(&global, Some(&call));
    assert_eq!(merged["head"]["styles"], json!(["/a.css", "/b.css"]));
}

#[tokio::test]
async fn config_helper_output_reaches_the_document_head() {
    let global = config(CreateConfig {
        title: Some("Shop".into()),
        styles: vec!["/a.css".into()],
        ..Default::default()
    });
    let call = config(CreateConfig {
        styles: vec!["/b.css".into()],
        scripts: vec!["/app.js".into()],
        ..Default::default()
    });
    let options = SetupOptions::builder().global_config(global).build().unwrap();
    let engine = ViewEngine::new(options, Arc::new(site_loader()));

    let (_, response) = engine
        .render_http("home", None, RenderOptions::new().config(call))
        .await;
    let html = String::from_utf8(response.into_body()).unwrap();

    assert!(html.contains("<title>Shop</title>"));
    let a = html.find("href=\"/a.css\"").unwrap();
    let b = html.find("href=\"/b.css\"").unwrap();
    assert!(a < b);
    assert!(html.contains("src=\"/app.js\""));
}

#[tokio::test]
async fn missing_view_renders_the_error_view() {
    let engine = ViewEngine::new(SetupOptions::default(), Arc::new(site_loader()));
    let mut sink = HttpResponseSink::new();

    let outcome = engine
        .context()
        .render("missing", None, RenderOptions::new(), &mut sink)
        .await;

    match outcome {
        RenderOutcome::Recovered { error } => assert_eq!(error.kind(), ErrorKind::Resolution),
        other => panic!("expected recovery, got {other:?}"),
    }
    let response = sink.into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(response.into_body()).unwrap();
    assert!(html.contains("data-kind=\"ResolutionFailure\""));
    assert!(html.contains("data-name=\"missing\""));
}

#[tokio::test]
async fn missing_view_without_error_view_calls_the_handler_once() {
    let handler = Arc::new(CountingHandler::default());
    let options = SetupOptions::builder()
        .no_error_view()
        .on_unrecoverable_error(handler.clone())
        .build()
        .unwrap();
    let engine = ViewEngine::new(options, Arc::new(site_loader()));
    let (mut sink, mut rx) = ChannelSink::new(16);

    let outcome = engine
        .context()
        .render("missing", Some(json!({})), RenderOptions::new(), &mut sink)
        .await;
    drop(sink);

    assert!(matches!(outcome, RenderOutcome::Unrecoverable { .. }));
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert!(!events.iter().any(|e| matches!(
        e,
        SinkEvent::Header(name, value) if *name == CONTENT_TYPE && value == "text/html; charset=utf-8"
    )));
    assert_eq!(events.iter().filter(|e| **e == SinkEvent::End).count(), 1);
    assert_eq!(events.last(), Some(&SinkEvent::End));
}

#[tokio::test]
async fn default_handler_keeps_its_content_type_on_a_small_channel() {
    let options = SetupOptions::builder().no_error_view().build().unwrap();
    let engine = ViewEngine::new(options, Arc::new(site_loader()));
    let (mut sink, rx) = ChannelSink::new(1);
    let events = tokio::spawn(ChannelSink::into_stream(rx).collect::<Vec<_>>());

    let outcome = engine
        .context()
        .render("missing", None, RenderOptions::new(), &mut sink)
        .await;
    drop(sink);

    assert!(matches!(outcome, RenderOutcome::Unrecoverable { .. }));
    assert_eq!(
        events.await.unwrap(),
        vec![
            SinkEvent::Status(StatusCode::INTERNAL_SERVER_ERROR),
            SinkEvent::Header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
            SinkEvent::Data(b"An error occurred".to_vec()),
            SinkEvent::End,
        ]
    );
}

#[tokio::test]
async fn missing_named_template_is_never_replaced_by_the_built_in_one() {
    let engine = ViewEngine::new(SetupOptions::default(), Arc::new(site_loader()));
    let mut sink = HttpResponseSink::new();

    let outcome = engine
        .context()
        .render("home", None, RenderOptions::new().template("custom"), &mut sink)
        .await;

    let Some(RenderError::Resolution { name, .. }) = outcome.error() else {
        panic!("expected a template resolution failure, got {outcome:?}");
    };
    assert_eq!(name, "custom");
    let html = body(sink);
    assert!(!html.contains("Welcome"));
    assert!(html.contains("class=\"error\""));
}

#[tokio::test]
async fn failing_error_view_is_resolved_only_once() {
    let handler = Arc::new(CountingHandler::default());
    let loader = Arc::new(CountingLoader::new(site_loader()));
    let options = SetupOptions::builder()
        .error_view("throws")
        .on_unrecoverable_error(handler.clone())
        .build()
        .unwrap();
    let engine = ViewEngine::new(options, loader.clone());
    let mut sink = HttpResponseSink::new();

    let outcome = engine
        .context()
        .render("throws", None, RenderOptions::new(), &mut sink)
        .await;

    assert!(matches!(outcome, RenderOutcome::Unrecoverable { .. }));
    assert_eq!(loader.count("views/throws.tsx"), 1);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*handler.last_kind.lock().unwrap(), Some(ErrorKind::Composition));

    assert!(sink.is_ended());
    let response = sink.into_response();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body().as_slice(), b"unavailable");
}

#[tokio::test]
async fn error_view_reached_through_an_alias_is_resolved_only_once() {
    let handler = Arc::new(CountingHandler::default());
    let loader = Arc::new(CountingLoader::new(site_loader()));
    let options = SetupOptions::builder()
        .error_view("throws")
        .on_unrecoverable_error(handler.clone())
        .build()
        .unwrap();
    let engine = ViewEngine::new(options, loader.clone());
    let mut sink = HttpResponseSink::new();

    let outcome = engine
        .context()
        .render("./throws", None, RenderOptions::new(), &mut sink)
        .await;

    let Some(error) = outcome.error() else {
        panic!("expected a failure, got {outcome:?}");
    };
    assert_eq!(error.kind(), ErrorKind::Composition);
    assert_eq!(loader.count("views/throws.tsx"), 1);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn error_view_failure_reports_both_errors() {
    let handler = Arc::new(CountingHandler::default());
    let options = SetupOptions::builder()
        .error_view("throws")
        .on_unrecoverable_error(handler.clone())
        .build()
        .unwrap();
    let engine = ViewEngine::new(options, Arc::new(site_loader()));
    let mut sink = HttpResponseSink::new();

    let outcome = engine
        .context()
        .render("missing", None, RenderOptions::new(), &mut sink)
        .await;

    let Some(error) = outcome.error() else {
        panic!("expected a failure, got {outcome:?}");
    };
    assert_eq!(error.kind(), ErrorKind::Recovery);
    assert_eq!(error.original().kind(), ErrorKind::Resolution);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn closed_client_gets_no_handler_call() {
    let handler = Arc::new(CountingHandler::default());
    let options = SetupOptions::builder()
        .no_error_view()
        .on_unrecoverable_error(handler.clone())
        .build()
        .unwrap();
    let engine = ViewEngine::new(options, Arc::new(site_loader()));
    let (mut sink, rx) = ChannelSink::new(4);
    drop(rx);

    let outcome = engine
        .context()
        .render("missing", None, RenderOptions::new(), &mut sink)
        .await;

    assert!(matches!(outcome, RenderOutcome::Aborted));
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_requests_do_not_share_state() {
    let engine = ViewEngine::new(SetupOptions::default(), Arc::new(site_loader()));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let (_, response) = engine
                    .render_http("home", Some(json!({ "user": format!("u{i}") })), RenderOptions::new())
                    .await;
                (i, String::from_utf8(response.into_body()).unwrap())
            })
        })
        .collect();

    for task in tasks {
        let (i, html) = task.await.unwrap();
        assert!(html.contains(&format!("Welcome u{i}<")));
    }
}

#[tokio::test]
async fn static_markup_files_serve_as_views() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("views")).unwrap();
    std::fs::write(dir.path().join("views/about.html"), "<h1>About</h1>").unwrap();

    let options = SetupOptions::builder()
        .root_dir(dir.path())
        .extension("html")
        .build()
        .unwrap();
    let engine = ViewEngine::new(options, Arc::new(StaticFileLoader::new()));

    let (outcome, response) = engine.render_http("about", None, RenderOptions::new()).await;
    assert!(matches!(outcome, RenderOutcome::Rendered));
    assert!(String::from_utf8(response.into_body())
        .unwrap()
        .contains("<body><h1>About</h1></body>"));
}
