//! Server-side view engine.
//!
//! Maps logical view names to component units on disk, wraps them in a
//! layout, merges global and per-call config and data, renders the tree to a
//! complete HTML document and streams it to the host's response.
//!
//! # Concepts
//!
//! - **Views** live under `view_path`, **templates** (layouts) under
//!   `template_path`. A logical name `admin/users` maps to
//!   `<root>/admin/users.<extension>`.
//! - A [`ComponentLoader`] turns such a path into a [`Component`]. Use
//!   [`RegistryLoader`] for components compiled into the host and
//!   [`StaticFileLoader`] for pre-rendered markup files.
//! - Layouts receive `{ "config": ... }` and the view as children. The built-in
//!   [`BaseTemplate`] turns the config into `<html>`, `<head>` and `<body>`.
//! - Global config and data are merged deeply with per-call layers; arrays are
//!   concatenated, global entries first.
//! - On failure, the error view is rendered in place of the requested view.
//!   If that fails too, the [`UnrecoverableErrorHandler`] answers the request.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use extsx::{Element, HttpResponseSink, Node, Props, RegistryLoader, RenderOptions, SetupOptions, ViewEngine};
//!
//! # async fn run() -> Result<(), extsx::ConfigError> {
//! let loader = RegistryLoader::new();
//! loader.register("views/home.tsx", |props: &Props| -> anyhow::Result<Node> {
//!     Ok(Element::new("h1").child(Node::text(props.str("title").unwrap_or("Home"))).into())
//! });
//!
//! let options = SetupOptions::builder()
//!     .global_config(json!({ "head": { "title": "My site" } }))
//!     .build()?;
//! let engine = ViewEngine::new(options, Arc::new(loader));
//!
//! let mut sink = HttpResponseSink::new();
//! engine
//!     .context()
//!     .render("home", Some(json!({ "title": "Welcome" })), RenderOptions::new(), &mut sink)
//!     .await;
//! let response = sink.into_response();
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

/// Component model: nodes, props and renderable units.
pub mod component;
/// Assembles the view and its layout into one tree.
pub mod compositor;
/// Mount-time options and their builder.
pub mod config;
/// Per-request render context and outcomes.
pub mod context;
pub mod errors;
/// Terminal error handling.
pub mod handler;
/// Document head configuration and the `config()` helper.
pub mod head;
/// Component loaders.
pub mod loader;
/// Deep merge of config and data layers.
pub mod merge;
/// The render pipeline and the mounted engine.
pub mod pipeline;
/// Logical name resolution.
pub mod resolver;
/// Response sinks.
pub mod sink;
/// Chunked delivery to sinks.
pub mod streamer;
/// Layout selection and the built-in layout.
pub mod templates;

pub use component::{Attr, Component, ComponentHandle, Element, Node, Props, RenderableUnit};
pub use compositor::{compose, ResolvedTemplate};
pub use config::{SetupOptions, SetupOptionsBuilder};
pub use context::{RenderContext, RenderOutcome, RequestId};
pub use errors::{ConfigError, ErrorKind, RenderError, UnitKind};
pub use handler::{LogAndRespond, UnrecoverableErrorHandler};
pub use head::{config, Config, CreateConfig, Head, Link, Meta, MetaSpec, Script};
pub use loader::{ComponentLoader, RegistryLoader, StaticFileLoader};
pub use merge::{merge, merge_into, merge_over};
pub use pipeline::{RenderOptions, RenderResult, RenderStage, ViewEngine};
pub use resolver::ComponentResolver;
pub use sink::{ChannelSink, HttpResponseSink, ResponseSink, SinkEvent};
pub use streamer::{Delivery, Streamer, DEFAULT_CHUNK_SIZE};
pub use templates::{BaseTemplate, DefaultTemplate, SelectedTemplate, TemplateOverride};
