//! Mount-time setup options.
//!
//! `SetupOptions` is created once when the view engine is mounted and is
//! read-only afterwards; every in-flight request reads it concurrently.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use extsx::SetupOptions;
//! let opts = SetupOptions::default();
//! assert_eq!(opts.extension, "tsx");
//! assert_eq!(opts.error_view.as_deref(), Some("error"));
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use extsx::{SetupOptions, DefaultTemplate};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let opts = SetupOptions::builder()
//!     .view_path("app/views")
//!     .default_template("main")
//!     .no_error_view()
//!     .extension("jsx")
//!     .build()?;
//! assert_eq!(opts.default_template, DefaultTemplate::Named("main".into()));
//! # Ok(()) }
//! ```
//!
//! ## Load from a JSON file
//! Keys follow the camelCase names used by the mount call:
//! `rootDir`, `viewPath`, `templatePath`, `publicPath`, `errorView`, `template`,
//! `language`, `globalConfig`, `globalData`. `publicPath`, `errorView` and
//! `template` also accept `false`.
//!
//! # Fields (summary)
//! - `root_dir`: Directory the other paths are joined to (default: empty, i.e. the working directory).
//! - `view_path`: Root directory for view lookups (default: `views`).
//! - `template_path`: Root directory for template lookups (default: `templates`).
//! - `public_path`: Static asset root, `None` disables it (default: `public`).
//! - `error_view`: Fallback view name, `None` disables recovery (default: `error`).
//! - `default_template`: Global layout choice (default: the built-in layout).
//! - `extension`: Suffix appended to component paths (default: `tsx`).
//! - `global_config`, `global_data`: Base merge layers (default: `{}`).
//! - `on_unrecoverable_error`: Terminal handler (default: [`LogAndRespond`]).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::engine::errors::ConfigError;
use crate::engine::handler::{LogAndRespond, UnrecoverableErrorHandler};
use crate::engine::resolver::check_name;
use crate::engine::templates::DefaultTemplate;

pub const DEFAULT_VIEW_PATH: &str = "views";
pub const DEFAULT_TEMPLATE_PATH: &str = "templates";
pub const DEFAULT_PUBLIC_PATH: &str = "public";
pub const DEFAULT_ERROR_VIEW: &str = "error";
pub const DEFAULT_EXTENSION: &str = "tsx";

#[derive(Clone)]
pub struct SetupOptions {
    pub root_dir: PathBuf,
    pub view_path: PathBuf,
    pub template_path: PathBuf,
    pub public_path: Option<PathBuf>,
    pub error_view: Option<String>,
    pub default_template: DefaultTemplate,
    pub extension: String,
    pub global_config: Value,
    pub global_data: Value,
    pub on_unrecoverable_error: Arc<dyn UnrecoverableErrorHandler>,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::new(),
            view_path: PathBuf::from(DEFAULT_VIEW_PATH),
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            public_path: Some(PathBuf::from(DEFAULT_PUBLIC_PATH)),
            error_view: Some(DEFAULT_ERROR_VIEW.to_string()),
            default_template: DefaultTemplate::BuiltIn,
            extension: DEFAULT_EXTENSION.to_string(),
            global_config: Value::Object(Map::new()),
            global_data: Value::Object(Map::new()),
            on_unrecoverable_error: Arc::new(LogAndRespond::default()),
        }
    }
}

impl fmt::Debug for SetupOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupOptions")
            .field("root_dir", &self.root_dir)
            .field("view_path", &self.view_path)
            .field("template_path", &self.template_path)
            .field("public_path", &self.public_path)
            .field("error_view", &self.error_view)
            .field("default_template", &self.default_template)
            .field("extension", &self.extension)
            .field("global_config", &self.global_config)
            .field("global_data", &self.global_data)
            .field("on_unrecoverable_error", &"Arc<dyn UnrecoverableErrorHandler>")
            .finish()
    }
}

impl SetupOptions {
    pub fn builder() -> SetupOptionsBuilder {
        SetupOptionsBuilder::default()
    }

    /// Reads options from a JSON file; unspecified keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<SetupOptions, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::builder().json(&contents)?.build()
    }

    /// Root directory for views, joined to `root_dir`.
    pub fn view_root(&self) -> PathBuf {
        self.root_dir.join(&self.view_path)
    }

    /// Root directory for templates, joined to `root_dir`.
    pub fn template_root(&self) -> PathBuf {
        self.root_dir.join(&self.template_path)
    }

    /// Static asset directory for the host to serve, if enabled.
    pub fn public_dir(&self) -> Option<PathBuf> {
        self.public_path.as_ref().map(|p| self.root_dir.join(p))
    }
}

/// Builder for [`SetupOptions`], mirroring the mount call's option object.
#[derive(Debug, Clone, Default)]
pub struct SetupOptionsBuilder {
    inner: SetupOptions,
}

impl SetupOptionsBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut SetupOptions)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn root_dir<P: Into<PathBuf>>(self, p: P) -> Self { self.map(|c| c.root_dir = p.into()) }
    pub fn view_path<P: Into<PathBuf>>(self, p: P) -> Self { self.map(|c| c.view_path = p.into()) }
    pub fn template_path<P: Into<PathBuf>>(self, p: P) -> Self { self.map(|c| c.template_path = p.into()) }
    pub fn public_path<P: Into<PathBuf>>(self, p: P) -> Self { self.map(|c| c.public_path = Some(p.into())) }
    pub fn no_public_path(self) -> Self { self.map(|c| c.public_path = None) }
    pub fn error_view<S: Into<String>>(self, name: S) -> Self { self.map(|c| c.error_view = Some(name.into())) }
    pub fn no_error_view(self) -> Self { self.map(|c| c.error_view = None) }
    pub fn default_template<S: Into<String>>(self, name: S) -> Self { self.map(|c| c.default_template = DefaultTemplate::Named(name.into())) }
    pub fn no_default_template(self) -> Self { self.map(|c| c.default_template = DefaultTemplate::Disabled) }
    pub fn builtin_template(self) -> Self { self.map(|c| c.default_template = DefaultTemplate::BuiltIn) }
    pub fn extension<S: Into<String>>(self, ext: S) -> Self { self.map(|c| c.extension = ext.into()) }
    pub fn global_config<V: Into<Value>>(self, v: V) -> Self { self.map(|c| c.global_config = v.into()) }
    pub fn global_data<V: Into<Value>>(self, v: V) -> Self { self.map(|c| c.global_data = v.into()) }

    pub fn on_unrecoverable_error(self, handler: Arc<dyn UnrecoverableErrorHandler>) -> Self {
        self.map(|c| c.on_unrecoverable_error = handler)
    }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut SetupOptions)) -> Self { self.map(f) }

    /// Applies the keys present in a JSON options document.
    pub fn json(self, contents: &str) -> Result<Self, ConfigError> {
        let file: OptionsFile = serde_json::from_str(contents)?;
        file.apply(self)
    }

    /// Validate and build the final options.
    pub fn build(self) -> Result<SetupOptions, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- JSON options ----------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NameOrFalse {
    Name(String),
    Flag(bool),
}

impl NameOrFalse {
    /// `Some(name)` for a name, `None` for `false`.
    fn into_name(self, field: &'static str) -> Result<Option<String>, ConfigError> {
        match self {
            NameOrFalse::Name(name) => Ok(Some(name)),
            NameOrFalse::Flag(false) => Ok(None),
            NameOrFalse::Flag(true) => Err(ConfigError::TrueNotAllowed(field)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct OptionsFile {
    root_dir: Option<PathBuf>,
    view_path: Option<PathBuf>,
    template_path: Option<PathBuf>,
    public_path: Option<NameOrFalse>,
    error_view: Option<NameOrFalse>,
    template: Option<NameOrFalse>,
    language: Option<String>,
    global_config: Option<Value>,
    global_data: Option<Value>,
}

impl OptionsFile {
    fn apply(self, mut b: SetupOptionsBuilder) -> Result<SetupOptionsBuilder, ConfigError> {
        if let Some(p) = self.root_dir {
            b = b.root_dir(p);
        }
        if let Some(p) = self.view_path {
            b = b.view_path(p);
        }
        if let Some(p) = self.template_path {
            b = b.template_path(p);
        }
        if let Some(p) = self.public_path {
            b = match p.into_name("publicPath")? {
                Some(p) => b.public_path(p),
                None => b.no_public_path(),
            };
        }
        if let Some(v) = self.error_view {
            b = match v.into_name("errorView")? {
                Some(name) => b.error_view(name),
                None => b.no_error_view(),
            };
        }
        if let Some(t) = self.template {
            b = match t.into_name("template")? {
                Some(name) => b.default_template(name),
                None => b.no_default_template(),
            };
        }
        if let Some(ext) = self.language {
            b = b.extension(ext);
        }
        if let Some(v) = self.global_config {
            b = b.global_config(v);
        }
        if let Some(v) = self.global_data {
            b = b.global_data(v);
        }
        Ok(b)
    }
}

// ---------- Validation ----------

fn validate(c: &SetupOptions) -> Result<(), ConfigError> {
    if c.view_path.as_os_str().is_empty() {
        return Err(ConfigError::EmptyPath { field: "view_path" });
    }
    if c.template_path.as_os_str().is_empty() {
        return Err(ConfigError::EmptyPath { field: "template_path" });
    }
    if matches!(&c.public_path, Some(p) if p.as_os_str().is_empty()) {
        return Err(ConfigError::EmptyPath { field: "public_path" });
    }
    if c.extension.is_empty()
        || c.extension.starts_with('.')
        || c.extension.contains(['/', '\\'])
    {
        return Err(ConfigError::InvalidExtension(c.extension.clone()));
    }
    if !c.global_config.is_object() {
        return Err(ConfigError::NotAnObject { field: "global_config" });
    }
    if !c.global_data.is_object() {
        return Err(ConfigError::NotAnObject { field: "global_data" });
    }
    if let Some(name) = &c.error_view {
        check_name(name).map_err(|_| ConfigError::InvalidName {
            field: "error view",
            name: name.clone(),
        })?;
    }
    if let DefaultTemplate::Named(name) = &c.default_template {
        check_name(name).map_err(|_| ConfigError::InvalidName {
            field: "template",
            name: name.clone(),
        })?;
    }
    Ok(())
}
