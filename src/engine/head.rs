//! Typed document configuration and the `config()` builder.
//!
//! The render pipeline merges configuration as untyped JSON layers, but callers
//! are expected to build those layers through [`config`], which produces a
//! [`Config`] whose serialized shape is exactly what the built-in layout reads:
//!
//! ```json
//! {
//!   "head": { "title": "...", "metas": [...], "links": [...], "scripts": [...] },
//!   "htmlAttrs": { "lang": "en" },
//!   "bodyAttrs": { "class": "page" }
//! }
//! ```
//!
//! Empty lists and unset fields are skipped during serialization, so a partial
//! config never clobbers or pads the layer it is merged over.
//!
//! # Example
//! ```
//! use extsx::{config, CreateConfig, MetaSpec};
//!
//! let conf = config(CreateConfig {
//!     title: Some("My Page".into()),
//!     styles: vec!["/styles.css".into()],
//!     scripts: vec!["/script.js".into()],
//!     metas: vec![MetaSpec::named("description", "My website")],
//!     fav_icon: Some("/favicon.ico".into()),
//! });
//!
//! let head = conf.head.as_ref().unwrap();
//! assert_eq!(head.links.len(), 2);
//! assert_eq!(head.scripts.len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Head>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub html_attrs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub body_attrs: Map<String, Value>,
}

impl Config {
    /// Serializes the config into a merge layer.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

impl From<Config> for Value {
    fn from(config: Config) -> Self {
        config.to_value()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Head {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metas: Vec<Meta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<Script>,
}

/// A `<meta>` descriptor. Unknown attributes are kept in `extra` and emitted as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_equiv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A `<script>` entry: either external (`src`) or inline (`srcContents`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_contents: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(rename = "async", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_async: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub defer: bool,
}

/// Meta descriptor accepted by [`config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaSpec {
    pub name: Option<String>,
    pub content: Option<String>,
}

impl MetaSpec {
    pub fn named(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            content: Some(content.into()),
        }
    }
}

/// Input of [`config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfig {
    pub title: Option<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub scripts: Vec<String>,
    #[serde(default)]
    pub metas: Vec<MetaSpec>,
    pub fav_icon: Option<String>,
}

/// Builds a [`Config`] fragment: one stylesheet link per style, one icon link
/// when `fav_icon` is given, one external script per script path and one meta
/// per meta descriptor.
pub fn config(input: CreateConfig) -> Config {
    let mut links: Vec<Link> = input
        .styles
        .into_iter()
        .map(|href| Link {
            rel: "stylesheet".into(),
            href,
            mime_type: Some("text/css".into()),
        })
        .collect();

    if let Some(href) = input.fav_icon {
        links.push(Link {
            rel: "icon".into(),
            href,
            mime_type: None,
        });
    }

    let scripts = input
        .scripts
        .into_iter()
        .map(|src| Script {
            src: Some(src),
            ..Default::default()
        })
        .collect();

    let metas = input
        .metas
        .into_iter()
        .map(|m| Meta {
            name: m.name,
            content: m.content,
            ..Default::default()
        })
        .collect();

    Config {
        head: Some(Head {
            title: input.title,
            metas,
            links,
            scripts,
        }),
        ..Default::default()
    }
}
