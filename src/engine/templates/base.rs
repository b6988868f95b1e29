use anyhow::Context;
use serde_json::Value;

use crate::engine::component::{Component, Element, Node, Props};
use crate::engine::head::{Config, Head, Link, Meta, Script};

const DEFAULT_TITLE: &str = "Default";
const DEFAULT_SCRIPT_TYPE: &str = "text/javascript";

/// The library-provided layout: a complete HTML document whose `<head>` is
/// built from `config.head` and whose `<body>` holds the composed view.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseTemplate;

impl Component for BaseTemplate {
    fn render(&self, props: &Props) -> anyhow::Result<Node> {
        let config: Config = match props.get("config") {
            None | Some(Value::Null) => Config::default(),
            Some(value) => serde_json::from_value(value.clone())
                .context("layout config does not match the document config shape")?,
        };

        let body = Element::new("body")
            .attrs_from(&config.body_attrs)
            .children(props.children.clone());

        Ok(Element::new("html")
            .attrs_from(&config.html_attrs)
            .child(head(config.head.as_ref()))
            .child(body)
            .into())
    }
}

fn head(head: Option<&Head>) -> Element {
    let title = head
        .and_then(|h| h.title.as_deref())
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE);

    let mut el = Element::new("head").child(Element::new("title").child(Node::text(title)));

    let Some(head) = head else {
        return el;
    };

    el = el.children(head.metas.iter().map(|m| Node::from(meta(m))));
    el = el.children(head.links.iter().map(|l| Node::from(link(l))));
    el.children(head.scripts.iter().filter_map(script).map(Node::from))
}

fn meta(m: &Meta) -> Element {
    Element::new("meta")
        .attr_opt("name", m.name.as_deref())
        .attr_opt("content", m.content.as_deref())
        .attr_opt("charset", m.charset.as_deref())
        .attr_opt("http-equiv", m.http_equiv.as_deref())
        .attr_opt("property", m.property.as_deref())
        .attrs_from(&m.extra)
}

fn link(l: &Link) -> Element {
    Element::new("link")
        .attr("rel", l.rel.as_str())
        .attr("href", l.href.as_str())
        .attr_opt("type", l.mime_type.as_deref())
}

/// External scripts use `src`, inline ones embed `srcContents` verbatim.
/// Entries with neither are dropped.
fn script(s: &Script) -> Option<Element> {
    let mut el = Element::new("script");
    let inline = match (&s.src, &s.src_contents) {
        (Some(src), _) => {
            el = el.attr("src", src.as_str());
            None
        }
        (None, Some(contents)) => Some(contents),
        (None, None) => return None,
    };

    el = el
        .attr("type", s.mime_type.as_deref().unwrap_or(DEFAULT_SCRIPT_TYPE))
        .attr_opt("charset", s.charset.as_deref());
    if s.is_async {
        el = el.flag("async");
    }
    if s.defer {
        el = el.flag("defer");
    }
    if let Some(contents) = inline {
        el = el.child(Node::raw(contents.as_str()));
    }
    Some(el)
}
