use std::fmt::Write;

use anyhow::{bail, Result};

use crate::engine::component::{Element, Node};
use crate::render::backend::MarkupRenderer;

const DOCTYPE: &str = "<!DOCTYPE html>";

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Static markup backend: serializes the tree to HTML without any client-side
/// hydration hooks, prefixed with the HTML5 doctype.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticMarkup;

impl StaticMarkup {
    pub fn new() -> Self {
        Self
    }
}

impl MarkupRenderer for StaticMarkup {
    fn name(&self) -> &str {
        "StaticMarkup"
    }

    fn render_to_markup(&self, tree: &Node) -> Result<String> {
        let mut out = String::from(DOCTYPE);
        write_node(&mut out, tree)?;
        Ok(out)
    }
}

fn write_node(out: &mut String, node: &Node) -> Result<()> {
    match node {
        Node::Element(el) => write_element(out, el)?,
        Node::Text(text) => escape_into(out, text, false),
        Node::Raw(markup) => out.push_str(markup),
        Node::Fragment(children) => {
            for child in children {
                write_node(out, child)?;
            }
        }
    }
    Ok(())
}

fn write_element(out: &mut String, el: &Element) -> Result<()> {
    if !is_valid_name(&el.tag) {
        bail!("invalid tag name '{}'", el.tag);
    }

    out.push('<');
    out.push_str(&el.tag);
    for attr in &el.attrs {
        if !is_valid_name(&attr.name) {
            bail!("invalid attribute name '{}' on <{}>", attr.name, el.tag);
        }
        out.push(' ');
        out.push_str(&attr.name);
        if let Some(value) = &attr.value {
            out.push_str("=\"");
            escape_into(out, value, true);
            out.push('"');
        }
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&el.tag.as_str()) {
        if !el.children.is_empty() {
            bail!("void element <{}> cannot have children", el.tag);
        }
        return Ok(());
    }

    for child in &el.children {
        write_node(out, child)?;
    }
    write!(out, "</{}>", el.tag)?;
    Ok(())
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\'' if attribute => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
}
