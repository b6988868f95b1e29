//! Component model: the tree a view or layout produces, and the units that produce it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::engine::errors::UnitKind;

/// A node of a composed component tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Text content, escaped on output.
    Text(String),
    /// Pre-rendered markup, emitted verbatim.
    Raw(String),
    Fragment(Vec<Node>),
}

impl Node {
    pub fn element(tag: impl Into<String>) -> Element {
        Element::new(tag)
    }

    pub fn text(text: impl Into<String>) -> Node {
        Node::Text(text.into())
    }

    pub fn raw(markup: impl Into<String>) -> Node {
        Node::Raw(markup.into())
    }

    /// Depth-first search for an element with the given tag.
    pub fn contains_tag(&self, tag: &str) -> bool {
        match self {
            Node::Element(el) => el.tag == tag || el.children.iter().any(|c| c.contains_tag(tag)),
            Node::Fragment(children) => children.iter().any(|c| c.contains_tag(tag)),
            Node::Text(_) | Node::Raw(_) => false,
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    /// `None` renders a boolean attribute (`<script async>`).
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push(Attr {
            name: name.into(),
            value: Some(value.into()),
        });
        self
    }

    pub fn attr_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.attr(name, v),
            None => self,
        }
    }

    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.attrs.push(Attr {
            name: name.into(),
            value: None,
        });
        self
    }

    /// Adds one attribute per entry of a JSON object. Strings and numbers become
    /// values, `true` becomes a flag, `false`/`null` and nested values are skipped.
    pub fn attrs_from(mut self, map: &Map<String, Value>) -> Self {
        for (name, value) in map {
            self = match value {
                Value::String(s) => self.attr(name.as_str(), s.as_str()),
                Value::Number(n) => self.attr(name.as_str(), n.to_string()),
                Value::Bool(true) => self.flag(name.as_str()),
                _ => self,
            };
        }
        self
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }
}

/// Properties a component is instantiated with.
///
/// Views receive their effective data in `values` and no children. Layouts
/// receive `{ "config": <effective config> }` and the instantiated view as `children`.
#[derive(Debug, Clone, Default)]
pub struct Props {
    pub values: Value,
    pub children: Option<Node>,
}

impl Props {
    pub fn new(values: Value) -> Self {
        Self {
            values,
            children: None,
        }
    }

    pub fn with_children(values: Value, children: Node) -> Self {
        Self {
            values,
            children: Some(children),
        }
    }

    /// Looks up a top-level property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

/// A renderable view or layout.
///
/// Instantiation may fail on malformed props; the error is surfaced as a
/// composition failure and routed to error recovery.
pub trait Component: Send + Sync {
    fn render(&self, props: &Props) -> anyhow::Result<Node>;
}

impl<F> Component for F
where
    F: Fn(&Props) -> anyhow::Result<Node> + Send + Sync,
{
    fn render(&self, props: &Props) -> anyhow::Result<Node> {
        self(props)
    }
}

/// Shared handle to a loaded component.
pub type ComponentHandle = Arc<dyn Component>;

/// A successfully resolved view or template.
#[derive(Clone)]
pub struct RenderableUnit {
    kind: UnitKind,
    name: String,
    path: PathBuf,
    component: ComponentHandle,
}

impl RenderableUnit {
    pub fn new(kind: UnitKind, name: impl Into<String>, path: PathBuf, component: ComponentHandle) -> Self {
        Self {
            kind,
            name: name.into(),
            path,
            component,
        }
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn component(&self) -> &dyn Component {
        self.component.as_ref()
    }
}

impl fmt::Debug for RenderableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderableUnit")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attrs_from_json_object() {
        let attrs = json!({ "lang": "en", "tabindex": 1, "hidden": true, "off": false });
        let el = Element::new("html").attrs_from(attrs.as_object().unwrap());

        assert_eq!(el.attr_value("lang"), Some("en"));
        assert_eq!(el.attr_value("tabindex"), Some("1"));
        assert!(el.attrs.iter().any(|a| a.name == "hidden" && a.value.is_none()));
        assert!(el.attrs.iter().all(|a| a.name != "off"));
    }

    #[test]
    fn closures_are_components() {
        let greet = |props: &Props| -> anyhow::Result<Node> {
            let name = props.str("name").unwrap_or("stranger");
            Ok(Node::element("p").child(Node::text(format!("Hello {name}"))).into())
        };

        let node = greet.render(&Props::new(json!({ "name": "Ann" }))).unwrap();
        assert!(node.contains_tag("p"));
        assert_eq!(
            node,
            Node::Element(Element::new("p").child(Node::text("Hello Ann")))
        );
    }
}
