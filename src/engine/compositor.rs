use std::panic::{self, AssertUnwindSafe};

use serde_json::{Map, Value};

use crate::engine::component::{Component, Node, Props, RenderableUnit};
use crate::engine::errors::{panic_message, RenderError};
use crate::engine::templates::BaseTemplate;

/// Layout that wraps the view, after resolution.
#[derive(Debug, Clone)]
pub enum ResolvedTemplate {
    /// The view is rendered standalone.
    None,
    BuiltIn,
    Unit(RenderableUnit),
}

/// Assembles the final component tree.
///
/// Without a layout the tree is the view instantiated with `data`. With one,
/// the layout is instantiated with `{ "config": config }` and the instantiated
/// view as its children. Errors and panics raised by either component come
/// back as [`RenderError::Composition`].
pub fn compose(
    view: &RenderableUnit,
    data: Value,
    template: &ResolvedTemplate,
    config: Value,
) -> Result<Node, RenderError> {
    let view_node = instantiate(view.component(), &Props::new(data), view.name())?;

    let layout = match template {
        ResolvedTemplate::None => return Ok(view_node),
        ResolvedTemplate::BuiltIn => None,
        ResolvedTemplate::Unit(unit) => Some(unit),
    };

    let values = Value::Object(Map::from_iter([("config".to_string(), config)]));
    let props = Props::with_children(values, view_node);
    match layout {
        None => instantiate(&BaseTemplate, &props, "built-in template"),
        Some(unit) => instantiate(unit.component(), &props, unit.name()),
    }
}

fn instantiate(component: &dyn Component, props: &Props, name: &str) -> Result<Node, RenderError> {
    match panic::catch_unwind(AssertUnwindSafe(|| component.render(props))) {
        Ok(Ok(node)) => Ok(node),
        Ok(Err(e)) => Err(RenderError::Composition(format!("'{name}' failed: {e:#}"))),
        Err(payload) => Err(RenderError::Composition(format!(
            "'{name}' panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}
