//! Layout selection.
//!
//! Every render call picks at most one layout. The per-call override is
//! consulted first, then the global default:
//!
//! | call override     | global default | result                   |
//! |-------------------|----------------|--------------------------|
//! | `Disabled`        | anything       | [`SelectedTemplate::None`] |
//! | `Named(n)`        | anything       | `Named(n)`               |
//! | `Inherit`         | `Named(g)`     | `Named(g)`               |
//! | `Inherit`         | `Disabled`     | `None`                   |
//! | `Inherit`         | `BuiltIn`      | `BuiltIn`                |
//!
//! A named layout that fails to resolve is fatal for the render attempt and
//! is never replaced by the built-in one. The global default is not looked at
//! (or validated) when the call names its own layout.

/// Built-in document layout.
pub mod base;

pub use base::BaseTemplate;

/// Global layout choice made at mount time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DefaultTemplate {
    /// Wrap views in the built-in layout.
    #[default]
    BuiltIn,
    /// Wrap views in the named layout from the template root.
    Named(String),
    /// Render views standalone unless a call names a layout.
    Disabled,
}

/// Per-call layout override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateOverride {
    /// Use the global default.
    #[default]
    Inherit,
    Named(String),
    /// Render this view standalone.
    Disabled,
}

impl From<&str> for TemplateOverride {
    fn from(name: &str) -> Self {
        TemplateOverride::Named(name.to_string())
    }
}

impl From<String> for TemplateOverride {
    fn from(name: String) -> Self {
        TemplateOverride::Named(name)
    }
}

/// Outcome of layout selection for one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedTemplate {
    None,
    BuiltIn,
    Named(String),
}

pub fn select(call: &TemplateOverride, global: &DefaultTemplate) -> SelectedTemplate {
    match (call, global) {
        (TemplateOverride::Disabled, _) => SelectedTemplate::None,
        (TemplateOverride::Named(name), _) => SelectedTemplate::Named(name.clone()),
        (TemplateOverride::Inherit, DefaultTemplate::Named(name)) => SelectedTemplate::Named(name.clone()),
        (TemplateOverride::Inherit, DefaultTemplate::Disabled) => SelectedTemplate::None,
        (TemplateOverride::Inherit, DefaultTemplate::BuiltIn) => SelectedTemplate::BuiltIn,
    }
}
