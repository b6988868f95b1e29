use std::any::Any;
use std::fmt;
use std::path::PathBuf;

use serde_json::{json, Value};

/// What kind of unit a resolution was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    View,
    Template,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::View => write!(f, "View"),
            UnitKind::Template => write!(f, "Template"),
        }
    }
}

/// Coarse classification of a [`RenderError`], stable across messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Resolution,
    Composition,
    Render,
    Recovery,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Resolution => "ResolutionFailure",
            ErrorKind::Composition => "CompositionFailure",
            ErrorKind::Render => "RenderFailure",
            ErrorKind::Recovery => "RecoveryFailure",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    #[error("{kind} '{name}' not found in '{}': {reason}", root.display())]
    Resolution {
        kind: UnitKind,
        name: String,
        root: PathBuf,
        reason: String,
    },

    #[error("Composition error: {0}")]
    Composition(String),

    #[error("Renderer error: {0}")]
    Render(String),

    #[error("Error view failed while handling '{original}': {cause}")]
    Recovery {
        original: Box<RenderError>,
        cause: Box<RenderError>,
    },
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::Resolution { .. } => ErrorKind::Resolution,
            RenderError::Composition(_) => ErrorKind::Composition,
            RenderError::Render(_) => ErrorKind::Render,
            RenderError::Recovery { .. } => ErrorKind::Recovery,
        }
    }

    /// The error that started the failure chain. For anything but
    /// [`RenderError::Recovery`] this is `self`.
    pub fn original(&self) -> &RenderError {
        match self {
            RenderError::Recovery { original, .. } => original.original(),
            other => other,
        }
    }

    /// JSON form of the error, as handed to the error view under the `error` key.
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "kind": self.kind().as_str(),
            "message": self.to_string(),
        });

        if let RenderError::Resolution { kind, name, root, .. } = self {
            value["unit"] = json!(kind.to_string());
            value["name"] = json!(name);
            value["root"] = json!(root.display().to_string());
        }

        value
    }
}

/// Errors raised while building or loading [`SetupOptions`](crate::SetupOptions).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    EmptyPath { field: &'static str },

    #[error("invalid component extension '{0}' (expected e.g. \"tsx\", without a leading dot)")]
    InvalidExtension(String),

    #[error("invalid {field} name '{name}'")]
    InvalidName { field: &'static str, name: String },

    #[error("{field} must be a JSON object")]
    NotAnObject { field: &'static str },

    #[error("option '{0}' accepts a name or false, not true")]
    TrueNotAllowed(&'static str),

    #[error("cannot read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse options: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
