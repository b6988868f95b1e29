use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::Arc;

use crate::engine::component::RenderableUnit;
use crate::engine::config::SetupOptions;
use crate::engine::errors::{RenderError, UnitKind};
use crate::engine::loader::ComponentLoader;

/// Checks that a logical view/template name stays inside its root: non-empty,
/// relative, and free of `..` components.
pub(crate) fn check_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is empty");
    }
    let path = Path::new(name);
    if path.is_absolute() || name.starts_with(['/', '\\']) {
        return Err("name must be relative to its root");
    }
    for part in path.components() {
        match part {
            PathComponent::Normal(_) | PathComponent::CurDir => {}
            PathComponent::ParentDir => return Err("name must not leave its root"),
            PathComponent::RootDir | PathComponent::Prefix(_) => {
                return Err("name must be relative to its root")
            }
        }
    }
    if normalize_name(name).is_empty() {
        return Err("name is empty");
    }
    Ok(())
}

/// Canonical spelling of a logical name: `.` segments and repeated or
/// trailing separators dropped, `/` between segments.
pub(crate) fn normalize_name(name: &str) -> String {
    Path::new(name)
        .components()
        .filter_map(|part| match part {
            PathComponent::Normal(segment) => segment.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolves logical view and template names to loaded units.
///
/// Paths are `<root>/<name>.<extension>`. Nothing is cached: every call goes to
/// the loader, so a result always reflects the current state of the roots.
#[derive(Clone)]
pub struct ComponentResolver {
    loader: Arc<dyn ComponentLoader>,
    view_root: PathBuf,
    template_root: PathBuf,
    extension: String,
}

impl ComponentResolver {
    pub fn new(options: &SetupOptions, loader: Arc<dyn ComponentLoader>) -> Self {
        Self {
            loader,
            view_root: options.view_root(),
            template_root: options.template_root(),
            extension: options.extension.clone(),
        }
    }

    pub fn root(&self, kind: UnitKind) -> &Path {
        match kind {
            UnitKind::View => &self.view_root,
            UnitKind::Template => &self.template_root,
        }
    }

    pub fn path_for(&self, kind: UnitKind, name: &str) -> PathBuf {
        self.root(kind).join(format!("{}.{}", normalize_name(name), self.extension))
    }

    /// Loads `name` from the root for `kind`. Never panics or leaks a loader
    /// error: every failure comes back as [`RenderError::Resolution`].
    pub async fn resolve(&self, kind: UnitKind, name: &str) -> Result<RenderableUnit, RenderError> {
        let failure = |reason: String| RenderError::Resolution {
            kind,
            name: name.to_string(),
            root: self.root(kind).to_path_buf(),
            reason,
        };

        if let Err(reason) = check_name(name) {
            log::warn!("{kind} name '{name}' rejected: {reason}");
            return Err(failure(reason.to_string()));
        }

        let path = self.path_for(kind, name);
        match self.loader.load(&path).await {
            Ok(component) => {
                log::debug!("{kind} '{name}' loaded from '{}'", path.display());
                Ok(RenderableUnit::new(kind, name, path, component))
            }
            Err(e) => {
                log::warn!("{kind} '{name}' could not be loaded from '{}': {e:#}", path.display());
                Err(failure(format!("{e:#}")))
            }
        }
    }
}

impl std::fmt::Debug for ComponentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentResolver")
            .field("view_root", &self.view_root)
            .field("template_root", &self.template_root)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}
