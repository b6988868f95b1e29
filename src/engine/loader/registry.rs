use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::engine::component::{Component, ComponentHandle};
use crate::engine::loader::ComponentLoader;

/// Ahead-of-time registered components, keyed by the path the resolver builds.
///
/// Registrations may change while the engine is serving (e.g. a dev server
/// swapping a recompiled component); lookups always see the current table.
#[derive(Default)]
pub struct RegistryLoader {
    components: RwLock<HashMap<PathBuf, ComponentHandle>>,
}

impl RegistryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the component at `path`.
    pub fn register<C>(&self, path: impl Into<PathBuf>, component: C)
    where
        C: Component + 'static,
    {
        self.register_handle(path, Arc::new(component));
    }

    pub fn register_handle(&self, path: impl Into<PathBuf>, component: ComponentHandle) {
        self.components
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.into(), component);
    }

    /// Removes the component at `path`, returning whether one was registered.
    pub fn unregister(&self, path: impl AsRef<Path>) -> bool {
        self.components
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(path.as_ref())
            .is_some()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.components
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.components
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RegistryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryLoader")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ComponentLoader for RegistryLoader {
    async fn load(&self, path: &Path) -> Result<ComponentHandle> {
        let guard = self
            .components
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no component registered at '{}'", path.display()))
    }
}
