//! Pool of loaded plugin instances and the active slot.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::plugin::Plugin;

/// Loaded plugins keyed by bundle location, plus the active plugin.
///
/// The pool holds at most one instance per source path, and the active slot
/// only ever names a pooled path. It has no lock of its own; the manager
/// owns it behind its mutex.
#[derive(Debug, Default)]
pub struct PluginPool {
    instances: HashMap<PathBuf, Arc<Plugin>>,
    active: Option<PathBuf>,
}

impl PluginPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the instance loaded from `path`.
    pub fn get(&self, path: &Path) -> Option<Arc<Plugin>> {
        self.instances.get(path).cloned()
    }

    /// Adds an instance, keyed by its source path.
    ///
    /// If an instance for that path already exists it is kept and returned.
    pub fn insert(&mut self, plugin: Arc<Plugin>) -> Arc<Plugin> {
        let path = plugin.info().source_path.clone();
        self.instances
            .entry(path)
            .or_insert_with(|| {
                debug!(package = %plugin.info().package_name, "Plugin pooled");
                plugin
            })
            .clone()
    }

    /// Marks the instance at `path` active. Returns `false` if it is not pooled.
    pub fn set_active(&mut self, path: &Path) -> bool {
        if !self.instances.contains_key(path) {
            return false;
        }
        self.active = Some(path.to_path_buf());
        true
    }

    /// The active instance, if any.
    pub fn active(&self) -> Option<Arc<Plugin>> {
        self.active.as_deref().and_then(|path| self.get(path))
    }

    /// Keeps only the instances `keep` returns true for. Clears the active
    /// slot if its instance was dropped. Returns the number dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Plugin) -> bool,
    {
        let before = self.instances.len();
        self.instances.retain(|_, plugin| keep(plugin));

        if let Some(active) = &self.active {
            if !self.instances.contains_key(active) {
                info!(path = %active.display(), "Active plugin dropped from pool");
                self.active = None;
            }
        }
        before - self.instances.len()
    }

    /// Drops every instance and clears the active slot.
    pub fn clear(&mut self) {
        self.instances.clear();
        self.active = None;
    }

    /// Number of pooled instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_insert_keeps_first_instance() {
        let mut pool = PluginPool::new();
        let path = Path::new("/plugins/a.tbp");

        let first = pool.insert(testing::plugin("com.example.a", path));
        let second = pool.insert(testing::plugin("com.example.a", path));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_active_slot_requires_pooled_instance() {
        let mut pool = PluginPool::new();
        assert!(!pool.set_active(Path::new("/plugins/a.tbp")));
        assert!(pool.active().is_none());

        let a = pool.insert(testing::plugin("com.example.a", Path::new("/plugins/a.tbp")));
        assert!(pool.set_active(Path::new("/plugins/a.tbp")));
        assert!(Arc::ptr_eq(&pool.active().unwrap(), &a));
    }

    #[test]
    fn test_retain_clears_dropped_active() {
        let mut pool = PluginPool::new();
        pool.insert(testing::plugin("com.example.a", Path::new("/plugins/a.tbp")));
        pool.insert(testing::plugin("com.example.b", Path::new("/plugins/b.tbp")));
        pool.set_active(Path::new("/plugins/b.tbp"));

        let dropped = pool.retain(|p| p.info().package_name == "com.example.b");
        assert_eq!(dropped, 1);
        assert!(pool.active().is_some());

        let dropped = pool.retain(|p| p.info().package_name == "com.example.a");
        assert_eq!(dropped, 1);
        assert!(pool.active().is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut pool = PluginPool::new();
        pool.insert(testing::plugin("com.example.a", Path::new("/plugins/a.tbp")));
        pool.set_active(Path::new("/plugins/a.tbp"));

        pool.clear();
        assert!(pool.is_empty());
        assert!(pool.active().is_none());
    }
}
