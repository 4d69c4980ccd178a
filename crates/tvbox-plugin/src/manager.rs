//! Plugin manager: the single entry point for discovery, launch and
//! install/uninstall.
//!
//! Every mutating operation holds one lock over the identity map, the pool
//! and the active slot for its whole duration, including filesystem and
//! code-loading work. After each mutation an immutable [`ManagerSnapshot`]
//! is published; read accessors only look at the latest snapshot.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task;
use tracing::{debug, error, info, warn};

use tvbox_core::config::AppConfig;
use tvbox_core::error::AppError;

use crate::api::context::{ContextBuilder, NetworkCapabilities};
use crate::error::{PluginError, PluginResult};
use crate::external::{DirectoryRegistry, ExternalRegistry};
use crate::info::{LoadedPlugins, PluginInfo, RejectReason, RejectedEntry};
use crate::loader::PluginLoader;
use crate::loader::code::{BundleCodeLoader, CodeLoader, EntryPointTable};
use crate::metadata::MetadataParser;
use crate::plugin::Plugin;
use crate::pool::PluginPool;
use crate::store::BundleStore;

/// Read-only view of the manager after its last mutation.
#[derive(Debug, Default)]
pub struct ManagerSnapshot {
    /// Incremented on every published change.
    pub generation: u64,
    /// Plugins found by the last scan, ordered by identity.
    pub plugins: Vec<PluginInfo>,
    /// The active plugin, if one has been launched.
    pub active: Option<Arc<Plugin>>,
    /// Number of loaded instances.
    pub loaded: usize,
}

impl ManagerSnapshot {
    /// Looks up a scanned plugin by identity.
    pub fn plugin(&self, identity: &str) -> Option<&PluginInfo> {
        self.plugins.iter().find(|p| p.package_name == identity)
    }
}

#[derive(Debug, Default)]
struct ManagerState {
    plugins: BTreeMap<String, PluginInfo>,
    pool: PluginPool,
    generation: u64,
}

/// Coordinates the bundle store, metadata parser, loader and pool.
#[derive(Debug)]
pub struct PluginManager {
    store: BundleStore,
    parser: MetadataParser,
    loader: PluginLoader,
    contexts: ContextBuilder,
    external: Option<Arc<dyn ExternalRegistry>>,
    host_identity: String,
    state: Mutex<ManagerState>,
    snapshot: watch::Sender<Arc<ManagerSnapshot>>,
}

/// Builder for [`PluginManager`].
#[derive(Debug)]
pub struct PluginManagerBuilder {
    config: AppConfig,
    builtins: EntryPointTable,
    code_loader: Option<Arc<dyn CodeLoader>>,
    external: Option<Arc<dyn ExternalRegistry>>,
    network: Option<NetworkCapabilities>,
}

impl PluginManagerBuilder {
    /// Starts from the application configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            builtins: EntryPointTable::new(),
            code_loader: None,
            external: None,
            network: None,
        }
    }

    /// Entry points linked into the host, used when a bundle ships no
    /// native code or does not export its entry point.
    pub fn builtins(mut self, builtins: EntryPointTable) -> Self {
        self.builtins = builtins;
        self
    }

    /// Replaces the default bundle code loader.
    pub fn code_loader(mut self, code_loader: Arc<dyn CodeLoader>) -> Self {
        self.code_loader = Some(code_loader);
        self
    }

    /// Replaces the directory-based external registry. Only consulted when
    /// external discovery is enabled.
    pub fn external_registry(mut self, registry: Arc<dyn ExternalRegistry>) -> Self {
        self.external = Some(registry);
        self
    }

    /// Fixes network capabilities instead of probing them.
    pub fn network(mut self, network: NetworkCapabilities) -> Self {
        self.network = Some(network);
        self
    }

    /// Builds the manager.
    pub fn build(self) -> PluginManager {
        let plugins = &self.config.plugins;
        let store = BundleStore::new(&plugins.directory, plugins.suffix.clone());

        let code = self.code_loader.unwrap_or_else(|| {
            Arc::new(BundleCodeLoader::new(store.artifact_dir(), self.builtins))
        });
        let loader = PluginLoader::from_config(code, plugins);

        let mut contexts = ContextBuilder::from_config(&self.config);
        if let Some(network) = self.network {
            contexts = contexts.with_network(network);
        }

        let external = if plugins.external_discovery_enabled(self.config.host.debug) {
            let registry = self
                .external
                .unwrap_or_else(|| Arc::new(DirectoryRegistry::from_config(plugins)));
            Some(registry)
        } else {
            None
        };

        let (snapshot, _) = watch::channel(Arc::new(ManagerSnapshot::default()));

        info!(
            directory = %store.root().display(),
            host = %self.config.host.identity,
            external_discovery = external.is_some(),
            "Plugin manager created"
        );

        PluginManager {
            store,
            parser: MetadataParser::new(),
            loader,
            contexts,
            external,
            host_identity: self.config.host.identity.clone(),
            state: Mutex::new(ManagerState::default()),
            snapshot,
        }
    }
}

impl PluginManager {
    /// Creates a manager with default collaborators.
    pub fn new(config: &AppConfig) -> Self {
        PluginManagerBuilder::new(config.clone()).build()
    }

    /// Starts a builder.
    pub fn builder(config: AppConfig) -> PluginManagerBuilder {
        PluginManagerBuilder::new(config)
    }

    /// Bundle store backing the managed directory.
    pub fn store(&self) -> &BundleStore {
        &self.store
    }

    /// Identity external bundles must target.
    pub fn host_identity(&self) -> &str {
        &self.host_identity
    }

    /// Whether scans include externally installed bundles.
    pub fn external_discovery_enabled(&self) -> bool {
        self.external.is_some()
    }

    /// Rebuilds the identity map from the plugin directory.
    ///
    /// Per-bundle failures never abort the scan; they are returned in
    /// `invalid_files`. Loaded instances whose bundle is unchanged stay
    /// pooled; all others are dropped, and the active slot is cleared only
    /// if its instance was dropped.
    pub async fn scan(&self) -> PluginResult<LoadedPlugins> {
        let mut state = self.state.lock().await;

        let candidates = self.store.list_candidates().await?;
        let mut invalid_files = candidates.rejected;
        let mut plugins = BTreeMap::new();

        let parser = self.parser;
        let files = candidates.files;
        let parsed = task::spawn_blocking(move || {
            files
                .into_iter()
                .map(|path| {
                    let result = parser.parse(&path);
                    (path, result)
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(join_error)?;

        for (path, result) in parsed {
            match result {
                Ok(info) => insert_last_wins(&mut plugins, info),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping invalid plugin bundle");
                    let reason = match e {
                        PluginError::Metadata { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    invalid_files.push(RejectedEntry {
                        path,
                        reason: RejectReason::InvalidMetadata(reason),
                    });
                }
            }
        }

        if let Some(registry) = &self.external {
            for info in self.discover_external(Arc::clone(registry)).await? {
                insert_last_wins(&mut plugins, info);
            }
        }

        let dropped = state.pool.retain(|plugin| {
            plugins
                .get(&plugin.info().package_name)
                .is_some_and(|info| info.same_build(plugin.info()))
        });
        if dropped > 0 {
            info!(dropped, "Dropped loaded plugins whose bundles changed");
        }

        invalid_files.sort_by(|a, b| a.path.cmp(&b.path));
        let result = LoadedPlugins {
            api_mismatches: plugins.values().filter_map(PluginInfo::api_mismatch).collect(),
            plugins: plugins.values().cloned().collect(),
            invalid_files,
        };
        for mismatch in &result.api_mismatches {
            warn!(
                package = %mismatch.package_name,
                plugin_api = mismatch.plugin_api_version,
                host_api = mismatch.host_api_version,
                "Plugin built against a different API version"
            );
        }

        state.plugins = plugins;
        self.publish(&mut state);

        info!(
            plugins = result.plugins.len(),
            rejected = result.invalid_files.len(),
            loaded = state.pool.len(),
            "Plugin scan complete"
        );
        Ok(result)
    }

    async fn discover_external(
        &self,
        registry: Arc<dyn ExternalRegistry>,
    ) -> PluginResult<Vec<PluginInfo>> {
        let parser = self.parser;
        let host = self.host_identity.clone();

        task::spawn_blocking(move || {
            registry
                .installed_bundles(&host)
                .into_iter()
                .filter_map(|path| match parser.parse_external(&path) {
                    Ok(info) => Some(info),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping invalid external plugin");
                        None
                    }
                })
                .collect()
        })
        .await
        .map_err(join_error)
    }

    /// Makes the plugin `identity` active, loading it if it is not pooled.
    ///
    /// A failed load leaves the pool and the active slot untouched.
    pub async fn launch(&self, identity: &str) -> PluginResult<Arc<Plugin>> {
        let mut state = self.state.lock().await;

        let info = state
            .plugins
            .get(identity)
            .cloned()
            .ok_or_else(|| PluginError::NotFound(identity.to_string()))?;

        let plugin = match state.pool.get(&info.source_path) {
            Some(plugin) => {
                debug!(package = identity, "Reusing loaded plugin");
                plugin
            }
            None => {
                let context = self.contexts.build(&info).map_err(|e| {
                    error!(package = identity, error = %e, "Cannot prepare plugin context");
                    PluginError::load(identity, "failed to prepare plugin context")
                })?;
                let plugin = Arc::new(self.loader.load(info, context).await?);
                state.pool.insert(plugin)
            }
        };

        state.pool.set_active(&plugin.info().source_path);
        self.publish(&mut state);

        info!(package = identity, "Plugin activated");
        Ok(plugin)
    }

    /// Copies a bundle into the managed directory under its own identity.
    ///
    /// The identity map is not updated; call [`scan`](Self::scan) to see
    /// the change.
    pub async fn install(&self, file: &Path) -> PluginResult<PluginInfo> {
        let state = self.state.lock().await;

        let parser = self.parser;
        let source = file.to_path_buf();
        let mut info = task::spawn_blocking(move || parser.parse(&source))
            .await
            .map_err(join_error)??;

        if state
            .plugins
            .get(&info.package_name)
            .is_some_and(|existing| existing.is_external)
        {
            return Err(PluginError::External(info.package_name));
        }

        let target = self.store.install(file, &info.package_name).await?;
        info.source_path = std::path::absolute(&target).unwrap_or(target);
        Ok(info)
    }

    /// Removes the managed bundle of `identity` and its cached artifacts.
    ///
    /// Returns `false` if no bundle was present. External plugins are
    /// refused. The identity map is not updated until the next scan.
    pub async fn uninstall(&self, identity: &str) -> PluginResult<bool> {
        let state = self.state.lock().await;

        let path = match state.plugins.get(identity) {
            Some(info) if info.is_external => {
                return Err(PluginError::External(identity.to_string()));
            }
            Some(info) => info.source_path.clone(),
            None => self.store.bundle_path(identity),
        };

        Ok(self.store.uninstall(&path, identity).await?)
    }

    /// Drops every loaded instance and clears the active slot.
    pub async fn clear_pool(&self) {
        let mut state = self.state.lock().await;
        state.pool.clear();
        self.publish(&mut state);
        info!("Plugin pool cleared");
    }

    /// The active plugin.
    pub fn active(&self) -> PluginResult<Arc<Plugin>> {
        self.snapshot
            .borrow()
            .active
            .clone()
            .ok_or(PluginError::NotInitialized)
    }

    /// Plugins found by the last scan.
    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.snapshot.borrow().plugins.clone()
    }

    /// Metadata of one scanned plugin.
    pub fn plugin(&self, identity: &str) -> Option<PluginInfo> {
        self.snapshot.borrow().plugin(identity).cloned()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<ManagerSnapshot> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Receives a new snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ManagerSnapshot>> {
        self.snapshot.subscribe()
    }

    fn publish(&self, state: &mut ManagerState) {
        state.generation += 1;
        let snapshot = ManagerSnapshot {
            generation: state.generation,
            plugins: state.plugins.values().cloned().collect(),
            active: state.pool.active(),
            loaded: state.pool.len(),
        };
        self.snapshot.send_replace(Arc::new(snapshot));
    }
}

fn insert_last_wins(plugins: &mut BTreeMap<String, PluginInfo>, info: PluginInfo) {
    let identity = info.package_name.clone();
    let path = info.source_path.clone();
    if let Some(previous) = plugins.insert(identity.clone(), info) {
        warn!(
            package = %identity,
            replaced = %previous.source_path.display(),
            by = %path.display(),
            "Duplicate plugin identity"
        );
    }
}

fn join_error(err: task::JoinError) -> PluginError {
    PluginError::Storage(AppError::internal(format!("Background task failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::BundleWriter;
    use crate::testing::NullEntry;

    fn manager(dir: &Path) -> PluginManager {
        let mut config = AppConfig::default();
        config.host.data_dir = dir.join("data").display().to_string();
        config.host.debug = false;
        config.plugins.directory = dir.join("plugins").display().to_string();

        let mut builtins = EntryPointTable::new();
        builtins.register_fn("demo.Entry", |_| Ok(Box::new(NullEntry) as Box<dyn crate::PluginEntry>));

        PluginManager::builder(config)
            .builtins(builtins)
            .network(NetworkCapabilities { ipv6: false })
            .build()
    }

    #[tokio::test]
    async fn test_snapshot_tracks_scan_and_launch() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let mut updates = manager.subscribe();

        std::fs::create_dir_all(dir.path().join("plugins")).unwrap();
        BundleWriter::new("com.example.demo")
            .api_version(3)
            .entry_point("demo.Entry")
            .write_to(&dir.path().join("plugins/demo.tbp"))
            .unwrap();

        manager.scan().await.unwrap();
        assert!(updates.has_changed().unwrap());
        let after_scan = updates.borrow_and_update().generation;
        assert_eq!(manager.plugins().len(), 1);
        assert!(manager.plugin("com.example.demo").is_some());
        assert!(matches!(manager.active(), Err(PluginError::NotInitialized)));

        let plugin = manager.launch("com.example.demo").await.unwrap();
        let snapshot = manager.snapshot();
        assert!(snapshot.generation > after_scan);
        assert_eq!(snapshot.loaded, 1);
        assert!(Arc::ptr_eq(snapshot.active.as_ref().unwrap(), &plugin));

        manager.clear_pool().await;
        assert!(manager.active().is_err());
        assert_eq!(manager.snapshot().loaded, 0);
    }

    #[tokio::test]
    async fn test_unknown_identity() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        manager.scan().await.unwrap();

        let err = manager.launch("com.example.missing").await.unwrap_err();
        assert!(matches!(err, PluginError::NotFound(id) if id == "com.example.missing"));
    }
}
