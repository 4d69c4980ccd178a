//! Plugin loader: turns validated metadata into a running [`Plugin`].

pub mod code;

use std::sync::Arc;
use std::time::Duration;

use tokio::task;
use tracing::{error, info, warn};

use tvbox_core::config::plugin::PluginConfig;

use self::code::CodeLoader;
use crate::api::context::TvBoxContext;
use crate::api::services::PluginEntry;
use crate::error::{PluginError, PluginResult};
use crate::info::PluginInfo;
use crate::plugin::Plugin;

/// Instantiates plugins through a [`CodeLoader`].
#[derive(Debug, Clone)]
pub struct PluginLoader {
    code: Arc<dyn CodeLoader>,
    init_timeout: Duration,
}

impl PluginLoader {
    /// Creates a loader.
    pub fn new(code: Arc<dyn CodeLoader>, init_timeout: Duration) -> Self {
        Self { code, init_timeout }
    }

    /// Creates a loader using the configured init timeout.
    pub fn from_config(code: Arc<dyn CodeLoader>, config: &PluginConfig) -> Self {
        Self::new(code, Duration::from_secs(config.init_timeout_seconds))
    }

    /// Upper bound on a plugin's `on_init`.
    pub fn init_timeout(&self) -> Duration {
        self.init_timeout
    }

    /// Resolves, constructs and initializes the plugin described by `info`.
    ///
    /// Failures are logged with their cause and returned as an opaque
    /// [`PluginError::Load`].
    ///
    /// `on_init` runs on a blocking thread. When it outlives the init
    /// timeout the thread is abandoned, not stopped, and dropping the tokio
    /// runtime waits for it. Hosts should stop their runtime with
    /// [`Runtime::shutdown_timeout`](tokio::runtime::Runtime::shutdown_timeout).
    pub async fn load(&self, info: PluginInfo, context: TvBoxContext) -> PluginResult<Plugin> {
        let package = info.package_name.clone();

        match tokio::fs::metadata(&info.source_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                warn!(package = %package, path = %info.source_path.display(), "Bundle is no longer a regular file");
                return Err(PluginError::load(package, "bundle is not a regular file"));
            }
            Err(e) => {
                warn!(package = %package, path = %info.source_path.display(), error = %e, "Bundle disappeared before launch");
                return Err(PluginError::load(package, "bundle no longer exists"));
            }
        }

        if let Some(mismatch) = info.api_mismatch() {
            warn!(
                package = %package,
                plugin_api = mismatch.plugin_api_version,
                host_api = mismatch.host_api_version,
                "Plugin API version differs from host"
            );
        }

        let entry = self.instantiate(&info, context).await?;
        self.initialize(&package, Arc::clone(&entry)).await?;

        info!(
            package = %package,
            version = %info.version_name,
            entry_point = %info.entry_point,
            "Plugin loaded"
        );
        Ok(Plugin::new(info, entry))
    }

    async fn instantiate(
        &self,
        info: &PluginInfo,
        context: TvBoxContext,
    ) -> PluginResult<Arc<dyn PluginEntry>> {
        let package = info.package_name.clone();
        let code = Arc::clone(&self.code);
        let resolve_info = info.clone();

        let constructed = task::spawn_blocking(move || {
            let factory = code.resolve(&resolve_info).map_err(|e| {
                error!(package = %resolve_info.package_name, entry_point = %resolve_info.entry_point, error = %e, "Entry point resolution failed");
                "failed to resolve entry point"
            })?;
            factory(context).map_err(|e| {
                error!(package = %resolve_info.package_name, error = %e, "Entry point construction failed");
                "failed to instantiate entry point"
            })
        })
        .await;

        match constructed {
            Ok(Ok(entry)) => Ok(Arc::from(entry)),
            Ok(Err(reason)) => Err(PluginError::load(package, reason)),
            Err(e) => {
                error!(package = %package, error = %e, "Entry point construction panicked");
                Err(PluginError::load(package, "failed to instantiate entry point"))
            }
        }
    }

    async fn initialize(&self, package: &str, entry: Arc<dyn PluginEntry>) -> PluginResult<()> {
        let init = task::spawn_blocking(move || entry.on_init());

        match tokio::time::timeout(self.init_timeout, init).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => {
                error!(package, error = %e, "Plugin initialization failed");
                Err(PluginError::load(package, "initialization failed"))
            }
            Ok(Err(e)) => {
                error!(package, error = %e, "Plugin initialization panicked");
                Err(PluginError::load(package, "initialization failed"))
            }
            Err(_) => {
                error!(
                    package,
                    timeout_secs = self.init_timeout.as_secs_f64(),
                    "Plugin initialization timed out; its thread is abandoned"
                );
                Err(PluginError::load(package, "initialization timed out"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::api::context::{ContextBuilder, NetworkCapabilities, ScreenGeometry};
    use crate::api::services::*;
    use crate::loader::code::EntryPointTable;
    use crate::metadata::{BundleWriter, MetadataParser};

    struct Nothing;

    #[async_trait::async_trait]
    impl MainScreenService for Nothing {
        async fn home(&self) -> Result<Vec<MediaRow>, String> {
            Ok(vec![MediaRow {
                title: "Featured".into(),
                items: Vec::new(),
            }])
        }
    }

    #[async_trait::async_trait]
    impl MediaDetailService for Nothing {
        async fn detail(&self, media_id: &str) -> Result<MediaDetail, String> {
            Err(media_id.to_string())
        }
    }

    #[async_trait::async_trait]
    impl MediaSearchService for Nothing {
        async fn search(&self, _keyword: &str, _page: u32) -> Result<SearchPage, String> {
            Err("offline".into())
        }
    }

    #[async_trait::async_trait]
    impl MediaCatalogService for Nothing {
        async fn categories(&self) -> Result<Vec<Category>, String> {
            Ok(Vec::new())
        }

        async fn catalog(&self, _category: &str, page: u32) -> Result<CatalogPage, String> {
            Ok(CatalogPage {
                items: Vec::new(),
                page,
                has_next: false,
            })
        }
    }

    struct Entry {
        init: Result<(), String>,
        init_delay: Duration,
        service_calls: Arc<AtomicUsize>,
    }

    impl PluginEntry for Entry {
        fn on_init(&self) -> Result<(), String> {
            std::thread::sleep(self.init_delay);
            self.init.clone()
        }
        fn main_screen_service(&self) -> Arc<dyn MainScreenService> {
            self.service_calls.fetch_add(1, Ordering::SeqCst);
            Arc::new(Nothing)
        }
        fn media_detail_service(&self) -> Arc<dyn MediaDetailService> {
            Arc::new(Nothing)
        }
        fn media_search_service(&self) -> Arc<dyn MediaSearchService> {
            Arc::new(Nothing)
        }
        fn media_catalog_service(&self) -> Arc<dyn MediaCatalogService> {
            Arc::new(Nothing)
        }
    }

    fn bundle(dir: &Path, entry_point: &str) -> PluginInfo {
        let path = dir.join("a.tbp");
        BundleWriter::new("com.example.a")
            .api_version(3)
            .entry_point(entry_point)
            .write_to(&path)
            .unwrap();
        MetadataParser::new().parse(&path).unwrap()
    }

    fn context(info: &PluginInfo) -> TvBoxContext {
        ContextBuilder::new(
            ScreenGeometry {
                width: 1920,
                height: 1080,
                density: 1.0,
            },
            false,
            None,
        )
        .with_network(NetworkCapabilities { ipv6: false })
        .build(info)
        .unwrap()
    }

    fn loader(table: EntryPointTable) -> PluginLoader {
        PluginLoader::new(Arc::new(table), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_load_and_memoize_services() {
        let dir = tempfile::tempdir().unwrap();
        let info = bundle(dir.path(), "ok.Entry");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut table = EntryPointTable::new();
        table.register_fn("ok.Entry", move |_| {
            Ok(Box::new(Entry {
                init: Ok(()),
                init_delay: Duration::ZERO,
                service_calls: Arc::clone(&counter),
            }) as Box<dyn PluginEntry>)
        });

        let plugin = loader(table).load(info.clone(), context(&info)).await.unwrap();
        assert_eq!(plugin.info().package_name, "com.example.a");

        let first = plugin.main_screen_service();
        let second = plugin.main_screen_service();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.home().await.unwrap()[0].title, "Featured");
    }

    #[tokio::test]
    async fn test_failures_are_opaque_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let info = bundle(dir.path(), "failing.Entry");

        let mut table = EntryPointTable::new();
        table.register_fn("failing.Entry", |_| {
            Ok(Box::new(Entry {
                init: Err("upstream refused credentials".into()),
                init_delay: Duration::ZERO,
                service_calls: Arc::default(),
            }) as Box<dyn PluginEntry>)
        });
        let loader = loader(table);

        let err = loader.load(info.clone(), context(&info)).await.unwrap_err();
        match err {
            PluginError::Load { package_name, reason } => {
                assert_eq!(package_name, "com.example.a");
                assert_eq!(reason, "initialization failed");
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut unknown = info.clone();
        unknown.entry_point = "missing.Entry".into();
        let err = loader.load(unknown, context(&info)).await.unwrap_err();
        assert!(err.to_string().contains("failed to resolve entry point"));
    }

    #[tokio::test]
    async fn test_vanished_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let info = bundle(dir.path(), "ok.Entry");
        std::fs::remove_file(&info.source_path).unwrap();

        let err = loader(EntryPointTable::new())
            .load(info.clone(), context(&info))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bundle no longer exists"));
    }

    #[test]
    fn test_init_timeout_leaves_runtime_stoppable() {
        let dir = tempfile::tempdir().unwrap();
        let info = bundle(dir.path(), "slow.Entry");

        let mut table = EntryPointTable::new();
        table.register_fn("slow.Entry", |_| {
            Ok(Box::new(Entry {
                init: Ok(()),
                init_delay: Duration::from_secs(30),
                service_calls: Arc::default(),
            }) as Box<dyn PluginEntry>)
        });
        let loader = loader(table);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = runtime
            .block_on(loader.load(info.clone(), context(&info)))
            .unwrap_err();
        assert!(err.to_string().contains("initialization timed out"));

        let started = std::time::Instant::now();
        runtime.shutdown_timeout(Duration::from_millis(100));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
