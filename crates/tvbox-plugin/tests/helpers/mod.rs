//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tempfile::TempDir;

use tvbox_core::config::AppConfig;
use tvbox_plugin::external::ExternalRegistry;
use tvbox_plugin::prelude::*;
use tvbox_plugin::{BundleWriter, EntryPointTable, PluginManager};

/// Entry point that counts `on_init` calls.
pub const COUNTING: &str = "test.Counting";
/// Entry point whose `on_init` fails.
pub const FAILING: &str = "test.Failing";
/// Entry point whose constructor fails.
pub const BROKEN: &str = "test.Broken";
/// Entry point whose `on_init` outlives the init timeout.
pub const HANGING: &str = "test.Hanging";

/// Host identity used by test managers.
pub const HOST: &str = "com.tvbox.host";

/// Counters observed by tests.
#[derive(Debug, Default)]
pub struct Counters {
    pub inits: AtomicUsize,
    pub constructions: AtomicUsize,
    pub main_screen_requests: AtomicUsize,
}

impl Counters {
    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn main_screen_requests(&self) -> usize {
        self.main_screen_requests.load(Ordering::SeqCst)
    }
}

struct TestEntry {
    package: String,
    counters: Arc<Counters>,
    init_delay: Duration,
    init_result: Result<(), String>,
}

struct Rows {
    package: String,
}

#[async_trait]
impl MainScreenService for Rows {
    async fn home(&self) -> Result<Vec<MediaRow>, String> {
        Ok(vec![MediaRow {
            title: self.package.clone(),
            items: vec![MediaCard {
                id: "1".into(),
                title: "Pilot".into(),
                subtitle: None,
                cover_url: None,
            }],
        }])
    }
}

#[async_trait]
impl MediaDetailService for Rows {
    async fn detail(&self, media_id: &str) -> Result<MediaDetail, String> {
        Err(format!("unknown media {media_id}"))
    }
}

#[async_trait]
impl MediaSearchService for Rows {
    async fn search(&self, _keyword: &str, _page: u32) -> Result<SearchPage, String> {
        Ok(SearchPage {
            items: Vec::new(),
            has_next: false,
        })
    }
}

#[async_trait]
impl MediaCatalogService for Rows {
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

impl PluginEntry for TestEntry {
    fn on_init(&self) -> Result<(), String> {
        std::thread::sleep(self.init_delay);
        self.counters.inits.fetch_add(1, Ordering::SeqCst);
        self.init_result.clone()
    }

    fn main_screen_service(&self) -> Arc<dyn MainScreenService> {
        self.counters
            .main_screen_requests
            .fetch_add(1, Ordering::SeqCst);
        Arc::new(Rows {
            package: self.package.clone(),
        })
    }

    fn media_detail_service(&self) -> Arc<dyn MediaDetailService> {
        Arc::new(Rows {
            package: self.package.clone(),
        })
    }

    fn media_search_service(&self) -> Arc<dyn MediaSearchService> {
        Arc::new(Rows {
            package: self.package.clone(),
        })
    }

    fn media_catalog_service(&self) -> Arc<dyn MediaCatalogService> {
        Arc::new(Rows {
            package: self.package.clone(),
        })
    }
}

fn entry_points(counters: &Arc<Counters>) -> EntryPointTable {
    let mut table = EntryPointTable::new();

    let register = |table: &mut EntryPointTable,
                    name: &str,
                    init_delay: Duration,
                    init_result: Result<(), String>| {
        let counters = Arc::clone(counters);
        table.register_fn(name, move |context: TvBoxContext| {
            counters.constructions.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(TestEntry {
                package: context.package_name.clone(),
                counters: Arc::clone(&counters),
                init_delay,
                init_result: init_result.clone(),
            }) as Box<dyn PluginEntry>)
        });
    };

    register(&mut table, COUNTING, Duration::from_millis(100), Ok(()));
    register(
        &mut table,
        FAILING,
        Duration::ZERO,
        Err("upstream rejected credentials".into()),
    );
    register(&mut table, HANGING, Duration::from_secs(2), Ok(()));
    table.register_fn(BROKEN, |_| Err("no upstream configured".to_string()));
    table
}

/// Test host context.
pub struct TestHost {
    pub dir: TempDir,
    pub config: AppConfig,
    pub counters: Arc<Counters>,
    pub manager: Arc<PluginManager>,
}

impl TestHost {
    /// Creates a host with an empty plugin directory and external
    /// discovery disabled.
    pub fn new() -> Self {
        Self::with(|_| {}, None)
    }

    /// Creates a host after adjusting its configuration.
    pub fn with(
        configure: impl FnOnce(&mut AppConfig),
        external: Option<Arc<dyn ExternalRegistry>>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let mut config = AppConfig::default();
        config.host.identity = HOST.to_string();
        config.host.debug = false;
        config.host.data_dir = dir.path().join("data").display().to_string();
        config.plugins.directory = dir.path().join("plugins").display().to_string();
        config.plugins.init_timeout_seconds = 1;
        configure(&mut config);

        let counters = Arc::new(Counters::default());
        let mut builder = PluginManager::builder(config.clone())
            .builtins(entry_points(&counters))
            .network(NetworkCapabilities { ipv6: false });
        if let Some(registry) = external {
            builder = builder.external_registry(registry);
        }

        Self {
            dir,
            config,
            counters,
            manager: Arc::new(builder.build()),
        }
    }

    /// Managed plugin directory.
    pub fn plugin_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.plugins.directory)
    }

    /// Scratch directory outside the plugin directory.
    pub fn staging_dir(&self) -> PathBuf {
        let dir = self.dir.path().join("staging");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Writes a bundle into the managed plugin directory.
    pub fn add_bundle(&self, file_name: &str, package: &str, entry_point: &str) -> PathBuf {
        self.add(file_name, bundle(package, entry_point))
    }

    /// Writes an arbitrary bundle into the managed plugin directory.
    pub fn add(&self, file_name: &str, writer: BundleWriter) -> PathBuf {
        let dir = self.plugin_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file_name);
        writer.write_to(&path).unwrap();
        path
    }

    /// Writes a raw file into the managed plugin directory.
    pub fn add_raw(&self, file_name: &str, data: &[u8]) -> PathBuf {
        let dir = self.plugin_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file_name);
        std::fs::write(&path, data).unwrap();
        path
    }
}

/// A valid bundle targeting the host API version.
pub fn bundle(package: &str, entry_point: &str) -> BundleWriter {
    BundleWriter::new(package)
        .label(package)
        .version("1.0.0", 1)
        .api_version(tvbox_plugin::HOST_API_VERSION)
        .entry_point(entry_point)
}

/// Artifact cache file for `identity` under `arch`.
pub fn artifact(plugin_dir: &Path, arch: &str, file_name: &str) -> PathBuf {
    let dir = plugin_dir.join("oat").join(arch);
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(file_name)
}
