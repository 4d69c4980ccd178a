//! Plugin context: the read-only capabilities handed to an entry point.

use std::fmt;
use std::net::UdpSocket;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use tvbox_core::config::AppConfig;
use tvbox_core::config::screen::ScreenConfig;
use tvbox_core::result::AppResult;

use super::store::{JsonFileStore, MemoryStore, PluginStore};
use crate::HOST_API_VERSION;
use crate::info::PluginInfo;

/// Display geometry of the host device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    /// Width in physical pixels.
    pub width: u32,
    /// Height in physical pixels.
    pub height: u32,
    /// Logical density.
    pub density: f32,
}

impl From<&ScreenConfig> for ScreenGeometry {
    fn from(config: &ScreenConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            density: config.density,
        }
    }
}

/// Network facts computed once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCapabilities {
    /// Whether a global IPv6 route exists.
    pub ipv6: bool,
}

impl NetworkCapabilities {
    /// Probes the network stack. Connecting a UDP socket only selects a
    /// route; no packet is sent.
    pub fn probe() -> Self {
        let ipv6 = UdpSocket::bind("[::]:0")
            .and_then(|socket| socket.connect("[2001:4860:4860::8888]:53"))
            .is_ok();
        Self { ipv6 }
    }
}

/// Context passed to an entry point at construction.
#[derive(Clone)]
pub struct TvBoxContext {
    /// Identity of the plugin receiving this context.
    pub package_name: String,
    /// API version implemented by the host.
    pub host_api_version: u32,
    /// Display geometry.
    pub screen: ScreenGeometry,
    /// Host debug flag.
    pub debug: bool,
    /// Persistent key/value store private to this plugin.
    pub store: Arc<dyn PluginStore>,
    /// Process-wide network facts, shared by every plugin.
    pub network: Arc<NetworkCapabilities>,
}

impl fmt::Debug for TvBoxContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TvBoxContext")
            .field("package_name", &self.package_name)
            .field("host_api_version", &self.host_api_version)
            .field("screen", &self.screen)
            .field("debug", &self.debug)
            .field("network", &self.network)
            .finish()
    }
}

/// Assembles a [`TvBoxContext`] for each plugin instantiation.
#[derive(Debug)]
pub struct ContextBuilder {
    screen: ScreenGeometry,
    debug: bool,
    /// Directory of per-plugin stores; `None` keeps stores in memory.
    store_dir: Option<PathBuf>,
    network: OnceLock<Arc<NetworkCapabilities>>,
}

impl ContextBuilder {
    /// Creates a builder from explicit values.
    pub fn new(screen: ScreenGeometry, debug: bool, store_dir: Option<PathBuf>) -> Self {
        Self {
            screen,
            debug,
            store_dir,
            network: OnceLock::new(),
        }
    }

    /// Creates a builder from the application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            ScreenGeometry::from(&config.screen),
            config.host.debug,
            Some(PathBuf::from(&config.host.data_dir).join("plugin-data")),
        )
    }

    /// Fixes the network capabilities instead of probing.
    pub fn with_network(self, network: NetworkCapabilities) -> Self {
        let _ = self.network.set(Arc::new(network));
        self
    }

    /// Network capabilities, probed on first use.
    pub fn network(&self) -> Arc<NetworkCapabilities> {
        self.network
            .get_or_init(|| {
                let caps = NetworkCapabilities::probe();
                info!(ipv6 = caps.ipv6, "Network capabilities probed");
                Arc::new(caps)
            })
            .clone()
    }

    /// Builds the context for one plugin.
    pub fn build(&self, info: &PluginInfo) -> AppResult<TvBoxContext> {
        let store: Arc<dyn PluginStore> = match &self.store_dir {
            Some(dir) => Arc::new(JsonFileStore::open(
                dir.join(format!("{}.json", info.package_name)),
            )?),
            None => Arc::new(MemoryStore::default()),
        };

        Ok(TvBoxContext {
            package_name: info.package_name.clone(),
            host_api_version: HOST_API_VERSION,
            screen: self.screen,
            debug: self.debug,
            store,
            network: self.network(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(package: &str) -> PluginInfo {
        PluginInfo {
            api_version: 3,
            entry_point: "Entry".into(),
            package_name: package.into(),
            display_name: package.into(),
            version_name: String::new(),
            version_code: 1,
            icon: None,
            source_path: PathBuf::from("/tmp/x.tbp"),
            is_external: false,
        }
    }

    #[test]
    fn test_network_is_shared_between_contexts() {
        let builder = ContextBuilder::new(
            ScreenGeometry {
                width: 1280,
                height: 720,
                density: 1.5,
            },
            true,
            None,
        )
        .with_network(NetworkCapabilities { ipv6: true });

        let a = builder.build(&info("com.example.a")).unwrap();
        let b = builder.build(&info("com.example.b")).unwrap();
        assert!(Arc::ptr_eq(&a.network, &b.network));
        assert!(a.network.ipv6);
        assert_eq!(a.screen.width, 1280);
        assert!(a.debug);
        assert_eq!(a.host_api_version, HOST_API_VERSION);
    }

    #[test]
    fn test_store_is_private_per_plugin() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ContextBuilder::new(
            ScreenGeometry {
                width: 1920,
                height: 1080,
                density: 1.0,
            },
            false,
            Some(dir.path().to_path_buf()),
        )
        .with_network(NetworkCapabilities { ipv6: false });

        let a = builder.build(&info("com.example.a")).unwrap();
        a.store.set("token", "abc").unwrap();

        let b = builder.build(&info("com.example.b")).unwrap();
        assert!(b.store.get("token").is_none());

        let again = builder.build(&info("com.example.a")).unwrap();
        assert_eq!(again.store.get("token").as_deref(), Some("abc"));
        assert!(dir.path().join("com.example.a.json").is_file());
    }
}
