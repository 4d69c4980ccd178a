//! TvBox host
//!
//! Main entry point that wires the plugin runtime together, scans the plugin
//! directories and launches the configured default plugin.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tracing_subscriber::{EnvFilter, fmt};

use tvbox_core::config::AppConfig;
use tvbox_core::error::AppError;
use tvbox_plugin::{EntryPointTable, Plugin, PluginManager};

/// How long shutdown waits for blocking work before abandoning it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(config));
    shut_down(runtime);

    if let Err(e) = result {
        tracing::error!("Host error: {}", e);
        std::process::exit(1);
    }
}

/// Build the multi-threaded host runtime
fn build_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

/// Stop the runtime without waiting on plugin threads whose init timed out
fn shut_down(runtime: Runtime) {
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("TVBOX_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

    AppConfig::load(&config_path)
        .map_err(|e| AppError::configuration(format!("Config load error: {}", e)))
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main host run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting TvBox host v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Create data directories ──────────────────────────
    create_data_directories(&config).await?;

    // ── Step 2: Plugin manager with built-in entry points ────────
    let mut builtins = EntryPointTable::new();
    plugin_demo::register_entry_points(&mut builtins);
    tracing::info!(entry_points = ?builtins.names(), "Built-in entry points registered");

    let manager = Arc::new(
        PluginManager::builder(config.clone())
            .builtins(builtins)
            .build(),
    );

    // ── Step 3: Follow snapshot updates ──────────────────────────
    let mut updates = manager.subscribe();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            tracing::debug!(
                generation = snapshot.generation,
                plugins = snapshot.plugins.len(),
                loaded = snapshot.loaded,
                active = ?snapshot.active.as_ref().map(|p| p.info().package_name.as_str()),
                "Plugin state changed"
            );
        }
    });

    // ── Step 4: Scan ─────────────────────────────────────────────
    let loaded = manager.scan().await?;
    tracing::info!(
        plugins = loaded.plugins.len(),
        rejected = loaded.invalid_files.len(),
        external = manager.external_discovery_enabled(),
        "Plugin scan complete"
    );
    for entry in &loaded.invalid_files {
        tracing::warn!(
            path = %entry.path.display(),
            reason = %entry.reason,
            "Ignored plugin directory entry"
        );
    }
    for mismatch in &loaded.api_mismatches {
        tracing::warn!(
            package = %mismatch.package_name,
            plugin_api = mismatch.plugin_api_version,
            host_api = mismatch.host_api_version,
            "Plugin targets a different API version"
        );
    }

    // ── Step 5: Launch the default plugin ────────────────────────
    match &config.host.default_plugin {
        Some(identity) => match manager.launch(identity).await {
            Ok(plugin) => show_home(identity, &plugin).await,
            Err(e) => tracing::warn!(package = %identity, error = %e, "Default plugin not launched"),
        },
        None => tracing::info!("No default plugin configured"),
    }

    // ── Step 6: Wait for shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    manager.clear_pool().await;
    watcher.abort();

    tracing::info!("TvBox host shut down");
    Ok(())
}

/// Log the main screen rows of a launched plugin
async fn show_home(identity: &str, plugin: &Plugin) {
    match plugin.main_screen_service().home().await {
        Ok(rows) => {
            for row in &rows {
                tracing::info!(
                    package = %identity,
                    row = %row.title,
                    items = row.items.len(),
                    "Home row"
                );
            }
        }
        Err(e) => tracing::warn!(package = %identity, error = %e, "Main screen unavailable"),
    }
}

/// Create required data directories
async fn create_data_directories(config: &AppConfig) -> Result<(), AppError> {
    let dirs = [config.host.data_dir.clone(), config.plugins.directory.clone()];

    for dir in &dirs {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::internal(format!("Failed to create dir '{}': {}", dir, e)))?;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn test_shutdown_does_not_wait_for_hung_blocking_work() {
        let runtime = build_runtime().unwrap();

        let outcome = runtime.block_on(async {
            let hung = tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(30)));
            tokio::time::timeout(Duration::from_millis(50), hung).await
        });
        assert!(outcome.is_err());

        let started = Instant::now();
        shut_down(runtime);
        assert!(started.elapsed() < SHUTDOWN_GRACE + Duration::from_secs(5));
    }
}
