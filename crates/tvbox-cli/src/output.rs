//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use tvbox_plugin::{ApiMismatch, PluginInfo, RejectedEntry};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Table row for a discovered plugin.
#[derive(Debug, Serialize, Tabled)]
pub struct PluginRow {
    #[tabled(rename = "Package")]
    pub package: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Version")]
    pub version: String,
    #[tabled(rename = "API")]
    pub api: u32,
    #[tabled(rename = "Source")]
    pub source: String,
    #[tabled(rename = "Path")]
    pub path: String,
}

impl From<&PluginInfo> for PluginRow {
    fn from(info: &PluginInfo) -> Self {
        Self {
            package: info.package_name.clone(),
            name: info.display_name.clone(),
            version: format!("{} ({})", info.version_name, info.version_code),
            api: info.api_version,
            source: if info.is_external { "external" } else { "managed" }.to_string(),
            path: info.source_path.display().to_string(),
        }
    }
}

/// Table row for a rejected directory entry.
#[derive(Debug, Serialize, Tabled)]
pub struct RejectedRow {
    #[tabled(rename = "Path")]
    pub path: String,
    #[tabled(rename = "Reason")]
    pub reason: String,
}

impl From<&RejectedEntry> for RejectedRow {
    fn from(entry: &RejectedEntry) -> Self {
        Self {
            path: entry.path.display().to_string(),
            reason: entry.reason.to_string(),
        }
    }
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                let table = Table::new(items).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{:#?}", item);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

/// Print plugin metadata as key-value pairs
pub fn print_plugin(info: &PluginInfo, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{}:", info.display_name);
            print_kv("Package", &info.package_name);
            print_kv("Version", &format!("{} ({})", info.version_name, info.version_code));
            print_kv("API Version", &info.api_version.to_string());
            print_kv("Entry Point", &info.entry_point);
            print_kv("Source", &info.source_path.display().to_string());
            print_kv("External", &info.is_external.to_string());
            print_kv(
                "Icon",
                info.icon.as_ref().map(|i| i.entry.as_str()).unwrap_or("-"),
            );
            if let Some(mismatch) = info.api_mismatch() {
                print_mismatch(&mismatch);
            }
        }
        OutputFormat::Json => print_item(info, format),
    }
}

/// Print an API version mismatch warning
pub fn print_mismatch(mismatch: &ApiMismatch) {
    print_warning(&format!(
        "{} targets API {} but this host implements API {}",
        mismatch.package_name, mismatch.plugin_api_version, mismatch.host_api_version
    ));
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {}", msg);
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{}:", key), value);
}
