//! Screen geometry reported to plugins.

use serde::{Deserialize, Serialize};

/// Display geometry of the host device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// Width in physical pixels.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Height in physical pixels.
    #[serde(default = "default_height")]
    pub height: u32,
    /// Logical density (1.0 = 160 dpi baseline).
    #[serde(default = "default_density")]
    pub density: f32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            density: default_density(),
        }
    }
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_density() -> f32 {
    1.0
}
