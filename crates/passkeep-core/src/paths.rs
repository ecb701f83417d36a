//! Standard paths used by passkeep

use std::path::PathBuf;

/// Standard passkeep paths
pub struct Paths {
    /// Config directory (~/.config/passkeep)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("passkeep");

        Self { config }
    }

    /// Path of the main configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }
}
