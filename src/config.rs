use clap::Args;
use log::LevelFilter;
use std::path::PathBuf;

use crate::icon::PlatformTier;

/// Host settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Platform API level used to pick the icon tier
    #[arg(long, global = true, env = "LAUNCHER_ASSIST_API_LEVEL", default_value_t = 33)]
    pub api_level: u32,

    /// Image file used as the current wallpaper
    #[arg(long, global = true, env = "LAUNCHER_ASSIST_WALLPAPER")]
    pub wallpaper: Option<PathBuf>,

    /// Log level written to the log file
    #[arg(long, global = true, env = "LAUNCHER_ASSIST_LOG", default_value = "info")]
    pub log_level: LevelFilter,
}

impl Settings {
    pub fn tier(&self) -> PlatformTier {
        PlatformTier::from_api_level(self.api_level)
    }
}
