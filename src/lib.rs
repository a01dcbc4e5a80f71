//! Launcher helper: lists and launches applications, resolves (adaptive)
//! application icons, serves the wallpaper and measures image brightness.
//!
//! Platform collaborators are injected through [`apps::AppRegistry`] and
//! [`wallpaper::WallpaperProvider`]; [`channel::LauncherPlugin`] routes named
//! method calls to them.

pub mod apps;
pub mod brightness;
pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod icon;
pub mod logs;
pub mod wallpaper;

pub use error::{Error, Result};

pub const APP_NAME: &str = "launcher-assist";
