use image::{ImageBuffer, Rgba, RgbaImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, Result};
use crate::icon::{Drawable, IconResult, PlatformTier, resolve_icon};

#[path = "platforms/linux.rs"]
#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::DesktopRegistry;

/// A launchable application as listed by the registry.
#[derive(Debug, Clone)]
pub struct AppEntry {
    pub package_id: String,
    pub label: String,
    pub icon: Drawable,
}

/// Details for a single resolved package.
#[derive(Debug, Clone)]
pub struct AppDetails {
    pub package_id: String,
    pub label: String,
    pub version_name: String,
    pub version_code: i64,
    pub enabled: bool,
    pub icon: Drawable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Launched,
    /// The package exists but has nothing to launch.
    NoEntryPoint,
}

/// The platform's application registry.
pub trait AppRegistry {
    /// Every launchable candidate. A malformed package yields an `Err` item
    /// instead of failing the whole listing.
    fn launchable(&self) -> Box<dyn Iterator<Item = Result<AppEntry>> + '_>;

    /// Fails with `NotFound` when no package has this identifier.
    fn resolve(&self, package_id: &str) -> Result<AppDetails>;

    fn launch(&self, package_id: &str) -> Result<LaunchOutcome>;
}

/// Lists launchable applications, skipping entries the registry failed to read.
pub fn list_applications(registry: &dyn AppRegistry) -> Vec<AppEntry> {
    let apps: Vec<AppEntry> = registry
        .launchable()
        .filter_map(|result| match result {
            Ok(app) => Some(app),
            Err(e) => {
                log::warn!("Skipping application entry: {}", e);
                None
            }
        })
        .collect();

    log::info!("Found {} launchable applications", apps.len());
    apps
}

pub fn resolve_package_icon(
    registry: &dyn AppRegistry,
    package_id: &str,
    wants_layered: bool,
    tier: PlatformTier,
) -> Result<IconResult> {
    let details = registry.resolve(package_id)?;
    resolve_icon(&details.icon, wants_layered, tier)
}

pub fn app_exists(registry: &dyn AppRegistry, package_id: &str) -> Result<bool> {
    match registry.resolve(package_id) {
        Ok(_) => Ok(true),
        Err(Error::NotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn launch_app(registry: &dyn AppRegistry, package_id: &str) -> Result<LaunchOutcome> {
    log::info!("Launching: {}", package_id);
    let outcome = registry.launch(package_id)?;
    if outcome == LaunchOutcome::NoEntryPoint {
        log::info!("{} has no launch entry point, ignoring", package_id);
    }
    Ok(outcome)
}

/// Registry used on hosts without a supported application database.
#[derive(Debug, Default)]
pub struct EmptyRegistry;

impl AppRegistry for EmptyRegistry {
    fn launchable(&self) -> Box<dyn Iterator<Item = Result<AppEntry>> + '_> {
        Box::new(std::iter::empty())
    }

    fn resolve(&self, package_id: &str) -> Result<AppDetails> {
        Err(Error::not_found(package_id))
    }

    fn launch(&self, package_id: &str) -> Result<LaunchOutcome> {
        Err(Error::not_found(package_id))
    }
}

pub fn host_registry() -> Box<dyn AppRegistry> {
    #[cfg(target_os = "linux")]
    {
        Box::new(DesktopRegistry::from_default_paths())
    }

    #[cfg(not(target_os = "linux"))]
    {
        Box::new(EmptyRegistry)
    }
}

const FALLBACK_ICON_SIZE: u32 = 64;
const FALLBACK_GRID: u32 = 8;

/// Deterministic pixelated icon for applications that ship none: an 8x8
/// grid of light and dark cells seeded from the label.
pub fn fallback_icon(label: &str) -> RgbaImage {
    let seed = label
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let cells: Vec<u8> = (0..FALLBACK_GRID * FALLBACK_GRID)
        .map(|_| if rng.gen_bool(0.5) { 200 } else { 50 })
        .collect();

    let cell_size = FALLBACK_ICON_SIZE / FALLBACK_GRID;
    ImageBuffer::from_fn(FALLBACK_ICON_SIZE, FALLBACK_ICON_SIZE, |x, y| {
        let level = cells[(y / cell_size * FALLBACK_GRID + x / cell_size) as usize];
        Rgba([level, level, level, 255])
    })
}
