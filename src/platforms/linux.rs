use crate::apps::{AppDetails, AppEntry, AppRegistry, LaunchOutcome, fallback_icon};
use crate::error::{Error, Result};
use crate::icon::Drawable;
use freedesktop_desktop_entry::{DesktopEntry, Iter, default_paths};
use rs_apply::Apply;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Application registry backed by freedesktop `.desktop` entries.
///
/// The package identifier of an application is its desktop file stem
/// (`org.gnome.Nautilus` for `org.gnome.Nautilus.desktop`).
pub struct DesktopRegistry {
    search_dirs: Vec<PathBuf>,
}

struct DesktopApp {
    package_id: String,
    label: String,
    exec: Option<String>,
    icon: Option<String>,
    version: Option<String>,
    hidden: bool,
    no_display: bool,
}

impl DesktopApp {
    fn is_launchable(&self) -> bool {
        self.exec.is_some() && !self.no_display && !self.hidden
    }

    fn load_icon(&self) -> Drawable {
        self.icon
            .as_deref()
            .and_then(resolve_icon_path)
            .and_then(|path| match Drawable::from_path(&path) {
                Ok(icon) => Some(icon),
                Err(e) => {
                    log::debug!("Unreadable icon {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_else(|| Drawable::Bitmap(fallback_icon(&self.label)))
    }
}

impl DesktopRegistry {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    pub fn from_default_paths() -> Self {
        Self::new(default_paths().into_iter().collect())
    }

    /// Desktop files in search order; the first file for a given id wins.
    fn desktop_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        let mut seen = HashSet::new();
        Iter::new(self.search_dirs.clone())
            .filter(move |path| package_id_of(path).is_some_and(|id| seen.insert(id)))
    }

    /// A package whose desktop file exists but cannot be read is
    /// `Unavailable`, not `NotFound`.
    fn find(&self, package_id: &str) -> Result<DesktopApp> {
        self.desktop_files()
            .find(|path| package_id_of(path).as_deref() == Some(package_id))
            .ok_or_else(|| Error::not_found(package_id))?
            .apply(|path| parse_desktop_file(&path))
            .map_err(|e| Error::unavailable(format!("{}: {}", package_id, e)))
    }
}

impl AppRegistry for DesktopRegistry {
    fn launchable(&self) -> Box<dyn Iterator<Item = Result<AppEntry>> + '_> {
        Box::new(
            self.desktop_files()
                .map(|path| parse_desktop_file(&path))
                .filter(|result| result.as_ref().map_or(true, DesktopApp::is_launchable))
                .map(|result| {
                    result.map(|app| AppEntry {
                        icon: app.load_icon(),
                        package_id: app.package_id,
                        label: app.label,
                    })
                }),
        )
    }

    fn resolve(&self, package_id: &str) -> Result<AppDetails> {
        let app = self.find(package_id)?;
        Ok(AppDetails {
            icon: app.load_icon(),
            enabled: !app.hidden,
            version_name: app.version.clone().unwrap_or_default(),
            version_code: 0,
            package_id: app.package_id,
            label: app.label,
        })
    }

    fn launch(&self, package_id: &str) -> Result<LaunchOutcome> {
        let app = self.find(package_id)?;
        let Some(exec) = app.exec.as_deref() else {
            return Ok(LaunchOutcome::NoEntryPoint);
        };

        let mut parts = exec_arguments(exec);
        if parts.is_empty() {
            return Ok(LaunchOutcome::NoEntryPoint);
        }
        let program = resolve_executable(&parts.remove(0));

        Command::new(program).args(parts).spawn()?;
        Ok(LaunchOutcome::Launched)
    }
}

fn package_id_of(path: &Path) -> Option<String> {
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

fn parse_desktop_file(path: &Path) -> Result<DesktopApp> {
    let content = fs::read_to_string(path)?;
    let entry = DesktopEntry::decode(path, &content)
        .map_err(|e| Error::invalid(format!("{}: {:?}", path.display(), e)))?;

    let package_id = package_id_of(path)
        .ok_or_else(|| Error::invalid(format!("{}: no file name", path.display())))?;
    let label = entry
        .name(None)
        .map(|cow| cow.to_string())
        .ok_or_else(|| Error::invalid(format!("{}: missing Name", path.display())))?;

    Ok(DesktopApp {
        package_id,
        label,
        exec: entry.exec().map(str::to_string),
        icon: entry.icon().map(str::to_string),
        version: entry
            .desktop_entry("X-AppVersion")
            .or_else(|| entry.desktop_entry("Version"))
            .map(str::to_string),
        hidden: entry.desktop_entry("Hidden") == Some("true"),
        no_display: entry.no_display(),
    })
}

/// Splits an `Exec` line, dropping field codes such as `%U`.
fn exec_arguments(exec: &str) -> Vec<String> {
    exec.split_whitespace()
        .filter(|part| !part.starts_with('%'))
        .map(|part| part.trim_matches('"').to_string())
        .collect()
}

fn resolve_executable(command: &str) -> PathBuf {
    if command.starts_with('/') {
        return PathBuf::from(command);
    }
    std::env::var("PATH")
        .unwrap_or_default()
        .split(':')
        .map(|dir| PathBuf::from(dir).join(command))
        .find(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from(command))
}

/// hicolor sizes tried in order, largest raster first.
const ICON_SIZES: [&str; 5] = ["256x256", "128x128", "64x64", "48x48", "scalable"];
const ICON_EXTENSIONS: [&str; 2] = ["png", "svg"];

/// Icon theme roots: the user's themes shadow the system ones.
fn icon_theme_dirs() -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = dirs::data_dir()
        .map(|data| data.join("icons"))
        .into_iter()
        .chain(dirs::home_dir().map(|home| home.join(".icons")))
        .collect();
    roots.push(PathBuf::from("/usr/share/icons"));
    roots
}

fn icon_candidates(theme_dir: &Path, icon_name: &str) -> Vec<PathBuf> {
    ICON_SIZES
        .iter()
        .flat_map(|size| {
            ICON_EXTENSIONS.iter().map(move |ext| {
                theme_dir
                    .join("hicolor")
                    .join(size)
                    .join("apps")
                    .join(format!("{}.{}", icon_name, ext))
            })
        })
        .collect()
}

/// Resolves a desktop entry's `Icon` key, which is either an absolute path or
/// a theme icon name.
fn resolve_icon_path(icon_name: &str) -> Option<PathBuf> {
    let direct = Path::new(icon_name);
    if direct.is_absolute() {
        return direct.is_file().then(|| direct.to_path_buf());
    }

    let pixmaps = Path::new("/usr/share/pixmaps");
    icon_theme_dirs()
        .iter()
        .flat_map(|theme_dir| icon_candidates(theme_dir, icon_name))
        .chain(ICON_EXTENSIONS.iter().map(|ext| pixmaps.join(format!("{}.{}", icon_name, ext))))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn write_entry(dir: &Path, file: &str, body: &str) {
        fs::write(dir.join(file), format!("[Desktop Entry]\nType=Application\n{}", body)).unwrap();
    }

    fn registry_with_entries() -> (tempfile::TempDir, DesktopRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let icon_path = dir.path().join("notes.png");
        ImageBuffer::from_pixel(8, 8, Rgba([10u8, 20, 30, 255]))
            .save(&icon_path)
            .unwrap();

        write_entry(
            dir.path(),
            "org.example.Notes.desktop",
            &format!(
                "Name=Notes\nExec=notes %U\nIcon={}\nX-AppVersion=2.1\n",
                icon_path.display()
            ),
        );
        write_entry(dir.path(), "org.example.Hidden.desktop", "Name=Hidden\nExec=hidden\nHidden=true\n");
        write_entry(dir.path(), "org.example.Docs.desktop", "Name=Docs\n");
        write_entry(dir.path(), "org.example.Broken.desktop", "Exec=broken\n");

        let registry = DesktopRegistry::new(vec![dir.path().to_path_buf()]);
        (dir, registry)
    }

    #[test]
    fn test_icon_candidates_prefer_large_rasters() {
        let candidates = icon_candidates(Path::new("/themes"), "notes");
        assert_eq!(
            candidates.first().unwrap(),
            Path::new("/themes/hicolor/256x256/apps/notes.png")
        );
        assert_eq!(
            candidates.last().unwrap(),
            Path::new("/themes/hicolor/scalable/apps/notes.svg")
        );

        assert!(resolve_icon_path("/nonexistent/notes.png").is_none());
    }

    #[test]
    fn test_exec_arguments_strip_field_codes() {
        assert_eq!(exec_arguments("\"/opt/app\" --new %U"), ["/opt/app", "--new"]);
        assert!(exec_arguments("%f").is_empty());
    }

    #[test]
    fn test_launchable_only_lists_visible_apps() {
        let (_dir, registry) = registry_with_entries();
        let results: Vec<_> = registry.launchable().collect();

        // Broken entry surfaces as an error, Hidden and Docs are filtered out
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        let apps: Vec<_> = results.into_iter().filter_map(Result::ok).collect();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].package_id, "org.example.Notes");
        assert_eq!(apps[0].label, "Notes");
        assert!(matches!(&apps[0].icon, Drawable::Bitmap(img) if img.dimensions() == (8, 8)));
    }

    #[test]
    fn test_resolve_details() {
        let (_dir, registry) = registry_with_entries();

        let notes = registry.resolve("org.example.Notes").unwrap();
        assert_eq!(notes.version_name, "2.1");
        assert!(notes.enabled);

        let hidden = registry.resolve("org.example.Hidden").unwrap();
        assert!(!hidden.enabled);
        // no icon on disk, generated fallback
        assert!(matches!(&hidden.icon, Drawable::Bitmap(img) if img.dimensions() == (64, 64)));

        assert!(matches!(
            registry.resolve("org.example.Missing"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_unparsable_entry_is_unavailable() {
        let (_dir, registry) = registry_with_entries();

        assert!(matches!(
            registry.resolve("org.example.Broken"),
            Err(Error::Unavailable(_))
        ));
        assert!(matches!(
            registry.launch("org.example.Broken"),
            Err(Error::Unavailable(_))
        ));
    }

    #[test]
    fn test_launch_without_exec_is_noop() {
        let (_dir, registry) = registry_with_entries();
        assert_eq!(
            registry.launch("org.example.Docs").unwrap(),
            LaunchOutcome::NoEntryPoint
        );
        assert!(matches!(
            registry.launch("org.example.Missing"),
            Err(Error::NotFound { .. })
        ));
    }
}
