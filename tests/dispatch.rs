use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba, RgbaImage};
use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use launcher_assist::apps::{AppDetails, AppEntry, AppRegistry, LaunchOutcome};
use launcher_assist::channel::{LauncherPlugin, MethodCall, MethodResult, Value, args, methods};
use launcher_assist::codec;
use launcher_assist::icon::{Drawable, PlatformTier};
use launcher_assist::wallpaper::{Wallpaper, WallpaperProvider};
use launcher_assist::{Error, Result};

struct FakeApp {
    package: &'static str,
    label: &'static str,
    enabled: bool,
    launchable: bool,
    icon: Drawable,
}

struct FakeRegistry {
    apps: Vec<FakeApp>,
    launched: Rc<RefCell<Vec<String>>>,
}

impl FakeRegistry {
    fn find(&self, package_id: &str) -> Result<&FakeApp> {
        self.apps
            .iter()
            .find(|app| app.package == package_id)
            .ok_or_else(|| Error::not_found(package_id))
    }
}

impl AppRegistry for FakeRegistry {
    fn launchable(&self) -> Box<dyn Iterator<Item = Result<AppEntry>> + '_> {
        Box::new(
            self.apps
                .iter()
                .filter(|app| app.launchable)
                .map(|app| {
                    if app.label.is_empty() {
                        return Err(Error::invalid(format!("{} has no label", app.package)));
                    }
                    Ok(AppEntry {
                        package_id: app.package.to_string(),
                        label: app.label.to_string(),
                        icon: app.icon.clone(),
                    })
                }),
        )
    }

    fn resolve(&self, package_id: &str) -> Result<AppDetails> {
        let app = self.find(package_id)?;
        Ok(AppDetails {
            package_id: app.package.to_string(),
            label: app.label.to_string(),
            version_name: "1.4.2".to_string(),
            version_code: 142,
            enabled: app.enabled,
            icon: app.icon.clone(),
        })
    }

    fn launch(&self, package_id: &str) -> Result<LaunchOutcome> {
        let app = self.find(package_id)?;
        if !app.launchable {
            return Ok(LaunchOutcome::NoEntryPoint);
        }
        self.launched.borrow_mut().push(package_id.to_string());
        Ok(LaunchOutcome::Launched)
    }
}

struct FakeWallpaper(Wallpaper);

impl WallpaperProvider for FakeWallpaper {
    fn current(&self) -> Result<Wallpaper> {
        Ok(self.0.clone())
    }
}

fn solid(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
    ImageBuffer::from_pixel(w, h, Rgba(color))
}

fn plugin_with(tier: PlatformTier, wallpaper: Wallpaper) -> (LauncherPlugin, Rc<RefCell<Vec<String>>>) {
    let launched = Rc::new(RefCell::new(Vec::new()));
    let registry = FakeRegistry {
        launched: launched.clone(),
        apps: vec![
            FakeApp {
                package: "org.example.mail",
                label: "Mail",
                enabled: true,
                launchable: true,
                icon: Drawable::Bitmap(solid(48, 48, [200, 10, 10, 255])),
            },
            FakeApp {
                package: "org.example.camera",
                label: "Camera",
                enabled: false,
                launchable: true,
                icon: Drawable::adaptive(
                    Drawable::Bitmap(solid(108, 108, [255, 255, 255, 128])),
                    Drawable::Solid(Rgba([0, 120, 255, 255])),
                ),
            },
            FakeApp {
                package: "org.example.broken",
                label: "",
                enabled: true,
                launchable: true,
                icon: Drawable::Solid(Rgba([0, 0, 0, 255])),
            },
            FakeApp {
                package: "org.example.service",
                label: "Service",
                enabled: true,
                launchable: false,
                icon: Drawable::Solid(Rgba([0, 0, 0, 255])),
            },
        ],
    };

    let plugin = LauncherPlugin::new(Box::new(registry), Box::new(FakeWallpaper(wallpaper)), tier);
    (plugin, launched)
}

fn plugin(tier: PlatformTier) -> LauncherPlugin {
    plugin_with(tier, Wallpaper::Static(solid(32, 32, [60, 90, 120, 255]))).0
}

fn success(result: MethodResult) -> Value {
    match result {
        MethodResult::Success(value) => value,
        other => panic!("expected success, got {:?}", other),
    }
}

fn error_code(result: MethodResult) -> String {
    match result {
        MethodResult::Error { code, .. } => code,
        other => panic!("expected error, got {:?}", other),
    }
}

fn png_dimensions(value: &Value) -> (u32, u32) {
    let Value::Bytes(bytes) = value else {
        panic!("expected bytes, got {:?}", value);
    };
    assert_eq!(image::guess_format(bytes).unwrap(), ImageFormat::Png);
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}

#[test]
fn test_get_all_apps_skips_broken_and_unlaunchable() {
    let apps = success(plugin(PlatformTier::Modern).handle(&MethodCall::new(methods::GET_ALL_APPS)));
    let Value::List(apps) = apps else {
        panic!("expected list");
    };

    let packages: Vec<_> = apps
        .iter()
        .map(|app| app.get("package").cloned().unwrap())
        .collect();
    assert_eq!(
        packages,
        [Value::from("org.example.mail"), Value::from("org.example.camera")]
    );

    // regular request flattens the adaptive camera icon
    for app in &apps {
        assert!(app.get("icon").is_some());
        assert!(app.get("iconForeground").is_none());
    }
    assert_eq!(png_dimensions(apps[1].get("icon").unwrap()), (108, 108));
}

#[test]
fn test_get_all_apps_with_adaptive_icons() {
    let call = MethodCall::new(methods::GET_ALL_APPS).arg(args::REQUEST_ADAPTABLE_ICONS, true);

    let Value::List(apps) = success(plugin(PlatformTier::Modern).handle(&call)) else {
        panic!("expected list");
    };
    let camera = &apps[1];
    assert_eq!(png_dimensions(camera.get("iconForeground").unwrap()), (108, 108));
    assert_eq!(png_dimensions(camera.get("iconBackground").unwrap()), (1, 1));
    // flat bitmap icons stay flat
    assert!(apps[0].get("icon").is_some());

    let Value::List(apps) = success(plugin(PlatformTier::Mid).handle(&call)) else {
        panic!("expected list");
    };
    assert!(apps.iter().all(|app| app.get("iconForeground").is_none()));
}

#[test]
fn test_application_info() {
    let call = MethodCall::new(methods::GET_APPLICATION_INFO)
        .arg(args::PACKAGE_NAME, "org.example.camera")
        .arg(args::REQUEST_ADAPTABLE_ICONS, true);
    let info = success(plugin(PlatformTier::Modern).handle(&call));

    assert_eq!(info.get("label"), Some(&Value::from("Camera")));
    assert_eq!(info.get("versionName"), Some(&Value::from("1.4.2")));
    assert_eq!(info.get("versionCode"), Some(&Value::Int(142)));
    assert_eq!(info.get("enabled"), Some(&Value::Bool(false)));
    assert!(info.get("iconForeground").is_some());

    let missing = MethodCall::new(methods::GET_APPLICATION_INFO)
        .arg(args::PACKAGE_NAME, "org.example.none");
    assert_eq!(error_code(plugin(PlatformTier::Modern).handle(&missing)), "NOT_FOUND");
}

#[test]
fn test_exists_and_enabled() {
    let plugin = plugin(PlatformTier::Modern);
    let exists = |pkg: &str| {
        plugin.handle(&MethodCall::new(methods::DOES_APP_EXIST).arg(args::PACKAGE_NAME, pkg))
    };
    assert_eq!(success(exists("org.example.mail")), Value::Bool(true));
    assert_eq!(success(exists("org.example.none")), Value::Bool(false));

    let enabled = |pkg: &str| {
        plugin.handle(&MethodCall::new(methods::IS_APP_ENABLED).arg(args::PACKAGE_NAME, pkg))
    };
    assert_eq!(success(enabled("org.example.mail")), Value::Bool(true));
    assert_eq!(success(enabled("org.example.camera")), Value::Bool(false));
    assert_eq!(error_code(enabled("org.example.none")), "NOT_FOUND");
}

#[test]
fn test_launch_app() {
    let (plugin, launched) =
        plugin_with(PlatformTier::Modern, Wallpaper::Live);
    let launch = |pkg: &str| {
        plugin.handle(&MethodCall::new(methods::LAUNCH_APP).arg(args::PACKAGE_NAME, pkg))
    };

    assert_eq!(success(launch("org.example.mail")), Value::Null);
    // no entry point: silently ignored
    assert_eq!(success(launch("org.example.service")), Value::Null);
    assert_eq!(error_code(launch("org.example.none")), "NOT_FOUND");
    assert_eq!(*launched.borrow(), ["org.example.mail"]);

    let no_package = MethodCall::new(methods::LAUNCH_APP);
    assert_eq!(error_code(plugin.handle(&no_package)), "INVALID_INPUT");
}

#[test]
fn test_icon_of_package() {
    let call = |pkg: &str, layered: bool| {
        MethodCall::new(methods::GET_ICON_OF_PACKAGE)
            .arg(args::PACKAGE_NAME, pkg)
            .arg(args::REQUEST_ADAPTABLE_ICONS, layered)
    };
    let plugin = plugin(PlatformTier::Modern);

    let icon = success(plugin.handle(&call("org.example.mail", true)));
    assert_eq!(png_dimensions(icon.get("icon").unwrap()), (48, 48));

    let icon = success(plugin.handle(&call("org.example.camera", true)));
    assert!(icon.get("iconForeground").is_some());
    assert!(icon.get("iconBackground").is_some());

    assert_eq!(
        error_code(plugin.handle(&call("org.example.none", false))),
        "NOT_FOUND"
    );
}

#[test]
fn test_wallpaper_and_brightness() {
    let plugin = plugin(PlatformTier::Modern);

    let first = success(plugin.handle(&MethodCall::new(methods::GET_WALLPAPER)));
    let second = success(plugin.handle(&MethodCall::new(methods::GET_WALLPAPER)));
    let Value::Bytes(jpeg) = &first else {
        panic!("expected bytes");
    };
    assert_eq!(image::guess_format(jpeg).unwrap(), ImageFormat::Jpeg);
    assert_eq!(first, second);

    let brightness = MethodCall::new(methods::GET_WALLPAPER_BRIGHTNESS).arg(args::SKIP_PIXEL, 5i64);
    assert_eq!(success(plugin.handle(&brightness)), Value::Int(90));

    let zero_stride = MethodCall::new(methods::GET_WALLPAPER_BRIGHTNESS).arg(args::SKIP_PIXEL, 0i64);
    assert_eq!(error_code(plugin.handle(&zero_stride)), "INVALID_INPUT");
}

#[test]
fn test_live_wallpaper_unavailable() {
    let (plugin, _) = plugin_with(PlatformTier::Modern, Wallpaper::Live);
    assert_eq!(
        error_code(plugin.handle(&MethodCall::new(methods::GET_WALLPAPER))),
        "UNAVAILABLE"
    );
    let brightness = MethodCall::new(methods::GET_WALLPAPER_BRIGHTNESS).arg(args::SKIP_PIXEL, 1i64);
    assert_eq!(error_code(plugin.handle(&brightness)), "UNAVAILABLE");
}

#[test]
fn test_brightness_from_image_data() {
    let mut png = Vec::new();
    let img = ImageBuffer::from_fn(2, 2, |x, _| {
        if x == 0 {
            Rgba([10u8, 20, 30, 255])
        } else {
            Rgba([255u8, 255, 255, 255])
        }
    });
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();

    let plugin = plugin(PlatformTier::Legacy);
    let call = MethodCall::new(methods::GET_BRIGHTNESS_FROM)
        .arg(args::IMAGE_DATA, png)
        .arg(args::SKIP_PIXEL, 2i64);
    // indices 0 and 2 are both the (10, 20, 30) column
    assert_eq!(success(plugin.handle(&call)), Value::Int(20));

    let empty = MethodCall::new(methods::GET_BRIGHTNESS_FROM)
        .arg(args::IMAGE_DATA, Vec::<u8>::new())
        .arg(args::SKIP_PIXEL, 1i64);
    assert_eq!(error_code(plugin.handle(&empty)), "INVALID_INPUT");

    let wrong_type = MethodCall::new(methods::GET_BRIGHTNESS_FROM)
        .arg(args::IMAGE_DATA, "not bytes")
        .arg(args::SKIP_PIXEL, 1i64);
    assert_eq!(error_code(plugin.handle(&wrong_type)), "INVALID_INPUT");
}

#[test]
fn test_unknown_method_not_implemented() {
    let result = plugin(PlatformTier::Modern).handle(&MethodCall::new("getBatteryLevel"));
    assert_eq!(result, MethodResult::NotImplemented);
}

#[test]
fn test_results_survive_codec() {
    let plugin = plugin(PlatformTier::Modern);
    let call = MethodCall::new(methods::GET_ALL_APPS).arg(args::REQUEST_ADAPTABLE_ICONS, true);
    let result = plugin.handle(&call);

    let bytes = codec::encode_result(&result).unwrap();
    assert_eq!(codec::decode_result(&bytes).unwrap(), result);
}
