use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::apps::{self, AppRegistry};
use crate::brightness::brightness_from_bytes;
use crate::error::{Error, Result};
use crate::icon::{IconResult, PlatformTier, resolve_icon};
use crate::wallpaper::{WallpaperCache, WallpaperProvider, wallpaper_brightness};

/// Channel method names
pub mod methods {
    pub const GET_ALL_APPS: &str = "getAllApps";
    pub const GET_APPLICATION_INFO: &str = "getApplicationInfo";
    pub const DOES_APP_EXIST: &str = "doesAppExist";
    pub const IS_APP_ENABLED: &str = "isAppEnabled";
    pub const LAUNCH_APP: &str = "launchApp";
    pub const GET_WALLPAPER: &str = "getWallpaper";
    pub const GET_WALLPAPER_BRIGHTNESS: &str = "getWallpaperBrightness";
    pub const GET_BRIGHTNESS_FROM: &str = "getBrightnessFrom";
    pub const GET_ICON_OF_PACKAGE: &str = "getIconOfPackage";
}

/// Argument names
pub mod args {
    pub const PACKAGE_NAME: &str = "packageName";
    pub const REQUEST_ADAPTABLE_ICONS: &str = "requestAdaptableIcons";
    pub const SKIP_PIXEL: &str = "skipPixel";
    pub const IMAGE_DATA: &str = "imageData";
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// JSON rendering used by the CLI; byte sequences become base64 strings.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Bytes(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: BTreeMap<String, Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    fn present(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key).filter(|v| **v != Value::Null)
    }

    fn required(&self, key: &str) -> Result<&Value> {
        self.present(key)
            .ok_or_else(|| Error::invalid(format!("missing argument '{}'", key)))
    }

    fn mistyped(key: &str, expected: &str, got: &Value) -> Error {
        Error::invalid(format!(
            "argument '{}' must be {}, got {}",
            key,
            expected,
            got.kind()
        ))
    }

    pub fn required_str(&self, key: &str) -> Result<&str> {
        match self.required(key)? {
            Value::Str(s) => Ok(s),
            other => Err(Self::mistyped(key, "a string", other)),
        }
    }

    pub fn required_int(&self, key: &str) -> Result<i64> {
        match self.required(key)? {
            Value::Int(i) => Ok(*i),
            other => Err(Self::mistyped(key, "an integer", other)),
        }
    }

    pub fn required_bytes(&self, key: &str) -> Result<&[u8]> {
        match self.required(key)? {
            Value::Bytes(bytes) => Ok(bytes),
            other => Err(Self::mistyped(key, "a byte array", other)),
        }
    }

    /// Absent or null means `false`.
    pub fn optional_bool(&self, key: &str) -> Result<bool> {
        match self.present(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(Self::mistyped(key, "a bool", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MethodResult {
    Success(Value),
    Error { code: String, message: String },
    NotImplemented,
}

impl From<Result<Value>> for MethodResult {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(value) => MethodResult::Success(value),
            Err(e) => MethodResult::Error {
                code: e.code().to_string(),
                message: e.to_string(),
            },
        }
    }
}

fn icon_fields(icon: IconResult) -> Vec<(&'static str, Value)> {
    match icon {
        IconResult::Flat { png } => vec![("icon", Value::Bytes(png))],
        IconResult::Layered {
            foreground_png,
            background_png,
        } => vec![
            ("iconForeground", Value::Bytes(foreground_png)),
            ("iconBackground", Value::Bytes(background_png)),
        ],
    }
}

/// Routes named method calls to the registry, wallpaper and image logic.
pub struct LauncherPlugin {
    registry: Box<dyn AppRegistry>,
    wallpaper: Box<dyn WallpaperProvider>,
    tier: PlatformTier,
    wallpaper_cache: WallpaperCache,
}

impl LauncherPlugin {
    pub fn new(
        registry: Box<dyn AppRegistry>,
        wallpaper: Box<dyn WallpaperProvider>,
        tier: PlatformTier,
    ) -> Self {
        Self {
            registry,
            wallpaper,
            tier,
            wallpaper_cache: WallpaperCache::new(),
        }
    }

    pub fn tier(&self) -> PlatformTier {
        self.tier
    }

    pub fn handle(&self, call: &MethodCall) -> MethodResult {
        log::debug!("Handling {}", call.method);

        let result = match call.method.as_str() {
            methods::GET_ALL_APPS => self.get_all_apps(call),
            methods::GET_APPLICATION_INFO => self.get_application_info(call),
            methods::DOES_APP_EXIST => self.does_app_exist(call),
            methods::IS_APP_ENABLED => self.is_app_enabled(call),
            methods::LAUNCH_APP => self.launch_app(call),
            methods::GET_WALLPAPER => self.get_wallpaper(),
            methods::GET_WALLPAPER_BRIGHTNESS => self.get_wallpaper_brightness(call),
            methods::GET_BRIGHTNESS_FROM => self.get_brightness_from(call),
            methods::GET_ICON_OF_PACKAGE => self.get_icon_of_package(call),
            other => {
                log::debug!("{} is not implemented", other);
                return MethodResult::NotImplemented;
            }
        };

        if let Err(e) = &result {
            log::warn!("{} failed: {}", call.method, e);
        }
        result.into()
    }

    fn get_all_apps(&self, call: &MethodCall) -> Result<Value> {
        let layered = call.optional_bool(args::REQUEST_ADAPTABLE_ICONS)?;

        let apps = apps::list_applications(self.registry.as_ref())
            .into_iter()
            .filter_map(|app| {
                match resolve_icon(&app.icon, layered, self.tier) {
                    Ok(icon) => Some(Value::map(
                        [
                            ("label", Value::Str(app.label)),
                            ("package", Value::Str(app.package_id)),
                        ]
                        .into_iter()
                        .chain(icon_fields(icon)),
                    )),
                    Err(e) => {
                        log::warn!("Skipping {}: icon failed: {}", app.package_id, e);
                        None
                    }
                }
            })
            .collect();

        Ok(Value::List(apps))
    }

    fn get_application_info(&self, call: &MethodCall) -> Result<Value> {
        let package = call.required_str(args::PACKAGE_NAME)?;
        let layered = call.optional_bool(args::REQUEST_ADAPTABLE_ICONS)?;

        let details = self.registry.resolve(package)?;
        let icon = resolve_icon(&details.icon, layered, self.tier)?;

        Ok(Value::map(
            [
                ("label", Value::Str(details.label)),
                ("package", Value::Str(details.package_id)),
                ("versionName", Value::Str(details.version_name)),
                ("versionCode", Value::Int(details.version_code)),
                ("enabled", Value::Bool(details.enabled)),
            ]
            .into_iter()
            .chain(icon_fields(icon)),
        ))
    }

    fn does_app_exist(&self, call: &MethodCall) -> Result<Value> {
        let package = call.required_str(args::PACKAGE_NAME)?;
        apps::app_exists(self.registry.as_ref(), package).map(Value::Bool)
    }

    fn is_app_enabled(&self, call: &MethodCall) -> Result<Value> {
        let package = call.required_str(args::PACKAGE_NAME)?;
        Ok(Value::Bool(self.registry.resolve(package)?.enabled))
    }

    fn launch_app(&self, call: &MethodCall) -> Result<Value> {
        let package = call.required_str(args::PACKAGE_NAME)?;
        apps::launch_app(self.registry.as_ref(), package)?;
        Ok(Value::Null)
    }

    fn get_wallpaper(&self) -> Result<Value> {
        self.wallpaper_cache
            .wallpaper_bytes(self.wallpaper.as_ref())
            .map(|bytes| Value::Bytes(bytes.to_vec()))
    }

    fn get_wallpaper_brightness(&self, call: &MethodCall) -> Result<Value> {
        let stride = call.required_int(args::SKIP_PIXEL)?;
        wallpaper_brightness(self.wallpaper.as_ref(), stride).map(Value::from)
    }

    fn get_brightness_from(&self, call: &MethodCall) -> Result<Value> {
        let data = call.required_bytes(args::IMAGE_DATA)?;
        let stride = call.required_int(args::SKIP_PIXEL)?;
        brightness_from_bytes(data, stride).map(Value::from)
    }

    fn get_icon_of_package(&self, call: &MethodCall) -> Result<Value> {
        let package = call.required_str(args::PACKAGE_NAME)?;
        let layered = call.optional_bool(args::REQUEST_ADAPTABLE_ICONS)?;

        let icon = apps::resolve_package_icon(self.registry.as_ref(), package, layered, self.tier)?;
        Ok(Value::map(icon_fields(icon)))
    }
}
