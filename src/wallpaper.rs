use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use once_cell::sync::OnceCell;
use std::path::PathBuf;

use crate::brightness::{BrightnessScore, brightness_of};
use crate::error::{Error, Result};

/// What the platform reports as the active wallpaper.
#[derive(Debug, Clone)]
pub enum Wallpaper {
    Static(RgbaImage),
    /// Live or animated source with no single raster.
    Live,
}

pub trait WallpaperProvider {
    fn current(&self) -> Result<Wallpaper>;
}

fn current_raster(provider: &dyn WallpaperProvider) -> Result<RgbaImage> {
    match provider.current()? {
        Wallpaper::Static(image) => Ok(image),
        Wallpaper::Live => Err(Error::unavailable("wallpaper is not a static image")),
    }
}

/// Wallpapers are JPEG at quality 100, unlike icons.
pub fn encode_jpeg(image: &RgbaImage) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
    let mut bytes = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, 100))?;
    Ok(bytes)
}

/// Memoises the first successfully encoded wallpaper for the process lifetime.
///
/// Failed reads are not cached. Two concurrent misses both encode and the
/// first to finish wins; the bytes are identical either way.
#[derive(Debug, Default)]
pub struct WallpaperCache {
    bytes: OnceCell<Vec<u8>>,
}

impl WallpaperCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wallpaper_bytes(&self, provider: &dyn WallpaperProvider) -> Result<&[u8]> {
        self.bytes
            .get_or_try_init(|| {
                let image = current_raster(provider)?;
                log::info!(
                    "Encoding {}x{} wallpaper",
                    image.width(),
                    image.height()
                );
                encode_jpeg(&image)
            })
            .map(Vec::as_slice)
    }

    pub fn is_cached(&self) -> bool {
        self.bytes.get().is_some()
    }
}

/// Brightness of the current wallpaper; always read fresh from the provider.
pub fn wallpaper_brightness(
    provider: &dyn WallpaperProvider,
    stride: i64,
) -> Result<BrightnessScore> {
    let image = DynamicImage::ImageRgba8(current_raster(provider)?);
    brightness_of(&image, stride)
}

/// Wallpaper read from an image file on disk.
///
/// An unset or unreadable path is unavailable; a file that is not a
/// decodable raster (video, XML slideshow, corrupt image) is treated as a
/// live wallpaper.
#[derive(Debug, Clone, Default)]
pub struct FileWallpaper {
    path: Option<PathBuf>,
}

impl FileWallpaper {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl WallpaperProvider for FileWallpaper {
    fn current(&self) -> Result<Wallpaper> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| Error::unavailable("no wallpaper source configured"))?;

        let reader = ImageReader::open(path)
            .and_then(ImageReader::with_guessed_format)
            .map_err(|e| Error::unavailable(format!("{}: {}", path.display(), e)))?;

        match reader.format() {
            Some(format) if format != ImageFormat::Gif => match reader.decode() {
                Ok(image) => Ok(Wallpaper::Static(image.to_rgba8())),
                Err(e) => {
                    log::debug!("{} failed to decode: {}", path.display(), e);
                    Ok(Wallpaper::Live)
                }
            },
            _ => {
                log::debug!("{} is not a static raster", path.display());
                Ok(Wallpaper::Live)
            }
        }
    }
}
