use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageBuffer, Rgba, RgbaImage, imageops};
use rs_apply::Apply;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{Pixmap, Transform};

use crate::error::Result;

/// OS capability level gating which icon-layering features exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformTier {
    /// No vector drawables, no adaptive icons.
    Legacy,
    /// Vector drawables but no adaptive icons.
    Mid,
    /// Adaptive (foreground/background) icons available.
    Modern,
}

impl PlatformTier {
    pub const ADAPTIVE_ICONS_API: u32 = 26;
    pub const VECTOR_DRAWABLES_API: u32 = 21;

    pub fn from_api_level(api_level: u32) -> Self {
        match api_level {
            level if level >= Self::ADAPTIVE_ICONS_API => PlatformTier::Modern,
            level if level >= Self::VECTOR_DRAWABLES_API => PlatformTier::Mid,
            _ => PlatformTier::Legacy,
        }
    }
}

/// A scalable icon with the intrinsic size it declares.
///
/// The declared size may be zero or negative for malformed resources; such
/// icons rasterize to a 1x1 placeholder.
#[derive(Clone)]
pub struct VectorIcon {
    tree: Arc<usvg::Tree>,
    intrinsic_width: i32,
    intrinsic_height: i32,
}

impl VectorIcon {
    pub fn from_svg(data: &[u8]) -> Result<Self> {
        let tree = usvg::Tree::from_data(data, &usvg::Options::default())?;
        let size = tree.size().to_int_size();
        Ok(Self {
            intrinsic_width: i32::try_from(size.width()).unwrap_or(i32::MAX),
            intrinsic_height: i32::try_from(size.height()).unwrap_or(i32::MAX),
            tree: Arc::new(tree),
        })
    }

    /// Overrides the size parsed from the document.
    pub fn with_intrinsic_size(mut self, width: i32, height: i32) -> Self {
        self.intrinsic_width = width;
        self.intrinsic_height = height;
        self
    }

    pub fn intrinsic_size(&self) -> (i32, i32) {
        (self.intrinsic_width, self.intrinsic_height)
    }

    fn render(&self, width: u32, height: u32) -> RgbaImage {
        let Some(mut pixmap) = Pixmap::new(width, height) else {
            return RgbaImage::new(width, height);
        };

        let svg_size = self.tree.size();
        let transform = Transform::from_scale(
            width as f32 / svg_size.width(),
            height as f32 / svg_size.height(),
        );
        resvg::render(&self.tree, transform, &mut pixmap.as_mut());

        // tiny-skia stores premultiplied alpha
        pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect::<Vec<u8>>()
            .apply(|raw| ImageBuffer::from_raw(width, height, raw))
            .unwrap_or_else(|| RgbaImage::new(width, height))
    }
}

impl fmt::Debug for VectorIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIcon")
            .field("intrinsic_width", &self.intrinsic_width)
            .field("intrinsic_height", &self.intrinsic_height)
            .finish()
    }
}

/// Independently rendered layers composited by the platform at display time.
#[derive(Debug, Clone)]
pub struct AdaptiveIcon {
    pub foreground: Drawable,
    pub background: Drawable,
}

/// Icon handle as supplied by the platform adapter.
#[derive(Debug, Clone)]
pub enum Drawable {
    /// A ready-made bitmap.
    Bitmap(RgbaImage),
    Vector(VectorIcon),
    /// A colour fill with no intrinsic size.
    Solid(Rgba<u8>),
    Adaptive(Box<AdaptiveIcon>),
}

impl Drawable {
    pub fn adaptive(foreground: Drawable, background: Drawable) -> Self {
        Drawable::Adaptive(Box::new(AdaptiveIcon {
            foreground,
            background,
        }))
    }

    /// Loads an icon file: SVG documents become vectors, anything else is
    /// decoded as a bitmap.
    pub fn from_path(path: &Path) -> Result<Self> {
        let is_svg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("svg") || ext.eq_ignore_ascii_case("svgz"))
            .unwrap_or(false);

        if is_svg {
            std::fs::read(path)?
                .apply(|data| VectorIcon::from_svg(&data))
                .map(Drawable::Vector)
        } else {
            Ok(Drawable::Bitmap(image::open(path)?.to_rgba8()))
        }
    }

    pub fn intrinsic_size(&self) -> (i32, i32) {
        match self {
            Drawable::Bitmap(img) => (
                i32::try_from(img.width()).unwrap_or(i32::MAX),
                i32::try_from(img.height()).unwrap_or(i32::MAX),
            ),
            Drawable::Vector(vector) => vector.intrinsic_size(),
            Drawable::Solid(_) => (-1, -1),
            Drawable::Adaptive(adaptive) => {
                let (fw, fh) = adaptive.foreground.intrinsic_size();
                let (bw, bh) = adaptive.background.intrinsic_size();
                (fw.max(bw), fh.max(bh))
            }
        }
    }

    /// Paints the drawable so that it fills a `width` x `height` canvas.
    fn paint(&self, width: u32, height: u32) -> RgbaImage {
        match self {
            Drawable::Bitmap(img) if img.dimensions() == (width, height) => img.clone(),
            Drawable::Bitmap(img) if img.width() == 0 || img.height() == 0 => {
                RgbaImage::new(width, height)
            }
            Drawable::Bitmap(img) => {
                imageops::resize(img, width, height, imageops::FilterType::Triangle)
            }
            Drawable::Vector(vector) => vector.render(width, height),
            Drawable::Solid(color) => ImageBuffer::from_pixel(width, height, *color),
            Drawable::Adaptive(adaptive) => {
                let mut canvas = adaptive.background.paint(width, height);
                imageops::overlay(&mut canvas, &adaptive.foreground.paint(width, height), 0, 0);
                canvas
            }
        }
    }
}

/// Longest edge of a painted raster. Larger intrinsic sizes are scaled down
/// keeping the aspect ratio.
pub const MAX_RASTER_DIMENSION: u32 = 1024;

fn raster_dimensions((width, height): (i32, i32)) -> (u32, u32) {
    if width <= 0 || height <= 0 {
        return (1, 1);
    }
    let (width, height) = (width as u32, height as u32);
    let longest = width.max(height);
    if longest <= MAX_RASTER_DIMENSION {
        return (width, height);
    }

    let scale = f64::from(MAX_RASTER_DIMENSION) / f64::from(longest);
    let fit = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    (fit(width), fit(height))
}

/// Rasterizes an icon handle.
///
/// Bitmaps are returned as-is. Everything else is painted at origin into a
/// raster of its intrinsic size (capped at [`MAX_RASTER_DIMENSION`]), or
/// into a 1x1 placeholder when either intrinsic dimension is non-positive.
pub fn raster(icon: &Drawable) -> Cow<'_, RgbaImage> {
    if let Drawable::Bitmap(img) = icon {
        if img.width() > 0 && img.height() > 0 {
            return Cow::Borrowed(img);
        }
    }

    let (width, height) = raster_dimensions(icon.intrinsic_size());
    Cow::Owned(icon.paint(width, height))
}

/// PNG at maximum quality; icons are never encoded in any other format.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut bytes, CompressionType::Best, FilterType::Adaptive);
    image.write_with_encoder(encoder)?;
    Ok(bytes)
}

/// Encoded icon as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconResult {
    Flat {
        png: Vec<u8>,
    },
    Layered {
        foreground_png: Vec<u8>,
        background_png: Vec<u8>,
    },
}

/// Decides between a flat raster and a foreground/background pair.
///
/// Only a layered request on a `Modern` platform for an adaptive icon yields
/// `Layered`; every other combination is flattened.
pub fn resolve_icon(
    icon: &Drawable,
    wants_layered: bool,
    tier: PlatformTier,
) -> Result<IconResult> {
    match (wants_layered, tier, icon) {
        (true, PlatformTier::Modern, Drawable::Adaptive(adaptive)) => Ok(IconResult::Layered {
            foreground_png: encode_png(&raster(&adaptive.foreground))?,
            background_png: encode_png(&raster(&adaptive.background))?,
        }),
        // Mid has no adaptive concept, Legacy and regular requests ignore layering
        _ => Ok(IconResult::Flat {
            png: encode_png(&raster(icon))?,
        }),
    }
}
