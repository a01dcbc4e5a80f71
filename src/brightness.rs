use image::{DynamicImage, GenericImageView};

use crate::error::{Error, Result};

/// Average of the sampled red, green and blue channels. Not clamped.
pub type BrightnessScore = u32;

/// Row-major 32-bit ARGB samples of a `width` x `height` image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    pub fn from_argb(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| Error::invalid("pixel buffer dimensions overflow"))?;

        if pixels.len() != expected {
            return Err(Error::invalid(format!(
                "pixel buffer holds {} samples, expected {}x{}",
                pixels.len(),
                width,
                height
            )));
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels = image
            .to_rgba8()
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                u32::from_be_bytes([a, r, g, b])
            })
            .collect();

        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.pixels
    }
}

fn red(color: u32) -> u64 {
    ((color >> 16) & 0xff) as u64
}

fn green(color: u32) -> u64 {
    ((color >> 8) & 0xff) as u64
}

fn blue(color: u32) -> u64 {
    (color & 0xff) as u64
}

/// Visits every `stride`-th pixel starting at index 0 and returns
/// `(sum_r + sum_g + sum_b) / (visited * 3)`. Alpha is ignored.
pub fn sample(pixels: &PixelBuffer, stride: i64) -> Result<BrightnessScore> {
    if stride <= 0 {
        return Err(Error::invalid(format!(
            "skipPixel must be a positive integer, got {}",
            stride
        )));
    }
    if pixels.is_empty() {
        return Err(Error::invalid("empty pixel buffer"));
    }

    let step = usize::try_from(stride).unwrap_or(usize::MAX);
    let (r, g, b, n) = pixels
        .as_slice()
        .iter()
        .step_by(step)
        .fold((0u64, 0u64, 0u64, 0u64), |(r, g, b, n), &color| {
            (r + red(color), g + green(color), b + blue(color), n + 1)
        });

    Ok(((r + g + b) / (n * 3)) as BrightnessScore)
}

pub fn brightness_of(image: &DynamicImage, stride: i64) -> Result<BrightnessScore> {
    sample(&PixelBuffer::from_image(image), stride)
}

/// Decodes an encoded image (any format `image` can guess) and samples it.
pub fn brightness_from_bytes(data: &[u8], stride: i64) -> Result<BrightnessScore> {
    if data.is_empty() {
        return Err(Error::invalid("empty image data"));
    }
    let image = image::load_from_memory(data)?;
    log::debug!(
        "Sampling brightness of {}x{} image, skipPixel={}",
        image.width(),
        image.height(),
        stride
    );
    brightness_of(&image, stride)
}
