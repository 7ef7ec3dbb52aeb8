use std::io::Cursor;

use anyhow::Context;

use crate::foundation::core::{Canvas, Rgba};
use crate::foundation::error::{MockupError, MockupResult};
use crate::foundation::math::unit_to_u8;

/// Premultiplied `f32` RGBA render target, row-major, top row first.
#[derive(Clone, Debug, PartialEq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Framebuffer {
    /// Transparent target of the canvas size.
    pub fn new(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            pixels: vec![[0.0; 4]; canvas.pixel_count()],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill with a straight-alpha color.
    pub fn clear(&mut self, color: Rgba) {
        let premul = premultiply(color);
        self.pixels.fill(premul);
    }

    /// Premultiplied value at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    /// Straight-alpha value at `(x, y)`.
    pub fn pixel_straight(&self, x: u32, y: u32) -> Option<Rgba> {
        self.pixel(x, y).map(unpremultiply)
    }

    /// Composite a straight-alpha color over the pixel at `(x, y)`.
    pub fn blend(&mut self, x: u32, y: u32, src: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y * self.width + x) as usize;
        self.pixels[i] = over(self.pixels[i], premultiply(src));
    }

    /// Whether every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|p| p[3] <= 0.0)
    }

    /// Straight-alpha RGBA8 bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&p| unpremultiply(p).map(unit_to_u8))
            .collect()
    }

    /// PNG-encode the current contents.
    pub fn encode_png(&self) -> MockupResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.to_rgba8())
            .ok_or_else(|| MockupError::export("framebuffer size does not match pixel data"))?;
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .context("encode framebuffer as PNG")
            .map_err(|e| MockupError::export(format!("{e:#}")))?;
        Ok(out)
    }
}

fn premultiply(c: Rgba) -> Rgba {
    let a = c[3].clamp(0.0, 1.0);
    [c[0] * a, c[1] * a, c[2] * a, a]
}

fn unpremultiply(p: Rgba) -> Rgba {
    if p[3] <= 0.0 {
        return [0.0; 4];
    }
    [p[0] / p[3], p[1] / p[3], p[2] / p[3], p[3]]
}

/// Porter-Duff source-over on premultiplied values.
pub(crate) fn over(dst: Rgba, src: Rgba) -> Rgba {
    if src[3] <= 0.0 {
        return dst;
    }
    let inv = 1.0 - src[3];
    std::array::from_fn(|i| src[i] + dst[i] * inv)
}

#[cfg(test)]
#[path = "../../tests/unit/render/framebuffer.rs"]
mod tests;
