use std::io::Cursor;

use anyhow::Context;
use image::ImageReader;

use crate::{
    assets::texture::SourceFormat,
    foundation::core::{CropRect, Rgba},
    foundation::error::{MockupError, MockupResult},
};

/// Decoded, straight-alpha texels in row-major order (top row first).
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// One `[r, g, b, a]` per pixel. Raster sources are normalized to `0..=1`; HDR sources keep
    /// their float range.
    pub texels: Vec<Rgba>,
}

/// Decode encoded bytes according to the declared source format.
pub fn decode_texels(bytes: &[u8], format: SourceFormat) -> MockupResult<DecodedImage> {
    let dyn_img = match format {
        SourceFormat::Raster => image::load_from_memory(bytes).context("decode raster image")?,
        SourceFormat::OpenExr => {
            image::load_from_memory_with_format(bytes, image::ImageFormat::OpenExr)
                .context("decode OpenEXR image")?
        }
        SourceFormat::Radiance => {
            image::load_from_memory_with_format(bytes, image::ImageFormat::Hdr)
                .context("decode Radiance HDR image")?
        }
    };

    let rgba = dyn_img.to_rgba32f();
    let (width, height) = rgba.dimensions();
    let texels = rgba
        .into_raw()
        .chunks_exact(4)
        .map(|px| [px[0], px[1], px[2], px[3]])
        .collect();

    Ok(DecodedImage {
        width,
        height,
        texels,
    })
}

/// Width and height from the image header, without decoding any pixels.
pub fn read_dimensions(bytes: &[u8], format: SourceFormat) -> MockupResult<(u32, u32)> {
    let mut reader = ImageReader::new(Cursor::new(bytes));
    match format {
        SourceFormat::Raster => {
            reader = reader
                .with_guessed_format()
                .context("detect raster image format")?;
        }
        SourceFormat::OpenExr => reader.set_format(image::ImageFormat::OpenExr),
        SourceFormat::Radiance => reader.set_format(image::ImageFormat::Hdr),
    }
    Ok(reader.into_dimensions().context("read image header")?)
}

/// Cut the `croppedAreaPixels` rectangle out of a decoded design image.
///
/// The rectangle is rounded to whole pixels and intersected with the image bounds; an empty
/// intersection is a validation error.
pub fn crop_decoded(image: &DecodedImage, rect: &CropRect) -> MockupResult<DecodedImage> {
    if !rect.is_well_formed() {
        return Err(MockupError::validation(
            "crop rectangle must be finite with positive size",
        ));
    }

    let x0 = rect.x.round().max(0.0) as u32;
    let y0 = rect.y.round().max(0.0) as u32;
    let x1 = ((rect.x + rect.width).round().max(0.0) as u32).min(image.width);
    let y1 = ((rect.y + rect.height).round().max(0.0) as u32).min(image.height);
    if x0 >= x1 || y0 >= y1 {
        return Err(MockupError::validation(format!(
            "crop rectangle {rect:?} lies outside the {}x{} image",
            image.width, image.height
        )));
    }

    let width = x1 - x0;
    let height = y1 - y0;
    let mut texels = Vec::with_capacity((width * height) as usize);
    for y in y0..y1 {
        let row = (y * image.width) as usize;
        texels.extend_from_slice(&image.texels[row + x0 as usize..row + x1 as usize]);
    }

    Ok(DecodedImage {
        width,
        height,
        texels,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
