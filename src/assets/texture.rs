use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::assets::decode::DecodedImage;
use crate::foundation::core::Rgba;
use crate::foundation::math::{clamp01, linear_to_srgb, mix};

/// Encoded source format of a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// PNG/JPEG/WebP and other 8-bit raster formats.
    Raster,
    /// OpenEXR high dynamic range data.
    OpenExr,
    /// Radiance `.hdr` high dynamic range data.
    Radiance,
}

impl SourceFormat {
    /// Guess the format from a URL or path extension (query strings and fragments ignored).
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "exr" => Self::OpenExr,
            "hdr" => Self::Radiance,
            _ => Self::Raster,
        }
    }

    /// Return `true` for floating-point HDR sources.
    pub fn is_hdr(self) -> bool {
        matches!(self, Self::OpenExr | Self::Radiance)
    }
}

/// Color space tag attached to a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Human-visible color stored sRGB-encoded.
    Srgb,
    /// Linear-light values (HDR data).
    Linear,
    /// Raw data; no color transform is ever applied.
    None,
}

/// Texture filtering mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Single nearest texel on level 0.
    Nearest,
    /// Bilinear on level 0.
    Linear,
    /// Bilinear on the two closest mip levels, blended by the fractional LOD.
    Trilinear,
}

/// Edge addressing mode. Mockup textures always clamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WrapMode {
    /// Coordinates outside `0..=1` reuse the edge texel.
    #[default]
    ClampToEdge,
}

/// What a texture slot is used for; drives its sampling configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureUsage {
    /// Human-visible color (base photo, user design).
    Color,
    /// Grayscale mask; red channel is read as coverage.
    Mask,
    /// Per-pixel data such as a UV remap.
    Data,
    /// Design sampled through a warped mesh.
    Warp,
}

/// Immutable sampling configuration of a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    /// Encoded source format.
    pub format: SourceFormat,
    /// Color space tag.
    pub color_space: ColorSpace,
    /// Filtering mode.
    pub filter: FilterMode,
    /// Edge addressing.
    pub wrap: WrapMode,
    /// Whether a mip chain is generated at upload.
    pub mipmaps: bool,
}

impl TextureDesc {
    /// Configuration for a slot with the given usage and source format.
    pub fn for_usage(usage: TextureUsage, format: SourceFormat) -> Self {
        let (color_space, filter) = match usage {
            TextureUsage::Color => (ColorSpace::Srgb, FilterMode::Trilinear),
            TextureUsage::Mask => (ColorSpace::None, FilterMode::Trilinear),
            TextureUsage::Data => (ColorSpace::Linear, FilterMode::Nearest),
            TextureUsage::Warp => (ColorSpace::Srgb, FilterMode::Linear),
        };
        let (color_space, filter) = if format.is_hdr() {
            // HDR data never carries an sRGB curve and is never mip-filtered.
            let filter = match filter {
                FilterMode::Trilinear => FilterMode::Linear,
                other => other,
            };
            (ColorSpace::Linear, filter)
        } else {
            (color_space, filter)
        };
        Self {
            format,
            color_space,
            filter,
            wrap: WrapMode::ClampToEdge,
            mipmaps: filter == FilterMode::Trilinear,
        }
    }
}

/// Counters shared by every texture created through one loader.
#[derive(Clone, Debug, Default)]
pub struct TextureTracker {
    inner: Arc<TrackerCounters>,
}

#[derive(Debug, Default)]
struct TrackerCounters {
    created: AtomicU64,
    disposed: AtomicU64,
}

/// Snapshot of [`TextureTracker`] counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureStats {
    /// Textures created so far.
    pub created: u64,
    /// Textures whose last handle has been dropped.
    pub disposed: u64,
}

impl TextureStats {
    /// Textures still alive.
    pub fn live(&self) -> u64 {
        self.created.saturating_sub(self.disposed)
    }
}

impl TextureTracker {
    /// Fresh tracker with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counters.
    pub fn stats(&self) -> TextureStats {
        TextureStats {
            created: self.inner.created.load(Ordering::Acquire),
            disposed: self.inner.disposed.load(Ordering::Acquire),
        }
    }

    fn next_id(&self) -> u64 {
        self.inner.created.fetch_add(1, Ordering::AcqRel) + 1
    }
}

struct MipLevel {
    width: u32,
    height: u32,
    texels: Vec<Rgba>,
}

impl MipLevel {
    fn texel(&self, x: i64, y: i64) -> Rgba {
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        self.texels[y * self.width as usize + x]
    }

    fn nearest(&self, u: f32, v: f32) -> Rgba {
        let (fx, fy) = self.texel_space(u, v);
        self.texel(fx.floor() as i64, fy.floor() as i64)
    }

    fn bilinear(&self, u: f32, v: f32) -> Rgba {
        let (fx, fy) = self.texel_space(u, v);
        let (fx, fy) = (fx - 0.5, fy - 0.5);
        let (x0, y0) = (fx.floor(), fy.floor());
        let (tx, ty) = (fx - x0, fy - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let a = self.texel(x0, y0);
        let b = self.texel(x0 + 1, y0);
        let c = self.texel(x0, y0 + 1);
        let d = self.texel(x0 + 1, y0 + 1);
        std::array::from_fn(|i| mix(mix(a[i], b[i], tx), mix(c[i], d[i], tx), ty))
    }

    // v = 0 is the bottom row; texels are stored top row first.
    fn texel_space(&self, u: f32, v: f32) -> (f32, f32) {
        let u = clamp01(u);
        let v = clamp01(v);
        (u * self.width as f32, (1.0 - v) * self.height as f32)
    }

    fn downsample(&self) -> Option<Self> {
        if self.width == 1 && self.height == 1 {
            return None;
        }
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let (sx, sy) = (i64::from(x) * 2, i64::from(y) * 2);
                let quad = [
                    self.texel(sx, sy),
                    self.texel(sx + 1, sy),
                    self.texel(sx, sy + 1),
                    self.texel(sx + 1, sy + 1),
                ];
                texels.push(std::array::from_fn(|i| {
                    quad.iter().map(|t| t[i]).sum::<f32>() / 4.0
                }));
            }
        }
        Some(Self {
            width,
            height,
            texels,
        })
    }
}

struct TextureInner {
    id: u64,
    desc: TextureDesc,
    levels: Vec<MipLevel>,
    tracker: TextureTracker,
}

impl Drop for TextureInner {
    fn drop(&mut self) {
        self.tracker
            .inner
            .disposed
            .fetch_add(1, Ordering::AcqRel);
        tracing::trace!(id = self.id, "texture disposed");
    }
}

/// Shared handle to an uploaded texture.
///
/// Cloning shares the texels; the texture is disposed when the last handle is dropped.
#[derive(Clone)]
pub struct Texture {
    inner: Arc<TextureInner>,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.inner.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("desc", &self.inner.desc)
            .field("levels", &self.inner.levels.len())
            .finish()
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Texture {
    /// Upload decoded texels with the given configuration, generating mips when requested.
    pub fn upload(image: DecodedImage, desc: TextureDesc, tracker: &TextureTracker) -> Self {
        let mut levels = vec![MipLevel {
            width: image.width.max(1),
            height: image.height.max(1),
            texels: if image.texels.is_empty() {
                vec![[0.0; 4]]
            } else {
                image.texels
            },
        }];
        if desc.mipmaps {
            while let Some(next) = levels.last().and_then(MipLevel::downsample) {
                levels.push(next);
            }
        }

        Self {
            inner: Arc::new(TextureInner {
                id: tracker.next_id(),
                desc,
                levels,
                tracker: tracker.clone(),
            }),
        }
    }

    /// Single-color texture, mostly useful for tests and fallbacks.
    pub fn solid(
        color: Rgba,
        width: u32,
        height: u32,
        desc: TextureDesc,
        tracker: &TextureTracker,
    ) -> Self {
        let image = DecodedImage {
            width,
            height,
            texels: vec![color; (width as usize) * (height as usize)],
        };
        Self::upload(image, desc, tracker)
    }

    /// Tracker-unique identifier.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Sampling configuration.
    pub fn desc(&self) -> TextureDesc {
        self.inner.desc
    }

    /// Level-0 width.
    pub fn width(&self) -> u32 {
        self.inner.levels[0].width
    }

    /// Level-0 height.
    pub fn height(&self) -> u32 {
        self.inner.levels[0].height
    }

    /// Number of mip levels, including level 0.
    pub fn mip_levels(&self) -> usize {
        self.inner.levels.len()
    }

    /// Release this handle. The texels are freed once no other handle remains.
    pub fn dispose(self) {
        tracing::trace!(id = self.inner.id, "texture handle released");
    }

    /// Sample stored values with clamp-to-edge addressing (`v = 0` is the bottom edge).
    ///
    /// `lod` only matters for trilinear textures.
    pub fn sample(&self, u: f32, v: f32, lod: f32) -> Rgba {
        let levels = &self.inner.levels;
        match self.inner.desc.filter {
            FilterMode::Nearest => levels[0].nearest(u, v),
            FilterMode::Linear => levels[0].bilinear(u, v),
            FilterMode::Trilinear => {
                let max = (levels.len() - 1) as f32;
                let lod = if lod.is_finite() {
                    lod.clamp(0.0, max)
                } else {
                    0.0
                };
                let lo = lod.floor();
                let t = lod - lo;
                let a = levels[lo as usize].bilinear(u, v);
                if t <= 0.0 {
                    return a;
                }
                let b = levels[(lo as usize + 1).min(levels.len() - 1)].bilinear(u, v);
                std::array::from_fn(|i| mix(a[i], b[i], t))
            }
        }
    }

    /// Sample as a display-referred color: linear-tagged textures are sRGB-encoded on the way
    /// out, everything else is returned as stored.
    pub fn sample_color(&self, u: f32, v: f32, lod: f32) -> Rgba {
        let s = self.sample(u, v, lod);
        match self.inner.desc.color_space {
            ColorSpace::Linear => [
                clamp01(linear_to_srgb(s[0])),
                clamp01(linear_to_srgb(s[1])),
                clamp01(linear_to_srgb(s[2])),
                clamp01(s[3]),
            ],
            ColorSpace::Srgb | ColorSpace::None => s,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/texture.rs"]
mod tests;
