//! Math shared by the "flat color relit by base luminance" programs.

use crate::foundation::core::Rgb;
use crate::foundation::math::{
    LUMA_WEIGHTS, clamp01, clamp3, dot3, hash21, mean3, mix, mix3, scale3, smoothstep,
};
use crate::shading::constants::ShadingConstants;

pub(crate) const BRIGHTNESS: &str = "brightness";
pub(crate) const CONTRAST: &str = "contrast";
pub(crate) const HIGHLIGHTS_INTENSITY: &str = "highlights_intensity";
pub(crate) const COLOR: &str = "color";
pub(crate) const SHADOW_INTENSITY: &str = "shadow_intensity";
pub(crate) const HIGHLIGHT_INTENSITY: &str = "highlight_intensity";
pub(crate) const NOISE_THRESHOLD: &str = "noise_threshold";
pub(crate) const WARPED: &str = "warped";

/// Per-layer relighting parameters.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Relight {
    pub(crate) color: Rgb,
    pub(crate) shadow_intensity: f32,
    pub(crate) highlight_intensity: f32,
    pub(crate) highlights_global: f32,
}

/// Normalized lighting for a base brightness: a power curve blended with its S-curve.
///
/// Monotonic on `0..=1`, maps `0 → 0` and `1 → 1`.
pub(crate) fn tone_curve(brightness: f32, k: &ShadingConstants) -> f32 {
    let p = clamp01(brightness).powf(k.tone_gamma.max(1e-3));
    clamp01(mix(p, smoothstep(0.0, 1.0, p), clamp01(k.s_curve_mix)))
}

/// Relight `r.color` by the luminance of `base`.
pub(crate) fn relight(base: Rgb, r: &Relight, k: &ShadingConstants) -> Rgb {
    let lighting = tone_curve(mean3(base), k);
    let luma = dot3(r.color, LUMA_WEIGHTS);

    // Dark colors get gentler shadows, bright colors compressed highlights.
    let shadow_strength = clamp01(
        r.shadow_intensity * k.shadow_scale * mix(k.dark_color_shadow_relief, 1.0, luma),
    );
    let highlight_strength = clamp01(
        r.highlight_intensity
            * k.highlight_scale
            * (1.0 - k.bright_color_highlight_compression * luma)
            * r.highlights_global.max(0.0),
    );

    let shade = mix(k.shade_floor, 1.0, lighting);
    let shadow_variant = scale3(r.color, mix(1.0, shade, shadow_strength));
    let highlight_variant = mix3(r.color, [1.0; 3], highlight_strength * lighting);
    mix3(shadow_variant, highlight_variant, lighting)
}

/// Signed grain for a pixel: two-frequency hash noise scaled by `noise`, plus fixed dither.
pub(crate) fn grain(pixel: [u32; 2], noise: f32, k: &ShadingConstants) -> f32 {
    let (x, y) = (f64::from(pixel[0]), f64::from(pixel[1]));
    let lo = f64::from(k.noise_low_frequency);
    let hi = f64::from(k.noise_high_frequency);
    let coarse = hash21((x * lo).floor(), (y * lo).floor());
    let fine = hash21((x * hi).floor() + 17.0, (y * hi).floor() + 31.0);
    let n = mix(coarse, fine, clamp01(k.noise_mix)) - 0.5;
    let dither = hash21(x + 0.5, y + 0.5) - 0.5;
    n * noise + dither * k.dither_amplitude
}

/// Global brightness offset and contrast around mid-gray.
pub(crate) fn global_tone(rgb: Rgb, brightness: f32, contrast: f32) -> Rgb {
    clamp3(rgb.map(|c| (c - 0.5) * contrast + 0.5 + brightness))
}

/// Soft coverage from a mask's red channel; `None` means discard.
pub(crate) fn mask_alpha(mask_r: f32, k: &ShadingConstants) -> Option<f32> {
    let alpha = smoothstep(k.mask_low, k.mask_high, mask_r);
    if mask_r < k.discard_floor && alpha < k.discard_floor {
        return None;
    }
    Some(alpha)
}

#[cfg(test)]
#[path = "../../tests/unit/shading/relit.rs"]
mod tests;
