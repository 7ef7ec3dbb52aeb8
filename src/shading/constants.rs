/// Tunables of the shading programs.
///
/// The defaults are the empirically tuned look; they encode visual taste rather than a physical
/// model, so they are exposed as configuration instead of being derived.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ShadingConstants {
    /// Exponent of the power part of the tone curve.
    pub tone_gamma: f32,
    /// Blend between the power curve (`0`) and its smoothstep S-curve (`1`).
    pub s_curve_mix: f32,
    /// Darkest shade multiplier reached at zero lighting.
    pub shade_floor: f32,
    /// Shadow strength per unit of `shadow_intensity`.
    pub shadow_scale: f32,
    /// Shadow strength multiplier for a black flat color (white gets `1`).
    pub dark_color_shadow_relief: f32,
    /// Highlight strength per unit of `highlight_intensity`.
    pub highlight_scale: f32,
    /// Fraction of highlight strength removed for a white flat color.
    pub bright_color_highlight_compression: f32,
    /// Coarse noise frequency in cycles per pixel.
    pub noise_low_frequency: f32,
    /// Fine noise frequency in cycles per pixel.
    pub noise_high_frequency: f32,
    /// Blend between coarse (`0`) and fine (`1`) noise.
    pub noise_mix: f32,
    /// Amplitude of the fixed anti-banding dither.
    pub dither_amplitude: f32,
    /// Mask red value where coverage starts.
    pub mask_low: f32,
    /// Mask red value where coverage is full.
    pub mask_high: f32,
    /// Fragments whose mask and alpha are both below this are discarded.
    pub discard_floor: f32,
}

impl Default for ShadingConstants {
    fn default() -> Self {
        Self {
            tone_gamma: 1.2,
            s_curve_mix: 0.5,
            shade_floor: 0.25,
            shadow_scale: 0.2,
            dark_color_shadow_relief: 0.5,
            highlight_scale: 0.2,
            bright_color_highlight_compression: 0.6,
            noise_low_frequency: 0.15,
            noise_high_frequency: 1.0,
            noise_mix: 0.5,
            dither_amplitude: 1.0 / 255.0,
            mask_low: 0.1,
            mask_high: 0.3,
            discard_floor: 0.001,
        }
    }
}
