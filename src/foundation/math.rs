use crate::foundation::core::Rgb;

/// Rec. 601 luma weights used for perceptual brightness of flat colors.
pub(crate) const LUMA_WEIGHTS: Rgb = [0.299, 0.587, 0.114];

pub(crate) fn clamp01(x: f32) -> f32 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

pub(crate) fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hermite smoothstep; returns a step function when `edge0 == edge1`.
pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 == edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = clamp01((x - edge0) / (edge1 - edge0));
    t * t * (3.0 - 2.0 * t)
}

pub(crate) fn mix3(a: Rgb, b: Rgb, t: f32) -> Rgb {
    [mix(a[0], b[0], t), mix(a[1], b[1], t), mix(a[2], b[2], t)]
}

pub(crate) fn scale3(a: Rgb, s: f32) -> Rgb {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub(crate) fn clamp3(a: Rgb) -> Rgb {
    [clamp01(a[0]), clamp01(a[1]), clamp01(a[2])]
}

pub(crate) fn dot3(a: Rgb, b: Rgb) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn mean3(a: Rgb) -> f32 {
    (a[0] + a[1] + a[2]) / 3.0
}

/// Deterministic pseudo-random value in `0..1` for a 2D coordinate.
///
/// Classic `fract(sin(dot(p, k)) * 43758.5453)` hash, evaluated in `f64` so results are stable
/// for large pixel coordinates.
pub(crate) fn hash21(x: f64, y: f64) -> f32 {
    let s = (x * 12.9898 + y * 78.233).sin() * 43_758.545_3;
    (s - s.floor()) as f32
}

pub(crate) fn linear_to_srgb(c: f32) -> f32 {
    let c = c.max(0.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

pub(crate) fn unit_to_u8(x: f32) -> u8 {
    (clamp01(x) * 255.0).round() as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
