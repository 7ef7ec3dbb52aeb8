//! Triangle rasterization of warp meshes into fragments.
//!
//! Mesh positions are in centered render space (+Y up); the framebuffer is addressed with a
//! top-left origin. Pixels are sampled at their centers and shared edges are owned by exactly one
//! triangle, so adjacent grid cells neither overlap nor leave gaps.

use crate::geometry::warp::WarpMesh;
use crate::shading::program::Fragment;

type P2 = [f32; 2];

/// Screen-space setup for one draw.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DrawTarget {
    /// Framebuffer size in pixels.
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// Layer plane size in canvas pixels; `plane_uv` is relative to it.
    pub(crate) plane: [f32; 2],
}

/// Rasterize every front-facing triangle of `mesh`, calling `emit` once per covered pixel.
///
/// Returns the number of fragments emitted.
pub(crate) fn rasterize(
    mesh: &WarpMesh,
    target: DrawTarget,
    mut emit: impl FnMut(&Fragment),
) -> usize {
    let (w, h) = (target.width as f32, target.height as f32);
    let mut count = 0;
    for [i0, i1, i2] in mesh.triangles() {
        let (Some(v0), Some(v1), Some(v2)) = (
            mesh.positions.get(i0 as usize),
            mesh.positions.get(i1 as usize),
            mesh.positions.get(i2 as usize),
        ) else {
            continue;
        };
        let (Some(&t0), Some(&t1), Some(&t2)) = (
            mesh.uvs.get(i0 as usize),
            mesh.uvs.get(i1 as usize),
            mesh.uvs.get(i2 as usize),
        ) else {
            continue;
        };

        // Back faces (clockwise in render space) are culled.
        let render_area = (v1[0] - v0[0]) * (v2[1] - v0[1]) - (v1[1] - v0[1]) * (v2[0] - v0[0]);
        if render_area.is_nan() || render_area <= 1e-9 {
            continue;
        }

        let to_screen = |v: &[f32; 3]| [v[0] + w / 2.0, h / 2.0 - v[1]];
        // Flipping Y reverses the winding, so swap to keep a positive screen-space area.
        let (p0, p1, p2) = (to_screen(v0), to_screen(v2), to_screen(v1));
        let (t0, t1, t2) = (t0, t2, t1);
        count += raster_triangle([p0, p1, p2], [t0, t1, t2], target, &mut emit);
    }
    count
}

fn edge(a: P2, b: P2, p: P2) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

// Antisymmetric tie-break: of the two triangles sharing an edge, exactly one owns it.
fn owns_edge(a: P2, b: P2) -> bool {
    let dy = b[1] - a[1];
    dy < 0.0 || (dy == 0.0 && b[0] - a[0] > 0.0)
}

fn inside(w: f32, a: P2, b: P2) -> bool {
    w > 0.0 || (w == 0.0 && owns_edge(a, b))
}

fn raster_triangle(
    p: [P2; 3],
    t: [P2; 3],
    target: DrawTarget,
    emit: &mut impl FnMut(&Fragment),
) -> usize {
    let area = edge(p[0], p[1], p[2]);
    if area.is_nan() || area <= 0.0 {
        return 0;
    }

    let min_x = p.iter().map(|v| v[0]).fold(f32::INFINITY, f32::min);
    let max_x = p.iter().map(|v| v[0]).fold(f32::NEG_INFINITY, f32::max);
    let min_y = p.iter().map(|v| v[1]).fold(f32::INFINITY, f32::min);
    let max_y = p.iter().map(|v| v[1]).fold(f32::NEG_INFINITY, f32::max);
    if max_x < 0.0 || max_y < 0.0 || min_x > target.width as f32 || min_y > target.height as f32
    {
        return 0;
    }
    let x0 = (min_x - 0.5).floor().max(0.0) as u32;
    let y0 = (min_y - 0.5).floor().max(0.0) as u32;
    let x1 = ((max_x - 0.5).ceil().max(0.0) as u32).min(target.width.saturating_sub(1));
    let y1 = ((max_y - 0.5).ceil().max(0.0) as u32).min(target.height.saturating_sub(1));

    // Constant UV derivatives per triangle, for mip selection.
    let grad = |a: P2, b: P2| [-(b[1] - a[1]) / area, (b[0] - a[0]) / area];
    let g = [grad(p[1], p[2]), grad(p[2], p[0]), grad(p[0], p[1])];
    let d = |axis: usize, comp: usize| -> f32 { (0..3).map(|i| g[i][axis] * t[i][comp]).sum() };
    let footprint = d(0, 0).hypot(d(0, 1)).max(d(1, 0).hypot(d(1, 1)));

    let (w, h) = (target.width as f32, target.height as f32);
    let mut count = 0;
    for py in y0..=y1 {
        for px in x0..=x1 {
            let c = [px as f32 + 0.5, py as f32 + 0.5];
            let w0 = edge(p[1], p[2], c);
            let w1 = edge(p[2], p[0], c);
            let w2 = edge(p[0], p[1], c);
            if !(inside(w0, p[1], p[2]) && inside(w1, p[2], p[0]) && inside(w2, p[0], p[1])) {
                continue;
            }
            let l = [w0 / area, w1 / area, w2 / area];
            let uv = [
                l[0] * t[0][0] + l[1] * t[1][0] + l[2] * t[2][0],
                l[0] * t[0][1] + l[1] * t[1][1] + l[2] * t[2][1],
            ];
            let (cx, cy) = (c[0] - w / 2.0, h / 2.0 - c[1]);
            let frag = Fragment {
                uv,
                plane_uv: [
                    cx / target.plane[0].max(f32::EPSILON) + 0.5,
                    cy / target.plane[1].max(f32::EPSILON) + 0.5,
                ],
                screen_uv: [c[0] / w, 1.0 - c[1] / h],
                pixel: [px, py],
                footprint,
                canvas: [w, h],
            };
            emit(&frag);
            count += 1;
        }
    }
    count
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
