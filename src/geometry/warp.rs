//! Subdivided quad meshes that place a flat design onto an arbitrary quadrilateral.
//!
//! Positions are produced in centered render space (origin at the plane center, +Y up) so the
//! renderer can map them straight onto the canvas. UVs follow the GL convention (`v = 0` at the
//! bottom edge of the image), which is why both the position and the UV flip the vertical axis.

use crate::foundation::core::{NormalizedBox, Point};
use crate::geometry::homography::{Homography, solve_homography};

/// Reference grid granularity.
pub const DEFAULT_GRID: u32 = 16;

/// How grid points are distributed inside the destination quad.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarpInterpolation {
    /// Edge lerps followed by a vertical lerp.
    #[default]
    Bilinear,
    /// Grid points mapped through the unit-square → quad homography.
    Projective,
}

/// Warp mesh build options.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WarpOpts {
    /// Cells per side (`N`); values below 1 are treated as 1.
    pub grid: u32,
    /// Interpolation used for interior vertices.
    pub interpolation: WarpInterpolation,
}

impl Default for WarpOpts {
    fn default() -> Self {
        Self {
            grid: DEFAULT_GRID,
            interpolation: WarpInterpolation::Bilinear,
        }
    }
}

/// Triangle mesh with per-vertex UVs.
#[derive(Clone, Debug, PartialEq)]
pub struct WarpMesh {
    /// Vertex positions `[x, y, z]` in centered pixel space.
    pub positions: Vec<[f32; 3]>,
    /// Texture coordinates, one per vertex.
    pub uvs: Vec<[f32; 2]>,
    /// Triangle list indices into `positions`.
    pub indices: Vec<u32>,
}

impl WarpMesh {
    /// Minimal near-zero-area mesh used while the destination or source is unavailable.
    pub fn placeholder() -> Self {
        const E: f32 = 1e-4;
        Self {
            positions: vec![[-E, -E, 0.0], [E, -E, 0.0], [E, E, 0.0], [-E, E, 0.0]],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// Full axis-aligned plane of `width` x `height`, i.e. the warp of [`NormalizedBox::UNIT`]
    /// with a single cell.
    pub fn plane(width: f32, height: f32) -> Self {
        build_bilinear(&NormalizedBox::UNIT, 1, width, height)
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Return `true` when this is (or looks like) the placeholder mesh.
    pub fn is_placeholder(&self) -> bool {
        self.positions.len() == 4
            && self
                .positions
                .iter()
                .all(|p| p[0].abs() < 1e-3 && p[1].abs() < 1e-3)
    }
}

/// Build a mesh placing a design onto `dest` within a `width` x `height` plane.
///
/// Missing destination or source yields [`WarpMesh::placeholder`] instead of failing, so callers
/// can keep drawing while the design is still loading.
pub fn build_warp_mesh(
    dest: Option<&NormalizedBox>,
    source_ready: bool,
    width: f32,
    height: f32,
    opts: WarpOpts,
) -> WarpMesh {
    let Some(dest) = dest else {
        return WarpMesh::placeholder();
    };
    if !source_ready || !(width > 0.0 && height > 0.0) {
        return WarpMesh::placeholder();
    }

    let grid = opts.grid.max(1);
    match opts.interpolation {
        WarpInterpolation::Bilinear => build_bilinear(dest, grid, width, height),
        WarpInterpolation::Projective => {
            let unit = NormalizedBox::UNIT.corners();
            match solve_homography(&unit, &dest.corners()) {
                Ok(h) => build_projective(&h, grid, width, height),
                Err(err) => {
                    tracing::warn!(%err, "degenerate placement box; using placeholder mesh");
                    WarpMesh::placeholder()
                }
            }
        }
    }
}

fn build_bilinear(dest: &NormalizedBox, grid: u32, width: f32, height: f32) -> WarpMesh {
    build_grid(grid, width, height, |u, v| Some(dest.lerp(u, v)))
        .unwrap_or_else(WarpMesh::placeholder)
}

fn build_projective(h: &Homography, grid: u32, width: f32, height: f32) -> WarpMesh {
    build_grid(grid, width, height, |u, v| h.apply(Point::new(u, v))).unwrap_or_else(|| {
        tracing::warn!("projective warp hit the line at infinity; using placeholder mesh");
        WarpMesh::placeholder()
    })
}

fn build_grid(
    grid: u32,
    width: f32,
    height: f32,
    mut map: impl FnMut(f64, f64) -> Option<Point>,
) -> Option<WarpMesh> {
    let side = grid + 1;
    let vertex_count = (side * side) as usize;
    let mut positions = Vec::with_capacity(vertex_count);
    let mut uvs = Vec::with_capacity(vertex_count);

    let (w, h) = (f64::from(width), f64::from(height));
    for row in 0..side {
        let v = f64::from(row) / f64::from(grid);
        for col in 0..side {
            let u = f64::from(col) / f64::from(grid);
            let n = map(u, v)?;
            let x = n.x * w - w / 2.0;
            let y = (1.0 - n.y) * h - h / 2.0;
            positions.push([x as f32, y as f32, 0.0]);
            uvs.push([u as f32, (1.0 - v) as f32]);
        }
    }

    let mut indices = Vec::with_capacity((grid * grid * 6) as usize);
    for row in 0..grid {
        for col in 0..grid {
            let a = row * side + col;
            let b = a + 1;
            let c = a + side;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    Some(WarpMesh {
        positions,
        uvs,
        indices,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/warp.rs"]
mod tests;
