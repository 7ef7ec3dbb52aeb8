use std::collections::HashMap;

use super::*;
use crate::foundation::core::{NormalizedBox, Point};
use crate::geometry::warp::{WarpOpts, build_warp_mesh};

fn target(w: u32, h: u32) -> DrawTarget {
    DrawTarget {
        width: w,
        height: h,
        plane: [w as f32, h as f32],
    }
}

fn coverage(mesh: &WarpMesh, t: DrawTarget) -> HashMap<[u32; 2], usize> {
    let mut hits = HashMap::new();
    rasterize(mesh, t, |f| *hits.entry(f.pixel).or_insert(0) += 1);
    hits
}

#[test]
fn plane_covers_every_pixel_once() {
    let mesh = WarpMesh::plane(8.0, 6.0);
    let hits = coverage(&mesh, target(8, 6));
    assert_eq!(hits.len(), 48);
    assert!(hits.values().all(|&n| n == 1));
}

#[test]
fn subdivided_grid_has_no_overlaps_or_gaps() {
    let mesh = build_warp_mesh(Some(&NormalizedBox::UNIT), true, 64.0, 64.0, WarpOpts::default());
    assert_eq!(mesh.triangle_count(), 512);
    let hits = coverage(&mesh, target(64, 64));
    assert_eq!(hits.len(), 64 * 64);
    let doubled: Vec<_> = hits.iter().filter(|(_, n)| **n != 1).collect();
    assert!(doubled.is_empty(), "pixels hit more than once: {doubled:?}");
}

#[test]
fn placeholder_emits_nothing() {
    assert_eq!(rasterize(&WarpMesh::placeholder(), target(4, 4), |_| {}), 0);
}

#[test]
fn clockwise_triangles_are_culled() {
    let mut mesh = WarpMesh::plane(4.0, 4.0);
    for tri in mesh.indices.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
    assert_eq!(rasterize(&mesh, target(4, 4), |_| {}), 0);
}

#[test]
fn fragments_carry_gl_oriented_coordinates() {
    let mesh = WarpMesh::plane(4.0, 4.0);
    let mut seen = HashMap::new();
    rasterize(&mesh, target(4, 4), |f| {
        seen.insert(f.pixel, *f);
    });
    let top_left = seen[&[0, 0]];
    assert!((top_left.uv[0] - 0.125).abs() < 1e-6);
    assert!((top_left.uv[1] - 0.875).abs() < 1e-6);
    assert_eq!(top_left.screen_uv, [0.125, 0.875]);
    assert_eq!(top_left.plane_uv, [0.125, 0.875]);
    assert_eq!(top_left.canvas, [4.0, 4.0]);

    let bottom_right = seen[&[3, 3]];
    assert!((bottom_right.uv[0] - 0.875).abs() < 1e-6);
    assert!((bottom_right.uv[1] - 0.125).abs() < 1e-6);
    assert!((top_left.footprint - 0.25).abs() < 1e-6);
}

#[test]
fn smaller_plane_is_centered_on_the_canvas() {
    let mesh = WarpMesh::plane(2.0, 2.0);
    let t = DrawTarget {
        width: 4,
        height: 4,
        plane: [2.0, 2.0],
    };
    let hits = coverage(&mesh, t);
    let mut pixels: Vec<_> = hits.keys().copied().collect();
    pixels.sort();
    assert_eq!(pixels, vec![[1, 1], [1, 2], [2, 1], [2, 2]]);
}

#[test]
fn warped_quad_only_covers_its_placement() {
    let right_half = NormalizedBox {
        top_left: Point::new(0.5, 0.0),
        top_right: Point::new(1.0, 0.0),
        bottom_right: Point::new(1.0, 1.0),
        bottom_left: Point::new(0.5, 1.0),
    };
    let mesh = build_warp_mesh(Some(&right_half), true, 8.0, 8.0, WarpOpts::default());
    let hits = coverage(&mesh, target(8, 8));
    assert_eq!(hits.len(), 32);
    assert!(hits.keys().all(|[x, _]| *x >= 4));
}
