//! Projective math and placement meshes.

/// 4-point homography solver.
pub mod homography;
/// N×N warp mesh builder.
pub mod warp;
