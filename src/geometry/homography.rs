use crate::foundation::{
    core::Point,
    error::{MockupError, MockupResult},
};

/// Pivot magnitude below which the 8x8 system is treated as singular.
pub const PIVOT_EPSILON: f64 = 1e-10;

/// 3x3 projective transform in row-major order, normalized so `h[8] == 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    m: [f64; 9],
}

impl Homography {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    /// Row-major coefficients.
    pub fn as_array(&self) -> [f64; 9] {
        self.m
    }

    /// Map `p` through the transform with homogeneous division.
    ///
    /// Returns `None` when the point lands on the line at infinity.
    pub fn apply(&self, p: Point) -> Option<Point> {
        let m = &self.m;
        let x = m[0] * p.x + m[1] * p.y + m[2];
        let y = m[3] * p.x + m[4] * p.y + m[5];
        let w = m[6] * p.x + m[7] * p.y + m[8];
        if w.abs() < PIVOT_EPSILON {
            return None;
        }
        Some(Point::new(x / w, y / w))
    }
}

/// Solve the projective transform mapping each `src[i]` onto `dst[i]`.
///
/// Each correspondence contributes two rows of the 8x9 DLT system; fixing `h9 = 1` leaves an 8x8
/// system solved by Gaussian elimination with partial pivoting and back-substitution.
pub fn solve_homography(src: &[Point], dst: &[Point]) -> MockupResult<Homography> {
    if src.len() != 4 || dst.len() != 4 {
        return Err(MockupError::invalid_input(format!(
            "homography needs exactly 4 source and 4 destination points (got {} and {})",
            src.len(),
            dst.len()
        )));
    }
    if src.iter().chain(dst).any(|p| !p.is_finite()) {
        return Err(MockupError::invalid_input(
            "homography points must be finite",
        ));
    }

    let mut a = [[0.0_f64; 8]; 8];
    let mut b = [0.0_f64; 8];
    for i in 0..4 {
        let (x, y) = (src[i].x, src[i].y);
        let (u, v) = (dst[i].x, dst[i].y);
        a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u];
        b[2 * i] = u;
        a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v];
        b[2 * i + 1] = v;
    }

    // Forward elimination.
    for col in 0..8 {
        let mut pivot_row = col;
        let mut pivot_abs = a[col][col].abs();
        for row in (col + 1)..8 {
            let v = a[row][col].abs();
            if v > pivot_abs {
                pivot_abs = v;
                pivot_row = row;
            }
        }
        if pivot_abs < PIVOT_EPSILON {
            return Err(MockupError::singular(format!(
                "pivot {pivot_abs:e} in column {col}; points are degenerate or collinear"
            )));
        }
        if pivot_row != col {
            a.swap(col, pivot_row);
            b.swap(col, pivot_row);
        }

        for row in (col + 1)..8 {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..8 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back-substitution.
    let mut h = [0.0_f64; 8];
    for row in (0..8).rev() {
        let mut acc = b[row];
        for k in (row + 1)..8 {
            acc -= a[row][k] * h[k];
        }
        h[row] = acc / a[row][row];
    }

    if h.iter().any(|v| !v.is_finite()) {
        return Err(MockupError::singular(
            "homography solution is not finite",
        ));
    }

    Ok(Homography {
        m: [h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0],
    })
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/homography.rs"]
mod tests;
