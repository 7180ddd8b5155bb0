//! Implicit conic representation of the tracked contour.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Implicit conic with a unit leading coefficient:
///
/// `x² + K0·y² + 2·K1·xy + 2·K2·x + 2·K3·y + K4 = 0`
///
/// A circle-locked model has `K0 = 1` and `K1 = 0` exactly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConicModel {
    pub k: [f64; 5],
}

impl ConicModel {
    /// The unit circle at the origin, a convenient test fixture.
    #[cfg(test)]
    pub(crate) fn unit_circle() -> Self {
        Self {
            k: [1.0, 0.0, 0.0, 0.0, -1.0],
        }
    }

    /// Algebraic residual of the implicit equation at `p`. Zero on the
    /// contour, negative inside, positive outside.
    pub fn residual(&self, p: Point2<f64>) -> f64 {
        let [k0, k1, k2, k3, k4] = self.k;
        let (x, y) = (p.x, p.y);
        x * x + k0 * y * y + 2.0 * (k1 * x * y + k2 * x + k3 * y) + k4
    }

    /// Gradient of the implicit equation at `p`; points outward.
    pub fn gradient(&self, p: Point2<f64>) -> Vector2<f64> {
        let [k0, k1, k2, k3, _] = self.k;
        Vector2::new(
            2.0 * (p.x + k1 * p.y + k2),
            2.0 * (k0 * p.y + k1 * p.x + k3),
        )
    }

    /// Direction of the outward contour normal at `p`, radians from +x.
    /// This is the per-point search direction for the edge search.
    pub fn normal_angle(&self, p: Point2<f64>) -> f64 {
        let g = self.gradient(p);
        g.y.atan2(g.x)
    }

    /// True when the quadratic form `[[1, K1], [K1, K0]]` is positive
    /// definite, a necessary condition for the conic to be an ellipse.
    pub fn is_elliptic(&self) -> bool {
        let [k0, k1, ..] = self.k;
        self.k.iter().all(|v| v.is_finite()) && k0 - k1 * k1 > f64::EPSILON
    }
}
