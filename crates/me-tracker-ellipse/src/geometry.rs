//! Geometric ellipse parameters derived from the implicit conic.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::conic::ConicModel;
use crate::error::FitError;

/// Center, semi-axes and orientation of the fitted ellipse.
///
/// `a` is the semiminor and `b` the semimajor axis (`b >= a`); `e` is the
/// angle between the major axis and the +x axis, canonical in
/// `[-π/2, π/2)` at creation and tracked continuously across frames
/// afterwards. `cos_e`/`sin_e` are cached for the parametrization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EllipseGeometry {
    pub center: Point2<f64>,
    pub a: f64,
    pub b: f64,
    pub e: f64,
    pub cos_e: f64,
    pub sin_e: f64,
}

/// Wrap an angle difference into `[-π/2, π/2)` (mod π).
fn wrap_half_turn(d: f64) -> f64 {
    (d + FRAC_PI_2).rem_euclid(PI) - FRAC_PI_2
}

impl EllipseGeometry {
    /// Derive geometry from conic coefficients.
    ///
    /// The center comes from a 2×2 solve on the first-order terms, the
    /// semi-axes from the closed-form eigenvalues of `[[1, K1], [K1, K0]]`
    /// and the orientation from the minor eigenvalue's eigenvector (the
    /// major axis). When `previous_e` is given the orientation follows it
    /// by the shortest mod-π step instead of snapping to the canonical
    /// range, so consecutive frames never flip by π at the range boundary.
    pub fn from_conic(
        conic: &ConicModel,
        previous_e: Option<f64>,
    ) -> Result<Self, FitError> {
        if !conic.is_elliptic() {
            return Err(FitError::DegenerateConic);
        }
        let [k0, k1, k2, k3, _] = conic.k;

        // Zero-gradient point: x + K1 y + K2 = 0, K1 x + K0 y + K3 = 0.
        let det = k0 - k1 * k1;
        let center = Point2::new((k1 * k3 - k0 * k2) / det, (k1 * k2 - k3) / det);

        // The equation value at the center must be negative for real points
        // to exist on the contour.
        let fc = conic.residual(center);
        if !(fc < 0.0) || !fc.is_finite() {
            return Err(FitError::DegenerateConic);
        }

        let half_gap = ((k0 - 1.0) * (k0 - 1.0) + 4.0 * k1 * k1).sqrt() * 0.5;
        let mid = (1.0 + k0) * 0.5;
        let lambda_min = mid - half_gap;
        let lambda_max = mid + half_gap;
        if lambda_min <= 0.0 {
            return Err(FitError::DegenerateConic);
        }

        let b = (-fc / lambda_min).sqrt();
        let a = (-fc / lambda_max).sqrt();

        let mut e = if k1.abs() < 1e-12 {
            // Axis-aligned: K0 >= 1 stretches y, so the major axis is x.
            if k0 >= 1.0 {
                0.0
            } else {
                -FRAC_PI_2
            }
        } else {
            // Eigenvector of lambda_min: (1 - λ)vx + K1 vy = 0.
            wrap_half_turn((lambda_min - 1.0).atan2(k1))
        };
        if let Some(prev) = previous_e {
            e = prev + wrap_half_turn(e - prev);
        }

        Ok(Self {
            center,
            a,
            b,
            e,
            cos_e: e.cos(),
            sin_e: e.sin(),
        })
    }

    /// Point on the ellipse at parametric angle `alpha`:
    ///
    /// `x = xc + b·cos(e)·cos(α) − a·sin(e)·sin(α)`
    /// `y = yc + b·sin(e)·cos(α) + a·cos(e)·sin(α)`
    pub fn point_at(&self, alpha: f64) -> Point2<f64> {
        let (sa, ca) = alpha.sin_cos();
        Point2::new(
            self.center.x + self.b * self.cos_e * ca - self.a * self.sin_e * sa,
            self.center.y + self.b * self.sin_e * ca + self.a * self.cos_e * sa,
        )
    }

    /// Parametric angle of (the radial projection of) `p`, in `(-π, π]`.
    pub fn angle_of(&self, p: Point2<f64>) -> f64 {
        let dx = p.x - self.center.x;
        let dy = p.y - self.center.y;
        let u = self.cos_e * dx + self.sin_e * dy;
        let v = -self.sin_e * dx + self.cos_e * dy;
        (v / self.a).atan2(u / self.b)
    }

    /// Direction of the outward normal at parametric angle `alpha`.
    pub fn normal_angle_at(&self, alpha: f64) -> f64 {
        let (sa, ca) = alpha.sin_cos();
        // Gradient of (u/b)² + (v/a)² rotated back into the image frame.
        let nx = self.cos_e * ca / self.b - self.sin_e * sa / self.a;
        let ny = self.sin_e * ca / self.b + self.cos_e * sa / self.a;
        ny.atan2(nx)
    }

    /// Convert back to implicit coefficients (unit leading term).
    pub fn to_conic(&self) -> ConicModel {
        let (xc, yc) = (self.center.x, self.center.y);
        let (ce, se) = (self.cos_e, self.sin_e);
        let inv_b2 = 1.0 / (self.b * self.b);
        let inv_a2 = 1.0 / (self.a * self.a);

        // Quadratic form in centered coords, then scaled to a unit x² term.
        let qxx = ce * ce * inv_b2 + se * se * inv_a2;
        let qyy = se * se * inv_b2 + ce * ce * inv_a2;
        let qxy = ce * se * (inv_b2 - inv_a2);

        let k0 = qyy / qxx;
        let k1 = qxy / qxx;
        let k2 = -xc - k1 * yc;
        let k3 = -k0 * yc - k1 * xc;
        let k4 = xc * xc + k0 * yc * yc + 2.0 * k1 * xc * yc - 1.0 / qxx;
        ConicModel {
            k: [k0, k1, k2, k3, k4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference() -> EllipseGeometry {
        let e: f64 = 0.3;
        EllipseGeometry {
            center: Point2::new(200.0, 200.0),
            a: 50.0,
            b: 80.0,
            e,
            cos_e: e.cos(),
            sin_e: e.sin(),
        }
    }

    #[test]
    fn conic_roundtrip() {
        let g = reference();
        let c = g.to_conic();
        assert!(c.is_elliptic());
        let g2 = EllipseGeometry::from_conic(&c, None).expect("elliptic");
        assert_relative_eq!(g2.center.x, g.center.x, epsilon = 1e-9);
        assert_relative_eq!(g2.center.y, g.center.y, epsilon = 1e-9);
        assert_relative_eq!(g2.a, g.a, epsilon = 1e-9);
        assert_relative_eq!(g2.b, g.b, epsilon = 1e-9);
        assert_relative_eq!(g2.e, g.e, epsilon = 1e-9);
    }

    #[test]
    fn points_on_contour_have_zero_residual() {
        let g = reference();
        let c = g.to_conic();
        for k in 0..32 {
            let alpha = k as f64 * std::f64::consts::TAU / 32.0;
            let p = g.point_at(alpha);
            assert!(
                c.residual(p).abs() < 1e-8,
                "residual at alpha {alpha}: {}",
                c.residual(p)
            );
        }
    }

    #[test]
    fn angle_of_inverts_point_at() {
        let g = reference();
        for k in 0..16 {
            let alpha = -std::f64::consts::PI + 0.1 + k as f64 * 0.35;
            let p = g.point_at(alpha);
            assert_relative_eq!(g.angle_of(p), alpha, epsilon = 1e-10);
        }
    }

    #[test]
    fn axis_aligned_orientations() {
        // Major axis along x.
        let c = ConicModel {
            k: [4.0, 0.0, 0.0, 0.0, -4.0],
        };
        let g = EllipseGeometry::from_conic(&c, None).unwrap();
        assert_relative_eq!(g.e, 0.0, epsilon = 1e-12);
        assert_relative_eq!(g.b, 2.0, epsilon = 1e-12);
        assert_relative_eq!(g.a, 1.0, epsilon = 1e-12);

        // Major axis along y.
        let c = ConicModel {
            k: [0.25, 0.0, 0.0, 0.0, -1.0],
        };
        let g = EllipseGeometry::from_conic(&c, None).unwrap();
        assert_relative_eq!(g.e.abs(), FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(g.b, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn orientation_follows_previous_frame() {
        let mut g = reference();
        g.e = 1.60; // just past the canonical upper boundary
        g.cos_e = g.e.cos();
        g.sin_e = g.e.sin();
        let c = g.to_conic();

        // Without history the canonical representative is near -π/2.
        let fresh = EllipseGeometry::from_conic(&c, None).unwrap();
        assert!(fresh.e < 0.0);

        // With history the orientation stays next to the previous value.
        let tracked = EllipseGeometry::from_conic(&c, Some(1.58)).unwrap();
        assert_relative_eq!(tracked.e, 1.60, epsilon = 1e-9);
    }

    #[test]
    fn imaginary_ellipse_rejected() {
        // x² + y² + 1 = 0 has no real points.
        let c = ConicModel {
            k: [1.0, 0.0, 0.0, 0.0, 1.0],
        };
        assert_eq!(
            EllipseGeometry::from_conic(&c, None),
            Err(FitError::DegenerateConic)
        );
    }
}
