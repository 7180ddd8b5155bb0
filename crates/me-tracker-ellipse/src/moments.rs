//! Closed-form geometric moments of the fitted ellipse.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::geometry::EllipseGeometry;

/// Raw and central moments of the filled ellipse region.
///
/// Always computed from the full fitted geometry, never from the visible
/// arc only: occlusion narrows the tracked arc range but leaves the
/// moments describing the whole model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MomentSet {
    /// Area.
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m11: f64,
    pub m20: f64,
    pub m02: f64,
    pub mu11: f64,
    pub mu20: f64,
    pub mu02: f64,
}

impl MomentSet {
    /// Analytic moments of a filled oriented ellipse; no iteration, no
    /// pixel sums.
    pub fn of_ellipse(g: &EllipseGeometry) -> Self {
        let (xc, yc) = (g.center.x, g.center.y);
        let (ce, se) = (g.cos_e, g.sin_e);
        let (a2, b2) = (g.a * g.a, g.b * g.b);

        let m00 = PI * g.a * g.b;
        let quarter = 0.25 * m00;

        // Central second moments of an ellipse with semimajor b along e.
        let mu20 = quarter * (b2 * ce * ce + a2 * se * se);
        let mu02 = quarter * (b2 * se * se + a2 * ce * ce);
        let mu11 = quarter * (b2 - a2) * ce * se;

        Self {
            m00,
            m10: xc * m00,
            m01: yc * m00,
            m11: mu11 + m00 * xc * yc,
            m20: mu20 + m00 * xc * xc,
            m02: mu02 + m00 * yc * yc,
            mu11,
            mu20,
            mu02,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn geometry(a: f64, b: f64, e: f64, xc: f64, yc: f64) -> EllipseGeometry {
        EllipseGeometry {
            center: Point2::new(xc, yc),
            a,
            b,
            e,
            cos_e: e.cos(),
            sin_e: e.sin(),
        }
    }

    #[test]
    fn disk_moments() {
        let g = geometry(10.0, 10.0, 0.0, 5.0, -3.0);
        let m = MomentSet::of_ellipse(&g);
        let area = PI * 100.0;
        assert_relative_eq!(m.m00, area, epsilon = 1e-12);
        assert_relative_eq!(m.m10, 5.0 * area, epsilon = 1e-9);
        assert_relative_eq!(m.m01, -3.0 * area, epsilon = 1e-9);
        // Disk: mu20 = mu02 = π r⁴ / 4, mu11 = 0.
        assert_relative_eq!(m.mu20, PI * 1e4 / 4.0, epsilon = 1e-9);
        assert_relative_eq!(m.mu02, PI * 1e4 / 4.0, epsilon = 1e-9);
        assert_relative_eq!(m.mu11, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rotation_preserves_trace_and_area() {
        let axis_aligned = MomentSet::of_ellipse(&geometry(20.0, 60.0, 0.0, 0.0, 0.0));
        let rotated = MomentSet::of_ellipse(&geometry(20.0, 60.0, 0.7, 0.0, 0.0));
        assert_relative_eq!(axis_aligned.m00, rotated.m00, epsilon = 1e-12);
        // mu20 + mu02 is rotation invariant.
        assert_relative_eq!(
            axis_aligned.mu20 + axis_aligned.mu02,
            rotated.mu20 + rotated.mu02,
            epsilon = 1e-9
        );
        assert!(rotated.mu11 > 0.0);
    }

    #[test]
    fn central_moments_match_definition() {
        // mu20 of an axis-aligned ellipse: ∫x² over the region with
        // semi-axis b along x equals π a b³ / 4.
        let g = geometry(30.0, 50.0, 0.0, 100.0, 200.0);
        let m = MomentSet::of_ellipse(&g);
        assert_relative_eq!(m.mu20, PI * 30.0 * 50.0f64.powi(3) / 4.0, epsilon = 1e-9);
        assert_relative_eq!(m.mu02, PI * 50.0 * 30.0f64.powi(3) / 4.0, epsilon = 1e-9);
        assert_relative_eq!(m.m20, m.mu20 + m.m00 * 100.0 * 100.0, epsilon = 1e-9);
    }
}
