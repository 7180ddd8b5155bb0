//! The currently-trusted angular interval of the contour.

use std::f64::consts::TAU;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::geometry::EllipseGeometry;
use crate::sample::SamplePoint;

/// Contiguous parametric interval `[alpha1, alpha2]` considered reliably
/// tracked, with the sample positions realizing both extremities.
/// Invariant: `alpha1 <= alpha2 <= alpha1 + 2π`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArcRange {
    pub alpha1: f64,
    pub alpha2: f64,
    pub p1: Point2<f64>,
    pub p2: Point2<f64>,
}

/// Map `alpha` into `[base, base + 2π)`.
pub(crate) fn normalize_from(alpha: f64, base: f64) -> f64 {
    base + (alpha - base).rem_euclid(TAU)
}

impl ArcRange {
    /// Initial interval from two user-given boundary points, walked
    /// counter-clockwise from the first to the second.
    pub fn from_boundary_points(
        geometry: &EllipseGeometry,
        p1: Point2<f64>,
        p2: Point2<f64>,
    ) -> Self {
        let alpha1 = geometry.angle_of(p1);
        let mut alpha2 = geometry.angle_of(p2);
        if alpha2 <= alpha1 {
            alpha2 += TAU;
        }
        Self {
            alpha1,
            alpha2,
            p1,
            p2,
        }
    }

    pub fn span(&self) -> f64 {
        self.alpha2 - self.alpha1
    }

    /// True once the tracked arc covers (almost) the full contour; the
    /// tolerance absorbs the one-sample gap left by discrete probing.
    pub fn is_closed(&self, sample_step: f64) -> bool {
        self.span() >= TAU - 1.5 * sample_step
    }

    /// Re-derive both extremities from the surviving valid samples after a
    /// fit. Leaves the range untouched when no valid sample remains.
    pub fn set_extremities(&mut self, points: &[SamplePoint]) {
        let mut lo: Option<&SamplePoint> = None;
        let mut hi: Option<&SamplePoint> = None;
        for p in points.iter().filter(|p| p.valid) {
            if lo.is_none_or(|q| p.alpha < q.alpha) {
                lo = Some(p);
            }
            if hi.is_none_or(|q| p.alpha > q.alpha) {
                hi = Some(p);
            }
        }
        if let (Some(lo), Some(hi)) = (lo, hi) {
            self.alpha1 = lo.alpha;
            self.p1 = lo.position;
            self.alpha2 = hi.alpha.min(lo.alpha + TAU);
            self.p2 = hi.position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn geometry() -> EllipseGeometry {
        let e: f64 = 0.0;
        EllipseGeometry {
            center: Point2::new(0.0, 0.0),
            a: 1.0,
            b: 2.0,
            e,
            cos_e: 1.0,
            sin_e: 0.0,
        }
    }

    #[test]
    fn boundary_points_give_ccw_interval() {
        let g = geometry();
        let arc = ArcRange::from_boundary_points(&g, g.point_at(0.5), g.point_at(1.5));
        assert_relative_eq!(arc.alpha1, 0.5, epsilon = 1e-12);
        assert_relative_eq!(arc.alpha2, 1.5, epsilon = 1e-12);

        // Reversed order wraps through the full turn.
        let arc = ArcRange::from_boundary_points(&g, g.point_at(1.5), g.point_at(0.5));
        assert_relative_eq!(arc.span(), TAU - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn normalize_from_wraps_into_base_turn() {
        assert_relative_eq!(normalize_from(-0.1, 0.0), TAU - 0.1, epsilon = 1e-12);
        assert_relative_eq!(normalize_from(1.0, 0.5), 1.0, epsilon = 1e-12);
        assert_relative_eq!(normalize_from(TAU + 1.0, 0.5), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn extremities_follow_valid_samples() {
        let g = geometry();
        let mut arc = ArcRange::from_boundary_points(&g, g.point_at(0.2), g.point_at(2.0));
        let mk = |alpha: f64, valid: bool| SamplePoint {
            position: g.point_at(alpha),
            alpha,
            weight: 1.0,
            valid,
        };
        arc.set_extremities(&[mk(0.4, true), mk(1.0, true), mk(1.8, false), mk(1.6, true)]);
        assert_relative_eq!(arc.alpha1, 0.4, epsilon = 1e-12);
        assert_relative_eq!(arc.alpha2, 1.6, epsilon = 1e-12);

        // No valid samples: unchanged.
        let before = arc;
        arc.set_extremities(&[mk(0.9, false)]);
        assert_eq!(arc, before);
    }

    #[test]
    fn closed_detection_tolerates_one_sample_gap() {
        let g = geometry();
        let step = 0.2;
        let mut arc = ArcRange::from_boundary_points(&g, g.point_at(0.0), g.point_at(0.1));
        arc.alpha2 = arc.alpha1 + TAU - step;
        assert!(arc.is_closed(step));
        arc.alpha2 = arc.alpha1 + TAU - 2.0 * step;
        assert!(!arc.is_closed(step));
    }
}
