//! Overlay hook for drawing the tracked arc.
//!
//! The tracker itself never touches a render target; it hands the arc
//! description to whatever implements [`EllipseOverlay`].

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::geometry::EllipseGeometry;

/// Everything an overlay needs to draw one tracked arc.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArcDrawParams {
    pub center: Point2<f64>,
    /// Semiminor axis.
    pub a: f64,
    /// Semimajor axis.
    pub b: f64,
    /// Major-axis orientation, radians from +x.
    pub e: f64,
    pub alpha1: f64,
    pub alpha2: f64,
    pub color: [u8; 3],
}

pub trait EllipseOverlay {
    fn draw_arc(&mut self, arc: &ArcDrawParams);
}

/// Flatten an arc into a polyline at the given angular resolution, ready
/// for any line renderer. Always includes both endpoints.
pub fn arc_polyline(arc: &ArcDrawParams, step: f64) -> Vec<Point2<f64>> {
    let g = EllipseGeometry {
        center: arc.center,
        a: arc.a,
        b: arc.b,
        e: arc.e,
        cos_e: arc.e.cos(),
        sin_e: arc.e.sin(),
    };
    let span = (arc.alpha2 - arc.alpha1).max(0.0);
    let segments = (span / step.max(1e-3)).ceil().max(1.0) as usize;
    (0..=segments)
        .map(|i| g.point_at(arc.alpha1 + span * i as f64 / segments as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct Recorder {
        arcs: Vec<ArcDrawParams>,
    }

    impl EllipseOverlay for Recorder {
        fn draw_arc(&mut self, arc: &ArcDrawParams) {
            self.arcs.push(*arc);
        }
    }

    fn half_circle() -> ArcDrawParams {
        ArcDrawParams {
            center: Point2::new(10.0, 20.0),
            a: 5.0,
            b: 5.0,
            e: 0.0,
            alpha1: 0.0,
            alpha2: std::f64::consts::PI,
            color: [255, 0, 0],
        }
    }

    #[test]
    fn polyline_spans_the_arc() {
        let pts = arc_polyline(&half_circle(), 0.1);
        let first = pts.first().unwrap();
        let last = pts.last().unwrap();
        assert_relative_eq!(first.x, 15.0, epsilon = 1e-9);
        assert_relative_eq!(first.y, 20.0, epsilon = 1e-9);
        assert_relative_eq!(last.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(last.y, 20.0, epsilon = 1e-9);
        // Every vertex stays on the circle.
        for p in &pts {
            let r = ((p.x - 10.0).powi(2) + (p.y - 20.0).powi(2)).sqrt();
            assert_relative_eq!(r, 5.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn recorder_receives_the_arc() {
        let mut rec = Recorder::default();
        rec.draw_arc(&half_circle());
        assert_eq!(rec.arcs.len(), 1);
        assert_eq!(rec.arcs[0].color, [255, 0, 0]);
    }
}
