//! Sample points distributed along the tracked arc.

use std::f64::consts::TAU;

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use me_tracker_core::{EdgeSearcher, GrayImageView, MeParams};

use crate::arc::{normalize_from, ArcRange};
use crate::geometry::EllipseGeometry;

/// One tracked contour point. The parametric angle is attached to the
/// point itself and resynchronized in one pass after every fit, so it can
/// never alias another point through an index.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub position: Point2<f64>,
    /// Parametric position on the ellipse.
    pub alpha: f64,
    /// Robust weight in `[0, 1]` from the last fit (search confidence
    /// until then).
    pub weight: f64,
    pub valid: bool,
}

/// The set of tracked points, owned exclusively by one tracker.
#[derive(Clone, Debug, Default)]
pub struct SamplePointSet {
    points: Vec<SamplePoint>,
}

impl SamplePointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut [SamplePoint] {
        &mut self.points
    }

    pub(crate) fn push(&mut self, point: SamplePoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.points.iter().filter(|p| p.valid).count()
    }

    /// Number of samples an arc of `span` holds at the given step. Matches
    /// the sampling rule exactly, including the skipped seam slot on a
    /// closed arc, so a fully sampled arc always reaches this count.
    pub fn expected_count(span: f64, step: f64) -> usize {
        let full = (span.min(TAU) / step).floor() as usize + 1;
        let before_seam = ((TAU - 0.5 * step) / step).ceil() as usize;
        full.min(before_seam)
    }

    /// Regenerate the whole set: one candidate per angular step along the
    /// arc, each snapped to the image by the edge searcher. Model points
    /// without a usable edge response are simply not kept.
    pub fn sample<S: EdgeSearcher>(
        &mut self,
        image: &GrayImageView<'_>,
        geometry: &EllipseGeometry,
        arc: &ArcRange,
        step: f64,
        searcher: &S,
        me: &MeParams,
    ) {
        self.points.clear();
        self.extend_along_arc(image, geometry, arc, step, searcher, me, &[]);
        debug!(
            "sampled {} points over an arc of {:.3} rad",
            self.points.len(),
            arc.span()
        );
    }

    /// Regenerate low-density regions while preserving already-matched
    /// points whose weight is at least `keep_weight`.
    pub fn re_sample<S: EdgeSearcher>(
        &mut self,
        image: &GrayImageView<'_>,
        geometry: &EllipseGeometry,
        arc: &ArcRange,
        step: f64,
        searcher: &S,
        me: &MeParams,
        keep_weight: f64,
    ) {
        let kept: Vec<SamplePoint> = self
            .points
            .iter()
            .copied()
            .filter(|p| p.valid && p.weight >= keep_weight)
            .collect();
        let occupied: Vec<f64> = kept.iter().map(|p| p.alpha).collect();

        self.points = kept;
        self.extend_along_arc(image, geometry, arc, step, searcher, me, &occupied);
        debug!(
            "resampled: kept {} points, now {}",
            occupied.len(),
            self.points.len()
        );
    }

    /// Remove points flagged invalid by the fitter or by a failed search.
    /// Returns how many were dropped.
    pub fn suppress_points(&mut self) -> usize {
        let before = self.points.len();
        self.points.retain(|p| p.valid);
        before - self.points.len()
    }

    /// Recompute every sample's parametric angle under the new geometry,
    /// mapped into one turn starting just below `alpha1` so points that
    /// drifted slightly past the lower extremity do not wrap to the top.
    pub fn update_theta(&mut self, geometry: &EllipseGeometry, arc: &ArcRange, step: f64) {
        let base = arc.alpha1 - step;
        for p in self.points.iter_mut().filter(|p| p.valid) {
            p.alpha = normalize_from(geometry.angle_of(p.position), base);
        }
    }

    fn extend_along_arc<S: EdgeSearcher>(
        &mut self,
        image: &GrayImageView<'_>,
        geometry: &EllipseGeometry,
        arc: &ArcRange,
        step: f64,
        searcher: &S,
        me: &MeParams,
        occupied: &[f64],
    ) {
        let span = arc.span().min(TAU);
        let mut alpha = arc.alpha1;
        while alpha <= arc.alpha1 + span + 1e-9 {
            // Stop before duplicating the seam on a closed arc.
            if alpha - arc.alpha1 >= TAU - 0.5 * step {
                break;
            }
            if occupied.iter().any(|&o| (o - alpha).abs() < 0.5 * step) {
                alpha += step;
                continue;
            }
            let model = geometry.point_at(alpha);
            if image.contains(model.x, model.y, 2.0) {
                if let Some(m) = searcher.search(image, model, geometry.normal_angle_at(alpha), me) {
                    self.points.push(SamplePoint {
                        position: m.position,
                        alpha,
                        weight: m.weight,
                        valid: true,
                    });
                }
            }
            alpha += step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use me_tracker_core::{GradientSearcher, GrayImage};

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

    /// Dark filled ellipse on a light background.
    fn render(g: &EllipseGeometry, w: usize, h: usize) -> GrayImage {
        let conic = g.to_conic();
        let mut img = GrayImage::filled(w, h, 200);
        for y in 0..h {
            for x in 0..w {
                if conic.residual(Point2::new(x as f64, y as f64)) <= 0.0 {
                    img.put(x, y, 50);
                }
            }
        }
        img
    }

    #[test]
    fn sample_covers_the_arc() {
        let g = geometry(30.0, 45.0, 0.4, 64.0, 64.0);
        let img = render(&g, 128, 128);
        let arc = ArcRange::from_boundary_points(&g, g.point_at(0.0), g.point_at(3.0));
        let step = 0.2;

        let mut set = SamplePointSet::new();
        set.sample(
            &img.view(),
            &g,
            &arc,
            step,
            &GradientSearcher::default(),
            &MeParams::default(),
        );

        let expected = SamplePointSet::expected_count(arc.span(), step);
        assert!(
            set.valid_count() >= expected - 2,
            "expected ~{expected} samples, got {}",
            set.valid_count()
        );
        // All snapped positions stay near the true contour.
        let conic = g.to_conic();
        for p in set.points() {
            assert!(conic.residual(p.position).abs() < 200.0, "far sample: {p:?}");
        }
    }

    #[test]
    fn closed_arc_sampling_reaches_expected_count() {
        let g = geometry(40.0, 40.0, 0.0, 64.0, 64.0);
        let img = render(&g, 128, 128);
        // Coincident boundary points make a full-turn arc.
        let arc = ArcRange::from_boundary_points(&g, g.point_at(0.0), g.point_at(0.0));
        assert!((arc.span() - TAU).abs() < 1e-12);
        let step = 0.2;

        let mut set = SamplePointSet::new();
        set.sample(
            &img.view(),
            &g,
            &arc,
            step,
            &GradientSearcher,
            &MeParams::default(),
        );
        // Every probe hits on a clean circle, so the count is exact; an
        // expected count past the seam slot would demand a density no
        // sampling pass can deliver.
        assert_eq!(
            set.valid_count(),
            SamplePointSet::expected_count(arc.span(), step)
        );
    }

    #[test]
    fn suppress_drops_invalid_points() {
        let mut set = SamplePointSet::new();
        for i in 0..6 {
            set.push(SamplePoint {
                position: Point2::new(i as f64, 0.0),
                alpha: i as f64 * 0.1,
                weight: 1.0,
                valid: i % 2 == 0,
            });
        }
        assert_eq!(set.suppress_points(), 3);
        assert_eq!(set.len(), 3);
        assert!(set.points().iter().all(|p| p.valid));
    }

    #[test]
    fn update_theta_keeps_points_in_one_turn() {
        let g = geometry(20.0, 30.0, 0.0, 0.0, 0.0);
        let arc = ArcRange::from_boundary_points(&g, g.point_at(0.3), g.point_at(2.8));
        let mut set = SamplePointSet::new();
        for &alpha in &[0.3, 1.0, 2.8] {
            set.push(SamplePoint {
                position: g.point_at(alpha),
                alpha: 0.0,
                weight: 1.0,
                valid: true,
            });
        }
        set.update_theta(&g, &arc, 0.2);
        let alphas: Vec<f64> = set.points().iter().map(|p| p.alpha).collect();
        assert!((alphas[0] - 0.3).abs() < 1e-9);
        assert!((alphas[1] - 1.0).abs() < 1e-9);
        assert!((alphas[2] - 2.8).abs() < 1e-9);
    }

    #[test]
    fn resample_preserves_confident_points() {
        let g = geometry(30.0, 45.0, 0.0, 64.0, 64.0);
        let img = render(&g, 128, 128);
        let arc = ArcRange::from_boundary_points(&g, g.point_at(0.0), g.point_at(3.0));
        let step = 0.2;
        let searcher = GradientSearcher::default();
        let me = MeParams::default();

        let mut set = SamplePointSet::new();
        set.sample(&img.view(), &g, &arc, step, &searcher, &me);
        let keeper = set.points()[0];

        // Thin the set out, then resample.
        let n = set.len();
        for (i, p) in set.points_mut().iter_mut().enumerate() {
            if i >= n / 2 {
                p.valid = false;
            }
        }
        set.suppress_points();
        set.re_sample(&img.view(), &g, &arc, step, &searcher, &me, 0.0);

        assert!(set.points().contains(&keeper), "kept point was regenerated");
        assert!(set.valid_count() >= n - 2, "density restored, got {}", set.valid_count());
    }
}
