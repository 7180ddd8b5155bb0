//! Directional edge localization along a contour normal.

use nalgebra::{Point2, Vector2};

use crate::image::{sample_bilinear, GrayImageView};
use crate::params::MeParams;

/// Outcome of a successful edge search: the refined sub-pixel position and
/// a confidence weight in `[0, 1]` derived from the gradient strength.
#[derive(Clone, Copy, Debug)]
pub struct EdgeMatch {
    pub position: Point2<f64>,
    pub weight: f64,
}

/// The edge-search collaborator contract.
///
/// Given a read-only image, a point on the current contour estimate, the
/// search direction (the contour normal, radians from +x) and the search
/// parameters, return the strongest edge response along the 1-D profile,
/// or `None` when no usable edge lies in range. The parameters are passed
/// per call, so a caller can retune them between frames without rebuilding
/// the searcher. Implementations must be read-only with respect to the
/// image; per-point calls are independent and may be issued in parallel by
/// the caller.
pub trait EdgeSearcher {
    fn search(
        &self,
        image: &GrayImageView<'_>,
        point: Point2<f64>,
        direction: f64,
        me: &MeParams,
    ) -> Option<EdgeMatch>;
}

/// Default strategy: absolute directional-gradient maximum.
///
/// Scans the intensity profile along the normal with central-difference
/// gradients, keeps the strongest response above the configured threshold
/// and refines its offset by a parabolic fit over the neighboring profile
/// samples.
#[derive(Clone, Copy, Debug, Default)]
pub struct GradientSearcher;

// Central-difference half-step, in pixels.
const GRAD_H: f64 = 1.0;

impl EdgeSearcher for GradientSearcher {
    fn search(
        &self,
        image: &GrayImageView<'_>,
        point: Point2<f64>,
        direction: f64,
        me: &MeParams,
    ) -> Option<EdgeMatch> {
        let step = me.profile_step.max(0.1);
        let range = me.range.max(step);
        let dir = Vector2::new(direction.cos(), direction.sin());

        let n = (range / step).floor() as i64;
        let mut offsets = Vec::with_capacity((2 * n + 1) as usize);
        let mut mags = Vec::with_capacity((2 * n + 1) as usize);

        for k in -n..=n {
            let t = k as f64 * step;
            let p_fwd = point + dir * (t + GRAD_H);
            let p_bwd = point + dir * (t - GRAD_H);
            if !image.contains(p_fwd.x, p_fwd.y, 1.0) || !image.contains(p_bwd.x, p_bwd.y, 1.0) {
                continue;
            }
            let g = sample_bilinear(image, p_fwd.x, p_fwd.y)
                - sample_bilinear(image, p_bwd.x, p_bwd.y);
            offsets.push(t);
            mags.push(g.abs());
        }

        let (best, &best_mag) = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        if best_mag < me.gradient_threshold {
            return None;
        }

        // Parabolic sub-pixel refinement over the neighboring samples.
        let mut t = offsets[best];
        if best > 0 && best + 1 < mags.len() {
            let (ym, y0, yp) = (mags[best - 1], mags[best], mags[best + 1]);
            let denom = ym - 2.0 * y0 + yp;
            if denom.abs() > 1e-12 {
                let dt = (0.5 * (ym - yp) / denom).clamp(-0.5, 0.5);
                t += dt * step;
            }
        }

        let sat = me.gradient_saturation.max(1.0);
        Some(EdgeMatch {
            position: point + dir * t,
            weight: (best_mag / sat).clamp(0.0, 1.0),
        })
    }
}
