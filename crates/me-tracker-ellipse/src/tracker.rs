//! Frame-to-frame moving-edges ellipse tracker.

use std::f64::consts::{FRAC_PI_2, TAU};

use log::{debug, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use me_tracker_core::{EdgeSearcher, GradientSearcher, GrayImageView, MeParams};

use crate::arc::ArcRange;
use crate::conic::ConicModel;
use crate::display::{ArcDrawParams, EllipseOverlay};
use crate::error::{FitError, TrackError};
use crate::fit::{fit_conic, structural_min, FitConfig};
use crate::geometry::EllipseGeometry;
use crate::moments::MomentSet;
use crate::sample::{SamplePoint, SamplePointSet};

/// Tracker configuration. All fields can be set directly; the setters
/// clamp to safe ranges.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TrackerParams {
    /// Lock the model to a circle (`K0 = 1`, `K1 = 0`).
    pub circle: bool,
    /// Robust weight below which a point is discarded after the fit.
    pub threshold_weight: f64,
    /// Angular distance between consecutive sample points, radians.
    pub sample_step: f64,
    /// Resample when the valid count drops below this fraction of the
    /// count the arc should hold.
    pub resample_fraction: f64,
    /// IRLS iteration cap for the conic fit.
    pub max_irls_iterations: usize,
    /// How many steps past each extremity to probe per frame when the
    /// arc is not yet closed.
    pub seek_steps: usize,
    /// Per-point edge search settings.
    pub me: MeParams,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            circle: false,
            threshold_weight: 0.2,
            sample_step: 10.0_f64.to_radians(),
            resample_fraction: 0.9,
            max_irls_iterations: 20,
            seek_steps: 3,
            me: MeParams::default(),
        }
    }
}

impl TrackerParams {
    /// Set the robust rejection threshold, clamped into `[0, 1]`.
    pub fn set_threshold_robust(&mut self, weight: f64) {
        self.threshold_weight = weight.clamp(0.0, 1.0);
    }

    /// Set the angular sample step, clamped into `[0.5°, 90°]`.
    pub fn set_sample_step(&mut self, step: f64) {
        self.sample_step = step.clamp(0.5_f64.to_radians(), FRAC_PI_2);
    }

    /// Set the resample trigger fraction, clamped into `[0, 1]`.
    pub fn set_resample_fraction(&mut self, fraction: f64) {
        self.resample_fraction = fraction.clamp(0.0, 1.0);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerState {
    Uninitialized,
    /// A model exists but no frame has been tracked yet.
    Initialized,
    Tracking,
    /// Too few points survived the last frame; the last good estimate is
    /// still readable, but the caller must reinitialize to continue.
    Lost,
}

/// The committed per-frame estimate. Replaced atomically at the end of a
/// successful frame, so a failed frame never leaves a half-updated model.
#[derive(Clone, Copy, Debug)]
struct Estimate {
    conic: ConicModel,
    geometry: EllipseGeometry,
    arc: ArcRange,
    moments: MomentSet,
}

/// Moving-edges tracker for one ellipse (or circular) contour.
///
/// Generic over the edge-search strategy; `GradientSearcher` is the
/// default. One tracker owns one contour: its sample set, arc range and
/// model estimate are private state advanced by [`EllipseTracker::track`].
pub struct EllipseTracker<S = GradientSearcher> {
    params: TrackerParams,
    searcher: S,
    state: TrackerState,
    samples: SamplePointSet,
    est: Option<Estimate>,
}

impl EllipseTracker<GradientSearcher> {
    pub fn new(params: TrackerParams) -> Self {
        Self::with_searcher(params, GradientSearcher)
    }
}

impl Default for EllipseTracker<GradientSearcher> {
    fn default() -> Self {
        Self::new(TrackerParams::default())
    }
}

impl<S: EdgeSearcher> EllipseTracker<S> {
    pub fn with_searcher(params: TrackerParams, searcher: S) -> Self {
        Self {
            params,
            searcher,
            state: TrackerState::Uninitialized,
            samples: SamplePointSet::new(),
            est: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut TrackerParams {
        &mut self.params
    }

    pub fn conic(&self) -> Option<&ConicModel> {
        self.est.as_ref().map(|e| &e.conic)
    }

    pub fn geometry(&self) -> Option<&EllipseGeometry> {
        self.est.as_ref().map(|e| &e.geometry)
    }

    pub fn arc(&self) -> Option<&ArcRange> {
        self.est.as_ref().map(|e| &e.arc)
    }

    pub fn moments(&self) -> Option<&MomentSet> {
        self.est.as_ref().map(|e| &e.moments)
    }

    pub fn samples(&self) -> &SamplePointSet {
        &self.samples
    }

    pub fn valid_count(&self) -> usize {
        self.samples.valid_count()
    }

    fn fit_config(&self) -> FitConfig {
        FitConfig {
            circle: self.params.circle,
            threshold_weight: self.params.threshold_weight,
            max_iterations: self.params.max_irls_iterations,
        }
    }

    /// Bootstrap the tracker from user-given contour points.
    ///
    /// Fits the model to the points, takes the arc from the first to the
    /// last point (counter-clockwise) and samples the arc on the image.
    /// On failure the tracker stays uninitialized.
    pub fn init_tracking(
        &mut self,
        image: &GrayImageView<'_>,
        points: &[Point2<f64>],
    ) -> Result<(), TrackError> {
        let needed = structural_min(self.params.circle);
        if points.len() < needed {
            return Err(FitError::InsufficientPoints {
                needed,
                got: points.len(),
            }
            .into());
        }

        let mut seed: Vec<SamplePoint> = points
            .iter()
            .map(|&position| SamplePoint {
                position,
                alpha: 0.0,
                weight: 1.0,
                valid: true,
            })
            .collect();
        let conic = fit_conic(&mut seed, &self.fit_config())?;
        let geometry = EllipseGeometry::from_conic(&conic, None)?;
        let arc = ArcRange::from_boundary_points(&geometry, points[0], points[points.len() - 1]);

        self.samples = SamplePointSet::new();
        self.samples.sample(
            image,
            &geometry,
            &arc,
            self.params.sample_step,
            &self.searcher,
            &self.params.me,
        );
        let remaining = self.samples.valid_count();
        if remaining < needed {
            warn!("init found only {remaining} edge points, need {needed}");
            return Err(TrackError::TrackingLost { remaining });
        }

        self.est = Some(Estimate {
            conic,
            geometry,
            arc,
            moments: MomentSet::of_ellipse(&geometry),
        });
        self.state = TrackerState::Initialized;
        debug!(
            "initialized: {} samples over arc span {:.3} rad",
            remaining,
            arc.span()
        );
        Ok(())
    }

    /// Advance the estimate by one frame.
    ///
    /// Runs the per-point edge search, refits the conic, resynchronizes
    /// the parametric angles, prunes rejected points, restores sample
    /// density and grows the arc toward closure. A fit failure returns the
    /// error and leaves the previous estimate untouched; losing too many
    /// points moves the tracker to [`TrackerState::Lost`].
    pub fn track(&mut self, image: &GrayImageView<'_>) -> Result<(), TrackError> {
        let prev = self.est.ok_or(TrackError::NotInitialized)?;
        let needed = structural_min(self.params.circle);
        let step = self.params.sample_step;

        // Snap every sample to the nearest edge along the contour normal.
        for p in self.samples.points_mut() {
            if !p.valid {
                continue;
            }
            if !image.contains(p.position.x, p.position.y, 2.0) {
                p.valid = false;
                continue;
            }
            let direction = prev.conic.normal_angle(p.position);
            match self
                .searcher
                .search(image, p.position, direction, &self.params.me)
            {
                Some(m) => {
                    p.position = m.position;
                    p.weight = m.weight;
                }
                None => p.valid = false,
            }
        }

        let remaining = self.samples.valid_count();
        if remaining < needed {
            self.state = TrackerState::Lost;
            warn!(
                "tracking lost: {remaining} of {} points found an edge",
                self.samples.len()
            );
            return Err(TrackError::TrackingLost { remaining });
        }

        // Refit; a failure here propagates without touching the estimate.
        let cfg = self.fit_config();
        let conic = fit_conic(self.samples.points_mut(), &cfg)?;
        let geometry = EllipseGeometry::from_conic(&conic, Some(prev.geometry.e))?;

        // Resynchronize angles under the new geometry, then prune and
        // refresh the arc from what survived.
        let mut arc = prev.arc;
        self.samples.update_theta(&geometry, &arc, step);
        self.samples.suppress_points();
        arc.set_extremities(self.samples.points());

        let expected = SamplePointSet::expected_count(arc.span(), step);
        if (self.samples.valid_count() as f64) < self.params.resample_fraction * expected as f64 {
            self.samples.re_sample(
                image,
                &geometry,
                &arc,
                step,
                &self.searcher,
                &self.params.me,
                self.params.threshold_weight,
            );
        }

        if !arc.is_closed(step) {
            self.seek_extremities(image, &geometry, &mut arc);
        }

        let remaining = self.samples.valid_count();
        if remaining < needed {
            self.state = TrackerState::Lost;
            warn!("tracking lost after pruning: {remaining} points left");
            return Err(TrackError::TrackingLost { remaining });
        }

        self.est = Some(Estimate {
            conic,
            geometry,
            arc,
            moments: MomentSet::of_ellipse(&geometry),
        });
        self.state = TrackerState::Tracking;
        debug!("tracked: {remaining} points, arc span {:.3} rad", arc.span());
        Ok(())
    }

    /// Probe a few angular steps past each extremity and extend the arc
    /// over every probe that lands on an edge. Extension stops at the
    /// first miss on each side and never overlaps the opposite extremity.
    fn seek_extremities(
        &mut self,
        image: &GrayImageView<'_>,
        geometry: &EllipseGeometry,
        arc: &mut ArcRange,
    ) {
        let step = self.params.sample_step;
        for k in 1..=self.params.seek_steps {
            let alpha = arc.alpha2 + k as f64 * step;
            if alpha - arc.alpha1 >= TAU - 0.5 * step {
                break;
            }
            match self.probe(image, geometry, alpha) {
                Some(p) => {
                    arc.alpha2 = alpha;
                    arc.p2 = p.position;
                    self.samples.push(p);
                }
                None => break,
            }
        }
        for k in 1..=self.params.seek_steps {
            let alpha = arc.alpha1 - k as f64 * step;
            if arc.alpha2 - alpha >= TAU - 0.5 * step {
                break;
            }
            match self.probe(image, geometry, alpha) {
                Some(p) => {
                    arc.alpha1 = alpha;
                    arc.p1 = p.position;
                    self.samples.push(p);
                }
                None => break,
            }
        }
    }

    fn probe(
        &self,
        image: &GrayImageView<'_>,
        geometry: &EllipseGeometry,
        alpha: f64,
    ) -> Option<SamplePoint> {
        let model = geometry.point_at(alpha);
        if !image.contains(model.x, model.y, 2.0) {
            return None;
        }
        let m = self.searcher.search(
            image,
            model,
            geometry.normal_angle_at(alpha),
            &self.params.me,
        )?;
        Some(SamplePoint {
            position: m.position,
            alpha,
            weight: m.weight,
            valid: true,
        })
    }

    /// Hand the current arc to an overlay for drawing. No-op before
    /// initialization.
    pub fn display<O: EllipseOverlay>(&self, overlay: &mut O, color: [u8; 3]) {
        if let Some(est) = &self.est {
            overlay.draw_arc(&ArcDrawParams {
                center: est.geometry.center,
                a: est.geometry.a,
                b: est.geometry.b,
                e: est.geometry.e,
                alpha1: est.arc.alpha1,
                alpha2: est.arc.alpha2,
                color,
            });
        }
    }
}
