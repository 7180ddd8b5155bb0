//! Robust weighted fit of the implicit conic coefficients.
//!
//! The implicit equation is linear in K for fixed point positions, so
//! each pass is a weighted linear least-squares solve; outliers are
//! handled by iterative reweighting (Tukey biweight on the algebraic
//! residual with a MAD scale estimate). Coordinates are centered and
//! scaled before the solve and the coefficients de-normalized afterwards,
//! which keeps the normal equations well conditioned at image scale.

use log::{debug, trace};
use nalgebra::{Matrix3, Matrix5, Vector3, Vector5};

use crate::conic::ConicModel;
use crate::error::FitError;
use crate::sample::SamplePoint;

/// Structural minimum number of points for the general 5-coefficient fit.
pub const MIN_POINTS_ELLIPSE: usize = 5;
/// Structural minimum for the circle-locked 3-coefficient fit.
pub const MIN_POINTS_CIRCLE: usize = 3;

// Tukey biweight tuning constant (95% efficiency on Gaussian noise).
const TUKEY_C: f64 = 4.6851;
// Consistency factor turning a MAD into a Gaussian sigma estimate.
const MAD_TO_SIGMA: f64 = 1.4826;
// Floor on the residual scale so that exact (noiseless) fits keep
// near-uniform weights instead of dividing by zero.
const SIGMA_FLOOR: f64 = 1e-9;
const CONVERGENCE_TOL: f64 = 1e-10;

#[derive(Clone, Copy, Debug)]
pub struct FitConfig {
    /// Lock `K0 = 1`, `K1 = 0` and solve only the three remaining
    /// coefficients.
    pub circle: bool,
    /// Points whose final robust weight falls below this are flagged
    /// invalid for later removal.
    pub threshold_weight: f64,
    /// IRLS iteration cap.
    pub max_iterations: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            circle: false,
            threshold_weight: 0.2,
            max_iterations: 20,
        }
    }
}

pub fn structural_min(circle: bool) -> usize {
    if circle {
        MIN_POINTS_CIRCLE
    } else {
        MIN_POINTS_ELLIPSE
    }
}

/// Fit the conic to the valid points by iteratively-reweighted least
/// squares.
///
/// Side effects on `points`: every valid point receives its final robust
/// weight, and points below `cfg.threshold_weight` are flagged invalid;
/// the caller prunes them afterwards. Invalid points on entry are ignored
/// entirely.
pub fn fit_conic(points: &mut [SamplePoint], cfg: &FitConfig) -> Result<ConicModel, FitError> {
    let idx: Vec<usize> = (0..points.len()).filter(|&i| points[i].valid).collect();
    let needed = structural_min(cfg.circle);
    if idx.len() < needed {
        return Err(FitError::InsufficientPoints {
            needed,
            got: idx.len(),
        });
    }

    // Centroid shift + isotropic scale to mean distance √2.
    let n = idx.len() as f64;
    let mx = idx.iter().map(|&i| points[i].position.x).sum::<f64>() / n;
    let my = idx.iter().map(|&i| points[i].position.y).sum::<f64>() / n;
    let mean_dist = idx
        .iter()
        .map(|&i| {
            let p = points[i].position;
            ((p.x - mx).powi(2) + (p.y - my).powi(2)).sqrt()
        })
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let coords: Vec<(f64, f64)> = idx
        .iter()
        .map(|&i| {
            let p = points[i].position;
            ((p.x - mx) * s, (p.y - my) * s)
        })
        .collect();

    let mut weights = vec![1.0f64; coords.len()];
    let mut k = [0.0f64; 5];

    for iter in 0..cfg.max_iterations {
        let active = weights.iter().filter(|&&w| w > 0.0).count();
        if active < needed {
            return Err(FitError::InsufficientPoints {
                needed,
                got: active,
            });
        }

        let k_new = if cfg.circle {
            solve_circle(&coords, &weights)?
        } else {
            solve_general(&coords, &weights)?
        };
        let delta = k
            .iter()
            .zip(&k_new)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max);
        k = k_new;

        let residuals: Vec<f64> = coords
            .iter()
            .map(|&(u, v)| residual_normalized(&k, u, v))
            .collect();
        let sigma = (MAD_TO_SIGMA * mad(&residuals)).max(SIGMA_FLOOR);
        for (w, &r) in weights.iter_mut().zip(&residuals) {
            let x = r / (TUKEY_C * sigma);
            *w = if x.abs() < 1.0 {
                let t = 1.0 - x * x;
                t * t
            } else {
                0.0
            };
        }
        trace!(
            "irls iter {iter}: sigma={sigma:.3e} delta={delta:.3e} active={active}"
        );
        if iter > 0 && delta < CONVERGENCE_TOL {
            break;
        }
    }

    let model = denormalize(&k, mx, my, s, cfg.circle);
    if !model.is_elliptic() {
        return Err(FitError::DegenerateConic);
    }

    let mut dropped = 0usize;
    for (j, &i) in idx.iter().enumerate() {
        let p = &mut points[i];
        p.weight = weights[j].clamp(0.0, 1.0);
        if p.weight < cfg.threshold_weight {
            p.valid = false;
            dropped += 1;
        }
    }
    if dropped > 0 {
        debug!("fit flagged {dropped} low-weight points invalid");
    }
    Ok(model)
}

/// Weighted normal equations for the 5 unknowns
/// `(K0, K1, K2, K3, K4)`: each point contributes the row
/// `[v², 2uv, 2u, 2v, 1]` against the right-hand side `−u²`.
fn solve_general(coords: &[(f64, f64)], weights: &[f64]) -> Result<[f64; 5], FitError> {
    let mut a = Matrix5::<f64>::zeros();
    let mut b = Vector5::<f64>::zeros();
    for (&(u, v), &w) in coords.iter().zip(weights) {
        if w <= 0.0 {
            continue;
        }
        let row = Vector5::new(v * v, 2.0 * u * v, 2.0 * u, 2.0 * v, 1.0);
        a += (row * row.transpose()) * w;
        b += row * (-(u * u) * w);
    }
    let x = a.lu().solve(&b).ok_or(FitError::DegenerateConic)?;
    Ok([x[0], x[1], x[2], x[3], x[4]])
}

/// Circle-locked variant: `K0 = 1`, `K1 = 0`, rows `[2u, 2v, 1]` against
/// `−(u² + v²)`.
fn solve_circle(coords: &[(f64, f64)], weights: &[f64]) -> Result<[f64; 5], FitError> {
    let mut a = Matrix3::<f64>::zeros();
    let mut b = Vector3::<f64>::zeros();
    for (&(u, v), &w) in coords.iter().zip(weights) {
        if w <= 0.0 {
            continue;
        }
        let row = Vector3::new(2.0 * u, 2.0 * v, 1.0);
        a += (row * row.transpose()) * w;
        b += row * (-(u * u + v * v) * w);
    }
    let x = a.lu().solve(&b).ok_or(FitError::DegenerateConic)?;
    Ok([1.0, 0.0, x[0], x[1], x[2]])
}

fn residual_normalized(k: &[f64; 5], u: f64, v: f64) -> f64 {
    u * u + k[0] * v * v + 2.0 * (k[1] * u * v + k[2] * u + k[3] * v) + k[4]
}

/// Median absolute deviation from the median.
fn mad(values: &[f64]) -> f64 {
    let med = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    median(&deviations)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Undo the centering/scaling substitution `u = s(x − mx)`, `v = s(y − my)`
/// after dividing the equation by `s²` to restore the unit leading term.
fn denormalize(k: &[f64; 5], mx: f64, my: f64, s: f64, circle: bool) -> ConicModel {
    let (k0, k1) = (k[0], k[1]);
    let c2 = k[2] / s;
    let c3 = k[3] / s;
    let c4 = k[4] / (s * s);
    let k2 = c2 - mx - k1 * my;
    let k3 = c3 - k0 * my - k1 * mx;
    let k4 = c4 + mx * mx + k0 * my * my + 2.0 * (k1 * mx * my - c2 * mx - c3 * my);
    ConicModel {
        k: if circle {
            [1.0, 0.0, k2, k3, k4]
        } else {
            [k0, k1, k2, k3, k4]
        },
    }
}
