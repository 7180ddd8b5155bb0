use serde::{Deserialize, Serialize};

/// Shared moving-edge search parameters.
///
/// These govern the 1-D profile search every contour tracker runs at each
/// of its sample points; the contour model itself lives elsewhere.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MeParams {
    /// Half-length of the search segment along the contour normal, in
    /// pixels. The profile is scanned over `[-range, +range]`.
    pub range: f64,
    /// Minimum absolute directional gradient (0..255 intensity scale) for
    /// a profile extremum to count as an edge.
    pub gradient_threshold: f64,
    /// Step between consecutive profile samples, in pixels.
    pub profile_step: f64,
    /// Gradient magnitude mapped to confidence 1.0; weaker edges scale
    /// linearly below it.
    pub gradient_saturation: f64,
}

impl Default for MeParams {
    fn default() -> Self {
        Self {
            range: 7.0,
            gradient_threshold: 20.0,
            profile_step: 0.5,
            gradient_saturation: 200.0,
        }
    }
}

impl MeParams {
    /// Set the search range, clamped to at least one pixel.
    pub fn set_range(&mut self, range: f64) {
        self.range = range.max(1.0);
    }

    /// Set the gradient threshold, clamped to non-negative.
    pub fn set_gradient_threshold(&mut self, threshold: f64) {
        self.gradient_threshold = threshold.max(0.0);
    }

    /// Set the profile step, clamped into `[0.1, range]`.
    pub fn set_profile_step(&mut self, step: f64) {
        self.profile_step = step.clamp(0.1, self.range);
    }
}
