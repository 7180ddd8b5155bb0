/// Errors raised by the conic fitter.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitError {
    /// Fewer usable points than the structural minimum (5 general,
    /// 3 circle-locked), either on entry or after robust down-weighting.
    #[error("too few valid points for the fit: need {needed}, got {got}")]
    InsufficientPoints { needed: usize, got: usize },
    /// The fitted coefficients do not describe a real ellipse.
    #[error("fitted conic is degenerate (not an ellipse)")]
    DegenerateConic,
}

/// Errors surfaced by the per-frame tracker.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackError {
    #[error("tracker is not initialized")]
    NotInitialized,
    /// Fit failed this frame; the previous model is left untouched.
    #[error(transparent)]
    Fit(#[from] FitError),
    /// The valid point count fell below the tracking floor; the caller
    /// decides whether to reinitialize.
    #[error("tracking lost: {remaining} valid points left")]
    TrackingLost { remaining: usize },
}
