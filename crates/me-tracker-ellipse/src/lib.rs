//! Moving-edges tracking of an ellipse or circle across image frames.
//!
//! The tracker owns a set of sample points on the contour. Every frame it
//! snaps each point to the strongest intensity edge along the local
//! contour normal, refits the implicit conic with a robust
//! iteratively-reweighted least squares, resynchronizes the parametric
//! angles and grows the trusted arc toward full closure.
//!
//! # Quickstart
//!
//! ```
//! use me_tracker_core::GrayImage;
//! use me_tracker_ellipse::{EllipseTracker, TrackerParams, TrackerState};
//! use nalgebra::Point2;
//!
//! // A dark disk of radius 25 centered at (40, 40).
//! let mut img = GrayImage::filled(96, 96, 200);
//! for y in 0..96 {
//!     for x in 0..96 {
//!         let d2 = (x as f64 - 40.0).powi(2) + (y as f64 - 40.0).powi(2);
//!         if d2 <= 25.0_f64.powi(2) {
//!             img.put(x, y, 50);
//!         }
//!     }
//! }
//!
//! // Bootstrap from a handful of contour points, then track.
//! let init: Vec<Point2<f64>> = (0..6)
//!     .map(|i| {
//!         let t = i as f64;
//!         Point2::new(40.0 + 25.0 * t.cos(), 40.0 + 25.0 * t.sin())
//!     })
//!     .collect();
//!
//! let mut tracker = EllipseTracker::new(TrackerParams::default());
//! tracker.init_tracking(&img.view(), &init)?;
//! tracker.track(&img.view())?;
//!
//! assert_eq!(tracker.state(), TrackerState::Tracking);
//! let g = tracker.geometry().unwrap();
//! assert!((g.center.x - 40.0).abs() < 1.0);
//! assert!((g.center.y - 40.0).abs() < 1.0);
//! # Ok::<(), me_tracker_ellipse::TrackError>(())
//! ```

pub mod arc;
pub mod conic;
pub mod display;
pub mod error;
pub mod fit;
pub mod geometry;
pub mod moments;
pub mod sample;
pub mod tracker;

pub use arc::ArcRange;
pub use conic::ConicModel;
pub use display::{arc_polyline, ArcDrawParams, EllipseOverlay};
pub use error::{FitError, TrackError};
pub use fit::{fit_conic, FitConfig, MIN_POINTS_CIRCLE, MIN_POINTS_ELLIPSE};
pub use geometry::EllipseGeometry;
pub use moments::MomentSet;
pub use sample::{SamplePoint, SamplePointSet};
pub use tracker::{EllipseTracker, TrackerParams, TrackerState};
