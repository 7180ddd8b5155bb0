//! Moving-edge search primitives shared by contour trackers.
//!
//! This crate is intentionally small. It owns the read-only gray image
//! view, sub-pixel bilinear sampling, the edge-search collaborator
//! contract ([`EdgeSearcher`]) together with its default gradient-maximum
//! implementation, and the shared moving-edge parameters. It does *not*
//! know about any particular contour model.

mod image;
mod logger;
mod params;
mod search;

pub use image::{sample_bilinear, GrayImage, GrayImageView};
pub use logger::init_with_level;
pub use params::MeParams;
pub use search::{EdgeMatch, EdgeSearcher, GradientSearcher};
