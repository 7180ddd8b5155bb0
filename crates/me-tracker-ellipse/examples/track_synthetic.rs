//! Track a synthetic drifting ellipse and log the per-frame estimate.
//!
//! Run with `cargo run --example track_synthetic`.

use log::{info, LevelFilter};
use me_tracker_core::{init_with_level, GrayImage};
use me_tracker_ellipse::{EllipseGeometry, EllipseTracker, TrackerParams};
use nalgebra::Point2;

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

fn main() {
    init_with_level(LevelFilter::Debug).expect("logger");

    let e: f64 = 0.3;
    let mut truth = EllipseGeometry {
        center: Point2::new(100.0, 120.0),
        a: 35.0,
        b: 55.0,
        e,
        cos_e: e.cos(),
        sin_e: e.sin(),
    };

    let first = render(&truth, 256, 256);
    let init: Vec<Point2<f64>> = (0..8).map(|i| truth.point_at(0.6 * i as f64)).collect();

    let mut tracker = EllipseTracker::new(TrackerParams::default());
    if let Err(err) = tracker.init_tracking(&first.view(), &init) {
        eprintln!("initialization failed: {err}");
        return;
    }

    for frame in 0..20 {
        truth.center.x += 0.8;
        truth.center.y -= 0.5;
        let image = render(&truth, 256, 256);
        match tracker.track(&image.view()) {
            Ok(()) => {
                let g = tracker.geometry().expect("estimate");
                let arc = tracker.arc().expect("estimate");
                info!(
                    "frame {frame:2}: center ({:.2}, {:.2}) axes ({:.2}, {:.2}) \
                     e {:.3} arc {:.2} rad, {} points",
                    g.center.x,
                    g.center.y,
                    g.a,
                    g.b,
                    g.e,
                    arc.span(),
                    tracker.valid_count()
                );
            }
            Err(err) => {
                eprintln!("frame {frame}: {err}");
                break;
            }
        }
    }

    let m = tracker.moments().expect("estimate");
    info!("final area m00 = {:.1}", m.m00);
}
