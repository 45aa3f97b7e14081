//! Human-like pointer activity
//!
//! Pages served by the catalogue sites lazy-load content and watch for idle
//! automation, so the scrapers move the mouse and scroll between navigations.
//! Input failures are logged and ignored.

use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType,
};
use tokio::time::sleep;
use tracing::debug;

/// One step of a pointer script
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Move from the current position to `(x, y)` in `steps` increments
    Move { x: f64, y: f64, steps: u32 },
    /// Scroll vertically by `delta_y` pixels
    Wheel { delta_y: f64 },
    Pause(Duration),
}

/// Full routine run after landing on an index page
pub const BROWSE: &[Gesture] = &[
    Gesture::Pause(Duration::from_millis(2000)),
    Gesture::Move { x: 200.0, y: 300.0, steps: 20 },
    Gesture::Pause(Duration::from_millis(800)),
    Gesture::Move { x: 600.0, y: 400.0, steps: 25 },
    Gesture::Pause(Duration::from_millis(1000)),
    Gesture::Wheel { delta_y: 600.0 },
    Gesture::Pause(Duration::from_millis(1500)),
    Gesture::Wheel { delta_y: 800.0 },
    Gesture::Pause(Duration::from_millis(1200)),
];

/// Short routine used on detail pages and between index pages
pub const SKIM: &[Gesture] = &[
    Gesture::Move { x: 320.0, y: 240.0, steps: 10 },
    Gesture::Wheel { delta_y: 500.0 },
    Gesture::Pause(Duration::from_millis(1000)),
    Gesture::Wheel { delta_y: 1000.0 },
    Gesture::Pause(Duration::from_millis(500)),
];

/// Intermediate points of a straight move, ending exactly at the target
pub fn interpolate(from: (f64, f64), to: (f64, f64), steps: u32) -> Vec<(f64, f64)> {
    let steps = steps.max(1);
    (1..=steps)
        .map(|i| {
            let t = f64::from(i) / f64::from(steps);
            (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t)
        })
        .collect()
}

/// Play `gestures` on `page`.
pub async fn perform(page: &Page, gestures: &[Gesture]) {
    let mut position = (0.0, 0.0);

    for gesture in gestures {
        match *gesture {
            Gesture::Move { x, y, steps } => {
                for (px, py) in interpolate(position, (x, y), steps) {
                    let params =
                        DispatchMouseEventParams::new(DispatchMouseEventType::MouseMoved, px, py);
                    if let Err(e) = page.execute(params).await {
                        debug!("Mouse move skipped: {}", e);
                        break;
                    }
                }
                position = (x, y);
            }
            Gesture::Wheel { delta_y } => {
                let params = DispatchMouseEventParams::builder()
                    .r#type(DispatchMouseEventType::MouseWheel)
                    .x(position.0)
                    .y(position.1)
                    .delta_x(0.0)
                    .delta_y(delta_y)
                    .build();
                match params {
                    Ok(params) => {
                        if let Err(e) = page.execute(params).await {
                            debug!("Scroll skipped: {}", e);
                        }
                    }
                    Err(e) => debug!("Scroll skipped: {}", e),
                }
            }
            Gesture::Pause(duration) => sleep(duration).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_ends_at_target() {
        let points = interpolate((0.0, 0.0), (200.0, 300.0), 20);
        assert_eq!(points.len(), 20);
        assert_eq!(points[0], (10.0, 15.0));
        assert_eq!(*points.last().unwrap(), (200.0, 300.0));
    }

    #[test]
    fn test_interpolate_zero_steps_jumps() {
        assert_eq!(interpolate((5.0, 5.0), (6.0, 7.0), 0), vec![(6.0, 7.0)]);
    }

    #[test]
    fn test_routines_scroll_down() {
        for routine in [BROWSE, SKIM] {
            let scrolled: f64 = routine
                .iter()
                .filter_map(|g| match g {
                    Gesture::Wheel { delta_y } => Some(*delta_y),
                    _ => None,
                })
                .sum();
            assert!(scrolled >= 1400.0);
        }
    }
}
