//! Edge auto-scroll during a drag session.
//!
//! Near the top or bottom edge of the scroll viewport the scroller produces a
//! per-tick scroll delta that grows with edge depth and pointer speed. Moving
//! away from the edge sets the target to zero; the output eases toward its
//! target so stopping and reversing never jump.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoScrollConfig {
    /// Distance from a viewport edge (px) where scrolling engages.
    pub edge_zone: f64,
    /// Scroll per tick (px) at full depth with a stationary pointer.
    pub base_speed: f64,
    /// Extra scroll per tick for each px/s of pointer speed toward the edge.
    pub velocity_gain: f64,
    pub max_speed: f64,
    /// Fraction of the gap to the target closed on each update (0..=1).
    pub smoothing: f64,
}

impl Default for AutoScrollConfig {
    fn default() -> Self {
        Self {
            edge_zone: 60.0,
            base_speed: 4.0,
            velocity_gain: 0.02,
            max_speed: 28.0,
            smoothing: 0.35,
        }
    }
}

/// The visible band of the scrollable ancestor, in the same coordinate
/// space as pointer positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollViewport {
    pub top: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct AutoScroller {
    config: AutoScrollConfig,
    viewport: ScrollViewport,
    last: Option<(f64, Instant)>,
    speed: f64,
}

impl AutoScroller {
    pub fn new(config: AutoScrollConfig, viewport: ScrollViewport) -> Self {
        Self {
            config,
            viewport,
            last: None,
            speed: 0.0,
        }
    }

    pub fn set_viewport(&mut self, viewport: ScrollViewport) {
        self.viewport = viewport;
    }

    /// Current smoothed scroll speed (px per tick, negative scrolls up).
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Feed a pointer position; returns the scroll delta to apply this tick.
    pub fn update(&mut self, pointer_y: f64) -> f64 {
        let now = Instant::now();
        let velocity = match self.last {
            Some((prev_y, at)) => {
                let dt = now.duration_since(at).max(Duration::from_millis(1)).as_secs_f64();
                (pointer_y - prev_y) / dt
            }
            None => 0.0,
        };
        self.last = Some((pointer_y, now));

        let target = self.target_speed(pointer_y, velocity);
        self.speed += (target - self.speed) * self.config.smoothing.clamp(0.0, 1.0);
        if self.speed.abs() < 0.5 && target == 0.0 {
            self.speed = 0.0;
        }
        self.speed
    }

    fn target_speed(&self, pointer_y: f64, velocity: f64) -> f64 {
        let zone = self.config.edge_zone.max(1.0);
        let top_depth = (self.viewport.top + zone - pointer_y) / zone;
        let bottom_depth = (pointer_y - (self.viewport.top + self.viewport.height - zone)) / zone;

        let magnitude = |depth: f64, toward_edge: f64| {
            let depth = depth.clamp(0.0, 1.0);
            (depth * (self.config.base_speed + toward_edge * self.config.velocity_gain))
                .min(self.config.max_speed)
        };

        if top_depth > 0.0 && velocity <= 0.0 {
            -magnitude(top_depth, -velocity)
        } else if bottom_depth > 0.0 && velocity >= 0.0 {
            magnitude(bottom_depth, velocity)
        } else {
            0.0
        }
    }

    /// Drop motion history and stop immediately (drag ended).
    pub fn reset(&mut self) {
        self.last = None;
        self.speed = 0.0;
    }
}
