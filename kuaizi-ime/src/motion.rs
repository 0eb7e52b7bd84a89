//! Gesture samples relative to an anchor.
//!
//! A [`Motion`] records where a gesture sample happened, when, and how far and
//! in which rough direction it lies from the anchor the tracked interaction
//! started at. Anchors are plain `Option<Motion>` values; `None` plays the
//! role of the null motion an interaction resets to when it ends.

use std::time::Instant;

use crate::px::PxPosition;

/// Coarse direction of a displacement on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// No displacement.
    #[default]
    None,
    /// Toward the top edge.
    Up,
    /// Toward the bottom edge.
    Down,
    /// Toward the left edge.
    Left,
    /// Toward the right edge.
    Right,
}

/// A single gesture sample measured from an anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// Where the sample happened.
    pub position: PxPosition,
    /// When the sample happened.
    pub timestamp: Instant,
    /// Rough direction from the anchor.
    pub direction: Direction,
    /// Straight-line distance from the anchor, in pixels.
    pub distance: f32,
}

impl Motion {
    /// Creates an anchor: a motion with no displacement.
    pub fn anchor(position: PxPosition, timestamp: Instant) -> Self {
        Self {
            position,
            timestamp,
            direction: Direction::None,
            distance: 0.0,
        }
    }

    /// Measures a sample against this motion taken as the anchor.
    ///
    /// The direction is classified by the angle between the displacement and
    /// the x-axis: 45 to 135 degrees is vertical (screen y grows downward),
    /// 135 to 180 degrees is left, everything else is right.
    pub fn to(&self, position: PxPosition, timestamp: Instant) -> Self {
        let dx = (position.x.0 - self.position.x.0) as f64;
        let dy = (position.y.0 - self.position.y.0) as f64;
        let distance = (dx * dx + dy * dy).sqrt();

        let direction = if distance == 0.0 {
            Direction::None
        } else {
            let angle = (dx / distance).acos().to_degrees();
            if (45.0..135.0).contains(&angle) {
                if dy > 0.0 {
                    Direction::Down
                } else {
                    Direction::Up
                }
            } else if (135.0..=180.0).contains(&angle) {
                Direction::Left
            } else {
                Direction::Right
            }
        };

        Self {
            position,
            timestamp,
            direction,
            distance: distance as f32,
        }
    }

    /// Whether the sample moved at all from its anchor.
    pub fn is_moved(&self) -> bool {
        self.distance > 0.0
    }
}
