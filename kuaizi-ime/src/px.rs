//! Physical pixel coordinates for pointer samples and key geometry.
//!
//! Pointer samples delivered by the host and the key bounds produced by a
//! [`KeyLayoutSource`](crate::KeyLayoutSource) share one coordinate space:
//!
//! - Origin (0, 0) at the top-left corner of the keyboard surface
//! - X-axis increases to the right
//! - Y-axis increases downward
//!
//! # Example
//!
//! ```
//! use kuaizi_ime::px::{Px, PxPosition, PxRect};
//!
//! let key = PxRect::new(Px(0), Px(0), Px(40), Px(60));
//! let finger = PxPosition::new(Px(12), Px(30));
//!
//! assert!(key.contains(finger));
//! assert_eq!(key.center(), PxPosition::new(Px(20), Px(30)));
//! ```

use std::ops::{Add, Neg, Sub};

/// A physical pixel coordinate value.
///
/// Negative values are valid: a finger can leave the keyboard surface while
/// a gesture is still in progress.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct Px(pub i32);

impl Px {
    /// A constant representing zero pixels.
    pub const ZERO: Self = Self(0);

    /// Creates a new `Px` instance from an i32 value.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the absolute value of this pixel coordinate.
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Converts a float to `Px`, saturating at the i32 bounds and truncating
    /// the fraction.
    pub fn saturating_from_f32(value: f32) -> Self {
        Self(value.clamp(i32::MIN as f32, i32::MAX as f32) as i32)
    }

    /// Returns the value as f32 for geometric calculations.
    pub fn to_f32(self) -> f32 {
        self.0 as f32
    }
}

impl Add for Px {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Px {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Px {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0.saturating_neg())
    }
}

impl From<i32> for Px {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// A 2D position in physical pixel space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PxPosition {
    /// The x-coordinate in physical pixels
    pub x: Px,
    /// The y-coordinate in physical pixels
    pub y: Px,
}

impl PxPosition {
    /// A constant representing the zero position (0, 0).
    pub const ZERO: Self = Self { x: Px(0), y: Px(0) };

    /// Creates a new position from x and y coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use kuaizi_ime::px::{Px, PxPosition};
    ///
    /// let position = PxPosition::new(Px::new(100), Px::new(200));
    /// assert_eq!(position.x, Px::new(100));
    /// assert_eq!(position.y, Px::new(200));
    /// ```
    pub const fn new(x: Px, y: Px) -> Self {
        Self { x, y }
    }

    /// Calculates the Euclidean distance to another position.
    ///
    /// # Examples
    ///
    /// ```
    /// use kuaizi_ime::px::{Px, PxPosition};
    ///
    /// let a = PxPosition::new(Px(0), Px(0));
    /// let b = PxPosition::new(Px(3), Px(4));
    /// assert_eq!(a.distance_to(b), 5.0);
    /// ```
    pub fn distance_to(self, other: Self) -> f32 {
        let dx = (self.x.0 - other.x.0) as f32;
        let dy = (self.y.0 - other.y.0) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Add for PxPosition {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for PxPosition {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl From<[i32; 2]> for PxPosition {
    fn from(pos: [i32; 2]) -> Self {
        Self {
            x: Px(pos[0]),
            y: Px(pos[1]),
        }
    }
}

/// An axis-aligned rectangle in physical pixel space, used as key bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PxRect {
    /// The x-coordinate of the top-left corner
    pub x: Px,
    /// The y-coordinate of the top-left corner
    pub y: Px,
    /// The width of the rectangle
    pub width: Px,
    /// The height of the rectangle
    pub height: Px,
}

impl PxRect {
    /// Creates a new rectangle from its top-left corner and size.
    pub const fn new(x: Px, y: Px, width: Px, height: Px) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Checks if a point is inside the rectangle.
    ///
    /// The left and top edges are inclusive, the right and bottom edges are
    /// exclusive, so adjacent keys never both claim a point.
    pub fn contains(&self, point: PxPosition) -> bool {
        point.x.0 >= self.x.0
            && point.x.0 < self.x.0 + self.width.0
            && point.y.0 >= self.y.0
            && point.y.0 < self.y.0 + self.height.0
    }

    /// Returns the center point of the rectangle.
    pub fn center(&self) -> PxPosition {
        PxPosition::new(
            Px(self.x.0 + self.width.0 / 2),
            Px(self.y.0 + self.height.0 / 2),
        )
    }

    /// Returns a copy mirrored horizontally inside a surface of the given
    /// width.
    pub fn mirrored(&self, surface_width: Px) -> Self {
        Self {
            x: Px(surface_width.0 - self.x.0 - self.width.0),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_px_arithmetic() {
        let a = Px(10);
        let b = Px(5);

        assert_eq!(a + b, Px(15));
        assert_eq!(a - b, Px(5));
        assert_eq!(-a, Px(-10));
        assert_eq!(Px(-7).abs(), Px(7));
    }

    #[test]
    fn test_px_saturating_arithmetic() {
        assert_eq!(Px(i32::MAX) + Px(1), Px(i32::MAX));
        assert_eq!(Px(i32::MIN) - Px(1), Px(i32::MIN));
        assert_eq!(Px::saturating_from_f32(f32::MAX), Px(i32::MAX));
        assert_eq!(Px::saturating_from_f32(-100.5), Px(-100));
    }

    #[test]
    fn test_position_distance() {
        let a = PxPosition::new(Px(1), Px(1));
        let b = PxPosition::new(Px(4), Px(5));

        assert_eq!(a.distance_to(b), 5.0);
        assert_eq!(b - a, PxPosition::new(Px(3), Px(4)));
    }

    #[test]
    fn test_rect_contains_edges() {
        let rect = PxRect::new(Px(10), Px(20), Px(30), Px(40));

        assert!(rect.contains(PxPosition::new(Px(10), Px(20))));
        assert!(rect.contains(PxPosition::new(Px(39), Px(59))));
        assert!(!rect.contains(PxPosition::new(Px(40), Px(20))));
        assert!(!rect.contains(PxPosition::new(Px(10), Px(60))));
    }

    #[test]
    fn test_rect_mirrored() {
        let rect = PxRect::new(Px(0), Px(0), Px(40), Px(40));
        let mirrored = rect.mirrored(Px(400));

        assert_eq!(mirrored.x, Px(360));
        assert_eq!(mirrored.width, Px(40));
    }
}
