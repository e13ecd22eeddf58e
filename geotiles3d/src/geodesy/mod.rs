//! Geodetic primitives consumed by the tile encoders.
//!
//! Angles are in radians and heights in meters throughout, matching the
//! units of a tileset `boundingVolume.region`.
//!
//! # Example
//!
//! ```
//! use geotiles3d::geodesy::{BoundingRegion, Rectangle};
//!
//! let a = BoundingRegion::new(Rectangle::new(0.0, 0.0, 1.0, 1.0), 0.0, 10.0);
//! let b = BoundingRegion::new(Rectangle::new(2.0, 2.0, 3.0, 3.0), -5.0, 5.0);
//!
//! let union = a.union(&b);
//! assert_eq!(union.to_region_array(), [0.0, 0.0, 3.0, 3.0, -5.0, 10.0]);
//! ```

mod ellipsoid;

pub use ellipsoid::{model_orientation, Ellipsoid};

use std::f64::consts::{PI, TAU};

/// A position on the ellipsoid surface (plus height).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cartographic {
    /// Longitude in radians.
    pub longitude: f64,
    /// Latitude in radians.
    pub latitude: f64,
    /// Height above the ellipsoid in meters.
    pub height: f64,
}

impl Cartographic {
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }

    /// Create a position from degrees (height in meters).
    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Self::new(longitude.to_radians(), latitude.to_radians(), height)
    }
}

/// A geodetic rectangle in radians.
///
/// `east < west` denotes a rectangle crossing the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rectangle {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Rectangle {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Create a rectangle from degrees.
    pub fn from_degrees(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self::new(
            west.to_radians(),
            south.to_radians(),
            east.to_radians(),
            north.to_radians(),
        )
    }

    /// Center of the rectangle at zero height.
    pub fn center(&self) -> Cartographic {
        let mut east = self.east;
        if east < self.west {
            east += TAU;
        }
        let longitude = negative_pi_to_pi((self.west + east) * 0.5);
        let latitude = (self.south + self.north) * 0.5;
        Cartographic::new(longitude, latitude, 0.0)
    }

    /// Smallest rectangle containing both rectangles.
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        Rectangle {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }
}

/// Wrap an angle into `[-PI, PI]`.
fn negative_pi_to_pi(angle: f64) -> f64 {
    if (-PI..=PI).contains(&angle) {
        return angle;
    }
    (angle + PI).rem_euclid(TAU) - PI
}

/// A rectangle plus a height range: the `region` bounding volume.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingRegion {
    pub rectangle: Rectangle,
    pub minimum_height: f64,
    pub maximum_height: f64,
}

impl BoundingRegion {
    pub fn new(rectangle: Rectangle, minimum_height: f64, maximum_height: f64) -> Self {
        Self {
            rectangle,
            minimum_height,
            maximum_height,
        }
    }

    /// Smallest region enclosing both regions.
    pub fn union(&self, other: &BoundingRegion) -> BoundingRegion {
        BoundingRegion {
            rectangle: self.rectangle.union(&other.rectangle),
            minimum_height: self.minimum_height.min(other.minimum_height),
            maximum_height: self.maximum_height.max(other.maximum_height),
        }
    }

    /// `[west, south, east, north, minimumHeight, maximumHeight]`.
    pub fn to_region_array(&self) -> [f64; 6] {
        [
            self.rectangle.west,
            self.rectangle.south,
            self.rectangle.east,
            self.rectangle.north,
            self.minimum_height,
            self.maximum_height,
        ]
    }

    /// Parse a six-number `region` array.
    pub fn from_region_array(region: [f64; 6]) -> Self {
        Self::new(
            Rectangle::new(region[0], region[1], region[2], region[3]),
            region[4],
            region[5],
        )
    }
}
