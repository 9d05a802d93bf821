#![warn(missing_docs)]

//! Units and point types for the stratum slicer.
//!
//! Thin wrappers around nalgebra. All geometry is carried in integer
//! micrometers so boolean and offset operations never accumulate
//! floating-point drift; millimeters appear only where values leave the
//! geometry domain (feed rates, extrusion amounts, G-code coordinates).

use nalgebra::{Point2, Point3};

/// Length in micrometers. The unit of every geometric coordinate.
pub type Micrometer = i64;

/// Length (or speed in mm/s) in millimeters.
pub type Millimeter = f64;

/// A point in the layer plane, in micrometers.
pub type MicroPoint = Point2<Micrometer>;

/// A machine position, in micrometers.
pub type MicroVec3 = Point3<Micrometer>;

/// Micrometers per millimeter.
pub const MICROMETERS_PER_MILLIMETER: f64 = 1000.0;

/// Convert micrometers to millimeters.
pub fn to_millimeter(value: Micrometer) -> Millimeter {
    value as f64 / MICROMETERS_PER_MILLIMETER
}

/// Euclidean distance between two points, in millimeters.
pub fn distance_mm(a: &MicroPoint, b: &MicroPoint) -> Millimeter {
    let dx = to_millimeter(b.x - a.x);
    let dy = to_millimeter(b.y - a.y);
    dx.hypot(dy)
}

/// Lift a layer-plane point to a machine position at height `z`.
pub fn at_height(p: &MicroPoint, z: Micrometer) -> MicroVec3 {
    MicroVec3::new(p.x, p.y, z)
}

/// Axis-aligned bounding box in micrometers (inclusive corners).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: MicroPoint,
    /// Maximum corner.
    pub max: MicroPoint,
}

impl BoundingBox {
    /// Box spanning exactly one point.
    pub fn from_point(p: MicroPoint) -> Self {
        Self { min: p, max: p }
    }

    /// Smallest box containing every point, or `None` when there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a MicroPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::from_point(*first);
        for p in iter {
            bbox.include(p);
        }
        Some(bbox)
    }

    /// Grow the box so it contains `p`.
    pub fn include(&mut self, p: &MicroPoint) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Merge another box into this one.
    pub fn merge(&mut self, other: &BoundingBox) {
        self.include(&other.min);
        self.include(&other.max);
    }

    /// Extent along X.
    pub fn width(&self) -> Micrometer {
        self.max.x - self.min.x
    }

    /// Whether `p` lies inside or on the border of the box.
    pub fn contains(&self, p: &MicroPoint) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}
