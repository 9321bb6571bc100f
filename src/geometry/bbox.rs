// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding box utilities

use nalgebra::{Point, SVector};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in `D` dimensions.
///
/// A box with `min > max` on any axis is empty. The default box is the
/// empty box `[+inf, -inf]`, the identity for [`BoundingBox::extend`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox<const D: usize> {
    pub min: Point<f64, D>,
    pub max: Point<f64, D>,
}

impl<const D: usize> Default for BoundingBox<D> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const D: usize> BoundingBox<D> {
    pub fn new(min: Point<f64, D>, max: Point<f64, D>) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Point::from([f64::INFINITY; D]),
            max: Point::from([f64::NEG_INFINITY; D]),
        }
    }

    pub fn from_point(point: &Point<f64, D>) -> Self {
        Self {
            min: *point,
            max: *point,
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point<f64, D>>) -> Self {
        let mut bbox = Self::empty();
        for point in points {
            bbox.expand_to_include(point);
        }
        bbox
    }

    /// True if some axis has `min > max` (or a NaN bound).
    pub fn is_empty(&self) -> bool {
        (0..D).any(|d| !(self.min[d] <= self.max[d]))
    }

    pub fn expand_to_include(&mut self, point: &Point<f64, D>) {
        for d in 0..D {
            self.min[d] = self.min[d].min(point[d]);
            self.max[d] = self.max[d].max(point[d]);
        }
    }

    /// Grow this box to enclose `other`. Empty boxes contribute nothing.
    pub fn extend(&mut self, other: &BoundingBox<D>) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        for d in 0..D {
            self.min[d] = self.min[d].min(other.min[d]);
            self.max[d] = self.max[d].max(other.max[d]);
        }
    }

    pub fn union(&self, other: &BoundingBox<D>) -> Self {
        let mut bbox = *self;
        bbox.extend(other);
        bbox
    }

    pub fn center(&self) -> Point<f64, D> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn diagonal(&self) -> SVector<f64, D> {
        self.max - self.min
    }

    /// Axis with the largest extent; the first one wins ties.
    pub fn longest_axis(&self) -> usize {
        let extent = self.diagonal();
        let mut axis = 0;
        for d in 1..D {
            if extent[d] > extent[axis] {
                axis = d;
            }
        }
        axis
    }

    /// Closed-interval overlap test: touching boxes intersect, empty boxes
    /// intersect nothing.
    pub fn intersects(&self, other: &BoundingBox<D>) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (0..D).all(|d| self.min[d] <= other.max[d] && other.min[d] <= self.max[d])
    }

    pub fn contains(&self, other: &BoundingBox<D>) -> bool {
        other.is_empty()
            || (0..D).all(|d| self.min[d] <= other.min[d] && other.max[d] <= self.max[d])
    }

    /// Squared distance from `point` to the closest point of the box.
    ///
    /// Zero inside the box, `+inf` for an empty box.
    pub fn squared_exterior_distance(&self, point: &Point<f64, D>) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        let mut sq_dist = 0.0;
        for d in 0..D {
            let gap = (self.min[d] - point[d]).max(point[d] - self.max[d]).max(0.0);
            sq_dist += gap * gap;
        }
        sq_dist
    }
}
