// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Nearest-neighbour queries over a point set

use super::{BoundingBox, Bvh};
use crate::config::BuildConfig;
use nalgebra::Point;
use serde::Serialize;

/// A point of the cloud returned by a query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbour<const D: usize> {
    pub index: usize,
    pub point: Point<f64, D>,
    pub squared_distance: f64,
}

/// Point set indexed by a BVH of degenerate boxes.
#[derive(Debug, Clone, Default)]
pub struct PointCloud<const D: usize> {
    points: Vec<Point<f64, D>>,
    bvh: Bvh<D>,
}

impl<const D: usize> PointCloud<D> {
    pub fn new(points: Vec<Point<f64, D>>) -> Self {
        Self::with_config(points, &BuildConfig::default())
    }

    pub fn with_config(points: Vec<Point<f64, D>>, config: &BuildConfig) -> Self {
        let boxes: Vec<_> = points.iter().map(BoundingBox::from_point).collect();
        let bvh = Bvh::build_with(&boxes, config);
        Self { points, bvh }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[Point<f64, D>] {
        &self.points
    }

    fn neighbour(&self, index: usize, query: &Point<f64, D>) -> Neighbour<D> {
        let point = self.points[index];
        Neighbour {
            index,
            point,
            squared_distance: (point - query).norm_squared(),
        }
    }

    pub fn query_closest_point(&self, query: &Point<f64, D>) -> Option<Neighbour<D>> {
        let index = self
            .bvh
            .get_closest_element(query, |i| (self.points[i] - query).norm_squared())?;
        Some(self.neighbour(index, query))
    }

    /// The `k` nearest points, nearest first. Ties go to the lower index.
    pub fn query_k_nearest(&self, query: &Point<f64, D>, k: usize) -> Vec<Neighbour<D>> {
        self.bvh
            .get_k_closest_elements(query, k, |i| (self.points[i] - query).norm_squared())
            .into_iter()
            .map(|(index, _)| self.neighbour(index, query))
            .collect()
    }

    /// Every point within `radius` of `query` (inclusive), nearest first.
    pub fn query_in_sphere(&self, query: &Point<f64, D>, radius: f64) -> Vec<Neighbour<D>> {
        let sq_radius = radius * radius;
        let mut found = Vec::new();
        self.bvh.foreach_element_within_radius(query, sq_radius, |index| {
            let neighbour = self.neighbour(index, query);
            if neighbour.squared_distance <= sq_radius {
                found.push(neighbour);
            }
        });
        found.sort_by(|a, b| {
            a.squared_distance
                .total_cmp(&b.squared_distance)
                .then(a.index.cmp(&b.index))
        });
        found
    }
}
