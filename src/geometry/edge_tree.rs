// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! BVH over the edges of a polyline or edge graph

use super::distance::{point_on_segment, point_segment_squared_distance};
use super::{BoundingBox, Bvh, ClosestPoint};
use crate::error::{BvhError, Result};
use nalgebra::Point;

/// Segment tree over an edge graph, owning a copy of its vertices.
#[derive(Debug, Clone)]
pub struct EdgeAabbTree<const D: usize> {
    vertices: Vec<Point<f64, D>>,
    edges: Vec<[usize; 2]>,
    bvh: Bvh<D>,
}

impl<const D: usize> EdgeAabbTree<D> {
    pub fn new(vertices: Vec<Point<f64, D>>, edges: Vec<[usize; 2]>) -> Result<Self> {
        let mut boxes = Vec::with_capacity(edges.len());
        for &[a, b] in &edges {
            for v in [a, b] {
                if v >= vertices.len() {
                    return Err(BvhError::IndexOutOfBounds {
                        index: v,
                        len: vertices.len(),
                    });
                }
            }
            boxes.push(BoundingBox::from_points([&vertices[a], &vertices[b]]));
        }

        let bvh = Bvh::build(&boxes);
        Ok(Self {
            vertices,
            edges,
            bvh,
        })
    }

    /// Build from flat coordinates (`dimension` values per vertex).
    pub fn from_flat(dimension: usize, coords: &[f64], edges: Vec<[usize; 2]>) -> Result<Self> {
        if dimension != D {
            return Err(BvhError::DimensionMismatch {
                expected: D,
                got: dimension,
            });
        }
        if coords.len() % D != 0 {
            return Err(BvhError::InvalidInput(format!(
                "{} coordinates do not form {}D vertices",
                coords.len(),
                D
            )));
        }
        let vertices = coords.chunks_exact(D).map(Point::from_slice).collect();
        Self::new(vertices, edges)
    }

    pub fn is_empty(&self) -> bool {
        self.bvh.is_empty()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn bvh(&self) -> &Bvh<D> {
        &self.bvh
    }

    fn segment(&self, edge: usize) -> (&Point<f64, D>, &Point<f64, D>) {
        let [a, b] = self.edges[edge];
        (&self.vertices[a], &self.vertices[b])
    }

    /// Closest point on edge `edge` and its squared distance.
    ///
    /// A point lying on the segment is returned as is, at distance 0.
    pub fn get_element_closest_point(
        &self,
        point: &Point<f64, D>,
        edge: usize,
    ) -> (Point<f64, D>, f64) {
        let (closest, sq_dist, _) = self.closest_on_edge(point, edge);
        (closest, sq_dist)
    }

    fn closest_on_edge(&self, point: &Point<f64, D>, edge: usize) -> (Point<f64, D>, f64, f64) {
        let (a, b) = self.segment(edge);
        let (sq_dist, closest, t) = point_segment_squared_distance(point, a, b);
        if point_on_segment(point, a, b) {
            (*point, 0.0, t)
        } else {
            (closest, sq_dist, t)
        }
    }

    /// Call `visit(squared_distance, edge, closest_point)` for every edge
    /// within `sq_radius` of `point` (inclusive).
    pub fn foreach_element_in_radius<F>(&self, point: &Point<f64, D>, sq_radius: f64, mut visit: F)
    where
        F: FnMut(f64, usize, &Point<f64, D>),
    {
        self.bvh.foreach_element_within_radius(point, sq_radius, |edge| {
            let (closest, sq_dist) = self.get_element_closest_point(point, edge);
            if sq_dist <= sq_radius {
                visit(sq_dist, edge, &closest);
            }
        });
    }

    /// Call `visit(0, edge, point)` for every edge that `point` lies on.
    pub fn foreach_element_containing<F>(&self, point: &Point<f64, D>, mut visit: F)
    where
        F: FnMut(f64, usize, &Point<f64, D>),
    {
        let query = BoundingBox::from_point(point);
        self.bvh.intersect_with(&query, |edge| {
            let (a, b) = self.segment(edge);
            if point_on_segment(point, a, b) {
                visit(0.0, edge, point);
            }
            true
        });
    }

    pub fn get_closest_point(&self, point: &Point<f64, D>) -> ClosestPoint<D> {
        self.get_closest_point_filtered(point, |_| true)
    }

    /// Closest point over the edges accepted by `filter`.
    ///
    /// The barycentric field holds `[1 - t, t, 0]` for the segment parameter `t`.
    pub fn get_closest_point_filtered<F>(
        &self,
        point: &Point<f64, D>,
        mut filter: F,
    ) -> ClosestPoint<D>
    where
        F: FnMut(usize) -> bool,
    {
        let mut best: Option<(usize, Point<f64, D>, f64, f64)> = None;
        let element = self.bvh.get_closest_element(point, |edge| {
            if !filter(edge) {
                return f64::INFINITY;
            }
            let (closest, sq_dist, t) = self.closest_on_edge(point, edge);
            if best.map_or(true, |(_, _, best_dist, _)| sq_dist < best_dist) {
                best = Some((edge, closest, sq_dist, t));
            }
            sq_dist
        });

        match (element, best) {
            (Some(edge), Some((best_edge, closest_point, squared_distance, t)))
                if edge == best_edge =>
            {
                ClosestPoint {
                    element: Some(edge),
                    closest_point,
                    squared_distance,
                    barycentric: [1.0 - t, t, 0.0],
                }
            }
            _ => ClosestPoint::not_found(),
        }
    }
}
