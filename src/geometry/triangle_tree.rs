// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! BVH over the triangles of a surface mesh
//!
//! One box per facet goes into a [`Bvh`]; the exact point-triangle distance
//! refines the box-level answers.

use super::distance::point_triangle_squared_distance;
use super::{BoundingBox, Bvh, FacetMesh};
use crate::config::BuildConfig;
use crate::error::{BvhError, Result};
use nalgebra::Point;
use rayon::prelude::*;
use serde::Serialize;

/// Answer of a closest-point query.
///
/// When nothing was found (empty tree) `element` is `None`, the distance is
/// `f64::MAX` and the point and barycentric coordinates are NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClosestPoint<const D: usize> {
    pub element: Option<usize>,
    pub closest_point: Point<f64, D>,
    pub squared_distance: f64,
    /// Weights of the element's corners giving `closest_point`
    pub barycentric: [f64; 3],
}

impl<const D: usize> ClosestPoint<D> {
    pub fn not_found() -> Self {
        Self {
            element: None,
            closest_point: Point::from([f64::NAN; D]),
            squared_distance: f64::MAX,
            barycentric: [f64::NAN; 3],
        }
    }

    pub fn found(&self) -> bool {
        self.element.is_some()
    }
}

/// Triangle AABB tree bound to a mesh.
///
/// `M` is anything implementing [`FacetMesh`], either owned or borrowed
/// (`&SurfaceMesh`). The mesh must not change while the tree exists.
#[derive(Debug, Clone)]
pub struct TriangleAabbTree<M, const D: usize> {
    mesh: M,
    bvh: Bvh<D>,
}

impl<M: FacetMesh, const D: usize> TriangleAabbTree<M, D> {
    /// Build the tree with the default [`BuildConfig`].
    pub fn new(mesh: M) -> Result<Self> {
        Self::with_config(mesh, &BuildConfig::default())
    }

    /// Build the tree.
    ///
    /// Fails if the mesh is not `D`-dimensional, has a non-triangular facet
    /// or a facet referring to a missing vertex.
    pub fn with_config(mesh: M, config: &BuildConfig) -> Result<Self> {
        if mesh.dimension() != D {
            return Err(BvhError::DimensionMismatch {
                expected: D,
                got: mesh.dimension(),
            });
        }

        let num_vertices = mesh.num_vertices();
        let mut boxes = Vec::with_capacity(mesh.num_facets());
        for facet in 0..mesh.num_facets() {
            let vertices = mesh.facet_vertices(facet);
            if vertices.len() != 3 {
                return Err(BvhError::NotATriangleMesh {
                    facet,
                    vertices: vertices.len(),
                });
            }

            let mut bbox = BoundingBox::<D>::empty();
            for &v in vertices {
                if v >= num_vertices {
                    return Err(BvhError::IndexOutOfBounds {
                        index: v,
                        len: num_vertices,
                    });
                }
                bbox.expand_to_include(&Point::from_slice(mesh.vertex(v)));
            }
            boxes.push(bbox);
        }

        let bvh = Bvh::build_with(&boxes, config);
        Ok(Self { mesh, bvh })
    }

    pub fn is_empty(&self) -> bool {
        self.bvh.is_empty()
    }

    pub fn num_triangles(&self) -> usize {
        self.mesh.num_facets()
    }

    pub fn mesh(&self) -> &M {
        &self.mesh
    }

    /// Underlying box hierarchy; element `i` is facet `i`.
    pub fn bvh(&self) -> &Bvh<D> {
        &self.bvh
    }

    pub(crate) fn triangle(&self, facet: usize) -> [Point<f64, D>; 3] {
        let vertices = self.mesh.facet_vertices(facet);
        [0, 1, 2].map(|i| Point::from_slice(self.mesh.vertex(vertices[i])))
    }

    /// Exact distance from `point` to a single facet.
    ///
    /// Returns `(squared_distance, closest_point, barycentric)`.
    pub fn get_triangle_closest_point(
        &self,
        point: &Point<f64, D>,
        facet: usize,
    ) -> (f64, Point<f64, D>, [f64; 3]) {
        let [a, b, c] = self.triangle(facet);
        point_triangle_squared_distance(point, &a, &b, &c)
    }

    /// Closest point on the mesh surface.
    pub fn get_closest_point(&self, point: &Point<f64, D>) -> ClosestPoint<D> {
        let element = self.bvh.get_closest_element(point, |facet| {
            self.get_triangle_closest_point(point, facet).0
        });

        let Some(facet) = element else {
            return ClosestPoint::not_found();
        };
        let (squared_distance, closest_point, barycentric) =
            self.get_triangle_closest_point(point, facet);
        ClosestPoint {
            element: Some(facet),
            closest_point,
            squared_distance,
            barycentric,
        }
    }

    /// Call `visit(squared_distance, facet, closest_point)` for every
    /// triangle within `sq_radius` of `point` (inclusive).
    pub fn foreach_triangle_in_radius<F>(&self, point: &Point<f64, D>, sq_radius: f64, mut visit: F)
    where
        F: FnMut(f64, usize, &Point<f64, D>),
    {
        self.bvh.foreach_element_within_radius(point, sq_radius, |facet| {
            let (sq_dist, closest, _) = self.get_triangle_closest_point(point, facet);
            if sq_dist <= sq_radius {
                visit(sq_dist, facet, &closest);
            }
        });
    }

    /// Triangles within `radius` (not squared) of `point` and the closest
    /// point on each, in traversal order.
    pub fn get_elements_in_radius(
        &self,
        point: &Point<f64, D>,
        radius: f64,
    ) -> (Vec<usize>, Vec<Point<f64, D>>) {
        let mut facets = Vec::new();
        let mut points = Vec::new();
        self.foreach_triangle_in_radius(point, radius * radius, |_, facet, closest| {
            facets.push(facet);
            points.push(*closest);
        });
        (facets, points)
    }
}

impl<M: FacetMesh + Sync, const D: usize> TriangleAabbTree<M, D> {
    /// Closest point for every query point, computed in parallel.
    pub fn batch_closest_points(&self, points: &[Point<f64, D>]) -> Vec<ClosestPoint<D>> {
        points
            .par_iter()
            .map(|point| self.get_closest_point(point))
            .collect()
    }
}
