// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Surface mesh representation and the facet contract consumed by the trees

use super::BoundingBox;
use ahash::AHashMap;
use nalgebra::Point;
use serde::{Deserialize, Serialize};

/// Read-only view of a polygonal surface, as consumed by the trees.
pub trait FacetMesh {
    /// Number of coordinates per vertex
    fn dimension(&self) -> usize;
    fn num_vertices(&self) -> usize;
    fn num_facets(&self) -> usize;
    /// Vertex ids of a facet, in order
    fn facet_vertices(&self, facet: usize) -> &[usize];
    /// Coordinates of a vertex (`dimension()` values)
    fn vertex(&self, vertex: usize) -> &[f64];
}

impl<M: FacetMesh + ?Sized> FacetMesh for &M {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn num_vertices(&self) -> usize {
        (**self).num_vertices()
    }

    fn num_facets(&self) -> usize {
        (**self).num_facets()
    }

    fn facet_vertices(&self, facet: usize) -> &[usize] {
        (**self).facet_vertices(facet)
    }

    fn vertex(&self, vertex: usize) -> &[f64] {
        (**self).vertex(vertex)
    }
}

/// Polygonal surface mesh with a runtime dimension.
///
/// Coordinates are stored flat (`dimension` values per vertex) and facets as
/// a flat corner array with an offset table, so triangles and larger
/// polygons can be mixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMesh {
    dimension: usize,
    coords: Vec<f64>,
    corners: Vec<usize>,
    facet_offsets: Vec<usize>,
}

impl Default for SurfaceMesh {
    fn default() -> Self {
        Self::new(3)
    }
}

impl SurfaceMesh {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            coords: Vec::new(),
            corners: Vec::new(),
            facet_offsets: vec![0],
        }
    }

    pub fn with_capacity(dimension: usize, vertex_count: usize, triangle_count: usize) -> Self {
        let mut facet_offsets = Vec::with_capacity(triangle_count + 1);
        facet_offsets.push(0);
        Self {
            dimension,
            coords: Vec::with_capacity(vertex_count * dimension),
            corners: Vec::with_capacity(triangle_count * 3),
            facet_offsets,
        }
    }

    /// Build a triangle mesh from flat coordinates and index triples
    ///
    /// # Panics
    /// If `coords.len()` is not a multiple of `dimension` or a triangle
    /// refers to a missing vertex.
    pub fn from_triangles(dimension: usize, coords: &[f64], triangles: &[[usize; 3]]) -> Self {
        assert!(dimension > 0 && coords.len() % dimension == 0);
        let mut mesh = Self::with_capacity(dimension, coords.len() / dimension, triangles.len());
        for vertex in coords.chunks_exact(dimension) {
            mesh.add_vertex(vertex);
        }
        for &[a, b, c] in triangles {
            mesh.add_triangle(a, b, c);
        }
        mesh
    }

    /// Add a vertex and return its index
    ///
    /// # Panics
    /// If `position` does not have `dimension()` coordinates.
    pub fn add_vertex(&mut self, position: &[f64]) -> usize {
        assert_eq!(
            position.len(),
            self.dimension,
            "vertex has {} coordinates, mesh is {}D",
            position.len(),
            self.dimension
        );
        let index = self.num_vertices();
        self.coords.extend_from_slice(position);
        index
    }

    /// Add a triangle and return its facet index
    pub fn add_triangle(&mut self, v0: usize, v1: usize, v2: usize) -> usize {
        self.add_polygon(&[v0, v1, v2])
    }

    /// Add a quad and return its facet index
    pub fn add_quad(&mut self, v0: usize, v1: usize, v2: usize, v3: usize) -> usize {
        self.add_polygon(&[v0, v1, v2, v3])
    }

    /// Add a polygon and return its facet index
    ///
    /// # Panics
    /// If the polygon has fewer than 3 corners or refers to a missing vertex.
    pub fn add_polygon(&mut self, vertices: &[usize]) -> usize {
        assert!(vertices.len() >= 3, "facet needs at least 3 vertices");
        let num_vertices = self.num_vertices();
        assert!(
            vertices.iter().all(|&v| v < num_vertices),
            "facet refers to a missing vertex"
        );
        let index = self.num_facets();
        self.corners.extend_from_slice(vertices);
        self.facet_offsets.push(self.corners.len());
        index
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.num_vertices()
    }

    /// Get facet count
    pub fn facet_count(&self) -> usize {
        self.num_facets()
    }

    /// Flat coordinate array
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Position of a vertex as a `D`-dimensional point
    ///
    /// Only the first `D` coordinates are read; callers check the dimension.
    pub fn position<const D: usize>(&self, vertex: usize) -> Point<f64, D> {
        debug_assert!(D <= self.dimension);
        Point::from_slice(&self.vertex(vertex)[..D])
    }

    pub fn is_triangle_mesh(&self) -> bool {
        (0..self.num_facets()).all(|f| self.facet_vertices(f).len() == 3)
    }

    /// Compute bounding box of all vertices
    pub fn bounding_box<const D: usize>(&self) -> BoundingBox<D> {
        let mut bbox = BoundingBox::empty();
        for v in 0..self.num_vertices() {
            bbox.expand_to_include(&self.position::<D>(v));
        }
        bbox
    }

    /// Number of facets using each undirected edge
    pub fn edge_facet_counts(&self) -> AHashMap<(usize, usize), usize> {
        let mut counts = AHashMap::with_capacity(self.corners.len());
        for f in 0..self.num_facets() {
            let vertices = self.facet_vertices(f);
            for (i, &a) in vertices.iter().enumerate() {
                let b = vertices[(i + 1) % vertices.len()];
                *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Flags vertices lying on an edge used by exactly one facet
    pub fn boundary_vertices(&self) -> Vec<bool> {
        let mut is_boundary = vec![false; self.num_vertices()];
        for ((a, b), count) in self.edge_facet_counts() {
            if count == 1 {
                is_boundary[a] = true;
                is_boundary[b] = true;
            }
        }
        is_boundary
    }

    /// Merge vertices according to `mapping` (old vertex -> new vertex)
    ///
    /// New ids must cover `0..n` without gaps. The first old vertex mapped
    /// to a new id provides its position. Facets are rewritten in place.
    pub fn remap_vertices(&mut self, mapping: &[usize]) {
        assert_eq!(mapping.len(), self.num_vertices());
        let new_count = mapping.iter().map(|&m| m + 1).max().unwrap_or(0);

        let dim = self.dimension;
        let mut coords = vec![0.0; new_count * dim];
        let mut assigned = vec![false; new_count];
        for (old, &new) in mapping.iter().enumerate() {
            if !assigned[new] {
                assigned[new] = true;
                coords[new * dim..(new + 1) * dim].copy_from_slice(self.vertex(old));
            }
        }
        debug_assert!(assigned.iter().all(|&a| a), "vertex mapping has gaps");

        for corner in &mut self.corners {
            *corner = mapping[*corner];
        }
        self.coords = coords;
    }
}

impl FacetMesh for SurfaceMesh {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn num_vertices(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.coords.len() / self.dimension
        }
    }

    fn num_facets(&self) -> usize {
        self.facet_offsets.len() - 1
    }

    fn facet_vertices(&self, facet: usize) -> &[usize] {
        &self.corners[self.facet_offsets[facet]..self.facet_offsets[facet + 1]]
    }

    fn vertex(&self, vertex: usize) -> &[f64] {
        &self.coords[vertex * self.dimension..(vertex + 1) * self.dimension]
    }
}
