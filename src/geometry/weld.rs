// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Vertex welding
//!
//! Merges vertices that lie within a radius of each other. Welding can
//! collapse facets; those facets are kept as they are.

use super::{FacetMesh, PointCloud, SurfaceMesh};
use crate::error::{BvhError, Result};
use nalgebra::Point;
use serde::{Deserialize, Serialize};

/// Welding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeldOptions {
    /// Vertices at most this far apart are merged
    pub radius: f64,
    /// Only weld vertices lying on boundary edges
    pub boundary_only: bool,
}

impl Default for WeldOptions {
    fn default() -> Self {
        Self {
            radius: 1e-6,
            boundary_only: false,
        }
    }
}

/// Weld the vertices of `mesh` in place and return how many were removed.
///
/// Vertices are visited in order; an unassigned vertex starts a new group
/// and pulls in every unassigned vertex within `radius`. The first vertex of
/// a group keeps its position.
pub fn weld_vertices(mesh: &mut SurfaceMesh, options: &WeldOptions) -> Result<usize> {
    let mapping = match mesh.dimension() {
        2 => compute_vertex_mapping::<2>(mesh, options),
        3 => compute_vertex_mapping::<3>(mesh, options),
        d => {
            return Err(BvhError::InvalidInput(format!(
                "welding supports 2D and 3D meshes, got {d}D"
            )))
        }
    };

    let before = mesh.num_vertices();
    mesh.remap_vertices(&mapping);
    let removed = before - mesh.num_vertices();
    log::debug!(
        "Welded {} of {} vertices (radius {}, boundary only: {})",
        removed,
        before,
        options.radius,
        options.boundary_only
    );
    Ok(removed)
}

fn compute_vertex_mapping<const D: usize>(mesh: &SurfaceMesh, options: &WeldOptions) -> Vec<usize> {
    let num_vertices = mesh.num_vertices();
    let participates = if options.boundary_only {
        mesh.boundary_vertices()
    } else {
        vec![true; num_vertices]
    };

    // Cloud index -> mesh vertex
    let candidates: Vec<usize> = (0..num_vertices).filter(|&v| participates[v]).collect();
    let points: Vec<Point<f64, D>> = candidates.iter().map(|&v| mesh.position::<D>(v)).collect();
    let cloud = PointCloud::new(points);

    let mut mapping: Vec<Option<usize>> = vec![None; num_vertices];
    let mut group_count = 0;
    for v in 0..num_vertices {
        if mapping[v].is_some() {
            continue;
        }
        mapping[v] = Some(group_count);

        if participates[v] {
            for neighbour in cloud.query_in_sphere(&mesh.position::<D>(v), options.radius) {
                let other = candidates[neighbour.index];
                if mapping[other].is_none() {
                    mapping[other] = Some(group_count);
                }
            }
        }
        group_count += 1;
    }

    mapping.into_iter().flatten().collect()
}
