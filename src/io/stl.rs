// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL import and export

use crate::geometry::{FacetMesh, SurfaceMesh};
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};

/// Load an ASCII or binary STL file into a 3D triangle mesh.
///
/// Vertices with identical coordinates are shared between facets.
pub fn load_stl(path: impl AsRef<Path>) -> Result<SurfaceMesh> {
    let path = path.as_ref();
    let mut file =
        File::open(path).with_context(|| format!("Failed to open STL file: {:?}", path))?;
    let stl = stl_io::read_stl(&mut file)
        .with_context(|| format!("Failed to read STL file: {:?}", path))?;

    let mut mesh = SurfaceMesh::with_capacity(3, stl.vertices.len(), stl.faces.len());
    for vertex in &stl.vertices {
        mesh.add_vertex(&[vertex[0] as f64, vertex[1] as f64, vertex[2] as f64]);
    }
    for face in &stl.faces {
        let [v0, v1, v2] = face.vertices;
        mesh.add_triangle(v0, v1, v2);
    }

    log::debug!(
        "Loaded {:?}: {} vertices, {} triangles",
        path,
        mesh.vertex_count(),
        mesh.facet_count()
    );
    Ok(mesh)
}

/// Save a 3D triangle mesh as binary STL.
pub fn save_stl(mesh: &SurfaceMesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if mesh.dimension() != 3 {
        bail!("STL export needs a 3D mesh, got {}D", mesh.dimension());
    }
    if !mesh.is_triangle_mesh() {
        bail!("STL export needs a triangle mesh");
    }

    let triangles: Vec<StlTriangle> = (0..mesh.num_facets())
        .map(|f| {
            let corners = mesh.facet_vertices(f);
            let [p0, p1, p2] = [0, 1, 2].map(|i| mesh.position::<3>(corners[i]));
            let normal = (p1 - p0).cross(&(p2 - p0)).try_normalize(0.0).unwrap_or_default();

            StlTriangle {
                normal: Normal::new([normal.x as f32, normal.y as f32, normal.z as f32]),
                vertices: [p0, p1, p2]
                    .map(|p| StlVertex::new([p.x as f32, p.y as f32, p.z as f32])),
            }
        })
        .collect();

    let file =
        File::create(path).with_context(|| format!("Failed to create STL file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    stl_io::write_stl(&mut writer, triangles.iter()).context("Failed to write STL file")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::Vector3;
    use tempfile::TempDir;

    #[test]
    fn test_stl_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("cube.stl");
        let cube = Primitive::cube(Vector3::new(10.0, 10.0, 10.0), false).to_mesh();

        save_stl(&cube, &path)?;
        let loaded = load_stl(&path)?;

        assert_eq!(loaded.facet_count(), 12);
        // Shared corners survive the round trip.
        assert_eq!(loaded.vertex_count(), 8);
        assert_eq!(loaded.bounding_box::<3>(), cube.bounding_box::<3>());
        Ok(())
    }

    #[test]
    fn test_save_rejects_2d_mesh() {
        let dir = TempDir::new().unwrap();
        let grid = Primitive::grid(2).to_mesh();
        assert!(save_stl(&grid, dir.path().join("grid.stl")).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_stl("/nonexistent/mesh.stl").is_err());
    }
}
