// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangulated primitive generators

use super::SurfaceMesh;
use nalgebra::Vector3;
use std::f64::consts::PI;

/// Geometric primitives
pub enum Primitive {
    Cube { size: Vector3<f64>, center: bool },
    Sphere { r: f64, fn_: u32 },
    /// Unit square in the plane split into `n * n` cells of two triangles
    Grid { n: u32 },
}

impl Primitive {
    pub fn cube(size: Vector3<f64>, center: bool) -> Self {
        Self::Cube { size, center }
    }

    pub fn sphere(r: f64, fn_: u32) -> Self {
        let segments = if fn_ > 2 { fn_ } else { 32 };
        Self::Sphere { r, fn_: segments }
    }

    pub fn grid(n: u32) -> Self {
        Self::Grid { n: n.max(1) }
    }

    pub fn to_mesh(&self) -> SurfaceMesh {
        match self {
            Self::Cube { size, center } => generate_cube_mesh(*size, *center),
            Self::Sphere { r, fn_ } => generate_sphere_mesh(*r, *fn_),
            Self::Grid { n } => generate_grid_mesh(*n),
        }
    }
}

fn generate_cube_mesh(size: Vector3<f64>, center: bool) -> SurfaceMesh {
    let offset = if center { -size / 2.0 } else { Vector3::zeros() };
    let (min_x, min_y, min_z) = (offset.x, offset.y, offset.z);
    let (max_x, max_y, max_z) = (offset.x + size.x, offset.y + size.y, offset.z + size.z);

    let mut mesh = SurfaceMesh::with_capacity(3, 8, 12);
    for position in [
        [min_x, min_y, min_z],
        [max_x, min_y, min_z],
        [max_x, max_y, min_z],
        [min_x, max_y, min_z],
        [min_x, min_y, max_z],
        [max_x, min_y, max_z],
        [max_x, max_y, max_z],
        [min_x, max_y, max_z],
    ] {
        mesh.add_vertex(&position);
    }

    // Two outward-facing triangles per face
    let faces = [
        [4, 5, 6], [4, 6, 7], // z+
        [1, 0, 3], [1, 3, 2], // z-
        [5, 1, 2], [5, 2, 6], // x+
        [0, 4, 7], [0, 7, 3], // x-
        [7, 6, 2], [7, 2, 3], // y+
        [0, 1, 5], [0, 5, 4], // y-
    ];
    for [a, b, c] in faces {
        mesh.add_triangle(a, b, c);
    }

    mesh
}

fn generate_sphere_mesh(radius: f64, segments: u32) -> SurfaceMesh {
    let stacks = segments;
    let slices = segments;
    let mut mesh = SurfaceMesh::new(3);

    for i in 0..=stacks {
        let phi = PI * i as f64 / stacks as f64;
        let y = radius * phi.cos();
        let r = radius * phi.sin();

        for j in 0..=slices {
            let theta = 2.0 * PI * j as f64 / slices as f64;
            mesh.add_vertex(&[r * theta.cos(), y, r * theta.sin()]);
        }
    }

    let row = (slices + 1) as usize;
    for i in 0..stacks as usize {
        for j in 0..slices as usize {
            let a = i * row + j;
            let b = a + row;
            // Skip the zero-area triangles at the poles
            if i != 0 {
                mesh.add_triangle(a, b, a + 1);
            }
            if i + 1 != stacks as usize {
                mesh.add_triangle(a + 1, b, b + 1);
            }
        }
    }

    mesh
}

fn generate_grid_mesh(n: u32) -> SurfaceMesh {
    let n = n as usize;
    let row = n + 1;
    let mut mesh = SurfaceMesh::with_capacity(2, row * row, 2 * n * n);

    for i in 0..=n {
        for j in 0..=n {
            mesh.add_vertex(&[j as f64 / n as f64, i as f64 / n as f64]);
        }
    }
    for i in 0..n {
        for j in 0..n {
            let a = i * row + j;
            mesh.add_triangle(a, a + 1, a + row);
            mesh.add_triangle(a + 1, a + row + 1, a + row);
        }
    }

    mesh
}
