// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - boxes, hierarchies and the trees built on them

mod bbox;
mod bvh;
pub mod distance;
mod edge_tree;
mod mesh;
mod point_cloud;
mod primitives;
mod triangle_tree;
mod weld;

pub use bbox::BoundingBox;
pub use bvh::{Bvh, BvhNode};
pub use edge_tree::EdgeAabbTree;
pub use mesh::{FacetMesh, SurfaceMesh};
pub use point_cloud::{Neighbour, PointCloud};
pub use primitives::Primitive;
pub use triangle_tree::{ClosestPoint, TriangleAabbTree};
pub use weld::{weld_vertices, WeldOptions};
