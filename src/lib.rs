// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! meshbvh
//!
//! Bounding volume hierarchies over axis-aligned boxes, and the proximity
//! queries built on them: closest point on a triangle mesh, radius search,
//! box overlap, nearest edges and nearest points. Also welds coincident
//! vertices.
//!
//! ```no_run
//! use meshbvh::{geometry::TriangleAabbTree, io::load_stl};
//! use nalgebra::Point3;
//!
//! let mesh = load_stl("part.stl")?;
//! let tree = TriangleAabbTree::<_, 3>::new(&mesh)?;
//! let hit = tree.get_closest_point(&Point3::new(0.0, 0.0, 10.0));
//! println!("facet {:?} at distance {}", hit.element, hit.squared_distance.sqrt());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod io;

pub use config::{BuildConfig, MeshBvhConfig};
pub use engine::{
    create_engine, create_engine_with_config, EngineHit, EngineType, SpatialEngine,
};
pub use error::{BvhError, Result};
pub use geometry::{
    BoundingBox, Bvh, ClosestPoint, EdgeAabbTree, FacetMesh, PointCloud, SurfaceMesh,
    TriangleAabbTree,
};
