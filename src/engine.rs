// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Interchangeable spatial query engines
//!
//! Every engine answers the same queries through [`SpatialEngine`]; a query
//! an engine cannot answer returns [`BvhError::UnsupportedQuery`].
//! Use [`create_engine`] to pick one at runtime.

use crate::config::BuildConfig;
use crate::error::{BvhError, Result};
use crate::geometry::{FacetMesh, Neighbour, PointCloud, SurfaceMesh, TriangleAabbTree};
use nalgebra::Point;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineType {
    /// Closest point on the triangles of a mesh
    Triangles,
    /// Nearest mesh vertices
    PointCloud,
}

impl EngineType {
    pub fn name(&self) -> &'static str {
        match self {
            EngineType::Triangles => "triangles",
            EngineType::PointCloud => "point-cloud",
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineType {
    type Err = BvhError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "triangles" => Ok(EngineType::Triangles),
            "point-cloud" | "pointcloud" => Ok(EngineType::PointCloud),
            other => Err(BvhError::InvalidInput(format!("unknown engine '{other}'"))),
        }
    }
}

/// One result of an engine query.
///
/// `element` is the triangle for the triangle engine and `None` for the
/// point cloud. `closest_vertex` is the nearest vertex (for triangles, the
/// nearest corner of `element`). A query that found nothing has both set to
/// `None` and `squared_distance == f64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineHit<const D: usize> {
    pub element: Option<usize>,
    pub closest_vertex: Option<usize>,
    pub closest_point: Point<f64, D>,
    pub squared_distance: f64,
}

impl<const D: usize> EngineHit<D> {
    pub fn not_found() -> Self {
        Self {
            element: None,
            closest_vertex: None,
            closest_point: Point::from([f64::NAN; D]),
            squared_distance: f64::MAX,
        }
    }

    pub fn found(&self) -> bool {
        self.element.is_some() || self.closest_vertex.is_some()
    }
}

/// Query contract shared by all engines
pub trait SpatialEngine<const D: usize>: Send + Sync {
    fn engine_type(&self) -> EngineType;

    fn supports_triangles(&self) -> bool;
    fn supports_point_cloud(&self) -> bool;
    fn supports_closest_point(&self) -> bool;
    fn supports_k_nearest_neighbours(&self) -> bool;
    fn supports_in_sphere_neighbours(&self) -> bool;

    fn query_closest_point(&self, point: &Point<f64, D>) -> Result<EngineHit<D>>;

    /// The `k` nearest results, nearest first.
    fn query_k_nearest_neighbours(
        &self,
        _point: &Point<f64, D>,
        _k: usize,
    ) -> Result<Vec<EngineHit<D>>> {
        Err(self.unsupported("k-nearest"))
    }

    /// All results within `radius`, nearest first.
    fn query_in_sphere_neighbours(
        &self,
        _point: &Point<f64, D>,
        _radius: f64,
    ) -> Result<Vec<EngineHit<D>>> {
        Err(self.unsupported("in-sphere"))
    }

    /// [`SpatialEngine::query_closest_point`] for many points, in parallel.
    fn batch_query_closest_point(&self, points: &[Point<f64, D>]) -> Result<Vec<EngineHit<D>>> {
        points
            .par_iter()
            .map(|point| self.query_closest_point(point))
            .collect()
    }

    fn unsupported(&self, query: &'static str) -> BvhError {
        BvhError::UnsupportedQuery {
            engine: self.engine_type().name(),
            query,
        }
    }
}

/// Build an engine over `mesh`.
///
/// The triangle engine needs a `D`-dimensional triangle mesh; the point
/// cloud engine only uses the vertices.
pub fn create_engine<const D: usize>(
    engine_type: EngineType,
    mesh: &SurfaceMesh,
) -> Result<Box<dyn SpatialEngine<D>>> {
    create_engine_with_config(engine_type, mesh, &BuildConfig::default())
}

/// [`create_engine`] with explicit build settings for the underlying tree.
pub fn create_engine_with_config<const D: usize>(
    engine_type: EngineType,
    mesh: &SurfaceMesh,
    config: &BuildConfig,
) -> Result<Box<dyn SpatialEngine<D>>> {
    let engine: Box<dyn SpatialEngine<D>> = match engine_type {
        EngineType::Triangles => Box::new(TriangleEngine::with_config(mesh.clone(), config)?),
        EngineType::PointCloud => Box::new(PointCloudEngine::from_mesh(mesh, config)?),
    };
    log::debug!("Created {} engine over {} vertices", engine_type, mesh.num_vertices());
    Ok(engine)
}

/// Closest-point engine over the triangles of an owned mesh
pub struct TriangleEngine<const D: usize> {
    tree: TriangleAabbTree<SurfaceMesh, D>,
}

impl<const D: usize> TriangleEngine<D> {
    pub fn new(mesh: SurfaceMesh) -> Result<Self> {
        Self::with_config(mesh, &BuildConfig::default())
    }

    pub fn with_config(mesh: SurfaceMesh, config: &BuildConfig) -> Result<Self> {
        Ok(Self {
            tree: TriangleAabbTree::with_config(mesh, config)?,
        })
    }

    fn hit(
        &self,
        point: &Point<f64, D>,
        facet: usize,
        closest_point: Point<f64, D>,
        squared_distance: f64,
    ) -> EngineHit<D> {
        let mesh = self.tree.mesh();
        let closest_vertex = mesh
            .facet_vertices(facet)
            .iter()
            .copied()
            .min_by(|&a, &b| {
                let da = (mesh.position::<D>(a) - point).norm_squared();
                let db = (mesh.position::<D>(b) - point).norm_squared();
                da.total_cmp(&db)
            });
        EngineHit {
            element: Some(facet),
            closest_vertex,
            closest_point,
            squared_distance,
        }
    }
}

impl<const D: usize> SpatialEngine<D> for TriangleEngine<D> {
    fn engine_type(&self) -> EngineType {
        EngineType::Triangles
    }

    fn supports_triangles(&self) -> bool {
        true
    }

    fn supports_point_cloud(&self) -> bool {
        false
    }

    fn supports_closest_point(&self) -> bool {
        true
    }

    fn supports_k_nearest_neighbours(&self) -> bool {
        false
    }

    fn supports_in_sphere_neighbours(&self) -> bool {
        true
    }

    fn query_closest_point(&self, point: &Point<f64, D>) -> Result<EngineHit<D>> {
        let result = self.tree.get_closest_point(point);
        Ok(match result.element {
            Some(facet) => self.hit(point, facet, result.closest_point, result.squared_distance),
            None => EngineHit::not_found(),
        })
    }

    fn query_in_sphere_neighbours(
        &self,
        point: &Point<f64, D>,
        radius: f64,
    ) -> Result<Vec<EngineHit<D>>> {
        let mut hits = Vec::new();
        self.tree
            .foreach_triangle_in_radius(point, radius * radius, |sq_dist, facet, closest| {
                hits.push(self.hit(point, facet, *closest, sq_dist));
            });
        hits.sort_by(|a, b| {
            a.squared_distance
                .total_cmp(&b.squared_distance)
                .then(a.element.cmp(&b.element))
        });
        Ok(hits)
    }
}

/// Nearest-vertex engine
pub struct PointCloudEngine<const D: usize> {
    cloud: PointCloud<D>,
}

impl<const D: usize> PointCloudEngine<D> {
    pub fn new(points: Vec<Point<f64, D>>) -> Self {
        Self::with_config(points, &BuildConfig::default())
    }

    pub fn with_config(points: Vec<Point<f64, D>>, config: &BuildConfig) -> Self {
        Self {
            cloud: PointCloud::with_config(points, config),
        }
    }

    pub fn from_mesh(mesh: &SurfaceMesh, config: &BuildConfig) -> Result<Self> {
        if mesh.dimension() != D {
            return Err(BvhError::DimensionMismatch {
                expected: D,
                got: mesh.dimension(),
            });
        }
        let points = (0..mesh.num_vertices()).map(|v| mesh.position::<D>(v)).collect();
        Ok(Self::with_config(points, config))
    }

    fn hit(neighbour: Neighbour<D>) -> EngineHit<D> {
        EngineHit {
            element: None,
            closest_vertex: Some(neighbour.index),
            closest_point: neighbour.point,
            squared_distance: neighbour.squared_distance,
        }
    }
}

impl<const D: usize> SpatialEngine<D> for PointCloudEngine<D> {
    fn engine_type(&self) -> EngineType {
        EngineType::PointCloud
    }

    fn supports_triangles(&self) -> bool {
        false
    }

    fn supports_point_cloud(&self) -> bool {
        true
    }

    fn supports_closest_point(&self) -> bool {
        true
    }

    fn supports_k_nearest_neighbours(&self) -> bool {
        true
    }

    fn supports_in_sphere_neighbours(&self) -> bool {
        true
    }

    fn query_closest_point(&self, point: &Point<f64, D>) -> Result<EngineHit<D>> {
        Ok(self
            .cloud
            .query_closest_point(point)
            .map_or_else(EngineHit::not_found, Self::hit))
    }

    fn query_k_nearest_neighbours(
        &self,
        point: &Point<f64, D>,
        k: usize,
    ) -> Result<Vec<EngineHit<D>>> {
        Ok(self
            .cloud
            .query_k_nearest(point, k)
            .into_iter()
            .map(Self::hit)
            .collect())
    }

    fn query_in_sphere_neighbours(
        &self,
        point: &Point<f64, D>,
        radius: f64,
    ) -> Result<Vec<EngineHit<D>>> {
        Ok(self
            .cloud
            .query_in_sphere(point, radius)
            .into_iter()
            .map(Self::hit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_engine_type_parsing() {
        assert_eq!("triangles".parse::<EngineType>(), Ok(EngineType::Triangles));
        assert_eq!("point-cloud".parse::<EngineType>(), Ok(EngineType::PointCloud));
        assert!("octree".parse::<EngineType>().is_err());
        assert_eq!(EngineType::PointCloud.to_string(), "point-cloud");
    }

    #[test]
    fn test_triangle_engine() -> Result<()> {
        let mesh = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
        let engine = create_engine::<3>(EngineType::Triangles, &mesh)?;
        assert!(engine.supports_triangles());
        assert!(!engine.supports_k_nearest_neighbours());

        let hit = engine.query_closest_point(&Point3::new(0.9, 0.9, 5.0))?;
        assert!(hit.found());
        assert!((hit.squared_distance - 16.0).abs() < 1e-12);
        // Corner (1, 1, 1) is the nearest vertex of any top-face triangle.
        let corner = hit.closest_vertex.unwrap();
        assert_eq!(mesh.position::<3>(corner), Point3::new(1.0, 1.0, 1.0));

        assert_eq!(
            engine.query_k_nearest_neighbours(&Point3::origin(), 3),
            Err(BvhError::UnsupportedQuery {
                engine: "triangles",
                query: "k-nearest"
            })
        );
        Ok(())
    }

    #[test]
    fn test_point_cloud_engine() -> Result<()> {
        let mesh = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
        let engine = create_engine::<3>(EngineType::PointCloud, &mesh)?;
        assert_eq!(engine.engine_type(), EngineType::PointCloud);

        let hit = engine.query_closest_point(&Point3::new(0.9, 0.9, 5.0))?;
        assert_eq!(hit.closest_point, Point3::new(1.0, 1.0, 1.0));
        assert_eq!(hit.element, None);

        let knn = engine.query_k_nearest_neighbours(&Point3::new(0.0, 0.0, 3.0), 4)?;
        assert_eq!(knn.len(), 4);
        assert!(knn.iter().all(|h| h.closest_point.z == 1.0));

        // Every cube corner is sqrt(3) from the center.
        let sphere = engine.query_in_sphere_neighbours(&Point3::origin(), 3f64.sqrt() + 1e-9)?;
        assert_eq!(sphere.len(), 8);
        Ok(())
    }

    #[test]
    fn test_batch_query() -> Result<()> {
        let mesh = Primitive::sphere(1.0, 16).to_mesh();
        let engine = create_engine::<3>(EngineType::Triangles, &mesh)?;
        let points: Vec<_> = (0..32).map(|i| Point3::new(i as f64 * 0.1, 2.0, 0.0)).collect();

        let batch = engine.batch_query_closest_point(&points)?;
        assert_eq!(batch.len(), points.len());
        for (point, hit) in points.iter().zip(&batch) {
            assert_eq!(*hit, engine.query_closest_point(point)?);
        }
        Ok(())
    }

    #[test]
    fn test_empty_mesh() -> Result<()> {
        let mesh = SurfaceMesh::new(3);
        for engine_type in [EngineType::Triangles, EngineType::PointCloud] {
            let engine = create_engine::<3>(engine_type, &mesh)?;
            let hit = engine.query_closest_point(&Point3::origin())?;
            assert!(!hit.found());
            assert_eq!(hit.squared_distance, f64::MAX);
        }

        let grid = Primitive::grid(2).to_mesh();
        assert!(create_engine::<3>(EngineType::PointCloud, &grid).is_err());
        Ok(())
    }

    #[test]
    fn test_build_config_does_not_change_answers() -> Result<()> {
        let mesh = Primitive::sphere(4.0, 24).to_mesh();
        let tuned = BuildConfig {
            parallel: true,
            parallel_threshold: 8,
        };
        let queries = [Point3::new(0.0, 0.0, 9.0), Point3::new(1.0, -3.0, 0.5)];

        for engine_type in [EngineType::Triangles, EngineType::PointCloud] {
            let default = create_engine::<3>(engine_type, &mesh)?;
            let serial =
                create_engine_with_config::<3>(engine_type, &mesh, &BuildConfig::serial())?;
            let parallel = create_engine_with_config::<3>(engine_type, &mesh, &tuned)?;
            for query in &queries {
                let expected = default.query_closest_point(query)?;
                assert_eq!(serial.query_closest_point(query)?, expected);
                assert_eq!(parallel.query_closest_point(query)?, expected);
            }
        }
        Ok(())
    }
}
