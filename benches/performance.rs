// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use meshbvh::config::BuildConfig;
use meshbvh::geometry::{BoundingBox, Bvh, PointCloud, Primitive, TriangleAabbTree};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_boxes(n: usize) -> Vec<BoundingBox<3>> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|_| {
            let min = Point3::new(
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
            );
            BoundingBox::new(min, min + nalgebra::Vector3::repeat(rng.gen_range(0.0..2.0)))
        })
        .collect()
}

fn query_points(n: usize) -> Vec<Point3<f64>> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..n)
        .map(|_| {
            Point3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
            )
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for n in [1_000, 10_000, 100_000] {
        let boxes = random_boxes(n);
        group.bench_with_input(BenchmarkId::new("serial", n), &boxes, |b, boxes| {
            b.iter(|| Bvh::build_with(black_box(boxes), &BuildConfig::serial()))
        });
        group.bench_with_input(BenchmarkId::new("parallel", n), &boxes, |b, boxes| {
            b.iter(|| Bvh::build_with(black_box(boxes), &BuildConfig::default()))
        });
    }

    let sphere = Primitive::sphere(10.0, 128).to_mesh();
    group.bench_function("sphere_128_triangles", |b| {
        b.iter(|| TriangleAabbTree::<_, 3>::new(black_box(&sphere)).unwrap())
    });

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    let sphere = Primitive::sphere(10.0, 128).to_mesh();
    let tree = TriangleAabbTree::<_, 3>::new(&sphere).unwrap();
    let points = query_points(1_000);

    group.bench_function("closest_point", |b| {
        b.iter(|| {
            for point in &points {
                black_box(tree.get_closest_point(point));
            }
        })
    });

    group.bench_function("batch_closest_point", |b| {
        b.iter(|| black_box(tree.batch_closest_points(&points)))
    });

    group.bench_function("triangles_in_radius", |b| {
        b.iter(|| {
            let mut count = 0;
            for point in &points {
                tree.foreach_triangle_in_radius(point, 1.0, |_, _, _| count += 1);
            }
            black_box(count)
        })
    });

    let boxes = random_boxes(100_000);
    let bvh = Bvh::build(&boxes);
    let query = BoundingBox::new(Point3::new(-5.0, -5.0, -5.0), Point3::new(5.0, 5.0, 5.0));
    group.bench_function("intersect", |b| b.iter(|| black_box(bvh.intersect(&query))));

    let vertices = (0..sphere.vertex_count()).map(|v| sphere.position::<3>(v)).collect();
    let cloud = PointCloud::new(vertices);
    group.bench_function("k_nearest_8", |b| {
        b.iter(|| {
            for point in &points {
                black_box(cloud.query_k_nearest(point, 8));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_queries);
criterion_main!(benches);
