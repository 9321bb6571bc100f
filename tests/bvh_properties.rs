// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Generic BVH queries checked against brute force on random boxes

use meshbvh::config::BuildConfig;
use meshbvh::geometry::{BoundingBox, Bvh};
use nalgebra::{Point2, Point3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_box(rng: &mut StdRng, extent: f64, max_size: f64) -> BoundingBox<3> {
    let min = Point3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    );
    let size = Point3::new(
        rng.gen_range(0.0..max_size),
        rng.gen_range(0.0..max_size),
        rng.gen_range(0.0..max_size),
    );
    BoundingBox::new(min, Point3::from(min.coords + size.coords))
}

fn random_boxes(seed: u64, n: usize) -> Vec<BoundingBox<3>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| random_box(&mut rng, 50.0, 5.0)).collect()
}

fn random_point(rng: &mut StdRng, extent: f64) -> Point3<f64> {
    Point3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

#[test]
fn test_nodes_enclose_children() {
    let boxes = random_boxes(1, 2000);
    let bvh = Bvh::build(&boxes);

    println!("2000 boxes: {} nodes, depth {}", bvh.nodes().len(), bvh.depth());
    assert_eq!(bvh.nodes().len(), 2 * boxes.len() - 1);
    assert_eq!(bvh.depth(), 12);

    for node in bvh.nodes() {
        match (node.left, node.right) {
            (Some(left), Some(right)) => {
                assert!(node.element.is_none());
                assert!(node.bbox.contains(&bvh.node(left).bbox));
                assert!(node.bbox.contains(&bvh.node(right).bbox));
                assert_eq!(node.bbox, bvh.node(left).bbox.union(&bvh.node(right).bbox));
            }
            (None, None) => {
                let element = node.element.expect("leaf without element");
                assert_eq!(node.bbox, boxes[element]);
            }
            _ => panic!("node with a single child"),
        }
    }
}

#[test]
fn test_intersect_matches_brute_force() {
    let boxes = random_boxes(2, 2000);
    let bvh = Bvh::build(&boxes);
    let mut rng = StdRng::seed_from_u64(3);

    for _ in 0..200 {
        let query = random_box(&mut rng, 50.0, 20.0);
        let mut found = bvh.intersect(&query);
        found.sort_unstable();

        let expected: Vec<usize> = (0..boxes.len())
            .filter(|&i| boxes[i].intersects(&query))
            .collect();
        assert_eq!(found, expected);

        match bvh.intersect_first(&query) {
            Some(first) => assert!(expected.contains(&first)),
            None => assert!(expected.is_empty()),
        }
    }
}

#[test]
fn test_closest_element_matches_brute_force() {
    let boxes = random_boxes(4, 1500);
    let bvh = Bvh::build(&boxes);
    let mut rng = StdRng::seed_from_u64(5);

    for _ in 0..200 {
        let point = random_point(&mut rng, 80.0);
        // Distance to the box center is never below the distance to the box.
        let distance = |i: usize| (boxes[i].center() - point).norm_squared();

        let closest = bvh.get_closest_element(&point, distance).unwrap();
        let best = (0..boxes.len()).map(distance).fold(f64::INFINITY, f64::min);
        assert_eq!(distance(closest), best);
    }
}

#[test]
fn test_k_closest_matches_brute_force() {
    let boxes = random_boxes(6, 800);
    let bvh = Bvh::build(&boxes);
    let mut rng = StdRng::seed_from_u64(7);

    for k in [1, 5, 17] {
        let point = random_point(&mut rng, 60.0);
        let distance = |i: usize| (boxes[i].center() - point).norm_squared();

        let found = bvh.get_k_closest_elements(&point, k, distance);
        let mut expected: Vec<(usize, f64)> = (0..boxes.len()).map(|i| (i, distance(i))).collect();
        expected.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        expected.truncate(k);
        assert_eq!(found, expected);
    }
}

#[test]
fn test_radius_has_no_false_negatives() {
    let boxes = random_boxes(8, 2000);
    let bvh = Bvh::build(&boxes);
    let mut rng = StdRng::seed_from_u64(9);

    for _ in 0..100 {
        let point = random_point(&mut rng, 60.0);
        let sq_radius = rng.gen_range(0.0..100.0);

        let mut found = Vec::new();
        bvh.foreach_element_within_radius(&point, sq_radius, |i| found.push(i));
        found.sort_unstable();

        let mut seen = found.clone();
        seen.dedup();
        assert_eq!(seen.len(), found.len(), "element reported twice");

        for (i, bbox) in boxes.iter().enumerate() {
            if bbox.squared_exterior_distance(&point) <= sq_radius {
                assert!(found.binary_search(&i).is_ok(), "missed element {i}");
            }
        }
    }
}

#[test]
fn test_parallel_build_matches_serial() {
    let boxes = random_boxes(10, 5000);
    let serial = Bvh::build_with(&boxes, &BuildConfig::serial());
    let parallel = Bvh::build_with(
        &boxes,
        &BuildConfig {
            parallel: true,
            parallel_threshold: 64,
        },
    );

    assert_eq!(serial.root(), parallel.root());
    assert_eq!(serial.nodes().len(), parallel.nodes().len());
    for (a, b) in serial.nodes().iter().zip(parallel.nodes()) {
        assert_eq!(a.bbox, b.bbox);
        assert_eq!((a.left, a.right, a.element), (b.left, b.right, b.element));
    }
}

#[test]
fn test_degenerate_inputs() {
    // All boxes identical: still one leaf per element, still balanced.
    let same = vec![BoundingBox::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)); 100];
    let bvh = Bvh::build(&same);
    assert_eq!(bvh.depth(), 8);
    let mut found = bvh.intersect(&same[0]);
    found.sort_unstable();
    assert_eq!(found, (0..100).collect::<Vec<_>>());

    // Points on a line.
    let line: Vec<_> = (0..64)
        .map(|i| BoundingBox::from_point(&Point2::new(i as f64, 0.0)))
        .collect();
    let bvh = Bvh::build(&line);
    let query = Point2::new(20.2, 3.0);
    let closest = bvh.get_closest_element(&query, |i| line[i].squared_exterior_distance(&query));
    assert_eq!(closest, Some(20));
}
