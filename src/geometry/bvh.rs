// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding Volume Hierarchy (BVH) for spatial acceleration
//!
//! A binary tree over axis-aligned boxes, stored as a dense node array.
//! Each leaf holds exactly one input box; its element index is the box's
//! position in the input slice. The tree is built once and is read-only
//! afterwards, so a built tree can be shared between threads.
//!
//! Construction splits each range at the median centroid along the axis
//! with the widest centroid spread. Queries are iterative depth-first
//! traversals; the distance queries are branch-and-bound searches pruned
//! with the point-to-box distance, which never exceeds the distance to
//! anything inside the box.

use super::BoundingBox;
use crate::config::BuildConfig;
use nalgebra::Point;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// BVH node
#[derive(Debug, Clone)]
pub struct BvhNode<const D: usize> {
    /// Bounding box of this node
    pub bbox: BoundingBox<D>,
    /// Left child (None for leaf)
    pub left: Option<usize>,
    /// Right child (None for leaf)
    pub right: Option<usize>,
    /// Input element (only for leaf nodes)
    pub element: Option<usize>,
}

impl<const D: usize> BvhNode<D> {
    fn leaf(bbox: BoundingBox<D>, element: usize) -> Self {
        Self {
            bbox,
            left: None,
            right: None,
            element: Some(element),
        }
    }

    fn placeholder() -> Self {
        Self {
            bbox: BoundingBox::empty(),
            left: None,
            right: None,
            element: None,
        }
    }

    /// Check if this is a leaf node
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    fn children(&self) -> Option<(usize, usize)> {
        Some((self.left?, self.right?))
    }
}

/// Bounding Volume Hierarchy over axis-aligned boxes
#[derive(Debug, Clone, Default)]
pub struct Bvh<const D: usize> {
    nodes: Vec<BvhNode<D>>,
    root: Option<usize>,
}

struct Builder<'a, const D: usize> {
    boxes: &'a [BoundingBox<D>],
    centroids: Vec<Point<f64, D>>,
    config: &'a BuildConfig,
    nodes: Vec<BvhNode<D>>,
}

impl<const D: usize> Builder<'_, D> {
    /// Build the subtree over `indices` and return its node index.
    fn build_range(&mut self, indices: &mut [usize]) -> usize {
        debug_assert!(!indices.is_empty());
        if let [element] = indices {
            self.nodes.push(BvhNode::leaf(self.boxes[*element], *element));
            return self.nodes.len() - 1;
        }

        let axis = self.split_axis(indices);
        let mid = indices.len() / 2;
        let centroids = &self.centroids;
        let by_centroid = |a: &usize, b: &usize| -> Ordering {
            centroids[*a][axis]
                .total_cmp(&centroids[*b][axis])
                .then(a.cmp(b))
        };

        // Only the split matters: each half is re-sorted along its own axis.
        if self.config.sorts_in_parallel(indices.len()) {
            indices.par_sort_unstable_by(by_centroid);
        } else {
            indices.select_nth_unstable_by(mid, by_centroid);
        }

        let current = self.nodes.len();
        self.nodes.push(BvhNode::placeholder());

        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = self.build_range(left_indices);
        let right = self.build_range(right_indices);

        let bbox = self.nodes[left].bbox.union(&self.nodes[right].bbox);
        let node = &mut self.nodes[current];
        node.bbox = bbox;
        node.left = Some(left);
        node.right = Some(right);
        current
    }

    /// Axis with the greatest centroid spread over the range.
    fn split_axis(&self, indices: &[usize]) -> usize {
        let mut centroid_box = BoundingBox::<D>::empty();
        for &i in indices {
            if !self.boxes[i].is_empty() {
                centroid_box.expand_to_include(&self.centroids[i]);
            }
        }
        if centroid_box.is_empty() {
            0
        } else {
            centroid_box.longest_axis()
        }
    }
}

/// Pending node on a branch-and-bound stack together with its distance bound.
#[derive(Clone, Copy)]
struct Candidate {
    node: usize,
    bound: f64,
}

/// Entry of the k-nearest max-heap, ordered by distance then element.
#[derive(Clone, Copy, PartialEq)]
struct Neighbour {
    sq_dist: f64,
    element: usize,
}

impl Eq for Neighbour {}

impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sq_dist
            .total_cmp(&other.sq_dist)
            .then(self.element.cmp(&other.element))
    }
}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<const D: usize> Bvh<D> {
    /// Build a BVH over `boxes` with the default [`BuildConfig`].
    ///
    /// Element `i` of every query result refers to `boxes[i]`.
    pub fn build(boxes: &[BoundingBox<D>]) -> Self {
        Self::build_with(boxes, &BuildConfig::default())
    }

    /// Build a BVH over `boxes`.
    ///
    /// Empty boxes (`min > max`) become leaves that no query reaches and that
    /// add nothing to their ancestors' bounds. The parallel and serial builds
    /// produce the same tree.
    pub fn build_with(boxes: &[BoundingBox<D>], config: &BuildConfig) -> Self {
        if boxes.is_empty() {
            return Self::default();
        }

        let empty_boxes = boxes.iter().filter(|b| b.is_empty()).count();
        if empty_boxes > 0 {
            log::warn!("BVH input contains {} empty boxes", empty_boxes);
        }

        let centroids = boxes
            .iter()
            .map(|b| {
                if b.is_empty() {
                    Point::from([f64::INFINITY; D])
                } else {
                    b.center()
                }
            })
            .collect();

        let mut builder = Builder {
            boxes,
            centroids,
            config,
            nodes: Vec::with_capacity(2 * boxes.len() - 1),
        };
        let mut indices: Vec<usize> = (0..boxes.len()).collect();
        let root = builder.build_range(&mut indices);

        let bvh = Self {
            nodes: builder.nodes,
            root: Some(root),
        };
        log::debug!(
            "Built {}D BVH: {} elements, {} nodes, depth {}",
            D,
            boxes.len(),
            bvh.nodes.len(),
            bvh.depth()
        );
        bvh
    }

    /// True iff the tree holds no element.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<usize> {
        self.root
    }

    pub fn nodes(&self) -> &[BvhNode<D>] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &BvhNode<D> {
        &self.nodes[index]
    }

    /// Number of input boxes (one leaf each).
    pub fn num_elements(&self) -> usize {
        (self.nodes.len() + 1) / 2
    }

    /// Bounds of the whole tree.
    pub fn bounds(&self) -> Option<BoundingBox<D>> {
        self.root.map(|root| self.nodes[root].bbox)
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut max_depth = 0;
        let mut stack = vec![(root, 1)];
        while let Some((index, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some((left, right)) = self.nodes[index].children() {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        max_depth
    }

    /// Elements whose box overlaps `query`, touching boundaries included.
    pub fn intersect(&self, query: &BoundingBox<D>) -> Vec<usize> {
        let mut results = Vec::new();
        self.intersect_with(query, |element| {
            results.push(element);
            true
        });
        results
    }

    /// Call `visit` for every element whose box overlaps `query`.
    ///
    /// Traversal is depth-first, left child first. Returning `false` from
    /// `visit` stops the traversal immediately.
    pub fn intersect_with<F>(&self, query: &BoundingBox<D>, mut visit: F)
    where
        F: FnMut(usize) -> bool,
    {
        let Some(root) = self.root else {
            return;
        };

        let mut stack = Vec::with_capacity(64);
        stack.push(root);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !query.intersects(&node.bbox) {
                continue;
            }

            match node.children() {
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => {
                    debug_assert!(node.element.is_some());
                    if let Some(element) = node.element {
                        if !visit(element) {
                            return;
                        }
                    }
                }
            }
        }
    }

    /// First element, in [`Bvh::intersect_with`] order, whose box overlaps `query`.
    pub fn intersect_first(&self, query: &BoundingBox<D>) -> Option<usize> {
        let mut first = None;
        self.intersect_with(query, |element| {
            first = Some(element);
            false
        });
        first
    }

    /// Element minimising `sq_dist_fn`, found by branch-and-bound.
    ///
    /// `sq_dist_fn(i)` must never be smaller than the squared distance from
    /// `point` to box `i`; otherwise the pruning may discard the answer.
    /// Ties keep the first element found. Returns `None` on an empty tree
    /// without calling `sq_dist_fn`.
    pub fn get_closest_element<F>(&self, point: &Point<f64, D>, mut sq_dist_fn: F) -> Option<usize>
    where
        F: FnMut(usize) -> f64,
    {
        let root = self.root?;

        let mut closest = None;
        let mut closest_sq_dist = f64::INFINITY;

        let mut stack = Vec::with_capacity(64);
        stack.push(Candidate {
            node: root,
            bound: self.nodes[root].bbox.squared_exterior_distance(point),
        });

        while let Some(Candidate { node: index, bound }) = stack.pop() {
            // The best distance may have shrunk since this node was pushed.
            if closest.is_some() && bound >= closest_sq_dist {
                continue;
            }

            let node = &self.nodes[index];
            let Some((left, right)) = node.children() else {
                debug_assert!(node.element.is_some());
                if let Some(element) = node.element {
                    let sq_dist = sq_dist_fn(element);
                    if sq_dist < closest_sq_dist {
                        closest_sq_dist = sq_dist;
                        closest = Some(element);
                    } else if closest.is_none() {
                        closest = Some(element);
                    }
                }
                continue;
            };

            debug_assert!(node.bbox.contains(&self.nodes[left].bbox));
            debug_assert!(node.bbox.contains(&self.nodes[right].bbox));

            let left_dist = self.nodes[left].bbox.squared_exterior_distance(point);
            let right_dist = self.nodes[right].bbox.squared_exterior_distance(point);

            // Push the farther child first so the nearer one is explored first.
            let (near, far) = if left_dist <= right_dist {
                ((left, left_dist), (right, right_dist))
            } else {
                ((right, right_dist), (left, left_dist))
            };
            for (child, child_dist) in [far, near] {
                // Until a leaf is reached, keep descending even through empty boxes.
                if child_dist < closest_sq_dist || closest.is_none() {
                    stack.push(Candidate {
                        node: child,
                        bound: child_dist,
                    });
                }
            }
        }

        closest
    }

    /// Call `visit` for every element whose box lies within `sq_radius` of `point`.
    ///
    /// This is a box-level test: every element closer than the radius is
    /// reported, plus possibly some that are not.
    pub fn foreach_element_within_radius<F>(
        &self,
        point: &Point<f64, D>,
        sq_radius: f64,
        mut visit: F,
    ) where
        F: FnMut(usize),
    {
        let Some(root) = self.root else {
            return;
        };
        if self.nodes[root].bbox.squared_exterior_distance(point) > sq_radius {
            return;
        }

        let mut stack = Vec::with_capacity(64);
        stack.push(root);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            let Some((left, right)) = node.children() else {
                debug_assert!(node.element.is_some());
                if let Some(element) = node.element {
                    visit(element);
                }
                continue;
            };

            for child in [right, left] {
                if self.nodes[child].bbox.squared_exterior_distance(point) <= sq_radius {
                    stack.push(child);
                }
            }
        }
    }

    /// The `k` elements with the smallest `sq_dist_fn`, nearest first.
    ///
    /// Same admissibility requirement as [`Bvh::get_closest_element`]. Ties
    /// are resolved by element index, so the result does not depend on the
    /// shape of the tree.
    pub fn get_k_closest_elements<F>(
        &self,
        point: &Point<f64, D>,
        k: usize,
        mut sq_dist_fn: F,
    ) -> Vec<(usize, f64)>
    where
        F: FnMut(usize) -> f64,
    {
        let Some(root) = self.root else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let mut heap: BinaryHeap<Neighbour> = BinaryHeap::with_capacity(k + 1);
        let kth_sq_dist = |heap: &BinaryHeap<Neighbour>| -> f64 {
            if heap.len() < k {
                f64::INFINITY
            } else {
                heap.peek().map_or(f64::INFINITY, |n| n.sq_dist)
            }
        };

        let mut stack = Vec::with_capacity(64);
        stack.push(Candidate {
            node: root,
            bound: self.nodes[root].bbox.squared_exterior_distance(point),
        });

        while let Some(Candidate { node: index, bound }) = stack.pop() {
            if bound > kth_sq_dist(&heap) {
                continue;
            }

            let node = &self.nodes[index];
            let Some((left, right)) = node.children() else {
                if let Some(element) = node.element {
                    let candidate = Neighbour {
                        sq_dist: sq_dist_fn(element),
                        element,
                    };
                    if heap.len() < k {
                        heap.push(candidate);
                    } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                        heap.pop();
                        heap.push(candidate);
                    }
                }
                continue;
            };

            let left_dist = self.nodes[left].bbox.squared_exterior_distance(point);
            let right_dist = self.nodes[right].bbox.squared_exterior_distance(point);
            let (near, far) = if left_dist <= right_dist {
                ((left, left_dist), (right, right_dist))
            } else {
                ((right, right_dist), (left, left_dist))
            };
            let limit = kth_sq_dist(&heap);
            for (child, child_dist) in [far, near] {
                if child_dist <= limit {
                    stack.push(Candidate {
                        node: child,
                        bound: child_dist,
                    });
                }
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .map(|n| (n.element, n.sq_dist))
            .collect()
    }
}
