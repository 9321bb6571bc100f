// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for tree construction and engine queries

use thiserror::Error;

/// Errors raised while building a tree or querying an engine.
///
/// Querying an empty tree is not an error: those queries return a
/// not-found value instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BvhError {
    /// The mesh dimension does not match the dimension of the tree.
    #[error("dimension mismatch: tree expects {expected}D coordinates, mesh has {got}D")]
    DimensionMismatch { expected: usize, got: usize },

    /// A facet with a vertex count other than 3 was found.
    #[error("not a triangle mesh: facet {facet} has {vertices} vertices")]
    NotATriangleMesh { facet: usize, vertices: usize },

    /// An element refers to a vertex that does not exist.
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Malformed input arrays.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The engine does not implement the requested query.
    #[error("{engine} engine does not support {query} queries")]
    UnsupportedQuery {
        engine: &'static str,
        query: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, BvhError>;
