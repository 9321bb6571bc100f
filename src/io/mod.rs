// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - mesh import and export

mod stl;

pub use stl::{load_stl, save_stl};
