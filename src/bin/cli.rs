// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! meshbvh CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use meshbvh::config::MeshBvhConfig;
use meshbvh::engine::{create_engine_with_config, EngineType};
use meshbvh::geometry::{weld_vertices, FacetMesh, SurfaceMesh, TriangleAabbTree, WeldOptions};
use meshbvh::io;
use nalgebra::Point3;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "meshbvh")]
#[command(about = "Proximity queries on triangle meshes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to ./meshbvh.toml when present)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the closest point on a mesh
    Closest {
        /// Input STL file
        input: PathBuf,

        /// Query point as x,y,z
        #[arg(short, long, value_parser = parse_point, allow_hyphen_values = true)]
        point: Point3<f64>,

        /// Engine answering the query (triangles, point-cloud)
        #[arg(short, long, default_value = "triangles")]
        engine: EngineType,
    },

    /// List the triangles within a radius of a point
    Radius {
        /// Input STL file
        input: PathBuf,

        /// Query point as x,y,z
        #[arg(short, long, value_parser = parse_point, allow_hyphen_values = true)]
        point: Point3<f64>,

        /// Search radius (defaults to query.default_radius from the config)
        #[arg(short, long)]
        radius: Option<f64>,
    },

    /// Build the tree and report its shape
    Stats {
        /// Input STL file
        input: PathBuf,
    },

    /// Merge coincident vertices
    Weld {
        /// Input STL file
        input: PathBuf,

        /// Weld radius (defaults to weld.radius from the config)
        #[arg(short, long)]
        radius: Option<f64>,

        /// Only weld vertices on boundary edges
        #[arg(long)]
        boundary_only: bool,

        /// Write the welded mesh to this STL file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[derive(Serialize)]
struct TreeStats {
    vertices: usize,
    triangles: usize,
    nodes: usize,
    depth: usize,
    bounds_min: Option<[f64; 3]>,
    bounds_max: Option<[f64; 3]>,
    build_ms: f64,
}

#[derive(Serialize)]
struct RadiusHit {
    facet: usize,
    squared_distance: f64,
    closest_point: [f64; 3],
}

#[derive(Serialize)]
struct WeldReport {
    vertices_before: usize,
    vertices_after: usize,
    removed: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match &cli.config {
        Some(path) => {
            let mut config = MeshBvhConfig::from_file(path)?;
            config.apply_env_overrides();
            config
        }
        None => MeshBvhConfig::load()?,
    };

    match &cli.command {
        Commands::Closest {
            input,
            point,
            engine,
        } => closest_command(input, point, *engine, &config, cli.json),
        Commands::Radius {
            input,
            point,
            radius,
        } => {
            let radius = radius.unwrap_or(config.query.default_radius);
            radius_command(input, point, radius, &config, cli.json)
        }
        Commands::Stats { input } => stats_command(input, &config, cli.json),
        Commands::Weld {
            input,
            radius,
            boundary_only,
            output,
        } => {
            let options = WeldOptions {
                radius: radius.unwrap_or(config.weld.radius),
                boundary_only: *boundary_only || config.weld.boundary_only,
            };
            weld_command(input, &options, output.as_deref(), cli.json)
        }
        Commands::Version => {
            println!("meshbvh v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn parse_point(s: &str) -> std::result::Result<Point3<f64>, String> {
    let coords = s
        .split(',')
        .map(|c| c.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate in '{s}': {e}"))?;
    match coords.as_slice() {
        [x, y, z] => Ok(Point3::new(*x, *y, *z)),
        _ => Err(format!("expected x,y,z, got {} values", coords.len())),
    }
}

fn load_mesh(input: &Path) -> Result<SurfaceMesh> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {:?}", input);
    }
    io::load_stl(input)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize result")?);
    Ok(())
}

fn print_point(label: &str, point: &Point3<f64>) {
    println!(
        "  {:<18} {}",
        label.bright_black(),
        format!("({:.6}, {:.6}, {:.6})", point.x, point.y, point.z).cyan()
    );
}

fn format_duration(duration: Duration) -> String {
    let ms = duration.as_secs_f64() * 1000.0;
    if ms < 1.0 {
        format!("{:.0}µs", ms * 1000.0)
    } else {
        format!("{:.2}ms", ms)
    }
}

fn closest_command(
    input: &Path,
    point: &Point3<f64>,
    engine_type: EngineType,
    config: &MeshBvhConfig,
    json: bool,
) -> Result<()> {
    let mesh = load_mesh(input)?;
    let engine = create_engine_with_config::<3>(engine_type, &mesh, &config.build)
        .with_context(|| format!("Failed to build {} engine for {:?}", engine_type, input))?;
    let hit = engine.query_closest_point(point)?;

    if json {
        return print_json(&hit);
    }

    if !hit.found() {
        println!("{}", "Mesh is empty, no closest point".yellow());
        return Ok(());
    }

    println!("{} {}", "Closest point on".bold(), input.display().to_string().cyan());
    print_point("Query:", point);
    print_point("Closest point:", &hit.closest_point);
    println!(
        "  {:<18} {:.6}",
        "Distance:".bright_black(),
        hit.squared_distance.sqrt()
    );
    if let Some(facet) = hit.element {
        println!("  {:<18} {}", "Facet:".bright_black(), facet);
    }
    if let Some(vertex) = hit.closest_vertex {
        println!("  {:<18} {}", "Nearest vertex:".bright_black(), vertex);
    }
    Ok(())
}

fn radius_command(
    input: &Path,
    point: &Point3<f64>,
    radius: f64,
    config: &MeshBvhConfig,
    json: bool,
) -> Result<()> {
    let mesh = load_mesh(input)?;
    let tree = TriangleAabbTree::<_, 3>::with_config(&mesh, &config.build)
        .with_context(|| format!("Failed to build tree for {:?}", input))?;

    let mut hits = Vec::new();
    tree.foreach_triangle_in_radius(point, radius * radius, |squared_distance, facet, closest| {
        hits.push(RadiusHit {
            facet,
            squared_distance,
            closest_point: [closest.x, closest.y, closest.z],
        });
    });
    hits.sort_by(|a, b| a.squared_distance.total_cmp(&b.squared_distance));

    if json {
        return print_json(&hits);
    }

    println!(
        "{} {} {} {}",
        hits.len().to_string().green().bold(),
        "triangles within".bold(),
        radius,
        "of the query point".bold()
    );
    for hit in &hits {
        println!(
            "  {:>8}  {}",
            hit.facet.to_string().cyan(),
            format!("{:.6}", hit.squared_distance.sqrt()).bright_black()
        );
    }
    Ok(())
}

fn stats_command(input: &Path, config: &MeshBvhConfig, json: bool) -> Result<()> {
    let mesh = load_mesh(input)?;

    let start = Instant::now();
    let tree = TriangleAabbTree::<_, 3>::with_config(&mesh, &config.build)
        .with_context(|| format!("Failed to build tree for {:?}", input))?;
    let build_time = start.elapsed();

    let bounds = tree.bvh().bounds();
    let stats = TreeStats {
        vertices: mesh.num_vertices(),
        triangles: tree.num_triangles(),
        nodes: tree.bvh().nodes().len(),
        depth: tree.bvh().depth(),
        bounds_min: bounds.map(|b| [b.min.x, b.min.y, b.min.z]),
        bounds_max: bounds.map(|b| [b.max.x, b.max.y, b.max.z]),
        build_ms: build_time.as_secs_f64() * 1000.0,
    };

    if json {
        return print_json(&stats);
    }

    println!("{} {}", "Mesh:".bold(), input.display().to_string().cyan());
    println!("  {:<12} {}", "Vertices:".bright_black(), stats.vertices);
    println!("  {:<12} {}", "Triangles:".bright_black(), stats.triangles);
    println!("  {:<12} {}", "Nodes:".bright_black(), stats.nodes);
    println!("  {:<12} {}", "Depth:".bright_black(), stats.depth);
    if let Some(bounds) = bounds {
        print_point("Bounds min:", &bounds.min);
        print_point("Bounds max:", &bounds.max);
    }
    println!(
        "  {:<12} {}",
        "Build:".bright_black(),
        format_duration(build_time).yellow()
    );
    Ok(())
}

fn weld_command(
    input: &Path,
    options: &WeldOptions,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let mut mesh = load_mesh(input)?;
    let before = mesh.num_vertices();
    let removed = weld_vertices(&mut mesh, options)?;

    if let Some(output) = output {
        io::save_stl(&mesh, output)?;
    }

    let report = WeldReport {
        vertices_before: before,
        vertices_after: mesh.num_vertices(),
        removed,
    };
    if json {
        return print_json(&report);
    }

    if removed == 0 {
        println!("{}", "No vertices within the weld radius".yellow());
    } else {
        println!(
            "{} {} ({} -> {})",
            "Welded".green().bold(),
            format!("{} vertices", removed).green(),
            report.vertices_before,
            report.vertices_after
        );
    }
    if let Some(output) = output {
        println!("{} {}", "Output:".bold(), output.display());
    }
    Ok(())
}
