use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use voxtree::{
    load_csm, CollectingSink, CoordPath, DefaultPolicy, Neighbor, Octree, OctreeConfig, Ray,
    RayQuery, Side,
};

#[derive(Parser)]
#[command(name = "voxtool")]
#[command(about = "Inspect, mesh and pick CSM voxel models", long_about = None)]
struct Cli {
    /// TOML tree config; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mesh a model and print per-mesh statistics
    Mesh {
        /// CSM model file
        model: PathBuf,
    },

    /// Cast a ray into a model and print the hits
    Pick {
        model: PathBuf,

        /// Ray origin as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        origin: Vec3,

        /// Ray direction as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        direction: Vec3,

        /// Report hits at this depth
        #[arg(long)]
        depth: Option<u32>,

        /// Report every hit instead of the nearest one
        #[arg(long)]
        all: bool,
    },

    /// Print the six face neighbors of a path
    Neighbor {
        /// Path of octant letters a-h, empty for the root
        #[arg(default_value = "")]
        path: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Mesh { model } => mesh(&model, config),
        Commands::Pick {
            model,
            origin,
            direction,
            depth,
            all,
        } => pick(&model, config, Ray::new(origin, direction), depth, all),
        Commands::Neighbor { path } => neighbor(&path),
    }
}

/// Config file if given, then the `VOXTOOL_MAX_DEPTH` override
fn load_config(path: Option<&Path>) -> Result<OctreeConfig> {
    let mut config = match path {
        Some(path) => OctreeConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => OctreeConfig::default(),
    };
    if let Ok(depth) = std::env::var("VOXTOOL_MAX_DEPTH") {
        config.max_depth = depth
            .parse()
            .with_context(|| format!("VOXTOOL_MAX_DEPTH is not a number: {depth}"))?;
        config.validate()?;
    }
    tracing::debug!(?config, "using config");
    Ok(config)
}

fn load_model(path: &Path, config: OctreeConfig) -> Result<Octree<u8>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model {}", path.display()))?;
    let tree = load_csm(&text, config, DefaultPolicy)
        .with_context(|| format!("Failed to parse model {}", path.display()))?;
    tracing::info!(
        nodes = tree.node_count(),
        leaves = tree.solid_leaves().len(),
        "loaded {}",
        path.display()
    );
    Ok(tree)
}

fn mesh(model: &Path, config: OctreeConfig) -> Result<()> {
    let mut tree = load_model(model, config)?;
    let mut sink = CollectingSink::new(tree.config().max_vertices_per_mesh);
    let stats = tree.process(&mut sink);
    tracing::info!(?stats, "meshed");

    println!("{:>6} {:>9} {:>6} {:>9} {:>9}", "mesh", "material", "faces", "vertices", "submeshes");
    for ((_, mesh_id), mesh) in sink.meshes() {
        let vertices: usize = mesh.submeshes.iter().map(|m| m.vertex_count()).sum();
        println!(
            "{:>6} {:>9} {:>6} {:>9} {:>9}",
            mesh_id.0,
            mesh.material.0,
            mesh.face_count(),
            vertices,
            mesh.submeshes.len()
        );
    }
    println!("total faces: {}", sink.face_count());
    Ok(())
}

fn pick(
    model: &Path,
    config: OctreeConfig,
    ray: Ray,
    depth: Option<u32>,
    all: bool,
) -> Result<()> {
    let tree = load_model(model, config)?;
    let mut query = if all {
        RayQuery::all()
    } else {
        RayQuery::first()
    };
    query.depth = depth;

    let hits = tree.intersect(&ray, query)?;
    if hits.is_empty() {
        println!("no hit");
    }
    for hit in hits {
        let item = tree.node(hit.node).and_then(|n| n.item().copied());
        println!(
            ">{} item={} side={:?} distance={:.4} at ({:.3}, {:.3}, {:.3}){}",
            hit.path,
            item.map_or_else(|| "-".to_string(), |i| i.to_string()),
            hit.side,
            hit.distance,
            hit.position.x,
            hit.position.y,
            hit.position.z,
            if hit.coarse { " coarse" } else { "" }
        );
    }
    Ok(())
}

fn neighbor(path: &str) -> Result<()> {
    let path: CoordPath = path
        .parse()
        .with_context(|| format!("Invalid path '{path}'"))?;
    for side in Side::ALL {
        match path.neighbor(side) {
            Neighbor::Inside(n) => println!("{side:?}: >{n}"),
            Neighbor::Outside { path, .. } => println!("{side:?}: >{path} (adjacent tree)"),
        }
    }
    Ok(())
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let parts: Vec<f32> = s
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| format!("{p}: {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(format!("expected x,y,z, got '{s}'")),
    }
}
