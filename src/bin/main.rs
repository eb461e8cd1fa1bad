//! Terrain Mesher CLI
//!
//! Build terrain patch meshes from heightmaps and export them.

use clap::{Parser, Subcommand, ValueEnum};
use glam::Vec3;
use std::fs;
use std::path::PathBuf;
use terrain_mesher::{
    export_glb, export_obj, open_terrain, Camera, CountingBackend, ExportLevel, Scene, Terrain,
    TerrainFlags, Viewport,
};

#[derive(Parser)]
#[command(name = "terrain-mesher")]
#[command(author, version, about = "Build multi-resolution terrain meshes from heightmaps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show patch and level statistics for a terrain
    Info {
        /// Asset root (directory or ZIP)
        #[arg(short, long)]
        root: PathBuf,

        /// Heightmap PNG or terrain JSON inside the root
        #[arg(short, long)]
        terrain: String,

        /// Simulate a frame from this distance above the terrain centre
        #[arg(long)]
        view_distance: Option<f32>,

        /// Disable frustum culling for the simulated frame
        #[arg(long)]
        no_culling: bool,

        /// Disable level-of-detail selection for the simulated frame
        #[arg(long)]
        no_lod: bool,
    },

    /// Export terrain patches to a mesh file
    Export {
        /// Asset root (directory or ZIP)
        #[arg(short, long)]
        root: PathBuf,

        /// Heightmap PNG or terrain JSON inside the root
        #[arg(short, long)]
        terrain: String,

        /// Output file path (without extension)
        #[arg(short, long)]
        output: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "glb")]
        format: OutputFormat,

        /// Level of detail to export, clamped per patch
        #[arg(short, long, default_value = "0")]
        level: usize,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Binary glTF format
    Glb,
    /// Wavefront OBJ format
    Obj,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info {
            root,
            terrain,
            view_distance,
            no_culling,
            no_lod,
        } => {
            let mut terrain = load(&root, &terrain)?;
            show_info(&terrain);
            if let Some(distance) = view_distance {
                terrain.set_flag(TerrainFlags::FRUSTUM_CULLING, !no_culling);
                terrain.set_flag(TerrainFlags::LEVEL_OF_DETAIL, !no_lod);
                simulate_frame(&mut terrain, distance);
            }
        }
        Commands::Export {
            root,
            terrain,
            output,
            format,
            level,
        } => {
            let terrain = load(&root, &terrain)?;
            export_terrain(&terrain, &output, format, ExportLevel::Index(level))?;
        }
    }

    Ok(())
}

fn load(root: &PathBuf, path: &str) -> Result<Terrain, Box<dyn std::error::Error>> {
    println!("Loading terrain {} from {:?}...", path, root);
    let terrain = open_terrain(root, path)?;
    println!(
        "  {}x{} heightfield",
        terrain.heightfield().columns(),
        terrain.heightfield().rows()
    );
    Ok(terrain)
}

fn show_info(terrain: &Terrain) {
    let bounds = terrain.bounding_box();
    let levels = terrain.patches().first().map_or(0, |p| p.level_count());

    println!("\nTerrain Info:");
    println!("  Patches: {} ({} rows x {} columns)", terrain.patch_count(), terrain.rows(), terrain.columns());
    println!("  Detail levels: {}", levels);
    println!("  Scale: {:?}", terrain.local_scale());
    println!("  Bounds: {:?} to {:?}", bounds.min, bounds.max);
    println!("  Normal map: {}", terrain.normal_map().is_some());

    for level in 0..levels {
        let triangles: usize = terrain
            .patches()
            .iter()
            .filter_map(|p| p.levels().get(level))
            .map(|l| l.mesh().triangle_count())
            .sum();
        println!("  Level {}: {} triangles", level, triangles);
    }
}

fn simulate_frame(terrain: &mut Terrain, distance: f32) {
    let bounds = terrain.bounding_box();
    let target = (bounds.min + bounds.max) * 0.5;
    let eye = target + Vec3::new(0.0, distance, distance * 0.5);
    let viewport = Viewport::sized(1280.0, 720.0);
    let camera = Camera::perspective(eye, target, 60.0, viewport.aspect_ratio(), 0.1, distance * 10.0);
    let scene = Scene::new(viewport).with_camera(camera);

    let mut backend = CountingBackend::default();
    let triangles = terrain.draw(&scene, &mut backend, false);

    println!("\nFrame from distance {}:", distance);
    println!("  Patches drawn: {} of {}", terrain.visible_patch_count(), terrain.patch_count());
    println!("  Triangles: {}", triangles);
    for patch in terrain.patches().iter().filter(|p| p.is_visible()) {
        println!("    patch ({}, {}) level {}", patch.row(), patch.column(), patch.current_level());
    }
}

fn export_terrain(
    terrain: &Terrain,
    output_path: &PathBuf,
    format: OutputFormat,
    level: ExportLevel,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Glb => {
            let glb_data = export_glb(terrain, level)?;
            let glb_path = output_path.with_extension("glb");
            fs::write(&glb_path, &glb_data)?;
            println!("Exported GLB ({} bytes) to {:?}", glb_data.len(), glb_path);
        }
        OutputFormat::Obj => {
            let name = output_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("terrain");
            let obj = export_obj(terrain, level, name)?;
            let obj_path = output_path.with_extension("obj");
            fs::write(&obj_path, obj)?;
            println!("Exported OBJ to {:?}", obj_path);
        }
    }
    Ok(())
}
