//! meshlet-export - meshlet replacement model tool
//!
//! Converts a plain glTF/GLB model into a `.replacement.gltf` carrying the
//! `NONE_deus_ex_vk_render_mesh` meshlet extension.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use meshlet_common::files::REPLACEMENT_EXT;
use meshlet_export::{convert_gltf, ExportConfig};

#[derive(Parser)]
#[command(name = "meshlet-export")]
#[command(about = "Partition glTF meshes into meshlets and write a replacement model")]
#[command(version)]
struct Cli {
    /// Input glTF/GLB file (plain export)
    input: PathBuf,

    /// Output .replacement.gltf file
    output: PathBuf,

    /// Export settings (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum vertices per meshlet (overrides config)
    #[arg(long)]
    max_vertices: Option<u32>,

    /// Maximum triangles per meshlet (overrides config)
    #[arg(long)]
    max_triangles: Option<u32>,

    /// Decode the written file again and report what the runtime would load
    #[arg(long)]
    verify: bool,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::default(),
    };
    if let Some(max_vertices) = cli.max_vertices {
        config.max_vertices = max_vertices;
    }
    if let Some(max_triangles) = cli.max_triangles {
        config.max_triangles = max_triangles;
    }
    config.validate()?;

    if !cli.input.exists() {
        bail!("Input file not found: {:?}", cli.input);
    }

    convert_gltf(&cli.input, &cli.output, &config)?;

    if cli.verify {
        let name = model_name(&cli.output);
        let replacement = meshlet_runtime::load_replacement(&cli.output, &name)
            .with_context(|| format!("Verification of {:?} failed", cli.output))?;
        tracing::info!(
            "Verified {}: {} meshlets, {} vertices, {} triangles, {} textures",
            replacement.name,
            replacement.meshlets.len(),
            replacement.verts.len(),
            replacement.triangle_count(),
            replacement.texture_file_names.len()
        );
    }

    tracing::info!("Done!");
    Ok(())
}

/// `<dir>/<model>.replacement.gltf` -> `<model>`
fn model_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.strip_suffix(&format!(".{}", REPLACEMENT_EXT)) {
        Some(model) => model.to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(file_name),
    }
}
