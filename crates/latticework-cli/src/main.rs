//! Latticework CLI - Voronoi lattice fabrication from the command line

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use latticework_core::Primitive;
use latticework_engine::{Collaborators, Pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "latticework")]
#[command(about = "Voronoi lattices and print supports from voxel SDFs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fabrication pipeline
    Run(RunArgs),

    /// List the built-in primitives
    Primitives,

    /// Print the effective configuration as JSON
    Config(RunArgs),
}

/// Configuration file plus per-flag overrides
#[derive(Args)]
struct RunArgs {
    /// JSON configuration file (missing keys take their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in primitive to use as the source
    #[arg(short, long)]
    primitive: Option<String>,

    /// Mesh file under the input directory; wins over --primitive
    #[arg(short, long)]
    file: Option<String>,

    /// Cells per axis of the source grid
    #[arg(short, long)]
    resolution: Option<u32>,

    /// Threads per block for kernel launches
    #[arg(long)]
    block_size: Option<u32>,

    /// Empty voxels kept around the geometry
    #[arg(long)]
    buffer: Option<u32>,

    /// Build the support lattice
    #[arg(long)]
    support: bool,

    /// Skip the model lattice
    #[arg(long)]
    no_model: bool,

    /// Export model and supports as one mesh
    #[arg(long)]
    merge_supports: bool,

    /// Punch holes through the supports at their seeds
    #[arg(long)]
    perforate: bool,

    /// Hollow the model before building lattices
    #[arg(long)]
    net: bool,

    /// Keep a thinned solid inside the lattice
    #[arg(long)]
    aesthetic: bool,

    /// Also export the mold
    #[arg(long)]
    inverse: bool,

    /// Write a per-slice image stack
    #[arg(long)]
    image_stack: bool,

    /// Export without smoothing
    #[arg(long)]
    no_smooth: bool,

    /// Stop before writing meshes
    #[arg(long)]
    no_export: bool,

    #[arg(long)]
    input_dir: Option<PathBuf>,

    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Base name for exported meshes
    #[arg(long)]
    name: Option<String>,
}

impl RunArgs {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(primitive) = self.primitive {
            config.primitive_type = primitive;
        }
        if let Some(file) = self.file {
            config.file_name = file;
        }
        if let Some(resolution) = self.resolution {
            config.resolution = resolution;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if let Some(buffer) = self.buffer {
            config.buffer = buffer;
        }
        if let Some(dir) = self.input_dir {
            config.input_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if self.name.is_some() {
            config.output_name = self.name;
        }

        config.support |= self.support;
        config.model &= !self.no_model;
        config.separate_supports &= !self.merge_supports;
        config.perforate |= self.perforate;
        config.net |= self.net;
        config.aesthetic |= self.aesthetic;
        config.inverse |= self.inverse;
        config.image_stack |= self.image_stack;
        config.smooth &= !self.no_smooth;
        config.export &= !self.no_export;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args.into_config()?)?,
        Commands::Primitives => {
            for primitive in Primitive::ALL {
                println!("{primitive}");
            }
        }
        Commands::Config(args) => println!("{}", args.into_config()?.to_json_pretty()?),
    }

    Ok(())
}

fn run(config: PipelineConfig) -> Result<()> {
    info!("Writing output to {}", config.output_dir.display());
    let pipeline = Pipeline::new(Collaborators::builtin(&config.output_dir));
    let report = pipeline.run(&config)?;

    if let Some(model) = report.model {
        println!(
            "Model:   {:.1} mm^3, {:.2} g",
            model.volume_mm3, model.mass_g
        );
    }
    if let Some(support) = report.support {
        println!(
            "Support: {:.1} mm^3, {:.2} g",
            support.volume_mm3, support.mass_g
        );
    }
    for branch in &report.skipped {
        println!("Skipped: {}", branch.name());
    }
    for name in &report.artifacts {
        println!("Exported: {}", name);
    }
    Ok(())
}
