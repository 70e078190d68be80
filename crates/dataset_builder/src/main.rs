//! Dataset Builder CLI
//!
//! rules.json + 설정 → 렌더 스크립트 + annotations.json

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "cli")]
use serde::Serialize;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "dataset_builder")]
#[command(about = "Generate synthetic shape datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Generate a dataset split
    Generate {
        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Continue from a checkpoint file; configuration flags are ignored
        #[arg(long)]
        resume: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Write a configuration file with every key
    BuildConfig {
        /// Output JSON file path
        output: PathBuf,

        /// Start from an existing configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Split a run across workers in proportion to their benchmark times
    PlanShards {
        /// Directory receiving one `worker_<N>.json` configuration per worker
        #[arg(long)]
        out_dir: PathBuf,

        /// Benchmark time in seconds, one per worker
        #[arg(long = "benchmark-time", required = true, num_args = 1..)]
        benchmark_times: Vec<f64>,

        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Print the category taxonomy with ids
    Categories {
        /// Rules file path
        #[arg(long)]
        rules: PathBuf,
    },

    /// Validate a rules file and print the defaulted rules
    ValidateRules {
        /// Rules file path
        #[arg(long)]
        rules: PathBuf,

        /// Write the validated rules here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Configuration keys settable from the command line. Unset flags keep the file value.
#[cfg(feature = "cli")]
#[derive(Args, Debug, Default, Serialize)]
#[command(rename_all = "snake_case")]
struct ConfigOverrides {
    // === Output ===
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    filename_prefix: Option<String>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    split: Option<String>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    num_images: Option<u64>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    start_index: Option<u64>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    checkpoint_every: Option<u64>,

    // === Input ===
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    materials_dir: Option<PathBuf>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    objects_dir: Option<PathBuf>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    decoys_dir: Option<PathBuf>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    rules: Option<PathBuf>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    base_scene: Option<PathBuf>,

    // === Scene ===
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    area_size: Option<f64>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    padding: Option<f64>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    min_num_objects: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_num_objects: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    min_num_decoys: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_num_decoys: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_placement_attempts: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_snap_attempts: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,

    // === Camera ===
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    camera_distance: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    min_camera_pitch: Option<i32>,
    #[arg(long, allow_hyphen_values = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_camera_pitch: Option<i32>,
    #[arg(long, allow_hyphen_values = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    min_camera_yaw: Option<i32>,
    #[arg(long, allow_hyphen_values = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_camera_yaw: Option<i32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    camera_lens: Option<f64>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    camera_sensor_width: Option<f64>,

    // === Lights ===
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    min_num_lights: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_num_lights: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    lights_jitter: Option<f64>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    lights_distance: Option<f64>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    lights_intensity: Option<f64>,

    // === Render ===
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    images_width: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    images_height: Option<u32>,
    /// 0/1 or false/true
    #[arg(long, value_parser = parse_flag)]
    #[serde(skip_serializing_if = "Option::is_none")]
    use_gpu: Option<bool>,
    #[arg(long, value_parser = parse_flag)]
    #[serde(skip_serializing_if = "Option::is_none")]
    create_segmentations: Option<bool>,
    #[arg(long, value_parser = parse_flag)]
    #[serde(skip_serializing_if = "Option::is_none")]
    create_depth: Option<bool>,
    #[arg(long, value_parser = parse_flag)]
    #[serde(skip_serializing_if = "Option::is_none")]
    create_bounding_boxes: Option<bool>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    min_pixels_per_object: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_render_retries: Option<u32>,
    #[arg(long, value_parser = parse_flag)]
    #[serde(skip_serializing_if = "Option::is_none")]
    test_mode: Option<bool>,
}

#[cfg(feature = "cli")]
impl ConfigOverrides {
    fn to_map(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(self).context("Failed to encode overrides")? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Ok(serde_json::Map::new()),
        }
    }
}

#[cfg(feature = "cli")]
fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(format!("expected 0/1 or true/false, found '{other}'")),
    }
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { config, resume, overrides } => {
            let overrides = overrides.to_map()?;
            generate(config, resume, &overrides)?;
        }

        Commands::BuildConfig { output, config, overrides } => {
            let config = dataset_builder::load_config(config.as_deref(), &overrides.to_map()?)?;
            dataset_builder::write_config_file(&output, &config)?;
            println!("Configuration written to {}", output.display());
        }

        Commands::PlanShards { out_dir, benchmark_times, config, overrides } => {
            let config = dataset_builder::load_config(config.as_deref(), &overrides.to_map()?)?;
            let paths = dataset_builder::write_shard_configs(&out_dir, &config, &benchmark_times)?;
            for (shard, path) in paths {
                println!(
                    "worker {}: images {}..{} -> {}",
                    shard.worker,
                    shard.start_index,
                    shard.start_index + shard.num_images,
                    path.display()
                );
            }
        }

        Commands::Categories { rules } => {
            let store = dataset_builder::load_rules(&rules)?;
            let taxonomy = shape_core::CategoryTaxonomy::build(&store).context("Failed to build categories")?;
            for line in dataset_builder::category_lines(&taxonomy) {
                println!("{line}");
            }
        }

        Commands::ValidateRules { rules, out } => {
            let store = dataset_builder::load_rules(&rules)?;
            let json = dataset_builder::validated_rules_json(&store)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write validated rules: {}", path.display()))?;
                    println!("Validated rules written to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn generate(
    config: Option<PathBuf>,
    resume: Option<PathBuf>,
    overrides: &serde_json::Map<String, serde_json::Value>,
) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use shape_core::{Checkpoint, DatasetGenerator, MeshLibrary, ScriptRenderer};

    let mut generator = match resume {
        Some(path) => {
            if config.is_some() || !overrides.is_empty() {
                tracing::warn!("Resuming from {}: configuration flags are ignored", path.display());
            }
            let checkpoint = Checkpoint::load(&path)
                .with_context(|| format!("Failed to load checkpoint: {}", path.display()))?;
            let defaults = dataset_builder::rule_defaults()?;
            let rules = checkpoint.rule_store(&defaults).context("Checkpoint rules are invalid")?;
            let meshes = MeshLibrary::load_gltf(&rules, &checkpoint.config.input)?;
            DatasetGenerator::resume(checkpoint, &defaults, meshes, ScriptRenderer::new())?
        }
        None => {
            let config = dataset_builder::load_config(config.as_deref(), overrides)?;
            let rules = dataset_builder::load_rules(&config.input.rules)?;
            let meshes = MeshLibrary::load_gltf(&rules, &config.input)?;
            DatasetGenerator::new(config, rules, meshes, ScriptRenderer::new())?
        }
    };

    dataset_builder::watch_interrupt(generator.stop_handle())?;

    let output = &generator.config().output;
    let start = generator.state().img_index.saturating_sub(output.start_index);
    let pb = ProgressBar::new(output.num_images);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.green/blue}] {pos}/{len} images ({percent}%) {msg}")
            .context("Invalid progress template")?
            .progress_chars("█▉▊▋▌▍▎▏"),
    );
    pb.set_position(start);

    let summary = generator.run(|progress| {
        pb.set_position(progress.done);
        pb.set_message(format!("{} objects, {} decoys", progress.objects, progress.decoys));
    })?;
    pb.finish_with_message("done");

    println!("Images:      {}", summary.images);
    println!("Objects:     {}", summary.objects);
    println!("Decoys:      {}", summary.decoys);
    println!("Annotations: {} ({})", summary.annotations, summary.annotations_path.display());
    if summary.stopped {
        println!("Stopped early, resume with --resume {}", generator.config().output.checkpoint_path().display());
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("dataset_builder CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
