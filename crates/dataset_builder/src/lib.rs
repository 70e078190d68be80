//! Dataset Builder Library
//!
//! 설정 파일 + CLI 플래그 → GeneratorConfig
//! rules.json → 검증된 RuleStore, category 목록
//! Ctrl-C → StopHandle (현재 이미지 완료 후 checkpoint)

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::future::Future;
use std::path::{Path, PathBuf};

use shape_core::config::GeneratorConfig;
use shape_core::pipeline::StopHandle;
use shape_core::rules::{RuleDefaults, RuleStore};
use shape_core::shards::{divide_workload, WorkShard};
use shape_core::taxonomy::CategoryTaxonomy;

/// Built-in defaults < `config_file` < `overrides`.
pub fn load_config(config_file: Option<&Path>, overrides: &Map<String, Value>) -> Result<GeneratorConfig> {
    let base = match config_file {
        Some(path) => GeneratorConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    let config = base.merge_overrides(overrides).context("Invalid command line override")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Writes a configuration file containing every key.
pub fn write_config_file(path: &Path, config: &GeneratorConfig) -> Result<()> {
    config
        .write_json_file(path)
        .with_context(|| format!("Failed to write configuration: {}", path.display()))
}

/// Writes `<out_dir>/worker_<N>.json` for every shard of the run.
pub fn write_shard_configs(
    out_dir: &Path,
    config: &GeneratorConfig,
    benchmark_secs: &[f64],
) -> Result<Vec<(WorkShard, PathBuf)>> {
    let shards = divide_workload(config.output.start_index, config.output.num_images, benchmark_secs)
        .context("Invalid benchmark times")?;
    let mut written = Vec::with_capacity(shards.len());
    for shard in shards {
        let path = out_dir.join(format!("worker_{}.json", shard.worker));
        write_config_file(&path, &shard.apply(config))?;
        written.push((shard, path));
    }
    Ok(written)
}

/// Defaults schema: `rules_defaults.json` in the working directory, else the built-in one.
pub fn rule_defaults() -> Result<RuleDefaults> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    rule_defaults_in(&cwd)
}

pub fn rule_defaults_in(dir: &Path) -> Result<RuleDefaults> {
    RuleDefaults::sidecar_or_builtin(dir)
        .with_context(|| format!("Failed to load rules defaults in {}", dir.display()))
}

pub fn load_rules(rules_path: &Path) -> Result<RuleStore> {
    load_rules_with(rules_path, &rule_defaults()?)
}

pub fn load_rules_with(rules_path: &Path, defaults: &RuleDefaults) -> Result<RuleStore> {
    shape_core::rules::load_rules_file(rules_path, defaults)
        .with_context(|| format!("Invalid rules file: {}", rules_path.display()))
}

/// Requests a graceful stop once `signal` fires.
pub async fn stop_on_signal<F>(signal: F, stop: StopHandle)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            tracing::info!("Interrupt received, finishing the current image");
            stop.request_stop();
        }
        Err(e) => tracing::warn!("Failed to listen for interrupt: {}", e),
    }
}

/// Ctrl-C → `stop`, on a background thread. A second Ctrl-C exits immediately.
pub fn watch_interrupt(stop: StopHandle) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the signal runtime")?;
    std::thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            runtime.block_on(async {
                stop_on_signal(tokio::signal::ctrl_c(), stop).await;
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Second interrupt, exiting without a checkpoint");
                    std::process::exit(130);
                }
            })
        })
        .context("Failed to spawn the interrupt watcher")?;
    Ok(())
}

/// `"<id>\t<name>"` per category, in id order.
pub fn category_lines(taxonomy: &CategoryTaxonomy) -> Vec<String> {
    taxonomy.entries().iter().map(|entry| format!("{}\t{}", entry.id, entry.name)).collect()
}

/// Validated rules document, pretty-printed.
pub fn validated_rules_json(rules: &RuleStore) -> Result<String> {
    serde_json::to_string_pretty(rules.raw()).context("Failed to serialize validated rules")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shape_core::rules::defaults::{BUILTIN_DEFAULTS_JSON, DEFAULTS_FILE_NAME};
    use tempfile::TempDir;

    fn write_rules(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("rules.json");
        let rules = json!({
            "objects": [
                {"name": "cube", "allowed_materials": ["plastic"], "allowed_colors": ["red"]},
                {"name": "ball", "allowed_materials": "none"}
            ],
            "materials": [{"name": "plastic"}],
            "colors": [{"name": "red", "hex": "#ff0000"}, {"name": "blue", "hex": "0000ff"}],
            "categories": {"ignore_material": false, "ignore_color": false}
        });
        std::fs::write(&path, serde_json::to_string_pretty(&rules).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_config_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"num_images": 20, "split": "val", "use_gpu": 0}"#).unwrap();

        let mut overrides = Map::new();
        overrides.insert("num_images".to_string(), json!(5));
        let config = load_config(Some(path.as_path()), &overrides).unwrap();

        assert_eq!(config.output.num_images, 5);
        assert_eq!(config.output.split, "val");
        assert!(!config.render.use_gpu);
        assert_eq!(config.render.images_width, 640);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let mut overrides = Map::new();
        overrides.insert("min_num_objects".to_string(), json!(9));
        overrides.insert("max_num_objects".to_string(), json!(3));
        assert!(load_config(None, &overrides).is_err());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("configs").join("default.json");
        write_config_file(&path, &GeneratorConfig::default()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"lights_intensity\""));
        assert_eq!(load_config(Some(path.as_path()), &Map::new()).unwrap(), GeneratorConfig::default());
    }

    #[test]
    fn test_rules_and_categories() {
        let temp_dir = TempDir::new().unwrap();
        let rules = load_rules(&write_rules(temp_dir.path())).unwrap();
        let taxonomy = CategoryTaxonomy::build(&rules).unwrap();

        assert_eq!(category_lines(&taxonomy), vec!["0\tred plastic cube", "1\tred ball", "2\tblue ball"]);

        let validated: Value = serde_json::from_str(&validated_rules_json(&rules).unwrap()).unwrap();
        assert_eq!(validated["objects"][1]["file"], "ball.glb");
        assert_eq!(validated["decoys"], json!([]));
    }

    #[test]
    fn test_shard_configs() {
        let temp_dir = TempDir::new().unwrap();
        let mut overrides = Map::new();
        overrides.insert("num_images".to_string(), json!(9));
        let config = load_config(None, &overrides).unwrap();

        let written = write_shard_configs(temp_dir.path(), &config, &[1.0, 0.5]).unwrap();
        assert_eq!(written.len(), 2);

        let second = load_config(Some(written[1].1.as_path()), &Map::new()).unwrap();
        assert_eq!(second.output.start_index, 3);
        assert_eq!(second.output.num_images, 6);
        assert_eq!(second.output.filename_prefix.as_deref(), Some("part1"));
    }

    #[test]
    fn test_defaults_come_from_working_directory() {
        let rules_dir = TempDir::new().unwrap();
        let rules_path = write_rules(rules_dir.path());
        // a schema next to the rules file must not be picked up
        let schema = BUILTIN_DEFAULTS_JSON.replace("={name}.glb", "={name}.obj");
        std::fs::write(rules_dir.path().join(DEFAULTS_FILE_NAME), &schema).unwrap();

        // tests run in the crate directory, which has no rules_defaults.json
        assert_eq!(&rule_defaults().unwrap(), RuleDefaults::builtin());
        let rules = load_rules(&rules_path).unwrap();
        assert_eq!(rules.raw()["objects"][1]["file"], "ball.glb");

        let work_dir = TempDir::new().unwrap();
        std::fs::write(work_dir.path().join(DEFAULTS_FILE_NAME), &schema).unwrap();
        let rules = load_rules_with(&rules_path, &rule_defaults_in(work_dir.path()).unwrap()).unwrap();
        assert_eq!(rules.raw()["objects"][1]["file"], "ball.obj");
    }

    #[test]
    fn test_signal_requests_stop() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let stop = StopHandle::new();

        runtime.block_on(stop_on_signal(async { Ok::<(), std::io::Error>(()) }, stop.clone()));
        assert!(stop.is_stop_requested());

        let untouched = StopHandle::new();
        let failed = async { Err::<(), _>(std::io::Error::other("no signal")) };
        runtime.block_on(stop_on_signal(failed, untouched.clone()));
        assert!(!untouched.is_stop_requested());
    }

    #[test]
    fn test_missing_rules_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_rules(&temp_dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
