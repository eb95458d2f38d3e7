use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Deserialize;

use weave_core::{weave as run_weave, WeaveOptions, WeaveRequest};

#[derive(Args, Debug, Clone)]
pub struct WeaveArgs {
    /// Assembly containing the source type
    #[arg(long, value_name = "ASSEMBLY")]
    pub source: Option<PathBuf>,

    /// Fully-qualified name of the source type to clone members from
    #[arg(long, value_name = "FQN")]
    pub source_type: Option<String>,

    /// Assembly containing the target type
    #[arg(long, value_name = "ASSEMBLY")]
    pub target: Option<PathBuf>,

    /// Fully-qualified name of the target type to clone members into
    #[arg(long, value_name = "FQN")]
    pub target_type: Option<String>,

    /// Where to write the woven assembly
    #[arg(long, value_name = "ASSEMBLY")]
    pub out: Option<PathBuf>,

    /// Full name of an attribute marking a member to skip during weaving
    #[arg(long, value_name = "FQN")]
    pub skip_attribute: Option<String>,

    /// Full name of an attribute to drop from the source root when cloning
    /// its own custom attributes (multiple allowed)
    #[arg(long, value_name = "FQN", num_args = 0..)]
    pub attribute_filter: Vec<String>,

    /// TOML batch manifest; mutually exclusive with the single-weave flags
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Deserialize)]
struct BatchManifest {
    source: PathBuf,
    target: PathBuf,
    out: PathBuf,
    #[serde(default)]
    skip_attribute: Option<String>,
    #[serde(default)]
    attribute_filter: Vec<String>,
    weaves: Vec<BatchPair>,
}

#[derive(Deserialize)]
struct BatchPair {
    source_type: String,
    target_type: String,
}

pub fn execute(args: WeaveArgs) -> Result<()> {
    let is_single = args.source.is_some()
        || args.source_type.is_some()
        || args.target.is_some()
        || args.target_type.is_some()
        || args.out.is_some();

    if args.config.is_some() && is_single {
        bail!("--config is mutually exclusive with --source/--source-type/--target/--target-type/--out");
    }

    match args.config {
        Some(config_path) => execute_batch(&config_path),
        None => execute_single(args),
    }
}

fn execute_single(args: WeaveArgs) -> Result<()> {
    let source = args.source.context("--source is required without --config")?;
    let source_type = args.source_type.context("--source-type is required without --config")?;
    let target = args.target.context("--target is required without --config")?;
    let target_type = args.target_type.context("--target-type is required without --config")?;
    let out = args.out.context("--out is required without --config")?;

    let options = WeaveOptions { skip_attribute: args.skip_attribute, attribute_filter: args.attribute_filter };

    log::info!("weaving {source_type} ({}) into {target_type} ({})", source.display(), target.display());
    crate::errors::report(
        run_weave(WeaveRequest {
            source_path: &source,
            source_type: &source_type,
            target_path: &target,
            target_type: &target_type,
            out_path: &out,
            options,
        }),
        "weave failed",
    )?;
    log::info!("wrote {}", out.display());
    Ok(())
}

fn execute_batch(config_path: &std::path::Path) -> Result<()> {
    let text =
        fs::read_to_string(config_path).with_context(|| format!("failed to read config file: {}", config_path.display()))?;
    let manifest: BatchManifest =
        toml::from_str(&text).with_context(|| format!("failed to parse config file: {}", config_path.display()))?;

    let options = WeaveOptions { skip_attribute: manifest.skip_attribute, attribute_filter: manifest.attribute_filter };

    // The first weave reads the pristine target; every weave after it
    // reads back the assembly the previous one just wrote, so a manifest
    // with several pairs accumulates all of them into one output rather
    // than overwriting each other's work.
    let mut current_target = manifest.target.clone();
    for pair in &manifest.weaves {
        log::info!(
            "weaving {} ({}) into {} ({})",
            pair.source_type,
            manifest.source.display(),
            pair.target_type,
            current_target.display()
        );
        crate::errors::report(
            run_weave(WeaveRequest {
                source_path: &manifest.source,
                source_type: &pair.source_type,
                target_path: &current_target,
                target_type: &pair.target_type,
                out_path: &manifest.out,
                options: options.clone(),
            }),
            &format!("weave of {} failed", pair.source_type),
        )?;
        current_target = manifest.out.clone();
    }
    log::info!("wrote {}", manifest.out.display());
    Ok(())
}
