pub mod append;
pub mod material;
pub mod pattern;
pub mod process;
pub mod prompt;
pub mod rules;
pub mod sync;

use clap::Args;
use masterfile_core::error::MasterfileError;
use masterfile_core::MasterfileConfig;
use std::path::PathBuf;
use tracing::debug;

/// Config file plus per-field overrides, available on every subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// JSON config with template paths, sheet layout and an optional rules file
    #[arg(short = 'c', long = "config", global = true, env = "MASTERFILE_CONFIG", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Reference masterfile workbook
    #[arg(long, global = true, env = "MASTERFILE_TEMPLATE", value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Slide deck template
    #[arg(long, global = true, env = "MASTERFILE_DECK_TEMPLATE", value_name = "FILE")]
    pub deck_template: Option<PathBuf>,

    /// Custom equipment rules JSON replacing the built-in table
    #[arg(long, global = true, env = "MASTERFILE_RULES", value_name = "FILE")]
    pub rules: Option<PathBuf>,
}

/// The config file when given, otherwise the defaults, then the overrides.
pub fn load_config(args: &ConfigArgs) -> Result<MasterfileConfig, MasterfileError> {
    let mut config = match &args.file {
        Some(path) => MasterfileConfig::load(path)?,
        None => MasterfileConfig::default(),
    };
    if let Some(path) = &args.template {
        config.template_path = path.clone();
    }
    if let Some(path) = &args.deck_template {
        config.deck_template_path = path.clone();
    }
    if let Some(path) = &args.rules {
        config.rules_file = Some(path.clone());
    }
    debug!(
        file = ?args.file,
        template = %config.template_path.display(),
        deck_template = %config.deck_template_path.display(),
        rules = ?config.rules_file,
        "config loaded"
    );
    Ok(config)
}
