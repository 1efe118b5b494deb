use crate::planner::PlacementAction;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Defaults applied underneath the command-line flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub related: bool,
    pub modtime: bool,
    pub overwrite: bool,
    pub suffixes: bool,
    pub recurse: bool,
    pub videos: bool,
    pub keep_related_names: bool,
    pub include_hidden: bool,
    pub action: PlacementAction,
    pub target: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            related: false,
            modtime: false,
            overwrite: false,
            suffixes: false,
            recurse: false,
            videos: false,
            keep_related_names: false,
            include_hidden: false,
            action: PlacementAction::ReportOnly,
            target: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "stampname", "stampname")
        .context("could not determine the OS config directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read config file: {}", path.display()))?;
    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("could not parse config file: {}", path.display()))?;
    Ok(config)
}
