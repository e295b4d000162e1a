//! Locates config files and layers them over the built-in defaults.

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Project-level config file names, checked in order
const PROJECT_FILES: [&str; 2] = ["ensemble.toml", ".ensemble.toml"];

/// Finds and merges the `FileConfig` sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Merge every discovered source. Later sources win:
    /// defaults, then the user config dir, then the project file, then `config_path`.
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        let mut sources = Vec::new();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                sources.push(global_path);
            }
        }
        if let Some(project_path) = Self::project_config_path() {
            sources.push(project_path);
        }
        if let Some(path) = config_path {
            sources.push(path.clone());
        }

        Self::load_files(&sources)
    }

    /// Merge defaults with `paths`, later paths taking precedence.
    ///
    /// A listed path that does not exist is skipped.
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));
        for path in paths {
            figment = figment.merge(Toml::file(path.as_ref()));
        }
        figment.extract().map_err(Box::new)
    }

    /// Built-in defaults with no file lookups.
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// `<config dir>/ensemble-quorum/config.toml`, whether or not it exists.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ensemble-quorum").join("config.toml"))
    }

    /// First of [`PROJECT_FILES`] present in the working directory.
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// One line per candidate source, marked when the file is present.
    pub fn describe_sources(explicit: Option<&PathBuf>) -> Vec<String> {
        let mut lines = vec!["Configuration sources (in priority order):".to_string()];

        if let Some(path) = explicit {
            let mark = if path.exists() { "FOUND" } else { "     " };
            lines.push(format!("  [{}] Explicit: {}", mark, path.display()));
        }

        match Self::project_config_path() {
            Some(path) => lines.push(format!("  [FOUND] Project: {}", path.display())),
            None => lines.push("  [     ] Project: ./ensemble.toml or ./.ensemble.toml".to_string()),
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "     " };
            lines.push(format!("  [{}] Global:  {}", mark, path.display()));
        }

        lines.push("  [     ] Default: built-in defaults".to_string());
        lines
    }
}
