//! Data validation utilities.

use std::path::{Path, PathBuf};

use starfall_core::data::DataTables;
use starfall_core::error::GameError;
use starfall_core::game_loop::GameConfig;
use thiserror::Error;

/// File looked up when a directory is given.
pub const TABLES_FILE: &str = "tables.ron";

/// Errors that can occur while loading data files.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid RON for its type.
    #[error(transparent)]
    Parse(#[from] GameError),
    /// The tables parsed but failed cross-reference checks.
    #[error("{} has {} problem(s): {}", path.display(), errors.len(), errors.join("; "))]
    Invalid {
        /// File that failed.
        path: PathBuf,
        /// Every problem found.
        errors: Vec<String>,
    },
}

/// Resolve a data path, looking for [`TABLES_FILE`] inside directories.
#[must_use]
pub fn resolve_tables_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(TABLES_FILE)
    } else {
        path.to_path_buf()
    }
}

fn read(path: &Path) -> Result<String, DataLoadError> {
    std::fs::read_to_string(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse data tables without validating them.
pub fn load_tables(path: &Path) -> Result<DataTables, DataLoadError> {
    let path = resolve_tables_path(path);
    let text = read(&path)?;
    Ok(DataTables::from_ron_str(&path.display().to_string(), &text)?)
}

/// Parse and validate data tables.
pub fn validate_tables_file(path: &Path) -> Result<DataTables, DataLoadError> {
    let tables = load_tables(path)?;
    let errors = tables.validate();
    if errors.is_empty() {
        tracing::info!(
            recipes = tables.recipes.len(),
            technologies = tables.technologies.len(),
            planet_names = tables.planet_names.len(),
            "Data tables valid"
        );
        Ok(tables)
    } else {
        Err(DataLoadError::Invalid {
            path: resolve_tables_path(path),
            errors,
        })
    }
}

/// Parse a game config file.
pub fn load_config(path: &Path) -> Result<GameConfig, DataLoadError> {
    let text = read(path)?;
    Ok(GameConfig::from_ron_str(&path.display().to_string(), &text)?)
}
