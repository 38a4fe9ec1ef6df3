//! Loading of parsed IDL model dumps.
//!
//! The model is produced by an external IDL front end and handed over as JSON or YAML.
//! A single file or a whole directory of dumps (one per IDL file, e.g. the includes of a
//! main file) can be loaded; several dumps are merged into one model.

use crate::error::{Error, Result};
use crate::idl::IdlModel;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Loader for IDL model dumps below a file or directory.
///
/// Directories are walked recursively, skipping `target` and hidden directories.
pub struct ModelLoader {
    root_path: PathBuf,
}

/// Result of a load operation.
pub struct LoadResult {
    /// The merged model
    pub model: IdlModel,
    /// Dump files the model was read from, in load order
    pub files: Vec<PathBuf>,
    /// Warning messages for skipped files and duplicate definitions
    pub warnings: Vec<String>,
}

/// Dump formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Json,
    Yaml,
}

impl ModelFormat {
    /// Format of a dump file, or `None` if the extension is not a model extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Some(ModelFormat::Json),
            Some("yaml") | Some("yml") => Some(ModelFormat::Yaml),
            _ => None,
        }
    }
}

impl ModelLoader {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Parses a single model dump.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has no model extension, or does not
    /// contain a valid model.
    pub fn load_file(path: &Path) -> Result<IdlModel> {
        debug!("Loading model file: {}", path.display());

        let format = ModelFormat::from_path(path).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "{} is not a .json, .yaml or .yml file",
                path.display()
            ))
        })?;
        let content = fs::read_to_string(path)?;

        let parsed = match format {
            ModelFormat::Json => IdlModel::from_json_str(&content),
            ModelFormat::Yaml => IdlModel::from_yaml_str(&content),
        };
        parsed.map_err(|e| Error::ParseError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Collects all model dumps below the root, in sorted path order.
    pub fn scan(&self) -> (Vec<PathBuf>, Vec<String>) {
        let mut files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && ModelFormat::from_path(path).is_some() {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        (files, warnings)
    }

    /// Loads and merges every model dump below the root.
    ///
    /// Files that fail to parse are skipped with a warning. When several dumps define a
    /// struct with the same name, the first definition is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoModelFound`] if no dump could be loaded.
    pub fn load(&self) -> Result<LoadResult> {
        let (candidates, mut warnings) = if self.root_path.is_file() {
            (vec![self.root_path.clone()], Vec::new())
        } else {
            self.scan()
        };
        debug!("Found {} model file candidates", candidates.len());

        let mut model = IdlModel::default();
        let mut files = Vec::new();
        for path in candidates {
            match Self::load_file(&path) {
                Ok(loaded) => {
                    for name in model.extend(loaded) {
                        let warning = format!(
                            "Struct {} in {} is already defined, keeping the first definition",
                            name,
                            path.display()
                        );
                        warn!("{}", warning);
                        warnings.push(warning);
                    }
                    files.push(path);
                }
                Err(e) => {
                    let warning = format!("Skipping {}: {}", path.display(), e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        if files.is_empty() {
            return Err(Error::NoModelFound(self.root_path.clone()));
        }

        info!(
            "Loaded {} services and {} structs from {} files",
            model.services.len(),
            model.structs.len(),
            files.len()
        );
        Ok(LoadResult {
            model,
            files,
            warnings,
        })
    }
}
