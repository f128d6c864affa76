//! Directory-backed model persistence via bincode.

use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use heritage_frame::Schema;
use tracing::{debug, info, instrument};

use crate::error::ModelError;
use crate::model::{Model, Strategy};

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// File extension of stored artifacts.
const EXTENSION: &str = "bin";

/// Default directory for model artifacts.
pub const DEFAULT_MODEL_DIR: &str = "outputs/models";

/// Versioned envelope for a serialized model.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    format_version: u32,
    strategy: Strategy,
    schema: Schema,
    target: String,
    model: Model,
}

/// A validated artifact name: one or more of `[a-zA-Z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelName(String);

impl ModelName {
    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ModelName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(ModelError::InvalidModelName { name: s.to_string() })
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named model slots under one directory, one `{name}.bin` file each.
///
/// Saves are atomic: the artifact is written to a uniquely named temporary
/// sibling and renamed over the target, so a concurrent load sees either the old or the
/// new model, never a partial one.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Return the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return the artifact path for `name`.
    #[must_use]
    pub fn path_for(&self, name: &ModelName) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    /// Serialize `model` under `name`, overwriting any previous artifact.
    ///
    /// Returns the artifact path.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::InvalidModelName`] | name outside `[a-zA-Z0-9_-]+` |
    /// | [`ModelError::CreateDir`] | store directory cannot be created |
    /// | [`ModelError::SerializeModel`] | bincode encoding failed |
    /// | [`ModelError::WriteModel`] | temp write or rename failed |
    #[instrument(skip(self, model), fields(dir = %self.dir.display(), strategy = %model.strategy()))]
    pub fn save(&self, model: &Model, name: &str) -> Result<PathBuf, ModelError> {
        let name: ModelName = name.parse()?;
        std::fs::create_dir_all(&self.dir).map_err(|e| ModelError::CreateDir {
            path: self.dir.clone(),
            source: e,
        })?;

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            strategy: model.strategy(),
            schema: model.schema().clone(),
            target: model.target().to_string(),
            model: model.clone(),
        };
        let bytes = bincode::serialize(&envelope).map_err(|e| ModelError::SerializeModel { source: e })?;

        let path = self.path_for(&name);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| ModelError::WriteModel {
            path: self.dir.clone(),
            source: e,
        })?;
        tmp.write_all(&bytes).map_err(|e| ModelError::WriteModel {
            path: tmp.path().to_path_buf(),
            source: e,
        })?;
        tmp.persist(&path).map_err(|e| ModelError::WriteModel {
            path: path.clone(),
            source: e.error,
        })?;

        info!(size_bytes = bytes.len(), path = %path.display(), "model saved");
        Ok(path)
    }

    /// Load the model stored under `name`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::InvalidModelName`] | name outside `[a-zA-Z0-9_-]+` |
    /// | [`ModelError::ModelNotFound`] | no artifact under `name` |
    /// | [`ModelError::ReadModel`] | file read failed |
    /// | [`ModelError::DeserializeModel`] | bincode decoding failed |
    /// | [`ModelError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`ModelError::StrategyMismatch`] | envelope tag disagrees with the model |
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn load(&self, name: &str) -> Result<Model, ModelError> {
        let name: ModelName = name.parse()?;
        let path = self.path_for(&name);

        let bytes = std::fs::read(&path).map_err(|e| {
            if e.kind() == IoErrorKind::NotFound {
                ModelError::ModelNotFound {
                    name: name.to_string(),
                    path: path.clone(),
                }
            } else {
                ModelError::ReadModel {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;

        let envelope: ModelEnvelope = bincode::deserialize(&bytes).map_err(|e| ModelError::DeserializeModel {
            path: path.clone(),
            source: e,
        })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(ModelError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path,
            });
        }
        if envelope.strategy != envelope.model.strategy() {
            return Err(ModelError::StrategyMismatch {
                path,
                tagged: envelope.strategy,
                found: envelope.model.strategy(),
            });
        }

        debug!(
            strategy = %envelope.strategy,
            n_features = envelope.schema.len(),
            target = %envelope.target,
            "model loaded"
        );
        Ok(envelope.model)
    }

    /// Return `true` if an artifact exists under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidModelName`] for an invalid name.
    pub fn contains(&self, name: &str) -> Result<bool, ModelError> {
        let name: ModelName = name.parse()?;
        Ok(self.path_for(&name).is_file())
    }

    /// Remove the artifact under `name`, returning whether one existed.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidModelName`] or [`ModelError::DeleteModel`].
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn delete(&self, name: &str) -> Result<bool, ModelError> {
        let name: ModelName = name.parse()?;
        let path = self.path_for(&name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "model deleted");
                Ok(true)
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(e) => Err(ModelError::DeleteModel { path, source: e }),
        }
    }

    /// List stored model names, sorted. A missing directory lists as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ListModels`] if the directory cannot be read.
    pub fn list(&self) -> Result<Vec<ModelName>, ModelError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ModelError::ListModels {
                    path: self.dir.clone(),
                    source: e,
                });
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ModelError::ListModels {
                path: self.dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str())
                && let Ok(name) = name.parse::<ModelName>()
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
