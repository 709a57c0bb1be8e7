use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to read save file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write save file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode save data: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode save file {path} at `{field}`: {source}")]
    Decode {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A single JSON save slot on disk.
#[derive(Debug, Clone)]
pub struct SaveFile {
    path: PathBuf,
}

impl SaveFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read_to_string(&self) -> Result<String, SaveError> {
        fs::read_to_string(&self.path).map_err(|source| SaveError::Read {
            path: self.path.clone(),
            source,
        })
    }

    /// Decode errors name the JSON path of the offending value, `.` for the root.
    pub fn read_json<T: DeserializeOwned>(&self) -> Result<T, SaveError> {
        let raw = self.read_to_string()?;
        let mut deserializer = serde_json::Deserializer::from_str(&raw);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let field = error.path().to_string();
            SaveError::Decode {
                path: self.path.clone(),
                field,
                source: error.into_inner(),
            }
        })
    }

    /// Writes through a sibling temp file so a crash never leaves half a save behind.
    pub fn write_json<T: Serialize>(&self, value: &T) -> Result<(), SaveError> {
        let text = serde_json::to_string_pretty(value).map_err(SaveError::Encode)?;
        write_text_atomic(&self.path, &text).map_err(|source| SaveError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "game_saved");
        Ok(())
    }
}

fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, text.as_bytes())?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("save.json");
    path.with_file_name(format!("{file_name}.tmp"))
}
