use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod assets;
pub mod geometry;
pub mod persist;
pub mod tiled;

pub use app::{
    run_app, AppError, AudioSink, EventQueue, GameEvent, InputAction, InputSnapshot, KeyEvent,
    LoggingAudio, LoopConfig, MusicCue, Renderer, Scene, SceneController, SceneError,
    SceneStatus, TickOutcome,
};
pub use assets::{AssetBundle, AssetError};
pub use geometry::Rect;
pub use persist::{SaveError, SaveFile};

pub const ROOT_ENV_VAR: &str = "CROWN_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub resources_dir: PathBuf,
    pub save_file: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create save directory at {path}: {source}")]
    CreateSaveDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "CROWN_ROOT is set but does not point to a valid game root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or resources/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect the game root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or resources/.\n\
Set {env_var} explicitly, for example:\n\
export {env_var}=\"/path/to/stolen-crown\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    paths_under(root)
}

fn paths_under(root: PathBuf) -> Result<AppPaths, StartupError> {
    let resources_dir = root.join("resources");
    let save_dir = root.join("save");
    fs::create_dir_all(&save_dir).map_err(|source| StartupError::CreateSaveDir {
        path: save_dir.clone(),
        source,
    })?;

    Ok(AppPaths {
        root,
        resources_dir,
        save_file: save_dir.join("save.json"),
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_resources = path.join("resources").is_dir();

    cargo_toml && (has_crates || has_resources)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let temp = TempDir::new().expect("temp");
        fs::create_dir_all(temp.path().join("resources")).expect("resources");
        assert!(!is_repo_marker(temp.path()));

        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("manifest");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn save_file_lives_under_root_save_dir() {
        let temp = TempDir::new().expect("temp");
        let paths = paths_under(temp.path().to_path_buf()).expect("paths");
        assert_eq!(paths.resources_dir, temp.path().join("resources"));
        assert_eq!(paths.save_file, temp.path().join("save").join("save.json"));
        assert!(temp.path().join("save").is_dir());
    }
}
