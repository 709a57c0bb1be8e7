use std::rc::Rc;

use crown_engine::{
    resolve_app_paths, AssetBundle, AssetError, LoopConfig, SaveFile, SceneController, SceneError, StartupError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, GameData, SceneId};

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Assets(#[from] AssetError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) controller: SceneController<SceneId, GameData>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== The Stolen Crown Startup ===");

    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), save = %paths.save_file.display(), "paths_resolved");
    let assets = Rc::new(AssetBundle::load(&paths.resources_dir)?);
    let save = SaveFile::new(paths.save_file);

    let mut controller = gameplay::build_controller(&assets, &save);
    controller.start(0, GameData::default())?;

    Ok(AppWiring {
        config: LoopConfig::default(),
        controller,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
