use std::process::ExitCode;

use crown_engine::run_app;
use tracing::error;

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_app(app.config, app.controller) {
        error!(error = %err, "game_loop_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
