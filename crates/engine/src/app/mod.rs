mod audio;
mod events;
mod input;
mod loop_runner;
pub mod rendering;
mod scene;

pub use audio::{AudioSink, LoggingAudio, MusicCue};
pub use events::{EventQueue, GameEvent};
pub use input::{InputAction, InputSnapshot, KeyEvent};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use rendering::Renderer;
pub use scene::{Scene, SceneController, SceneError, SceneStatus, TickOutcome};
