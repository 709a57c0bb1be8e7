use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbaImage;
use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::StartupError;

use super::input::ActionStates;
use super::scene::{SceneController, SceneError, TickOutcome};
use super::{InputAction, InputSnapshot, KeyEvent, Renderer};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub logical_width: u32,
    pub logical_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "The Stolen Crown".to_string(),
            logical_width: 800,
            logical_height: 608,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window and drives `scenes` at a fixed tick rate until a scene quits, the
/// window closes, or a scene transition fails. The controller must already be started.
pub fn run_app<K, P>(config: LoopConfig, mut scenes: SceneController<K, P>) -> Result<(), AppError>
where
    K: Copy + Eq + Hash + Debug,
{
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.logical_width as f64,
                config.logical_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(
        Arc::clone(&window),
        config.logical_width,
        config.logical_height,
    )
    .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        width = config.logical_width,
        height = config.logical_height,
        "loop_config"
    );

    let started = Instant::now();
    let mut frame = RgbaImage::new(config.logical_width, config.logical_height);
    let mut input_collector = InputCollector::default();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut failure: Option<AppError> = None;

    let run_result = event_loop.run(|event, window_target| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => {
                input_collector.mark_quit_requested();
                info!(reason = "window_close", "shutdown_requested");
                window_target.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                    warn!(error = %error, "renderer_resize_failed");
                    window_target.exit();
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = window.inner_size();
                if let Err(error) = renderer.resize(size.width, size.height) {
                    warn!(error = %error, "renderer_resize_failed");
                    window_target.exit();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                input_collector.handle_physical_key(
                    event.physical_key,
                    event.state == ElementState::Pressed,
                    event.repeat,
                );
                if input_collector.quit_requested {
                    info!(reason = "escape_key", "shutdown_requested");
                    window_target.exit();
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                last_frame_instant = now;
                accumulator = accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

                let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                for _ in 0..step_plan.ticks_to_run {
                    let snapshot = input_collector.snapshot_for_tick();
                    let now_ms = started.elapsed().as_millis() as u64;
                    match scenes.tick(now_ms, &snapshot, &mut frame) {
                        Ok(TickOutcome::Continue) => {}
                        Ok(TickOutcome::Quit) => {
                            info!(reason = "scene_quit", scene = ?scenes.active(), "shutdown_requested");
                            window_target.exit();
                            break;
                        }
                        Err(scene_error) => {
                            error!(error = %scene_error, scene = ?scenes.active(), "scene_failed");
                            failure = Some(AppError::Scene(scene_error));
                            window_target.exit();
                            break;
                        }
                    }
                }
                accumulator = step_plan.remaining_accumulator;

                if step_plan.dropped_backlog > Duration::ZERO {
                    warn!(
                        dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                        max_ticks_per_frame, "sim_clamp_triggered"
                    );
                }

                if let Err(error) = renderer.present(&frame) {
                    warn!(error = %error, "renderer_draw_failed");
                    window_target.exit();
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            window.request_redraw();
        }
        Event::LoopExiting => {
            info!("shutdown");
        }
        _ => {}
    });
    run_result.map_err(AppError::EventLoopRun)?;

    match failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    pending_events: Vec<KeyEvent>,
}

impl InputCollector {
    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, is_pressed: bool, is_repeat: bool) {
        let Some(action) = action_for_key(key) else {
            return;
        };
        if action == InputAction::Quit && is_pressed {
            self.mark_quit_requested();
        }
        self.action_states.set(action, is_pressed);
        if !is_repeat {
            self.pending_events.push(KeyEvent {
                action,
                pressed: is_pressed,
            });
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            std::mem::take(&mut self.pending_events),
        )
    }
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    match code {
        KeyCode::ArrowUp | KeyCode::KeyW => Some(InputAction::Up),
        KeyCode::ArrowDown | KeyCode::KeyS => Some(InputAction::Down),
        KeyCode::ArrowLeft | KeyCode::KeyA => Some(InputAction::Left),
        KeyCode::ArrowRight | KeyCode::KeyD => Some(InputAction::Right),
        KeyCode::Space => Some(InputAction::Select),
        KeyCode::Enter | KeyCode::NumpadEnter => Some(InputAction::Confirm),
        KeyCode::Escape => Some(InputAction::Quit),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(mut accumulator: Duration, fixed_dt: Duration, max_ticks_per_frame: u32) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
