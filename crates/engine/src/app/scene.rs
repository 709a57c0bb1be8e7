use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use image::RgbaImage;
use thiserror::Error;
use tracing::{debug, info};

use super::audio::{AudioSink, MusicCue};
use super::events::{EventQueue, GameEvent};
use super::input::{InputSnapshot, KeyEvent};

/// Bookkeeping every scene carries. The controller reads `done`, `quit`, and `next`, and
/// writes `previous` and `previous_music` before a scene starts up.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneStatus<K> {
    pub done: bool,
    pub quit: bool,
    pub next: Option<K>,
    pub previous: Option<K>,
    pub previous_music: Option<String>,
    pub start_time: u64,
}

impl<K> Default for SceneStatus<K> {
    fn default() -> Self {
        Self {
            done: false,
            quit: false,
            next: None,
            previous: None,
            previous_music: None,
            start_time: 0,
        }
    }
}

impl<K> SceneStatus<K> {
    /// Finish this scene; the controller switches to `next` on the following tick.
    pub fn switch_to(&mut self, next: K) {
        self.next = Some(next);
        self.done = true;
    }
}

pub trait Scene<K, P> {
    fn status(&self) -> &SceneStatus<K>;
    fn status_mut(&mut self) -> &mut SceneStatus<K>;
    fn startup(&mut self, now_ms: u64, payload: P);
    fn handle_key(&mut self, _event: KeyEvent) {}
    fn update(&mut self, frame: &mut RgbaImage, input: &InputSnapshot, now_ms: u64, events: &mut EventQueue);
    /// Gives up the persisted payload. The scene must not keep a copy.
    fn cleanup(&mut self) -> P;
    fn music(&self) -> Option<MusicCue> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Quit,
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene {name} is not registered")]
    UndefinedScene { name: String },
    #[error("scene {name} finished without naming a successor")]
    MissingSuccessor { name: String },
}

/// Runs exactly one scene at a time and hands the payload from each finished scene to
/// its successor.
pub struct SceneController<K, P> {
    scenes: HashMap<K, Box<dyn Scene<K, P>>>,
    active: K,
    events: EventQueue,
    audio: Box<dyn AudioSink>,
}

impl<K, P> SceneController<K, P>
where
    K: Copy + Eq + Hash + Debug,
{
    pub fn new(initial: K, audio: Box<dyn AudioSink>) -> Self {
        Self {
            scenes: HashMap::new(),
            active: initial,
            events: EventQueue::new(),
            audio,
        }
    }

    pub fn register(&mut self, key: K, scene: Box<dyn Scene<K, P>>) {
        self.scenes.insert(key, scene);
    }

    pub fn with_scene(mut self, key: K, scene: Box<dyn Scene<K, P>>) -> Self {
        self.register(key, scene);
        self
    }

    pub fn active(&self) -> K {
        self.active
    }

    pub fn active_status(&self) -> Option<&SceneStatus<K>> {
        self.scenes.get(&self.active).map(|scene| scene.status())
    }

    /// Starts the initial scene with the first payload.
    pub fn start(&mut self, now_ms: u64, payload: P) -> Result<(), SceneError> {
        let active = self.active;
        self.scene_mut(active)?.startup(now_ms, payload);
        info!(scene = ?active, "scene_started");
        self.set_music()
    }

    pub fn tick(
        &mut self,
        now_ms: u64,
        input: &InputSnapshot,
        frame: &mut RgbaImage,
    ) -> Result<TickOutcome, SceneError> {
        if input.quit_requested() {
            return Ok(TickOutcome::Quit);
        }
        let (quit, done) = {
            let status = self.scene_mut(self.active)?.status();
            (status.quit, status.done)
        };
        if quit {
            return Ok(TickOutcome::Quit);
        }
        if done {
            self.flip_state(now_ms)?;
        }

        let active = self.active;
        let scene = self
            .scenes
            .get_mut(&active)
            .ok_or_else(|| undefined(active))?;
        for event in input.key_events() {
            scene.handle_key(*event);
        }
        scene.update(frame, input, now_ms, &mut self.events);
        self.dispatch_events();
        Ok(TickOutcome::Continue)
    }

    fn flip_state(&mut self, now_ms: u64) -> Result<(), SceneError> {
        let previous = self.active;
        let current = self.scene_mut(previous)?;
        let next = current.status().next.ok_or_else(|| SceneError::MissingSuccessor {
            name: format!("{previous:?}"),
        })?;
        if !self.scenes.contains_key(&next) {
            return Err(undefined(next));
        }

        let current = self.scene_mut(previous)?;
        let previous_music = current.music().map(|cue| cue.title);
        let payload = current.cleanup();
        let status = current.status_mut();
        status.done = false;
        status.next = None;

        let successor = self.scene_mut(next)?;
        let status = successor.status_mut();
        status.previous = Some(previous);
        status.previous_music = previous_music;
        status.done = false;
        status.quit = false;
        status.start_time = now_ms;
        successor.startup(now_ms, payload);
        self.active = next;
        info!(from = ?previous, to = ?next, "scene_switched");
        self.set_music()
    }

    fn set_music(&mut self) -> Result<(), SceneError> {
        let active = self.active;
        let scene = self.scene_mut(active)?;
        let Some(cue) = scene.music() else {
            return Ok(());
        };
        if scene.status().previous_music.as_deref() == Some(cue.title.as_str()) {
            debug!(title = %cue.title, "music_unchanged");
            return Ok(());
        }
        self.audio.play_music(&cue);
        Ok(())
    }

    fn dispatch_events(&mut self) {
        for event in self.events.drain() {
            match event {
                GameEvent::PlaySound(key) => self.audio.play_sound(&key),
                GameEvent::PlayMusic(cue) => self.audio.play_music(&cue),
                GameEvent::StopMusic => self.audio.stop_music(),
            }
        }
    }

    fn scene_mut(&mut self, key: K) -> Result<&mut Box<dyn Scene<K, P>>, SceneError> {
        self.scenes.get_mut(&key).ok_or_else(|| undefined(key))
    }
}

fn undefined<K: Debug>(key: K) -> SceneError {
    SceneError::UndefinedScene {
        name: format!("{key:?}"),
    }
}
