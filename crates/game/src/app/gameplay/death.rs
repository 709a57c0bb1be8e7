use std::rc::Rc;

use crown_engine::app::rendering::draw;
use crown_engine::{
    AssetBundle, EventQueue, InputAction, InputSnapshot, KeyEvent, MusicCue, Rect, SaveFile, Scene, SceneStatus,
};
use image::RgbaImage;
use tracing::{debug, error, info};

use super::game_data::GameData;
use super::level::{SCREEN_HEIGHT, SCREEN_WIDTH};
use super::menus::{ChoiceArrow, ARROW_SPACING};
use super::painter::{panel, Painter};
use super::player_menu::CLICK2;
use super::scene_id::SceneId;
use super::transition::{Fade, TRANSITION_COLOR, TRANSITION_SPEED};

const PROMPT: &str = "You have died. Restart from last save point?";
const MESSAGE_BOX: Rect = Rect::new(100, 448, 600, 160);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    TransitionIn,
    Choosing,
    TransitionOut,
}

pub(crate) struct DeathScene {
    status: SceneStatus<SceneId>,
    painter: Painter,
    save: SaveFile,
    data: GameData,
    stage: Stage,
    fade: Fade,
    arrow: ChoiceArrow,
    pending: Vec<InputAction>,
    next: SceneId,
}

impl DeathScene {
    pub(crate) fn new(assets: Rc<AssetBundle>, save: SaveFile) -> Self {
        Self {
            status: SceneStatus::default(),
            painter: Painter::new(assets),
            save,
            data: GameData::default(),
            stage: Stage::TransitionIn,
            fade: Fade::covered(),
            arrow: ChoiceArrow::new(300, 532, ARROW_SPACING),
            pending: Vec::new(),
            next: SceneId::Town,
        }
    }

    fn choose(&mut self, events: &mut EventQueue) {
        events.play_sound(CLICK2);
        if self.arrow.index() == 0 {
            match GameData::load(&self.save) {
                Ok(data) => {
                    info!("restarting_from_save");
                    self.data = data;
                    self.next = SceneId::Town;
                }
                Err(err) => {
                    error!(error = %err, "save_load_failed");
                    self.next = SceneId::MainMenu;
                }
            }
        } else {
            self.next = SceneId::MainMenu;
        }
        self.stage = Stage::TransitionOut;
    }
}

impl Scene<SceneId, GameData> for DeathScene {
    fn status(&self) -> &SceneStatus<SceneId> {
        &self.status
    }

    fn status_mut(&mut self) -> &mut SceneStatus<SceneId> {
        &mut self.status
    }

    fn startup(&mut self, _now_ms: u64, payload: GameData) {
        self.data = payload;
        self.stage = Stage::TransitionIn;
        self.fade = Fade::covered();
        self.arrow = ChoiceArrow::new(300, 532, ARROW_SPACING);
        self.pending.clear();
        if !self.save.exists() {
            match GameData::default().store(&self.save) {
                Ok(()) => info!(path = %self.save.path().display(), "default_save_written"),
                Err(err) => error!(error = %err, "default_save_failed"),
            }
        }
        debug!(prompt = PROMPT, "death_prompt");
    }

    fn handle_key(&mut self, event: KeyEvent) {
        if event.pressed {
            self.pending.push(event.action);
        }
    }

    fn update(&mut self, frame: &mut RgbaImage, _input: &InputSnapshot, _now_ms: u64, events: &mut EventQueue) {
        match self.stage {
            Stage::TransitionIn => {
                self.pending.clear();
                if self.fade.fade_in(TRANSITION_SPEED) {
                    self.stage = Stage::Choosing;
                }
            }
            Stage::Choosing => {
                for action in std::mem::take(&mut self.pending) {
                    if action == InputAction::Select {
                        self.choose(events);
                        break;
                    }
                    self.arrow.handle(action, events);
                }
            }
            Stage::TransitionOut => {
                self.pending.clear();
                if self.fade.fade_out(TRANSITION_SPEED) {
                    self.status.switch_to(self.next);
                }
            }
        }

        draw::clear(frame, TRANSITION_COLOR);
        self.painter.region_scaled(
            frame,
            "player",
            Rect::new(96, 0, 32, 32),
            SCREEN_WIDTH / 2 - 32,
            SCREEN_HEIGHT / 2 - 32,
            2,
        );
        panel(frame, MESSAGE_BOX);
        self.arrow.draw(frame, &mut self.painter);
        self.fade.draw(frame);
    }

    fn cleanup(&mut self) -> GameData {
        std::mem::take(&mut self.data)
    }

    fn music(&self) -> Option<MusicCue> {
        Some(MusicCue::new("shop_theme", 0.5))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn tick(scene: &mut DeathScene, count: usize) {
        let mut frame = RgbaImage::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32);
        let mut events = EventQueue::new();
        for _ in 0..count {
            scene.update(&mut frame, &InputSnapshot::empty(), 0, &mut events);
        }
    }

    #[test]
    fn dying_without_a_save_writes_a_fresh_one() {
        let temp = TempDir::new().expect("temp");
        let save = SaveFile::new(temp.path().join("save.json"));
        let mut scene = DeathScene::new(Rc::new(AssetBundle::empty()), save.clone());
        scene.startup(0, GameData::default());
        assert!(save.exists());
        assert_eq!(GameData::load(&save).expect("load"), GameData::default());
    }

    #[test]
    fn yes_restarts_in_town_from_the_save() {
        let temp = TempDir::new().expect("temp");
        let save = SaveFile::new(temp.path().join("save.json"));
        let mut saved = GameData::default();
        saved.elixir_received = true;
        saved.store(&save).expect("store");

        let mut scene = DeathScene::new(Rc::new(AssetBundle::empty()), save);
        let mut dead = GameData::default();
        dead.player_stats.health.current = 0;
        scene.startup(0, dead);
        tick(&mut scene, 8);
        scene.handle_key(KeyEvent::pressed(InputAction::Select));
        tick(&mut scene, 9);

        assert_eq!(scene.status().next, Some(SceneId::Town));
        let data = scene.cleanup();
        assert!(data.elixir_received);
        assert_eq!(data.player_stats.health.current, 70);
    }

    #[test]
    fn no_returns_to_the_main_menu() {
        let temp = TempDir::new().expect("temp");
        let save = SaveFile::new(temp.path().join("save.json"));
        let mut scene = DeathScene::new(Rc::new(AssetBundle::empty()), save);
        scene.startup(0, GameData::default());
        tick(&mut scene, 8);
        scene.handle_key(KeyEvent::pressed(InputAction::Down));
        scene.handle_key(KeyEvent::pressed(InputAction::Select));
        tick(&mut scene, 9);
        assert_eq!(scene.status().next, Some(SceneId::MainMenu));
        assert_eq!(scene.music().map(|cue| cue.title), Some("shop_theme".to_string()));
    }
}
