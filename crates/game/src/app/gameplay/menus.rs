use std::rc::Rc;

use crown_engine::app::rendering::draw;
use crown_engine::tiled::render_2x;
use crown_engine::{
    AssetBundle, EventQueue, InputAction, InputSnapshot, KeyEvent, MusicCue, Rect, SaveFile, Scene,
    SceneStatus,
};
use image::RgbaImage;
use tracing::{error, info, warn};

use super::game_data::GameData;
use super::level::{SCREEN_HEIGHT, SCREEN_WIDTH};
use super::painter::{Painter, BLACK};
use super::player_menu::{CLICK, CLICK2};
use super::scene_id::SceneId;
use super::transition::{Fade, TRANSITION_SPEED};

const TITLE_MAP: &str = "title";
const BOX_MARGIN: i32 = 30;
pub(crate) const ARROW_SPACING: i32 = 34;

/// Two-row yes/no pointer shared by the load screen and the death scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChoiceArrow {
    index: usize,
    x: i32,
    y: i32,
    spacing: i32,
}

impl ChoiceArrow {
    pub(crate) const fn new(x: i32, y: i32, spacing: i32) -> Self {
        Self { index: 0, x, y, spacing }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn handle(&mut self, action: InputAction, events: &mut EventQueue) {
        match action {
            InputAction::Down if self.index == 0 => {
                self.index = 1;
                events.play_sound(CLICK);
            }
            InputAction::Up if self.index == 1 => {
                self.index = 0;
                events.play_sound(CLICK);
            }
            _ => {}
        }
    }

    pub(crate) fn draw(&self, frame: &mut RgbaImage, painter: &mut Painter) {
        let y = self.y + self.index as i32 * self.spacing;
        painter.image(frame, "smallarrow", self.x, y);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TitlePage {
    MainMenu,
    Instructions,
    LoadGame,
}

impl TitlePage {
    fn box_key(self) -> &'static str {
        match self {
            TitlePage::MainMenu => "title_box",
            TitlePage::Instructions => "instructions_box",
            TitlePage::LoadGame => "loadgamebox",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    TransitionIn,
    Normal,
    TransitionOut,
}

/// The screens drawn over the title map: the main menu, the instructions page, and the
/// continue-or-restart prompt.
pub(crate) struct TitleScene {
    page: TitlePage,
    status: SceneStatus<SceneId>,
    painter: Painter,
    save: SaveFile,
    data: GameData,
    backdrop: Option<RgbaImage>,
    stage: Stage,
    fade: Fade,
    arrow: ChoiceArrow,
    pending: Vec<InputAction>,
    next: SceneId,
}

impl TitleScene {
    pub(crate) fn new(page: TitlePage, assets: Rc<AssetBundle>, save: SaveFile) -> Self {
        Self {
            page,
            status: SceneStatus::default(),
            painter: Painter::new(assets),
            save,
            data: GameData::default(),
            backdrop: None,
            stage: Stage::TransitionIn,
            fade: Fade::covered(),
            arrow: ChoiceArrow::new(200, 260, 2 * ARROW_SPACING),
            pending: Vec::new(),
            next: SceneId::Instructions,
        }
    }

    fn load_backdrop(&self) -> Option<RgbaImage> {
        match self.painter.assets().load_map(TITLE_MAP) {
            Ok(doc) => Some(render_2x(&doc)),
            Err(err) => {
                warn!(error = %err, "title_map_unavailable");
                None
            }
        }
    }

    fn handle(&mut self, action: InputAction, events: &mut EventQueue) {
        match self.page {
            TitlePage::MainMenu | TitlePage::Instructions => self.stage = Stage::TransitionOut,
            TitlePage::LoadGame => match action {
                InputAction::Up | InputAction::Down => self.arrow.handle(action, events),
                InputAction::Select => {
                    events.play_sound(CLICK2);
                    self.next = if self.arrow.index() == 0 {
                        self.continue_saved_game()
                    } else {
                        SceneId::Overworld
                    };
                    self.stage = Stage::TransitionOut;
                }
                _ => {}
            },
        }
    }

    fn continue_saved_game(&mut self) -> SceneId {
        match GameData::load(&self.save) {
            Ok(data) => {
                info!(path = %self.save.path().display(), "save_loaded");
                self.data = data;
                SceneId::Town
            }
            Err(err) => {
                error!(error = %err, "save_load_failed");
                self.data = GameData::default();
                SceneId::Overworld
            }
        }
    }

    fn draw(&mut self, frame: &mut RgbaImage) {
        draw::clear(frame, BLACK);
        if let Some(backdrop) = &self.backdrop {
            let viewport = Rect::new(
                backdrop.width() as i32 - SCREEN_WIDTH,
                backdrop.height() as i32 - SCREEN_HEIGHT,
                SCREEN_WIDTH,
                SCREEN_HEIGHT,
            );
            draw::blit_viewport(frame, backdrop, viewport);
        }
        let key = self.page.box_key();
        if let Some((width, height)) = self.painter.image_size(key) {
            let x = (SCREEN_WIDTH - width as i32) / 2;
            let y = SCREEN_HEIGHT - height as i32 - BOX_MARGIN;
            self.painter.image(frame, key, x, y);
        }
        if self.page == TitlePage::LoadGame {
            self.arrow.draw(frame, &mut self.painter);
        }
        self.fade.draw(frame);
    }
}

impl Scene<SceneId, GameData> for TitleScene {
    fn status(&self) -> &SceneStatus<SceneId> {
        &self.status
    }

    fn status_mut(&mut self) -> &mut SceneStatus<SceneId> {
        &mut self.status
    }

    fn startup(&mut self, _now_ms: u64, payload: GameData) {
        self.stage = Stage::TransitionIn;
        self.fade = Fade::covered();
        self.arrow = ChoiceArrow::new(200, 260, 2 * ARROW_SPACING);
        self.pending.clear();
        self.backdrop = self.load_backdrop();
        match self.page {
            TitlePage::MainMenu => {
                self.data = payload;
                self.next = SceneId::Instructions;
            }
            TitlePage::Instructions | TitlePage::LoadGame => {
                self.data = GameData::default();
                self.next = if self.save.exists() {
                    SceneId::LoadGame
                } else {
                    SceneId::Overworld
                };
            }
        }
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
                    self.stage = Stage::Normal;
                }
            }
            Stage::Normal => {
                for action in std::mem::take(&mut self.pending) {
                    self.handle(action, events);
                    if self.stage != Stage::Normal {
                        break;
                    }
                }
            }
            Stage::TransitionOut => {
                self.pending.clear();
                if self.fade.fade_out(TRANSITION_SPEED) {
                    self.status.switch_to(self.next);
                }
            }
        }
        self.draw(frame);
    }

    fn cleanup(&mut self) -> GameData {
        self.backdrop = None;
        std::mem::take(&mut self.data)
    }

    fn music(&self) -> Option<MusicCue> {
        (self.page == TitlePage::MainMenu).then(|| MusicCue::new("kings_theme", 0.4))
    }
}
