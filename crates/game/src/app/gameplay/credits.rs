use crown_engine::app::rendering::draw;
use crown_engine::{EventQueue, InputSnapshot, MusicCue, Rect, Scene, SceneStatus};
use image::RgbaImage;
use tracing::info;

use super::game_data::GameData;
use super::painter::panel;
use super::scene_id::SceneId;
use super::transition::{Fade, TRANSITION_COLOR, TRANSITION_SPEED};

const SLIDE_MS: u64 = 4000;
const SLIDE_PANEL: Rect = Rect::new(150, 204, 500, 200);

const SLIDES: [&[&str]; 4] = [
    &["The Stolen Crown"],
    &["The crown is back where it belongs.", "The town sleeps soundly once more."],
    &["Maps drawn with Tiled.", "Music and sound under their authors' licenses."],
    &["Thank you for playing."],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    FadingIn,
    Showing { since: u64 },
    FadingOut,
}

/// Timed slides after the crown is delivered, then back to the main menu.
pub(crate) struct CreditsScene {
    status: SceneStatus<SceneId>,
    slide: usize,
    stage: Stage,
    fade: Fade,
}

impl CreditsScene {
    pub(crate) fn new() -> Self {
        Self {
            status: SceneStatus::default(),
            slide: 0,
            stage: Stage::FadingIn,
            fade: Fade::covered(),
        }
    }
}

impl Scene<SceneId, GameData> for CreditsScene {
    fn status(&self) -> &SceneStatus<SceneId> {
        &self.status
    }

    fn status_mut(&mut self) -> &mut SceneStatus<SceneId> {
        &mut self.status
    }

    fn startup(&mut self, _now_ms: u64, _payload: GameData) {
        self.slide = 0;
        self.stage = Stage::FadingIn;
        self.fade = Fade::covered();
        info!(slides = SLIDES.len(), "credits_started");
    }

    fn update(&mut self, frame: &mut RgbaImage, _input: &InputSnapshot, now_ms: u64, _events: &mut EventQueue) {
        match self.stage {
            Stage::FadingIn => {
                if self.fade.fade_in(TRANSITION_SPEED) {
                    for line in SLIDES[self.slide] {
                        info!(line, "credits_line");
                    }
                    self.stage = Stage::Showing { since: now_ms };
                }
            }
            Stage::Showing { since } => {
                if now_ms.saturating_sub(since) >= SLIDE_MS {
                    self.stage = Stage::FadingOut;
                }
            }
            Stage::FadingOut => {
                if self.fade.fade_out(TRANSITION_SPEED) {
                    if self.slide + 1 < SLIDES.len() {
                        self.slide += 1;
                        self.stage = Stage::FadingIn;
                    } else {
                        self.status.switch_to(SceneId::MainMenu);
                    }
                }
            }
        }
        draw::clear(frame, TRANSITION_COLOR);
        panel(frame, SLIDE_PANEL);
        self.fade.draw(frame);
    }

    /// The adventure is over; the main menu gets a fresh game.
    fn cleanup(&mut self) -> GameData {
        GameData::default()
    }

    fn music(&self) -> Option<MusicCue> {
        Some(MusicCue::new("kings_theme", 0.4))
    }
}
