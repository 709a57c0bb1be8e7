use crown_engine::app::rendering::draw;
use image::{Rgba, RgbaImage};

pub(crate) const TRANSITION_SPEED: i32 = 35;
pub(crate) const SLOW_TRANSITION_SPEED: i32 = 2;
pub(crate) const TRANSITION_COLOR: Rgba<u8> = Rgba([19, 15, 48, 255]);

/// Full-screen fade between scenes. Alpha 255 is fully covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fade {
    alpha: i32,
}

impl Default for Fade {
    fn default() -> Self {
        Self::covered()
    }
}

impl Fade {
    pub(crate) const fn covered() -> Self {
        Self { alpha: 255 }
    }

    pub(crate) fn alpha(&self) -> u8 {
        self.alpha.clamp(0, 255) as u8
    }

    /// Returns true once the screen is fully visible.
    pub(crate) fn fade_in(&mut self, speed: i32) -> bool {
        self.alpha = (self.alpha - speed).max(0);
        self.alpha == 0
    }

    /// Returns true once the screen is fully covered.
    pub(crate) fn fade_out(&mut self, speed: i32) -> bool {
        self.alpha = (self.alpha + speed).min(255);
        self.alpha == 255
    }

    pub(crate) fn draw(&self, frame: &mut RgbaImage) {
        draw::fade(frame, TRANSITION_COLOR, self.alpha());
    }
}
