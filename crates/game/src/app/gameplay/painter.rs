use std::collections::HashSet;
use std::rc::Rc;

use crown_engine::app::rendering::draw;
use crown_engine::{AssetBundle, Rect};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::warn;

pub(crate) const PANEL_FILL: Rgba<u8> = Rgba([8, 8, 24, 255]);
pub(crate) const PANEL_BORDER: Rgba<u8> = Rgba([240, 240, 240, 255]);
pub(crate) const HIGHLIGHT: Rgba<u8> = Rgba([250, 210, 60, 255]);
pub(crate) const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Draws sprite sheet regions out of the shared bundle. A missing sheet is skipped and
/// warned about once.
#[derive(Debug)]
pub(crate) struct Painter {
    assets: Rc<AssetBundle>,
    warned: HashSet<String>,
}

impl Painter {
    pub(crate) fn new(assets: Rc<AssetBundle>) -> Self {
        Self {
            assets,
            warned: HashSet::new(),
        }
    }

    pub(crate) fn assets(&self) -> &Rc<AssetBundle> {
        &self.assets
    }

    fn sheet(&mut self, key: &str) -> Option<&RgbaImage> {
        if self.assets.graphic(key).is_none() {
            if self.warned.insert(key.to_string()) {
                warn!(key, "sprite_sheet_missing");
            }
            return None;
        }
        self.assets.graphic(key)
    }

    pub(crate) fn region(&mut self, frame: &mut RgbaImage, key: &str, source: Rect, x: i32, y: i32) {
        if let Some(sheet) = self.sheet(key) {
            draw::blit_region(frame, sheet, source, x, y);
        }
    }

    pub(crate) fn image(&mut self, frame: &mut RgbaImage, key: &str, x: i32, y: i32) {
        if let Some(sheet) = self.sheet(key) {
            draw::blit(frame, sheet, x, y);
        }
    }

    /// Nearest-neighbour upscale of a sheet region, for portraits in shops and battles.
    pub(crate) fn region_scaled(
        &mut self,
        frame: &mut RgbaImage,
        key: &str,
        source: Rect,
        x: i32,
        y: i32,
        scale: u32,
    ) {
        let Some(sheet) = self.sheet(key) else {
            return;
        };
        let region = imageops::crop_imm(
            sheet,
            source.x.max(0) as u32,
            source.y.max(0) as u32,
            source.width.max(0) as u32,
            source.height.max(0) as u32,
        )
        .to_image();
        let scaled = imageops::resize(
            &region,
            region.width() * scale,
            region.height() * scale,
            FilterType::Nearest,
        );
        draw::blit(frame, &scaled, x, y);
    }

    pub(crate) fn image_size(&self, key: &str) -> Option<(u32, u32)> {
        self.assets.graphic(key).map(RgbaImage::dimensions)
    }
}

/// A text window. Lines are logged rather than typeset.
pub(crate) fn panel(frame: &mut RgbaImage, rect: Rect) {
    draw::draw_panel(frame, rect, PANEL_FILL, PANEL_BORDER);
}

/// Marks the selected row of a menu panel.
pub(crate) fn selection_marker(frame: &mut RgbaImage, panel: Rect, row: usize, row_height: i32) {
    let y = panel.y + 20 + row as i32 * row_height;
    draw::fill_rect(frame, Rect::new(panel.x + 14, y + 4, 10, 10), HIGHLIGHT);
}
