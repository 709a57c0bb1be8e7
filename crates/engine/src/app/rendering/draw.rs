use image::{Rgba, RgbaImage};

use crate::geometry::Rect;
use crate::tiled::{composite, transformed_tile, TileFlags};

pub fn clear(frame: &mut RgbaImage, color: Rgba<u8>) {
    for pixel in frame.pixels_mut() {
        *pixel = color;
    }
}

/// Opaque fill, clipped to the frame.
pub fn fill_rect(frame: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let Some(clipped) = clip(frame, rect) else {
        return;
    };
    for y in clipped.y..clipped.bottom() {
        for x in clipped.x..clipped.right() {
            frame.put_pixel(x as u32, y as u32, color);
        }
    }
}

pub fn outline_rect(frame: &mut RgbaImage, rect: Rect, color: Rgba<u8>, thickness: i32) {
    let t = thickness.max(1).min(rect.width.min(rect.height));
    fill_rect(frame, Rect::new(rect.x, rect.y, rect.width, t), color);
    fill_rect(frame, Rect::new(rect.x, rect.bottom() - t, rect.width, t), color);
    fill_rect(frame, Rect::new(rect.x, rect.y, t, rect.height), color);
    fill_rect(frame, Rect::new(rect.right() - t, rect.y, t, rect.height), color);
}

/// Bordered box used for dialogue, menus, and shop windows.
pub fn draw_panel(frame: &mut RgbaImage, rect: Rect, fill: Rgba<u8>, border: Rgba<u8>) {
    fill_rect(frame, rect, fill);
    outline_rect(frame, rect, border, 3);
}

pub fn blit(frame: &mut RgbaImage, image: &RgbaImage, x: i32, y: i32) {
    composite(frame, image, i64::from(x), i64::from(y), 1.0);
}

/// Draws the `source` region of `sheet` with its top-left at `(x, y)`.
pub fn blit_region(frame: &mut RgbaImage, sheet: &RgbaImage, source: Rect, x: i32, y: i32) {
    let region = transformed_tile(sheet, source, TileFlags::NONE);
    blit(frame, &region, x, y);
}

/// Draws the part of `background` under `viewport` at the frame origin.
pub fn blit_viewport(frame: &mut RgbaImage, background: &RgbaImage, viewport: Rect) {
    blit(frame, background, -viewport.x, -viewport.y);
}

/// Covers the whole frame with `color` at `alpha` (0 transparent, 255 solid).
pub fn fade(frame: &mut RgbaImage, color: Rgba<u8>, alpha: u8) {
    if alpha == 0 {
        return;
    }
    let (width, height) = frame.dimensions();
    let overlay = RgbaImage::from_pixel(width, height, Rgba([color.0[0], color.0[1], color.0[2], alpha]));
    composite(frame, &overlay, 0, 0, 1.0);
}

fn clip(frame: &RgbaImage, rect: Rect) -> Option<Rect> {
    let left = rect.x.max(0);
    let top = rect.y.max(0);
    let right = rect.right().min(frame.width() as i32);
    let bottom = rect.bottom().min(frame.height() as i32);
    (right > left && bottom > top).then(|| Rect::new(left, top, right - left, bottom - top))
}
