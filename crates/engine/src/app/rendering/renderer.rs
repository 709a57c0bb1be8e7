use std::sync::Arc;

use image::RgbaImage;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

/// Presents a fixed-size logical frame, scaled by `pixels` to whatever size the window has.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    buffer_width: u32,
    buffer_height: u32,
    warned_size_mismatch: bool,
}

impl Renderer {
    pub fn new(window: Arc<Window>, buffer_width: u32, buffer_height: u32) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(
            Arc::clone(&window),
            buffer_width,
            buffer_height,
            size.width,
            size.height,
        )?;
        Ok(Self {
            window,
            pixels,
            buffer_width,
            buffer_height,
            warned_size_mismatch: false,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(
            Arc::clone(&self.window),
            self.buffer_width,
            self.buffer_height,
            width,
            height,
        )?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        buffer_width: u32,
        buffer_height: u32,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_width.max(1), surface_height.max(1), window);
        Pixels::new(buffer_width, buffer_height, surface)
    }

    pub fn present(&mut self, frame: &RgbaImage) -> Result<(), Error> {
        if frame.dimensions() != (self.buffer_width, self.buffer_height) && !self.warned_size_mismatch {
            self.warned_size_mismatch = true;
            warn!(
                frame_width = frame.width(),
                frame_height = frame.height(),
                buffer_width = self.buffer_width,
                buffer_height = self.buffer_height,
                "frame_size_mismatch"
            );
        }
        copy_rows(
            frame,
            self.pixels.frame_mut(),
            self.buffer_width,
            self.buffer_height,
        );
        self.pixels.render()
    }
}

/// Copies the overlapping region of `frame` into an RGBA8 buffer of the given size.
fn copy_rows(frame: &RgbaImage, buffer: &mut [u8], buffer_width: u32, buffer_height: u32) {
    let copy_width = frame.width().min(buffer_width) as usize * 4;
    let rows = frame.height().min(buffer_height) as usize;
    let src_stride = frame.width() as usize * 4;
    let dst_stride = buffer_width as usize * 4;
    let src = frame.as_raw();
    for row in 0..rows {
        let src_start = row * src_stride;
        let dst_start = row * dst_stride;
        if dst_start + copy_width > buffer.len() {
            break;
        }
        buffer[dst_start..dst_start + copy_width]
            .copy_from_slice(&src[src_start..src_start + copy_width]);
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    #[test]
    fn copy_rows_clips_to_the_smaller_size() {
        let frame = RgbaImage::from_pixel(3, 3, Rgba([9, 8, 7, 255]));
        let mut buffer = vec![0u8; 2 * 4 * 4];
        copy_rows(&frame, &mut buffer, 2, 4);

        assert_eq!(&buffer[0..8], &[9, 8, 7, 255, 9, 8, 7, 255]);
        assert_eq!(&buffer[16..24], &[9, 8, 7, 255, 9, 8, 7, 255]);
        assert!(buffer[24..].iter().all(|byte| *byte == 0));
    }
}
