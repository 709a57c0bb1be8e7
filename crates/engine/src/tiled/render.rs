use std::collections::BTreeSet;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::warn;

use super::document::{ImageLayer, Layer, MapDocument, TileLayer};
use super::gid::{decode_gid, TileFlags};
use super::tileset::TileSetRegistry;

/// Cells the renderer could not draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub skipped_cells: usize,
    pub unknown_gids: BTreeSet<u32>,
}

pub fn render(doc: &MapDocument) -> RgbaImage {
    render_with_report(doc).0
}

/// The map at twice its pixel size, nearest-neighbor.
pub fn render_2x(doc: &MapDocument) -> RgbaImage {
    let base = render(doc);
    let (width, height) = base.dimensions();
    imageops::resize(&base, width * 2, height * 2, FilterType::Nearest)
}

pub fn render_with_report(doc: &MapDocument) -> (RgbaImage, RenderReport) {
    let (width, height) = doc.pixel_size();
    let mut canvas = match doc.background_color() {
        Some(color) => RgbaImage::from_pixel(width, height, color),
        None => RgbaImage::new(width, height),
    };
    let mut report = RenderReport::default();

    for layer in doc.visible_layers() {
        match layer {
            Layer::Tile(tiles) => draw_tile_layer(&mut canvas, doc, tiles, &mut report),
            Layer::Image(picture) => draw_image_layer(&mut canvas, doc.tilesets(), picture, &mut report),
            Layer::Object(_) => {}
        }
    }

    for gid in &report.unknown_gids {
        warn!(gid, "tile_gid_unresolved");
    }
    (canvas, report)
}

fn draw_tile_layer(canvas: &mut RgbaImage, doc: &MapDocument, layer: &TileLayer, report: &mut RenderReport) {
    let (tile_width, tile_height) = doc.tile_size();
    let opacity = layer.info.opacity;
    for (x, y, raw) in layer.cells() {
        let (gid, flags) = decode_gid(raw);
        if gid == 0 {
            continue;
        }
        let resolved = match doc.tilesets().resolve(gid) {
            Ok(resolved) => resolved,
            Err(_) => {
                report.skipped_cells += 1;
                report.unknown_gids.insert(gid);
                continue;
            }
        };
        let tile = transformed_tile(resolved.tileset.image(), resolved.source, flags);
        let dest_x = i64::from(x) * i64::from(tile_width);
        let dest_y = i64::from(y) * i64::from(tile_height);
        composite(canvas, &tile, dest_x, dest_y, opacity);
    }
}

fn draw_image_layer(
    canvas: &mut RgbaImage,
    tilesets: &TileSetRegistry,
    layer: &ImageLayer,
    report: &mut RenderReport,
) {
    if layer.gid == 0 {
        return;
    }
    match tilesets.resolve(layer.gid) {
        Ok(resolved) => {
            let picture = transformed_tile(resolved.tileset.image(), resolved.source, TileFlags::NONE);
            composite(canvas, &picture, 0, 0, layer.info.opacity);
        }
        Err(_) => {
            report.skipped_cells += 1;
            report.unknown_gids.insert(layer.gid);
        }
    }
}

/// Cuts `source` out of `sheet` and applies the orientation flags: the diagonal flip
/// first, then horizontal, then vertical.
pub fn transformed_tile(sheet: &RgbaImage, source: crate::geometry::Rect, flags: TileFlags) -> RgbaImage {
    let mut tile = imageops::crop_imm(
        sheet,
        source.x.max(0) as u32,
        source.y.max(0) as u32,
        source.width.max(0) as u32,
        source.height.max(0) as u32,
    )
    .to_image();
    if flags.rotate {
        tile = transpose(&tile);
    }
    if flags.flip_x {
        imageops::flip_horizontal_in_place(&mut tile);
    }
    if flags.flip_y {
        imageops::flip_vertical_in_place(&mut tile);
    }
    tile
}

fn transpose(image: &RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    RgbaImage::from_fn(height, width, |x, y| *image.get_pixel(y, x))
}

/// Source-over blend of `src` onto `dest` at `(x, y)`, scaled by `opacity`. Pixels off the
/// canvas are clipped.
pub fn composite(dest: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }
    let (dest_width, dest_height) = dest.dimensions();
    for (sx, sy, pixel) in src.enumerate_pixels() {
        let dx = x + i64::from(sx);
        let dy = y + i64::from(sy);
        if dx < 0 || dy < 0 || dx >= i64::from(dest_width) || dy >= i64::from(dest_height) {
            continue;
        }
        let under = dest.get_pixel_mut(dx as u32, dy as u32);
        *under = blend(*under, *pixel, opacity);
    }
}

fn blend(under: Rgba<u8>, over: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let alpha = f32::from(over.0[3]) / 255.0 * opacity;
    if alpha <= 0.0 {
        return under;
    }
    if alpha >= 1.0 {
        return over;
    }
    let under_alpha = f32::from(under.0[3]) / 255.0;
    let out_alpha = alpha + under_alpha * (1.0 - alpha);
    let channel = |index: usize| {
        let top = f32::from(over.0[index]) * alpha;
        let bottom = f32::from(under.0[index]) * under_alpha * (1.0 - alpha);
        ((top + bottom) / out_alpha).round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::tiled::document::{LayerInfo, MapObject, ObjectLayer};
    use crate::tiled::gid::{encode_gid, GID_FLIP_X};
    use crate::tiled::tileset::TileSet;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn red_blue_sheet() -> RgbaImage {
        RgbaImage::from_fn(32, 16, |x, _| if x < 16 { RED } else { BLUE })
    }

    fn two_by_two(cells: Vec<u32>) -> MapDocument {
        let registry =
            TileSetRegistry::new(vec![TileSet::new("rb", 1, 16, 16, red_blue_sheet()).expect("rb")])
                .expect("registry");
        let mut doc = MapDocument::new(2, 2, 16, 16, registry);
        doc.push_layer(Layer::Tile(
            TileLayer::new(LayerInfo::named("ground"), 2, 2, cells).expect("layer"),
        ))
        .expect("push");
        doc
    }

    #[test]
    fn two_by_two_map_renders_quadrants_then_doubles() {
        let doc = two_by_two(vec![1, 2, 2, 1]);

        let image = render(&doc);
        assert_eq!(image.dimensions(), (32, 32));
        assert_eq!(*image.get_pixel(0, 0), RED);
        assert_eq!(*image.get_pixel(31, 0), BLUE);
        assert_eq!(*image.get_pixel(0, 31), BLUE);
        assert_eq!(*image.get_pixel(31, 31), RED);

        let doubled = render_2x(&doc);
        assert_eq!(doubled.dimensions(), (64, 64));
        assert_eq!(*doubled.get_pixel(31, 31), RED);
        assert_eq!(*doubled.get_pixel(32, 0), BLUE);
        assert_eq!(*doubled.get_pixel(63, 63), RED);
    }

    #[test]
    fn end_to_end_grid_leaves_the_empty_cell_undrawn() {
        let sheet = RgbaImage::from_fn(64, 16, |x, _| match x / 16 {
            0 => RED,
            1 => BLUE,
            2 => Rgba([0, 255, 0, 255]),
            _ => Rgba([255, 255, 0, 255]),
        });
        let registry =
            TileSetRegistry::new(vec![TileSet::new("four", 1, 16, 16, sheet).expect("four")])
                .expect("registry");
        let owned: Vec<u32> = (0..8).filter(|gid| registry.resolve(*gid).is_ok()).collect();
        assert_eq!(owned, vec![1, 2, 3, 4]);
        let mut doc = MapDocument::new(2, 2, 16, 16, registry);
        doc.push_layer(Layer::Tile(
            TileLayer::new(LayerInfo::named("ground"), 2, 2, vec![1, 2, 0, 3]).expect("layer"),
        ))
        .expect("push");

        let image = render(&doc);
        assert_eq!(*image.get_pixel(0, 0), RED);
        assert_eq!(*image.get_pixel(16, 0), BLUE);
        assert_eq!(image.get_pixel(0, 16).0[3], 0);
        assert_eq!(image.get_pixel(15, 31).0[3], 0);
        assert_eq!(*image.get_pixel(16, 16), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn tiles_of_another_size_anchor_at_their_cell_origin() {
        let tall_sheet = RgbaImage::from_fn(16, 32, |_, y| if y < 16 { RED } else { BLUE });
        let short_sheet = RgbaImage::from_pixel(16, 8, RED);
        let registry = TileSetRegistry::new(vec![
            TileSet::new("tall", 1, 16, 32, tall_sheet).expect("tall"),
            TileSet::new("short", 2, 16, 8, short_sheet).expect("short"),
        ])
        .expect("registry");

        let mut doc = MapDocument::new(2, 2, 16, 16, registry);
        doc.push_layer(Layer::Tile(
            TileLayer::new(LayerInfo::named("ground"), 2, 2, vec![1, 2, 0, 0]).expect("layer"),
        ))
        .expect("push");

        let image = render(&doc);
        assert_eq!(*image.get_pixel(0, 0), RED);
        assert_eq!(*image.get_pixel(0, 15), RED);
        assert_eq!(*image.get_pixel(0, 16), BLUE);
        assert_eq!(*image.get_pixel(16, 0), RED);
        assert_eq!(*image.get_pixel(16, 7), RED);
        assert_eq!(image.get_pixel(16, 8).0[3], 0);
    }

    #[test]
    fn empty_cells_leave_background() {
        let doc = two_by_two(vec![0, 0, 0, 1]).with_background_color(Some(Rgba([1, 2, 3, 255])));
        let image = render(&doc);
        assert_eq!(*image.get_pixel(0, 0), Rgba([1, 2, 3, 255]));
        assert_eq!(*image.get_pixel(20, 20), RED);
    }

    #[test]
    fn unknown_gids_are_skipped_and_reported() {
        let doc = two_by_two(vec![1, 40, 40, 41]);
        let (image, report) = render_with_report(&doc);
        assert_eq!(report.skipped_cells, 3);
        assert_eq!(report.unknown_gids.into_iter().collect::<Vec<_>>(), vec![40, 41]);
        assert_eq!(*image.get_pixel(0, 0), RED);
        assert_eq!(image.get_pixel(20, 0).0[3], 0);
    }

    #[test]
    fn flags_transform_tile_pixels() {
        let sheet = RgbaImage::from_fn(2, 2, |x, y| Rgba([x as u8 * 100, y as u8 * 100, 0, 255]));
        let source = Rect::new(0, 0, 2, 2);

        let flipped_x = transformed_tile(&sheet, source, TileFlags { flip_x: true, ..TileFlags::NONE });
        assert_eq!(flipped_x.get_pixel(0, 0).0[..2], [100, 0]);

        let flipped_y = transformed_tile(&sheet, source, TileFlags { flip_y: true, ..TileFlags::NONE });
        assert_eq!(flipped_y.get_pixel(0, 0).0[..2], [0, 100]);

        let rotated = transformed_tile(&sheet, Rect::new(0, 0, 2, 1), TileFlags { rotate: true, ..TileFlags::NONE });
        assert_eq!(rotated.dimensions(), (1, 2));
        assert_eq!(rotated.get_pixel(0, 1).0[..2], [100, 0]);
    }

    #[test]
    fn flipped_cell_renders_mirrored() {
        let sheet = RgbaImage::from_fn(16, 16, |x, _| if x == 0 { RED } else { BLUE });
        let registry =
            TileSetRegistry::new(vec![TileSet::new("edge", 1, 16, 16, sheet).expect("edge")])
                .expect("registry");
        let mut doc = MapDocument::new(1, 1, 16, 16, registry);
        let cell = encode_gid(1, TileFlags { flip_x: true, ..TileFlags::NONE });
        assert_eq!(cell & GID_FLIP_X, GID_FLIP_X);
        doc.push_layer(Layer::Tile(
            TileLayer::new(LayerInfo::named("g"), 1, 1, vec![cell]).expect("layer"),
        ))
        .expect("push");

        let image = render(&doc);
        assert_eq!(*image.get_pixel(15, 0), RED);
        assert_eq!(*image.get_pixel(0, 0), BLUE);
    }

    #[test]
    fn hidden_layers_and_object_layers_draw_nothing() {
        let mut doc = MapDocument::new(2, 2, 16, 16, TileSetRegistry::default());
        let mut info = LayerInfo::named("hidden");
        info.visible = false;
        doc.push_layer(Layer::Tile(TileLayer::new(info, 2, 2, vec![1; 4]).expect("layer")))
            .expect("push");
        doc.push_layer(Layer::Object(ObjectLayer {
            info: LayerInfo::named("objects"),
            objects: vec![MapObject::new("blocker", "", 0, 0)],
        }))
        .expect("push");

        let (image, report) = render_with_report(&doc);
        assert!(image.pixels().all(|pixel| pixel.0[3] == 0));
        assert_eq!(report, RenderReport::default());
    }

    #[test]
    fn image_layer_draws_at_origin_with_opacity() {
        let mut registry = TileSetRegistry::default();
        let gid = registry.next_free_gid();
        registry
            .push(TileSet::single_image("sky", gid, RgbaImage::from_pixel(4, 4, RED)).expect("sky"))
            .expect("push");
        let mut doc = MapDocument::new(2, 2, 4, 4, registry)
            .with_background_color(Some(Rgba([0, 0, 0, 255])));
        let mut info = LayerInfo::named("sky");
        info.opacity = 0.5;
        doc.push_layer(Layer::Image(ImageLayer { info, gid })).expect("push");

        let image = render(&doc);
        let blended = image.get_pixel(0, 0).0;
        assert!((120..=135).contains(&blended[0]), "{blended:?}");
        assert_eq!(blended[3], 255);
        assert_eq!(*image.get_pixel(4, 4), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn translucent_pixels_keep_what_is_underneath() {
        let mut canvas = RgbaImage::from_pixel(1, 1, BLUE);
        composite(&mut canvas, &RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 0])), 0, 0, 1.0);
        assert_eq!(*canvas.get_pixel(0, 0), BLUE);
        composite(&mut canvas, &RgbaImage::from_pixel(2, 2, RED), -1, -1, 1.0);
        assert_eq!(*canvas.get_pixel(0, 0), RED);
    }
}
