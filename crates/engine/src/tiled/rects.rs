use std::collections::BTreeSet;

use crate::geometry::Rect;

use super::document::TileLayer;
use super::gid::decode_gid;

/// Merges occupied grid cells into non-overlapping rectangles that cover exactly those
/// cells. Output is in grid units.
///
/// Anchors are taken in `(x + y, x, y)` order. Each rectangle grows right while cells
/// stay occupied, then down while the whole span of the next row is occupied. The result
/// is small but not guaranteed minimal.
pub fn merge_points<I>(points: I) -> Vec<Rect>
where
    I: IntoIterator<Item = (i32, i32)>,
{
    let mut remaining: BTreeSet<(i32, i32, i32)> = points
        .into_iter()
        .map(|(x, y)| (x + y, x, y))
        .collect();
    let occupied = |set: &BTreeSet<(i32, i32, i32)>, x: i32, y: i32| set.contains(&(x + y, x, y));

    let mut rects = Vec::new();
    while let Some(&(_, ox, oy)) = remaining.first() {
        let mut ex = ox;
        while occupied(&remaining, ex + 1, oy) {
            ex += 1;
        }

        let mut ey = oy;
        while (ox..=ex).all(|x| occupied(&remaining, x, ey + 1)) {
            ey += 1;
        }

        for y in oy..=ey {
            for x in ox..=ex {
                remaining.remove(&(x + y, x, y));
            }
        }
        rects.push(Rect::new(ox, oy, ex - ox + 1, ey - oy + 1));
    }
    rects
}

/// Rectangles, in pixels, covering every cell of `layer` whose gid equals `gid`, or every
/// non-empty cell when `gid` is `None`. Orientation flags are ignored for matching.
pub fn distribution_rects(
    layer: &TileLayer,
    gid: Option<u32>,
    tile_width: u32,
    tile_height: u32,
) -> Vec<Rect> {
    let points = layer
        .cells()
        .filter(|&(_, _, raw)| {
            let (cell_gid, _) = decode_gid(raw);
            match gid {
                Some(wanted) => cell_gid == wanted,
                None => cell_gid != 0,
            }
        })
        .map(|(x, y, _)| (x as i32, y as i32));

    merge_points(points)
        .into_iter()
        .map(|rect| rect.scaled(tile_width as i32, tile_height as i32))
        .collect()
}
