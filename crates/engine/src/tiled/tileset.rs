use image::RgbaImage;
use thiserror::Error;

use crate::geometry::Rect;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileSetError {
    #[error("gid {gid} is not owned by any tileset")]
    UnknownTileId { gid: u32 },
    #[error(
        "tileset '{second}' range [{second_first}, {second_end}) overlaps '{first}' range [{first_first}, {first_end})"
    )]
    OverlappingRange {
        first: String,
        first_first: u32,
        first_end: u32,
        second: String,
        second_first: u32,
        second_end: u32,
    },
    #[error("tileset '{name}' owns no tile ids (first gid {first_gid})")]
    EmptyRange { name: String, first_gid: u32 },
    #[error("tileset '{name}' has a zero tile dimension")]
    ZeroTileSize { name: String },
    #[error("tileset '{name}' slices tiles past the addressable pixel range")]
    ExtentOverflow { name: String },
}

/// One tile image sheet plus the slicing metadata for it.
#[derive(Debug, Clone)]
pub struct TileSet {
    name: String,
    first_gid: u32,
    tile_width: u32,
    tile_height: u32,
    spacing: u32,
    margin: u32,
    columns: u32,
    tile_count: u32,
    image: RgbaImage,
}

impl TileSet {
    /// Slices `image` into a grid of `tile_width` x `tile_height` tiles. `tile_count`
    /// defaults to every full tile the sheet holds.
    pub fn new(
        name: impl Into<String>,
        first_gid: u32,
        tile_width: u32,
        tile_height: u32,
        image: RgbaImage,
    ) -> Result<Self, TileSetError> {
        Self::with_layout(name, first_gid, tile_width, tile_height, 0, 0, None, image)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_layout(
        name: impl Into<String>,
        first_gid: u32,
        tile_width: u32,
        tile_height: u32,
        spacing: u32,
        margin: u32,
        tile_count: Option<u32>,
        image: RgbaImage,
    ) -> Result<Self, TileSetError> {
        let name = name.into();
        if tile_width == 0 || tile_height == 0 {
            return Err(TileSetError::ZeroTileSize { name });
        }
        let columns = fitting_tiles(image.width(), tile_width, spacing, margin);
        let rows = fitting_tiles(image.height(), tile_height, spacing, margin);
        let tile_count = tile_count.unwrap_or(columns.saturating_mul(rows));
        let tileset = Self {
            name,
            first_gid,
            tile_width,
            tile_height,
            spacing,
            margin,
            columns,
            tile_count,
            image,
        };
        if tile_count > 0 {
            let widest = tile_count.min(tileset.columns.max(1)) - 1;
            let last = tile_count - 1;
            if tileset.checked_source_rect(widest).is_none() || tileset.checked_source_rect(last).is_none() {
                return Err(TileSetError::ExtentOverflow { name: tileset.name });
            }
        }
        Ok(tileset)
    }

    /// A tileset holding one tile the size of the whole image.
    pub fn single_image(
        name: impl Into<String>,
        first_gid: u32,
        image: RgbaImage,
    ) -> Result<Self, TileSetError> {
        let (width, height) = image.dimensions();
        Self::with_layout(name, first_gid, width, height, 0, 0, Some(1), image)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn first_gid(&self) -> u32 {
        self.first_gid
    }

    /// One past the last owned gid.
    pub fn end_gid(&self) -> u32 {
        self.first_gid.saturating_add(self.tile_count)
    }

    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn owns(&self, gid: u32) -> bool {
        gid >= self.first_gid && gid < self.end_gid()
    }

    /// Owned ids always fit: the constructor rejects sheets whose last row or column
    /// would not.
    fn source_rect(&self, local_id: u32) -> Rect {
        self.checked_source_rect(local_id).unwrap_or_default()
    }

    fn checked_source_rect(&self, local_id: u32) -> Option<Rect> {
        let columns = self.columns.max(1);
        let column = local_id % columns;
        let row = local_id / columns;
        let x = column
            .checked_mul(self.tile_width.checked_add(self.spacing)?)?
            .checked_add(self.margin)?;
        let y = row
            .checked_mul(self.tile_height.checked_add(self.spacing)?)?
            .checked_add(self.margin)?;
        let rect = Rect::new(
            i32::try_from(x).ok()?,
            i32::try_from(y).ok()?,
            i32::try_from(self.tile_width).ok()?,
            i32::try_from(self.tile_height).ok()?,
        );
        rect.x.checked_add(rect.width)?;
        rect.y.checked_add(rect.height)?;
        Some(rect)
    }
}

fn fitting_tiles(image_extent: u32, tile_extent: u32, spacing: u32, margin: u32) -> u32 {
    let usable = image_extent.saturating_sub(margin.saturating_mul(2));
    if usable < tile_extent {
        return 0;
    }
    usable.saturating_add(spacing) / tile_extent.saturating_add(spacing)
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedTile<'a> {
    pub tileset: &'a TileSet,
    pub tileset_index: usize,
    pub local_id: u32,
    pub source: Rect,
}

/// Tilesets ordered by first gid with disjoint ranges.
#[derive(Debug, Clone, Default)]
pub struct TileSetRegistry {
    tilesets: Vec<TileSet>,
}

impl TileSetRegistry {
    pub fn new(mut tilesets: Vec<TileSet>) -> Result<Self, TileSetError> {
        tilesets.sort_by_key(TileSet::first_gid);
        for tileset in &tilesets {
            if tileset.tile_count == 0 {
                return Err(TileSetError::EmptyRange {
                    name: tileset.name.clone(),
                    first_gid: tileset.first_gid,
                });
            }
        }
        for pair in tilesets.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            if second.first_gid < first.end_gid() {
                return Err(TileSetError::OverlappingRange {
                    first: first.name.clone(),
                    first_first: first.first_gid,
                    first_end: first.end_gid(),
                    second: second.name.clone(),
                    second_first: second.first_gid,
                    second_end: second.end_gid(),
                });
            }
        }
        Ok(Self { tilesets })
    }

    pub fn len(&self) -> usize {
        self.tilesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tilesets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileSet> {
        self.tilesets.iter()
    }

    pub fn get(&self, index: usize) -> Option<&TileSet> {
        self.tilesets.get(index)
    }

    pub fn next_free_gid(&self) -> u32 {
        self.tilesets
            .last()
            .map(TileSet::end_gid)
            .unwrap_or(1)
            .max(1)
    }

    /// `gid` must already have its orientation flags stripped.
    pub fn resolve(&self, gid: u32) -> Result<ResolvedTile<'_>, TileSetError> {
        let unknown = TileSetError::UnknownTileId { gid };
        if gid == 0 {
            return Err(unknown);
        }
        let candidates = self.tilesets.partition_point(|tileset| tileset.first_gid <= gid);
        let index = candidates.checked_sub(1).ok_or(unknown.clone())?;
        let tileset = &self.tilesets[index];
        if !tileset.owns(gid) {
            return Err(unknown);
        }
        let local_id = gid - tileset.first_gid;
        Ok(ResolvedTile {
            tileset,
            tileset_index: index,
            local_id,
            source: tileset.source_rect(local_id),
        })
    }

    /// Registers another tileset, keeping ranges disjoint.
    pub fn push(&mut self, tileset: TileSet) -> Result<(), TileSetError> {
        if tileset.tile_count == 0 {
            return Err(TileSetError::EmptyRange {
                name: tileset.name,
                first_gid: tileset.first_gid,
            });
        }
        if let Some(existing) = self.tilesets.iter().find(|existing| {
            tileset.first_gid < existing.end_gid() && existing.first_gid < tileset.end_gid()
        }) {
            return Err(TileSetError::OverlappingRange {
                first: existing.name.clone(),
                first_first: existing.first_gid,
                first_end: existing.end_gid(),
                second: tileset.name.clone(),
                second_first: tileset.first_gid,
                second_end: tileset.end_gid(),
            });
        }
        let index = self
            .tilesets
            .partition_point(|existing| existing.first_gid <= tileset.first_gid);
        self.tilesets.insert(index, tileset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(width: u32, height: u32) -> RgbaImage {
        RgbaImage::new(width, height)
    }

    #[test]
    fn resolve_returns_owner_and_local_index_for_every_gid() {
        let registry = TileSetRegistry::new(vec![
            TileSet::new("b", 9, 16, 16, sheet(32, 16)).expect("b"),
            TileSet::new("a", 1, 16, 16, sheet(64, 32)).expect("a"),
        ])
        .expect("registry");

        for gid in 1..9 {
            let resolved = registry.resolve(gid).expect("a gid");
            assert_eq!(resolved.tileset.name(), "a");
            assert!(resolved.local_id < 8);
        }
        for gid in 9..11 {
            let resolved = registry.resolve(gid).expect("b gid");
            assert_eq!(resolved.tileset.name(), "b");
            assert_eq!(resolved.local_id, gid - 9);
        }
        assert_eq!(
            registry.resolve(11).expect_err("past end"),
            TileSetError::UnknownTileId { gid: 11 }
        );
        assert!(registry.resolve(0).is_err());
    }

    #[test]
    fn source_rect_walks_rows_by_image_width() {
        let registry =
            TileSetRegistry::new(vec![TileSet::new("t", 1, 16, 16, sheet(48, 32)).expect("t")])
                .expect("registry");
        assert_eq!(registry.resolve(1).expect("1").source, Rect::new(0, 0, 16, 16));
        assert_eq!(registry.resolve(3).expect("3").source, Rect::new(32, 0, 16, 16));
        assert_eq!(registry.resolve(4).expect("4").source, Rect::new(0, 16, 16, 16));
    }

    #[test]
    fn spacing_and_margin_offset_source_rects() {
        let tileset =
            TileSet::with_layout("t", 1, 16, 16, 2, 1, None, sheet(1 + 16 + 2 + 16 + 1, 18))
                .expect("t");
        assert_eq!(tileset.columns(), 2);
        assert_eq!(tileset.tile_count(), 2);
        let registry = TileSetRegistry::new(vec![tileset]).expect("registry");
        assert_eq!(registry.resolve(2).expect("2").source, Rect::new(19, 1, 16, 16));
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let err = TileSetRegistry::new(vec![
            TileSet::new("a", 1, 16, 16, sheet(64, 16)).expect("a"),
            TileSet::new("b", 3, 16, 16, sheet(16, 16)).expect("b"),
        ])
        .expect_err("overlap");
        assert!(matches!(err, TileSetError::OverlappingRange { .. }));
    }

    #[test]
    fn empty_tileset_is_rejected() {
        let err = TileSetRegistry::new(vec![TileSet::new("tiny", 1, 32, 32, sheet(16, 16))
            .expect("tiny")])
        .expect_err("empty");
        assert!(matches!(err, TileSetError::EmptyRange { .. }));
    }

    #[test]
    fn push_appends_after_existing_ranges() {
        let mut registry =
            TileSetRegistry::new(vec![TileSet::new("a", 1, 16, 16, sheet(32, 16)).expect("a")])
                .expect("registry");
        let next = registry.next_free_gid();
        assert_eq!(next, 3);
        registry
            .push(TileSet::single_image("backdrop", next, sheet(100, 50)).expect("image"))
            .expect("push");
        let resolved = registry.resolve(3).expect("backdrop");
        assert_eq!(resolved.source, Rect::new(0, 0, 100, 50));

        let err = registry
            .push(TileSet::new("clash", 2, 16, 16, sheet(16, 16)).expect("clash"))
            .expect_err("overlap");
        assert!(matches!(err, TileSetError::OverlappingRange { .. }));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn tiles_sliced_past_the_pixel_range_are_rejected() {
        let err = TileSet::with_layout("tall", 1, 16, 1 << 20, 0, 0, Some(4096), sheet(16, 16))
            .expect_err("overflow");
        assert_eq!(err, TileSetError::ExtentOverflow { name: "tall".to_string() });

        let wide = TileSet::with_layout("wide", 1, u32::MAX, 16, 0, 0, Some(1), sheet(16, 16))
            .expect_err("overflow");
        assert!(matches!(wide, TileSetError::ExtentOverflow { .. }));

        let fits = TileSet::with_layout("fits", 1, 16, 1 << 20, 0, 0, Some(4), sheet(16, 16)).expect("fits");
        let registry = TileSetRegistry::new(vec![fits]).expect("registry");
        assert_eq!(registry.resolve(4).expect("resolve").source, Rect::new(0, 3 << 20, 16, 1 << 20));
    }
}
