use image::Rgba;
use thiserror::Error;

use super::gid::{decode_gid, TileFlags};
use super::properties::{Properties, PropertyValue};
use super::tileset::TileSetRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("layer '{layer}' holds {actual} cells, expected {expected}")]
    CellCountMismatch {
        layer: String,
        expected: usize,
        actual: usize,
    },
    #[error("layer '{layer}' is {actual_width}x{actual_height}, map is {expected_width}x{expected_height}")]
    SizeMismatch {
        layer: String,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerInfo {
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub properties: Properties,
}

impl LayerInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            opacity: 1.0,
            properties: Properties::new(),
        }
    }
}

/// Row-major grid of encoded tile references.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub info: LayerInfo,
    width: u32,
    height: u32,
    data: Vec<u32>,
}

impl TileLayer {
    pub fn new(info: LayerInfo, width: u32, height: u32, data: Vec<u32>) -> Result<Self, LayerError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(LayerError::CellCountMismatch {
                layer: info.name,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            info,
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn raw_at(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y as usize * self.width as usize + x as usize).copied()
    }

    pub fn gid_at(&self, x: u32, y: u32) -> Option<(u32, TileFlags)> {
        self.raw_at(x, y).map(decode_gid)
    }

    /// `(x, y, raw)` for every cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        let width = self.width.max(1);
        self.data
            .iter()
            .enumerate()
            .map(move |(index, raw)| (index as u32 % width, index as u32 / width, *raw))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub gid: Option<u32>,
    pub visible: bool,
    pub properties: Properties,
}

impl MapObject {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, x: i64, y: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            kind: kind.into(),
            x,
            y,
            width: 0,
            height: 0,
            gid: None,
            visible: true,
            properties: Properties::new(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn with_property(mut self, key: &str, value: PropertyValue) -> Self {
        self.properties.insert(key, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLayer {
    pub info: LayerInfo,
    pub objects: Vec<MapObject>,
}

/// A full-size picture drawn once at the origin. Its pixels live in the registry under
/// `gid`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    pub info: LayerInfo,
    pub gid: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Tile(TileLayer),
    Object(ObjectLayer),
    Image(ImageLayer),
}

impl Layer {
    pub fn info(&self) -> &LayerInfo {
        match self {
            Layer::Tile(layer) => &layer.info,
            Layer::Object(layer) => &layer.info,
            Layer::Image(layer) => &layer.info,
        }
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn is_visible(&self) -> bool {
        self.info().visible
    }
}

/// Parsed map. Built once, then only read.
#[derive(Debug, Clone)]
pub struct MapDocument {
    version: f64,
    orientation: String,
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    background_color: Option<Rgba<u8>>,
    properties: Properties,
    layers: Vec<Layer>,
    tilesets: TileSetRegistry,
}

impl MapDocument {
    pub fn new(
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        tilesets: TileSetRegistry,
    ) -> Self {
        Self {
            version: 1.0,
            orientation: "orthogonal".to_string(),
            width,
            height,
            tile_width,
            tile_height,
            background_color: None,
            properties: Properties::new(),
            layers: Vec::new(),
            tilesets,
        }
    }

    pub fn with_version(mut self, version: f64, orientation: impl Into<String>) -> Self {
        self.version = version;
        self.orientation = orientation.into();
        self
    }

    pub fn with_background_color(mut self, color: Option<Rgba<u8>>) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Appends a layer on top of the existing ones. Tile layers must match the map size.
    pub fn push_layer(&mut self, layer: Layer) -> Result<(), LayerError> {
        if let Layer::Tile(tiles) = &layer {
            if tiles.width != self.width || tiles.height != self.height {
                return Err(LayerError::SizeMismatch {
                    layer: tiles.info.name.clone(),
                    expected_width: self.width,
                    expected_height: self.height,
                    actual_width: tiles.width,
                    actual_height: tiles.height,
                });
            }
        }
        self.layers.push(layer);
        Ok(())
    }

    pub fn version(&self) -> f64 {
        self.version
    }

    pub fn orientation(&self) -> &str {
        &self.orientation
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.saturating_mul(self.tile_width),
            self.height.saturating_mul(self.tile_height),
        )
    }

    pub fn background_color(&self) -> Option<Rgba<u8>> {
        self.background_color
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn tilesets(&self) -> &TileSetRegistry {
        &self.tilesets
    }

    pub fn visible_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|layer| layer.is_visible())
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name() == name)
    }

    pub fn tile_layers(&self) -> impl Iterator<Item = &TileLayer> {
        self.layers.iter().filter_map(|layer| match layer {
            Layer::Tile(tiles) => Some(tiles),
            _ => None,
        })
    }

    /// Every object of every object layer, in document order.
    pub fn objects(&self) -> impl Iterator<Item = &MapObject> {
        self.layers
            .iter()
            .filter_map(|layer| match layer {
                Layer::Object(group) => Some(group.objects.iter()),
                _ => None,
            })
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_layer_rejects_wrong_cell_count() {
        let err = TileLayer::new(LayerInfo::named("ground"), 2, 2, vec![1, 2, 3]).expect_err("size");
        assert_eq!(
            err,
            LayerError::CellCountMismatch {
                layer: "ground".to_string(),
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn document_rejects_tile_layer_of_other_size() {
        let mut doc = MapDocument::new(3, 3, 16, 16, TileSetRegistry::default());
        let layer = TileLayer::new(LayerInfo::named("small"), 2, 2, vec![0; 4]).expect("layer");
        assert!(matches!(
            doc.push_layer(Layer::Tile(layer)),
            Err(LayerError::SizeMismatch { .. })
        ));
        assert!(doc.layers().is_empty());
    }

    #[test]
    fn pixel_size_saturates_on_huge_maps() {
        let doc = MapDocument::new(70_000, 2, 70_000, 16, TileSetRegistry::default());
        assert_eq!(doc.pixel_size(), (u32::MAX, 32));
    }

    #[test]
    fn cells_are_row_major_with_coordinates() {
        let layer = TileLayer::new(LayerInfo::named("g"), 2, 2, vec![1, 2, 0, 3]).expect("layer");
        let cells: Vec<_> = layer.cells().collect();
        assert_eq!(cells, vec![(0, 0, 1), (1, 0, 2), (0, 1, 0), (1, 1, 3)]);
        assert_eq!(layer.raw_at(1, 1), Some(3));
        assert_eq!(layer.raw_at(2, 0), None);
    }

    #[test]
    fn objects_flatten_across_groups_in_order() {
        let mut doc = MapDocument::new(1, 1, 16, 16, TileSetRegistry::default());
        doc.push_layer(Layer::Object(ObjectLayer {
            info: LayerInfo::named("a"),
            objects: vec![MapObject::new("blocker", "", 0, 16)],
        }))
        .expect("a");
        doc.push_layer(Layer::Object(ObjectLayer {
            info: LayerInfo::named("b"),
            objects: vec![
                MapObject::new("portal", "town", 16, 16),
                MapObject::new("sprite", "king", 32, 16),
            ],
        }))
        .expect("b");
        let names: Vec<&str> = doc.objects().map(|object| object.name.as_str()).collect();
        assert_eq!(names, vec!["blocker", "portal", "sprite"]);
    }
}
