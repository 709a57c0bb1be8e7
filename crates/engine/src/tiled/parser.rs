use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::{GzDecoder, ZlibDecoder};
use image::{Rgba, RgbaImage};
use roxmltree::{Document, Node};
use tracing::{debug, warn};

use super::document::{
    ImageLayer, Layer, LayerInfo, MapDocument, MapObject, ObjectLayer, TileLayer,
};
use super::properties::{coerce_as, coerce_attribute, AttributeKind, Properties, PropertyError, PropertyValue};
use super::tileset::{TileSet, TileSetError, TileSetRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    MissingField,
    InvalidValue,
    InvalidPropertyValue,
    UnsupportedEncoding,
    InvalidLayerData,
    TileSetImage,
    TileSetRange,
}

#[derive(Debug, Clone)]
pub struct MapParseError {
    pub code: MapErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for MapParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for MapParseError {}

pub fn parse_map_file(path: &Path) -> Result<MapDocument, MapParseError> {
    let raw = fs::read_to_string(path).map_err(|error| MapParseError {
        code: MapErrorCode::ReadFile,
        message: format!("failed to read map: {error}"),
        file_path: path.to_path_buf(),
        location: None,
    })?;
    let document = parse_map_str(&raw, path)?;
    debug!(
        path = %path.display(),
        width = document.width(),
        height = document.height(),
        layers = document.layers().len(),
        tilesets = document.tilesets().len(),
        "map_parsed"
    );
    Ok(document)
}

/// Parses map XML. Relative image and tileset paths resolve against `file_path`'s
/// directory.
pub fn parse_map_str(raw: &str, file_path: &Path) -> Result<MapDocument, MapParseError> {
    let doc = parse_xml(raw, file_path)?;
    let ctx = ParseContext {
        doc: &doc,
        file_path,
    };
    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(ctx.error_at(
            root,
            MapErrorCode::InvalidRoot,
            format!("expected <map> root, found <{}>", root.tag_name().name()),
        ));
    }

    let version = ctx.attr_float(root, "version", 1.0, "map")?;
    let orientation = ctx
        .attr_text(root, "orientation")
        .unwrap_or("orthogonal")
        .to_string();
    let width = ctx.attr_u32(root, "width", 0, "map")?;
    let height = ctx.attr_u32(root, "height", 0, "map")?;
    let tile_width = ctx.attr_u32(root, "tilewidth", 0, "map")?;
    let tile_height = ctx.attr_u32(root, "tileheight", 0, "map")?;
    let background_color = match ctx.attr_text(root, "backgroundcolor") {
        Some(text) => Some(parse_color(text).ok_or_else(|| {
            ctx.error_at(
                root,
                MapErrorCode::InvalidValue,
                format!("invalid backgroundcolor '{text}'"),
            )
        })?),
        None => None,
    };
    if orientation != "orthogonal" {
        warn!(path = %file_path.display(), orientation = %orientation, "map_orientation_drawn_as_orthogonal");
    }

    let mut properties = Properties::new();
    let mut tilesets = Vec::new();
    for child in elements(root) {
        match child.tag_name().name() {
            "properties" => properties = ctx.parse_properties(child, "map")?,
            "tileset" => tilesets.push(ctx.parse_tileset(child)?),
            _ => {}
        }
    }
    let mut registry = TileSetRegistry::new(tilesets)
        .map_err(|error| ctx.error_at(root, MapErrorCode::TileSetRange, error.to_string()))?;

    let mut layers = Vec::new();
    for child in elements(root) {
        match child.tag_name().name() {
            "layer" => layers.push(Layer::Tile(ctx.parse_tile_layer(child, width, height)?)),
            "objectgroup" => layers.push(Layer::Object(ctx.parse_object_group(child)?)),
            "imagelayer" => layers.push(Layer::Image(ctx.parse_image_layer(child, &mut registry)?)),
            "properties" | "tileset" | "editorsettings" => {}
            other => {
                debug!(path = %file_path.display(), element = other, "map_element_ignored");
            }
        }
    }

    let mut document = MapDocument::new(width, height, tile_width, tile_height, registry)
        .with_version(version, orientation)
        .with_background_color(background_color)
        .with_properties(properties);
    for layer in layers {
        document
            .push_layer(layer)
            .map_err(|error| ctx.error_at(root, MapErrorCode::InvalidLayerData, error.to_string()))?;
    }
    Ok(document)
}

fn parse_xml<'input>(raw: &'input str, file_path: &Path) -> Result<Document<'input>, MapParseError> {
    Document::parse(raw).map_err(|error| MapParseError {
        code: MapErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|child| child.tag_name().name() == name)
}

struct ParseContext<'a, 'input> {
    doc: &'a Document<'input>,
    file_path: &'a Path,
}

impl<'a, 'input> ParseContext<'a, 'input> {
    fn base_dir(&self) -> &Path {
        self.file_path.parent().unwrap_or_else(|| Path::new("."))
    }

    fn error_at(&self, node: Node<'_, '_>, code: MapErrorCode, message: String) -> MapParseError {
        let pos = self.doc.text_pos_at(node.range().start);
        MapParseError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn property_error(&self, node: Node<'_, '_>, owner: &str, error: PropertyError) -> MapParseError {
        self.error_at(
            node,
            MapErrorCode::InvalidPropertyValue,
            format!("{owner}: {error}"),
        )
    }

    fn attr_text<'n>(&self, node: Node<'n, 'input>, key: &str) -> Option<&'n str> {
        node.attribute(key)
    }

    fn attr_value(
        &self,
        node: Node<'_, '_>,
        key: &str,
        owner: &str,
    ) -> Result<Option<PropertyValue>, MapParseError> {
        match node.attribute(key) {
            Some(raw) => coerce_attribute(key, raw)
                .map(Some)
                .map_err(|error| self.property_error(node, owner, error)),
            None => Ok(None),
        }
    }

    fn attr_int(&self, node: Node<'_, '_>, key: &str, default: i64, owner: &str) -> Result<i64, MapParseError> {
        Ok(self
            .attr_value(node, key, owner)?
            .and_then(|value| value.as_int())
            .unwrap_or(default))
    }

    fn attr_u32(&self, node: Node<'_, '_>, key: &str, default: u32, owner: &str) -> Result<u32, MapParseError> {
        let value = self.attr_int(node, key, i64::from(default), owner)?;
        u32::try_from(value).map_err(|_| {
            self.error_at(
                node,
                MapErrorCode::InvalidValue,
                format!("{owner}: '{key}' must be a non-negative integer, got {value}"),
            )
        })
    }

    fn attr_float(&self, node: Node<'_, '_>, key: &str, default: f64, owner: &str) -> Result<f64, MapParseError> {
        Ok(self
            .attr_value(node, key, owner)?
            .and_then(|value| value.as_float())
            .unwrap_or(default))
    }

    fn attr_bool(&self, node: Node<'_, '_>, key: &str, default: bool, owner: &str) -> Result<bool, MapParseError> {
        let raw = match node.attribute(key) {
            Some(raw) => raw,
            None => return Ok(default),
        };
        coerce_as(AttributeKind::Bool, key, raw)
            .map(|value| value.as_bool().unwrap_or(default))
            .map_err(|error| self.property_error(node, owner, error))
    }

    /// `<properties><property name value [type]/></properties>`. Values are strings unless
    /// the property declares an int, float, or bool type.
    fn parse_properties(&self, node: Node<'_, '_>, owner: &str) -> Result<Properties, MapParseError> {
        let mut properties = Properties::new();
        for property in elements(node).filter(|child| child.tag_name().name() == "property") {
            let Some(name) = property.attribute("name") else {
                return Err(self.error_at(
                    property,
                    MapErrorCode::MissingField,
                    format!("{owner}: property without a name"),
                ));
            };
            let raw = property
                .attribute("value")
                .or_else(|| property.text())
                .unwrap_or("");
            let kind = match property.attribute("type") {
                Some("int") => AttributeKind::Int,
                Some("float") => AttributeKind::Float,
                Some("bool") => AttributeKind::Bool,
                _ => AttributeKind::String,
            };
            let value = coerce_as(kind, name, raw)
                .map_err(|error| self.property_error(property, owner, error))?;
            properties.insert(name, value);
        }
        Ok(properties)
    }

    fn parse_layer_info(&self, node: Node<'_, '_>, kind: &str) -> Result<LayerInfo, MapParseError> {
        let name = node.attribute("name").unwrap_or("").to_string();
        let owner = format!("{kind} '{name}'");
        let visible = self.attr_bool(node, "visible", true, &owner)?;
        let opacity = self.attr_float(node, "opacity", 1.0, &owner)?.clamp(0.0, 1.0) as f32;
        let properties = match child_element(node, "properties") {
            Some(props) => self.parse_properties(props, &owner)?,
            None => Properties::new(),
        };
        Ok(LayerInfo {
            name,
            visible,
            opacity,
            properties,
        })
    }

    fn parse_tileset(&self, node: Node<'_, '_>) -> Result<TileSet, MapParseError> {
        let first_gid = self.attr_u32(node, "firstgid", 1, "tileset")?;
        match node.attribute("source") {
            Some(source) => {
                let path = self.base_dir().join(source);
                let raw = fs::read_to_string(&path).map_err(|error| MapParseError {
                    code: MapErrorCode::ReadFile,
                    message: format!("failed to read external tileset: {error}"),
                    file_path: path.clone(),
                    location: None,
                })?;
                let doc = parse_xml(&raw, &path)?;
                let external = ParseContext {
                    doc: &doc,
                    file_path: &path,
                };
                let root = doc.root_element();
                if root.tag_name().name() != "tileset" {
                    return Err(external.error_at(
                        root,
                        MapErrorCode::InvalidRoot,
                        format!("expected <tileset> root, found <{}>", root.tag_name().name()),
                    ));
                }
                external.parse_tileset_body(root, first_gid)
            }
            None => self.parse_tileset_body(node, first_gid),
        }
    }

    fn parse_tileset_body(&self, node: Node<'_, '_>, first_gid: u32) -> Result<TileSet, MapParseError> {
        let name = node.attribute("name").unwrap_or("").to_string();
        let owner = format!("tileset '{name}'");
        let tile_width = self.attr_u32(node, "tilewidth", 0, &owner)?;
        let tile_height = self.attr_u32(node, "tileheight", 0, &owner)?;
        let spacing = self.attr_u32(node, "spacing", 0, &owner)?;
        let margin = self.attr_u32(node, "margin", 0, &owner)?;
        let tile_count = match node.attribute("tilecount") {
            Some(raw) => Some(raw.trim().parse::<u32>().map_err(|_| {
                self.error_at(
                    node,
                    MapErrorCode::InvalidValue,
                    format!("{owner}: invalid tilecount '{raw}'"),
                )
            })?),
            None => None,
        };
        let Some(image_node) = child_element(node, "image") else {
            return Err(self.error_at(
                node,
                MapErrorCode::MissingField,
                format!("{owner}: tilesets need a single <image> sheet"),
            ));
        };
        let image = self.load_image(image_node, &owner)?;
        TileSet::with_layout(
            name,
            first_gid,
            tile_width,
            tile_height,
            spacing,
            margin,
            tile_count,
            image,
        )
        .map_err(|error| {
            let code = match error {
                TileSetError::ExtentOverflow { .. } => MapErrorCode::InvalidValue,
                _ => MapErrorCode::TileSetRange,
            };
            self.error_at(node, code, error.to_string())
        })
    }

    fn load_image(&self, image_node: Node<'_, '_>, owner: &str) -> Result<RgbaImage, MapParseError> {
        let Some(source) = image_node.attribute("source") else {
            return Err(self.error_at(
                image_node,
                MapErrorCode::MissingField,
                format!("{owner}: <image> without a source"),
            ));
        };
        let path = self.base_dir().join(source);
        let mut image = image::open(&path)
            .map_err(|error| {
                self.error_at(
                    image_node,
                    MapErrorCode::TileSetImage,
                    format!("{owner}: failed to load '{}': {error}", path.display()),
                )
            })?
            .to_rgba8();
        if let Some(trans) = image_node.attribute("trans") {
            let key = parse_color(trans).ok_or_else(|| {
                self.error_at(
                    image_node,
                    MapErrorCode::InvalidValue,
                    format!("{owner}: invalid trans color '{trans}'"),
                )
            })?;
            apply_color_key(&mut image, key);
        }
        Ok(image)
    }

    fn parse_tile_layer(
        &self,
        node: Node<'_, '_>,
        map_width: u32,
        map_height: u32,
    ) -> Result<TileLayer, MapParseError> {
        let info = self.parse_layer_info(node, "layer")?;
        let owner = format!("layer '{}'", info.name);
        let width = self.attr_u32(node, "width", map_width, &owner)?;
        let height = self.attr_u32(node, "height", map_height, &owner)?;
        let Some(data) = child_element(node, "data") else {
            return Err(self.error_at(
                node,
                MapErrorCode::MissingField,
                format!("{owner}: missing <data>"),
            ));
        };
        let cells = self.decode_layer_data(data, &owner)?;
        TileLayer::new(info, width, height, cells)
            .map_err(|error| self.error_at(data, MapErrorCode::InvalidLayerData, error.to_string()))
    }

    fn decode_layer_data(&self, data: Node<'_, '_>, owner: &str) -> Result<Vec<u32>, MapParseError> {
        if child_element(data, "chunk").is_some() {
            return Err(self.error_at(
                data,
                MapErrorCode::UnsupportedEncoding,
                format!("{owner}: infinite (chunked) maps are not supported"),
            ));
        }
        let text = data.text().unwrap_or("");
        let encoding = data.attribute("encoding");
        let compression = data.attribute("compression");
        let invalid = |message: String| self.error_at(data, MapErrorCode::InvalidLayerData, format!("{owner}: {message}"));

        match (encoding, compression) {
            (None, None) => elements(data)
                .filter(|child| child.tag_name().name() == "tile")
                .map(|tile| self.attr_u32(tile, "gid", 0, owner))
                .collect(),
            (Some("csv"), None) => text
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(|token| {
                    token
                        .parse::<u32>()
                        .map_err(|_| invalid(format!("invalid csv cell '{token}'")))
                })
                .collect(),
            (Some("base64"), compression) => {
                let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = base64::decode(compact)
                    .map_err(|error| invalid(format!("invalid base64 data: {error}")))?;
                let bytes = match compression {
                    None => bytes,
                    Some("zlib") => inflate(ZlibDecoder::new(bytes.as_slice()))
                        .map_err(|error| invalid(format!("invalid zlib data: {error}")))?,
                    Some("gzip") => inflate(GzDecoder::new(bytes.as_slice()))
                        .map_err(|error| invalid(format!("invalid gzip data: {error}")))?,
                    Some(other) => {
                        return Err(self.error_at(
                            data,
                            MapErrorCode::UnsupportedEncoding,
                            format!("{owner}: unsupported compression '{other}'"),
                        ))
                    }
                };
                if bytes.len() % 4 != 0 {
                    return Err(invalid(format!(
                        "decoded data is {} bytes, not a multiple of 4",
                        bytes.len()
                    )));
                }
                Ok(bytes
                    .chunks_exact(4)
                    .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect())
            }
            (encoding, compression) => Err(self.error_at(
                data,
                MapErrorCode::UnsupportedEncoding,
                format!(
                    "{owner}: unsupported data encoding {:?} with compression {:?}",
                    encoding, compression
                ),
            )),
        }
    }

    fn parse_object_group(&self, node: Node<'_, '_>) -> Result<ObjectLayer, MapParseError> {
        let info = self.parse_layer_info(node, "objectgroup")?;
        let mut objects = Vec::new();
        for object in elements(node).filter(|child| child.tag_name().name() == "object") {
            objects.push(self.parse_object(object, &info.name)?);
        }
        Ok(ObjectLayer { info, objects })
    }

    fn parse_object(&self, node: Node<'_, '_>, group: &str) -> Result<MapObject, MapParseError> {
        let id = self.attr_int(node, "id", 0, "object")?;
        let name = node.attribute("name").unwrap_or("").to_string();
        let owner = format!("object '{name}' (id {id}) in '{group}'");
        let kind = node
            .attribute("type")
            .or_else(|| node.attribute("class"))
            .unwrap_or("")
            .to_string();
        let gid = match self.attr_value(node, "gid", &owner)? {
            Some(value) => value.as_int().and_then(|gid| u32::try_from(gid).ok()),
            None => None,
        };
        let properties = match child_element(node, "properties") {
            Some(props) => self.parse_properties(props, &owner)?,
            None => Properties::new(),
        };
        Ok(MapObject {
            id,
            name,
            kind,
            x: self.attr_int(node, "x", 0, &owner)?,
            y: self.attr_int(node, "y", 0, &owner)?,
            width: self.attr_int(node, "width", 0, &owner)?,
            height: self.attr_int(node, "height", 0, &owner)?,
            gid,
            visible: self.attr_bool(node, "visible", true, &owner)?,
            properties,
        })
    }

    fn parse_image_layer(
        &self,
        node: Node<'_, '_>,
        registry: &mut TileSetRegistry,
    ) -> Result<ImageLayer, MapParseError> {
        let info = self.parse_layer_info(node, "imagelayer")?;
        let owner = format!("imagelayer '{}'", info.name);
        let Some(image_node) = child_element(node, "image") else {
            return Ok(ImageLayer { info, gid: 0 });
        };
        let image = self.load_image(image_node, &owner)?;
        let gid = registry.next_free_gid();
        let tileset = TileSet::single_image(info.name.clone(), gid, image)
            .map_err(|error| self.error_at(node, MapErrorCode::TileSetRange, error.to_string()))?;
        registry
            .push(tileset)
            .map_err(|error| self.error_at(node, MapErrorCode::TileSetRange, error.to_string()))?;
        Ok(ImageLayer { info, gid })
    }
}

fn inflate<R: Read>(mut reader: R) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out)?;
    Ok(out)
}

/// `#RRGGBB`, `#AARRGGBB`, with or without the leading `#`.
pub fn parse_color(text: &str) -> Option<Rgba<u8>> {
    let hex = text.trim().trim_start_matches('#');
    let byte = |index: usize| u8::from_str_radix(hex.get(index..index + 2)?, 16).ok();
    match hex.len() {
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(2)?, byte(4)?, byte(6)?, byte(0)?])),
        _ => None,
    }
}

fn apply_color_key(image: &mut RgbaImage, key: Rgba<u8>) {
    for pixel in image.pixels_mut() {
        if pixel.0[..3] == key.0[..3] {
            pixel.0[3] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use tempfile::TempDir;

    use super::*;
    use crate::tiled::gid::decode_gid;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn write_sheet(path: &Path, width: u32, height: u32) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        let mut sheet = RgbaImage::new(width, height);
        for (x, y, pixel) in sheet.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 8) as u8, (y * 8) as u8, 0, 255]);
        }
        sheet.save(path).expect("save png");
    }

    fn map_with_data(data: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.0" orientation="orthogonal" width="2" height="2" tilewidth="16" tileheight="16">
 <tileset firstgid="1" name="terrain" tilewidth="16" tileheight="16">
  <image source="terrain.png" width="32" height="32"/>
 </tileset>
 <layer name="ground" width="2" height="2">
  {data}
 </layer>
</map>"#
        )
    }

    fn encoded_cells(cells: &[u32]) -> Vec<u8> {
        cells.iter().flat_map(|cell| cell.to_le_bytes()).collect()
    }

    fn ground_cells(doc: &MapDocument) -> Vec<u32> {
        doc.tile_layers()
            .next()
            .expect("tile layer")
            .cells()
            .map(|(_, _, raw)| raw)
            .collect()
    }

    #[test]
    fn every_data_encoding_decodes_to_the_same_grid() {
        let temp = TempDir::new().expect("temp");
        write_sheet(&temp.path().join("terrain.png"), 32, 32);
        let cells = [1u32, 2, 0, 3 | 0x8000_0000];
        let bytes = encoded_cells(&cells);

        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(&bytes).expect("zlib");
        let zlib = zlib.finish().expect("zlib finish");
        let mut gzip = GzEncoder::new(Vec::new(), Compression::default());
        gzip.write_all(&bytes).expect("gzip");
        let gzip = gzip.finish().expect("gzip finish");

        let variants = [
            r#"<data><tile gid="1"/><tile gid="2"/><tile/><tile gid="2147483651"/></data>"#
                .to_string(),
            "<data encoding=\"csv\">\n1,2,\n0,2147483651\n</data>".to_string(),
            format!(
                "<data encoding=\"base64\">\n   {}\n  </data>",
                base64::encode(&bytes)
            ),
            format!(
                "<data encoding=\"base64\" compression=\"zlib\">{}</data>",
                base64::encode(&zlib)
            ),
            format!(
                "<data encoding=\"base64\" compression=\"gzip\">{}</data>",
                base64::encode(&gzip)
            ),
        ];

        for data in variants {
            let path = temp.path().join("map.tmx");
            write_file(&path, &map_with_data(&data));
            let doc = parse_map_file(&path).expect("parse");
            assert_eq!(ground_cells(&doc), cells.to_vec(), "data: {data}");
        }
    }

    #[test]
    fn map_attributes_and_tileset_are_loaded() {
        let temp = TempDir::new().expect("temp");
        write_sheet(&temp.path().join("terrain.png"), 32, 32);
        let path = temp.path().join("map.tmx");
        write_file(
            &path,
            &map_with_data("<data encoding=\"csv\">1,2,3,4</data>")
                .replace("tileheight=\"16\">\n <tileset", "tileheight=\"16\" backgroundcolor=\"#102030\">\n <tileset"),
        );

        let doc = parse_map_file(&path).expect("parse");
        assert_eq!((doc.width(), doc.height()), (2, 2));
        assert_eq!(doc.tile_size(), (16, 16));
        assert_eq!(doc.pixel_size(), (32, 32));
        assert_eq!(doc.background_color(), Some(Rgba([0x10, 0x20, 0x30, 255])));
        assert_eq!(doc.tilesets().len(), 1);
        let resolved = doc.tilesets().resolve(4).expect("gid 4");
        assert_eq!(resolved.tileset.name(), "terrain");
        assert_eq!((resolved.source.x, resolved.source.y), (16, 16));
        let (gid, flags) = decode_gid(ground_cells(&doc)[3]);
        assert_eq!(gid, 4);
        assert!(flags.is_identity());
    }

    #[test]
    fn objects_carry_coerced_attributes_and_properties() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("objects.tmx");
        write_file(
            &path,
            r#"<map width="4" height="4" tilewidth="16" tileheight="16">
 <objectgroup name="people" opacity="0.5">
  <object id="3" name="sprite" type="oldman" x="48" y="64.5" width="16" height="16">
   <properties>
    <property name="direction" value="left"/>
    <property name="dialogue length" value="2"/>
    <property name="dialogue0" value="Hello."/>
    <property name="dialogue1">Multi
line</property>
    <property name="shy" type="bool" value="yes"/>
   </properties>
  </object>
  <object id="4" name="portal" class="town" x="0" y="16"/>
 </objectgroup>
</map>"#,
        );

        let doc = parse_map_file(&path).expect("parse");
        let objects: Vec<&MapObject> = doc.objects().collect();
        assert_eq!(objects.len(), 2);

        let oldman = objects[0];
        assert_eq!((oldman.id, oldman.x, oldman.y), (3, 48, 64));
        assert_eq!(oldman.kind, "oldman");
        assert_eq!(oldman.properties.get_str("direction"), Some("left"));
        assert_eq!(oldman.properties.get_int("dialogue length"), Some(2));
        assert_eq!(oldman.properties.get_str("dialogue1"), Some("Multi\nline"));
        assert_eq!(oldman.property("shy"), Some(&PropertyValue::Bool(true)));

        assert_eq!(objects[1].kind, "town");
        assert!(objects[1].visible);

        let layer = doc.layer_by_name("people").expect("layer");
        assert!((layer.info().opacity - 0.5).abs() < f32::EPSILON);
        assert!(layer.is_visible());
    }

    #[test]
    fn invalid_boolean_is_reported_with_the_offending_object() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("bad.tmx");
        write_file(
            &path,
            r#"<map width="1" height="1" tilewidth="16" tileheight="16">
 <objectgroup name="things">
  <object id="9" name="chest" x="0" y="0" visible="banana"/>
 </objectgroup>
</map>"#,
        );

        let err = parse_map_file(&path).expect_err("invalid bool");
        assert_eq!(err.code, MapErrorCode::InvalidPropertyValue);
        assert!(err.message.contains("object 'chest'"), "{}", err.message);
        assert_eq!(err.location.map(|loc| loc.line), Some(3));
    }

    #[test]
    fn invalid_layer_visibility_names_the_layer() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("bad.tmx");
        write_file(
            &path,
            &map_with_data("<data encoding=\"csv\">1,2,3,4</data>")
                .replace("<layer name=\"ground\"", "<layer name=\"ground\" visible=\"maybe\""),
        );
        write_sheet(&temp.path().join("terrain.png"), 32, 32);

        let err = parse_map_file(&path).expect_err("invalid bool");
        assert_eq!(err.code, MapErrorCode::InvalidPropertyValue);
        assert!(err.message.contains("layer 'ground'"), "{}", err.message);
    }

    #[test]
    fn hidden_layers_parse_as_not_visible() {
        let temp = TempDir::new().expect("temp");
        write_sheet(&temp.path().join("terrain.png"), 32, 32);
        let path = temp.path().join("map.tmx");
        write_file(
            &path,
            &map_with_data("<data encoding=\"csv\">1,2,3,4</data>")
                .replace("<layer name=\"ground\"", "<layer name=\"ground\" visible=\"0\""),
        );
        let doc = parse_map_file(&path).expect("parse");
        assert!(!doc.layers()[0].is_visible());
        assert_eq!(doc.visible_layers().count(), 0);
    }

    #[test]
    fn wrong_cell_count_fails_the_parse() {
        let temp = TempDir::new().expect("temp");
        write_sheet(&temp.path().join("terrain.png"), 32, 32);
        let path = temp.path().join("map.tmx");
        write_file(&path, &map_with_data("<data encoding=\"csv\">1,2,3</data>"));
        let err = parse_map_file(&path).expect_err("short data");
        assert_eq!(err.code, MapErrorCode::InvalidLayerData);
    }

    #[test]
    fn unknown_compression_is_unsupported() {
        let temp = TempDir::new().expect("temp");
        write_sheet(&temp.path().join("terrain.png"), 32, 32);
        let path = temp.path().join("map.tmx");
        write_file(
            &path,
            &map_with_data("<data encoding=\"base64\" compression=\"zstd\">AAAA</data>"),
        );
        let err = parse_map_file(&path).expect_err("zstd");
        assert_eq!(err.code, MapErrorCode::UnsupportedEncoding);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = parse_map_str("<map>\n<layer></map>", Path::new("broken.tmx"))
            .expect_err("malformed");
        assert_eq!(err.code, MapErrorCode::XmlMalformed);
        assert!(err.location.is_some());
        assert!(err.to_string().contains("broken.tmx"));
    }

    #[test]
    fn non_map_root_is_rejected() {
        let err = parse_map_str("<tileset/>", Path::new("x.tmx")).expect_err("root");
        assert_eq!(err.code, MapErrorCode::InvalidRoot);
    }

    #[test]
    fn missing_attributes_take_defaults() {
        let doc = parse_map_str("<map/>", Path::new("empty.tmx")).expect("parse");
        assert_eq!((doc.width(), doc.height()), (0, 0));
        assert!((doc.version() - 1.0).abs() < f64::EPSILON);
        assert_eq!(doc.orientation(), "orthogonal");
        assert!(doc.background_color().is_none());
        assert!(doc.layers().is_empty());
    }

    #[test]
    fn external_tileset_resolves_relative_to_its_own_file() {
        let temp = TempDir::new().expect("temp");
        write_sheet(&temp.path().join("sets").join("people.png"), 64, 16);
        write_file(
            &temp.path().join("sets").join("people.tsx"),
            r#"<tileset name="people" tilewidth="16" tileheight="16" tilecount="3">
 <image source="people.png" width="64" height="16"/>
</tileset>"#,
        );
        let path = temp.path().join("map.tmx");
        write_file(
            &path,
            r#"<map width="1" height="1" tilewidth="16" tileheight="16">
 <tileset firstgid="5" source="sets/people.tsx"/>
 <layer name="g" width="1" height="1"><data encoding="csv">6</data></layer>
</map>"#,
        );

        let doc = parse_map_file(&path).expect("parse");
        let tileset = doc.tilesets().get(0).expect("tileset");
        assert_eq!(tileset.name(), "people");
        assert_eq!(tileset.first_gid(), 5);
        assert_eq!(tileset.tile_count(), 3);
        assert!(doc.tilesets().resolve(8).is_err());
    }

    #[test]
    fn overlapping_tilesets_fail_the_parse() {
        let temp = TempDir::new().expect("temp");
        write_sheet(&temp.path().join("a.png"), 32, 16);
        let path = temp.path().join("map.tmx");
        write_file(
            &path,
            r#"<map width="1" height="1" tilewidth="16" tileheight="16">
 <tileset firstgid="1" name="a" tilewidth="16" tileheight="16"><image source="a.png"/></tileset>
 <tileset firstgid="2" name="b" tilewidth="16" tileheight="16"><image source="a.png"/></tileset>
</map>"#,
        );
        let err = parse_map_file(&path).expect_err("overlap");
        assert_eq!(err.code, MapErrorCode::TileSetRange);
    }

    #[test]
    fn tileset_sliced_past_the_pixel_range_is_an_invalid_value() {
        let temp = TempDir::new().expect("temp");
        write_sheet(&temp.path().join("a.png"), 16, 16);
        let path = temp.path().join("map.tmx");
        write_file(
            &path,
            r#"<map width="1" height="1" tilewidth="16" tileheight="16">
 <tileset firstgid="1" name="tall" tilewidth="16" tileheight="1048576" tilecount="4096"><image source="a.png"/></tileset>
</map>"#,
        );
        let err = parse_map_file(&path).expect_err("overflow");
        assert_eq!(err.code, MapErrorCode::InvalidValue);
        assert!(err.message.contains("tall"), "{}", err.message);
    }

    #[test]
    fn image_layer_registers_its_picture_after_tilesets() {
        let temp = TempDir::new().expect("temp");
        write_sheet(&temp.path().join("terrain.png"), 32, 32);
        write_sheet(&temp.path().join("sky.png"), 20, 10);
        let path = temp.path().join("map.tmx");
        write_file(
            &path,
            &map_with_data("<data encoding=\"csv\">1,2,3,4</data>").replace(
                " <layer name=\"ground\"",
                " <imagelayer name=\"sky\"><image source=\"sky.png\"/></imagelayer>\n <layer name=\"ground\"",
            ),
        );

        let doc = parse_map_file(&path).expect("parse");
        let Layer::Image(sky) = &doc.layers()[0] else {
            panic!("expected image layer first");
        };
        assert_eq!(sky.gid, 5);
        let resolved = doc.tilesets().resolve(sky.gid).expect("sky gid");
        assert_eq!((resolved.source.width, resolved.source.height), (20, 10));
    }

    #[test]
    fn trans_color_becomes_transparent() {
        let temp = TempDir::new().expect("temp");
        let sheet_path = temp.path().join("keyed.png");
        let mut sheet = RgbaImage::from_pixel(16, 16, Rgba([255, 0, 255, 255]));
        sheet.put_pixel(3, 3, Rgba([10, 20, 30, 255]));
        sheet.save(&sheet_path).expect("save");
        let path = temp.path().join("map.tmx");
        write_file(
            &path,
            r#"<map width="1" height="1" tilewidth="16" tileheight="16">
 <tileset firstgid="1" name="k" tilewidth="16" tileheight="16"><image source="keyed.png" trans="ff00ff"/></tileset>
</map>"#,
        );
        let doc = parse_map_file(&path).expect("parse");
        let image = doc.tilesets().get(0).expect("tileset").image();
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(3, 3).0, [10, 20, 30, 255]);
    }

    #[test]
    fn color_parsing_handles_alpha_prefix() {
        assert_eq!(parse_color("#ff000080"), Some(Rgba([0, 0, 0x80, 0xff])));
        assert_eq!(parse_color("0a0b0c"), Some(Rgba([10, 11, 12, 255])));
        assert_eq!(parse_color("#12345"), None);
    }
}
