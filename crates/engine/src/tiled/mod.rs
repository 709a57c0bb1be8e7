//! Loading and drawing maps in the Tiled TMX format.

mod document;
mod gid;
mod parser;
mod properties;
mod rects;
mod render;
mod tileset;

pub use document::{
    ImageLayer, Layer, LayerError, LayerInfo, MapDocument, MapObject, ObjectLayer, TileLayer,
};
pub use gid::{decode_gid, encode_gid, TileFlags, GID_FLIP_X, GID_FLIP_Y, GID_MASK, GID_ROTATE};
pub use parser::{
    parse_color, parse_map_file, parse_map_str, MapErrorCode, MapParseError, SourceLocation,
};
pub use properties::{
    attribute_kind, coerce_attribute, handle_bool, AttributeKind, Properties, PropertyError,
    PropertyValue,
};
pub use rects::{distribution_rects, merge_points};
pub use render::{composite, render, render_2x, render_with_report, transformed_tile, RenderReport};
pub use tileset::{ResolvedTile, TileSet, TileSetError, TileSetRegistry};
