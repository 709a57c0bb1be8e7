use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use thiserror::Error;
use tracing::{debug, info};

use crate::tiled::{parse_map_file, MapDocument, MapParseError};

/// Stands in for alpha in sheets saved without an alpha channel.
pub const COLOR_KEY: Rgba<u8> = Rgba([255, 0, 255, 255]);

const GRAPHIC_EXTENSIONS: &[&str] = &["png", "jpg", "bmp"];
const MUSIC_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "mdi"];
const SOUND_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg"];
const FONT_EXTENSIONS: &[&str] = &["ttf"];
const MAP_EXTENSIONS: &[&str] = &["tmx"];

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to list asset directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no map registered under '{key}'")]
    MissingMap { key: String },
    #[error(transparent)]
    Map(#[from] MapParseError),
}

/// Every asset the game ships with, keyed by file stem. Graphics are decoded up front;
/// audio, fonts, and maps are kept as paths.
#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    graphics: HashMap<String, RgbaImage>,
    music: HashMap<String, PathBuf>,
    sounds: HashMap<String, PathBuf>,
    fonts: HashMap<String, PathBuf>,
    maps: HashMap<String, PathBuf>,
}

impl AssetBundle {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scans `resources/{graphics,music,sound,fonts,tmx}`. Missing directories are empty.
    pub fn load(resources_dir: &Path) -> Result<Self, AssetError> {
        let mut graphics = HashMap::new();
        for (key, path) in list_assets(&resources_dir.join("graphics"), GRAPHIC_EXTENSIONS)? {
            graphics.insert(key, load_graphic(&path)?);
        }
        let bundle = Self {
            graphics,
            music: list_assets(&resources_dir.join("music"), MUSIC_EXTENSIONS)?
                .into_iter()
                .collect(),
            sounds: list_assets(&resources_dir.join("sound"), SOUND_EXTENSIONS)?
                .into_iter()
                .collect(),
            fonts: list_assets(&resources_dir.join("fonts"), FONT_EXTENSIONS)?
                .into_iter()
                .collect(),
            maps: list_assets(&resources_dir.join("tmx"), MAP_EXTENSIONS)?
                .into_iter()
                .collect(),
        };
        info!(
            resources_dir = %resources_dir.display(),
            graphics = bundle.graphics.len(),
            music = bundle.music.len(),
            sounds = bundle.sounds.len(),
            fonts = bundle.fonts.len(),
            maps = bundle.maps.len(),
            "assets_loaded"
        );
        Ok(bundle)
    }

    pub fn graphic(&self, key: &str) -> Option<&RgbaImage> {
        self.graphics.get(key)
    }

    pub fn music(&self, key: &str) -> Option<&Path> {
        self.music.get(key).map(PathBuf::as_path)
    }

    pub fn sound(&self, key: &str) -> Option<&Path> {
        self.sounds.get(key).map(PathBuf::as_path)
    }

    pub fn font(&self, key: &str) -> Option<&Path> {
        self.fonts.get(key).map(PathBuf::as_path)
    }

    pub fn map(&self, key: &str) -> Option<&Path> {
        self.maps.get(key).map(PathBuf::as_path)
    }

    pub fn load_map(&self, key: &str) -> Result<MapDocument, AssetError> {
        let path = self.map(key).ok_or_else(|| AssetError::MissingMap {
            key: key.to_string(),
        })?;
        Ok(parse_map_file(path)?)
    }

    pub fn with_graphic(mut self, key: impl Into<String>, image: RgbaImage) -> Self {
        self.graphics.insert(key.into(), image);
        self
    }

    pub fn with_music(mut self, key: impl Into<String>, path: PathBuf) -> Self {
        self.music.insert(key.into(), path);
        self
    }

    pub fn with_sound(mut self, key: impl Into<String>, path: PathBuf) -> Self {
        self.sounds.insert(key.into(), path);
        self
    }

    pub fn with_map(mut self, key: impl Into<String>, path: PathBuf) -> Self {
        self.maps.insert(key.into(), path);
        self
    }
}

fn list_assets(dir: &Path, extensions: &[&str]) -> Result<Vec<(String, PathBuf)>, AssetError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "asset_dir_missing");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(AssetError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| AssetError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let Some(extension) = extension else {
            continue;
        };
        if !extensions.contains(&extension.as_str()) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            found.push((stem.to_string(), path.clone()));
        }
    }
    found.sort();
    Ok(found)
}

fn load_graphic(path: &Path) -> Result<RgbaImage, AssetError> {
    let decoded = image::open(path).map_err(|source| AssetError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let has_alpha = decoded.color().has_alpha();
    let mut image = decoded.to_rgba8();
    if !has_alpha {
        for pixel in image.pixels_mut() {
            if *pixel == COLOR_KEY {
                pixel.0[3] = 0;
            }
        }
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn load_scans_each_category_by_file_stem() {
        let temp = TempDir::new().expect("temp");
        let root = temp.path();
        for dir in ["graphics", "music", "sound", "tmx"] {
            fs::create_dir_all(root.join(dir)).expect("mkdir");
        }
        let mut sheet = RgbImage::from_pixel(2, 1, Rgb([255, 0, 255]));
        sheet.put_pixel(1, 0, Rgb([10, 20, 30]));
        sheet.save(root.join("graphics").join("player.png")).expect("png");
        fs::write(root.join("music").join("town_theme.ogg"), b"").expect("music");
        fs::write(root.join("music").join("notes.txt"), b"").expect("notes");
        fs::write(root.join("sound").join("click.wav"), b"").expect("sound");
        fs::write(root.join("tmx").join("town.tmx"), b"<map/>").expect("tmx");

        let bundle = AssetBundle::load(root).expect("load");
        let player = bundle.graphic("player").expect("player");
        assert_eq!(player.get_pixel(0, 0).0[3], 0);
        assert_eq!(player.get_pixel(1, 0).0, [10, 20, 30, 255]);
        assert!(bundle.music("town_theme").is_some());
        assert!(bundle.music("notes").is_none());
        assert!(bundle.sound("click").is_some());
        assert!(bundle.font("anything").is_none());

        let town = bundle.load_map("town").expect("town map");
        assert_eq!(town.width(), 0);
    }

    #[test]
    fn images_with_alpha_keep_magenta() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("graphics");
        fs::create_dir_all(&path).expect("mkdir");
        RgbaImage::from_pixel(1, 1, COLOR_KEY)
            .save(path.join("keyed.png"))
            .expect("png");

        let bundle = AssetBundle::load(temp.path()).expect("load");
        assert_eq!(bundle.graphic("keyed").expect("keyed").get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn missing_map_key_is_reported() {
        let err = AssetBundle::empty().load_map("castle").expect_err("missing");
        assert!(matches!(err, AssetError::MissingMap { ref key } if key == "castle"));
    }
}
