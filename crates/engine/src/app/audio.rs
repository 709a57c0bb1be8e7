use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::assets::AssetBundle;

/// A looped background track and the volume to play it at.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicCue {
    pub title: String,
    pub volume: f32,
}

impl MusicCue {
    pub fn new(title: impl Into<String>, volume: f32) -> Self {
        Self {
            title: title.into(),
            volume,
        }
    }
}

pub trait AudioSink {
    fn play_music(&mut self, cue: &MusicCue);
    fn stop_music(&mut self);
    fn play_sound(&mut self, key: &str);
}

/// Resolves keys through the asset bundle and logs playback. No mixer is attached.
#[derive(Debug)]
pub struct LoggingAudio {
    assets: Rc<AssetBundle>,
    current: Option<MusicCue>,
    warned: HashSet<String>,
}

impl LoggingAudio {
    pub fn new(assets: Rc<AssetBundle>) -> Self {
        Self {
            assets,
            current: None,
            warned: HashSet::new(),
        }
    }

    pub fn current_music(&self) -> Option<&MusicCue> {
        self.current.as_ref()
    }

    fn warn_missing_once(&mut self, kind: &'static str, key: &str) {
        if self.warned.insert(format!("{kind}:{key}")) {
            warn!(kind, key, "audio_asset_missing");
        }
    }
}

impl AudioSink for LoggingAudio {
    fn play_music(&mut self, cue: &MusicCue) {
        match self.assets.music(&cue.title) {
            Some(path) => info!(
                title = %cue.title,
                volume = cue.volume,
                path = %path.display(),
                "music_started"
            ),
            None => self.warn_missing_once("music", &cue.title),
        }
        self.current = Some(cue.clone());
    }

    fn stop_music(&mut self) {
        if let Some(cue) = self.current.take() {
            debug!(title = %cue.title, "music_stopped");
        }
    }

    fn play_sound(&mut self, key: &str) {
        match self.assets.sound(key) {
            Some(path) => debug!(key, path = %path.display(), "sound_played"),
            None => self.warn_missing_once("sound", key),
        }
    }
}
