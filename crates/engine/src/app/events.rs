use std::collections::VecDeque;

use super::audio::MusicCue;

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PlaySound(String),
    PlayMusic(MusicCue),
    StopMusic,
}

/// Events raised by scenes during a tick. The controller drains the queue once per tick.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<GameEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: GameEvent) {
        self.pending.push_back(event);
    }

    pub fn play_sound(&mut self, key: impl Into<String>) {
        self.push(GameEvent::PlaySound(key.into()));
    }

    pub fn play_music(&mut self, title: impl Into<String>, volume: f32) {
        self.push(GameEvent::PlayMusic(MusicCue::new(title, volume)));
    }

    pub fn stop_music(&mut self) {
        self.push(GameEvent::StopMusic);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.pending.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_yields_in_push_order_and_empties() {
        let mut queue = EventQueue::new();
        queue.play_sound("click");
        queue.play_music("town_theme", 0.4);
        queue.stop_music();
        assert_eq!(queue.len(), 3);

        let drained: Vec<GameEvent> = queue.drain().collect();
        assert_eq!(
            drained,
            vec![
                GameEvent::PlaySound("click".to_string()),
                GameEvent::PlayMusic(MusicCue::new("town_theme", 0.4)),
                GameEvent::StopMusic,
            ]
        );
        assert!(queue.is_empty());
    }
}
