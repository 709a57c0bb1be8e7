use crown_engine::{EventQueue, InputAction, Rect};
use image::RgbaImage;
use tracing::debug;

use super::game_data::{
    GameData, Inventory, Meter, ARMOR, CURE, ETHER_POTION, HEALING_POTION, POTIONS, SPELLS, WEAPONS,
};
use super::painter::{panel, selection_marker};

pub(crate) const CLICK: &str = "click";
pub(crate) const CLICK2: &str = "click2";
pub(crate) const POWER_UP: &str = "power_up";
const POTION_STRENGTH: i32 = 30;
const CURE_MAGIC_POINTS: i32 = 25;
const CURE_POWER: i32 = 50;

const SELECT_PANEL: Rect = Rect::new(0, 408, 200, 200);
const INFO_PANEL: Rect = Rect::new(200, 0, 600, 608);
const GOLD_PANEL: Rect = Rect::new(0, 0, 200, 408);
const SELECT_ENTRIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Select,
    Items,
    Magic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfoPane {
    Hidden,
    Items,
    Magic,
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MenuOutcome {
    Open,
    Closed,
}

/// The pause menu opened with Return on a level: items, magic, and stats.
#[derive(Debug, Clone)]
pub(crate) struct PlayerMenu {
    focus: Focus,
    pane: InfoPane,
    cursor: usize,
}

impl Default for PlayerMenu {
    fn default() -> Self {
        Self {
            focus: Focus::Select,
            pane: InfoPane::Hidden,
            cursor: 0,
        }
    }
}

impl PlayerMenu {
    pub(crate) fn handle(&mut self, action: InputAction, data: &mut GameData, events: &mut EventQueue) -> MenuOutcome {
        match action {
            InputAction::Down => {
                if self.cursor + 1 < self.entry_count(&data.player_inventory) {
                    events.play_sound(CLICK);
                    self.cursor += 1;
                }
            }
            InputAction::Up => {
                if self.cursor > 0 {
                    events.play_sound(CLICK);
                    self.cursor -= 1;
                }
            }
            InputAction::Right => {
                let target = match self.pane {
                    InfoPane::Items => Some(Focus::Items),
                    InfoPane::Magic => Some(Focus::Magic),
                    _ => None,
                };
                if let Some(target) = target {
                    if self.focus != target {
                        events.play_sound(CLICK);
                        self.cursor = 0;
                    }
                    self.focus = target;
                }
            }
            InputAction::Left => {
                events.play_sound(CLICK);
                self.focus = Focus::Select;
                self.cursor = 0;
            }
            InputAction::Select => {
                events.play_sound(CLICK2);
                match self.focus {
                    Focus::Select => self.open_pane(),
                    Focus::Items => self.use_item(data, events),
                    Focus::Magic => self.cast_spell(data, events),
                }
            }
            InputAction::Confirm => {
                *self = Self::default();
                return MenuOutcome::Closed;
            }
            InputAction::Quit => {}
        }
        MenuOutcome::Open
    }

    fn entry_count(&self, inventory: &Inventory) -> usize {
        match self.focus {
            Focus::Select => SELECT_ENTRIES,
            Focus::Items => item_entries(inventory).len(),
            Focus::Magic => spell_entries(inventory).len(),
        }
    }

    fn open_pane(&mut self) {
        match self.cursor {
            0 => {
                self.pane = InfoPane::Items;
                self.focus = Focus::Items;
                self.cursor = 0;
            }
            1 => {
                self.pane = InfoPane::Magic;
                self.focus = Focus::Magic;
                self.cursor = 0;
            }
            _ => self.pane = InfoPane::Stats,
        }
    }

    fn use_item(&mut self, data: &mut GameData, events: &mut EventQueue) {
        let entries = item_entries(&data.player_inventory);
        let Some(name) = entries.get(self.cursor) else {
            return;
        };
        let stats = &mut data.player_stats;
        let inventory = &mut data.player_inventory;
        match name.as_str() {
            HEALING_POTION => drink(inventory, HEALING_POTION, &mut stats.health, events),
            ETHER_POTION => drink(inventory, ETHER_POTION, &mut stats.magic, events),
            weapon if WEAPONS.contains(&weapon) => {
                inventory.equipped_weapon = Some(weapon.to_string());
            }
            armor if ARMOR.contains(&armor) => inventory.toggle_armor(armor),
            _ => {}
        }
        let remaining = item_entries(inventory).len();
        if self.cursor >= remaining {
            self.cursor = remaining.saturating_sub(1);
        }
    }

    fn cast_spell(&mut self, data: &mut GameData, events: &mut EventQueue) {
        let entries = spell_entries(&data.player_inventory);
        if entries.get(self.cursor).map(String::as_str) != Some(CURE) {
            return;
        }
        let (cost, power) = data
            .player_inventory
            .get(CURE)
            .map(|spell| {
                (
                    spell.magic_points.unwrap_or(CURE_MAGIC_POINTS),
                    spell.power.unwrap_or(CURE_POWER),
                )
            })
            .unwrap_or((CURE_MAGIC_POINTS, CURE_POWER));
        let stats = &mut data.player_stats;
        if !stats.health.is_full() && stats.magic.current >= cost {
            events.play_sound(POWER_UP);
            stats.magic.drain(cost);
            stats.health.restore(power);
            debug!(health = stats.health.current, magic = stats.magic.current, "cure_cast");
        }
    }

    pub(crate) fn draw(&self, frame: &mut RgbaImage) {
        panel(frame, GOLD_PANEL);
        panel(frame, SELECT_PANEL);
        if self.pane != InfoPane::Hidden {
            panel(frame, INFO_PANEL);
        }
        match self.focus {
            Focus::Select => selection_marker(frame, SELECT_PANEL, self.cursor, 45),
            Focus::Items | Focus::Magic => selection_marker(frame, INFO_PANEL, self.cursor, 50),
        }
    }
}

fn drink(inventory: &mut Inventory, potion: &str, meter: &mut Meter, events: &mut EventQueue) {
    if meter.is_full() || !inventory.take_one(potion) {
        return;
    }
    events.play_sound(POWER_UP);
    meter.restore(POTION_STRENGTH);
}

/// Weapons, then armor, then potions, in shop order.
pub(crate) fn item_entries(inventory: &Inventory) -> Vec<String> {
    WEAPONS
        .iter()
        .chain(ARMOR.iter())
        .chain(POTIONS.iter())
        .filter(|name| inventory.contains(name))
        .map(|name| name.to_string())
        .collect()
}

pub(crate) fn spell_entries(inventory: &Inventory) -> Vec<String> {
    let mut spells: Vec<String> = SPELLS
        .iter()
        .filter(|name| inventory.contains(name))
        .map(|name| name.to_string())
        .collect();
    spells.sort();
    spells
}

#[cfg(test)]
mod tests {
    use crown_engine::GameEvent;

    use super::*;
    use crate::app::gameplay::game_data::{Item, FIRE_BLAST};

    fn press(menu: &mut PlayerMenu, data: &mut GameData, actions: &[InputAction]) -> Vec<GameEvent> {
        let mut events = EventQueue::new();
        for action in actions {
            menu.handle(*action, data, &mut events);
        }
        events.drain().collect()
    }

    #[test]
    fn healing_potion_only_works_when_hurt() {
        let mut data = GameData::default();
        let mut menu = PlayerMenu::default();
        press(&mut menu, &mut data, &[InputAction::Select]);

        let entries = item_entries(&data.player_inventory);
        assert_eq!(entries, vec!["Rapier", HEALING_POTION, ETHER_POTION]);
        press(&mut menu, &mut data, &[InputAction::Down, InputAction::Select]);
        assert_eq!(data.player_inventory.quantity(HEALING_POTION), 2);

        data.player_stats.health.current = 20;
        let events = press(&mut menu, &mut data, &[InputAction::Select]);
        assert_eq!(data.player_stats.health.current, 50);
        assert_eq!(data.player_inventory.quantity(HEALING_POTION), 1);
        assert!(events.contains(&GameEvent::PlaySound(POWER_UP.to_string())));
    }

    #[test]
    fn last_potion_leaves_the_inventory() {
        let mut data = GameData::default();
        data.player_stats.magic.current = 60;
        let mut menu = PlayerMenu::default();
        press(
            &mut menu,
            &mut data,
            &[InputAction::Select, InputAction::Down, InputAction::Down, InputAction::Select],
        );
        assert_eq!(data.player_stats.magic.current, 70);
        assert!(!data.player_inventory.contains(ETHER_POTION));
    }

    #[test]
    fn equipping_switches_weapon_and_toggles_armor() {
        let mut data = GameData::default();
        data.player_inventory.insert("Long Sword", Item::stack(1, 150).with_power(11));
        data.player_inventory.insert("Chain Mail", Item::stack(1, 50).with_power(2));
        let mut menu = PlayerMenu::default();

        press(&mut menu, &mut data, &[InputAction::Select, InputAction::Down, InputAction::Select]);
        assert_eq!(data.player_inventory.equipped_weapon.as_deref(), Some("Long Sword"));
        assert_eq!(data.player_inventory.weapon_power(), 11);

        press(&mut menu, &mut data, &[InputAction::Down, InputAction::Select]);
        assert!(data.player_inventory.equipped_armor.contains(&"Chain Mail".to_string()));
        press(&mut menu, &mut data, &[InputAction::Select]);
        assert!(!data.player_inventory.equipped_armor.contains(&"Chain Mail".to_string()));
    }

    #[test]
    fn cure_costs_magic_and_clamps_health() {
        let mut data = GameData::default();
        data.player_inventory.insert(CURE, Item::spell(25, 50));
        data.player_inventory.insert(FIRE_BLAST, Item::spell(40, 15));
        data.player_stats.health.current = 40;
        let mut menu = PlayerMenu::default();

        press(&mut menu, &mut data, &[InputAction::Down, InputAction::Select, InputAction::Select]);

        assert_eq!(data.player_stats.health.current, 70);
        assert_eq!(data.player_stats.magic.current, 45);
    }

    #[test]
    fn return_closes_and_resets() {
        let mut data = GameData::default();
        let mut menu = PlayerMenu::default();
        let mut events = EventQueue::new();
        menu.handle(InputAction::Select, &mut data, &mut events);
        assert_eq!(menu.handle(InputAction::Confirm, &mut data, &mut events), MenuOutcome::Closed);
        assert_eq!(menu.focus, Focus::Select);
        assert_eq!(menu.pane, InfoPane::Hidden);
    }
}
