use std::collections::{BTreeMap, BTreeSet};

use crown_engine::{SaveError, SaveFile};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::actor::Direction;
use super::scene_id::SceneId;

pub(crate) const GOLD: &str = "GOLD";
pub(crate) const ELIXIR: &str = "ELIXIR";
pub(crate) const HEALING_POTION: &str = "Healing Potion";
pub(crate) const ETHER_POTION: &str = "Ether Potion";
pub(crate) const FIRE_BLAST: &str = "Fire Blast";
pub(crate) const CURE: &str = "Cure";

pub(crate) const WEAPONS: [&str; 2] = ["Rapier", "Long Sword"];
pub(crate) const ARMOR: [&str; 2] = ["Chain Mail", "Wooden Shield"];
pub(crate) const SPELLS: [&str; 2] = [CURE, FIRE_BLAST];
pub(crate) const POTIONS: [&str; 2] = [HEALING_POTION, ETHER_POTION];

/// Gold found in chests or handed out by NPCs.
const GOLD_GIFT: u32 = 100;
const POTION_VALUE: u32 = 15;
const FIRE_BLAST_MAGIC_POINTS: i32 = 40;
const FIRE_BLAST_POWER: i32 = 15;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Item {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) quantity: Option<u32>,
    pub(crate) value: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) power: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) magic_points: Option<i32>,
}

impl Item {
    pub(crate) fn stack(quantity: u32, value: u32) -> Self {
        Self {
            quantity: Some(quantity),
            value,
            ..Self::default()
        }
    }

    pub(crate) fn with_power(mut self, power: i32) -> Self {
        self.power = Some(power);
        self
    }

    pub(crate) fn spell(magic_points: i32, power: i32) -> Self {
        Self {
            quantity: None,
            value: 0,
            power: Some(power),
            magic_points: Some(magic_points),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Inventory {
    pub(crate) items: BTreeMap<String, Item>,
    pub(crate) equipped_weapon: Option<String>,
    pub(crate) equipped_armor: Vec<String>,
}

impl Default for Inventory {
    fn default() -> Self {
        let mut items = BTreeMap::new();
        items.insert(GOLD.to_string(), Item::stack(100, 0));
        items.insert(HEALING_POTION.to_string(), Item::stack(2, POTION_VALUE));
        items.insert(ETHER_POTION.to_string(), Item::stack(1, POTION_VALUE));
        items.insert("Rapier".to_string(), Item::stack(1, 50).with_power(9));
        Self {
            items,
            equipped_weapon: Some("Rapier".to_string()),
            equipped_armor: Vec::new(),
        }
    }
}

impl Inventory {
    pub(crate) fn gold(&self) -> u32 {
        self.quantity(GOLD)
    }

    pub(crate) fn add_gold(&mut self, amount: u32) {
        let entry = self
            .items
            .entry(GOLD.to_string())
            .or_insert_with(|| Item::stack(0, 0));
        entry.quantity = Some(entry.quantity.unwrap_or(0) + amount);
    }

    /// Leaves the purse untouched and returns false when it holds less than `amount`.
    pub(crate) fn spend_gold(&mut self, amount: u32) -> bool {
        let gold = self.gold();
        if gold < amount {
            return false;
        }
        if let Some(entry) = self.items.get_mut(GOLD) {
            entry.quantity = Some(gold - amount);
        }
        true
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    pub(crate) fn quantity(&self, name: &str) -> u32 {
        self.items
            .get(name)
            .and_then(|item| item.quantity)
            .unwrap_or(0)
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, item: Item) {
        self.items.insert(name.into(), item);
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Item> {
        self.items.remove(name)
    }

    /// Uses up one of a stacked item, dropping the entry when the stack runs out.
    pub(crate) fn take_one(&mut self, name: &str) -> bool {
        let Some(item) = self.items.get_mut(name) else {
            return false;
        };
        match item.quantity {
            Some(quantity) if quantity > 1 => {
                item.quantity = Some(quantity - 1);
            }
            _ => {
                self.items.remove(name);
            }
        }
        true
    }

    pub(crate) fn toggle_armor(&mut self, name: &str) {
        if let Some(position) = self.equipped_armor.iter().position(|armor| armor == name) {
            self.equipped_armor.remove(position);
        } else {
            self.equipped_armor.push(name.to_string());
        }
    }

    pub(crate) fn weapon_power(&self) -> i32 {
        self.equipped_weapon
            .as_deref()
            .and_then(|weapon| self.items.get(weapon))
            .and_then(|item| item.power)
            .unwrap_or(0)
    }

    pub(crate) fn armor_power(&self) -> i32 {
        self.equipped_armor
            .iter()
            .filter_map(|armor| self.items.get(armor))
            .filter_map(|item| item.power)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Meter {
    pub(crate) current: i32,
    pub(crate) maximum: i32,
}

impl Meter {
    pub(crate) const fn full(maximum: i32) -> Self {
        Self {
            current: maximum,
            maximum,
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.current >= self.maximum
    }

    pub(crate) fn restore(&mut self, amount: i32) {
        self.current = (self.current + amount).min(self.maximum);
    }

    pub(crate) fn drain(&mut self, amount: i32) {
        self.current = (self.current - amount).max(0);
    }

    pub(crate) fn refill(&mut self) {
        self.current = self.maximum;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct PlayerStats {
    pub(crate) health: Meter,
    pub(crate) magic: Meter,
    pub(crate) level: u32,
    pub(crate) experience_to_next_level: i32,
    pub(crate) attack_points: i32,
    pub(crate) defense_points: i32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            health: Meter::full(70),
            magic: Meter::full(70),
            level: 1,
            experience_to_next_level: 30,
            attack_points: 10,
            defense_points: 10,
        }
    }
}

/// Everything the player carries between scenes. Moved from scene to scene by the
/// controller, and written to disk by the inn and the death scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GameData {
    pub(crate) last_location: Option<(i32, i32)>,
    pub(crate) last_state: Option<SceneId>,
    pub(crate) last_direction: Direction,
    pub(crate) king_item: String,
    pub(crate) brother_item: String,
    pub(crate) player_inventory: Inventory,
    pub(crate) player_stats: PlayerStats,
    pub(crate) looted_chests: BTreeSet<i64>,
    pub(crate) talked_to_king: bool,
    pub(crate) talked_to_sick_brother: bool,
    pub(crate) has_brother_elixir: bool,
    pub(crate) elixir_received: bool,
    pub(crate) old_man_gift: Option<String>,
    pub(crate) battle_type: Option<String>,
    pub(crate) crown_quest: bool,
    pub(crate) delivered_crown: bool,
}

impl Default for GameData {
    fn default() -> Self {
        Self {
            last_location: None,
            last_state: None,
            last_direction: Direction::Down,
            king_item: GOLD.to_string(),
            brother_item: ELIXIR.to_string(),
            player_inventory: Inventory::default(),
            player_stats: PlayerStats::default(),
            looted_chests: BTreeSet::new(),
            talked_to_king: false,
            talked_to_sick_brother: false,
            has_brother_elixir: false,
            elixir_received: false,
            old_man_gift: None,
            battle_type: None,
            crown_quest: false,
            delivered_crown: false,
        }
    }
}

impl GameData {
    pub(crate) fn load(save: &SaveFile) -> Result<Self, SaveError> {
        save.read_json()
    }

    pub(crate) fn store(&self, save: &SaveFile) -> Result<(), SaveError> {
        save.write_json(self)
    }

    pub(crate) fn chest_looted(&self, id: i64) -> bool {
        self.looted_chests.contains(&id)
    }

    /// Puts an item handed over by an NPC or found in a chest into the inventory. Gold
    /// comes in piles of 100; other stacks grow by one.
    pub(crate) fn grant_item(&mut self, item: &str) {
        let inventory = &mut self.player_inventory;
        if item == GOLD {
            inventory.add_gold(GOLD_GIFT);
        } else if let Some(existing) = inventory.items.get_mut(item) {
            if let Some(quantity) = existing.quantity {
                existing.quantity = Some(quantity + 1);
            }
        } else if POTIONS.contains(&item) {
            inventory.insert(item, Item::stack(1, POTION_VALUE));
        } else if item == ELIXIR {
            inventory.insert(item, Item::stack(1, 0));
        } else if item == FIRE_BLAST {
            inventory.insert(item, Item::spell(FIRE_BLAST_MAGIC_POINTS, FIRE_BLAST_POWER));
        } else {
            debug!(item, "item_not_collectable");
        }
    }
}
