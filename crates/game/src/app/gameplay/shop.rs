use std::rc::Rc;

use crown_engine::app::rendering::draw;
use crown_engine::{
    AssetBundle, EventQueue, InputAction, InputSnapshot, KeyEvent, MusicCue, Rect, SaveFile, Scene,
    SceneStatus,
};
use image::{Rgba, RgbaImage};
use tracing::{debug, error, info};

use super::game_data::{GameData, Inventory, Item, ARMOR, WEAPONS};
use super::painter::{panel, selection_marker, Painter};
use super::player_menu::{CLICK, CLICK2};
use super::scene_id::SceneId;
use super::transition::{Fade, TRANSITION_SPEED};

const CLOTH_BELT: &str = "cloth_belt";
const BLACK_BLUE: Rgba<u8> = Rgba([19, 15, 48, 255]);
const DIALOGUE_PANEL: Rect = Rect::new(0, 438, 600, 170);
const CHOICE_PANEL: Rect = Rect::new(600, 438, 200, 170);
const GOLD_PANEL: Rect = Rect::new(600, 0, 200, 100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShopKind {
    Inn,
    Weapon,
    Armor,
    Magic,
    Potion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Merchandise {
    Room,
    Weapon,
    Armor,
    Spell,
    Potion,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ShopItem {
    pub(crate) name: &'static str,
    pub(crate) kind: Merchandise,
    pub(crate) price: u32,
    pub(crate) quantity: u32,
    pub(crate) power: Option<i32>,
    pub(crate) magic_points: Option<i32>,
}

impl ShopItem {
    const fn new(name: &'static str, kind: Merchandise, price: u32, power: Option<i32>) -> Self {
        Self {
            name,
            kind,
            price,
            quantity: 1,
            power,
            magic_points: None,
        }
    }

    pub(crate) fn label(&self) -> String {
        match self.kind {
            Merchandise::Room => format!("Rent a room ({} gold)", self.price),
            _ => format!("{} ({} gold)", self.name, self.price),
        }
    }
}

impl ShopKind {
    pub(crate) fn scene(self) -> SceneId {
        match self {
            ShopKind::Inn => SceneId::Inn,
            ShopKind::Weapon => SceneId::WeaponShop,
            ShopKind::Armor => SceneId::ArmorShop,
            ShopKind::Magic => SceneId::MagicShop,
            ShopKind::Potion => SceneId::PotionShop,
        }
    }

    fn title(self) -> &'static str {
        match self {
            ShopKind::Inn => "Inn",
            ShopKind::Weapon => "Weapon Shop",
            ShopKind::Armor => "Armor Shop",
            ShopKind::Magic => "Magic Shop",
            ShopKind::Potion => "Potion Shop",
        }
    }

    pub(crate) fn keeper_sheet(self) -> &'static str {
        match self {
            ShopKind::Inn => "innman",
            ShopKind::Weapon => "weaponman",
            ShopKind::Armor => "armorman",
            ShopKind::Magic => "magiclady",
            ShopKind::Potion => "potionlady",
        }
    }

    /// The Inn and the magic shop only sell to the player.
    pub(crate) fn buys_back(self) -> bool {
        !matches!(self, ShopKind::Inn | ShopKind::Magic)
    }

    pub(crate) fn greeting(self) -> Vec<String> {
        let question = match self {
            ShopKind::Inn => "Would you like a room to restore your health?",
            ShopKind::Weapon => "What weapon would you like to buy?",
            ShopKind::Armor => "Would piece of armor would you like to buy?",
            ShopKind::Magic => "Would magic spell would you like to buy?",
            ShopKind::Potion => "What potion would you like to buy?",
        };
        vec![format!("Welcome to the {}!", self.title()), question.to_string()]
    }

    fn accept_line(self) -> &'static str {
        match self {
            ShopKind::Inn => "Your health has been replenished and your game saved!",
            _ => "Item purchased.",
        }
    }

    pub(crate) fn items(self) -> Vec<ShopItem> {
        match self {
            ShopKind::Inn => vec![ShopItem {
                quantity: 0,
                ..ShopItem::new("room", Merchandise::Room, 30, None)
            }],
            ShopKind::Weapon => vec![
                ShopItem::new("Rapier", Merchandise::Weapon, 50, Some(9)),
                ShopItem::new("Long Sword", Merchandise::Weapon, 150, Some(11)),
            ],
            ShopKind::Armor => vec![
                ShopItem::new("Chain Mail", Merchandise::Armor, 50, Some(2)),
                ShopItem::new("Wooden Shield", Merchandise::Armor, 75, Some(3)),
            ],
            ShopKind::Magic => vec![
                ShopItem {
                    magic_points: Some(25),
                    ..ShopItem::new("Cure", Merchandise::Spell, 50, Some(50))
                },
                ShopItem {
                    magic_points: Some(40),
                    ..ShopItem::new("Fire Blast", Merchandise::Spell, 150, Some(15))
                },
            ],
            ShopKind::Potion => vec![
                ShopItem::new("Healing Potion", Merchandise::Potion, 15, None),
                ShopItem::new("Ether Potion", Merchandise::Potion, 15, None),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShopState {
    Dialogue,
    Select,
    ConfirmPurchase,
    ConfirmSell,
    Reject,
    Accept,
    AcceptSell,
    HasItem,
    BuySell,
    Sell,
    CantSell,
    CantSellEquippedWeapon,
    CantSellEquippedArmor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShopSignal {
    None,
    Leave,
    SaveGame,
}

/// The counter conversation: greeting, buy and sell menus, confirmations.
#[derive(Debug, Clone)]
pub(crate) struct ShopGui {
    kind: ShopKind,
    items: Vec<ShopItem>,
    greeting: Vec<String>,
    state: ShopState,
    line: usize,
    cursor: usize,
    purchase: Option<usize>,
    sale: Option<usize>,
}

impl ShopGui {
    pub(crate) fn new(kind: ShopKind) -> Self {
        Self {
            kind,
            items: kind.items(),
            greeting: kind.greeting(),
            state: ShopState::Dialogue,
            line: 0,
            cursor: 0,
            purchase: None,
            sale: None,
        }
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn prompt(&self) -> &str {
        match self.state {
            ShopState::Dialogue => self.greeting.get(self.line).map_or("", String::as_str),
            ShopState::Select => self.greeting.last().map_or("", String::as_str),
            ShopState::ConfirmPurchase | ShopState::ConfirmSell => "Are you sure?",
            ShopState::Reject => "You don't have enough gold!",
            ShopState::Accept => self.kind.accept_line(),
            ShopState::AcceptSell => "Item sold.",
            ShopState::HasItem => "You have that item already.",
            ShopState::BuySell => "Would you like to buy or sell an item?",
            ShopState::Sell => "What would you like to sell?",
            ShopState::CantSell => "You don't have anything to sell!",
            ShopState::CantSellEquippedWeapon => "You can't sell an equipped weapon.",
            ShopState::CantSellEquippedArmor => "You can't sell equipped armor.",
        }
    }

    pub(crate) fn choices(&self, inventory: &Inventory) -> Vec<String> {
        match self.state {
            ShopState::Select => {
                let mut choices: Vec<String> = self.items.iter().map(ShopItem::label).collect();
                choices.push(if self.kind.buys_back() { "Cancel" } else { "Leave" }.to_string());
                choices
            }
            ShopState::ConfirmPurchase | ShopState::ConfirmSell => vec!["Yes".to_string(), "No".to_string()],
            ShopState::BuySell => vec!["Buy".to_string(), "Sell".to_string(), "Leave".to_string()],
            ShopState::Sell => {
                let mut choices: Vec<String> = self
                    .owned_items(inventory)
                    .into_iter()
                    .map(|index| {
                        let item = &self.items[index];
                        format!("{} ({} gold)", item.name, item.price / 2)
                    })
                    .collect();
                choices.push("Cancel".to_string());
                choices
            }
            _ => Vec::new(),
        }
    }

    fn owned_items(&self, inventory: &Inventory) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| inventory.contains(item.name))
            .map(|(index, _)| index)
            .collect()
    }

    fn begin_new_transaction(&self) -> ShopState {
        if self.kind.buys_back() {
            ShopState::BuySell
        } else {
            ShopState::Select
        }
    }

    pub(crate) fn handle(&mut self, action: InputAction, data: &mut GameData, events: &mut EventQueue) -> ShopSignal {
        match action {
            InputAction::Down => {
                let count = self.choices(&data.player_inventory).len();
                if self.cursor + 1 < count {
                    self.cursor += 1;
                    events.play_sound(CLICK);
                }
                ShopSignal::None
            }
            InputAction::Up => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    events.play_sound(CLICK);
                }
                ShopSignal::None
            }
            InputAction::Select => self.select(data, events),
            _ => ShopSignal::None,
        }
    }

    fn select(&mut self, data: &mut GameData, events: &mut EventQueue) -> ShopSignal {
        let choice = std::mem::take(&mut self.cursor);
        match self.state {
            ShopState::Dialogue => {
                self.line += 1;
                if self.line + 1 >= self.greeting.len() {
                    self.state = self.begin_new_transaction();
                }
                events.play_sound(CLICK2);
            }
            ShopState::Select => {
                events.play_sound(CLICK2);
                if choice < self.items.len() {
                    self.purchase = Some(choice);
                    self.state = ShopState::ConfirmPurchase;
                } else if self.kind.buys_back() {
                    self.state = ShopState::BuySell;
                } else {
                    return ShopSignal::Leave;
                }
            }
            ShopState::ConfirmPurchase => {
                if choice == 0 {
                    return self.buy(data, events);
                }
                self.state = self.begin_new_transaction();
                events.play_sound(CLICK2);
            }
            ShopState::ConfirmSell => {
                if choice == 0 {
                    self.sell(data, events);
                } else {
                    self.state = self.begin_new_transaction();
                    events.play_sound(CLICK2);
                }
            }
            ShopState::Reject | ShopState::Accept | ShopState::AcceptSell | ShopState::HasItem => {
                self.state = self.begin_new_transaction();
            }
            ShopState::CantSell | ShopState::CantSellEquippedWeapon | ShopState::CantSellEquippedArmor => {
                self.state = ShopState::BuySell;
            }
            ShopState::BuySell => {
                events.play_sound(CLICK2);
                match choice {
                    0 => self.state = ShopState::Select,
                    1 if self.owned_items(&data.player_inventory).is_empty() => self.state = ShopState::CantSell,
                    1 => self.state = ShopState::Sell,
                    _ => return ShopSignal::Leave,
                }
            }
            ShopState::Sell => {
                events.play_sound(CLICK2);
                match self.owned_items(&data.player_inventory).get(choice) {
                    Some(index) => {
                        self.sale = Some(*index);
                        self.state = ShopState::ConfirmSell;
                    }
                    None => self.state = ShopState::BuySell,
                }
            }
        }
        ShopSignal::None
    }

    fn buy(&mut self, data: &mut GameData, events: &mut EventQueue) -> ShopSignal {
        let Some(item) = self.purchase.take().and_then(|index| self.items.get(index)).cloned() else {
            self.state = self.begin_new_transaction();
            return ShopSignal::None;
        };
        let inventory = &mut data.player_inventory;
        if !inventory.spend_gold(item.price) {
            self.state = ShopState::Reject;
            return ShopSignal::None;
        }
        if inventory.contains(item.name) && self.kind != ShopKind::Potion {
            inventory.add_gold(item.price);
            self.state = ShopState::HasItem;
            return ShopSignal::None;
        }
        events.play_sound(CLOTH_BELT);
        self.state = ShopState::Accept;
        info!(item = item.name, price = item.price, "item_bought");
        add_player_item(data, &item)
    }

    fn sell(&mut self, data: &mut GameData, events: &mut EventQueue) {
        let Some(item) = self.sale.take().and_then(|index| self.items.get(index)).cloned() else {
            self.state = ShopState::BuySell;
            return;
        };
        let inventory = &mut data.player_inventory;
        if WEAPONS.contains(&item.name) && inventory.equipped_weapon.as_deref() == Some(item.name) {
            self.state = ShopState::CantSellEquippedWeapon;
            return;
        }
        if ARMOR.contains(&item.name) && inventory.equipped_armor.iter().any(|armor| armor == item.name) {
            self.state = ShopState::CantSellEquippedArmor;
            return;
        }
        events.play_sound(CLOTH_BELT);
        inventory.add_gold(item.price / 2);
        inventory.take_one(item.name);
        self.state = ShopState::AcceptSell;
        info!(item = item.name, price = item.price / 2, "item_sold");
    }
}

fn add_player_item(data: &mut GameData, item: &ShopItem) -> ShopSignal {
    let inventory = &mut data.player_inventory;
    match item.kind {
        Merchandise::Room => {
            data.player_stats.health.refill();
            data.player_stats.magic.refill();
            return ShopSignal::SaveGame;
        }
        Merchandise::Spell => {
            inventory.insert(
                item.name,
                Item::spell(item.magic_points.unwrap_or_default(), item.power.unwrap_or_default()),
            );
        }
        Merchandise::Weapon | Merchandise::Armor | Merchandise::Potion => {
            if item.kind == Merchandise::Armor {
                inventory.equipped_armor.push(item.name.to_string());
            }
            if item.kind == Merchandise::Weapon {
                inventory.equipped_weapon = Some(item.name.to_string());
            }
            match inventory.items.get_mut(item.name) {
                Some(existing) => {
                    existing.quantity = Some(existing.quantity.unwrap_or(0) + item.quantity);
                }
                None => {
                    let mut stack = Item::stack(item.quantity, item.price);
                    if let Some(power) = item.power {
                        stack = stack.with_power(power);
                    }
                    inventory.insert(item.name, stack);
                }
            }
        }
    }
    ShopSignal::None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    TransitionIn,
    Normal,
    TransitionOut,
}

pub(crate) struct ShopScene {
    kind: ShopKind,
    status: SceneStatus<SceneId>,
    painter: Painter,
    save: SaveFile,
    data: GameData,
    gui: ShopGui,
    stage: Stage,
    fade: Fade,
    pending: Vec<InputAction>,
    shown_prompt: String,
}

impl ShopScene {
    pub(crate) fn new(kind: ShopKind, assets: Rc<AssetBundle>, save: SaveFile) -> Self {
        Self {
            kind,
            status: SceneStatus::default(),
            painter: Painter::new(assets),
            save,
            data: GameData::default(),
            gui: ShopGui::new(kind),
            stage: Stage::TransitionIn,
            fade: Fade::covered(),
            pending: Vec::new(),
            shown_prompt: String::new(),
        }
    }

    fn run_gui(&mut self, events: &mut EventQueue) {
        for action in std::mem::take(&mut self.pending) {
            match self.gui.handle(action, &mut self.data, events) {
                ShopSignal::None => {}
                ShopSignal::Leave => {
                    self.data.last_state = Some(self.kind.scene());
                    self.stage = Stage::TransitionOut;
                    return;
                }
                ShopSignal::SaveGame => {
                    if let Err(err) = self.data.store(&self.save) {
                        error!(error = %err, "inn_save_failed");
                    }
                }
            }
        }
    }

    fn draw(&mut self, frame: &mut RgbaImage) {
        draw::clear(frame, BLACK_BLUE);
        self.painter
            .region_scaled(frame, "player", Rect::new(96, 32, 32, 32), 150, 256, 3);
        self.painter
            .region_scaled(frame, self.kind.keeper_sheet(), Rect::new(32, 32, 32, 32), 600, 256, 3);
        self.painter
            .region_scaled(frame, "house", Rect::new(102, 64, 26, 82), 550, 225, 2);

        panel(frame, DIALOGUE_PANEL);
        panel(frame, GOLD_PANEL);
        let choices = self.gui.choices(&self.data.player_inventory);
        if !choices.is_empty() {
            panel(frame, CHOICE_PANEL);
            selection_marker(frame, CHOICE_PANEL, self.gui.cursor(), 45);
        }

        if self.gui.prompt() != self.shown_prompt {
            self.shown_prompt = self.gui.prompt().to_string();
            debug!(
                prompt = %self.shown_prompt,
                choices = ?choices,
                gold = self.data.player_inventory.gold(),
                "shop_prompt"
            );
        }
    }
}

impl Scene<SceneId, GameData> for ShopScene {
    fn status(&self) -> &SceneStatus<SceneId> {
        &self.status
    }

    fn status_mut(&mut self) -> &mut SceneStatus<SceneId> {
        &mut self.status
    }

    fn startup(&mut self, _now_ms: u64, payload: GameData) {
        self.data = payload;
        self.gui = ShopGui::new(self.kind);
        self.stage = Stage::TransitionIn;
        self.fade = Fade::covered();
        self.pending.clear();
        self.shown_prompt.clear();
    }

    fn handle_key(&mut self, event: KeyEvent) {
        if event.pressed {
            self.pending.push(event.action);
        }
    }

    fn update(&mut self, frame: &mut RgbaImage, _input: &InputSnapshot, _now_ms: u64, events: &mut EventQueue) {
        match self.stage {
            Stage::TransitionIn => {
                self.pending.clear();
                if self.fade.fade_in(TRANSITION_SPEED) {
                    self.stage = Stage::Normal;
                }
            }
            Stage::Normal => self.run_gui(events),
            Stage::TransitionOut => {
                self.pending.clear();
                if self.fade.fade_out(TRANSITION_SPEED) {
                    self.status.switch_to(SceneId::Town);
                }
            }
        }
        self.draw(frame);
        self.fade.draw(frame);
    }

    fn cleanup(&mut self) -> GameData {
        std::mem::take(&mut self.data)
    }

    fn music(&self) -> Option<MusicCue> {
        Some(MusicCue::new("shop_theme", 0.4))
    }
}

#[cfg(test)]
mod tests {
    use crown_engine::GameEvent;
    use tempfile::TempDir;

    use super::*;
    use crate::app::gameplay::game_data::HEALING_POTION;

    fn press(gui: &mut ShopGui, data: &mut GameData, actions: &[InputAction]) -> Vec<ShopSignal> {
        let mut events = EventQueue::new();
        actions
            .iter()
            .map(|action| gui.handle(*action, data, &mut events))
            .collect()
    }

    fn through_greeting(gui: &mut ShopGui, data: &mut GameData) {
        press(gui, data, &[InputAction::Select]);
    }

    #[test]
    fn greeting_leads_to_buy_sell_or_straight_to_the_list() {
        let mut data = GameData::default();
        let mut weapons = ShopGui::new(ShopKind::Weapon);
        assert_eq!(weapons.prompt(), "Welcome to the Weapon Shop!");
        through_greeting(&mut weapons, &mut data);
        assert_eq!(weapons.state, ShopState::BuySell);

        let mut inn = ShopGui::new(ShopKind::Inn);
        through_greeting(&mut inn, &mut data);
        assert_eq!(inn.state, ShopState::Select);
        assert_eq!(
            inn.choices(&data.player_inventory),
            vec!["Rent a room (30 gold)".to_string(), "Leave".to_string()]
        );
    }

    #[test]
    fn buying_a_sword_spends_gold_and_equips_it() {
        let mut data = GameData::default();
        data.player_inventory.add_gold(100);
        let mut gui = ShopGui::new(ShopKind::Weapon);
        through_greeting(&mut gui, &mut data);
        press(
            &mut gui,
            &mut data,
            &[InputAction::Select, InputAction::Down, InputAction::Select, InputAction::Select],
        );

        assert_eq!(gui.state, ShopState::Accept);
        assert_eq!(data.player_inventory.gold(), 50);
        assert_eq!(data.player_inventory.equipped_weapon.as_deref(), Some("Long Sword"));
        assert_eq!(data.player_inventory.weapon_power(), 11);
    }

    #[test]
    fn short_purse_and_duplicates_are_rejected() {
        let mut data = GameData::default();
        let mut gui = ShopGui::new(ShopKind::Weapon);
        through_greeting(&mut gui, &mut data);
        press(
            &mut gui,
            &mut data,
            &[InputAction::Select, InputAction::Down, InputAction::Select, InputAction::Select],
        );
        assert_eq!(gui.state, ShopState::Reject);
        assert_eq!(data.player_inventory.gold(), 100);

        press(&mut gui, &mut data, &[InputAction::Select]);
        assert_eq!(gui.state, ShopState::BuySell);
        press(&mut gui, &mut data, &[InputAction::Select, InputAction::Select, InputAction::Select]);
        assert_eq!(gui.state, ShopState::HasItem);
        assert_eq!(data.player_inventory.gold(), 100);
    }

    #[test]
    fn potions_stack_instead_of_being_refused() {
        let mut data = GameData::default();
        let mut gui = ShopGui::new(ShopKind::Potion);
        through_greeting(&mut gui, &mut data);
        let mut events = EventQueue::new();
        for action in [InputAction::Select, InputAction::Select, InputAction::Select] {
            gui.handle(action, &mut data, &mut events);
        }
        assert_eq!(gui.state, ShopState::Accept);
        assert_eq!(data.player_inventory.quantity(HEALING_POTION), 3);
        assert_eq!(data.player_inventory.gold(), 85);
        assert!(events
            .drain()
            .any(|event| event == GameEvent::PlaySound(CLOTH_BELT.to_string())));
    }

    #[test]
    fn equipped_weapon_cannot_be_sold_but_spare_armor_can() {
        let mut data = GameData::default();
        let mut gui = ShopGui::new(ShopKind::Weapon);
        through_greeting(&mut gui, &mut data);
        press(
            &mut gui,
            &mut data,
            &[InputAction::Down, InputAction::Select, InputAction::Select, InputAction::Select],
        );
        assert_eq!(gui.state, ShopState::CantSellEquippedWeapon);

        data.player_inventory
            .insert("Chain Mail", Item::stack(1, 50).with_power(2));
        let mut armor = ShopGui::new(ShopKind::Armor);
        through_greeting(&mut armor, &mut data);
        assert_eq!(
            {
                press(&mut armor, &mut data, &[InputAction::Down, InputAction::Select]);
                armor.choices(&data.player_inventory)
            },
            vec!["Chain Mail (25 gold)".to_string(), "Cancel".to_string()]
        );
        press(&mut armor, &mut data, &[InputAction::Select, InputAction::Select]);
        assert_eq!(armor.state, ShopState::AcceptSell);
        assert_eq!(data.player_inventory.gold(), 125);
        assert!(!data.player_inventory.contains("Chain Mail"));
    }

    #[test]
    fn nothing_to_sell_is_reported() {
        let mut data = GameData::default();
        let mut gui = ShopGui::new(ShopKind::Armor);
        through_greeting(&mut gui, &mut data);
        press(&mut gui, &mut data, &[InputAction::Down, InputAction::Select]);
        assert_eq!(gui.state, ShopState::CantSell);
        press(&mut gui, &mut data, &[InputAction::Select]);
        assert_eq!(gui.state, ShopState::BuySell);
        let signals = press(&mut gui, &mut data, &[InputAction::Down, InputAction::Down, InputAction::Select]);
        assert_eq!(signals.last(), Some(&ShopSignal::Leave));
    }

    #[test]
    fn inn_room_heals_and_saves() {
        let temp = TempDir::new().expect("temp");
        let save = SaveFile::new(temp.path().join("save.json"));
        let mut scene = ShopScene::new(ShopKind::Inn, Rc::new(AssetBundle::empty()), save.clone());
        let mut data = GameData::default();
        data.player_stats.health.current = 5;
        scene.startup(0, data);

        let mut frame = RgbaImage::new(800, 608);
        let mut events = EventQueue::new();
        for _ in 0..8 {
            scene.update(&mut frame, &InputSnapshot::empty(), 0, &mut events);
        }
        for action in [InputAction::Select, InputAction::Select, InputAction::Select] {
            scene.handle_key(KeyEvent::pressed(action));
        }
        scene.update(&mut frame, &InputSnapshot::empty(), 0, &mut events);

        assert!(save.exists());
        let saved = GameData::load(&save).expect("load");
        assert_eq!(saved.player_stats.health.current, 70);
        assert_eq!(saved.player_inventory.gold(), 70);

        scene.handle_key(KeyEvent::pressed(InputAction::Select));
        scene.handle_key(KeyEvent::pressed(InputAction::Down));
        scene.handle_key(KeyEvent::pressed(InputAction::Select));
        for _ in 0..9 {
            scene.update(&mut frame, &InputSnapshot::empty(), 0, &mut events);
        }
        assert_eq!(scene.status().next, Some(SceneId::Town));
        assert_eq!(scene.cleanup().last_state, Some(SceneId::Inn));
    }
}
