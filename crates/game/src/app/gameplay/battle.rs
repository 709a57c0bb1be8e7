use std::collections::VecDeque;
use std::rc::Rc;

use crown_engine::app::rendering::draw;
use crown_engine::{
    AssetBundle, EventQueue, InputAction, InputSnapshot, KeyEvent, MusicCue, Rect, Scene, SceneStatus,
};
use image::{Rgba, RgbaImage};
use tracing::{debug, info};

use super::actor::ActorKind;
use super::game_data::{GameData, CURE, ETHER_POTION, FIRE_BLAST, HEALING_POTION};
use super::painter::{panel, selection_marker, Painter};
use super::player_menu::{CLICK, CLICK2, POWER_UP};
use super::rng::Dice;
use super::scene_id::SceneId;
use super::transition::{Fade, TRANSITION_SPEED};

const BATTLE_MUSIC: &str = "high_action";
const VICTORY_MUSIC: &str = "enchanted_festival";
const POTION_STRENGTH: i32 = 30;
const WEAPON_SPREAD: i32 = 7;
const HEALTH_PER_LEVEL: i32 = 15;
const EXPERIENCE_PER_LEVEL: i32 = 5;
const GOLD_PER_LEVEL: u32 = 10;
const BOSS_LEVEL: i32 = 4;
const STAT_GAIN_PER_LEVEL: i32 = 10;
const EXPERIENCE_STEP: i32 = 30;
const ACTIONS: [&str; 4] = ["Attack", "Items", "Magic", "Run"];
const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);
const INFO_PANEL: Rect = Rect::new(0, 448, 560, 160);
const ACTION_PANEL: Rect = Rect::new(560, 448, 240, 160);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Enemy {
    pub(crate) kind: ActorKind,
    pub(crate) level: i32,
    pub(crate) health: i32,
}

impl Enemy {
    fn new(kind: ActorKind, level: i32) -> Self {
        Self {
            kind,
            level,
            health: HEALTH_PER_LEVEL * level,
        }
    }

    fn is_alive(&self) -> bool {
        self.health > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BattleState {
    SelectAction,
    SelectEnemy,
    SelectItem,
    SelectMagic,
    Messages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BattleOutcome {
    Won,
    Escaped,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterMessages {
    PlayerTurn,
    EnemyTurn,
    Finish(BattleOutcome),
}

/// One fight: the player's menus, the enemies, and the queue of result lines shown one
/// Space press at a time.
#[derive(Debug, Clone)]
pub(crate) struct Battle {
    enemies: Vec<Enemy>,
    boss: bool,
    state: BattleState,
    cursor: usize,
    messages: VecDeque<String>,
    after: AfterMessages,
}

impl Battle {
    /// A named battle is a single boss fight; otherwise one to three enemies scaled to
    /// where the player was walking.
    pub(crate) fn start(data: &GameData, dice: &mut Dice) -> Self {
        let boss = data.battle_type.is_some();
        let enemies = if boss {
            vec![Enemy::new(ActorKind::EvilWizard, BOSS_LEVEL)]
        } else {
            let level = match data.last_state {
                Some(id) if id != SceneId::Overworld && id.allows_battles() => 2,
                _ => 1,
            };
            let count = dice.between(1, 3) as usize;
            vec![Enemy::new(ActorKind::Devil, level); count]
        };
        info!(enemies = enemies.len(), boss, "battle_started");
        Self {
            enemies,
            boss,
            state: BattleState::SelectAction,
            cursor: 0,
            messages: VecDeque::new(),
            after: AfterMessages::PlayerTurn,
        }
    }

    pub(crate) fn message(&self) -> &str {
        match self.state {
            BattleState::Messages => self.messages.front().map_or("", String::as_str),
            BattleState::SelectAction => "Select an action.",
            BattleState::SelectEnemy => "Select an enemy.",
            BattleState::SelectItem => "Select an item.",
            BattleState::SelectMagic => "Select a magic spell.",
        }
    }

    fn living(&self) -> Vec<usize> {
        self.enemies
            .iter()
            .enumerate()
            .filter(|(_, enemy)| enemy.is_alive())
            .map(|(index, _)| index)
            .collect()
    }

    fn choices(&self, data: &GameData) -> Vec<String> {
        let inventory = &data.player_inventory;
        let owned = |names: &[&str]| -> Vec<String> {
            let mut list: Vec<String> = names
                .iter()
                .filter(|name| inventory.contains(name))
                .map(|name| name.to_string())
                .collect();
            list.push("BACK".to_string());
            list
        };
        match self.state {
            BattleState::SelectAction => ACTIONS.iter().map(|action| action.to_string()).collect(),
            BattleState::SelectEnemy => self.living().iter().map(|index| format!("Enemy {}", index + 1)).collect(),
            BattleState::SelectItem => owned(&[HEALING_POTION, ETHER_POTION]),
            BattleState::SelectMagic => owned(&[FIRE_BLAST, CURE]),
            BattleState::Messages => Vec::new(),
        }
    }

    pub(crate) fn handle(
        &mut self,
        action: InputAction,
        data: &mut GameData,
        dice: &mut Dice,
        events: &mut EventQueue,
    ) -> Option<BattleOutcome> {
        match action {
            InputAction::Down => {
                if self.cursor + 1 < self.choices(data).len() {
                    self.cursor += 1;
                    events.play_sound(CLICK);
                }
                None
            }
            InputAction::Up => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    events.play_sound(CLICK);
                }
                None
            }
            InputAction::Select => {
                events.play_sound(CLICK2);
                self.select(data, dice, events)
            }
            _ => None,
        }
    }

    fn select(&mut self, data: &mut GameData, dice: &mut Dice, events: &mut EventQueue) -> Option<BattleOutcome> {
        let choices = self.choices(data);
        let choice = std::mem::take(&mut self.cursor);
        match self.state {
            BattleState::SelectAction => match choice {
                0 => self.state = BattleState::SelectEnemy,
                1 => self.state = BattleState::SelectItem,
                2 => self.state = BattleState::SelectMagic,
                _ => self.queue(vec!["RUN AWAY!!!".to_string()], AfterMessages::Finish(BattleOutcome::Escaped)),
            },
            BattleState::SelectEnemy => {
                if let Some(target) = self.living().get(choice).copied() {
                    self.attack(target, data, dice);
                }
            }
            BattleState::SelectItem => match choices.get(choice).map(String::as_str) {
                Some(HEALING_POTION) => {
                    self.drink(data, HEALING_POTION, events);
                }
                Some(ETHER_POTION) => {
                    self.drink(data, ETHER_POTION, events);
                }
                _ => self.state = BattleState::SelectAction,
            },
            BattleState::SelectMagic => match choices.get(choice).map(String::as_str) {
                Some(FIRE_BLAST) => self.fire_blast(data),
                Some(CURE) => self.cure(data, events),
                _ => self.state = BattleState::SelectAction,
            },
            BattleState::Messages => {
                self.messages.pop_front();
                if self.messages.is_empty() {
                    return self.after_messages(data, dice);
                }
            }
        }
        None
    }

    fn queue(&mut self, messages: Vec<String>, after: AfterMessages) {
        for message in &messages {
            debug!(message = %message, "battle_message");
        }
        self.messages = messages.into();
        self.after = after;
        self.state = BattleState::Messages;
    }

    fn after_messages(&mut self, data: &mut GameData, dice: &mut Dice) -> Option<BattleOutcome> {
        match self.after {
            AfterMessages::PlayerTurn => {
                self.state = BattleState::SelectAction;
                None
            }
            AfterMessages::EnemyTurn => {
                self.enemy_turn(data, dice);
                None
            }
            AfterMessages::Finish(outcome) => Some(outcome),
        }
    }

    fn attack(&mut self, target: usize, data: &mut GameData, dice: &mut Dice) {
        let power = data.player_inventory.weapon_power();
        let damage = dice.between((power - WEAPON_SPREAD).max(0), power);
        let mut messages = vec![format!("Enemy hit with {damage} damage.")];
        if let Some(enemy) = self.enemies.get_mut(target) {
            enemy.health -= damage;
            if !enemy.is_alive() {
                messages.push("Enemy killed.".to_string());
            }
        }
        self.end_player_turn(messages, data);
    }

    fn fire_blast(&mut self, data: &mut GameData) {
        let Some(spell) = data.player_inventory.get(FIRE_BLAST).cloned() else {
            self.state = BattleState::SelectAction;
            return;
        };
        let cost = spell.magic_points.unwrap_or_default();
        if data.player_stats.magic.current < cost {
            self.state = BattleState::SelectMagic;
            return;
        }
        data.player_stats.magic.drain(cost);
        let power = spell.power.unwrap_or_default() * data.player_stats.level as i32;
        let mut messages = vec!["FIRE BLAST!".to_string()];
        for enemy in self.enemies.iter_mut().filter(|enemy| enemy.is_alive()) {
            enemy.health -= power;
            messages.push(format!("Enemy hit with {power} damage."));
            if !enemy.is_alive() {
                messages.push("Enemy killed.".to_string());
            }
        }
        self.end_player_turn(messages, data);
    }

    fn cure(&mut self, data: &mut GameData, events: &mut EventQueue) {
        let (cost, power) = data
            .player_inventory
            .get(CURE)
            .map(|spell| (spell.magic_points.unwrap_or_default(), spell.power.unwrap_or_default()))
            .unwrap_or_default();
        let stats = &mut data.player_stats;
        if stats.health.is_full() || stats.magic.current < cost {
            self.state = BattleState::SelectMagic;
            return;
        }
        events.play_sound(POWER_UP);
        stats.magic.drain(cost);
        stats.health.restore(power);
        self.end_player_turn(vec!["Player healed.".to_string()], data);
    }

    fn drink(&mut self, data: &mut GameData, potion: &str, events: &mut EventQueue) {
        let stats = &mut data.player_stats;
        let (meter, message) = if potion == HEALING_POTION {
            (&mut stats.health, "Player healed.")
        } else {
            (&mut stats.magic, "Magic Points Increased.")
        };
        if meter.is_full() || !data.player_inventory.take_one(potion) {
            self.state = BattleState::SelectItem;
            return;
        }
        events.play_sound(POWER_UP);
        meter.restore(POTION_STRENGTH);
        self.end_player_turn(vec![message.to_string()], data);
    }

    fn end_player_turn(&mut self, mut messages: Vec<String>, data: &mut GameData) {
        if !self.living().is_empty() {
            self.queue(messages, AfterMessages::EnemyTurn);
            return;
        }
        messages.extend(self.award(data));
        self.queue(messages, AfterMessages::Finish(BattleOutcome::Won));
    }

    fn enemy_turn(&mut self, data: &mut GameData, dice: &mut Dice) {
        let armor = data.player_inventory.armor_power();
        let mut messages = Vec::new();
        for enemy in self.enemies.iter().filter(|enemy| enemy.is_alive()) {
            let damage = dice.between(0, (enemy.level * 5 - armor).max(1));
            data.player_stats.health.drain(damage);
            messages.push(if damage > 0 {
                format!("Player hit with {damage} damage")
            } else {
                "Enemy missed!".to_string()
            });
            if data.player_stats.health.current <= 0 {
                info!("player_died");
                self.queue(messages, AfterMessages::Finish(BattleOutcome::Lost));
                return;
            }
        }
        self.queue(messages, AfterMessages::PlayerTurn);
    }

    fn award(&self, data: &mut GameData) -> Vec<String> {
        let experience: i32 = self.enemies.iter().map(|enemy| enemy.level * EXPERIENCE_PER_LEVEL).sum();
        let gold: u32 = self.enemies.iter().map(|enemy| enemy.level as u32 * GOLD_PER_LEVEL).sum();
        let mut messages = vec![
            "Battle won!".to_string(),
            format!("You earned {experience} experience points this battle!"),
            format!("You found {gold} gold."),
        ];
        data.player_inventory.add_gold(gold);
        let stats = &mut data.player_stats;
        stats.experience_to_next_level -= experience;
        while stats.experience_to_next_level <= 0 {
            stats.level += 1;
            stats.health.maximum += STAT_GAIN_PER_LEVEL;
            stats.magic.maximum += STAT_GAIN_PER_LEVEL;
            stats.health.refill();
            stats.magic.refill();
            stats.experience_to_next_level += EXPERIENCE_STEP * stats.level as i32;
            info!(level = stats.level, "level_up");
            messages.push(format!("You leveled up to Level {}!", stats.level));
        }
        if self.boss {
            info!("sorcerer_defeated");
            data.crown_quest = true;
        }
        messages
    }

    fn draw(&self, frame: &mut RgbaImage, painter: &mut Painter, data: &GameData) {
        for (slot, enemy) in self.enemies.iter().enumerate().filter(|(_, enemy)| enemy.is_alive()) {
            let x = 100 + (slot as i32 % 2) * 110;
            let y = 90 + slot as i32 * 100;
            painter.region_scaled(frame, enemy.kind.sheet_key(), Rect::new(64, 0, 32, 32), x, y, 2);
        }
        painter.region_scaled(frame, "player", Rect::new(0, 32, 32, 32), 600, 220, 2);
        panel(frame, INFO_PANEL);
        let choices = self.choices(data);
        if !choices.is_empty() {
            panel(frame, ACTION_PANEL);
            selection_marker(frame, ACTION_PANEL, self.cursor, 34);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    TransitionIn,
    Fighting,
    TransitionOut,
}

pub(crate) struct BattleScene {
    status: SceneStatus<SceneId>,
    painter: Painter,
    data: GameData,
    dice: Dice,
    battle: Option<Battle>,
    stage: Stage,
    fade: Fade,
    pending: Vec<InputAction>,
    destination: SceneId,
    shown_message: String,
}

impl BattleScene {
    pub(crate) fn new(assets: Rc<AssetBundle>, dice: Dice) -> Self {
        Self {
            status: SceneStatus::default(),
            painter: Painter::new(assets),
            data: GameData::default(),
            dice,
            battle: None,
            stage: Stage::TransitionIn,
            fade: Fade::covered(),
            pending: Vec::new(),
            destination: SceneId::Overworld,
            shown_message: String::new(),
        }
    }

    fn fight(&mut self, events: &mut EventQueue) {
        let Some(battle) = self.battle.as_mut() else {
            return;
        };
        for action in std::mem::take(&mut self.pending) {
            let Some(outcome) = battle.handle(action, &mut self.data, &mut self.dice, events) else {
                continue;
            };
            info!(outcome = ?outcome, "battle_over");
            self.destination = match outcome {
                BattleOutcome::Lost => SceneId::DeathScene,
                BattleOutcome::Won | BattleOutcome::Escaped => {
                    self.data.battle_type = None;
                    self.data.last_state.unwrap_or(SceneId::Overworld)
                }
            };
            if outcome == BattleOutcome::Won {
                events.play_music(VICTORY_MUSIC, 0.4);
            }
            self.stage = Stage::TransitionOut;
            return;
        }
        if battle.message() != self.shown_message {
            self.shown_message = battle.message().to_string();
            debug!(message = %self.shown_message, "battle_prompt");
        }
    }
}

impl Scene<SceneId, GameData> for BattleScene {
    fn status(&self) -> &SceneStatus<SceneId> {
        &self.status
    }

    fn status_mut(&mut self) -> &mut SceneStatus<SceneId> {
        &mut self.status
    }

    fn startup(&mut self, _now_ms: u64, payload: GameData) {
        self.data = payload;
        self.battle = Some(Battle::start(&self.data, &mut self.dice));
        self.stage = Stage::TransitionIn;
        self.fade = Fade::covered();
        self.pending.clear();
        self.shown_message.clear();
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
                    self.stage = Stage::Fighting;
                }
            }
            Stage::Fighting => self.fight(events),
            Stage::TransitionOut => {
                self.pending.clear();
                if self.fade.fade_out(TRANSITION_SPEED) {
                    self.status.switch_to(self.destination);
                }
            }
        }
        draw::clear(frame, BACKGROUND);
        if let Some(battle) = &self.battle {
            battle.draw(frame, &mut self.painter, &self.data);
        }
        self.fade.draw(frame);
    }

    fn cleanup(&mut self) -> GameData {
        self.battle = None;
        std::mem::take(&mut self.data)
    }

    fn music(&self) -> Option<MusicCue> {
        Some(MusicCue::new(BATTLE_MUSIC, 0.4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::game_data::Item;

    fn press(battle: &mut Battle, data: &mut GameData, dice: &mut Dice, actions: &[InputAction]) -> Option<BattleOutcome> {
        let mut events = EventQueue::new();
        let mut outcome = None;
        for action in actions {
            outcome = battle.handle(*action, data, dice, &mut events).or(outcome);
        }
        outcome
    }

    fn skip_messages(battle: &mut Battle, data: &mut GameData, dice: &mut Dice) -> Option<BattleOutcome> {
        let mut events = EventQueue::new();
        while battle.state == BattleState::Messages {
            if let Some(outcome) = battle.handle(InputAction::Select, data, dice, &mut events) {
                return Some(outcome);
            }
        }
        None
    }

    #[test]
    fn random_encounters_field_one_to_three_devils() {
        let data = GameData::default();
        let mut dice = Dice::seeded(11);
        for _ in 0..20 {
            let battle = Battle::start(&data, &mut dice);
            assert!((1..=3).contains(&battle.enemies.len()));
            assert!(battle.enemies.iter().all(|enemy| enemy.kind == ActorKind::Devil && enemy.health == 15));
        }

        let mut dungeon = GameData::default();
        dungeon.last_state = Some(SceneId::Dungeon3);
        let battle = Battle::start(&dungeon, &mut dice);
        assert!(battle.enemies.iter().all(|enemy| enemy.level == 2));
    }

    #[test]
    fn running_away_ends_the_battle() {
        let mut data = GameData::default();
        let mut dice = Dice::seeded(1);
        let mut battle = Battle::start(&data, &mut dice);
        press(&mut battle, &mut data, &mut dice, &[InputAction::Down, InputAction::Down, InputAction::Down, InputAction::Select]);
        assert_eq!(battle.message(), "RUN AWAY!!!");
        assert_eq!(skip_messages(&mut battle, &mut data, &mut dice), Some(BattleOutcome::Escaped));
    }

    #[test]
    fn slaying_the_sorcerer_starts_the_crown_quest() {
        let mut data = GameData::default();
        data.battle_type = Some("evilwizard".to_string());
        data.player_inventory.insert(FIRE_BLAST, Item::spell(40, 15));
        data.player_stats.level = 4;
        data.player_stats.magic.current = 70;
        let mut dice = Dice::seeded(5);
        let mut battle = Battle::start(&data, &mut dice);
        assert_eq!(battle.enemies.len(), 1);
        assert_eq!(battle.enemies[0].health, 60);

        press(&mut battle, &mut data, &mut dice, &[InputAction::Down, InputAction::Down, InputAction::Select, InputAction::Select]);
        assert_eq!(battle.message(), "FIRE BLAST!");
        assert_eq!(skip_messages(&mut battle, &mut data, &mut dice), Some(BattleOutcome::Won));
        assert!(data.crown_quest);
        assert_eq!(data.player_stats.magic.current, 30);
        assert_eq!(data.player_inventory.gold(), 140);
    }

    #[test]
    fn victory_pays_out_and_levels_up() {
        let mut data = GameData::default();
        data.player_stats.experience_to_next_level = 3;
        let mut dice = Dice::seeded(2);
        let mut battle = Battle::start(&data, &mut dice);
        battle.enemies = vec![Enemy::new(ActorKind::Devil, 1)];
        battle.enemies[0].health = 1;

        press(&mut battle, &mut data, &mut dice, &[InputAction::Select, InputAction::Select]);
        assert_eq!(battle.state, BattleState::Messages);
        assert_eq!(skip_messages(&mut battle, &mut data, &mut dice), Some(BattleOutcome::Won));

        let stats = &data.player_stats;
        assert_eq!(stats.level, 2);
        assert_eq!(stats.health.maximum, 80);
        assert_eq!(stats.health.current, 80);
        assert_eq!(stats.experience_to_next_level, 58);
        assert_eq!(data.player_inventory.gold(), 110);
    }

    #[test]
    fn enemies_strike_back_until_the_player_falls() {
        let mut data = GameData::default();
        data.player_stats.health.current = 1;
        let mut dice = Dice::seeded(9);
        let mut battle = Battle::start(&data, &mut dice);
        battle.enemies = vec![Enemy::new(ActorKind::Devil, 10)];

        let mut outcome = None;
        for _ in 0..50 {
            press(&mut battle, &mut data, &mut dice, &[InputAction::Select, InputAction::Select]);
            outcome = skip_messages(&mut battle, &mut data, &mut dice);
            if outcome.is_some() {
                break;
            }
        }
        assert_eq!(outcome, Some(BattleOutcome::Lost));
        assert_eq!(data.player_stats.health.current, 0);
    }

    #[test]
    fn potion_heals_and_uses_the_turn() {
        let mut data = GameData::default();
        data.player_stats.health.current = 10;
        let mut dice = Dice::seeded(4);
        let mut battle = Battle::start(&data, &mut dice);
        press(&mut battle, &mut data, &mut dice, &[InputAction::Down, InputAction::Select, InputAction::Select]);
        assert_eq!(battle.message(), "Player healed.");
        assert_eq!(data.player_stats.health.current, 40);
        assert_eq!(data.player_inventory.quantity(HEALING_POTION), 1);
    }

    #[test]
    fn back_returns_to_the_action_menu() {
        let mut data = GameData::default();
        let mut dice = Dice::seeded(4);
        let mut battle = Battle::start(&data, &mut dice);
        press(&mut battle, &mut data, &mut dice, &[InputAction::Down, InputAction::Down, InputAction::Select]);
        assert_eq!(battle.state, BattleState::SelectMagic);
        press(&mut battle, &mut data, &mut dice, &[InputAction::Select]);
        assert_eq!(battle.state, BattleState::SelectAction);
    }
}
