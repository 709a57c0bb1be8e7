use std::rc::Rc;

use crown_engine::app::rendering::draw;
use crown_engine::tiled::{merge_points, render_2x, MapDocument, MapObject};
use crown_engine::{
    AssetBundle, AssetError, EventQueue, InputAction, InputSnapshot, KeyEvent, MusicCue, Rect, Scene,
    SceneStatus,
};
use image::RgbaImage;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::actor::{Actor, ActorKind, ActorState, Direction, TILE_SIZE};
use super::collision::{CollisionEngine, CollisionSignal, Portal};
use super::dialogue::{lines, DialogueHandler, DialogueOutcome, EMPTY_CHEST};
use super::game_data::GameData;
use super::painter::{panel, Painter, BLACK};
use super::player_menu::{MenuOutcome, PlayerMenu};
use super::rng::Dice;
use super::scene_id::SceneId;
use super::transition::{Fade, SLOW_TRANSITION_SPEED, TRANSITION_SPEED};

pub(crate) const SCREEN_WIDTH: i32 = 800;
pub(crate) const SCREEN_HEIGHT: i32 = 608;
const DIALOGUE_PANEL: Rect = Rect::new(100, 468, 600, 120);

const START_POINT: &str = "start point";
const BLOCKER: &str = "blocker";
const PORTAL: &str = "portal";
const SPRITE: &str = "sprite";

#[derive(Debug, Error)]
pub(crate) enum LevelError {
    #[error("{level} has no start point for arrivals from '{from}'")]
    NoStartPoint { level: &'static str, from: String },
    #[error("{kind} sprite at ({x}, {y}) is missing dialogue{line}")]
    MissingDialogueLine { kind: String, x: i64, y: i64, line: i64 },
    #[error(transparent)]
    Asset(#[from] AssetError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LevelState {
    TransitionIn,
    Normal,
    Dialogue,
    Menu,
    TransitionOut,
    SlowTransitionOut,
}

/// The music a level plays on entry. Town and castle switch to the king's theme once the
/// crown is on its way home.
pub(crate) fn level_music(id: SceneId, data: &GameData) -> Option<MusicCue> {
    if data.crown_quest && matches!(id, SceneId::Town | SceneId::Castle) {
        return Some(MusicCue::new("kings_theme", 0.4));
    }
    let (title, volume) = match id {
        SceneId::Town | SceneId::Castle => ("town_theme", 0.4),
        SceneId::Overworld => ("overworld", 0.4),
        SceneId::Dungeon
        | SceneId::Dungeon2
        | SceneId::Dungeon3
        | SceneId::Dungeon4
        | SceneId::Dungeon5 => ("dungeon_theme", 0.4),
        SceneId::House | SceneId::BrotherHouse => ("pleasant_creek", 0.1),
        _ => return None,
    };
    Some(MusicCue::new(title, volume))
}

/// Tile objects are authored at 1x with a bottom-left origin; actors live on the 2x map.
fn screen_position(object: &MapObject) -> (i32, i32) {
    ((object.x * 2) as i32, (object.y * 2) as i32 - TILE_SIZE)
}

fn object_direction(object: &MapObject) -> Direction {
    object
        .properties
        .get_str("direction")
        .and_then(Direction::from_name)
        .unwrap_or_default()
}

/// Everything on screen while a level runs: the rendered map, the actors, and the
/// handlers that move them and let them talk.
#[derive(Debug)]
pub(crate) struct LevelWorld {
    id: SceneId,
    background: RgbaImage,
    level_rect: Rect,
    viewport: Rect,
    pub(crate) player: Actor,
    pub(crate) npcs: Vec<Actor>,
    collision: CollisionEngine,
    dialogue: DialogueHandler,
}

impl LevelWorld {
    pub(crate) fn build(
        id: SceneId,
        doc: &MapDocument,
        background: RgbaImage,
        data: &GameData,
        previous: Option<SceneId>,
    ) -> Result<Self, LevelError> {
        let map_width = background.width() as i32;
        let map_height = background.height() as i32;
        let level_height = if id.cuts_off_bottom_row() {
            map_height - TILE_SIZE
        } else {
            map_height
        };
        let player = spawn_player(id, doc, data, previous)?;
        let (npcs, reset_lines) = make_npcs(doc, data)?;
        let collision = CollisionEngine::new(make_blockers(doc), make_portals(doc), id.allows_battles());

        let mut world = Self {
            id,
            background,
            level_rect: Rect::new(0, 0, map_width, level_height),
            viewport: Rect::new(0, map_height - SCREEN_HEIGHT, SCREEN_WIDTH, SCREEN_HEIGHT),
            player,
            npcs,
            collision,
            dialogue: DialogueHandler::new(reset_lines),
        };
        world.follow_player();
        Ok(world)
    }

    /// Centers the viewport on the player without showing anything past the level edge.
    pub(crate) fn follow_player(&mut self) {
        let (x, y) = self.player.rect.center();
        self.viewport = self.viewport.centered_on(x, y).clamped_inside(&self.level_rect);
    }

    /// One tick of walking: input, animation, then collision.
    pub(crate) fn step(&mut self, held: Option<Direction>, now_ms: u64, dice: &mut Dice) -> Option<CollisionSignal> {
        self.player.steer(held, now_ms);
        self.player.update(now_ms, dice);
        for npc in &mut self.npcs {
            npc.update(now_ms, dice);
        }
        self.collision.update(&mut self.player, &mut self.npcs, now_ms)
    }

    /// Remembered so a battle can drop the player back where it started.
    pub(crate) fn record_departure(&self, data: &mut GameData) {
        data.last_location = Some(self.player.tile_location());
        data.last_direction = self.player.direction;
        data.last_state = Some(self.id);
    }

    fn draw(&self, frame: &mut RgbaImage, painter: &mut Painter) {
        draw::blit_viewport(frame, &self.background, self.viewport);
        for actor in std::iter::once(&self.player).chain(self.npcs.iter()) {
            let x = actor.rect.x - self.viewport.x;
            let y = actor.rect.y - self.viewport.y;
            painter.region(frame, actor.kind.sheet_key(), actor.frame(), x, y);
        }
        if self.dialogue.is_open() {
            panel(frame, DIALOGUE_PANEL);
        }
    }
}

fn spawn_player(
    id: SceneId,
    doc: &MapDocument,
    data: &GameData,
    previous: Option<SceneId>,
) -> Result<Actor, LevelError> {
    if previous == Some(SceneId::Battle) {
        if let Some((x, y)) = data.last_location {
            return Ok(Actor::player(x * TILE_SIZE, y * TILE_SIZE, data.last_direction));
        }
    }
    let from = previous.map_or("", SceneId::name);
    doc.objects()
        .filter(|object| object.name == START_POINT)
        .find(|object| object.properties.get_str("state") == Some(from))
        .map(|object| {
            let (x, y) = screen_position(object);
            Actor::player(x, y, object_direction(object))
        })
        .ok_or_else(|| LevelError::NoStartPoint {
            level: id.name(),
            from: from.to_string(),
        })
}

/// Blockers on the tile grid are merged into larger rects; off-grid ones stay one tile.
fn make_blockers(doc: &MapDocument) -> Vec<Rect> {
    let mut cells = Vec::new();
    let mut blockers = Vec::new();
    for object in doc.objects().filter(|object| object.name == BLOCKER) {
        let (x, y) = screen_position(object);
        if x % TILE_SIZE == 0 && y % TILE_SIZE == 0 {
            cells.push((x / TILE_SIZE, y / TILE_SIZE));
        } else {
            blockers.push(Rect::new(x, y, TILE_SIZE, TILE_SIZE));
        }
    }
    blockers.extend(
        merge_points(cells)
            .into_iter()
            .map(|rect| rect.scaled(TILE_SIZE, TILE_SIZE)),
    );
    blockers
}

fn make_portals(doc: &MapDocument) -> Vec<Portal> {
    doc.objects()
        .filter(|object| object.name == PORTAL)
        .filter_map(|object| {
            let Some(destination) = SceneId::from_name(&object.kind) else {
                warn!(destination = %object.kind, "portal_destination_unknown");
                return None;
            };
            let (x, y) = screen_position(object);
            Some(Portal {
                rect: Rect::new(x, y, TILE_SIZE, TILE_SIZE),
                destination,
            })
        })
        .collect()
}

type ResetLines = Option<(usize, Vec<String>)>;

fn make_npcs(doc: &MapDocument, data: &GameData) -> Result<(Vec<Actor>, ResetLines), LevelError> {
    let mut npcs = Vec::new();
    let mut reset_lines = None;
    for object in doc.objects().filter(|object| object.name == SPRITE) {
        let Some(kind) = ActorKind::from_sprite_type(&object.kind) else {
            warn!(kind = %object.kind, "sprite_type_unknown");
            continue;
        };
        if kind == ActorKind::EvilWizard && data.crown_quest {
            continue;
        }
        let mut npc = make_npc(kind, object, data)?;
        if let Some(lines) = apply_quest_dialogue(&mut npc, data) {
            reset_lines = Some((npcs.len(), lines));
        }
        if npc.chest_id.is_some_and(|id| data.chest_looted(id)) {
            npc.dialogue = vec![EMPTY_CHEST.to_string()];
            npc.item = None;
            npc.index = 1;
        }
        npcs.push(npc);
    }
    debug!(count = npcs.len(), "npcs_spawned");
    Ok((npcs, reset_lines))
}

fn make_npc(kind: ActorKind, object: &MapObject, data: &GameData) -> Result<Actor, LevelError> {
    let (x, y) = screen_position(object);
    let properties = &object.properties;
    let direction = object_direction(object);
    let mut npc = match kind {
        ActorKind::TreasureChest => Actor::chest(x, y, properties.get_int("id")),
        ActorKind::FemaleVillager => Actor::new(kind, x, y, direction, ActorState::Resting).with_index(1),
        ActorKind::FemaleWarrior => Actor::new(kind, x, y, direction, ActorState::AutoResting),
        ActorKind::Devil => Actor::new(kind, x, y, Direction::Down, ActorState::AutoResting),
        ActorKind::Soldier => Actor::new(kind, x, y, direction, ActorState::Resting)
            .with_index(usize::from(direction == Direction::Left)),
        _ => Actor::new(kind, x, y, direction, ActorState::Resting),
    };
    if let Some(state) = properties.get_str("state").and_then(ActorState::from_name) {
        npc.state = state;
    }

    let item = properties.get_text("item");
    npc.item = match kind {
        ActorKind::OldMan => data
            .old_man_gift
            .clone()
            .filter(|_| !data.elixir_received)
            .or(item),
        ActorKind::King => Some(data.king_item.clone()).filter(|item| !data.talked_to_king && !item.is_empty()),
        _ => item,
    };
    npc = npc.with_battle(properties.get_text("battle"));

    let length = properties.get_int("dialogue length").unwrap_or(0);
    npc.dialogue = (0..length)
        .map(|line| {
            properties
                .get_text(&format!("dialogue{line}"))
                .ok_or_else(|| LevelError::MissingDialogueLine {
                    kind: object.kind.clone(),
                    x: object.x,
                    y: object.y,
                    line,
                })
        })
        .collect::<Result<_, _>>()?;
    Ok(npc)
}

/// Swaps in quest lines for NPCs whose story has moved on. Returns lines to put in place
/// once the current conversation with this NPC ends.
fn apply_quest_dialogue(npc: &mut Actor, data: &GameData) -> Option<Vec<String>> {
    match npc.kind {
        ActorKind::OldMan => {
            let in_progress = lines(&["Hurry to the NorthEast Shores!", "I do not have much time left."]);
            if data.has_brother_elixir {
                npc.dialogue = if data.elixir_received {
                    lines(&["My good health is thanks to you.", "I will be forever in your debt."])
                } else {
                    lines(&[
                        "Thank you for reaching my brother.",
                        "This ELIXIR will cure my ailment.",
                        "As a reward, I will teach you a magic spell.",
                        "Use it wisely.",
                        "You learned FIRE BLAST.",
                    ])
                };
            } else if data.talked_to_sick_brother {
                npc.dialogue = in_progress;
            } else {
                return Some(in_progress);
            }
        }
        ActorKind::OldManBrother => {
            if data.has_brother_elixir {
                npc.dialogue = if data.elixir_received {
                    lines(&["I am glad my brother is doing well.", "You have a wise and generous spirit."])
                } else {
                    lines(&["Hurry! There is precious little time."])
                };
            } else if data.talked_to_sick_brother {
                npc.dialogue = lines(&[
                    "My brother is sick?!?",
                    "I have not seen him in years.  I had no idea he was not well.",
                    "Quick, take this ELIXIR to him immediately.",
                ]);
            }
        }
        ActorKind::King => {
            let thank_you = lines(&["Thank you for retrieving my crown.", "My kingdom is forever in your debt."]);
            if data.crown_quest && !data.delivered_crown {
                npc.dialogue = lines(&[
                    "My crown! You recovered my stolen crown!!!",
                    "I can not believe what I see before my eyes.",
                    "You are truly a brave and noble warrior.",
                    "Henceforth, I name thee Grand Protector of this Town!",
                    "You are the greatest warrior this world has ever known.",
                ]);
                return Some(thank_you);
            } else if data.delivered_crown {
                npc.dialogue = thank_you;
            }
        }
        _ => {}
    }
    None
}

/// Arrow keys held this tick, in priority order up, down, left, right.
fn held_direction(input: &InputSnapshot) -> Option<Direction> {
    [
        (InputAction::Up, Direction::Up),
        (InputAction::Down, Direction::Down),
        (InputAction::Left, Direction::Left),
        (InputAction::Right, Direction::Right),
    ]
    .into_iter()
    .find(|(action, _)| input.is_down(*action))
    .map(|(_, direction)| direction)
}

/// A walkable map: town, castle, houses, the overworld, and the dungeons.
pub(crate) struct LevelScene {
    id: SceneId,
    status: SceneStatus<SceneId>,
    painter: Painter,
    dice: Dice,
    data: GameData,
    world: Option<LevelWorld>,
    state: LevelState,
    fade: Fade,
    menu: PlayerMenu,
    pending: Vec<InputAction>,
    destination: Option<SceneId>,
    music: Option<MusicCue>,
}

impl LevelScene {
    pub(crate) fn new(id: SceneId, assets: Rc<AssetBundle>, dice: Dice) -> Self {
        Self {
            id,
            status: SceneStatus::default(),
            painter: Painter::new(assets),
            dice,
            data: GameData::default(),
            world: None,
            state: LevelState::TransitionIn,
            fade: Fade::covered(),
            menu: PlayerMenu::default(),
            pending: Vec::new(),
            destination: None,
            music: None,
        }
    }

    fn load_world(&self) -> Result<LevelWorld, LevelError> {
        let doc = self.painter.assets().load_map(self.id.name())?;
        let background = render_2x(&doc);
        LevelWorld::build(self.id, &doc, background, &self.data, self.status.previous)
    }

    fn leave(&mut self, destination: SceneId) {
        if let Some(world) = &self.world {
            world.record_departure(&mut self.data);
        }
        info!(from = self.id.name(), to = destination.name(), "level_exit");
        self.destination = Some(destination);
        self.state = LevelState::TransitionOut;
    }

    fn run_normally(&mut self, input: &InputSnapshot, now_ms: u64, events: &mut EventQueue) {
        let Some(world) = self.world.as_mut() else {
            return;
        };
        let signal = world.step(held_direction(input), now_ms, &mut self.dice);
        match signal {
            Some(CollisionSignal::Battle) => return self.leave(SceneId::Battle),
            Some(CollisionSignal::Portal(destination)) => return self.leave(destination),
            None => {}
        }
        if self.data.delivered_crown {
            self.destination = Some(SceneId::Credits);
            self.state = LevelState::SlowTransitionOut;
            return;
        }

        for action in std::mem::take(&mut self.pending) {
            match action {
                InputAction::Select => {
                    if world.dialogue.try_open(&world.player, &mut world.npcs, now_ms, events) {
                        self.state = LevelState::Dialogue;
                        return;
                    }
                }
                InputAction::Confirm if world.player.state == ActorState::Resting => {
                    debug!("player_menu_opened");
                    self.state = LevelState::Menu;
                    return;
                }
                _ => {}
            }
        }
        world.follow_player();
    }

    fn handle_dialogue(&mut self, now_ms: u64, events: &mut EventQueue) {
        let Some(world) = self.world.as_mut() else {
            return;
        };
        for action in std::mem::take(&mut self.pending) {
            if action != InputAction::Select {
                continue;
            }
            match world.dialogue.advance(&mut world.npcs, &mut self.data, now_ms, events) {
                DialogueOutcome::Open => {}
                DialogueOutcome::Closed => {
                    self.state = LevelState::Normal;
                    return;
                }
                DialogueOutcome::Battle => return self.leave(SceneId::Battle),
            }
        }
    }

    fn handle_menu(&mut self, events: &mut EventQueue) {
        for action in std::mem::take(&mut self.pending) {
            if self.menu.handle(action, &mut self.data, events) == MenuOutcome::Closed {
                self.state = LevelState::Normal;
                return;
            }
        }
    }

    fn finish_fade(&mut self, speed: i32) {
        self.pending.clear();
        if self.fade.fade_out(speed) {
            let destination = self.destination.unwrap_or(SceneId::MainMenu);
            self.status.switch_to(destination);
        }
    }
}

impl Scene<SceneId, GameData> for LevelScene {
    fn status(&self) -> &SceneStatus<SceneId> {
        &self.status
    }

    fn status_mut(&mut self) -> &mut SceneStatus<SceneId> {
        &mut self.status
    }

    fn startup(&mut self, _now_ms: u64, payload: GameData) {
        self.data = payload;
        self.state = LevelState::TransitionIn;
        self.fade = Fade::covered();
        self.menu = PlayerMenu::default();
        self.pending.clear();
        self.destination = None;
        self.music = level_music(self.id, &self.data);
        match self.load_world() {
            Ok(world) => {
                info!(level = self.id.name(), npcs = world.npcs.len(), "level_entered");
                self.world = Some(world);
            }
            Err(err) => {
                error!(level = self.id.name(), error = %err, "level_startup_failed");
                self.world = None;
                self.status.quit = true;
            }
        }
    }

    fn handle_key(&mut self, event: KeyEvent) {
        if event.pressed {
            self.pending.push(event.action);
        }
    }

    fn update(&mut self, frame: &mut RgbaImage, input: &InputSnapshot, now_ms: u64, events: &mut EventQueue) {
        match self.state {
            LevelState::TransitionIn => {
                self.pending.clear();
                if let Some(world) = self.world.as_mut() {
                    world.follow_player();
                }
                if self.fade.fade_in(TRANSITION_SPEED) {
                    self.state = LevelState::Normal;
                }
            }
            LevelState::Normal => self.run_normally(input, now_ms, events),
            LevelState::Dialogue => self.handle_dialogue(now_ms, events),
            LevelState::Menu => self.handle_menu(events),
            LevelState::TransitionOut => self.finish_fade(TRANSITION_SPEED),
            LevelState::SlowTransitionOut => self.finish_fade(SLOW_TRANSITION_SPEED),
        }

        draw::clear(frame, BLACK);
        if let Some(world) = &self.world {
            world.draw(frame, &mut self.painter);
        }
        if self.state == LevelState::Menu {
            self.menu.draw(frame);
        }
        self.fade.draw(frame);
    }

    fn cleanup(&mut self) -> GameData {
        self.world = None;
        std::mem::take(&mut self.data)
    }

    fn music(&self) -> Option<MusicCue> {
        self.music.clone()
    }
}
