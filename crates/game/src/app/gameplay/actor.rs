use crown_engine::Rect;
use serde::{Deserialize, Serialize};

use super::rng::Dice;

pub(crate) const TILE_SIZE: i32 = 32;
pub(crate) const PLAYER_SPEED: i32 = 2;
pub(crate) const NPC_SPEED: i32 = 1;
pub(crate) const AUTO_REST_DELAY_MS: u64 = 2000;
const WALK_FRAME_MS: u64 = 100;
const IDLE_FRAME_MS: u64 = 500;
const WANDER_RADIUS: i32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    pub(crate) const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Unit step in tiles (or pixels per tick at speed 1).
    pub(crate) const fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub(crate) const fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActorState {
    Resting,
    Moving,
    AnimatedResting,
    AutoResting,
    AutoMoving,
}

impl ActorState {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "resting" => Some(ActorState::Resting),
            "moving" => Some(ActorState::Moving),
            "animated resting" => Some(ActorState::AnimatedResting),
            "autoresting" => Some(ActorState::AutoResting),
            "automoving" => Some(ActorState::AutoMoving),
            _ => None,
        }
    }
}

/// What an actor can take part in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Capabilities {
    pub(crate) movable: bool,
    pub(crate) battler: bool,
    pub(crate) container: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ActorKind {
    Player,
    OldMan,
    FemaleVillager,
    FemaleWarrior,
    Devil,
    OldManBrother,
    Soldier,
    King,
    EvilWizard,
    TreasureChest,
}

impl ActorKind {
    /// Maps the `type` of a `sprite` map object.
    pub(crate) fn from_sprite_type(name: &str) -> Option<Self> {
        match name {
            "oldman" => Some(ActorKind::OldMan),
            "bluedressgirl" => Some(ActorKind::FemaleVillager),
            "femalewarrior" => Some(ActorKind::FemaleWarrior),
            "devil" => Some(ActorKind::Devil),
            "oldmanbrother" => Some(ActorKind::OldManBrother),
            "soldier" => Some(ActorKind::Soldier),
            "king" => Some(ActorKind::King),
            "evilwizard" => Some(ActorKind::EvilWizard),
            "treasurechest" => Some(ActorKind::TreasureChest),
            _ => None,
        }
    }

    pub(crate) fn sheet_key(self) -> &'static str {
        match self {
            ActorKind::Player => "player",
            ActorKind::OldMan => "oldman",
            ActorKind::FemaleVillager => "femalevillager",
            ActorKind::FemaleWarrior => "femvillager2",
            ActorKind::Devil => "devil",
            ActorKind::OldManBrother => "oldmanbrother",
            ActorKind::Soldier => "soldier",
            ActorKind::King => "king",
            ActorKind::EvilWizard => "evilwizard",
            ActorKind::TreasureChest => "treasurechest",
        }
    }

    pub(crate) fn capabilities(self) -> Capabilities {
        match self {
            ActorKind::Player => Capabilities {
                movable: true,
                battler: true,
                container: false,
            },
            ActorKind::TreasureChest => Capabilities {
                movable: false,
                battler: false,
                container: true,
            },
            _ => Capabilities {
                movable: true,
                battler: false,
                container: false,
            },
        }
    }

    fn speed(self) -> i32 {
        match self {
            ActorKind::Player => PLAYER_SPEED,
            _ => NPC_SPEED,
        }
    }
}

/// The player, an NPC, or a chest standing on the map. Positions are screen pixels on
/// the 2x map; a tile is 32 pixels.
#[derive(Debug, Clone)]
pub(crate) struct Actor {
    pub(crate) kind: ActorKind,
    pub(crate) capabilities: Capabilities,
    pub(crate) rect: Rect,
    pub(crate) direction: Direction,
    pub(crate) default_direction: Direction,
    pub(crate) state: ActorState,
    pub(crate) x_vel: i32,
    pub(crate) y_vel: i32,
    pub(crate) index: usize,
    pub(crate) dialogue: Vec<String>,
    pub(crate) item: Option<String>,
    pub(crate) battle: Option<String>,
    pub(crate) chest_id: Option<i64>,
    pub(crate) wander_box: Vec<Rect>,
    pub(crate) blockers: Vec<Rect>,
    speed: i32,
    animate_timer: u64,
    move_timer: u64,
}

impl Actor {
    pub(crate) fn new(kind: ActorKind, x: i32, y: i32, direction: Direction, state: ActorState) -> Self {
        let rect = Rect::new(x, y, TILE_SIZE, TILE_SIZE);
        let mut actor = Self {
            kind,
            capabilities: kind.capabilities(),
            rect,
            direction,
            default_direction: direction,
            state,
            x_vel: 0,
            y_vel: 0,
            index: 0,
            dialogue: Vec::new(),
            item: None,
            battle: None,
            chest_id: None,
            wander_box: wander_box_around(x / TILE_SIZE, y / TILE_SIZE),
            blockers: Vec::new(),
            speed: kind.speed(),
            animate_timer: 0,
            move_timer: 0,
        };
        actor.set_blockers();
        actor
    }

    pub(crate) fn player(x: i32, y: i32, direction: Direction) -> Self {
        Self::new(ActorKind::Player, x, y, direction, ActorState::Resting)
    }

    pub(crate) fn chest(x: i32, y: i32, id: Option<i64>) -> Self {
        let mut chest = Self::new(ActorKind::TreasureChest, x, y, Direction::Down, ActorState::Resting);
        chest.chest_id = id;
        chest
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub(crate) fn with_battle(mut self, battle: Option<String>) -> Self {
        self.capabilities.battler = battle.is_some();
        self.battle = battle;
        self
    }

    pub(crate) fn is_aligned(&self) -> bool {
        self.rect.x % TILE_SIZE == 0 && self.rect.y % TILE_SIZE == 0
    }

    /// Tile coordinates. An axis not on a tile boundary reads as 0.
    pub(crate) fn tile_location(&self) -> (i32, i32) {
        let axis = |value: i32| {
            if value % TILE_SIZE == 0 {
                value / TILE_SIZE
            } else {
                0
            }
        };
        (axis(self.rect.x), axis(self.rect.y))
    }

    /// The tiles this actor claims: its footprint while standing, the one or two tiles it
    /// straddles while walking.
    pub(crate) fn set_blockers(&mut self) {
        self.blockers.clear();
        match self.state {
            ActorState::Resting | ActorState::AutoResting => {
                self.blockers
                    .push(Rect::new(self.rect.x, self.rect.y, TILE_SIZE, TILE_SIZE));
            }
            _ => {
                if self.rect.x % TILE_SIZE == 0 {
                    for y in straddled(self.rect.y) {
                        self.blockers.push(Rect::new(self.rect.x, y, TILE_SIZE, TILE_SIZE));
                    }
                } else if self.rect.y % TILE_SIZE == 0 {
                    for x in straddled(self.rect.x) {
                        self.blockers.push(Rect::new(x, self.rect.y, TILE_SIZE, TILE_SIZE));
                    }
                }
            }
        }
    }

    /// Starts a player step. Velocity is only set on axes the actor is aligned with.
    pub(crate) fn begin_moving(&mut self, direction: Direction, now_ms: u64) {
        let (dx, dy) = direction.offset();
        self.direction = direction;
        self.animate_timer = now_ms;
        self.move_timer = now_ms;
        self.state = ActorState::Moving;
        if self.rect.x % TILE_SIZE == 0 {
            self.y_vel = dy * self.speed;
        }
        if self.rect.y % TILE_SIZE == 0 {
            self.x_vel = dx * self.speed;
        }
    }

    pub(crate) fn begin_resting(&mut self) {
        self.state = ActorState::Resting;
        self.index = 1;
        self.x_vel = 0;
        self.y_vel = 0;
    }

    pub(crate) fn begin_auto_moving(&mut self, direction: Direction, now_ms: u64) {
        let (dx, dy) = direction.offset();
        self.direction = direction;
        self.state = ActorState::AutoMoving;
        self.x_vel = dx * self.speed;
        self.y_vel = dy * self.speed;
        self.move_timer = now_ms;
    }

    pub(crate) fn begin_auto_resting(&mut self, now_ms: u64) {
        self.state = ActorState::AutoResting;
        self.index = 1;
        self.x_vel = 0;
        self.y_vel = 0;
        self.move_timer = now_ms;
    }

    /// Player input: a held direction starts a step, but only from rest.
    pub(crate) fn steer(&mut self, held: Option<Direction>, now_ms: u64) {
        if self.state != ActorState::Resting {
            return;
        }
        if let Some(direction) = held {
            self.begin_moving(direction, now_ms);
        }
    }

    pub(crate) fn update(&mut self, now_ms: u64, dice: &mut Dice) {
        self.set_blockers();
        if !self.capabilities.movable {
            return;
        }
        match self.state {
            ActorState::Resting => {}
            ActorState::Moving | ActorState::AutoMoving => self.animate(now_ms, WALK_FRAME_MS),
            ActorState::AnimatedResting => self.animate(now_ms, IDLE_FRAME_MS),
            ActorState::AutoResting => {
                if now_ms.saturating_sub(self.move_timer) > AUTO_REST_DELAY_MS {
                    if let Some(direction) = dice.choose(&Direction::ALL).copied() {
                        self.begin_auto_moving(direction, now_ms);
                    }
                    self.move_timer = now_ms;
                }
            }
        }
    }

    pub(crate) fn apply_velocity(&mut self) {
        self.rect = self.rect.translated(self.x_vel, self.y_vel);
    }

    /// Undoes the last step along the axis that was moving.
    pub(crate) fn revert_step(&mut self) {
        if self.x_vel != 0 {
            self.rect.x -= self.x_vel;
        } else {
            self.rect.y -= self.y_vel;
        }
    }

    /// Source rect in the actor's sprite sheet for the current frame.
    pub(crate) fn frame(&self) -> Rect {
        let column = (self.index % 2) as i32 * TILE_SIZE;
        if self.kind == ActorKind::TreasureChest {
            return Rect::new(column, 0, TILE_SIZE, TILE_SIZE);
        }
        let (x, y) = match self.direction {
            Direction::Up => (column, 0),
            Direction::Down => (2 * TILE_SIZE + column, 0),
            Direction::Left => (column, TILE_SIZE),
            Direction::Right => (2 * TILE_SIZE + column, TILE_SIZE),
        };
        Rect::new(x, y, TILE_SIZE, TILE_SIZE)
    }

    fn animate(&mut self, now_ms: u64, frame_ms: u64) {
        if now_ms.saturating_sub(self.animate_timer) > frame_ms {
            self.index = (self.index + 1) % 2;
            self.animate_timer = now_ms;
        }
    }
}

fn straddled(position: i32) -> Vec<i32> {
    let floor = position.div_euclid(TILE_SIZE) * TILE_SIZE;
    if floor == position {
        vec![floor]
    } else {
        vec![floor + TILE_SIZE, floor]
    }
}

/// Ring of tiles at distance `WANDER_RADIUS` around a start tile. Wandering NPCs treat
/// the ring as walls.
fn wander_box_around(tile_x: i32, tile_y: i32) -> Vec<Rect> {
    let tile = |x: i32, y: i32| Rect::new(x * TILE_SIZE, y * TILE_SIZE, TILE_SIZE, TILE_SIZE);
    let mut ring = Vec::new();
    for x in (tile_x - WANDER_RADIUS)..=(tile_x + WANDER_RADIUS) {
        ring.push(tile(x, tile_y - WANDER_RADIUS));
        ring.push(tile(x, tile_y + WANDER_RADIUS));
    }
    for y in (tile_y - WANDER_RADIUS + 1)..=(tile_y + WANDER_RADIUS - 1) {
        ring.push(tile(tile_x - WANDER_RADIUS, y));
        ring.push(tile(tile_x + WANDER_RADIUS, y));
    }
    ring
}
