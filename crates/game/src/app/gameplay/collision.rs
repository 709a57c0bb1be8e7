use crown_engine::Rect;
use tracing::debug;

use super::actor::{Actor, ActorState};
use super::scene_id::SceneId;

pub(crate) const BATTLE_COUNTER_START: i32 = 50;
pub(crate) const BATTLE_COUNTER_STEP: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Portal {
    pub(crate) rect: Rect,
    pub(crate) destination: SceneId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollisionSignal {
    Portal(SceneId),
    Battle,
}

/// Moves the player and NPCs each tick and undoes any step that lands on something solid.
#[derive(Debug, Clone)]
pub(crate) struct CollisionEngine {
    static_blockers: Vec<Rect>,
    portals: Vec<Portal>,
    battles_allowed: bool,
    battle_counter: i32,
}

impl CollisionEngine {
    pub(crate) fn new(static_blockers: Vec<Rect>, portals: Vec<Portal>, battles_allowed: bool) -> Self {
        Self {
            static_blockers,
            portals,
            battles_allowed,
            battle_counter: BATTLE_COUNTER_START,
        }
    }

    pub(crate) fn battle_counter(&self) -> i32 {
        self.battle_counter
    }

    pub(crate) fn update(&mut self, player: &mut Actor, npcs: &mut [Actor], now_ms: u64) -> Option<CollisionSignal> {
        let blockers = self.blocker_list(npcs);

        player.apply_velocity();
        self.check_for_blockers(&blockers, player, npcs, now_ms);
        for npc in npcs.iter_mut() {
            npc.apply_velocity();
        }
        self.check_for_blockers(&blockers, player, npcs, now_ms);

        let mut signal = None;
        if player.is_aligned() {
            if player.state != ActorState::Resting {
                signal = self.check_for_portal(player).or_else(|| self.check_for_battle());
            }
            player.begin_resting();
        }

        for npc in npcs.iter_mut() {
            if npc.state == ActorState::AutoMoving && npc.is_aligned() {
                npc.begin_auto_resting(now_ms);
            }
        }
        signal
    }

    fn blocker_list(&self, npcs: &[Actor]) -> Vec<Rect> {
        let mut blockers = self.static_blockers.clone();
        for npc in npcs {
            blockers.extend(npc.blockers.iter().copied());
        }
        blockers
    }

    fn check_for_blockers(&self, blockers: &[Rect], player: &mut Actor, npcs: &mut [Actor], now_ms: u64) {
        let player_collided = blockers.iter().any(|blocker| player.rect.intersects(blocker));

        let mut collided = Vec::new();
        for (index, npc) in npcs.iter().enumerate() {
            if npc.state != ActorState::AutoMoving {
                continue;
            }
            let hits_wall = self
                .static_blockers
                .iter()
                .any(|blocker| npc.rect.intersects(blocker));
            let hits_player = npc.rect.intersects(&player.rect);
            let hits_npc = npcs
                .iter()
                .enumerate()
                .any(|(other, sprite)| other != index && npc.rect.intersects(&sprite.rect));
            let hits_fence = npc.wander_box.iter().any(|blocker| npc.rect.intersects(blocker));
            if hits_wall || hits_player || hits_npc || hits_fence {
                collided.push(index);
            }
        }

        if player_collided {
            player.revert_step();
            player.begin_resting();
        }
        for index in collided {
            if let Some(npc) = npcs.get_mut(index) {
                npc.revert_step();
                npc.begin_auto_resting(now_ms);
            }
        }
    }

    fn check_for_portal(&self, player: &Actor) -> Option<CollisionSignal> {
        let portal = self
            .portals
            .iter()
            .find(|portal| player.rect.intersects(&portal.rect))?;
        debug!(destination = portal.destination.name(), "portal_entered");
        Some(CollisionSignal::Portal(portal.destination))
    }

    fn check_for_battle(&mut self) -> Option<CollisionSignal> {
        if !self.battles_allowed {
            return None;
        }
        self.battle_counter -= BATTLE_COUNTER_STEP;
        debug!(counter = self.battle_counter, "battle_counter");
        (self.battle_counter <= 0).then_some(CollisionSignal::Battle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::actor::{ActorKind, Direction, PLAYER_SPEED};

    fn tile(x: i32, y: i32) -> Rect {
        Rect::new(x * 32, y * 32, 32, 32)
    }

    fn walk(engine: &mut CollisionEngine, player: &mut Actor, npcs: &mut [Actor], direction: Direction) -> Option<CollisionSignal> {
        player.begin_moving(direction, 0);
        let mut signal = None;
        for _ in 0..(32 / PLAYER_SPEED) {
            signal = engine.update(player, npcs, 0);
            if player.state == ActorState::Resting {
                break;
            }
        }
        signal
    }

    #[test]
    fn player_walking_into_wall_reverts_and_rests() {
        let mut engine = CollisionEngine::new(vec![tile(3, 2)], Vec::new(), false);
        let mut player = Actor::player(64, 64, Direction::Right);
        player.begin_moving(Direction::Right, 0);

        engine.update(&mut player, &mut [], 0);

        assert_eq!((player.rect.x, player.rect.y), (64, 64));
        assert_eq!(player.state, ActorState::Resting);
        assert_eq!((player.x_vel, player.y_vel), (0, 0));
    }

    #[test]
    fn full_step_ends_on_the_next_tile_at_rest() {
        let mut engine = CollisionEngine::new(Vec::new(), Vec::new(), false);
        let mut player = Actor::player(64, 64, Direction::Down);
        let signal = walk(&mut engine, &mut player, &mut [], Direction::Down);
        assert_eq!(signal, None);
        assert_eq!((player.rect.x, player.rect.y), (64, 96));
        assert_eq!(player.state, ActorState::Resting);
    }

    #[test]
    fn stepping_onto_a_portal_signals_its_destination() {
        let portal = Portal {
            rect: tile(2, 3),
            destination: SceneId::Inn,
        };
        let mut engine = CollisionEngine::new(Vec::new(), vec![portal], true);
        let mut player = Actor::player(64, 64, Direction::Down);
        let signal = walk(&mut engine, &mut player, &mut [], Direction::Down);
        assert_eq!(signal, Some(CollisionSignal::Portal(SceneId::Inn)));
        assert_eq!(engine.battle_counter(), BATTLE_COUNTER_START);
    }

    #[test]
    fn encounter_fires_after_counter_runs_out() {
        let mut engine = CollisionEngine::new(Vec::new(), Vec::new(), true);
        let mut player = Actor::player(0, 0, Direction::Right);
        let steps = BATTLE_COUNTER_START / BATTLE_COUNTER_STEP;
        for step in 1..steps {
            let signal = walk(&mut engine, &mut player, &mut [], Direction::Right);
            assert_eq!(signal, None, "step {step}");
        }
        let signal = walk(&mut engine, &mut player, &mut [], Direction::Right);
        assert_eq!(signal, Some(CollisionSignal::Battle));
    }

    #[test]
    fn towns_never_count_down() {
        let mut engine = CollisionEngine::new(Vec::new(), Vec::new(), false);
        let mut player = Actor::player(0, 0, Direction::Right);
        for _ in 0..20 {
            assert_eq!(walk(&mut engine, &mut player, &mut [], Direction::Right), None);
        }
        assert_eq!(engine.battle_counter(), BATTLE_COUNTER_START);
    }

    #[test]
    fn player_cannot_walk_into_a_standing_npc() {
        let mut engine = CollisionEngine::new(Vec::new(), Vec::new(), false);
        let mut npcs = vec![Actor::new(ActorKind::OldMan, 64, 96, Direction::Up, ActorState::Resting)];
        let mut player = Actor::player(64, 64, Direction::Down);
        player.begin_moving(Direction::Down, 0);
        engine.update(&mut player, &mut npcs, 0);
        assert_eq!(player.rect.y, 64);
        assert_eq!(player.state, ActorState::Resting);
        assert_eq!(npcs[0].state, ActorState::Resting);
    }

    #[test]
    fn wandering_npc_bounces_off_its_fence() {
        let mut engine = CollisionEngine::new(Vec::new(), Vec::new(), false);
        let mut npc = Actor::new(ActorKind::Devil, 320, 320, Direction::Down, ActorState::AutoResting);
        npc.rect = tile(10, 12);
        npc.begin_auto_moving(Direction::Down, 0);
        let mut npcs = vec![npc];
        let mut player = Actor::player(0, 0, Direction::Down);

        engine.update(&mut player, &mut npcs, 0);

        assert_eq!(npcs[0].rect, tile(10, 12));
        assert_eq!(npcs[0].state, ActorState::AutoResting);
    }

    #[test]
    fn npc_stops_when_reaching_the_next_tile() {
        let mut engine = CollisionEngine::new(Vec::new(), Vec::new(), false);
        let mut npcs = vec![Actor::new(ActorKind::Soldier, 320, 320, Direction::Down, ActorState::AutoResting)];
        npcs[0].begin_auto_moving(Direction::Left, 0);
        let mut player = Actor::player(0, 0, Direction::Down);
        for _ in 0..32 {
            engine.update(&mut player, &mut npcs, 0);
        }
        assert_eq!(npcs[0].rect, tile(9, 10));
        assert_eq!(npcs[0].state, ActorState::AutoResting);
    }
}
