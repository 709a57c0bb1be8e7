use crown_engine::EventQueue;
use tracing::{debug, info};

use super::actor::{Actor, ActorKind, ActorState};
use super::game_data::{GameData, ELIXIR, FIRE_BLAST};
use super::player_menu::CLICK;

const REOPEN_DELAY_MS: u64 = 300;
pub(crate) const EMPTY_CHEST: &str = "Empty.";
pub(crate) const BROTHER_HURRY: &str = "Hurry! There is precious little time.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialogueOutcome {
    Open,
    Closed,
    Battle,
}

/// Conversation with one NPC at a time. NPCs are addressed by their index in the level's
/// actor list, which never reorders.
#[derive(Debug, Clone, Default)]
pub(crate) struct DialogueHandler {
    talking_to: Option<usize>,
    line: usize,
    last_closed: u64,
    reset_lines: Option<(usize, Vec<String>)>,
}

impl DialogueHandler {
    /// `reset_lines` replaces an NPC's lines the next time a conversation with it ends.
    pub(crate) fn new(reset_lines: Option<(usize, Vec<String>)>) -> Self {
        Self {
            reset_lines,
            ..Self::default()
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.talking_to.is_some()
    }

    pub(crate) fn talking_to(&self) -> Option<usize> {
        self.talking_to
    }

    /// Starts talking to the NPC on the tile the player faces.
    pub(crate) fn try_open(&mut self, player: &Actor, npcs: &mut [Actor], now_ms: u64, events: &mut EventQueue) -> bool {
        if self.is_open()
            || player.state != ActorState::Resting
            || now_ms.saturating_sub(self.last_closed) <= REOPEN_DELAY_MS
        {
            return false;
        }
        let (tile_x, tile_y) = player.tile_location();
        let (dx, dy) = player.direction.offset();
        let target = (tile_x + dx, tile_y + dy);
        let Some(index) = npcs
            .iter()
            .position(|npc| npc.is_aligned() && npc.tile_location() == target && !npc.dialogue.is_empty())
        else {
            return false;
        };

        let npc = &mut npcs[index];
        npc.direction = player.direction.opposite();
        if npc.capabilities.container {
            npc.index = 1;
        }
        self.talking_to = Some(index);
        self.line = 0;
        events.play_sound(CLICK);
        debug!(kind = ?npc.kind, line = %npc.dialogue[0], "dialogue_opened");
        true
    }

    /// Space while talking: next line, or hand over items and advance quests after the
    /// last one.
    pub(crate) fn advance(
        &mut self,
        npcs: &mut [Actor],
        data: &mut GameData,
        now_ms: u64,
        events: &mut EventQueue,
    ) -> DialogueOutcome {
        let Some(index) = self.talking_to else {
            return DialogueOutcome::Closed;
        };
        let Some(npc) = npcs.get_mut(index) else {
            self.talking_to = None;
            return DialogueOutcome::Closed;
        };

        if self.line + 1 < npc.dialogue.len() {
            self.line += 1;
            debug!(line = %npc.dialogue[self.line], "dialogue_line");
            return DialogueOutcome::Open;
        }

        if let Some(item) = npc.item.take() {
            self.give_item(index, npc, &item, data);
        }

        if let Some(battle) = npc.battle.clone().filter(|_| npc.capabilities.battler) {
            info!(battle = %battle, "dialogue_battle");
            data.battle_type = Some(battle);
            self.finish(npcs, now_ms, events);
            return DialogueOutcome::Battle;
        }

        match npc.kind {
            ActorKind::OldManBrother if data.talked_to_sick_brother && !data.has_brother_elixir => {
                let item = if data.brother_item.is_empty() {
                    ELIXIR.to_string()
                } else {
                    data.brother_item.clone()
                };
                data.has_brother_elixir = true;
                self.give_item(index, npc, &item, data);
                npc.dialogue = vec![BROTHER_HURRY.to_string()];
            }
            ActorKind::OldMan => {
                if data.has_brother_elixir && !data.elixir_received {
                    data.player_inventory.remove(ELIXIR);
                    data.elixir_received = true;
                    npc.dialogue = lines(&["My good health is thanks to you.", "I will be forever in your debt."]);
                } else if !data.talked_to_sick_brother {
                    data.talked_to_sick_brother = true;
                    npc.dialogue = lines(&["Hurry to the NorthEast Shores!", "I do not have much time left."]);
                }
            }
            ActorKind::King => {
                if !data.talked_to_king {
                    data.talked_to_king = true;
                    npc.dialogue = lines(&[
                        "Hurry to the castle in the NorthWest!",
                        "The sorceror who lives there has my crown.",
                        "Please retrieve it for me.",
                    ]);
                } else if data.crown_quest {
                    info!("crown_delivered");
                    data.delivered_crown = true;
                }
            }
            _ => {}
        }

        self.finish(npcs, now_ms, events);
        DialogueOutcome::Closed
    }

    fn give_item(&mut self, index: usize, npc: &mut Actor, item: &str, data: &mut GameData) {
        info!(item, kind = ?npc.kind, "item_received");
        data.grant_item(item);
        if npc.capabilities.container {
            if let Some(id) = npc.chest_id {
                data.looted_chests.insert(id);
            }
            npc.dialogue = vec![EMPTY_CHEST.to_string()];
        } else if npc.kind == ActorKind::OldManBrother {
            data.brother_item.clear();
        }
        if item == ELIXIR {
            data.has_brother_elixir = true;
            data.old_man_gift = Some(FIRE_BLAST.to_string());
            self.reset_lines = Some((index, vec![BROTHER_HURRY.to_string()]));
        }
    }

    fn finish(&mut self, npcs: &mut [Actor], now_ms: u64, events: &mut EventQueue) {
        let talking_to = self.talking_to;
        if talking_to.is_some() && self.reset_lines.as_ref().map(|(index, _)| *index) == talking_to {
            if let Some((index, dialogue)) = self.reset_lines.take() {
                if let Some(npc) = npcs.get_mut(index) {
                    npc.dialogue = dialogue;
                }
            }
        }
        self.talking_to = None;
        self.line = 0;
        self.last_closed = now_ms;
        for npc in npcs.iter_mut() {
            if npc.state == ActorState::Resting {
                npc.direction = npc.default_direction;
            }
        }
        events.play_sound(CLICK);
    }
}

pub(crate) fn lines(text: &[&str]) -> Vec<String> {
    text.iter().map(|line| line.to_string()).collect()
}
