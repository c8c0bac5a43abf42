//! The player entity: latches input each tick and brings in the next piece.

use crate::entity::{Entity, Fate, MessageKind, Outbox, Stage};
use crate::input::Intent;
use crate::piece::Piece;
use crate::supervisor::Supervisor;
use log::{debug, warn};

#[derive(Debug)]
pub struct Player {
    intent: Intent,
    /// Set when the current piece is done; the round starts with it set.
    change_piece: bool,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            intent: Intent::default(),
            change_piece: true,
        }
    }
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intent latched during this tick's control phase.
    pub fn intent(&self) -> Intent {
        self.intent
    }

    #[cfg(test)]
    pub fn wants_piece(&self) -> bool {
        self.change_piece
    }
}

impl Entity for Player {
    fn as_player(&self) -> Option<&Player> {
        Some(self)
    }

    fn control(&mut self, stage: &mut Stage, out: &mut Outbox) -> Fate {
        self.intent = stage.controls.intent();
        if !std::mem::take(&mut self.change_piece) {
            return Fate::Live;
        }
        if stage.well_height() <= 0 {
            debug!("well is gone, no room for another piece");
            out.send(stage.supervisor, MessageKind::GameOver);
            return Fate::Live;
        }
        match stage.supervisor_mut().map(Supervisor::next_kind) {
            Some(kind) => {
                let (id, piece) = Piece::spawn(kind, stage);
                debug!("spawned {kind:?} as {id:?}");
                out.create(id, piece);
            }
            None => warn!("no supervisor to draw the next piece from"),
        }
        Fate::Live
    }

    fn react(&mut self, message: MessageKind, _stage: &mut Stage, _out: &mut Outbox) -> Fate {
        if message == MessageKind::ChangePiece {
            self.change_piece = true;
        }
        Fate::Live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::PermutationGenerator;
    use crate::entity::Envelope;
    use crate::highscores::MemoryRecords;
    use crate::input::Controls;
    use crate::physics::Vec2;
    use crate::physics::scripted::ScriptedPhysics;

    fn stage_with_supervisor() -> Stage {
        let mut stage = Stage::new(Box::new(ScriptedPhysics::new()));
        stage.supervisor = stage.allocate_id();
        let supervisor = Supervisor::new(
            PermutationGenerator::with_seed(7, 3),
            Box::new(MemoryRecords::default()),
        );
        stage.roster.insert(stage.supervisor, Box::new(supervisor));
        stage
    }

    #[test]
    fn test_first_control_spawns_current_piece() {
        let mut stage = stage_with_supervisor();
        let expected = stage.supervisor_mut().unwrap().peek_kind();
        let mut player = Player::new();
        let mut out = Outbox::new();
        player.control(&mut stage, &mut out);
        assert!(!player.wants_piece());
        let created: Vec<_> = out
            .into_envelopes()
            .into_iter()
            .filter_map(|e| match e {
                Envelope::Creation(_, entity) => Some(entity),
                Envelope::Delivery(_) => None,
            })
            .collect();
        assert_eq!(created.len(), 1);
        assert!(created[0].is_current());
        assert_eq!(created[0].as_piece().map(Piece::kind), Some(expected));

        let mut quiet = Outbox::new();
        player.control(&mut stage, &mut quiet);
        assert!(quiet.is_empty());
    }

    #[test]
    fn test_change_piece_rearms() {
        let mut stage = stage_with_supervisor();
        let mut player = Player::new();
        let mut out = Outbox::new();
        player.control(&mut stage, &mut out);
        player.react(MessageKind::ChangePiece, &mut stage, &mut out);
        assert!(player.wants_piece());
        player.react(MessageKind::Contact, &mut stage, &mut out);
        assert!(player.wants_piece());
    }

    #[test]
    fn test_empty_well_asks_for_game_over() {
        let mut stage = stage_with_supervisor();
        let mut scratch = Stage::new(Box::new(ScriptedPhysics::new()));
        if let Some(sup) = stage.supervisor_mut() {
            sup.react(MessageKind::AddToLostBlockCount(20), &mut scratch, &mut Outbox::new());
        }
        assert_eq!(stage.well_height(), 0);
        let mut player = Player::new();
        let mut out = Outbox::new();
        player.control(&mut stage, &mut out);
        assert_eq!(out.creations(), 0);
        let sent: Vec<_> = out.messages().cloned().collect();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, stage.supervisor);
        assert_eq!(sent[0].kind, MessageKind::GameOver);
    }

    #[test]
    fn test_intent_is_latched_from_controls() {
        let mut stage = stage_with_supervisor();
        stage.controls = Controls {
            keys: Intent {
                direction: Vec2::new(-1.0, 0.0),
                rotation: 1.0,
            },
            pad: None,
        };
        let mut player = Player::new();
        let mut out = Outbox::new();
        player.control(&mut stage, &mut out);
        stage.controls = Controls::default();
        assert_eq!(player.intent().direction, Vec2::new(-1.0, 0.0));
        assert_eq!(player.intent().rotation, 1.0);
    }
}
