//! Entities, the messages they exchange, and the stage they share.
//!
//! Every simulated object implements [`Entity`]. All capabilities have no-op
//! defaults, so an entity only spells out the phases and messages it cares
//! about. Entities never hold references to each other: they address peers by
//! [`EntityId`] and reach shared state (physics, blocks, the roster) through
//! the [`Stage`] handed to each call.

use crate::blocks::{BlockArena, BlockId};
use crate::input::Controls;
use crate::physics::Physics;
use crate::piece::Piece;
use crate::player::Player;
use crate::sketch::Sketch;
use crate::supervisor::{Supervisor, WELL_ROWS};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    /// Placeholder for a well-known id that has not been assigned yet.
    pub const NONE: Self = Self(0);

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn from_raw(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }
}

/// What an entity wants after `control` or `react`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    Live,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Player: the current piece is done, bring the next one.
    ChangePiece,
    /// Current piece: its body touched something.
    Contact,
    /// Piece: these of your blocks are gone.
    Deletion(Vec<BlockId>),
    /// Supervisor: this many blocks left the world.
    AddToLostBlockCount(usize),
    /// Supervisor: the round is over.
    GameOver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: EntityId,
    pub kind: MessageKind,
}

/// One thing emitted by an entity during a phase.
pub enum Envelope {
    /// A new entity for the loop to adopt. Never delivered to `react`.
    Creation(EntityId, Box<dyn Entity>),
    Delivery(Message),
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creation(id, entity) => f.debug_tuple("Creation").field(id).field(entity).finish(),
            Self::Delivery(m) => f.debug_tuple("Delivery").field(m).finish(),
        }
    }
}

/// Ordered collection of what one entity emitted in one call.
#[derive(Debug, Default)]
pub struct Outbox {
    envelopes: Vec<Envelope>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, id: EntityId, entity: impl Entity + 'static) {
        self.envelopes.push(Envelope::Creation(id, Box::new(entity)));
    }

    pub fn send(&mut self, to: EntityId, kind: MessageKind) {
        self.envelopes.push(Envelope::Delivery(Message { to, kind }));
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn into_envelopes(self) -> Vec<Envelope> {
        self.envelopes
    }

    /// Deliveries only, in emission order.
    #[cfg(test)]
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.envelopes.iter().filter_map(|e| match e {
            Envelope::Delivery(m) => Some(m),
            Envelope::Creation(..) => None,
        })
    }

    #[cfg(test)]
    pub fn creations(&self) -> usize {
        self.envelopes
            .iter()
            .filter(|e| matches!(e, Envelope::Creation(..)))
            .count()
    }
}

/// Uniform contract for everything in the simulation.
pub trait Entity: fmt::Debug {
    fn as_piece(&self) -> Option<&Piece> {
        None
    }

    /// True only for the piece under player control.
    fn is_current(&self) -> bool {
        false
    }

    fn as_player(&self) -> Option<&Player> {
        None
    }

    fn as_supervisor(&self) -> Option<&Supervisor> {
        None
    }

    fn as_supervisor_mut(&mut self) -> Option<&mut Supervisor> {
        None
    }

    /// Intent phase.
    fn control(&mut self, _stage: &mut Stage, _out: &mut Outbox) -> Fate {
        Fate::Live
    }

    /// Move phase, before the physics world steps.
    fn advance(&mut self, _stage: &mut Stage) {}

    /// Judge phase. Only the supervisor is asked.
    fn judge(&mut self, _stage: &mut Stage, _out: &mut Outbox) {}

    fn react(&mut self, _message: MessageKind, _stage: &mut Stage, _out: &mut Outbox) -> Fate {
        Fate::Live
    }

    fn render(&self, _stage: &Stage, _sketch: &mut Sketch) {}
}

struct Slot {
    id: EntityId,
    /// `None` while the entity is out being called.
    entity: Option<Box<dyn Entity>>,
}

/// Live entities in creation order.
#[derive(Default)]
pub struct Roster {
    slots: Vec<Slot>,
}

impl Roster {
    pub fn insert(&mut self, id: EntityId, entity: Box<dyn Entity>) {
        self.slots.push(Slot {
            id,
            entity: Some(entity),
        });
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    pub fn is_active(&self, id: EntityId) -> bool {
        self.position(id).is_some()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.slots.iter().map(|s| s.id).collect()
    }

    pub fn get(&self, id: EntityId) -> Option<&dyn Entity> {
        let slot = &self.slots[self.position(id)?];
        slot.entity.as_deref()
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut (dyn Entity + 'static)> {
        let index = self.position(id)?;
        self.slots[index].entity.as_deref_mut()
    }

    /// Borrow an entity out of its slot; the slot stays (and stays active).
    pub fn take(&mut self, id: EntityId) -> Option<Box<dyn Entity>> {
        let index = self.position(id)?;
        self.slots[index].entity.take()
    }

    pub fn restore(&mut self, id: EntityId, entity: Box<dyn Entity>) {
        if let Some(index) = self.position(id) {
            self.slots[index].entity = Some(entity);
        }
    }

    /// Deactivate: the slot goes away, queued messages to `id` will be dropped.
    pub fn retire(&mut self, id: EntityId) {
        if let Some(index) = self.position(id) {
            self.slots.remove(index);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &dyn Entity)> {
        self.slots
            .iter()
            .filter_map(|s| s.entity.as_deref().map(|e| (s.id, e)))
    }

    pub fn pieces(&self) -> impl Iterator<Item = (EntityId, &Piece)> {
        self.iter().filter_map(|(id, e)| e.as_piece().map(|p| (id, p)))
    }
}

/// Audio/visual cue raised by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    LineClear,
    GameOver,
}

/// Shared simulation context handed to every entity call.
pub struct Stage {
    pub physics: Box<dyn Physics>,
    pub blocks: BlockArena,
    pub roster: Roster,
    pub controls: Controls,
    pub player: EntityId,
    pub supervisor: EntityId,
    cues: Vec<Cue>,
    next_id: u64,
}

impl Stage {
    pub fn new(physics: Box<dyn Physics>) -> Self {
        Self {
            physics,
            blocks: BlockArena::new(),
            roster: Roster::default(),
            controls: Controls::default(),
            player: EntityId::NONE,
            supervisor: EntityId::NONE,
            cues: Vec::new(),
            next_id: 0,
        }
    }

    pub fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    /// Raise a cue; repeats within the same tick collapse into one.
    pub fn raise(&mut self, cue: Cue) {
        if !self.cues.contains(&cue) {
            self.cues.push(cue);
        }
    }

    pub fn take_cues(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.cues)
    }

    pub fn supervisor(&self) -> Option<&Supervisor> {
        self.roster.get(self.supervisor)?.as_supervisor()
    }

    pub fn supervisor_mut(&mut self) -> Option<&mut Supervisor> {
        self.roster.get_mut(self.supervisor)?.as_supervisor_mut()
    }

    pub fn player(&self) -> Option<&Player> {
        self.roster.get(self.player)?.as_player()
    }

    /// Current playable well height (full height when no supervisor is around).
    pub fn well_height(&self) -> i32 {
        self.supervisor().map_or(WELL_ROWS, Supervisor::height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::scripted::ScriptedPhysics;

    #[derive(Debug)]
    struct Dummy;
    impl Entity for Dummy {}

    #[test]
    fn test_default_capabilities_are_inert() {
        let mut stage = Stage::new(Box::new(ScriptedPhysics::new()));
        let mut out = Outbox::new();
        let mut d = Dummy;
        assert!(d.as_piece().is_none());
        assert!(!d.is_current());
        assert_eq!(d.control(&mut stage, &mut out), Fate::Live);
        assert_eq!(d.react(MessageKind::GameOver, &mut stage, &mut out), Fate::Live);
        assert!(out.is_empty());
    }

    #[test]
    fn test_roster_take_keeps_slot_active() {
        let mut roster = Roster::default();
        let id = EntityId(7);
        roster.insert(id, Box::new(Dummy));
        let e = roster.take(id).unwrap();
        assert!(roster.is_active(id));
        assert!(roster.get(id).is_none());
        roster.restore(id, e);
        assert!(roster.get(id).is_some());
        roster.retire(id);
        assert!(!roster.is_active(id));
    }

    #[test]
    fn test_cues_deduplicate_until_taken() {
        let mut stage = Stage::new(Box::new(ScriptedPhysics::new()));
        stage.raise(Cue::LineClear);
        stage.raise(Cue::LineClear);
        stage.raise(Cue::GameOver);
        assert_eq!(stage.take_cues(), vec![Cue::LineClear, Cue::GameOver]);
        assert!(stage.take_cues().is_empty());
    }

    #[test]
    fn test_ids_are_unique_and_nonzero() {
        let mut stage = Stage::new(Box::new(ScriptedPhysics::new()));
        let a = stage.allocate_id();
        let b = stage.allocate_id();
        assert_ne!(a, b);
        assert_ne!(a, EntityId::NONE);
        assert_eq!(EntityId::from_raw(a.raw()), Some(a));
        assert_eq!(EntityId::from_raw(0), None);
    }
}
