//! The fixed-step simulation loop.
//!
//! One tick runs four phases in order:
//!
//! 1. **control**: every entity active at the start of the phase gets
//!    [`Entity::control`]. Entities created during the phase join the roster
//!    right away but are first called in the next phase.
//! 2. **move**: [`Entity::advance`] on everyone, one physics step, then one
//!    `Contact` message per touching pair that involves the current piece.
//! 3. **judge**: the supervisor looks for a full row.
//! 4. **react**: queued messages are delivered in FIFO order until the queue
//!    is empty, including messages emitted while reacting. Messages addressed
//!    to an entity that is no longer active are dropped.

use crate::bag::PermutationGenerator;
use crate::entity::{Cue, Entity, EntityId, Envelope, Fate, Message, MessageKind, Outbox, Stage};
use crate::highscores::RecordStore;
use crate::input::Controls;
use crate::physics::{Physics, StepSettings};
use crate::player::Player;
use crate::scenery::Ground;
use crate::sketch::Sketch;
use crate::supervisor::{Scoreboard, Supervisor};
use log::{debug, trace};
use std::collections::VecDeque;

/// FIFO of undelivered messages.
#[derive(Debug, Default)]
pub struct MessageQueue {
    pending: VecDeque<Message>,
    delivered: u64,
    dropped: u64,
}

impl MessageQueue {
    pub fn push(&mut self, message: Message) {
        self.pending.push_back(message);
    }

    fn pop(&mut self) -> Option<Message> {
        self.pending.pop_front()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

pub struct Simulation {
    stage: Stage,
    queue: MessageQueue,
    settings: StepSettings,
}

impl Simulation {
    /// A fresh round: supervisor, player and ground, in that order.
    pub fn new(
        physics: Box<dyn Physics>,
        records: Box<dyn RecordStore>,
        bag: PermutationGenerator,
        settings: StepSettings,
    ) -> Self {
        let mut stage = Stage::new(physics);
        stage.supervisor = stage.allocate_id();
        let supervisor = Supervisor::new(bag, records);
        stage.roster.insert(stage.supervisor, Box::new(supervisor));
        stage.player = stage.allocate_id();
        stage.roster.insert(stage.player, Box::new(Player::new()));
        let ground_id = stage.allocate_id();
        let ground = Ground::new(&mut stage);
        stage.roster.insert(ground_id, Box::new(ground));
        Self {
            stage,
            queue: MessageQueue::default(),
            settings,
        }
    }

    #[cfg(test)]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    #[cfg(test)]
    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }

    /// Put what an entity emitted where it belongs.
    fn post(&mut self, out: Outbox) {
        for envelope in out.into_envelopes() {
            match envelope {
                Envelope::Creation(id, entity) => {
                    trace!("adopting {id:?}");
                    self.stage.roster.insert(id, entity);
                }
                Envelope::Delivery(message) => self.queue.push(message),
            }
        }
    }

    fn settle(&mut self, id: EntityId, entity: Box<dyn Entity>, fate: Fate) {
        match fate {
            Fate::Live => self.stage.roster.restore(id, entity),
            Fate::Remove => {
                trace!("retiring {id:?}");
                self.stage.roster.retire(id);
            }
        }
    }

    pub fn control(&mut self) {
        for id in self.stage.roster.ids() {
            let Some(mut entity) = self.stage.roster.take(id) else {
                continue;
            };
            let mut out = Outbox::new();
            let fate = entity.control(&mut self.stage, &mut out);
            self.settle(id, entity, fate);
            self.post(out);
        }
    }

    pub fn advance(&mut self) {
        for id in self.stage.roster.ids() {
            let Some(mut entity) = self.stage.roster.take(id) else {
                continue;
            };
            entity.advance(&mut self.stage);
            self.stage.roster.restore(id, entity);
        }
        self.stage.physics.step(&self.settings);

        let is_current = |id: Option<EntityId>, stage: &Stage| {
            id.and_then(|id| stage.roster.get(id))
                .is_some_and(|e| e.is_current())
        };
        for (a, b) in self.stage.physics.touching() {
            let target = if is_current(a, &self.stage) {
                a
            } else if is_current(b, &self.stage) {
                b
            } else {
                None
            };
            if let Some(to) = target {
                self.queue.push(Message {
                    to,
                    kind: MessageKind::Contact,
                });
            }
        }
    }

    pub fn judge(&mut self) {
        let id = self.stage.supervisor;
        let Some(mut supervisor) = self.stage.roster.take(id) else {
            return;
        };
        let mut out = Outbox::new();
        supervisor.judge(&mut self.stage, &mut out);
        self.stage.roster.restore(id, supervisor);
        self.post(out);
    }

    /// Deliver until nothing is left to deliver.
    pub fn react(&mut self) {
        while let Some(message) = self.queue.pop() {
            let Message { to, kind } = message;
            if !self.stage.roster.is_active(to) {
                trace!("dropping {kind:?} for inactive {to:?}");
                self.queue.dropped += 1;
                continue;
            }
            let Some(mut entity) = self.stage.roster.take(to) else {
                continue;
            };
            self.queue.delivered += 1;
            let mut out = Outbox::new();
            let fate = entity.react(kind, &mut self.stage, &mut out);
            self.settle(to, entity, fate);
            self.post(out);
        }
    }

    /// One full frame.
    pub fn tick(&mut self, controls: Controls) {
        self.stage.controls = controls;
        self.control();
        self.advance();
        self.judge();
        self.react();
    }

    pub fn render(&self) -> Sketch {
        let mut sketch = Sketch::new();
        for (_, entity) in self.stage.roster.iter() {
            entity.render(&self.stage, &mut sketch);
        }
        sketch
    }

    pub fn take_cues(&mut self) -> Vec<Cue> {
        let cues = self.stage.take_cues();
        if !cues.is_empty() {
            debug!("cues: {cues:?}");
        }
        cues
    }

    pub fn scoreboard(&mut self) -> Option<Scoreboard> {
        self.stage.supervisor_mut().map(Supervisor::scoreboard)
    }

    pub fn is_game_over(&self) -> bool {
        self.stage.supervisor().is_some_and(Supervisor::is_game_over)
    }
}
