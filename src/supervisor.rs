//! Round supervisor: row clears, well height, score and game over.

use crate::bag::PermutationGenerator;
use crate::blocks::BlockId;
use crate::entity::{Cue, Entity, EntityId, Fate, MessageKind, Outbox, Stage};
use crate::highscores::RecordStore;
use crate::shapes::PieceKind;
use crate::sketch::{Mark, Sketch};
use log::{info, warn};

/// Rows in a full well.
pub const WELL_ROWS: i32 = 20;
/// Cells in a row needed to clear it.
pub const ROW_FILL: usize = 10;
/// A block counts toward a row only if its centre sits inside this band of the row.
const ROW_BAND: (f32, f32) = (0.25, 0.75);
/// The well's bottom row starts on top of the ground.
pub const WELL_FLOOR_Y: f32 = 1.0;

/// `20 - max(0, lost - lines)`: lost blocks shrink the well, cleared lines restore it.
pub fn well_height(lost_block_count: u32, line_count: u32) -> i32 {
    let deficit = i64::from(lost_block_count) - i64::from(line_count);
    let shrink = i32::try_from(deficit.max(0)).unwrap_or(i32::MAX);
    WELL_ROWS.saturating_sub(shrink)
}

/// Animated row sweep shown when the well grows or shrinks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    pub active: bool,
    pub elapsed: u32,
}

impl Transition {
    fn start(&mut self) {
        self.active = true;
        self.elapsed = 0;
    }

    fn tick(&mut self, height: i32) {
        self.elapsed = self.elapsed.saturating_add(1);
        if self.active && i64::from(self.elapsed) >= i64::from(height) {
            self.active = false;
        }
    }
}

/// What the HUD shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scoreboard {
    pub lines: u32,
    pub lost: u32,
    pub top: u32,
    pub height: i32,
    pub next: PieceKind,
    pub game_over: bool,
}

#[derive(Debug)]
pub struct Supervisor {
    queue: PermutationGenerator,
    line_count: u32,
    lost_block_count: u32,
    top_line_count: u32,
    heightening: Transition,
    lowering: Transition,
    game_over: bool,
    records: Box<dyn RecordStore>,
}

impl Supervisor {
    pub fn new(queue: PermutationGenerator, records: Box<dyn RecordStore>) -> Self {
        let top_line_count = records.load();
        Self {
            queue,
            line_count: 0,
            lost_block_count: 0,
            top_line_count,
            heightening: Transition::default(),
            lowering: Transition::default(),
            game_over: false,
            records,
        }
    }

    pub fn height(&self) -> i32 {
        well_height(self.lost_block_count, self.line_count)
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn line_count(&self) -> u32 {
        self.line_count
    }

    pub fn lost_block_count(&self) -> u32 {
        self.lost_block_count
    }

    pub fn top_line_count(&self) -> u32 {
        self.top_line_count
    }

    pub fn heightening(&self) -> Transition {
        self.heightening
    }

    pub fn lowering(&self) -> Transition {
        self.lowering
    }

    /// Consume the next piece kind from the bag.
    pub fn next_kind(&mut self) -> PieceKind {
        PieceKind::from_index(self.queue.next())
    }

    pub fn peek_kind(&mut self) -> PieceKind {
        PieceKind::from_index(self.queue.peek(0).unwrap_or(0))
    }

    pub fn scoreboard(&mut self) -> Scoreboard {
        Scoreboard {
            lines: self.line_count(),
            lost: self.lost_block_count(),
            top: self.top_line_count(),
            height: self.height(),
            next: self.peek_kind(),
            game_over: self.game_over,
        }
    }

    fn count_line(&mut self) {
        let before = self.height();
        self.line_count += 1;
        if self.line_count > self.top_line_count {
            self.top_line_count = self.line_count;
            if let Err(err) = self.records.save(self.top_line_count) {
                warn!("could not save best line count: {err}");
            }
        }
        if self.height() > before {
            self.lowering.active = false;
            self.heightening.start();
        }
    }

    fn add_lost(&mut self, addend: usize) {
        let before = self.height();
        let addend = u32::try_from(addend).unwrap_or(u32::MAX);
        self.lost_block_count = self.lost_block_count.saturating_add(addend);
        if self.height() < before {
            self.heightening.active = false;
            self.lowering.start();
        }
    }
}

/// Bucket every settled-looking block of every piece into its row.
fn fill_rows(stage: &Stage) -> Vec<Vec<(EntityId, BlockId)>> {
    let mut rows: Vec<Vec<(EntityId, BlockId)>> = vec![Vec::new(); WELL_ROWS as usize];
    for (id, piece) in stage.roster.pieces() {
        let Some(pose) = stage.physics.pose(piece.body()) else {
            continue;
        };
        let to_world = pose.transform();
        for &block in piece.blocks() {
            let Some(c) = stage.blocks.center(block) else {
                continue;
            };
            let y = to_world.transform_point2(c).y - WELL_FLOOR_Y;
            if !(0.0..WELL_ROWS as f32).contains(&y) {
                continue;
            }
            let fraction = y.fract();
            if (ROW_BAND.0..=ROW_BAND.1).contains(&fraction) {
                rows[y.floor() as usize].push((id, block));
            }
        }
    }
    rows
}

impl Entity for Supervisor {
    fn as_supervisor(&self) -> Option<&Supervisor> {
        Some(self)
    }

    fn as_supervisor_mut(&mut self) -> Option<&mut Supervisor> {
        Some(self)
    }

    fn control(&mut self, _stage: &mut Stage, _out: &mut Outbox) -> Fate {
        let height = self.height();
        self.heightening.tick(height);
        self.lowering.tick(height);
        Fate::Live
    }

    /// Clear at most one full row per tick, lowest first.
    fn judge(&mut self, stage: &mut Stage, out: &mut Outbox) {
        if self.game_over {
            return;
        }
        let rows = fill_rows(stage);
        let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() >= ROW_FILL) else {
            return;
        };
        let mut per_piece: Vec<(EntityId, Vec<BlockId>)> = Vec::new();
        for &(piece, block) in cells {
            match per_piece.iter_mut().find(|(p, _)| *p == piece) {
                Some((_, blocks)) => blocks.push(block),
                None => per_piece.push((piece, vec![block])),
            }
        }
        info!(
            "row {row} cleared: {} cells across {} pieces",
            cells.len(),
            per_piece.len()
        );
        for (piece, blocks) in per_piece {
            out.send(piece, MessageKind::Deletion(blocks));
        }
        self.count_line();
    }

    fn react(&mut self, message: MessageKind, stage: &mut Stage, _out: &mut Outbox) -> Fate {
        match message {
            MessageKind::AddToLostBlockCount(addend) => self.add_lost(addend),
            MessageKind::GameOver => {
                if !self.game_over {
                    info!(
                        "game over: {} lines, {} lost, best {}",
                        self.line_count, self.lost_block_count, self.top_line_count
                    );
                    self.game_over = true;
                    stage.raise(Cue::GameOver);
                }
            }
            _ => {}
        }
        Fate::Live
    }

    fn render(&self, _stage: &Stage, sketch: &mut Sketch) {
        let height = self.height();
        let (up, down) = (self.heightening(), self.lowering());
        if up.active {
            sketch.push(Mark::Band {
                row: up.elapsed as i32,
            });
        } else if down.active {
            sketch.push(Mark::Band {
                row: height - 1 - down.elapsed as i32,
            });
        }
        for i in 0..height.max(0) {
            sketch.push(Mark::WellLine {
                y: WELL_FLOOR_Y + 1.0 + i as f32,
            });
        }
    }
}
