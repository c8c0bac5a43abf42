//! App: terminal init, fixed-rate main loop, key handling and round restarts.

use crate::GameConfig;
use crate::bag::PermutationGenerator;
use crate::entity::Cue;
use crate::highscores;
use crate::input::{Action, Controls, KeyState};
use crate::physics::StepSettings;
use crate::rapier_world::RapierWorld;
use crate::shapes::PieceKind;
use crate::sim::Simulation;
use crate::theme::Theme;
use crate::ui::{self, Effects, View};
use anyhow::Result;
use crossterm::event::{self, Event};
use log::{debug, info};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Title,
    Playing,
}

/// What a key press asks the loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    sim: Simulation,
    screen: Screen,
    keys: KeyState,
    paused: bool,
    effects: Effects,
    rounds: u32,
}

/// A new round on a fresh rapier world.
fn new_round(config: &GameConfig, round: u32) -> Simulation {
    let bag = match config.seed {
        Some(seed) => PermutationGenerator::with_seed(PieceKind::ALL.len(), seed.wrapping_add(u64::from(round))),
        None => PermutationGenerator::from_entropy(PieceKind::ALL.len()),
    };
    Simulation::new(
        Box::new(RapierWorld::new()),
        highscores::open(config.records.clone()),
        bag,
        StepSettings::at_rate(config.frame_rate),
    )
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let sim = new_round(&config, 0);
        let screen = if config.show_title {
            Screen::Title
        } else {
            Screen::Playing
        };
        let effects = Effects::new(config.effects);
        Self {
            config,
            theme,
            sim,
            screen,
            keys: KeyState::default(),
            paused: false,
            effects,
            rounds: 0,
        }
    }

    fn restart(&mut self) {
        self.rounds += 1;
        info!("starting round {}", self.rounds + 1);
        self.sim = new_round(&self.config, self.rounds);
        self.keys.clear();
        self.effects.clear();
        self.paused = false;
        self.screen = Screen::Playing;
    }

    fn apply_action(&mut self, action: Action) -> Flow {
        match action {
            Action::Quit => return Flow::Exit,
            Action::Confirm => match self.screen {
                Screen::Title => {
                    info!("starting round 1");
                    self.screen = Screen::Playing;
                }
                Screen::Playing if self.sim.is_game_over() => self.restart(),
                Screen::Playing => {}
            },
            Action::Pause if self.screen == Screen::Playing && !self.sim.is_game_over() => {
                self.paused = !self.paused;
                debug!("paused: {}", self.paused);
                if self.paused {
                    self.keys.clear();
                }
            }
            _ => {}
        }
        Flow::Continue
    }

    /// One simulation frame, then hand its cues to the effect layer.
    fn tick(&mut self, now: Instant) {
        let controls = Controls {
            keys: self.keys.intent(now),
            pad: None,
        };
        self.sim.tick(controls);
        for cue in self.sim.take_cues() {
            if cue == Cue::GameOver {
                let queue = self.sim.queue();
                info!(
                    "round over: {} messages delivered, {} dropped",
                    queue.delivered(),
                    queue.dropped()
                );
            }
            self.effects.trigger(cue, &self.theme);
            if self.config.effects {
                ring_bell();
            }
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events make held keys exact; terminals without them fall back to key repeat
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let tick_interval = Duration::from_secs_f32(1.0 / self.config.frame_rate);
        let mut next_tick = Instant::now() + tick_interval;
        loop {
            let now = Instant::now();
            let sketch = self.sim.render();
            let view = View {
                screen: self.screen,
                sketch: &sketch,
                board: self.sim.scoreboard(),
                paused: self.paused,
                theme: &self.theme,
            };
            let effects = &mut self.effects;
            terminal.draw(|f| ui::draw(f, &view, effects, now))?;

            let timeout = next_tick.saturating_duration_since(Instant::now());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        let Some(action) = self.keys.handle(key, Instant::now()) else {
                            continue;
                        };
                        if self.apply_action(action) == Flow::Exit {
                            return Ok(());
                        }
                    }
                }
            }

            let now = Instant::now();
            if now >= next_tick {
                if self.screen == Screen::Playing && !self.paused {
                    self.tick(now);
                }
                next_tick += tick_interval;
                // Drop frames rather than fast-forward after a stall
                if next_tick < now {
                    next_tick = now + tick_interval;
                }
            }
        }
    }
}

fn ring_bell() {
    use crossterm::{execute, style::Print};
    let _ = execute!(std::io::stdout(), Print('\x07'));
}
