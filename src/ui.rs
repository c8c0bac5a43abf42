//! Layout and drawing: title screen, half-block board, sidebar, overlays and cue effects.
//!
//! The board is rasterized from the simulation's [`Sketch`] into a pixel grid,
//! two pixels per terminal cell using `▀` with separate fg/bg colours.

use crate::app::Screen;
use crate::entity::Cue;
use crate::physics::{Pose, Vec2};
use crate::shapes::PieceKind;
use crate::sketch::{Mark, Shade, Sketch};
use crate::supervisor::{Scoreboard, WELL_FLOOR_Y};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// The drawn world: the well is 10 blocks wide and pieces spawn up to 23 blocks high.
pub const WORLD_WIDTH: f32 = 10.0;
pub const WORLD_HEIGHT: f32 = 23.0;

const SIDEBAR_WIDTH: u16 = 22;
const LINE_CLEAR_FLASH_MS: u32 = 250;
const GAME_OVER_FADE_MS: u32 = 900;

/// A world-space window rasterized at `scale` pixels per block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl Viewport {
    pub const fn board(scale: f32) -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
            scale,
        }
    }

    pub fn pixel_width(&self) -> usize {
        (self.width * self.scale).floor() as usize
    }

    pub fn pixel_height(&self) -> usize {
        (self.height * self.scale).floor() as usize
    }

    /// Terminal cells covered: one column per pixel, two pixel rows per cell.
    pub fn cells(&self) -> (u16, u16) {
        let w = u16::try_from(self.pixel_width()).unwrap_or(u16::MAX);
        let h = u16::try_from(self.pixel_height().div_ceil(2)).unwrap_or(u16::MAX);
        (w, h)
    }

    /// World position of a pixel centre.
    fn world(&self, px: usize, py: usize) -> Vec2 {
        Vec2::new(
            (px as f32 + 0.5) / self.scale,
            self.height - (py as f32 + 0.5) / self.scale,
        )
    }
}

/// Rasterized colours, row-major; `None` where nothing was drawn.
#[derive(Debug, Clone)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<Option<Color>>,
}

impl Raster {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![None; width * height],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x]
        } else {
            None
        }
    }

    fn set(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = Some(color);
        }
    }

    /// Paint every pixel whose centre falls in the world rectangle `[min, max)`.
    fn fill(&mut self, vp: Viewport, min: Vec2, max: Vec2, color: Color) {
        for py in 0..self.height {
            for px in 0..self.width {
                let p = vp.world(px, py);
                if p.x >= min.x && p.x < max.x && p.y >= min.y && p.y < max.y {
                    self.set(px, py, color);
                }
            }
        }
    }
}

/// Point-in-quad for counter-clockwise convex corners.
fn inside(corners: &[Vec2; 4], p: Vec2) -> bool {
    (0..4).all(|i| {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x) >= 0.0
    })
}

/// Paint a sketch in mark order; later marks cover earlier ones.
pub fn rasterize(sketch: &Sketch, theme: &Theme, vp: Viewport) -> Raster {
    let mut raster = Raster::new(vp.pixel_width(), vp.pixel_height());
    for mark in &sketch.marks {
        match mark {
            Mark::Band { row } => {
                let bottom = WELL_FLOOR_Y + *row as f32;
                raster.fill(
                    vp,
                    Vec2::new(0.0, bottom),
                    Vec2::new(vp.width, bottom + 1.0),
                    theme.inactive_fg,
                );
            }
            Mark::WellLine { y } => {
                let py = ((vp.height - y) * vp.scale).floor();
                if py >= 0.0 {
                    let py = py as usize;
                    for px in 0..raster.width {
                        raster.set(px, py, theme.div_line);
                    }
                }
            }
            Mark::Ground { min, max } => raster.fill(vp, *min, *max, theme.main_fg),
            Mark::Cell { corners, shade } => {
                let color = match shade {
                    Shade::Piece(kind) => theme.piece_color(*kind),
                    Shade::Fading(level) => Theme::flash_color(*level),
                };
                let (lo, hi) = corners.iter().fold(
                    (Vec2::new(f32::MAX, f32::MAX), Vec2::new(f32::MIN, f32::MIN)),
                    |(lo, hi), c| {
                        (
                            Vec2::new(lo.x.min(c.x), lo.y.min(c.y)),
                            Vec2::new(hi.x.max(c.x), hi.y.max(c.y)),
                        )
                    },
                );
                let x0 = (lo.x * vp.scale).floor().max(0.0) as usize;
                let x1 = ((hi.x * vp.scale).ceil().max(0.0) as usize).min(raster.width);
                let y0 = ((vp.height - hi.y) * vp.scale).floor().max(0.0) as usize;
                let y1 = (((vp.height - lo.y) * vp.scale).ceil().max(0.0) as usize).min(raster.height);
                for py in y0..y1 {
                    for px in x0..x1 {
                        if inside(corners, vp.world(px, py)) {
                            raster.set(px, py, color);
                        }
                    }
                }
            }
        }
    }
    raster
}

/// Largest whole pixels-per-block that fits the board, its border and the sidebar in `area`.
pub fn board_scale(area: Rect) -> f32 {
    let avail_w = area.width.saturating_sub(SIDEBAR_WIDTH + 2) as f32;
    let avail_h = area.height.saturating_sub(2) as f32 * 2.0;
    (avail_w / WORLD_WIDTH).min(avail_h / WORLD_HEIGHT).floor().max(1.0)
}

/// Copy a raster into the buffer with half blocks, clipped to `area`.
fn paint(frame: &mut Frame, raster: &Raster, area: Rect, bg: Color) {
    let area = area.intersection(frame.area());
    let buf = frame.buffer_mut();
    for row in 0..area.height {
        for col in 0..area.width {
            let (x, y) = (col as usize, row as usize * 2);
            let top = raster.get(x, y).unwrap_or(bg);
            let bottom = raster.get(x, y + 1).unwrap_or(bg);
            buf[(area.x + col, area.y + row)]
                .set_symbol("▀")
                .set_style(Style::default().fg(top).bg(bottom));
        }
    }
}

/// Cue-driven tachyonfx effects layered over the board.
pub struct Effects {
    enabled: bool,
    running: Vec<Effect>,
    last_frame: Option<Instant>,
}

impl Effects {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            running: Vec::new(),
            last_frame: None,
        }
    }

    pub fn trigger(&mut self, cue: Cue, theme: &Theme) {
        if !self.enabled {
            return;
        }
        let effect = match cue {
            Cue::LineClear => fx::fade_from(
                Color::White,
                theme.bg,
                (LINE_CLEAR_FLASH_MS, Interpolation::QuadOut),
            ),
            Cue::GameOver => fx::fade_from(
                Color::Rgb(0xFF, 0x40, 0x40),
                Color::Rgb(0x40, 0x00, 0x00),
                (GAME_OVER_FADE_MS, Interpolation::Linear),
            ),
        };
        self.running.push(effect);
    }

    pub fn clear(&mut self) {
        self.running.clear();
        self.last_frame = None;
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, now: Instant) {
        if self.running.is_empty() {
            self.last_frame = None;
            return;
        }
        let delta = self
            .last_frame
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(std::time::Duration::ZERO);
        self.last_frame = Some(now);
        let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
        for effect in &mut self.running {
            frame.render_effect(effect, area, TfxDuration::from_millis(delta_ms));
        }
        self.running.retain(|e| !e.done());
    }
}

/// Everything one frame shows.
pub struct View<'a> {
    pub screen: Screen,
    pub sketch: &'a Sketch,
    pub board: Option<Scoreboard>,
    pub paused: bool,
    pub theme: &'a Theme,
}

pub fn draw(frame: &mut Frame, view: &View, effects: &mut Effects, now: Instant) {
    let area = frame.area();
    match view.screen {
        Screen::Title => draw_title(frame, view.theme, area),
        Screen::Playing => {
            let board_rect = draw_game(frame, view, area);
            effects.render(frame, board_rect, now);
        }
    }
}

fn popup(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn bordered(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_title(frame: &mut Frame, theme: &Theme, area: Rect) {
    let title = Style::default()
        .fg(theme.title)
        .add_modifier(Modifier::BOLD);
    let fg = Style::default().fg(theme.main_fg);
    let help = Style::default().fg(theme.div_line);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("R I G I D T R I S", title)),
        Line::from(""),
        Line::from(Span::styled("Blocks are rigid bodies.", fg)),
        Line::from(Span::styled("Fill a row to cut it out.", fg)),
        Line::from(""),
        Line::from(Span::styled("ENTER  play", title)),
        Line::from(Span::styled("Q      quit", help)),
        Line::from(""),
    ];
    let p = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(bordered(theme));
    p.render(popup(area, 34, 11), frame.buffer_mut());
}

/// Board on the left, sidebar on the right, centred. Returns the board's inner rect.
fn draw_game(frame: &mut Frame, view: &View, area: Rect) -> Rect {
    let theme = view.theme;
    let vp = Viewport::board(board_scale(area));
    let (bw, bh) = vp.cells();
    let total_w = bw + 2 + SIDEBAR_WIDTH;
    let outer = Rect {
        x: area.x + area.width.saturating_sub(total_w) / 2,
        y: area.y + area.height.saturating_sub(bh + 2) / 2,
        width: total_w.min(area.width),
        height: (bh + 2).min(area.height),
    };
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw + 2), Constraint::Min(0)])
        .split(outer);

    let block = bordered(theme).title(Span::styled(" Rigidtris ", Style::default().fg(theme.title)));
    let inner = block.inner(chunks[0]);
    block.render(chunks[0], frame.buffer_mut());
    let raster = rasterize(view.sketch, theme, vp);
    paint(frame, &raster, inner, theme.bg);

    if let Some(board) = view.board {
        draw_sidebar(frame, theme, &board, chunks[1]);
        if board.game_over {
            draw_banner(frame, theme, inner, "GAME OVER");
        }
    }
    if view.paused {
        draw_banner(frame, theme, inner, "PAUSE");
    }
    inner
}

fn draw_banner(frame: &mut Frame, theme: &Theme, board: Rect, text: &str) {
    let style = Style::default()
        .fg(theme.title)
        .bg(theme.bg)
        .add_modifier(Modifier::BOLD);
    let width = u16::try_from(text.len()).unwrap_or(u16::MAX) + 4;
    let p = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(text, style))])
        .alignment(Alignment::Center)
        .block(bordered(theme));
    p.render(popup(board, width, 4), frame.buffer_mut());
}

fn draw_sidebar(frame: &mut Frame, theme: &Theme, board: &Scoreboard, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let help_style = Style::default().fg(theme.div_line);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Next (border + title + 3 rows of preview)
            Constraint::Length(1),
            Constraint::Length(6), // Lines, lost, top, well
            Constraint::Length(1),
            Constraint::Length(5), // Controls or replay prompt
        ])
        .split(area);

    let next_block = bordered(theme);
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    let next_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(next_inner);
    Paragraph::new(Line::from(Span::styled("NEXT", title_style)))
        .render(next_layout[0], frame.buffer_mut());
    draw_next_preview(frame, theme, board.next, next_layout[1]);

    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label:<6}"), title_style),
            Span::styled(value, fg_style),
        ])
    };
    let stats_block = bordered(theme);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let stats = vec![
        stat("LINES", board.lines.to_string()),
        stat("LOST", board.lost.to_string()),
        stat("TOP", board.top.to_string()),
        stat("WELL", board.height.max(0).to_string()),
    ];
    Paragraph::new(stats).render(stats_inner, frame.buffer_mut());

    let help_block = bordered(theme);
    let help_inner = help_block.inner(chunks[4]);
    help_block.render(chunks[4], frame.buffer_mut());
    let help = if board.game_over {
        vec![
            Line::from(Span::styled("HIT ENTER", title_style)),
            Line::from(Span::styled("TO REPLAY", title_style)),
            Line::from(Span::styled("Q quit", help_style)),
        ]
    } else {
        vec![
            Line::from(Span::styled("ZX ←↓→", fg_style)),
            Line::from(Span::styled("OR ASD , .", fg_style)),
            Line::from(Span::styled("P pause  Q quit", help_style)),
        ]
    };
    Paragraph::new(help).render(help_inner, frame.buffer_mut());
}

fn draw_next_preview(frame: &mut Frame, theme: &Theme, kind: PieceKind, area: Rect) {
    let vp = Viewport {
        width: 5.0,
        height: 3.0,
        scale: 2.0,
    };
    let mut sketch = Sketch::new();
    let pose = Pose::new(Vec2::new(2.5, 1.5), 0.0);
    for center in kind.centers() {
        sketch.cell(&pose, center, Shade::Piece(kind));
    }
    let (w, h) = vp.cells();
    let target = Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y,
        width: w.min(area.width),
        height: h.min(area.height),
    };
    paint(frame, &rasterize(&sketch, theme, vp), target, theme.bg);
}
