//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::shapes::PieceKind;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Piece hues are spread evenly around the colour wheel, starting just past red.
const PIECE_DEFAULTS: [Color; 7] = [
    Color::Rgb(0xFF, 0x49, 0x00), // I
    Color::Rgb(0xDB, 0xFF, 0x00), // J
    Color::Rgb(0x00, 0xFF, 0x00), // L
    Color::Rgb(0x00, 0xFF, 0xDB), // O
    Color::Rgb(0x00, 0x49, 0xFF), // S
    Color::Rgb(0x92, 0x00, 0xFF), // T
    Color::Rgb(0xFF, 0x00, 0x92), // Z
];

const PIECE_KEYS: [&str; 7] = [
    "piece_i", "piece_j", "piece_l", "piece_o", "piece_s", "piece_t", "piece_z",
];

/// Piece colours and UI colours, optionally loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// One colour per piece kind, in bag order.
    pub pieces: [Color; 7],
    /// Playfield background.
    pub bg: Color,
    /// Well lines, borders and key help.
    pub div_line: Color,
    /// HUD text and the ground.
    pub main_fg: Color,
    /// Highlights and titles.
    pub title: Color,
    /// The row band swept while the well changes height.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            pieces: PIECE_DEFAULTS,
            bg: Color::Rgb(0x00, 0x00, 0x00),
            div_line: Color::Rgb(0x80, 0x80, 0x80),
            main_fg: Color::Rgb(0xC0, 0xC0, 0xC0),
            title: Color::Rgb(0xFF, 0xFF, 0xFF),
            inactive_fg: Color::Rgb(0x40, 0x40, 0x40),
        }
    }
}

impl Theme {
    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to the defaults if path is None or the file is missing.
    /// `palette` then overrides the piece colours.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.pieces = [
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0x00, 0xFF, 0xFF),
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0xFF, 0x00, 0xFF),
                    Color::Rgb(0xFF, 0x88, 0x00),
                ];
                self.div_line = Color::Rgb(0xFF, 0xFF, 0xFF);
            }
            crate::Palette::Colorblind => {
                // Okabe-Ito
                self.pieces = [
                    Color::Rgb(0xE6, 0x9F, 0x00),
                    Color::Rgb(0x56, 0xB4, 0xE9),
                    Color::Rgb(0x00, 0x9E, 0x73),
                    Color::Rgb(0xF0, 0xE4, 0x42),
                    Color::Rgb(0x00, 0x72, 0xB2),
                    Color::Rgb(0xD5, 0x5E, 0x00),
                    Color::Rgb(0xCC, 0x79, 0xA7),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let defaults = Self::default();
        let mut pieces = defaults.pieces;
        for (slot, key) in pieces.iter_mut().zip(PIECE_KEYS) {
            if let Some(color) = get(key) {
                *slot = color;
            }
        }
        Self {
            pieces,
            bg: get("main_bg")
                .or_else(|| get("meter_bg"))
                .unwrap_or(defaults.bg),
            div_line: get("div_line").unwrap_or(defaults.div_line),
            main_fg: get("main_fg").unwrap_or(defaults.main_fg),
            title: get("title").unwrap_or(defaults.title),
            inactive_fg: get("inactive_fg").unwrap_or(defaults.inactive_fg),
        }
    }

    #[inline]
    pub fn piece_color(&self, kind: PieceKind) -> Color {
        self.pieces[kind.index()]
    }

    /// Grey for a fading deletion flash; `level` 1.0 is white.
    pub fn flash_color(level: f32) -> Color {
        let g = (255.0 * level.clamp(0.0, 1.0)).round() as u8;
        Color::Rgb(g, g, g)
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    let (r, g, b) = match s.len() {
        6 if s.is_ascii() => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 if s.is_ascii() => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}
