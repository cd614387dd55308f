//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.
//!
//! The LED colours for sand and pieces come from here too: a cell's paint value
//! decodes to a colour class and a shade, which is scaled from the class colour.

use crate::paint::{self, ColorClass, SHADE_BASE, SHADE_HIGHLIGHT, SHADE_SHADOW, SHADE_SPECK};
use clap::ValueEnum;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Colour variant applied on top of the loaded theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Sand colours indexed by `ColorClass`: red, green, blue, yellow, wildcard.
    pub sand: [Color; 5],
    /// Unlit LED / playfield background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (drops, level).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text and the status-bar separator.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const ONEDARK_SAND: [Color; 5] = [
    rgb(0xE0_6C_75), // cpu_end / red
    rgb(0x98_C3_79), // mem_box / green
    rgb(0x61_AF_EF), // cpu_box / blue
    rgb(0xE5_C0_7B), // title / yellow
    rgb(0xC6_78_DD), // net_box / magenta
];
const ONEDARK_BG: Color = rgb(0x28_2C_34);
const ONEDARK_DIV: Color = rgb(0x3F_44_4F);
const ONEDARK_FG: Color = rgb(0xAB_B2_BF);
const ONEDARK_TITLE: Color = rgb(0xE5_C0_7B);
const ONEDARK_INACTIVE: Color = rgb(0x5C_63_70);

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// Hardcoded One Dark defaults, exact hex values from onedark.theme.
    pub fn onedark_default() -> Self {
        Self {
            sand: ONEDARK_SAND,
            bg: ONEDARK_BG,
            div_line: ONEDARK_DIV,
            main_fg: ONEDARK_FG,
            title: ONEDARK_TITLE,
            inactive_fg: ONEDARK_INACTIVE,
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            Some(p) => {
                log::warn!("theme file {} not found, using defaults", p.display());
                return Ok(Self::default_with(palette));
            }
            None => return Ok(Self::default_with(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        log::debug!("theme {}: {} keys", path.display(), map.len());
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn default_with(palette: Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override sand colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.sand = [
                    rgb(0xFF_00_00),
                    rgb(0x00_FF_00),
                    rgb(0x00_88_FF),
                    rgb(0xFF_FF_00),
                    rgb(0xFF_FF_FF),
                ];
            }
            Palette::Colorblind => {
                // Okabe-Ito style: red and green pushed apart in hue and lightness
                self.sand = [
                    rgb(0xCC_33_11), // vermillion
                    rgb(0x00_99_88), // teal
                    rgb(0x00_77_BB), // blue
                    rgb(0xEE_77_33), // orange
                    rgb(0xEE_33_77), // magenta
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        let [red, green, blue, yellow, wild] = ONEDARK_SAND;
        Self {
            sand: [
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(red),
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(green),
                get("cpu_box").unwrap_or(blue),
                get("title").or_else(|| get("cpu_mid")).unwrap_or(yellow),
                get("net_box").or_else(|| get("hi_fg")).unwrap_or(wild),
            ],
            bg: get("main_bg").unwrap_or(ONEDARK_BG),
            div_line: get("div_line").unwrap_or(ONEDARK_DIV),
            main_fg: get("main_fg").unwrap_or(ONEDARK_FG),
            title: get("title").unwrap_or(ONEDARK_TITLE),
            inactive_fg: get("inactive_fg").unwrap_or(ONEDARK_INACTIVE),
        }
    }

    #[inline]
    pub fn class_color(&self, class: ColorClass) -> Color {
        self.sand[class.index()]
    }

    /// LED colour for a grid cell value. Empty cells are unlit.
    pub fn paint_color(&self, value: u8) -> Color {
        match paint::decode(value) {
            Some((class, shade)) => shade_color(self.class_color(class), shade),
            None => self.bg,
        }
    }
}

/// Scale a class colour for one of the sprite shades.
fn shade_color(color: Color, shade: u8) -> Color {
    let Color::Rgb(r, g, b) = color else {
        return color;
    };
    let scale = |c: u8, f: f32| (f32::from(c) * f).round().clamp(0.0, 255.0) as u8;
    let lift = |c: u8, f: f32| c.saturating_add(((255.0 - f32::from(c)) * f) as u8);
    match shade {
        SHADE_BASE => color,
        SHADE_HIGHLIGHT => Color::Rgb(lift(r, 0.35), lift(g, 0.35), lift(b, 0.35)),
        SHADE_SHADOW => Color::Rgb(scale(r, 0.55), scale(g, 0.55), scale(b, 0.55)),
        SHADE_SPECK => Color::Rgb(scale(r, 0.8), scale(g, 0.8), scale(b, 0.8)),
        _ => color,
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
        if let Some(eq) = rest.find('=') {
            let value = rest[eq + 1..]
                .trim()
                .trim_matches('"')
                .trim_matches('\'')
                .to_string();
            if !value.is_empty() {
                map.insert(key.to_string(), value);
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    if !s.is_ascii() {
        return Err(invalid());
    }
    let (r, g, b) = match s.len() {
        6 => (
            u8::from_str_radix(&s[0..2], 16).map_err(|_| invalid())?,
            u8::from_str_radix(&s[2..4], 16).map_err(|_| invalid())?,
            u8::from_str_radix(&s[4..6], 16).map_err(|_| invalid())?,
        ),
        3 => (
            u8::from_str_radix(&s[0..1], 16).map_err(|_| invalid())? * 17,
            u8::from_str_radix(&s[1..2], 16).map_err(|_| invalid())? * 17,
            u8::from_str_radix(&s[2..3], 16).map_err(|_| invalid())? * 17,
        ),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}
