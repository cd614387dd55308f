//! Matrix emulator: composes the LED display (status bar + playfield) and draws it
//! with half-blocks, next to a sidebar with stats and controls.

use crate::app::Screen;
use crate::game::Game;
use crate::paint::{ColorClass, PaintSource};
use crate::shapes;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

const SIDEBAR_WIDTH: u16 = 26;
/// Next-piece preview: one LED per mino, this far from the left edge.
const PREVIEW_X: usize = 1;
/// Level progress bar in the status bar starts here.
const PROGRESS_X: usize = 8;
/// Game-over fade of the lit LEDs, in ms.
const GAME_OVER_FADE_MS: u32 = 900;

/// Running tachyonfx effects and their clock.
#[derive(Default)]
pub struct Effects {
    game_over: Option<Effect>,
    last_process: Option<Instant>,
}

impl Effects {
    pub fn reset(&mut self) {
        self.game_over = None;
        self.last_process = None;
    }
}

/// LED colours for the whole display, row-major, `display_width * display_height`.
///
/// Rows above the status-bar height show the next piece and level progress;
/// the rest is sand with the active piece painted on top.
pub fn compose_display(game: &Game, theme: &Theme) -> Vec<Color> {
    let config = game.config();
    let (w, h) = (config.display_width, config.display_height);
    let status = config.status_bar_height.min(h);
    let mut leds = vec![theme.bg; w * h];

    draw_status_bar(&mut leds, game, theme, w, status);

    let sand = game.sand();
    for (i, &cell) in sand.cells().iter().enumerate() {
        let (x, y) = (i % sand.width(), i / sand.width());
        let dy = y + status;
        if x < w && dy < h {
            leds[dy * w + x] = theme.paint_color(cell);
        }
    }

    let piece = game.piece();
    let sheet = game.sprite_sheet();
    let m = piece.mino_size() as i32;
    for (col, row, tile) in piece.occupied_cells().occupied() {
        let left = piece.x() + col as i32 * m;
        let top = piece.y() + row as i32 * m;
        for dy in 0..m {
            for dx in 0..m {
                let (x, y) = (left + dx, top + dy);
                if x < 0 || x >= w as i32 || y < status as i32 || y >= h as i32 {
                    continue;
                }
                let paint = sheet.paint(tile, piece.color(), dx as usize, dy as usize);
                leds[y as usize * w + x as usize] = theme.paint_color(paint);
            }
        }
    }
    leds
}

fn draw_status_bar(leds: &mut [Color], game: &Game, theme: &Theme, w: usize, status: usize) {
    if status == 0 {
        return;
    }
    // Bottom status row is the separator above the playfield.
    let sep = status - 1;
    for x in 0..w {
        leds[sep * w + x] = theme.div_line;
    }

    let color = theme.class_color(game.next_color());
    let next = shapes::shape(game.next_shape(), shapes::Orientation::Up);
    for (col, row, _) in next.occupied() {
        let (x, y) = (PREVIEW_X + col, row);
        if x < w && y < sep {
            leds[y * w + x] = color;
        }
    }

    if sep < 2 || w <= PROGRESS_X + 1 {
        return;
    }
    let per = game.config().locks_per_level;
    let done = per - game.locks_to_next_level();
    let len = w - 1 - PROGRESS_X;
    let filled = len * done as usize / per as usize;
    for y in 1..sep.min(3) {
        for i in 0..len {
            leds[y * w + PROGRESS_X + i] = if i < filled {
                theme.title
            } else {
                theme.inactive_fg
            };
        }
    }
}

/// Matrix size in terminal cells including the border.
fn matrix_cells(game: &Game) -> (u16, u16) {
    let config = game.config();
    let w = config.display_width as u16;
    let h = config.display_height.div_ceil(2) as u16;
    (w + 2, h + 2)
}

/// Draw current screen, pause overlay and game-over panel.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    game: &Game,
    theme: &Theme,
    paused: bool,
    effects: &mut Effects,
    no_effects: bool,
    now: Instant,
) {
    let area = frame.area();
    let (mw, mh) = matrix_cells(game);
    let total_w = mw + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(mh.max(24)),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(mw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let matrix_area = Rect {
        height: mh.min(inner[0].height),
        ..inner[0]
    };

    let leds = compose_display(game, theme);
    let board = draw_matrix(frame, game, theme, &leds, matrix_area);
    draw_sidebar(frame, game, theme, inner[1]);

    match screen {
        Screen::Playing => {
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
        }
        Screen::GameOver => {
            if !no_effects {
                apply_game_over_effect(frame, theme, &leds, game, board, effects, now);
            }
            draw_game_over(frame, game, theme, area);
        }
    }
}

/// Two LEDs per terminal cell: `▀` with fg = upper row, bg = lower row.
/// Returns the inner board rect.
fn draw_matrix(frame: &mut Frame, game: &Game, theme: &Theme, leds: &[Color], area: Rect) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Sandtris ", theme.title));
    let board = block.inner(area);
    block.render(area, frame.buffer_mut());

    let w = game.config().display_width;
    let h = game.config().display_height;
    let buf = frame.buffer_mut();
    for y in (0..h).step_by(2) {
        for x in 0..w {
            let top = leds[y * w + x];
            let bottom = if y + 1 < h { leds[(y + 1) * w + x] } else { theme.bg };
            let rx = board.x + x as u16;
            let ry = board.y + (y / 2) as u16;
            if rx < board.x + board.width && ry < board.y + board.height {
                buf[(rx, ry)]
                    .set_symbol("▀")
                    .set_style(Style::default().fg(top).bg(bottom));
            }
        }
    }
    board
}

/// Terminal cells whose upper or lower LED is lit.
fn lit_positions(leds: &[Color], w: usize, h: usize, board: Rect, unlit: Color) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for (i, &c) in leds.iter().enumerate() {
        if c == unlit {
            continue;
        }
        let (x, y) = (i % w, i / w);
        if y < h {
            set.insert((board.x + x as u16, board.y + (y / 2) as u16));
        }
    }
    set
}

/// Fade every lit LED to black once the stack tops out.
fn apply_game_over_effect(
    frame: &mut Frame,
    theme: &Theme,
    leds: &[Color],
    game: &Game,
    board: Rect,
    effects: &mut Effects,
    now: Instant,
) {
    let delta = effects
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    effects.last_process = Some(now);

    if effects.game_over.is_none() {
        let config = game.config();
        let lit = lit_positions(
            leds,
            config.display_width,
            config.display_height,
            board,
            theme.bg,
        );
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            lit.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (GAME_OVER_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        effects.game_over = Some(effect);
    }

    if let Some(effect) = effects.game_over.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_sidebar(frame: &mut Frame, game: &Game, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Next
            Constraint::Length(1),
            Constraint::Length(7), // Stats
            Constraint::Length(1),
            Constraint::Length(4), // Level progress
            Constraint::Length(1),
            Constraint::Length(7), // Controls
        ])
        .split(area);

    // --- Next ---
    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Next ", title_style));
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    let swatch = theme.class_color(game.next_color());
    Paragraph::new(vec![
        Line::from(vec![
            Span::styled("██ ", Style::default().fg(swatch)),
            Span::styled(game.next_shape().name(), fg_style),
        ]),
        Line::from(Span::styled(game.next_color().name(), dim_style)),
    ])
    .render(next_inner, frame.buffer_mut());

    // --- Stats ---
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let piece = game.piece();
    let stats = vec![
        Line::from(vec![
            Span::styled("Drops: ", title_style),
            Span::styled(game.drop_count().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Level: ", title_style),
            Span::styled(game.level().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(game.score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Speed: ", title_style),
            Span::styled(format!("{:.0} px/s", 1.0 / piece.fall_rate()), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Seed:  ", title_style),
            Span::styled(format!("{:016x}", game.seed()), dim_style),
        ]),
    ];
    Paragraph::new(Text::from(stats)).render(stats_inner, frame.buffer_mut());

    // --- Level progress ---
    let level_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let level_inner = level_block.inner(chunks[4]);
    level_block.render(chunks[4], frame.buffer_mut());
    let level_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(level_inner);
    let per = game.config().locks_per_level;
    let remaining = game.locks_to_next_level();
    Paragraph::new(Line::from(Span::styled(
        format!("Next level in {remaining}"),
        title_style,
    )))
    .render(level_layout[0], frame.buffer_mut());
    let ratio = f64::from(per - remaining) / f64::from(per);
    Gauge::default()
        .ratio(ratio.clamp(0.0, 1.0))
        .label("")
        .gauge_style(Style::default().fg(theme.title).bg(theme.div_line))
        .render(level_layout[1], frame.buffer_mut());

    // --- Controls ---
    let controls_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Controls ", title_style));
    let controls_inner = controls_block.inner(chunks[6]);
    controls_block.render(chunks[6], frame.buffer_mut());
    let key_style = Style::default().fg(theme.class_color(ColorClass::Yellow));
    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("{k:<9}"), key_style),
            Span::styled(what, fg_style),
        ])
    };
    Paragraph::new(vec![
        key("←/→ h/l", "Tilt"),
        key("↑ k Spc", "Rotate"),
        key("P", "Pause"),
        key("R", "Restart"),
        key("Q Esc", "Quit"),
    ])
    .render(controls_inner, frame.buffer_mut());
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: Resume    Q: Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, game: &Game, theme: &Theme, area: Rect) {
    let popup = centered(area, 30, 9);
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default()
                .fg(Color::White)
                .bg(theme.class_color(ColorClass::Red))
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Drops: {} ", game.drop_count()), fg)),
        Line::from(Span::styled(format!(" Level: {} ", game.level()), fg)),
        Line::from(""),
        Line::from(Span::styled(" R: Restart    Q: Quit ", fg)),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Sandtris ", theme.title)),
        )
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::input::InputRecord;

    fn game() -> Game {
        Game::new(Config {
            seed: Some(7),
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn test_display_covers_whole_matrix() {
        let g = game();
        let leds = compose_display(&g, &Theme::default());
        assert_eq!(leds.len(), 32 * 64);
    }

    #[test]
    fn test_status_bar_shows_next_piece() {
        let g = game();
        let theme = Theme::default();
        let leds = compose_display(&g, &theme);
        let color = theme.class_color(g.next_color());
        let preview = (0..4)
            .flat_map(|y| (0..PROGRESS_X).map(move |x| (x, y)))
            .filter(|&(x, y)| leds[y * 32 + x] == color)
            .count();
        assert_eq!(preview, 4);
        assert!((0..32).all(|x| leds[4 * 32 + x] == theme.div_line));
    }

    #[test]
    fn test_piece_is_lit_in_playfield() {
        let g = game();
        let theme = Theme::default();
        let leds = compose_display(&g, &theme);
        let m = g.config().mino_size;
        let lit = leds[5 * 32..].iter().filter(|&&c| c != theme.bg).count();
        assert_eq!(lit, 4 * m * m);
    }

    #[test]
    fn test_sand_is_drawn_below_status_bar() {
        let mut g = Game::new(Config {
            seed: Some(3),
            initial_fall_rate: 0.01,
            ..Config::default()
        })
        .unwrap();
        while g.drop_count() == 0 {
            g.tick(InputRecord::NEUTRAL);
        }
        let theme = Theme::default();
        let leds = compose_display(&g, &theme);
        let sand = g.sand();
        let w = sand.width();
        for (i, &cell) in sand.cells().iter().enumerate() {
            if cell != 0 {
                let (x, y) = (i % w, i / w);
                assert_eq!(leds[(y + 5) * 32 + x], theme.paint_color(cell));
            }
        }
    }

    #[test]
    fn test_progress_bar_fills_with_drops() {
        let theme = Theme::default();
        let g = game();
        let leds = compose_display(&g, &theme);
        assert_eq!(leds[32 + PROGRESS_X], theme.inactive_fg);
        assert_eq!(leds[2 * 32 + 30], theme.inactive_fg);
    }

    #[test]
    fn test_lit_positions_pairs_rows() {
        let theme = Theme::default();
        let mut leds = vec![theme.bg; 4 * 4];
        leds[0] = Color::Red;
        leds[4] = Color::Red;
        leds[2 * 4 + 3] = Color::Blue;
        let board = Rect::new(10, 20, 4, 2);
        let set = lit_positions(&leds, 4, 4, board, theme.bg);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&(10, 20)));
        assert!(set.contains(&(13, 21)));
    }
}
