//! Terminal UI rendering with ratatui
//!
//! The renderer only reads session snapshots. It owns the two anomaly
//! presentation duties: flipping the board vertically while REVERSE is
//! active, and masking the control hints with "???" while COMMAND
//! CONFUSION is active.

use crate::board::{COLS, ROWS};
use crate::game::{GameState, Notice, Snapshot};
use crate::piece::Piece;
use crate::settings::Settings;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

const EMPTY: &str = "  ";

/// Board interior is COLS * 2 chars wide, plus borders
const BOARD_WIDTH_CHARS: u16 = COLS as u16 * 2 + 2;
const BOARD_HEIGHT_CHARS: u16 = ROWS as u16 + 2;
/// Side panel width
const PANEL_WIDTH: u16 = 26;

/// Rows currently flashing during a line clear, and whether the beat
/// paints them lit (white) or dark (empty)
#[derive(Debug, Clone, Copy)]
pub struct ClearFlash<'a> {
    pub rows: &'a [usize],
    pub lit: bool,
}

/// Render one frame from a session snapshot
pub fn render(
    frame: &mut Frame,
    snap: &Snapshot,
    settings: &Settings,
    notices: &[Notice],
    flash: Option<ClearFlash>,
) {
    match snap.state {
        GameState::Start => render_title(frame),
        _ => {
            render_game(frame, snap, settings, notices, flash);
            match snap.state {
                GameState::Paused => render_pause_overlay(frame),
                GameState::GameOver => render_game_over_overlay(frame, snap.score),
                _ => {}
            }
        }
    }
}

/// Render the title screen
fn render_title(frame: &mut Frame) {
    let area = center_rect(frame.area(), 52, 14);

    let lines = vec![
        Line::raw(""),
        Line::styled(
            "A N O M A T R I S",
            Style::default().fg(Color::Cyan).bold(),
        ),
        Line::raw(""),
        Line::styled(
            "Tetris, but the game fights back",
            Style::default().fg(Color::Gray),
        ),
        Line::raw(""),
        Line::raw(""),
        Line::styled("Enter: Play", Style::default().fg(Color::White)),
        Line::styled("q: Quit", Style::default().fg(Color::DarkGray)),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}

/// Render the playing field and side panel
fn render_game(
    frame: &mut Frame,
    snap: &Snapshot,
    settings: &Settings,
    notices: &[Notice],
    flash: Option<ClearFlash>,
) {
    let total_width = BOARD_WIDTH_CHARS + PANEL_WIDTH;
    let area = center_rect(frame.area(), total_width, BOARD_HEIGHT_CHARS);

    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(BOARD_WIDTH_CHARS),
            Constraint::Length(PANEL_WIDTH),
        ])
        .split(area);

    render_board(frame, layout[0], snap, settings, flash);
    render_side_panel(frame, layout[1], snap, settings);
    render_notices(frame, layout[0], notices);
}

/// Render the board, flipped vertically while REVERSE is active
fn render_board(
    frame: &mut Frame,
    area: Rect,
    snap: &Snapshot,
    settings: &Settings,
    flash: Option<ClearFlash>,
) {
    let (block_char, _) = settings.visual.block_chars();

    let block = Block::default()
        .title(" ANOMATRIS ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::with_capacity(ROWS);
    for visual_row in 0..ROWS {
        let row = if snap.reverse {
            ROWS - 1 - visual_row
        } else {
            visual_row
        };

        let flashing = flash.is_some_and(|f| f.rows.contains(&row));
        let mut spans = Vec::with_capacity(COLS);
        for col in 0..COLS {
            let span = if flashing {
                if flash.is_some_and(|f| f.lit) {
                    Span::styled(block_char, Style::default().fg(Color::White))
                } else {
                    Span::raw(EMPTY)
                }
            } else if let Some(color) = piece_cell_color(&snap.current, row, col) {
                Span::styled(block_char, Style::default().fg(color))
            } else {
                match snap.board[row][col] {
                    crate::board::Cell::Filled(color) => {
                        Span::styled(block_char, Style::default().fg(color))
                    }
                    crate::board::Cell::Empty => Span::raw(EMPTY),
                }
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn piece_cell_color(piece: &Piece, row: usize, col: usize) -> Option<Color> {
    piece
        .cells()
        .any(|(r, c)| r == row as i32 && c == col as i32)
        .then(|| piece.color())
}

/// Render the side panel: controls, next piece, budget, score, anomalies
fn render_side_panel(frame: &mut Frame, area: Rect, snap: &Snapshot, settings: &Settings) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();

    lines.push(Line::styled("CONTROLS", Style::default().fg(Color::Gray)));
    // Under command confusion the hints go dark - the player is on their own
    let hint = |label: &str| -> String {
        if snap.command_confusion {
            "???".to_string()
        } else {
            label.to_string()
        }
    };
    lines.push(Line::raw(format!(
        "{} {} {}: Move",
        hint("←"),
        hint("→"),
        hint("↓")
    )));
    lines.push(Line::raw(format!("{}: Rotate", hint("↑"))));
    lines.push(Line::raw(format!("{}: Hard Drop", hint("Space"))));
    lines.push(Line::raw("c: Change Piece"));
    lines.push(Line::raw("e: Anomaly Pulse"));
    lines.push(Line::raw("p: Pause"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("NEXT", Style::default().fg(Color::Gray)));
    lines.extend(preview_lines(&snap.next, settings));
    lines.push(Line::raw(""));

    lines.push(Line::from(vec![
        Span::styled("CHANGE ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{}/3", snap.changes_left),
            Style::default().fg(Color::White),
        ),
    ]));
    lines.push(Line::raw(""));

    lines.push(Line::styled("SCORE", Style::default().fg(Color::Gray)));
    lines.push(Line::styled(
        format!("{}", snap.score),
        Style::default().fg(Color::Yellow).bold(),
    ));
    lines.push(Line::raw(""));

    let mut anomalies = Vec::new();
    if snap.reverse {
        anomalies.push(Span::styled("REVERSE ", Style::default().fg(Color::Magenta)));
    }
    if snap.command_confusion {
        anomalies.push(Span::styled("CONFUSED ", Style::default().fg(Color::Green)));
    }
    if snap.speed_up {
        anomalies.push(Span::styled(
            "SPEED ",
            Style::default().fg(Color::Rgb(255, 165, 0)),
        ));
    }
    if !anomalies.is_empty() {
        lines.push(Line::styled("ANOMALIES", Style::default().fg(Color::Gray)));
        lines.push(Line::from(anomalies));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Small preview of a piece's shape matrix
fn preview_lines(piece: &Piece, settings: &Settings) -> Vec<Line<'static>> {
    let (block_char, _) = settings.visual.block_chars();
    let color = piece.color();
    let mut lines = Vec::new();
    for i in 0..2 {
        let mut spans = Vec::new();
        for j in 0..4 {
            if piece.shape.cells().any(|(r, c)| r == i && c == j) {
                spans.push(Span::styled(block_char, Style::default().fg(color)));
            } else {
                spans.push(Span::raw(EMPTY));
            }
        }
        lines.push(Line::from(spans));
    }
    lines
}

/// Flash recent notices over the middle of the board
fn render_notices(frame: &mut Frame, board_area: Rect, notices: &[Notice]) {
    if notices.is_empty() {
        return;
    }
    let height = notices.len().min(3) as u16;
    let area = center_rect(board_area, BOARD_WIDTH_CHARS - 2, height);

    let lines: Vec<Line> = notices
        .iter()
        .rev()
        .take(3)
        .map(|n| Line::styled(n.text.clone(), Style::default().fg(n.color).bold()))
        .collect();

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn render_pause_overlay(frame: &mut Frame) {
    let area = center_rect(frame.area(), 30, 7);
    let lines = vec![
        Line::styled("PAUSED", Style::default().fg(Color::Yellow).bold()),
        Line::raw(""),
        Line::raw("p: Resume"),
        Line::raw("t: Back to Title"),
        Line::raw("q: Quit"),
    ];
    render_overlay(frame, area, lines);
}

fn render_game_over_overlay(frame: &mut Frame, score: u64) {
    let area = center_rect(frame.area(), 34, 8);
    let lines = vec![
        Line::styled("GAME OVER", Style::default().fg(Color::Red).bold()),
        Line::raw(""),
        Line::styled(
            format!("Final Score: {}", score),
            Style::default().fg(Color::Yellow),
        ),
        Line::raw(""),
        Line::raw("Enter: Retry"),
        Line::raw("t: Back to Title"),
    ];
    render_overlay(frame, area, lines);
}

fn render_overlay(frame: &mut Frame, area: Rect, lines: Vec<Line>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block),
        area,
    );
}

/// Center a w x h rect inside the given area
fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(w)) / 2,
        y: area.y + (area.height.saturating_sub(h)) / 2,
        width: w,
        height: h,
    }
}
