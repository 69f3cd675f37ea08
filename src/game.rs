//! Core game session: state machine, tick loop and command handling

use crate::anomaly::{AnomalyController, CommandMap};
use crate::board::{Board, COLS, ROWS, Cell, ClearOutcome};
use crate::piece::Piece;
use crate::rng::{self, ChaChaSource, RandomSource};
use crate::tetromino::TetrominoKind;
use ratatui::style::Color;

/// Milliseconds between gravity steps at normal speed
pub const BASE_FALL_INTERVAL_MS: u64 = 500;
/// Points for landing a piece
pub const LANDING_BONUS: u64 = 10;
/// Piece changes allowed per session
pub const MAX_CHANGES: u32 = 3;

/// The logical game commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Left,
    Right,
    SoftDrop,
    Rotate,
    HardDrop,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Left,
        Command::Right,
        Command::SoftDrop,
        Command::Rotate,
        Command::HardDrop,
    ];

    pub fn index(&self) -> usize {
        match self {
            Command::Left => 0,
            Command::Right => 1,
            Command::SoftDrop => 2,
            Command::Rotate => 3,
            Command::HardDrop => 4,
        }
    }
}

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Start,
    Playing,
    Paused,
    GameOver,
}

/// A short-lived message for the renderer to flash over the board
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub color: Color,
}

impl Notice {
    pub fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// Immutable view of the session for rendering
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub board: [[Cell; COLS]; ROWS],
    pub current: Piece,
    pub next: Piece,
    pub score: u64,
    pub changes_left: u32,
    pub state: GameState,
    pub reverse: bool,
    pub command_confusion: bool,
    pub speed_up: bool,
    pub permutation: Option<CommandMap>,
}

/// The game session. Single writer of the grid, pieces, score, budget
/// and anomaly flags; driven by an external loop through `tick` and the
/// command/pulse entry points. No entry point panics or returns an
/// error - every invalid request is a silent no-op.
pub struct GameSession {
    board: Board,
    current: Piece,
    next: Piece,
    anomalies: AnomalyController,
    score: u64,
    changes_left: u32,
    state: GameState,
    /// Accumulated time since the last gravity step
    fall_time: u64,
    rng: Box<dyn RandomSource>,
    notices: Vec<Notice>,
    last_clear: Option<ClearOutcome>,
}

impl GameSession {
    pub fn new() -> Self {
        Self::with_source(Box::new(ChaChaSource::new()))
    }

    /// Build a session around an explicit random source
    pub fn with_source(mut rng: Box<dyn RandomSource>) -> Self {
        let current = Piece::spawn(rng::choose(rng.as_mut(), &TetrominoKind::all()));
        let next = Piece::spawn(rng::choose(rng.as_mut(), &TetrominoKind::all()));
        Self {
            board: Board::new(),
            current,
            next,
            anomalies: AnomalyController::default(),
            score: 0,
            changes_left: MAX_CHANGES,
            state: GameState::Start,
            fall_time: 0,
            rng,
            notices: Vec::new(),
            last_clear: None,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    /// Begin playing from the title screen, or retry after a game over.
    /// Both fully reset the session.
    pub fn start_or_retry(&mut self) {
        if !matches!(self.state, GameState::Start | GameState::GameOver) {
            return;
        }
        self.reset();
        self.state = GameState::Playing;
        tracing::info!("session started");
    }

    /// Return to the title screen from pause or game over
    pub fn back_to_title(&mut self) {
        if matches!(self.state, GameState::Paused | GameState::GameOver) {
            self.state = GameState::Start;
        }
    }

    pub fn pause(&mut self) {
        if self.state == GameState::Playing {
            self.state = GameState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == GameState::Paused {
            self.state = GameState::Playing;
        }
    }

    /// Advance simulation time. Gravity fires once the accumulated time
    /// exceeds the effective interval, which is halved while SpeedUp is
    /// active.
    pub fn tick(&mut self, dt_ms: u64) {
        if self.state != GameState::Playing {
            return;
        }
        self.fall_time += dt_ms;

        let interval = if self.anomalies.state.speed_up {
            BASE_FALL_INTERVAL_MS / 2
        } else {
            BASE_FALL_INTERVAL_MS
        };

        if self.fall_time > interval {
            if !self.current.try_move(&self.board, 0, 1) {
                self.land_current();
            }
            self.fall_time = 0;
        }
    }

    /// Apply one logical command. Commands pass through the confusion
    /// permutation first; illegal moves are silently rejected.
    pub fn on_command(&mut self, cmd: Command) {
        if self.state != GameState::Playing {
            return;
        }
        match self.anomalies.state.remap(cmd) {
            Command::Left => {
                self.current.try_move(&self.board, -1, 0);
            }
            Command::Right => {
                self.current.try_move(&self.board, 1, 0);
            }
            Command::SoftDrop => {
                self.current.try_move(&self.board, 0, 1);
            }
            Command::Rotate => {
                self.current.try_rotate(&self.board);
            }
            Command::HardDrop => {
                let dropped = self.current.hard_drop(&self.board);
                tracing::debug!("hard drop fell {} rows", dropped);
                self.land_current();
                self.fall_time = 0;
            }
        }
    }

    /// Spend one change to replace the current piece with the queued one.
    /// No-op once the budget is exhausted or outside Playing.
    pub fn request_piece_change(&mut self) {
        if self.state != GameState::Playing || self.changes_left == 0 {
            return;
        }
        let fresh = self.spawn_piece();
        self.current = std::mem::replace(&mut self.next, fresh);
        self.changes_left -= 1;
        self.notices.push(Notice::new("CHANGE", Color::Yellow));
        tracing::debug!("piece changed, {} changes left", self.changes_left);
    }

    /// Fire one anomaly selection event
    pub fn trigger_anomaly_pulse(&mut self) {
        if self.state != GameState::Playing {
            return;
        }
        let notice = self
            .anomalies
            .trigger(&mut self.board, self.rng.as_mut());
        tracing::info!("anomaly event: {}", notice.text);
        self.notices.push(notice);
    }

    /// Take the notices queued since the last call
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// The row indices of the most recent line clear, if one happened
    /// since the last call. The driver flashes these before polling any
    /// further input.
    pub fn take_clear_report(&mut self) -> Option<ClearOutcome> {
        self.last_clear.take()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: *self.board.rows(),
            current: self.current.clone(),
            next: self.next.clone(),
            score: self.score,
            changes_left: self.changes_left,
            state: self.state,
            reverse: self.anomalies.state.reverse,
            command_confusion: self.anomalies.state.command_confusion(),
            speed_up: self.anomalies.state.speed_up,
            permutation: self.anomalies.state.permutation.clone(),
        }
    }

    fn spawn_piece(&mut self) -> Piece {
        Piece::spawn(rng::choose(self.rng.as_mut(), &TetrominoKind::all()))
    }

    fn reset(&mut self) {
        self.board = Board::new();
        self.current = self.spawn_piece();
        self.next = self.spawn_piece();
        self.anomalies = AnomalyController::default();
        self.score = 0;
        self.changes_left = MAX_CHANGES;
        self.fall_time = 0;
        self.notices.clear();
        self.last_clear = None;
    }

    /// Merge the current piece, score the landing and any clear, then
    /// promote the queued piece. Game over when the promoted piece
    /// already collides at its spawn position.
    fn land_current(&mut self) {
        self.board.merge(
            &self.current.shape,
            self.current.x,
            self.current.y,
            self.current.color(),
        );
        self.score += LANDING_BONUS;

        let outcome = self.board.clear_full_rows();
        if !outcome.rows.is_empty() {
            self.score += outcome.points;
            self.notices
                .push(Notice::new(format!("+{}", outcome.points), Color::Yellow));
            tracing::debug!("cleared {} rows for {}", outcome.rows.len(), outcome.points);
            self.last_clear = Some(outcome);
        }

        let fresh = self.spawn_piece();
        self.current = std::mem::replace(&mut self.next, fresh);

        if self
            .board
            .collides(&self.current.shape, self.current.x, self.current.y)
        {
            self.state = GameState::GameOver;
            tracing::info!("game over, final score {}", self.score);
        }
    }

    #[cfg(test)]
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedSource;

    // The scripted source answers 0 once exhausted, so every spawn after
    // the script runs out is an I piece at x = 3.
    fn playing_session(script: &[usize]) -> GameSession {
        let mut session = GameSession::with_source(Box::new(ScriptedSource::new(script)));
        session.start_or_retry();
        session
    }

    fn fill_bottom_row_except(session: &mut GameSession, hole: usize) {
        for col in 0..COLS {
            if col != hole {
                session
                    .board_mut()
                    .set(ROWS - 1, col, Cell::Filled(Color::Gray));
            }
        }
    }

    #[test]
    fn test_initial_state_is_start() {
        let session = playing_session(&[]);
        assert_eq!(session.snapshot().changes_left, MAX_CHANGES);
        let fresh = GameSession::with_source(Box::new(ScriptedSource::new(&[])));
        assert_eq!(fresh.state(), GameState::Start);
    }

    #[test]
    fn test_pause_resume_round_trip() {
        let mut session = playing_session(&[]);
        session.pause();
        assert_eq!(session.state(), GameState::Paused);
        // Commands are ignored while paused
        let x = session.snapshot().current.x;
        session.on_command(Command::Left);
        assert_eq!(session.snapshot().current.x, x);
        session.resume();
        assert_eq!(session.state(), GameState::Playing);
    }

    #[test]
    fn test_back_to_title_from_pause() {
        let mut session = playing_session(&[]);
        session.pause();
        session.back_to_title();
        assert_eq!(session.state(), GameState::Start);
    }

    #[test]
    fn test_gravity_respects_base_interval() {
        let mut session = playing_session(&[]);
        let y = session.snapshot().current.y;
        session.tick(400);
        assert_eq!(session.snapshot().current.y, y);
        session.tick(101);
        assert_eq!(session.snapshot().current.y, y + 1);
    }

    #[test]
    fn test_speed_up_halves_fall_interval() {
        // Candidate index 4 with no flags active is SpeedUp; the four
        // leading zeroes feed the constructor and reset spawns.
        let mut session = playing_session(&[0, 0, 0, 0, 4]);
        session.trigger_anomaly_pulse();
        assert!(session.snapshot().speed_up);

        let y = session.snapshot().current.y;
        session.tick(300);
        assert_eq!(session.snapshot().current.y, y + 1);
    }

    #[test]
    fn test_single_line_clear_scores_and_shifts() {
        // Scenario: bottom row full except one column; a vertical I drops
        // into the hole, clears the row, and the rest of the bar shifts
        // down by one.
        let mut session = playing_session(&[]);
        fill_bottom_row_except(&mut session, 3);
        session.on_command(Command::Rotate); // I becomes vertical at x = 3
        session.on_command(Command::HardDrop);

        assert_eq!(session.score(), LANDING_BONUS + 100);
        let report = session.take_clear_report().expect("one row cleared");
        assert_eq!(report.rows, vec![ROWS - 1]);
        assert_eq!(report.points, 100);

        let snap = session.snapshot();
        assert!(snap.board[0].iter().all(|c| c.is_empty()));
        // The three surviving bar cells shifted down onto rows 17..=19
        for row in ROWS - 3..ROWS {
            assert!(snap.board[row][3].is_filled());
        }
        assert!(snap.board[ROWS - 4][3].is_empty());
        assert_eq!(session.state(), GameState::Playing);
    }

    #[test]
    fn test_landing_without_clear_scores_bonus_only() {
        let mut session = playing_session(&[]);
        session.on_command(Command::HardDrop);
        assert_eq!(session.score(), LANDING_BONUS);
        assert!(session.take_clear_report().is_none());
    }

    #[test]
    fn test_spawn_collision_ends_game() {
        // Scenario: the top rows are almost full, so the piece promoted
        // after the next landing collides at its spawn position.
        let mut session = playing_session(&[]);
        for row in 0..2 {
            for col in 0..COLS {
                if col != 9 {
                    session.board_mut().set(row, col, Cell::Filled(Color::Gray));
                }
            }
        }
        session.tick(BASE_FALL_INTERVAL_MS + 1);
        assert_eq!(session.state(), GameState::GameOver);
    }

    #[test]
    fn test_retry_fully_resets_session() {
        // Scenario: reach game over with garbage, score and an active
        // anomaly, then retry.
        let mut session = playing_session(&[0, 0, 0, 0, 4]);
        session.trigger_anomaly_pulse(); // SpeedUp
        session.on_command(Command::HardDrop);
        session.request_piece_change();
        for row in 0..2 {
            for col in 0..COLS - 1 {
                session.board_mut().set(row, col, Cell::Filled(Color::Gray));
            }
        }
        session.tick(BASE_FALL_INTERVAL_MS + 1);
        assert_eq!(session.state(), GameState::GameOver);

        session.start_or_retry();
        let snap = session.snapshot();
        assert_eq!(session.state(), GameState::Playing);
        assert_eq!(snap.score, 0);
        assert_eq!(snap.changes_left, MAX_CHANGES);
        assert!(!snap.reverse && !snap.command_confusion && !snap.speed_up);
        assert!(snap.board.iter().flatten().all(|c| c.is_empty()));
    }

    #[test]
    fn test_change_budget_is_enforced() {
        let mut session = playing_session(&[]);
        for expected in (0..MAX_CHANGES).rev() {
            session.request_piece_change();
            assert_eq!(session.snapshot().changes_left, expected);
        }
        // Exhausted budget: further requests are no-ops
        session.request_piece_change();
        assert_eq!(session.snapshot().changes_left, 0);
    }

    #[test]
    fn test_change_promotes_queued_piece() {
        // Script the reset spawns so current is I and next is O
        let mut session = playing_session(&[0, 0, 0, 3]);
        assert_eq!(session.snapshot().next.kind, TetrominoKind::O);
        session.request_piece_change();
        assert_eq!(session.snapshot().current.kind, TetrominoKind::O);
        // A fresh next was drawn rather than swapping the old current in
        assert_eq!(session.snapshot().next.kind, TetrominoKind::I);
    }

    #[test]
    fn test_command_confusion_remaps_input() {
        // Candidate index 3 with no flags active is CommandConfusion;
        // all-zero shuffle draws produce a non-identity permutation.
        let mut session = playing_session(&[0, 0, 0, 0, 3]);
        session.trigger_anomaly_pulse();
        let snap = session.snapshot();
        assert!(snap.command_confusion);
        let map = snap.permutation.expect("permutation present");

        let x = snap.current.x;
        session.on_command(Command::Left);
        let moved = session.snapshot().current.x - x;
        match map.apply(Command::Left) {
            Command::Left => assert_eq!(moved, -1),
            Command::Right => assert_eq!(moved, 1),
            _ => assert_eq!(moved, 0),
        }
    }

    #[test]
    fn test_pulses_ignored_outside_playing() {
        let mut session = playing_session(&[]);
        session.pause();
        session.trigger_anomaly_pulse();
        let snap = session.snapshot();
        assert!(!snap.reverse && !snap.command_confusion && !snap.speed_up);
        assert!(snap.board.iter().flatten().all(|c| c.is_empty()));
    }

    #[test]
    fn test_hard_drop_promotes_immediately() {
        let mut session = playing_session(&[]);
        session.on_command(Command::HardDrop);
        let snap = session.snapshot();
        // Bottom row holds the merged bar, a fresh piece sits at spawn
        assert!(snap.board[ROWS - 1][3].is_filled());
        assert_eq!(snap.current.y, 0);
        assert_eq!(session.state(), GameState::Playing);
    }
}
