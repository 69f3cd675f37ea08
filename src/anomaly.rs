//! Anomaly events: random rule perturbations fired by external pulses
//!
//! Each pulse picks one event from a candidate set that never offers an
//! already-active anomaly and offers a reset only once something is
//! active, then applies it to the grid or the anomaly flags.

use crate::board::{Board, COLS, GARBAGE_COLOR};
use crate::game::{Command, Notice};
use crate::rng::{self, RandomSource};
use ratatui::style::Color;

/// Garbage rows injected per AddGarbage event
pub const GARBAGE_ROWS_PER_EVENT: usize = 3;

/// The disruptive events a pulse can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    AddGarbage,
    WipeBoard,
    ResetAnomalies,
    Reverse,
    CommandConfusion,
    SpeedUp,
}

/// A random permutation of the logical commands, applied to every
/// command while confusion is active
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMap {
    map: [Command; 5],
}

impl CommandMap {
    /// Sample a permutation that differs from the identity in at least
    /// one position. Individual commands may still map to themselves,
    /// only the full-identity mapping is re-sampled.
    pub fn scrambled(rng: &mut dyn RandomSource) -> Self {
        let mut map = Command::ALL;
        loop {
            rng::shuffle(rng, &mut map);
            if map != Command::ALL {
                break;
            }
        }
        Self { map }
    }

    pub fn apply(&self, cmd: Command) -> Command {
        self.map[cmd.index()]
    }

    pub fn is_identity(&self) -> bool {
        self.map == Command::ALL
    }
}

/// Currently active anomalies
#[derive(Debug, Clone, Default)]
pub struct AnomalyState {
    /// The renderer flips the board vertically while set
    pub reverse: bool,
    /// The effective fall interval is halved while set
    pub speed_up: bool,
    /// Present exactly while command confusion is active
    pub permutation: Option<CommandMap>,
}

impl AnomalyState {
    pub fn command_confusion(&self) -> bool {
        self.permutation.is_some()
    }

    pub fn any_active(&self) -> bool {
        self.reverse || self.speed_up || self.command_confusion()
    }

    /// Remap a logical command through the confusion permutation;
    /// identity when confusion is inactive
    pub fn remap(&self, cmd: Command) -> Command {
        match &self.permutation {
            Some(map) => map.apply(cmd),
            None => cmd,
        }
    }

    pub fn reset(&mut self) {
        self.reverse = false;
        self.speed_up = false;
        self.permutation = None;
    }
}

/// The candidate events a pulse may select from, given the active flags.
/// Garbage and wipe are always available; flag events only while their
/// flag is down; the reset only while at least one flag is up.
pub fn available_events(state: &AnomalyState) -> Vec<EventKind> {
    let mut events = vec![EventKind::AddGarbage, EventKind::WipeBoard];
    if state.any_active() {
        events.push(EventKind::ResetAnomalies);
    }
    if !state.reverse {
        events.push(EventKind::Reverse);
    }
    if !state.command_confusion() {
        events.push(EventKind::CommandConfusion);
    }
    if !state.speed_up {
        events.push(EventKind::SpeedUp);
    }
    events
}

/// Holds the anomaly flags and applies triggered events
#[derive(Debug, Clone, Default)]
pub struct AnomalyController {
    pub state: AnomalyState,
}

impl AnomalyController {
    /// Select one candidate event uniformly and apply it
    pub fn trigger(&mut self, board: &mut Board, rng: &mut dyn RandomSource) -> Notice {
        let event = rng::choose(rng, &available_events(&self.state));
        self.apply(event, board, rng)
    }

    /// Apply a specific event, yielding the notice the renderer flashes
    pub fn apply(
        &mut self,
        event: EventKind,
        board: &mut Board,
        rng: &mut dyn RandomSource,
    ) -> Notice {
        match event {
            EventKind::AddGarbage => {
                for _ in 0..GARBAGE_ROWS_PER_EVENT {
                    let hole = rng.next_index(COLS);
                    board.add_garbage_row(hole, GARBAGE_COLOR);
                }
                Notice::new("+ BLOCKS", Color::Red)
            }
            EventKind::WipeBoard => {
                board.wipe();
                Notice::new("CLEAN UP", Color::Cyan)
            }
            EventKind::Reverse => {
                self.state.reverse = true;
                Notice::new("REVERSE", Color::Magenta)
            }
            EventKind::CommandConfusion => {
                self.state.permutation = Some(CommandMap::scrambled(rng));
                Notice::new("COMMAND CONFUSION", Color::Green)
            }
            EventKind::SpeedUp => {
                self.state.speed_up = true;
                Notice::new("SPEED UP", Color::Rgb(255, 165, 0))
            }
            EventKind::ResetAnomalies => {
                self.state.reset();
                Notice::new("RESET", Color::White)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ROWS;
    use crate::rng::{ChaChaSource, ScriptedSource};

    #[test]
    fn test_candidates_with_no_flags_active() {
        let state = AnomalyState::default();
        let events = available_events(&state);
        assert_eq!(
            events,
            vec![
                EventKind::AddGarbage,
                EventKind::WipeBoard,
                EventKind::Reverse,
                EventKind::CommandConfusion,
                EventKind::SpeedUp,
            ]
        );
    }

    #[test]
    fn test_active_flags_are_never_candidates() {
        let mut controller = AnomalyController::default();
        let mut board = Board::new();
        let mut rng = ChaChaSource::with_seed(1);
        controller.apply(EventKind::Reverse, &mut board, &mut rng);
        controller.apply(EventKind::SpeedUp, &mut board, &mut rng);

        let events = available_events(&controller.state);
        assert!(!events.contains(&EventKind::Reverse));
        assert!(!events.contains(&EventKind::SpeedUp));
        assert!(events.contains(&EventKind::CommandConfusion));
        assert!(events.contains(&EventKind::ResetAnomalies));
    }

    #[test]
    fn test_reset_offered_only_when_something_active() {
        let mut state = AnomalyState::default();
        assert!(!available_events(&state).contains(&EventKind::ResetAnomalies));
        state.speed_up = true;
        assert!(available_events(&state).contains(&EventKind::ResetAnomalies));
    }

    #[test]
    fn test_garbage_rows_keep_width_and_one_hole() {
        let mut controller = AnomalyController::default();
        let mut board = Board::new();
        let mut rng = ChaChaSource::with_seed(9);
        controller.apply(EventKind::AddGarbage, &mut board, &mut rng);

        for row in ROWS - GARBAGE_ROWS_PER_EVENT..ROWS {
            let holes = board.rows()[row].iter().filter(|c| c.is_empty()).count();
            assert_eq!(holes, 1, "row {} should have exactly one hole", row);
        }
    }

    #[test]
    fn test_wipe_empties_board_and_sets_no_flags() {
        let mut controller = AnomalyController::default();
        let mut board = Board::new();
        let mut rng = ChaChaSource::with_seed(2);
        controller.apply(EventKind::AddGarbage, &mut board, &mut rng);
        controller.apply(EventKind::WipeBoard, &mut board, &mut rng);
        assert!(board.is_empty());
        assert!(!controller.state.any_active());
    }

    #[test]
    fn test_reset_clears_all_flags() {
        let mut controller = AnomalyController::default();
        let mut board = Board::new();
        let mut rng = ChaChaSource::with_seed(4);
        controller.apply(EventKind::Reverse, &mut board, &mut rng);
        controller.apply(EventKind::CommandConfusion, &mut board, &mut rng);
        controller.apply(EventKind::SpeedUp, &mut board, &mut rng);
        assert!(controller.state.any_active());

        controller.apply(EventKind::ResetAnomalies, &mut board, &mut rng);
        assert!(!controller.state.any_active());
        assert!(controller.state.permutation.is_none());
    }

    #[test]
    fn test_scrambled_map_is_never_identity() {
        for seed in 0..50 {
            let mut rng = ChaChaSource::with_seed(seed);
            let map = CommandMap::scrambled(&mut rng);
            assert!(!map.is_identity(), "seed {} produced identity", seed);
        }
    }

    #[test]
    fn test_scrambled_resamples_past_identity_shuffles() {
        // Swapping j == i at every step leaves the array untouched; the
        // sampler must reject that draw and take the next one
        let identity_then_reverse = [4, 3, 2, 1, 0, 0, 0, 0];
        let mut rng = ScriptedSource::new(&identity_then_reverse);
        let map = CommandMap::scrambled(&mut rng);
        assert!(!map.is_identity());
    }

    #[test]
    fn test_scripted_trigger_selects_by_candidate_order() {
        let mut controller = AnomalyController::default();
        let mut board = Board::new();
        // Index 4 in the clean-state candidate list is SpeedUp
        let mut rng = ScriptedSource::new(&[4]);
        controller.trigger(&mut board, &mut rng);
        assert!(controller.state.speed_up);
        assert!(!controller.state.reverse);
    }

    #[test]
    fn test_remap_is_identity_without_confusion() {
        let state = AnomalyState::default();
        for cmd in Command::ALL {
            assert_eq!(state.remap(cmd), cmd);
        }
    }
}
