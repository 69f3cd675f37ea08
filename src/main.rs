//! ANOMATRIS - Tetris with a hostile streak
//!
//! The terminal driver: owns the event loop, feeds ticks and commands to
//! the game session, and draws snapshots. The anomaly pulse that a motion
//! sensor would fire on the original hardware is bound to a key here.

mod anomaly;
mod board;
mod game;
mod input;
mod piece;
mod rng;
mod settings;
mod tetromino;
mod ui;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use game::{GameSession, GameState, Notice};
use input::{Action, InputHandler};
use ratatui::{Terminal, backend::CrosstermBackend};
use settings::Settings;
use std::{
    io::{self, stdout},
    time::{Duration, Instant},
};

/// Target frame rate
const TARGET_FPS: u64 = 60;
const FRAME_DURATION: Duration = Duration::from_micros(1_000_000 / TARGET_FPS);

/// How long an event notice stays on screen
const NOTICE_DURATION: Duration = Duration::from_secs(2);

/// Line-clear flash: lit/dark beat length and repeat count
const FLASH_BEAT: Duration = Duration::from_millis(100);
const FLASH_BEATS: usize = 3;

/// Get the anomatris temp directory, creating it if needed
fn anomatris_temp_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("anomatris");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

fn main() -> io::Result<()> {
    // Generate session ID for this instance
    let session_id: u32 = rand::random();

    // Setup tracing to log file
    let log_dir = anomatris_temp_dir();
    let log_file = format!("{:08x}.log", session_id);
    let file_appender = tracing_appender::rolling::never(&log_dir, &log_file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("anomatris=debug".parse().unwrap()),
        )
        .with_ansi(false)
        .init();

    tracing::info!(
        "ANOMATRIS starting up, session={:08x}, log={}",
        session_id,
        log_dir.join(&log_file).display()
    );

    // Load settings
    let settings = Settings::load();

    // Setup terminal
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run app and capture result
    let result = run_app(&mut terminal, &settings);

    // Restore terminal
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;

    // Write the settings template back so there is a file to edit
    if let Err(e) = settings.save() {
        tracing::warn!("could not save settings: {}", e);
    }

    if let Ok(Some(score)) = &result {
        println!("\nThanks for playing ANOMATRIS!");
        println!("Final Score: {}", score);
    }

    result.map(|_| ())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    settings: &Settings,
) -> io::Result<Option<u64>> {
    let mut session = GameSession::new();
    let mut input = InputHandler::from_settings(settings);
    let mut active_notices: Vec<(Notice, Instant)> = Vec::new();
    let mut last_tick = Instant::now();
    let mut last_logged_score: u64 = 0;

    loop {
        // Render
        active_notices.retain(|(_, since)| since.elapsed() < NOTICE_DURATION);
        let snap = session.snapshot();
        let visible = visible_notices(&active_notices);
        terminal.draw(|frame| ui::render(frame, &snap, settings, &visible, None))?;

        // Handle input
        if event::poll(FRAME_DURATION)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    input.key_up(key);
                } else if key.kind == KeyEventKind::Press {
                    match session.state() {
                        GameState::Start => match key.code {
                            KeyCode::Enter => session.start_or_retry(),
                            KeyCode::Char('q') => return Ok(None),
                            _ => {}
                        },
                        GameState::Playing => {
                            for action in input.key_down(key) {
                                match action {
                                    Action::Game(cmd) => session.on_command(cmd),
                                    Action::ChangePiece => session.request_piece_change(),
                                    Action::AnomalyPulse => session.trigger_anomaly_pulse(),
                                    Action::Pause => {
                                        session.pause();
                                        input.clear();
                                    }
                                    Action::Quit => return Ok(Some(session.score())),
                                }
                            }
                        }
                        GameState::Paused => match key.code {
                            KeyCode::Char('p') | KeyCode::Esc => session.resume(),
                            KeyCode::Char('t') => session.back_to_title(),
                            KeyCode::Char('q') => return Ok(Some(session.score())),
                            _ => {}
                        },
                        GameState::GameOver => match key.code {
                            KeyCode::Enter | KeyCode::Char('r') => session.start_or_retry(),
                            KeyCode::Char('t') => session.back_to_title(),
                            KeyCode::Char('q') => return Ok(Some(session.score())),
                            _ => {}
                        },
                    }
                }
            }
        }

        // Held-key repeats (DAS/ARR)
        if session.state() == GameState::Playing {
            for action in input.update() {
                if let Action::Game(cmd) = action {
                    session.on_command(cmd);
                }
            }
        }

        // Advance simulation time
        let dt = last_tick.elapsed();
        last_tick = Instant::now();
        session.tick(dt.as_millis() as u64);

        // Auxiliary score sink: log every score change
        let score = session.score();
        if score != last_logged_score {
            tracing::info!("score: {}", score);
            last_logged_score = score;
        }

        for notice in session.drain_notices() {
            active_notices.push((notice, Instant::now()));
        }

        // A clear happened this frame: flash the rows before any further
        // input reaches the grid
        if let Some(report) = session.take_clear_report() {
            let visible = visible_notices(&active_notices);
            run_clear_flash(terminal, &session, settings, &report.rows, &visible)?;
            // Flash beats are presentation time, not simulation time
            last_tick = Instant::now();
        }
    }
}

fn visible_notices(active: &[(Notice, Instant)]) -> Vec<Notice> {
    active.iter().map(|(n, _)| n.clone()).collect()
}

/// Blocking flash animation for cleared rows: lit then dark, repeated.
/// Runs strictly between the merge and the next polled input.
fn run_clear_flash(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &GameSession,
    settings: &Settings,
    rows: &[usize],
    notices: &[Notice],
) -> io::Result<()> {
    let snap = session.snapshot();
    for _ in 0..FLASH_BEATS {
        for lit in [true, false] {
            terminal.draw(|frame| {
                ui::render(
                    frame,
                    &snap,
                    settings,
                    notices,
                    Some(ui::ClearFlash { rows, lit }),
                )
            })?;
            std::thread::sleep(FLASH_BEAT);
        }
    }
    Ok(())
}
