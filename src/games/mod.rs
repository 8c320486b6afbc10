//! The three training games and what they share.

pub mod draw;
pub mod predict_saccade;
pub mod rail;
pub mod read_line;

use serde::{Deserialize, Serialize};
use web_sys::CanvasRenderingContext2d;

use crate::engine::input::{InputEvent, InputKind, InputSource};
use crate::engine::storage::{Difficulty, Pattern, RailType, Settings, Speed};
use crate::engine::{Palette, Sound};

pub use predict_saccade::PredictSaccade;
pub use rail::RailGame;
pub use read_line::ReadLine;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameId {
    Rail,
    ReadLine,
    PredictSaccade,
}

impl GameId {
    pub const ALL: [GameId; 3] = [GameId::Rail, GameId::ReadLine, GameId::PredictSaccade];

    pub fn name(self) -> &'static str {
        match self {
            GameId::Rail => "Rail tracking",
            GameId::ReadLine => "Row reading",
            GameId::PredictSaccade => "Jump ahead",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            GameId::Rail => "Follow the moving dot with your eyes",
            GameId::ReadLine => "Pick the shapes in order, row by row",
            GameId::PredictSaccade => "Guess where the next circle appears",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            GameId::Rail => "〰",
            GameId::ReadLine => "▦",
            GameId::PredictSaccade => "◎",
        }
    }
}

/// Outcome of one saccade round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundOutcome {
    pub cell: usize,
    pub success: bool,
    pub response_ms: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameDetails {
    Rail {
        check_count: u32,
        success_count: u32,
        lap_count: u32,
        rail_type: RailType,
        speed: Speed,
    },
    ReadLine {
        correct: u32,
        mistakes: u32,
        total: u32,
        completed: bool,
        difficulty: Difficulty,
    },
    PredictSaccade {
        pattern: Pattern,
        rounds: u32,
        successes: u32,
        attempts: u32,
        success_rate: u32,
        avg_response_ms: Option<u32>,
        outcomes: Vec<RoundOutcome>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameResult {
    pub game: GameId,
    pub score: u32,
    /// Percent, 0..=100.
    pub accuracy: u32,
    pub elapsed_secs: f64,
    pub finished: bool,
    /// Filled in once the session has been recorded.
    pub best_score: Option<u32>,
    pub details: GameDetails,
}

impl GameResult {
    /// Number shown as "correct" on the result screen.
    pub fn correct_count(&self) -> u32 {
        match &self.details {
            GameDetails::Rail { success_count, .. } => *success_count,
            GameDetails::ReadLine { correct, .. } => *correct,
            GameDetails::PredictSaccade { successes, .. } => *successes,
        }
    }
}

/// What the in-game header shows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HudInfo {
    pub score: u32,
    pub remaining_secs: Option<f64>,
    pub elapsed_secs: f64,
    /// `(current, total)` for round-based games.
    pub round: Option<(u32, u32)>,
}

pub trait MiniGame {
    fn id(&self) -> GameId;
    /// Builds layout and resets all counters.
    fn init(&mut self);
    fn start(&mut self);
    fn update(&mut self, dt: f64);
    fn render(&self, ctx: &CanvasRenderingContext2d, palette: &Palette);
    fn handle_input(&mut self, event: &InputEvent);
    fn pause(&mut self);
    fn resume(&mut self);
    fn is_finished(&self) -> bool;
    fn result(&self) -> GameResult;
    fn hud(&self) -> HudInfo;
    /// Sounds requested since the last call.
    fn take_cues(&mut self) -> Vec<Sound>;
    fn destroy(&mut self) {}
}

pub fn create_game(id: GameId, settings: &Settings, seed: u64) -> Box<dyn MiniGame> {
    match id {
        GameId::Rail => Box::new(RailGame::new(settings)),
        GameId::ReadLine => Box::new(ReadLine::new(settings, seed)),
        GameId::PredictSaccade => Box::new(PredictSaccade::new(settings, seed)),
    }
}

/// A deliberate press: pointer-down from mouse or touch, or Space. Clicks and
/// taps also emit a trailing `Action`, which is not counted again.
pub(crate) fn is_press(event: &InputEvent) -> bool {
    match event.kind {
        InputKind::PointerDown => true,
        InputKind::Action => event.source == InputSource::Keyboard,
        _ => false,
    }
}

pub(crate) fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        0
    } else {
        ((part as f64 / whole as f64) * 100.0).round() as u32
    }
}
