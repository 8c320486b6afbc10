//! Jump ahead: a faint preview shows where the next circle will appear, then
//! it fills in and the player responds.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use web_sys::CanvasRenderingContext2d;

use super::{GameDetails, GameId, GameResult, HudInfo, MiniGame, RoundOutcome, draw, is_press, percent};
use crate::engine::input::InputEvent;
use crate::engine::storage::{Pattern, Settings};
use crate::engine::{LOGICAL_HEIGHT, LOGICAL_WIDTH, Palette, Point, Sound};
use crate::util::{ease_in_quad, ease_out_quad, with_alpha};

pub const GRID_PADDING: f64 = 100.0;
pub const GRID_SIDE: usize = 3;
pub const MARKER_RADIUS: f64 = 40.0;

pub const PREVIEW_MS: f64 = 500.0;
pub const PREVIEW_FADE_MS: f64 = 300.0;
pub const PREVIEW_OPACITY: f64 = 0.3;
pub const ACTIVE_FADE_MS: f64 = 200.0;
pub const RESPONSE_MS: f64 = 2000.0;
pub const FEEDBACK_MS: f64 = 800.0;

const CROSS: [usize; 4] = [3, 4, 5, 4];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Ready,
    Preview,
    Active,
    Feedback,
    Complete,
}

/// Centres of the 3×3 cells, row-major.
pub fn grid_positions() -> [Point; GRID_SIDE * GRID_SIDE] {
    let cell_w = (LOGICAL_WIDTH - GRID_PADDING * 2.0) / GRID_SIDE as f64;
    let cell_h = (LOGICAL_HEIGHT - GRID_PADDING * 2.0) / GRID_SIDE as f64;
    std::array::from_fn(|i| {
        let (row, col) = (i / GRID_SIDE, i % GRID_SIDE);
        Point::new(
            GRID_PADDING + (col as f64 + 0.5) * cell_w,
            GRID_PADDING + (row as f64 + 0.5) * cell_h,
        )
    })
}

/// Cell indices for each round.
pub fn sequence(pattern: Pattern, rounds: u32, rng: &mut SmallRng) -> Vec<usize> {
    let rounds = rounds as usize;
    match pattern {
        Pattern::Horizontal => (0..rounds).map(|i| if i % 2 == 0 { 3 } else { 5 }).collect(),
        Pattern::Vertical => (0..rounds).map(|i| if i % 2 == 0 { 1 } else { 7 }).collect(),
        Pattern::CenterCross => (0..rounds).map(|i| CROSS[i % CROSS.len()]).collect(),
        Pattern::Random => {
            let mut out = Vec::with_capacity(rounds);
            let mut last = None;
            for _ in 0..rounds {
                let cell = loop {
                    let c = rng.random_range(0..GRID_SIDE * GRID_SIDE);
                    if Some(c) != last {
                        break c;
                    }
                };
                out.push(cell);
                last = Some(cell);
            }
            out
        }
    }
}

pub struct PredictSaccade {
    pattern: Pattern,
    rounds: u32,
    rng: SmallRng,
    cells: [Point; GRID_SIDE * GRID_SIDE],

    sequence: Vec<usize>,
    index: usize,
    phase: Phase,
    phase_ms: f64,
    opacity: f64,
    outcomes: Vec<RoundOutcome>,
    elapsed: f64,
    paused: bool,
    cues: Vec<Sound>,
}

impl PredictSaccade {
    pub fn new(settings: &Settings, seed: u64) -> Self {
        Self {
            pattern: settings.pattern,
            rounds: settings.rounds.max(1),
            rng: SmallRng::seed_from_u64(seed),
            cells: grid_positions(),
            sequence: Vec::new(),
            index: 0,
            phase: Phase::Ready,
            phase_ms: 0.0,
            opacity: 0.0,
            outcomes: Vec::new(),
            elapsed: 0.0,
            paused: false,
            cues: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcomes(&self) -> &[RoundOutcome] {
        &self.outcomes
    }

    pub fn marker_opacity(&self) -> f64 {
        self.opacity
    }

    fn successes(&self) -> u32 {
        self.outcomes.iter().filter(|o| o.success).count() as u32
    }

    fn current_cell(&self) -> Option<usize> {
        self.sequence.get(self.index).copied()
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_ms = 0.0;
        if phase == Phase::Preview {
            self.opacity = 0.0;
        }
    }

    fn respond(&mut self, success: bool) {
        let Some(cell) = self.current_cell() else {
            return;
        };
        self.outcomes.push(RoundOutcome {
            cell,
            success,
            response_ms: success.then_some(self.phase_ms),
        });
        if success {
            self.cues.push(Sound::Success);
        }
        self.enter(Phase::Feedback);
    }

    fn advance(&mut self) {
        self.index += 1;
        if self.index >= self.sequence.len() {
            self.enter(Phase::Complete);
            self.cues.push(Sound::Complete);
        } else {
            self.enter(Phase::Preview);
        }
    }

    fn render_marker(&self, ctx: &CanvasRenderingContext2d, palette: &Palette) {
        let Some(pos) = self.current_cell().map(|c| self.cells[c]) else {
            return;
        };
        ctx.save();
        draw::circle(ctx, pos.x, pos.y, MARKER_RADIUS);
        ctx.set_fill_style_str(&with_alpha(palette.primary, self.opacity));
        ctx.fill();
        if self.phase == Phase::Preview {
            let dash = js_sys::Array::of2(&5.0.into(), &5.0.into());
            let _ = ctx.set_line_dash(&dash);
            ctx.set_stroke_style_str(&with_alpha(palette.primary, (self.opacity * 1.5).min(1.0)));
            ctx.set_line_width(2.0);
            ctx.stroke();
        } else {
            let _ = ctx.set_line_dash(&js_sys::Array::new());
            ctx.set_stroke_style_str(&with_alpha(palette.text, self.opacity));
            ctx.set_line_width(3.0);
            ctx.stroke();
            // focus point
            draw::circle(ctx, pos.x, pos.y, 5.0);
            ctx.set_fill_style_str(&with_alpha(palette.background, self.opacity));
            ctx.fill();
        }
        ctx.restore();
    }

    fn render_feedback(&self, ctx: &CanvasRenderingContext2d, palette: &Palette) {
        let Some(last) = self.outcomes.last() else {
            return;
        };
        let progress = (self.phase_ms / FEEDBACK_MS).clamp(0.0, 1.0);
        let alpha = 1.0 - ease_in_quad(((progress - 0.7) / 0.3).max(0.0));
        let (text, color) = if last.success {
            ("Nice!", palette.success)
        } else {
            ("Take your time", palette.text_secondary)
        };
        draw::text_center(
            ctx,
            text,
            LOGICAL_WIDTH / 2.0,
            LOGICAL_HEIGHT / 2.0,
            "bold 32px sans-serif",
            &with_alpha(color, alpha),
        );
    }

    fn render_header(&self, ctx: &CanvasRenderingContext2d, palette: &Palette) {
        ctx.set_font("18px sans-serif");
        ctx.set_text_baseline("top");
        ctx.set_fill_style_str(palette.text_secondary);
        let shown = (self.outcomes.len() as u32 + 1).min(self.rounds);
        ctx.set_text_align("right");
        let _ = ctx.fill_text(&format!("{} / {}", shown, self.rounds), LOGICAL_WIDTH - 20.0, 20.0);
        ctx.set_text_align("left");
        let _ = ctx.fill_text(&format!("Done: {}", self.successes()), 20.0, 20.0);

        let instruction = match self.phase {
            Phase::Ready => "Press start",
            Phase::Preview => "Look at the next spot...",
            Phase::Active => "Now! Click or press Space",
            Phase::Complete => "All done, great effort",
            Phase::Feedback => return,
        };
        draw::text_center(
            ctx,
            instruction,
            LOGICAL_WIDTH / 2.0,
            LOGICAL_HEIGHT - 40.0,
            "20px sans-serif",
            palette.text,
        );
    }
}

impl MiniGame for PredictSaccade {
    fn id(&self) -> GameId {
        GameId::PredictSaccade
    }

    fn init(&mut self) {
        self.sequence = sequence(self.pattern, self.rounds, &mut self.rng);
        self.index = 0;
        self.outcomes.clear();
        self.elapsed = 0.0;
        self.opacity = 0.0;
        self.cues.clear();
        self.enter(Phase::Ready);
    }

    fn start(&mut self) {
        self.paused = false;
        self.cues.push(Sound::Start);
        self.enter(Phase::Preview);
    }

    fn update(&mut self, dt: f64) {
        if self.paused || matches!(self.phase, Phase::Ready | Phase::Complete) {
            return;
        }
        self.elapsed += dt;
        self.phase_ms += dt * 1000.0;

        match self.phase {
            Phase::Preview => {
                let fade = (self.phase_ms / PREVIEW_FADE_MS).clamp(0.0, 1.0);
                self.opacity = ease_out_quad(fade) * PREVIEW_OPACITY;
                if self.phase_ms >= PREVIEW_MS {
                    self.enter(Phase::Active);
                }
            }
            Phase::Active => {
                let fade = (self.phase_ms / ACTIVE_FADE_MS).clamp(0.0, 1.0);
                self.opacity = PREVIEW_OPACITY + ease_out_quad(fade) * (1.0 - PREVIEW_OPACITY);
                if self.phase_ms >= RESPONSE_MS {
                    self.respond(false);
                }
            }
            Phase::Feedback => {
                if self.phase_ms >= FEEDBACK_MS {
                    self.advance();
                }
            }
            Phase::Ready | Phase::Complete => {}
        }
    }

    fn render(&self, ctx: &CanvasRenderingContext2d, palette: &Palette) {
        draw::background(ctx, palette.background);

        ctx.set_fill_style_str(&with_alpha(palette.border, 0.2));
        for p in &self.cells {
            draw::circle(ctx, p.x, p.y, MARKER_RADIUS * 0.3);
            ctx.fill();
        }

        match self.phase {
            Phase::Preview | Phase::Active => self.render_marker(ctx, palette),
            Phase::Feedback => self.render_feedback(ctx, palette),
            Phase::Ready | Phase::Complete => {}
        }
        self.render_header(ctx, palette);
    }

    fn handle_input(&mut self, event: &InputEvent) {
        if self.paused || !is_press(event) {
            return;
        }
        // early presses during the preview are ignored
        if self.phase == Phase::Active {
            self.respond(true);
        }
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn is_finished(&self) -> bool {
        self.phase == Phase::Complete
    }

    fn result(&self) -> GameResult {
        let successes = self.successes();
        let attempts = self.outcomes.len() as u32;
        let success_rate = percent(successes, attempts);
        let times: Vec<f64> = self.outcomes.iter().filter_map(|o| o.response_ms).collect();
        let avg_response_ms =
            (!times.is_empty()).then(|| (times.iter().sum::<f64>() / times.len() as f64).round() as u32);

        GameResult {
            game: GameId::PredictSaccade,
            score: successes,
            accuracy: success_rate,
            elapsed_secs: self.elapsed.floor(),
            finished: self.is_finished(),
            best_score: None,
            details: GameDetails::PredictSaccade {
                pattern: self.pattern,
                rounds: self.rounds,
                successes,
                attempts,
                success_rate,
                avg_response_ms,
                outcomes: self.outcomes.clone(),
            },
        }
    }

    fn hud(&self) -> HudInfo {
        HudInfo {
            score: self.successes(),
            remaining_secs: None,
            elapsed_secs: self.elapsed,
            round: Some(((self.outcomes.len() as u32 + 1).min(self.rounds), self.rounds)),
        }
    }

    fn take_cues(&mut self) -> Vec<Sound> {
        std::mem::take(&mut self.cues)
    }

    fn destroy(&mut self) {
        self.phase = Phase::Ready;
        self.outcomes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::{InputKind, InputSource};

    fn game(pattern: Pattern, rounds: u32) -> PredictSaccade {
        let settings = Settings {
            pattern,
            rounds,
            ..Settings::default()
        };
        let mut g = PredictSaccade::new(&settings, 3);
        g.init();
        g
    }

    fn press(g: &mut PredictSaccade) {
        g.handle_input(&InputEvent::new(
            InputKind::PointerDown,
            InputSource::Touch,
            Point::default(),
            0.0,
        ));
    }

    fn step(g: &mut PredictSaccade, ms: f64) {
        let mut left = ms;
        while left > 0.0 {
            let dt = left.min(50.0);
            g.update(dt / 1000.0);
            left -= dt;
        }
    }

    #[test]
    fn grid_cells_are_centred() {
        let cells = grid_positions();
        assert_eq!(cells[0].x, 200.0);
        assert!((cells[0].y - (100.0 + 200.0 / 3.0)).abs() < 1e-9);
        assert!((cells[4].x - 400.0).abs() < 1e-9);
        assert!((cells[4].y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_patterns() {
        let mut rng = SmallRng::seed_from_u64(0);
        assert_eq!(sequence(Pattern::Horizontal, 4, &mut rng), vec![3, 5, 3, 5]);
        assert_eq!(sequence(Pattern::Vertical, 3, &mut rng), vec![1, 7, 1]);
        assert_eq!(sequence(Pattern::CenterCross, 6, &mut rng), vec![3, 4, 5, 4, 3, 4]);
    }

    #[test]
    fn random_pattern_never_repeats_a_cell() {
        let mut rng = SmallRng::seed_from_u64(99);
        let cells = sequence(Pattern::Random, 200, &mut rng);
        assert_eq!(cells.len(), 200);
        assert!(cells.iter().all(|&c| c < 9));
        assert!(cells.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn waits_for_start() {
        let mut g = game(Pattern::Horizontal, 2);
        step(&mut g, 1000.0);
        assert_eq!(g.phase(), Phase::Ready);
        g.start();
        assert_eq!(g.phase(), Phase::Preview);
    }

    #[test]
    fn preview_fades_then_activates() {
        let mut g = game(Pattern::Horizontal, 2);
        g.start();
        step(&mut g, 300.0);
        assert!((g.marker_opacity() - PREVIEW_OPACITY).abs() < 1e-9);
        // pressing early does nothing
        press(&mut g);
        assert_eq!(g.phase(), Phase::Preview);
        assert!(g.outcomes().is_empty());
        step(&mut g, 200.0);
        assert_eq!(g.phase(), Phase::Active);
        step(&mut g, 200.0);
        assert!((g.marker_opacity() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn response_records_time_and_timeout_is_neutral() {
        let mut g = game(Pattern::Horizontal, 2);
        g.start();
        step(&mut g, 500.0);
        step(&mut g, 350.0);
        press(&mut g);
        assert_eq!(g.phase(), Phase::Feedback);
        assert_eq!(g.outcomes()[0].response_ms, Some(350.0));
        assert_eq!(g.outcomes()[0].cell, 3);

        step(&mut g, FEEDBACK_MS);
        assert_eq!(g.phase(), Phase::Preview);
        step(&mut g, PREVIEW_MS + RESPONSE_MS);
        assert_eq!(g.phase(), Phase::Feedback);
        let second = &g.outcomes()[1];
        assert!(!second.success);
        assert_eq!(second.response_ms, None);
        assert_eq!(second.cell, 5);

        step(&mut g, FEEDBACK_MS);
        assert!(g.is_finished());
        let cues = g.take_cues();
        assert_eq!(cues, vec![Sound::Start, Sound::Success, Sound::Complete]);

        let r = g.result();
        assert_eq!(r.score, 1);
        assert_eq!(r.accuracy, 50);
        assert!(matches!(
            r.details,
            GameDetails::PredictSaccade { attempts: 2, successes: 1, avg_response_ms: Some(350), .. }
        ));
    }

    #[test]
    fn click_after_press_does_not_count_twice() {
        let mut g = game(Pattern::Vertical, 3);
        g.start();
        step(&mut g, 600.0);
        press(&mut g);
        g.handle_input(&InputEvent::new(InputKind::Action, InputSource::Touch, Point::default(), 0.0));
        assert_eq!(g.outcomes().len(), 1);
    }

    #[test]
    fn pause_freezes_the_round() {
        let mut g = game(Pattern::Horizontal, 1);
        g.start();
        step(&mut g, 600.0);
        g.pause();
        step(&mut g, 5000.0);
        press(&mut g);
        assert_eq!(g.phase(), Phase::Active);
        assert!(g.outcomes().is_empty());
        g.resume();
        press(&mut g);
        assert_eq!(g.outcomes().len(), 1);
        assert_eq!(g.hud().round, Some((1, 1)));
    }
}
