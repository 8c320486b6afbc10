//! Row reading: shapes laid out in a grid are picked left to right, one row
//! at a time.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use web_sys::CanvasRenderingContext2d;

use super::draw::{self, Shape};
use super::{GameDetails, GameId, GameResult, HudInfo, MiniGame, is_press, percent};
use crate::engine::input::{InputEvent, InputKind};
use crate::engine::storage::{Difficulty, Settings};
use crate::engine::{LOGICAL_HEIGHT, LOGICAL_WIDTH, Palette, Sound};
use crate::util::{darken, point_in_circle, with_alpha};

pub const SIDE_MARGIN: f64 = 80.0;
pub const TOP_MARGIN: f64 = 100.0;
pub const BOTTOM_MARGIN: f64 = 100.0;
pub const TARGET_RADIUS: f64 = 30.0;
/// Hit area relative to the drawn radius, so small fingers still land.
pub const HIT_SCALE: f64 = 1.2;
pub const POINTS_PER_TARGET: u32 = 10;
pub const MESSAGE_SECS: f64 = 2.0;

pub const SHAPE_COLORS: [&str; 7] = [
    "#5DA5DA", "#FAA43A", "#60BD68", "#F17CB0", "#B276B2", "#DECF3F", "#4D4D4D",
];

#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub x: f64,
    pub y: f64,
    pub row: usize,
    pub col: usize,
    pub shape: Shape,
    pub color: &'static str,
    pub completed: bool,
    pub hinted: bool,
}

impl Target {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        point_in_circle(x, y, self.x, self.y, TARGET_RADIUS * HIT_SCALE)
    }
}

/// Gentle correction shown after a miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hint {
    /// Tapped a row below the current one.
    RowAhead,
    /// Tapped a row that is already done.
    RowBehind,
    /// Right row, wrong position.
    LookAgain,
}

impl Hint {
    pub fn text(self) -> &'static str {
        match self {
            Hint::RowAhead => "That row comes later. Let's go back.",
            Hint::RowBehind => "That row is done. Let's keep going.",
            Hint::LookAgain => "Let's look again.",
        }
    }
}

fn row_spacing(rows: usize) -> f64 {
    (LOGICAL_HEIGHT - TOP_MARGIN - BOTTOM_MARGIN) / (rows + 1) as f64
}

/// Lays out a `rows × cols` grid with shuffled shapes and colours.
pub fn layout(rows: usize, cols: usize, rng: &mut SmallRng) -> Vec<Target> {
    let mut shapes = Shape::ALL;
    shapes.shuffle(rng);
    let mut colors = SHAPE_COLORS;
    colors.shuffle(rng);

    let col_spacing = (LOGICAL_WIDTH - SIDE_MARGIN * 2.0) / (cols + 1) as f64;
    let row_spacing = row_spacing(rows);
    let mut targets = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let i = row * cols + col;
            targets.push(Target {
                x: SIDE_MARGIN + col_spacing * (col + 1) as f64,
                y: TOP_MARGIN + row_spacing * (row + 1) as f64,
                row,
                col,
                shape: shapes[i % shapes.len()],
                color: colors[i % colors.len()],
                completed: false,
                hinted: false,
            });
        }
    }
    targets
}

pub struct ReadLine {
    difficulty: Difficulty,
    rows: usize,
    cols: usize,
    guide: bool,
    time_limit: Option<f64>,
    rng: SmallRng,

    targets: Vec<Target>,
    current_row: usize,
    current_col: usize,
    score: u32,
    correct: u32,
    mistakes: u32,
    elapsed: f64,
    message: Option<(Hint, f64)>,
    /// Drives the pulse on the next target.
    anim_secs: f64,

    running: bool,
    paused: bool,
    completed: bool,
    finished: bool,
    cues: Vec<Sound>,
}

impl ReadLine {
    pub fn new(settings: &Settings, seed: u64) -> Self {
        let side = settings.difficulty.grid_side();
        Self {
            difficulty: settings.difficulty,
            rows: side,
            cols: side,
            guide: settings.guide,
            time_limit: settings.time_limit.seconds(),
            rng: SmallRng::seed_from_u64(seed),
            targets: Vec::new(),
            current_row: 0,
            current_col: 0,
            score: 0,
            correct: 0,
            mistakes: 0,
            elapsed: 0.0,
            message: None,
            anim_secs: 0.0,
            running: false,
            paused: false,
            completed: false,
            finished: false,
            cues: Vec::new(),
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn message(&self) -> Option<Hint> {
        self.message.map(|(hint, _)| hint)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn total(&self) -> u32 {
        (self.rows * self.cols) as u32
    }

    fn next_index(&self) -> Option<usize> {
        (self.current_row < self.rows).then(|| self.current_row * self.cols + self.current_col)
    }

    fn clear_hints(&mut self) {
        for t in &mut self.targets {
            t.hinted = false;
        }
    }

    fn complete(&mut self) {
        self.completed = true;
        self.cues.push(Sound::Complete);
    }

    fn tap(&mut self, x: f64, y: f64) {
        let Some(hit) = self
            .targets
            .iter()
            .position(|t| !t.completed && t.contains(x, y))
        else {
            return;
        };
        let next = self.next_index();
        if Some(hit) == next {
            self.targets[hit].completed = true;
            self.correct += 1;
            self.score += POINTS_PER_TARGET;
            self.cues.push(Sound::Success);
            self.clear_hints();
            self.message = None;

            self.current_col += 1;
            if self.current_col >= self.cols {
                self.current_col = 0;
                self.current_row += 1;
                if self.current_row >= self.rows {
                    self.complete();
                }
            }
            return;
        }

        self.mistakes += 1;
        let row = self.targets[hit].row;
        let hint = if row > self.current_row {
            Hint::RowAhead
        } else if row < self.current_row {
            Hint::RowBehind
        } else {
            Hint::LookAgain
        };
        self.message = Some((hint, MESSAGE_SECS));
        if let Some(t) = next.and_then(|i| self.targets.get_mut(i)) {
            t.hinted = true;
        }
    }

    fn render_row_band(&self, ctx: &CanvasRenderingContext2d, palette: &Palette) {
        let spacing = row_spacing(self.rows);
        let top = TOP_MARGIN + spacing * (self.current_row + 1) as f64 - TARGET_RADIUS - 15.0;
        let height = TARGET_RADIUS * 2.0 + 30.0;
        let mid = top + height / 2.0;

        ctx.set_fill_style_str(&with_alpha(palette.primary, 0.1));
        ctx.fill_rect(0.0, top, LOGICAL_WIDTH, height);

        ctx.set_fill_style_str(&with_alpha(palette.primary, 0.5));
        for (tip, base) in [(15.0, 35.0), (LOGICAL_WIDTH - 15.0, LOGICAL_WIDTH - 35.0)] {
            ctx.begin_path();
            ctx.move_to(tip, mid);
            ctx.line_to(base, mid - 15.0);
            ctx.line_to(base, mid + 15.0);
            ctx.close_path();
            ctx.fill();
        }
    }

    fn render_glow(&self, ctx: &CanvasRenderingContext2d, t: &Target, color: &str, strength: f64, reach: f64) {
        let outer = TARGET_RADIUS * reach;
        let Ok(g) = ctx.create_radial_gradient(t.x, t.y, TARGET_RADIUS * 0.5, t.x, t.y, outer) else {
            return;
        };
        let _ = g.add_color_stop(0.0, &with_alpha(color, strength));
        let _ = g.add_color_stop(0.5, &with_alpha(color, strength * 0.5));
        let _ = g.add_color_stop(1.0, &with_alpha(color, 0.0));
        ctx.set_fill_style_canvas_gradient(&g);
        draw::circle(ctx, t.x, t.y, outer);
        ctx.fill();
    }

    fn render_target(&self, ctx: &CanvasRenderingContext2d, palette: &Palette, t: &Target, is_next: bool) {
        if is_next && self.guide {
            self.render_glow(ctx, t, palette.primary, 0.4, 1.8);
        }
        if t.hinted {
            let pulse = 0.3 + (self.anim_secs * 2.0).sin() * 0.1;
            self.render_glow(ctx, t, palette.success, pulse, 2.0);
        }

        let scale = if is_next && self.guide {
            1.0 + (self.anim_secs / 0.3).sin() * 0.05
        } else {
            1.0
        };
        let r = TARGET_RADIUS * scale;
        let fill = if t.completed {
            with_alpha(t.color, 0.3)
        } else {
            t.color.to_string()
        };
        ctx.set_fill_style_str(&fill);
        ctx.set_stroke_style_str(&darken(t.color, 0.2));
        ctx.set_line_width(2.0);
        t.shape.path(ctx, t.x, t.y, r);
        ctx.fill();
        ctx.stroke();

        if t.completed {
            let s = TARGET_RADIUS * 0.5;
            ctx.set_stroke_style_str(palette.success);
            ctx.set_line_width(3.0);
            ctx.set_line_cap("round");
            ctx.set_line_join("round");
            ctx.begin_path();
            ctx.move_to(t.x - s * 0.5, t.y);
            ctx.line_to(t.x - s * 0.1, t.y + s * 0.4);
            ctx.line_to(t.x + s * 0.5, t.y - s * 0.3);
            ctx.stroke();
        }
    }

    fn render_message(&self, ctx: &CanvasRenderingContext2d, palette: &Palette, hint: Hint) {
        let (w, h) = (340.0, 60.0);
        let x = (LOGICAL_WIDTH - w) / 2.0;
        let y = LOGICAL_HEIGHT - 120.0;
        ctx.set_fill_style_str(&with_alpha(palette.surface, 0.95));
        ctx.set_stroke_style_str(palette.border);
        ctx.set_line_width(2.0);
        draw::round_rect(ctx, x, y, w, h, 10.0);
        ctx.fill();
        ctx.stroke();
        draw::text_center(ctx, hint.text(), LOGICAL_WIDTH / 2.0, y + h / 2.0, "18px sans-serif", palette.text);
    }

    fn render_completed(&self, ctx: &CanvasRenderingContext2d, palette: &Palette) {
        ctx.set_fill_style_str(&with_alpha(palette.background, 0.8));
        ctx.fill_rect(0.0, 0.0, LOGICAL_WIDTH, LOGICAL_HEIGHT);
        let cx = LOGICAL_WIDTH / 2.0;
        let cy = LOGICAL_HEIGHT / 2.0;
        draw::text_center(ctx, "All done!", cx, cy - 40.0, "bold 32px sans-serif", palette.text);
        draw::text_center(
            ctx,
            &format!("Correct: {}", self.correct),
            cx,
            cy + 10.0,
            "20px sans-serif",
            palette.text,
        );
        draw::text_center(
            ctx,
            "Tap to see your results",
            cx,
            cy + 60.0,
            "16px sans-serif",
            palette.text_secondary,
        );
    }
}

impl MiniGame for ReadLine {
    fn id(&self) -> GameId {
        GameId::ReadLine
    }

    fn init(&mut self) {
        self.targets = layout(self.rows, self.cols, &mut self.rng);
        self.current_row = 0;
        self.current_col = 0;
        self.score = 0;
        self.correct = 0;
        self.mistakes = 0;
        self.elapsed = 0.0;
        self.message = None;
        self.anim_secs = 0.0;
        self.running = false;
        self.completed = false;
        self.finished = false;
        self.cues.clear();
    }

    fn start(&mut self) {
        self.running = true;
        self.paused = false;
        self.cues.push(Sound::Start);
    }

    fn update(&mut self, dt: f64) {
        if !self.running || self.paused || self.completed {
            return;
        }
        self.elapsed += dt;
        self.anim_secs += dt;
        if self.time_limit.is_some_and(|limit| self.elapsed >= limit) {
            self.complete();
            return;
        }
        if let Some((_, left)) = self.message.as_mut() {
            *left -= dt;
            if *left <= 0.0 {
                self.message = None;
                self.clear_hints();
            }
        }
    }

    fn render(&self, ctx: &CanvasRenderingContext2d, palette: &Palette) {
        draw::background(ctx, palette.background);

        draw::text_center(
            ctx,
            &format!("{} / {}", self.correct, self.total()),
            LOGICAL_WIDTH / 2.0,
            30.0,
            "bold 20px sans-serif",
            palette.text,
        );
        if !self.completed {
            draw::text_center(
                ctx,
                &format!("Row {}", self.current_row + 1),
                LOGICAL_WIDTH / 2.0,
                60.0,
                "14px sans-serif",
                palette.text_secondary,
            );
        }

        if self.guide && !self.completed {
            self.render_row_band(ctx, palette);
        }
        let next = self.next_index();
        for (i, t) in self.targets.iter().enumerate() {
            self.render_target(ctx, palette, t, Some(i) == next);
        }
        if let Some(hint) = self.message() {
            self.render_message(ctx, palette, hint);
        }
        if self.completed {
            self.render_completed(ctx, palette);
        }
    }

    fn handle_input(&mut self, event: &InputEvent) {
        if !self.running || self.paused || self.finished {
            return;
        }
        if self.completed {
            if is_press(event) {
                self.finished = true;
            }
            return;
        }
        if event.kind == InputKind::PointerDown {
            self.tap(event.position.x, event.position.y);
        }
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn result(&self) -> GameResult {
        let total = self.total();
        GameResult {
            game: GameId::ReadLine,
            score: self.score,
            accuracy: percent(self.correct, total),
            elapsed_secs: self.elapsed.floor(),
            finished: self.finished,
            best_score: None,
            details: GameDetails::ReadLine {
                correct: self.correct,
                mistakes: self.mistakes,
                total,
                completed: self.completed && self.current_row >= self.rows,
                difficulty: self.difficulty,
            },
        }
    }

    fn hud(&self) -> HudInfo {
        HudInfo {
            score: self.score,
            remaining_secs: self.time_limit.map(|l| (l - self.elapsed).max(0.0)),
            elapsed_secs: self.elapsed,
            round: None,
        }
    }

    fn take_cues(&mut self) -> Vec<Sound> {
        std::mem::take(&mut self.cues)
    }

    fn destroy(&mut self) {
        self.running = false;
        self.targets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Point;
    use crate::engine::input::InputSource;
    use crate::engine::storage::TimeLimit;

    fn game(difficulty: Difficulty, time_limit: TimeLimit) -> ReadLine {
        let settings = Settings {
            difficulty,
            time_limit,
            ..Settings::default()
        };
        let mut g = ReadLine::new(&settings, 42);
        g.init();
        g.start();
        g
    }

    fn tap_target(g: &mut ReadLine, row: usize, col: usize) {
        let t = g.targets().iter().find(|t| t.row == row && t.col == col).unwrap();
        let ev = InputEvent::new(
            InputKind::PointerDown,
            InputSource::Mouse,
            Point::new(t.x + 5.0, t.y - 5.0),
            0.0,
        );
        g.handle_input(&ev);
    }

    #[test]
    fn grid_size_follows_difficulty() {
        assert_eq!(game(Difficulty::Easy, TimeLimit::Medium).targets().len(), 9);
        assert_eq!(game(Difficulty::Normal, TimeLimit::Medium).targets().len(), 16);
        assert_eq!(game(Difficulty::Hard, TimeLimit::Medium).targets().len(), 25);
    }

    #[test]
    fn layout_spacing_and_variety() {
        let mut rng = SmallRng::seed_from_u64(1);
        let targets = layout(3, 3, &mut rng);
        // area 640 wide / 4 columns of spacing
        assert_eq!(targets[0].x, 80.0 + 160.0);
        assert_eq!(targets[0].y, 100.0 + 100.0);
        assert_eq!(targets[4].x, 80.0 + 320.0);
        // first five targets use five different shapes
        let mut shapes: Vec<_> = targets.iter().take(5).map(|t| t.shape).collect();
        shapes.dedup();
        assert_eq!(shapes.len(), 5);
    }

    #[test]
    fn reading_in_order_completes_then_finishes_on_next_press() {
        let mut g = game(Difficulty::Easy, TimeLimit::Unlimited);
        assert_eq!(g.take_cues(), vec![Sound::Start]);
        for row in 0..3 {
            for col in 0..3 {
                tap_target(&mut g, row, col);
            }
        }
        assert!(g.is_completed());
        assert!(!g.is_finished());
        let cues = g.take_cues();
        assert_eq!(cues.iter().filter(|s| **s == Sound::Success).count(), 9);
        assert_eq!(cues.last(), Some(&Sound::Complete));

        // the click that follows the last tap is not a new press
        g.handle_input(&InputEvent::new(InputKind::Action, InputSource::Mouse, Point::default(), 0.0));
        assert!(!g.is_finished());
        g.handle_input(&InputEvent::new(InputKind::Action, InputSource::Keyboard, Point::default(), 0.0));
        assert!(g.is_finished());

        let r = g.result();
        assert_eq!(r.score, 90);
        assert_eq!(r.accuracy, 100);
        assert!(matches!(r.details, GameDetails::ReadLine { completed: true, mistakes: 0, .. }));
    }

    #[test]
    fn wrong_row_and_wrong_order_are_gentle_mistakes() {
        let mut g = game(Difficulty::Easy, TimeLimit::Unlimited);
        tap_target(&mut g, 2, 0);
        assert_eq!(g.message(), Some(Hint::RowAhead));
        assert!(g.targets()[0].hinted);

        tap_target(&mut g, 0, 2);
        assert_eq!(g.message(), Some(Hint::LookAgain));

        // finish row 0, then tap back into it
        for col in 0..3 {
            tap_target(&mut g, 0, col);
        }
        assert_eq!(g.message(), None);
        assert!(!g.targets()[0].hinted);
        tap_target(&mut g, 2, 2);
        assert_eq!(g.message(), Some(Hint::RowAhead));
        let r = g.result();
        assert!(matches!(r.details, GameDetails::ReadLine { mistakes: 3, correct: 3, .. }));
        assert_eq!(r.accuracy, 33);
    }

    #[test]
    fn message_fades_after_two_seconds() {
        let mut g = game(Difficulty::Easy, TimeLimit::Unlimited);
        tap_target(&mut g, 1, 1);
        g.update(1.5);
        assert!(g.message().is_some());
        g.update(0.6);
        assert!(g.message().is_none());
        assert!(g.targets().iter().all(|t| !t.hinted));
    }

    #[test]
    fn timeout_completes_without_finishing() {
        let mut g = game(Difficulty::Normal, TimeLimit::Short);
        for _ in 0..301 {
            g.update(0.1);
        }
        assert!(g.is_completed());
        assert_eq!(g.hud().remaining_secs, Some(0.0));
        // taps on targets no longer count
        tap_target(&mut g, 0, 0);
        assert!(g.is_finished());
        let r = g.result();
        assert_eq!(r.score, 0);
        assert!(matches!(r.details, GameDetails::ReadLine { completed: false, total: 16, .. }));
    }
}
