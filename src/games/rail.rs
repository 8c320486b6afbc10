//! Rail tracking: a dot runs along a rail and the player presses while it
//! crosses the highlighted middle stretch.

use web_sys::CanvasRenderingContext2d;

use super::{GameDetails, GameId, GameResult, HudInfo, MiniGame, draw, is_press, percent};
use crate::engine::input::InputEvent;
use crate::engine::storage::{FontSize, RailType, Settings, Speed};
use crate::engine::{LOGICAL_HEIGHT, LOGICAL_WIDTH, Palette, Point, Sound};

pub const PADDING: f64 = 60.0;
/// One lap at speed multiplier 1.0.
pub const BASE_LOOP_SECS: f64 = 8.0;
pub const MIDDLE_ZONE: (f64, f64) = (0.4, 0.6);
const MAX_PROGRESS: f64 = 0.9999;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Samples the rail in logical space.
pub fn rail_path(kind: RailType, width: f64, height: f64) -> Vec<Point> {
    match kind {
        RailType::Straight => {
            let y = height / 2.0;
            let (x0, x1) = (PADDING, width - PADDING);
            (0..=100)
                .map(|i| {
                    let t = i as f64 / 100.0;
                    Point::new(x0 + (x1 - x0) * t, y)
                })
                .collect()
        }
        RailType::SCurve => {
            let (x0, x1) = (PADDING, width - PADDING);
            let cy = height / 2.0;
            let amplitude = height * 0.25;
            (0..=200)
                .map(|i| {
                    let t = i as f64 / 200.0;
                    // canvas y grows downward: starts below the centre line, ends above it
                    let s = sigmoid((t - 0.5) * 12.0);
                    Point::new(x0 + (x1 - x0) * t, cy + amplitude * (1.0 - 2.0 * s))
                })
                .collect()
        }
        RailType::Circle => {
            let (cx, cy) = (width / 2.0, height / 2.0);
            let radius = width.min(height) / 2.0 - PADDING;
            (0..=200)
                .map(|i| {
                    let t = i as f64 / 200.0;
                    let angle = t * std::f64::consts::TAU - std::f64::consts::FRAC_PI_2;
                    Point::new(cx + angle.cos() * radius, cy + angle.sin() * radius)
                })
                .collect()
        }
    }
}

/// Interpolated point at `progress` (0..1) along `path`.
pub fn point_at(path: &[Point], progress: f64) -> Option<Point> {
    if path.is_empty() {
        return None;
    }
    let p = progress.clamp(0.0, MAX_PROGRESS);
    let index = p * (path.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = (lower + 1).min(path.len() - 1);
    let frac = index - lower as f64;
    let (a, b) = (path[lower], path[upper]);
    Some(Point::new(a.x + (b.x - a.x) * frac, a.y + (b.y - a.y) * frac))
}

pub struct RailGame {
    rail_type: RailType,
    speed: Speed,
    guide: bool,
    dot_radius: f64,
    time_limit: Option<f64>,
    loop_secs: f64,
    max_laps: Option<u32>,

    path: Vec<Point>,
    progress: f64,
    dot: Point,
    elapsed: f64,
    checks: u32,
    successes: u32,
    laps: u32,

    running: bool,
    paused: bool,
    finished: bool,
}

impl RailGame {
    pub fn new(settings: &Settings) -> Self {
        let loop_secs = BASE_LOOP_SECS / settings.speed.multiplier();
        let time_limit = settings.time_limit.seconds();
        Self {
            rail_type: settings.rail_type,
            speed: settings.speed,
            guide: settings.guide,
            dot_radius: match settings.font_size {
                FontSize::Medium => 12.0,
                FontSize::Large => 18.0,
            },
            time_limit,
            loop_secs,
            max_laps: time_limit.map(|limit| (limit / loop_secs).ceil() as u32),
            path: Vec::new(),
            progress: 0.0,
            dot: Point::default(),
            elapsed: 0.0,
            checks: 0,
            successes: 0,
            laps: 0,
            running: false,
            paused: false,
            finished: false,
        }
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn laps(&self) -> u32 {
        self.laps
    }

    pub fn max_laps(&self) -> Option<u32> {
        self.max_laps
    }

    pub fn dot(&self) -> Point {
        self.dot
    }

    fn in_middle_zone(&self) -> bool {
        (MIDDLE_ZONE.0..=MIDDLE_ZONE.1).contains(&self.progress)
    }

    fn check(&mut self) {
        self.checks += 1;
        if self.in_middle_zone() {
            self.successes += 1;
        }
    }

    fn zone_indices(&self) -> (usize, usize) {
        let last = self.path.len().saturating_sub(1) as f64;
        (
            (MIDDLE_ZONE.0 * last).floor() as usize,
            (MIDDLE_ZONE.1 * last).floor() as usize,
        )
    }

    fn stroke_path(&self, ctx: &CanvasRenderingContext2d, from: usize, to: usize) {
        let Some(first) = self.path.get(from) else {
            return;
        };
        ctx.begin_path();
        ctx.move_to(first.x, first.y);
        for p in self.path.iter().take(to + 1).skip(from + 1) {
            ctx.line_to(p.x, p.y);
        }
        ctx.stroke();
    }
}

impl MiniGame for RailGame {
    fn id(&self) -> GameId {
        GameId::Rail
    }

    fn init(&mut self) {
        self.path = rail_path(self.rail_type, LOGICAL_WIDTH, LOGICAL_HEIGHT);
        self.progress = 0.0;
        self.dot = point_at(&self.path, 0.0).unwrap_or_default();
        self.elapsed = 0.0;
        self.checks = 0;
        self.successes = 0;
        self.laps = 0;
        self.finished = false;
    }

    fn start(&mut self) {
        self.running = true;
        self.paused = false;
    }

    fn update(&mut self, dt: f64) {
        if !self.running || self.paused || self.finished {
            return;
        }
        self.elapsed += dt;
        if self.time_limit.is_some_and(|limit| self.elapsed >= limit) {
            self.finished = true;
            return;
        }

        self.progress += dt / self.loop_secs;
        while self.progress >= 1.0 {
            self.progress -= 1.0;
            self.laps += 1;
            if self.rail_type != RailType::Circle
                && self.max_laps.is_some_and(|max| self.laps >= max)
            {
                self.finished = true;
                return;
            }
        }
        if let Some(p) = point_at(&self.path, self.progress) {
            self.dot = p;
        }
    }

    fn render(&self, ctx: &CanvasRenderingContext2d, palette: &Palette) {
        draw::background(ctx, palette.background);
        if self.path.len() < 2 {
            return;
        }

        ctx.set_stroke_style_str(palette.primary);
        ctx.set_line_width(6.0);
        ctx.set_line_cap("round");
        ctx.set_line_join("round");
        ctx.set_global_alpha(if self.guide { 0.4 } else { 0.25 });
        self.stroke_path(ctx, 0, self.path.len() - 1);

        if self.guide {
            let (from, to) = self.zone_indices();
            ctx.set_global_alpha(0.3);
            self.stroke_path(ctx, from, to);
        }
        ctx.set_global_alpha(1.0);

        draw::circle(ctx, self.dot.x, self.dot.y, self.dot_radius * 1.2);
        ctx.set_fill_style_str(palette.primary);
        ctx.fill();
        ctx.set_stroke_style_str(palette.background);
        ctx.set_line_width(3.0);
        ctx.stroke();
    }

    fn handle_input(&mut self, event: &InputEvent) {
        if !self.running || self.paused || self.finished {
            return;
        }
        if is_press(event) {
            self.check();
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
        GameResult {
            game: GameId::Rail,
            score: self.successes,
            accuracy: percent(self.successes, self.checks),
            elapsed_secs: self.elapsed.floor(),
            finished: self.finished,
            best_score: None,
            details: GameDetails::Rail {
                check_count: self.checks,
                success_count: self.successes,
                lap_count: self.laps,
                rail_type: self.rail_type,
                speed: self.speed,
            },
        }
    }

    fn hud(&self) -> HudInfo {
        HudInfo {
            score: self.successes,
            remaining_secs: self.time_limit.map(|l| (l - self.elapsed).max(0.0)),
            elapsed_secs: self.elapsed,
            round: None,
        }
    }

    fn take_cues(&mut self) -> Vec<Sound> {
        Vec::new()
    }

    fn destroy(&mut self) {
        self.running = false;
        self.paused = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::{InputKind, InputSource};
    use crate::engine::storage::TimeLimit;

    fn game(rail_type: RailType, speed: Speed, time_limit: TimeLimit) -> RailGame {
        let settings = Settings {
            rail_type,
            speed,
            time_limit,
            ..Settings::default()
        };
        let mut g = RailGame::new(&settings);
        g.init();
        g.start();
        g
    }

    fn press(g: &mut RailGame, kind: InputKind, source: InputSource) {
        g.handle_input(&InputEvent::new(kind, source, Point::default(), 0.0));
    }

    #[test]
    fn path_shapes() {
        let straight = rail_path(RailType::Straight, 800.0, 600.0);
        assert_eq!(straight.len(), 101);
        assert_eq!(straight[0], Point::new(60.0, 300.0));
        assert_eq!(straight[100], Point::new(740.0, 300.0));

        let s = rail_path(RailType::SCurve, 800.0, 600.0);
        assert_eq!(s.len(), 201);
        assert!(s[0].y > 300.0 && s[200].y < 300.0);
        assert!((s[0].y - 450.0).abs() < 1.0 && (s[200].y - 150.0).abs() < 1.0);
        assert!((s[100].y - 300.0).abs() < 1e-9);

        let c = rail_path(RailType::Circle, 800.0, 600.0);
        assert_eq!(c.len(), 201);
        // starts at the top, radius 240
        assert!((c[0].x - 400.0).abs() < 1e-9);
        assert!((c[0].y - 60.0).abs() < 1e-9);
    }

    #[test]
    fn dot_interpolates_between_samples() {
        let path = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(20.0, 0.0)];
        assert_eq!(point_at(&path, 0.25), Some(Point::new(5.0, 0.0)));
        let end = point_at(&path, 5.0).unwrap();
        assert!(end.x < 20.0);
        assert_eq!(point_at(&[], 0.5), None);
    }

    #[test]
    fn lap_limit_from_time_and_speed() {
        // medium speed: 16 s per lap, 60 s -> 4 laps
        assert_eq!(game(RailType::Straight, Speed::Medium, TimeLimit::Medium).max_laps(), Some(4));
        // fast: 8 s per lap, 30 s -> 4 laps
        assert_eq!(game(RailType::Straight, Speed::Fast, TimeLimit::Short).max_laps(), Some(4));
        assert_eq!(game(RailType::Straight, Speed::Slow, TimeLimit::Unlimited).max_laps(), None);
    }

    #[test]
    fn large_steps_count_every_lap() {
        let mut g = game(RailType::Circle, Speed::Fast, TimeLimit::Unlimited);
        // 8 s per lap; three and a half laps in few big steps
        for _ in 0..4 {
            g.update(7.0);
        }
        assert_eq!(g.laps(), 3);
        assert!((g.progress() - 0.5).abs() < 1e-9);
        assert!(!g.is_finished());
    }

    #[test]
    fn straight_rail_stops_when_time_runs_out() {
        // 8 s laps inside a 30 s limit: the clock ends it during the fourth lap
        let mut g = game(RailType::Straight, Speed::Fast, TimeLimit::Short);
        let mut steps = 0;
        while !g.is_finished() && steps < 1000 {
            g.update(0.1);
            steps += 1;
        }
        assert!(g.is_finished());
        assert_eq!(g.laps(), 3);
        assert!(g.result().finished);
    }

    #[test]
    fn time_limit_ends_circle_rail() {
        let mut g = game(RailType::Circle, Speed::Fast, TimeLimit::Short);
        for _ in 0..299 {
            g.update(0.1);
        }
        assert!(!g.is_finished());
        g.update(0.1);
        g.update(0.1);
        assert!(g.is_finished());
        assert_eq!(g.hud().remaining_secs, Some(0.0));
    }

    #[test]
    fn presses_score_only_in_middle_zone() {
        let mut g = game(RailType::Straight, Speed::Fast, TimeLimit::Unlimited);
        // progress 0.1
        g.update(0.8);
        press(&mut g, InputKind::PointerDown, InputSource::Mouse);
        // progress 0.5
        for _ in 0..4 {
            g.update(0.8);
        }
        press(&mut g, InputKind::PointerDown, InputSource::Touch);
        press(&mut g, InputKind::Action, InputSource::Keyboard);
        // click/tap follow-up actions are not extra presses
        press(&mut g, InputKind::Action, InputSource::Mouse);
        press(&mut g, InputKind::Action, InputSource::Touch);

        let r = g.result();
        assert_eq!(r.score, 2);
        assert_eq!(r.accuracy, 67);
        match r.details {
            GameDetails::Rail { check_count, success_count, .. } => {
                assert_eq!((check_count, success_count), (3, 2));
            }
            other => panic!("unexpected details {:?}", other),
        }
    }

    #[test]
    fn paused_game_ignores_time_and_input() {
        let mut g = game(RailType::Straight, Speed::Fast, TimeLimit::Short);
        g.pause();
        g.update(1.0);
        press(&mut g, InputKind::PointerDown, InputSource::Mouse);
        assert_eq!(g.hud().elapsed_secs, 0.0);
        assert_eq!(g.result().accuracy, 0);
        g.resume();
        g.update(1.0);
        assert_eq!(g.hud().elapsed_secs, 1.0);
    }
}
