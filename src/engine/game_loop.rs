//! Animation-frame driven game loop.
//!
//! [`LoopClock`] holds all of the timing rules so they can be checked without
//! a browser; [`GameLoop`] only feeds it `requestAnimationFrame` timestamps.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

use crate::error::{AppError, Result};

pub const DEFAULT_FPS: f64 = 30.0;
/// Upper bound on a single step, so a backgrounded tab does not jump ahead.
pub const MAX_DELTA_SECS: f64 = 0.1;
const FPS_SAMPLE_MS: f64 = 1000.0;

/// What the driver should do for one animation frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Frame {
    /// Too early (or the very first frame): do nothing.
    Skip,
    /// Render, and update with `Some(dt)` unless paused.
    Run { update: Option<f64> },
}

#[derive(Clone, Debug)]
pub struct LoopClock {
    target_fps: f64,
    frame_interval_ms: f64,
    last_frame_ms: Option<f64>,
    elapsed_secs: f64,
    frame_count: u64,
    paused: bool,
    last_fps_sample_ms: f64,
    frames_since_sample: u32,
    current_fps: u32,
}

impl Default for LoopClock {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

impl LoopClock {
    pub fn new(target_fps: f64) -> Self {
        let fps = if target_fps > 0.0 { target_fps } else { DEFAULT_FPS };
        Self {
            target_fps: fps,
            frame_interval_ms: 1000.0 / fps,
            last_frame_ms: None,
            elapsed_secs: 0.0,
            frame_count: 0,
            paused: false,
            last_fps_sample_ms: 0.0,
            frames_since_sample: 0,
            current_fps: 0,
        }
    }

    /// Clears timing so the next frame is treated as the first.
    pub fn reset(&mut self) {
        self.last_frame_ms = None;
        self.elapsed_secs = 0.0;
        self.frame_count = 0;
        self.paused = false;
        self.frames_since_sample = 0;
        self.current_fps = 0;
    }

    pub fn tick(&mut self, timestamp_ms: f64) -> Frame {
        let Some(last) = self.last_frame_ms else {
            self.last_frame_ms = Some(timestamp_ms);
            self.last_fps_sample_ms = timestamp_ms;
            return Frame::Skip;
        };
        let since_last = timestamp_ms - last;
        if since_last < self.frame_interval_ms {
            return Frame::Skip;
        }
        let dt = (since_last / 1000.0).min(MAX_DELTA_SECS);
        self.last_frame_ms = Some(timestamp_ms);
        self.frame_count += 1;

        self.frames_since_sample += 1;
        let sample_span = timestamp_ms - self.last_fps_sample_ms;
        if sample_span >= FPS_SAMPLE_MS {
            self.current_fps = (self.frames_since_sample as f64 * 1000.0 / sample_span).round() as u32;
            self.last_fps_sample_ms = timestamp_ms;
            self.frames_since_sample = 0;
        }

        if self.paused {
            Frame::Run { update: None }
        } else {
            self.elapsed_secs += dt;
            Frame::Run { update: Some(dt) }
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_target_fps(&mut self, fps: f64) {
        if fps > 0.0 {
            self.target_fps = fps;
            self.frame_interval_ms = 1000.0 / fps;
        }
    }

    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    pub fn fps(&self) -> u32 {
        self.current_fps
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

type FrameCallback = Closure<dyn FnMut(f64)>;

/// Drives a [`LoopClock`] from `requestAnimationFrame`.
pub struct GameLoop {
    clock: Rc<RefCell<LoopClock>>,
    raf_id: Rc<RefCell<Option<i32>>>,
    frame_cb: Rc<RefCell<Option<FrameCallback>>>,
    running: Rc<RefCell<bool>>,
}

impl GameLoop {
    pub fn new(target_fps: f64) -> Self {
        Self {
            clock: Rc::new(RefCell::new(LoopClock::new(target_fps))),
            raf_id: Rc::new(RefCell::new(None)),
            frame_cb: Rc::new(RefCell::new(None)),
            running: Rc::new(RefCell::new(false)),
        }
    }

    /// Starts requesting frames. `update` receives the clamped delta in
    /// seconds and is skipped while paused; `render` runs on every frame.
    pub fn start(
        &self,
        mut update: impl FnMut(f64) + 'static,
        mut render: impl FnMut() + 'static,
    ) -> Result<()> {
        if *self.running.borrow() {
            return Ok(());
        }
        let window = web_sys::window().ok_or(AppError::Missing("window"))?;
        self.clock.borrow_mut().reset();
        *self.running.borrow_mut() = true;

        let clock = self.clock.clone();
        let raf_id = self.raf_id.clone();
        let running = self.running.clone();
        let frame_cb = self.frame_cb.clone();
        let window_loop = window.clone();
        *self.frame_cb.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
            if !*running.borrow() {
                return;
            }
            if let Some(cb) = frame_cb.borrow().as_ref() {
                if let Ok(id) = window_loop.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    *raf_id.borrow_mut() = Some(id);
                }
            }
            let frame = clock.borrow_mut().tick(timestamp);
            if let Frame::Run { update: step } = frame {
                if let Some(dt) = step {
                    update(dt);
                }
                render();
            }
        }) as Box<dyn FnMut(f64)>));

        if let Some(cb) = self.frame_cb.borrow().as_ref() {
            let id = window.request_animation_frame(cb.as_ref().unchecked_ref())?;
            *self.raf_id.borrow_mut() = Some(id);
        }
        Ok(())
    }

    /// Cancels the pending frame. The frame closure is released as well, so
    /// this must not be called from inside `update` or `render`.
    pub fn stop(&self) {
        *self.running.borrow_mut() = false;
        if let Some(id) = self.raf_id.borrow_mut().take() {
            if let Some(win) = web_sys::window() {
                let _ = win.cancel_animation_frame(id);
            }
        }
        self.frame_cb.borrow_mut().take();
    }

    pub fn pause(&self) {
        self.clock.borrow_mut().pause();
    }

    pub fn resume(&self) {
        self.clock.borrow_mut().resume();
    }

    pub fn toggle_pause(&self) {
        self.clock.borrow_mut().toggle_pause();
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.clock.borrow().is_paused()
    }

    pub fn set_target_fps(&self, fps: f64) {
        self.clock.borrow_mut().set_target_fps(fps);
    }

    pub fn fps(&self) -> u32 {
        self.clock.borrow().fps()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.clock.borrow().elapsed_secs()
    }

    pub fn frame_count(&self) -> u64 {
        self.clock.borrow().frame_count()
    }
}

impl Drop for GameLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_only_primes_the_clock() {
        let mut clock = LoopClock::new(30.0);
        assert_eq!(clock.tick(500.0), Frame::Skip);
        assert_eq!(clock.frame_count(), 0);
        assert_eq!(clock.elapsed_secs(), 0.0);
    }

    #[test]
    fn frames_inside_the_interval_are_skipped() {
        let mut clock = LoopClock::new(30.0);
        clock.tick(0.0);
        assert_eq!(clock.tick(16.0), Frame::Skip);
        match clock.tick(34.0) {
            Frame::Run { update: Some(dt) } => assert!((dt - 0.034).abs() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn delta_is_clamped_after_a_long_gap() {
        let mut clock = LoopClock::new(30.0);
        clock.tick(0.0);
        assert_eq!(clock.tick(5_000.0), Frame::Run { update: Some(MAX_DELTA_SECS) });
        assert!((clock.elapsed_secs() - MAX_DELTA_SECS).abs() < 1e-9);
    }

    #[test]
    fn elapsed_does_not_advance_while_paused() {
        let mut clock = LoopClock::new(30.0);
        clock.tick(0.0);
        clock.tick(40.0);
        let before = clock.elapsed_secs();

        clock.pause();
        let mut t = 40.0;
        for _ in 0..100 {
            t += 40.0;
            // render still runs, update does not
            assert_eq!(clock.tick(t), Frame::Run { update: None });
        }
        assert_eq!(clock.elapsed_secs(), before);

        clock.resume();
        t += 40.0;
        assert!(matches!(clock.tick(t), Frame::Run { update: Some(_) }));
        assert!(clock.elapsed_secs() > before);
    }

    #[test]
    fn fps_is_sampled_once_per_second() {
        let mut clock = LoopClock::new(30.0);
        clock.tick(0.0);
        let mut t = 0.0;
        for _ in 0..30 {
            t += 1000.0 / 30.0 + 0.01;
            clock.tick(t);
        }
        assert!((29..=31).contains(&clock.fps()), "fps {}", clock.fps());
    }

    #[test]
    fn reset_and_target_fps() {
        let mut clock = LoopClock::new(30.0);
        clock.tick(0.0);
        clock.tick(100.0);
        clock.pause();
        clock.reset();
        assert_eq!(clock.elapsed_secs(), 0.0);
        assert!(!clock.is_paused());

        clock.set_target_fps(60.0);
        clock.set_target_fps(0.0);
        assert_eq!(clock.target_fps(), 60.0);
        clock.tick(0.0);
        assert!(matches!(clock.tick(17.0), Frame::Run { .. }));
    }
}
