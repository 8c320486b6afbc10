// Canvas path helpers shared by the games. All coordinates are logical.

use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use crate::engine::{LOGICAL_HEIGHT, LOGICAL_WIDTH};

/// Fills the whole logical area.
pub fn background(ctx: &CanvasRenderingContext2d, color: &str) {
    ctx.clear_rect(0.0, 0.0, LOGICAL_WIDTH, LOGICAL_HEIGHT);
    ctx.set_fill_style_str(color);
    ctx.fill_rect(0.0, 0.0, LOGICAL_WIDTH, LOGICAL_HEIGHT);
}

pub fn circle(ctx: &CanvasRenderingContext2d, x: f64, y: f64, radius: f64) {
    ctx.begin_path();
    let _ = ctx.arc(x, y, radius.max(0.0), 0.0, PI * 2.0);
    ctx.close_path();
}

pub fn round_rect(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) {
    ctx.begin_path();
    ctx.move_to(x + r, y);
    ctx.line_to(x + w - r, y);
    ctx.quadratic_curve_to(x + w, y, x + w, y + r);
    ctx.line_to(x + w, y + h - r);
    ctx.quadratic_curve_to(x + w, y + h, x + w - r, y + h);
    ctx.line_to(x + r, y + h);
    ctx.quadratic_curve_to(x, y + h, x, y + h - r);
    ctx.line_to(x, y + r);
    ctx.quadratic_curve_to(x, y, x + r, y);
    ctx.close_path();
}

pub fn text_center(ctx: &CanvasRenderingContext2d, text: &str, x: f64, y: f64, font: &str, color: &str) {
    ctx.set_font(font);
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_fill_style_str(color);
    let _ = ctx.fill_text(text, x, y);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Circle,
    Square,
    Triangle,
    Diamond,
    Star,
}

impl Shape {
    pub const ALL: [Shape; 5] = [
        Shape::Circle,
        Shape::Square,
        Shape::Triangle,
        Shape::Diamond,
        Shape::Star,
    ];

    /// Builds the outline as the current path.
    pub fn path(self, ctx: &CanvasRenderingContext2d, x: f64, y: f64, r: f64) {
        match self {
            Shape::Circle => circle(ctx, x, y, r),
            Shape::Square => {
                let s = r * 0.85;
                ctx.begin_path();
                ctx.rect(x - s, y - s, s * 2.0, s * 2.0);
            }
            Shape::Triangle => {
                ctx.begin_path();
                ctx.move_to(x, y - r);
                ctx.line_to(x + r * 0.87, y + r * 0.5);
                ctx.line_to(x - r * 0.87, y + r * 0.5);
                ctx.close_path();
            }
            Shape::Diamond => {
                ctx.begin_path();
                ctx.move_to(x, y - r);
                ctx.line_to(x + r, y);
                ctx.line_to(x, y + r);
                ctx.line_to(x - r, y);
                ctx.close_path();
            }
            Shape::Star => {
                ctx.begin_path();
                for i in 0..10 {
                    let radius = if i % 2 == 0 { r } else { r * 0.45 };
                    let a = i as f64 * PI / 5.0 - PI / 2.0;
                    let (px, py) = (x + a.cos() * radius, y + a.sin() * radius);
                    if i == 0 {
                        ctx.move_to(px, py);
                    } else {
                        ctx.line_to(px, py);
                    }
                }
                ctx.close_path();
            }
        }
    }
}
