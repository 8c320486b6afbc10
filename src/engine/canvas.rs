//! DPR-aware mapping between the 800×600 design space and the real canvas.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::error::{AppError, Result};

pub const LOGICAL_WIDTH: f64 = 800.0;
pub const LOGICAL_HEIGHT: f64 = 600.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Result of fitting the logical area into a container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// CSS size of the canvas element.
    pub display_width: f64,
    pub display_height: f64,
    /// Backing store size in device pixels.
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub dpr: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            display_width: LOGICAL_WIDTH,
            display_height: LOGICAL_HEIGHT,
            pixel_width: LOGICAL_WIDTH as u32,
            pixel_height: LOGICAL_HEIGHT as u32,
            dpr: 1.0,
        }
    }
}

impl Viewport {
    pub fn fit(
        container_width: f64,
        container_height: f64,
        logical_width: f64,
        logical_height: f64,
        dpr: f64,
        maintain_aspect: bool,
    ) -> Self {
        let dpr = if dpr > 0.0 { dpr } else { 1.0 };
        if maintain_aspect {
            let aspect = logical_width / logical_height;
            let container_aspect = if container_height > 0.0 {
                container_width / container_height
            } else {
                f64::INFINITY
            };
            let (display_width, display_height) = if container_aspect > aspect {
                (container_height * aspect, container_height)
            } else {
                (container_width, container_width / aspect)
            };
            Self {
                scale: display_width / logical_width,
                offset_x: (container_width - display_width) / 2.0,
                offset_y: (container_height - display_height) / 2.0,
                display_width,
                display_height,
                pixel_width: (display_width * dpr).round().max(0.0) as u32,
                pixel_height: (display_height * dpr).round().max(0.0) as u32,
                dpr,
            }
        } else {
            Self {
                scale: (container_width / logical_width).min(container_height / logical_height),
                offset_x: 0.0,
                offset_y: 0.0,
                display_width: container_width,
                display_height: container_height,
                pixel_width: (container_width * dpr).round().max(0.0) as u32,
                pixel_height: (container_height * dpr).round().max(0.0) as u32,
                dpr,
            }
        }
    }

    pub fn real_to_logical(&self, real_x: f64, real_y: f64) -> Point {
        if self.scale <= 0.0 {
            return Point::default();
        }
        Point::new(
            (real_x - self.offset_x) / self.scale,
            (real_y - self.offset_y) / self.scale,
        )
    }

    pub fn logical_to_real(&self, logical_x: f64, logical_y: f64) -> Point {
        Point::new(
            logical_x * self.scale + self.offset_x,
            logical_y * self.scale + self.offset_y,
        )
    }

    /// Position relative to the canvas' own top-left corner, in logical units.
    pub fn canvas_relative(&self, x: f64, y: f64) -> Point {
        // a hidden container has no size
        if self.scale <= 0.0 {
            return Point::default();
        }
        Point::new(x / self.scale, y / self.scale)
    }
}

struct Surface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    logical_width: f64,
    logical_height: f64,
    maintain_aspect: bool,
    viewport: RefCell<Viewport>,
}

impl Surface {
    fn resize(&self) {
        let window = match web_sys::window() {
            Some(w) => w,
            None => return,
        };
        let dpr = window.device_pixel_ratio();
        let (cw, ch) = match self.canvas.parent_element() {
            Some(parent) => (parent.client_width() as f64, parent.client_height() as f64),
            None => (
                window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(LOGICAL_WIDTH),
                window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(LOGICAL_HEIGHT),
            ),
        };
        let vp = Viewport::fit(
            cw,
            ch,
            self.logical_width,
            self.logical_height,
            dpr,
            self.maintain_aspect,
        );

        let style = self.canvas.style();
        let _ = style.set_property("width", &format!("{}px", vp.display_width));
        let _ = style.set_property("height", &format!("{}px", vp.display_height));
        if self.maintain_aspect {
            let _ = style.set_property("margin-left", &format!("{}px", vp.offset_x));
            let _ = style.set_property("margin-top", &format!("{}px", vp.offset_y));
        }
        self.canvas.set_width(vp.pixel_width);
        self.canvas.set_height(vp.pixel_height);
        let k = vp.scale * vp.dpr;
        let _ = self.ctx.set_transform(k, 0.0, 0.0, k, 0.0, 0.0);

        *self.viewport.borrow_mut() = vp;
    }
}

pub struct CanvasScaling {
    surface: Rc<Surface>,
    resize_cb: Option<Closure<dyn FnMut(web_sys::Event)>>,
}

impl CanvasScaling {
    pub fn new(canvas: HtmlCanvasElement, maintain_aspect: bool) -> Result<Self> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or(AppError::Missing("2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| AppError::Missing("2d context"))?;
        let surface = Rc::new(Surface {
            canvas,
            ctx,
            logical_width: LOGICAL_WIDTH,
            logical_height: LOGICAL_HEIGHT,
            maintain_aspect,
            viewport: RefCell::new(Viewport::default()),
        });
        surface.resize();

        let window = web_sys::window().ok_or(AppError::Missing("window"))?;
        let resize_cb = {
            let surface = surface.clone();
            Closure::wrap(Box::new(move |_e: web_sys::Event| {
                surface.resize();
            }) as Box<dyn FnMut(_)>)
        };
        window.add_event_listener_with_callback("resize", resize_cb.as_ref().unchecked_ref())?;

        Ok(Self {
            surface,
            resize_cb: Some(resize_cb),
        })
    }

    pub fn resize(&self) {
        self.surface.resize();
    }

    pub fn viewport(&self) -> Viewport {
        *self.surface.viewport.borrow()
    }

    pub fn context(&self) -> &CanvasRenderingContext2d {
        &self.surface.ctx
    }

    pub fn logical_size(&self) -> (f64, f64) {
        (self.surface.logical_width, self.surface.logical_height)
    }

    pub fn real_to_logical(&self, x: f64, y: f64) -> Point {
        self.viewport().real_to_logical(x, y)
    }

    pub fn logical_to_real(&self, x: f64, y: f64) -> Point {
        self.viewport().logical_to_real(x, y)
    }

    /// Maps client coordinates of a mouse or touch point into logical space.
    pub fn logical_position(&self, client_x: f64, client_y: f64) -> Point {
        let rect = self.surface.canvas.get_bounding_client_rect();
        self.viewport()
            .canvas_relative(client_x - rect.left(), client_y - rect.top())
    }

    /// Clears the whole backing store, filling it with `color` when given.
    pub fn clear(&self, color: Option<&str>) {
        let ctx = &self.surface.ctx;
        let w = self.surface.canvas.width() as f64;
        let h = self.surface.canvas.height() as f64;
        ctx.save();
        let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        match color {
            Some(c) => {
                ctx.set_fill_style_str(c);
                ctx.fill_rect(0.0, 0.0, w, h);
            }
            None => ctx.clear_rect(0.0, 0.0, w, h),
        }
        ctx.restore();
    }

    pub fn destroy(&mut self) {
        if let Some(cb) = self.resize_cb.take() {
            if let Some(window) = web_sys::window() {
                let _ = window
                    .remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
            }
        }
    }
}

impl Drop for CanvasScaling {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn wide_container_is_pillarboxed() {
        let vp = Viewport::fit(1600.0, 600.0, LOGICAL_WIDTH, LOGICAL_HEIGHT, 1.0, true);
        assert!(close(vp.scale, 1.0));
        assert!(close(vp.display_width, 800.0));
        assert!(close(vp.offset_x, 400.0));
        assert!(close(vp.offset_y, 0.0));
    }

    #[test]
    fn tall_container_is_letterboxed() {
        let vp = Viewport::fit(400.0, 900.0, LOGICAL_WIDTH, LOGICAL_HEIGHT, 1.0, true);
        assert!(close(vp.scale, 0.5));
        assert!(close(vp.display_height, 300.0));
        assert!(close(vp.offset_y, 300.0));
        assert!(close(vp.offset_x, 0.0));
    }

    #[test]
    fn backing_store_follows_device_pixel_ratio() {
        let vp = Viewport::fit(1000.0, 750.0, LOGICAL_WIDTH, LOGICAL_HEIGHT, 2.0, true);
        assert_eq!(vp.pixel_width, 2000);
        assert_eq!(vp.pixel_height, 1500);
        assert!(close(vp.scale, 1.25));
    }

    #[test]
    fn fill_mode_uses_the_smaller_axis_scale() {
        let vp = Viewport::fit(1600.0, 600.0, LOGICAL_WIDTH, LOGICAL_HEIGHT, 1.0, false);
        assert!(close(vp.scale, 1.0));
        assert_eq!((vp.offset_x, vp.offset_y), (0.0, 0.0));
        assert!(close(vp.display_width, 1600.0));
    }

    #[test]
    fn zero_size_container_maps_to_origin() {
        let v = Viewport::fit(0.0, 0.0, 800.0, 600.0, 2.0, true);
        assert_eq!(v.scale, 0.0);
        assert_eq!(v.canvas_relative(120.0, 40.0), Point::default());
        assert_eq!(v.real_to_logical(120.0, 40.0), Point::default());
    }

    #[test]
    fn coordinate_mapping_is_consistent() {
        let vp = Viewport::fit(1600.0, 600.0, LOGICAL_WIDTH, LOGICAL_HEIGHT, 1.0, true);
        let real = vp.logical_to_real(100.0, 50.0);
        assert_eq!(real, Point::new(500.0, 50.0));
        let back = vp.real_to_logical(real.x, real.y);
        assert_eq!(back, Point::new(100.0, 50.0));

        let half = Viewport::fit(400.0, 300.0, LOGICAL_WIDTH, LOGICAL_HEIGHT, 1.0, true);
        assert_eq!(half.canvas_relative(200.0, 150.0), Point::new(400.0, 300.0));
    }
}
