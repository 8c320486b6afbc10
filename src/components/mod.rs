pub mod app;
pub mod error_banner;
pub mod help_screen;
pub mod home_screen;
pub mod hud;
pub mod play_view;
pub mod result_screen;
pub mod settings_screen;

use log::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{Event, EventTarget, KeyboardEvent};

use crate::error::{AppError, Result};

/// A DOM listener that is removed again when dropped.
pub struct DomListener {
    target: EventTarget,
    name: &'static str,
    cb: Closure<dyn FnMut(Event)>,
}

impl DomListener {
    pub fn new(
        target: &EventTarget,
        name: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self> {
        let cb = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(name, cb.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            name,
            cb,
        })
    }

    /// `keydown` on the document.
    pub fn keydown(mut handler: impl FnMut(&KeyboardEvent) + 'static) -> Result<Self> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or(AppError::Missing("document"))?;
        Self::new(&document, "keydown", move |e: Event| {
            if let Some(key) = e.dyn_ref::<KeyboardEvent>() {
                handler(key);
            }
        })
    }
}

impl Drop for DomListener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.name, self.cb.as_ref().unchecked_ref());
    }
}

/// Keeps a listener alive for the lifetime of an effect, logging when the
/// browser refused it.
pub(crate) fn keep(listener: Result<DomListener>) -> Option<DomListener> {
    listener.map_err(|e| warn!("listener not attached: {}", e)).ok()
}

/// Runs `f` on a fresh task, after the current callback has returned.
pub fn defer(f: impl FnOnce() + 'static) {
    defer_by(0, f);
}

/// Runs `f` after `delay_ms` milliseconds.
pub fn defer_by(delay_ms: i32, f: impl FnOnce() + 'static) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let cb = Closure::once_into_js(f);
    if let Err(e) =
        window.set_timeout_with_callback_and_timeout_and_arguments_0(cb.unchecked_ref(), delay_ms)
    {
        warn!("could not schedule task: {}", AppError::from(e));
    }
}
