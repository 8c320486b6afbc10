//! Mouse, touch and keyboard events folded into one small vocabulary.
//!
//! [`InputState`] turns raw DOM facts into [`InputEvent`]s and is plain data;
//! [`InputRouter`] owns the DOM listeners and fans events out to callbacks.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{
    AddEventListenerOptions, Event, HtmlElement, KeyboardEvent, MouseEvent, TouchEvent, Window,
};

use super::canvas::Point;
use crate::error::{AppError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Space, click or tap.
    Action,
    Retry,
    Escape,
    Pointer,
    PointerDown,
    PointerUp,
    KeyDown,
    KeyUp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputSource {
    Mouse,
    Touch,
    Keyboard,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyInfo {
    pub key: String,
    pub code: String,
    pub modifiers: Modifiers,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub source: InputSource,
    pub timestamp_ms: f64,
    /// Last known pointer position in logical coordinates.
    pub position: Point,
    pub button: Option<i16>,
    pub key: Option<KeyInfo>,
}

impl InputEvent {
    pub fn new(kind: InputKind, source: InputSource, position: Point, timestamp_ms: f64) -> Self {
        Self {
            kind,
            source,
            timestamp_ms,
            position,
            button: None,
            key: None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.key.as_ref().map(|k| k.code.as_str())
    }
}

/// Outcome of a keydown: the events to emit and whether the browser default
/// should be suppressed.
#[derive(Debug, Default)]
pub struct KeyOutcome {
    pub events: Vec<InputEvent>,
    pub prevent_default: bool,
}

#[derive(Debug, Default)]
pub struct InputState {
    pointer: Point,
    pointer_down: bool,
    pressed: HashSet<String>,
}

impl InputState {
    fn event(&self, kind: InputKind, source: InputSource, t: f64) -> InputEvent {
        InputEvent::new(kind, source, self.pointer, t)
    }

    pub fn pointer_position(&self) -> Point {
        self.pointer
    }

    pub fn is_pointer_down(&self) -> bool {
        self.pointer_down
    }

    pub fn is_key_pressed(&self, code: &str) -> bool {
        self.pressed.contains(code)
    }

    pub fn mouse_move(&mut self, pos: Point, t: f64) -> InputEvent {
        self.pointer = pos;
        self.event(InputKind::Pointer, InputSource::Mouse, t)
    }

    pub fn mouse_down(&mut self, pos: Point, button: i16, t: f64) -> InputEvent {
        self.pointer_down = true;
        self.pointer = pos;
        let mut ev = self.event(InputKind::PointerDown, InputSource::Mouse, t);
        ev.button = Some(button);
        ev
    }

    pub fn mouse_up(&mut self, pos: Point, button: i16, t: f64) -> InputEvent {
        self.pointer_down = false;
        self.pointer = pos;
        let mut ev = self.event(InputKind::PointerUp, InputSource::Mouse, t);
        ev.button = Some(button);
        ev
    }

    pub fn click(&mut self, pos: Point, t: f64) -> InputEvent {
        self.pointer = pos;
        self.event(InputKind::Action, InputSource::Mouse, t)
    }

    /// `first_touch` is `None` when the touch list was empty.
    pub fn touch_start(&mut self, first_touch: Option<Point>, t: f64) -> Option<InputEvent> {
        let pos = first_touch?;
        self.pointer_down = true;
        self.pointer = pos;
        Some(self.event(InputKind::PointerDown, InputSource::Touch, t))
    }

    pub fn touch_move(&mut self, first_touch: Option<Point>, t: f64) -> Option<InputEvent> {
        let pos = first_touch?;
        self.pointer = pos;
        Some(self.event(InputKind::Pointer, InputSource::Touch, t))
    }

    pub fn touch_end(&mut self, t: f64) -> [InputEvent; 2] {
        self.pointer_down = false;
        [
            self.event(InputKind::PointerUp, InputSource::Touch, t),
            self.event(InputKind::Action, InputSource::Touch, t),
        ]
    }

    pub fn key_down(&mut self, key: &str, code: &str, modifiers: Modifiers, t: f64) -> KeyOutcome {
        if !self.pressed.insert(code.to_string()) {
            return KeyOutcome::default();
        }
        let info = KeyInfo {
            key: key.to_string(),
            code: code.to_string(),
            modifiers,
        };
        let mut out = KeyOutcome::default();
        let mut down = self.event(InputKind::KeyDown, InputSource::Keyboard, t);
        down.key = Some(info.clone());
        out.events.push(down);

        let special = match code {
            "Space" => {
                out.prevent_default = true;
                Some(InputKind::Action)
            }
            "KeyR" => Some(InputKind::Retry),
            "Escape" => Some(InputKind::Escape),
            _ => None,
        };
        if let Some(kind) = special {
            let mut ev = self.event(kind, InputSource::Keyboard, t);
            ev.key = Some(info);
            out.events.push(ev);
        }
        out
    }

    pub fn key_up(&mut self, key: &str, code: &str, t: f64) -> InputEvent {
        self.pressed.remove(code);
        let mut ev = self.event(InputKind::KeyUp, InputSource::Keyboard, t);
        ev.key = Some(KeyInfo {
            key: key.to_string(),
            code: code.to_string(),
            modifiers: Modifiers::default(),
        });
        ev
    }

    pub fn clear(&mut self) {
        self.pressed.clear();
        self.pointer_down = false;
    }
}

pub type ListenerId = u32;
type Listener = Rc<dyn Fn(&InputEvent)>;

/// Per-kind callback registry.
#[derive(Default)]
pub struct Listeners {
    entries: Vec<(ListenerId, InputKind, Listener)>,
    next_id: ListenerId,
}

impl Listeners {
    pub fn on(&mut self, kind: InputKind, callback: impl Fn(&InputEvent) + 'static) -> ListenerId {
        self.next_id += 1;
        self.entries.push((self.next_id, kind, Rc::new(callback)));
        self.next_id
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(eid, _, _)| *eid != id);
        self.entries.len() != before
    }

    /// Callbacks registered for `kind`, in registration order.
    fn matching(&self, kind: InputKind) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, cb)| cb.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
struct RouterShared {
    state: InputState,
    listeners: Listeners,
}

/// Calls listeners without holding the borrow, so they may call back into the router.
fn emit(shared: &Rc<RefCell<RouterShared>>, events: impl IntoIterator<Item = InputEvent>) {
    for ev in events {
        let callbacks = shared.borrow().listeners.matching(ev.kind);
        for cb in callbacks {
            cb(&ev);
        }
    }
}

type LogicalMapper = Rc<dyn Fn(f64, f64) -> Point>;

struct Attached {
    element: HtmlElement,
    document: web_sys::Document,
    window: Window,
    blur: Closure<dyn FnMut(Event)>,
    mouse: Vec<(&'static str, Closure<dyn FnMut(MouseEvent)>)>,
    touch: Vec<(&'static str, Closure<dyn FnMut(TouchEvent)>)>,
    keys: Vec<(&'static str, Closure<dyn FnMut(KeyboardEvent)>)>,
}

pub struct InputRouter {
    shared: Rc<RefCell<RouterShared>>,
    attached: Option<Attached>,
}

impl InputRouter {
    /// Starts listening on `element` (pointer) and the document (keys).
    /// `to_logical` maps client coordinates to logical ones.
    pub fn attach(
        element: HtmlElement,
        to_logical: impl Fn(f64, f64) -> Point + 'static,
    ) -> Result<Self> {
        let window = web_sys::window().ok_or(AppError::Missing("window"))?;
        let document = window.document().ok_or(AppError::Missing("document"))?;
        let shared = Rc::new(RefCell::new(RouterShared::default()));
        let to_logical: LogicalMapper = Rc::new(to_logical);

        let mouse_cb = |handler: fn(&mut InputState, Point, i16, f64) -> InputEvent| {
            let shared = shared.clone();
            let to_logical = to_logical.clone();
            Closure::wrap(Box::new(move |e: MouseEvent| {
                let pos = to_logical(e.client_x() as f64, e.client_y() as f64);
                let ev = handler(&mut shared.borrow_mut().state, pos, e.button(), e.time_stamp());
                emit(&shared, [ev]);
            }) as Box<dyn FnMut(MouseEvent)>)
        };
        let mouse = vec![
            ("mousemove", mouse_cb(|s, p, _, t| s.mouse_move(p, t))),
            ("mousedown", mouse_cb(|s, p, b, t| s.mouse_down(p, b, t))),
            ("mouseup", mouse_cb(|s, p, b, t| s.mouse_up(p, b, t))),
            ("click", mouse_cb(|s, p, _, t| s.click(p, t))),
        ];

        let first_touch = {
            let to_logical = to_logical.clone();
            move |e: &TouchEvent| {
                e.touches()
                    .item(0)
                    .map(|t| to_logical(t.client_x() as f64, t.client_y() as f64))
            }
        };
        let touch = vec![
            ("touchstart", {
                let shared = shared.clone();
                let first_touch = first_touch.clone();
                Closure::wrap(Box::new(move |e: TouchEvent| {
                    e.prevent_default();
                    let ev = shared.borrow_mut().state.touch_start(first_touch(&e), e.time_stamp());
                    emit(&shared, ev);
                }) as Box<dyn FnMut(TouchEvent)>)
            }),
            ("touchmove", {
                let shared = shared.clone();
                let first_touch = first_touch.clone();
                Closure::wrap(Box::new(move |e: TouchEvent| {
                    e.prevent_default();
                    let ev = shared.borrow_mut().state.touch_move(first_touch(&e), e.time_stamp());
                    emit(&shared, ev);
                }) as Box<dyn FnMut(TouchEvent)>)
            }),
            ("touchend", {
                let shared = shared.clone();
                Closure::wrap(Box::new(move |e: TouchEvent| {
                    let evs = shared.borrow_mut().state.touch_end(e.time_stamp());
                    emit(&shared, evs);
                }) as Box<dyn FnMut(TouchEvent)>)
            }),
        ];

        let keys = vec![
            ("keydown", {
                let shared = shared.clone();
                Closure::wrap(Box::new(move |e: KeyboardEvent| {
                    let mods = Modifiers {
                        ctrl: e.ctrl_key(),
                        shift: e.shift_key(),
                        alt: e.alt_key(),
                    };
                    let out = shared
                        .borrow_mut()
                        .state
                        .key_down(&e.key(), &e.code(), mods, e.time_stamp());
                    if out.prevent_default {
                        e.prevent_default();
                    }
                    emit(&shared, out.events);
                }) as Box<dyn FnMut(KeyboardEvent)>)
            }),
            ("keyup", {
                let shared = shared.clone();
                Closure::wrap(Box::new(move |e: KeyboardEvent| {
                    let ev = shared.borrow_mut().state.key_up(&e.key(), &e.code(), e.time_stamp());
                    emit(&shared, [ev]);
                }) as Box<dyn FnMut(KeyboardEvent)>)
            }),
        ];

        // keys held while the page loses focus never see their keyup
        let blur = {
            let shared = shared.clone();
            Closure::wrap(Box::new(move |_: Event| {
                shared.borrow_mut().state.clear();
            }) as Box<dyn FnMut(Event)>)
        };
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;

        for (name, cb) in &mouse {
            element.add_event_listener_with_callback(name, cb.as_ref().unchecked_ref())?;
        }
        let opts = AddEventListenerOptions::new();
        opts.set_passive(false);
        for (name, cb) in &touch {
            element.add_event_listener_with_callback_and_add_event_listener_options(
                name,
                cb.as_ref().unchecked_ref(),
                &opts,
            )?;
        }
        for (name, cb) in &keys {
            document.add_event_listener_with_callback(name, cb.as_ref().unchecked_ref())?;
        }

        Ok(Self {
            shared,
            attached: Some(Attached {
                element,
                document,
                window,
                blur,
                mouse,
                touch,
                keys,
            }),
        })
    }

    pub fn on(&self, kind: InputKind, callback: impl Fn(&InputEvent) + 'static) -> ListenerId {
        self.shared.borrow_mut().listeners.on(kind, callback)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.shared.borrow_mut().listeners.off(id)
    }

    pub fn pointer_position(&self) -> Point {
        self.shared.borrow().state.pointer_position()
    }

    pub fn is_pointer_down(&self) -> bool {
        self.shared.borrow().state.is_pointer_down()
    }

    pub fn is_key_pressed(&self, code: &str) -> bool {
        self.shared.borrow().state.is_key_pressed(code)
    }

    /// Removes every DOM listener and forgets all callbacks.
    pub fn destroy(&mut self) {
        if let Some(att) = self.attached.take() {
            let _ = att
                .window
                .remove_event_listener_with_callback("blur", att.blur.as_ref().unchecked_ref());
            for (name, cb) in &att.mouse {
                let _ = att
                    .element
                    .remove_event_listener_with_callback(name, cb.as_ref().unchecked_ref());
            }
            for (name, cb) in &att.touch {
                let _ = att
                    .element
                    .remove_event_listener_with_callback(name, cb.as_ref().unchecked_ref());
            }
            for (name, cb) in &att.keys {
                let _ = att
                    .document
                    .remove_event_listener_with_callback(name, cb.as_ref().unchecked_ref());
            }
        }
        if let Ok(mut shared) = self.shared.try_borrow_mut() {
            shared.listeners.clear();
            shared.state.clear();
        }
    }
}

impl Drop for InputRouter {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn kinds(events: &[InputEvent]) -> Vec<InputKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn losing_focus_forgets_held_keys() {
        let mut st = InputState::default();
        st.key_down(" ", "Space", Modifiers::default(), 0.0);
        st.mouse_down(Point::new(10.0, 10.0), 0, 1.0);
        // keyup never arrives while the tab is in the background
        st.clear();
        assert!(!st.is_key_pressed("Space"));
        assert!(!st.is_pointer_down());
        let again = st.key_down(" ", "Space", Modifiers::default(), 2.0);
        assert_eq!(kinds(&again.events), vec![InputKind::KeyDown, InputKind::Action]);
    }

    #[test]
    fn held_key_emits_once_until_released() {
        let mut st = InputState::default();
        let first = st.key_down("a", "KeyA", Modifiers::default(), 0.0);
        assert_eq!(kinds(&first.events), vec![InputKind::KeyDown]);
        assert!(st.is_key_pressed("KeyA"));

        let repeat = st.key_down("a", "KeyA", Modifiers::default(), 16.0);
        assert!(repeat.events.is_empty());

        st.key_up("a", "KeyA", 32.0);
        assert!(!st.is_key_pressed("KeyA"));
        let again = st.key_down("a", "KeyA", Modifiers::default(), 48.0);
        assert_eq!(again.events.len(), 1);
    }

    #[test]
    fn special_keys_map_to_commands() {
        let mut st = InputState::default();
        let space = st.key_down(" ", "Space", Modifiers::default(), 0.0);
        assert_eq!(kinds(&space.events), vec![InputKind::KeyDown, InputKind::Action]);
        assert!(space.prevent_default);
        assert_eq!(space.events[1].source, InputSource::Keyboard);

        let r = st.key_down("r", "KeyR", Modifiers::default(), 0.0);
        assert_eq!(kinds(&r.events), vec![InputKind::KeyDown, InputKind::Retry]);
        assert!(!r.prevent_default);

        let esc = st.key_down("Escape", "Escape", Modifiers::default(), 0.0);
        assert_eq!(kinds(&esc.events), vec![InputKind::KeyDown, InputKind::Escape]);
        assert_eq!(esc.events[0].code(), Some("Escape"));
    }

    #[test]
    fn pointer_events_track_position_and_button_state() {
        let mut st = InputState::default();
        let down = st.mouse_down(Point::new(10.0, 20.0), 0, 1.0);
        assert_eq!(down.button, Some(0));
        assert!(st.is_pointer_down());

        let mv = st.mouse_move(Point::new(30.0, 40.0), 2.0);
        assert_eq!(mv.position, Point::new(30.0, 40.0));

        st.mouse_up(Point::new(30.0, 40.0), 0, 3.0);
        assert!(!st.is_pointer_down());

        // keyboard events carry the last pointer position
        let k = st.key_down(" ", "Space", Modifiers::default(), 4.0);
        assert_eq!(k.events[1].position, Point::new(30.0, 40.0));
    }

    #[test]
    fn touch_end_releases_then_acts() {
        let mut st = InputState::default();
        assert!(st.touch_start(None, 0.0).is_none());
        let start = st.touch_start(Some(Point::new(5.0, 5.0)), 0.0);
        assert_eq!(start.map(|e| e.source), Some(InputSource::Touch));
        let end = st.touch_end(1.0);
        assert_eq!(kinds(&end), vec![InputKind::PointerUp, InputKind::Action]);
        assert!(!st.is_pointer_down());
    }

    #[test]
    fn listeners_receive_only_their_kind() {
        let shared = Rc::new(RefCell::new(RouterShared::default()));
        let hits = Rc::new(Cell::new(0));
        let id = {
            let hits = hits.clone();
            shared
                .borrow_mut()
                .listeners
                .on(InputKind::Action, move |_| hits.set(hits.get() + 1))
        };
        let origin = Point::new(0.0, 0.0);
        emit(
            &shared,
            [
                InputEvent::new(InputKind::Action, InputSource::Mouse, origin, 0.0),
                InputEvent::new(InputKind::Pointer, InputSource::Mouse, origin, 0.0),
            ],
        );
        assert_eq!(hits.get(), 1);

        assert!(shared.borrow_mut().listeners.off(id));
        assert!(!shared.borrow_mut().listeners.off(id));
        emit(&shared, [InputEvent::new(InputKind::Action, InputSource::Touch, origin, 0.0)]);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn listener_may_reenter_the_router() {
        let shared = Rc::new(RefCell::new(RouterShared::default()));
        let inner = shared.clone();
        shared.borrow_mut().listeners.on(InputKind::Escape, move |_| {
            inner.borrow_mut().listeners.clear();
        });
        emit(
            &shared,
            [InputEvent::new(InputKind::Escape, InputSource::Keyboard, Point::new(0.0, 0.0), 0.0)],
        );
        assert!(shared.borrow().listeners.is_empty());
    }
}
