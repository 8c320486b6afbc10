//! Screen state machine.
//!
//! A fixed adjacency table decides which screens may follow which. Anything
//! outside the table is refused with a warning; `force_state` bypasses it.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::games::{GameId, GameResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Screen {
    Home,
    Playing,
    Paused,
    Result,
    Settings,
    Help,
}

impl Screen {
    pub const ALL: [Screen; 6] = [
        Screen::Home,
        Screen::Playing,
        Screen::Paused,
        Screen::Result,
        Screen::Settings,
        Screen::Help,
    ];

    /// Screens reachable from `self` through `transition`.
    pub fn targets(self) -> &'static [Screen] {
        use Screen::*;
        match self {
            Home => &[Playing, Settings, Help],
            Playing => &[Paused, Result, Home],
            Paused => &[Playing, Home, Settings, Result],
            Result => &[Playing, Home],
            Settings => &[Home, Paused],
            Help => &[Home, Playing],
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Screen::Home => "HOME",
            Screen::Playing => "PLAYING",
            Screen::Paused => "PAUSED",
            Screen::Result => "RESULT",
            Screen::Settings => "SETTINGS",
            Screen::Help => "HELP",
        };
        f.write_str(s)
    }
}

/// Data attached to a transition.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Payload {
    #[default]
    None,
    Result(GameResult),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransitionRecord {
    pub from: Screen,
    pub to: Screen,
    pub timestamp_ms: f64,
    pub payload: Payload,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StateEvent {
    StateChange {
        old: Screen,
        new: Screen,
        payload: Payload,
        forced: bool,
    },
    GameChange {
        old: Option<GameId>,
        new: Option<GameId>,
    },
}

pub type SubscriptionId = u32;

type Subscriber = Box<dyn Fn(&StateEvent)>;

pub const MAX_HISTORY: usize = 10;

pub struct StateMachine {
    current: Screen,
    previous: Option<Screen>,
    current_game: Option<GameId>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    state_subscribers: HashMap<Screen, Vec<(SubscriptionId, Subscriber)>>,
    history: VecDeque<TransitionRecord>,
    next_id: SubscriptionId,
    clock: fn() -> f64,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::with_clock(crate::util::now_ms)
    }

    /// Uses `clock` for history timestamps.
    pub fn with_clock(clock: fn() -> f64) -> Self {
        Self {
            current: Screen::Home,
            previous: None,
            current_game: None,
            subscribers: Vec::new(),
            state_subscribers: HashMap::new(),
            history: VecDeque::with_capacity(MAX_HISTORY + 1),
            next_id: 1,
            clock,
        }
    }

    pub fn state(&self) -> Screen {
        self.current
    }

    pub fn previous_state(&self) -> Option<Screen> {
        self.previous
    }

    pub fn current_game(&self) -> Option<GameId> {
        self.current_game
    }

    pub fn set_current_game(&mut self, game: Option<GameId>) {
        let old = self.current_game;
        self.current_game = game;
        if old != game {
            self.notify(&StateEvent::GameChange { old, new: game });
        }
    }

    pub fn can_transition(&self, from: Screen, to: Screen) -> bool {
        from.targets().contains(&to)
    }

    /// Moves to `to` if the table allows it. Returns whether the state changed.
    pub fn transition(&mut self, to: Screen, payload: Payload) -> bool {
        if self.current == to {
            return false;
        }
        if !self.can_transition(self.current, to) {
            log::warn!("invalid state transition: {} -> {}", self.current, to);
            return false;
        }
        let old = self.current;
        self.previous = Some(old);
        self.current = to;
        self.history.push_back(TransitionRecord {
            from: old,
            to,
            timestamp_ms: (self.clock)(),
            payload: payload.clone(),
        });
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
        log::debug!("state change: {} -> {}", old, to);
        self.notify(&StateEvent::StateChange {
            old,
            new: to,
            payload,
            forced: false,
        });
        true
    }

    /// Sets the state without consulting the table.
    pub fn force_state(&mut self, to: Screen, payload: Payload) {
        let old = self.current;
        self.previous = Some(old);
        self.current = to;
        self.notify(&StateEvent::StateChange {
            old,
            new: to,
            payload,
            forced: true,
        });
    }

    pub fn is(&self, state: Screen) -> bool {
        self.current == state
    }

    pub fn is_any(&self, states: &[Screen]) -> bool {
        states.contains(&self.current)
    }

    pub fn subscribe(&mut self, callback: impl Fn(&StateEvent) + 'static) -> SubscriptionId {
        let id = self.alloc_id();
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    /// Subscribes to state changes whose target is `state`.
    pub fn subscribe_to_state(
        &mut self,
        state: Screen,
        callback: impl Fn(&StateEvent) + 'static,
    ) -> SubscriptionId {
        let id = self.alloc_id();
        self.state_subscribers
            .entry(state)
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe_from_state(&mut self, state: Screen, id: SubscriptionId) {
        if let Some(list) = self.state_subscribers.get_mut(&state) {
            list.retain(|(sid, _)| *sid != id);
        }
    }

    pub fn go_home(&mut self) -> bool {
        self.transition(Screen::Home, Payload::None)
    }

    pub fn play(&mut self, game: Option<GameId>) -> bool {
        if game.is_some() {
            self.set_current_game(game);
        }
        self.transition(Screen::Playing, Payload::None)
    }

    pub fn pause(&mut self) -> bool {
        self.transition(Screen::Paused, Payload::None)
    }

    pub fn resume(&mut self) -> bool {
        if self.current == Screen::Paused {
            self.transition(Screen::Playing, Payload::None)
        } else {
            false
        }
    }

    pub fn show_result(&mut self, result: GameResult) -> bool {
        self.transition(Screen::Result, Payload::Result(result))
    }

    pub fn open_settings(&mut self) -> bool {
        self.transition(Screen::Settings, Payload::None)
    }

    pub fn open_help(&mut self) -> bool {
        self.transition(Screen::Help, Payload::None)
    }

    pub fn go_back(&mut self) -> bool {
        match self.previous {
            Some(prev) => self.transition(prev, Payload::None),
            None => false,
        }
    }

    /// Oldest first.
    pub fn history(&self) -> Vec<TransitionRecord> {
        self.history.iter().cloned().collect()
    }

    /// Back to `Home` with no game and empty history. Subscribers are kept.
    pub fn reset(&mut self) {
        self.current = Screen::Home;
        self.previous = None;
        self.current_game = None;
        self.history.clear();
    }

    fn alloc_id(&mut self) -> SubscriptionId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    fn notify(&self, event: &StateEvent) {
        for (_, cb) in &self.subscribers {
            cb(event);
        }
        if let StateEvent::StateChange { new, .. } = event {
            if let Some(list) = self.state_subscribers.get(new) {
                for (_, cb) in list {
                    cb(event);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn machine() -> StateMachine {
        StateMachine::with_clock(|| 1_000.0)
    }

    #[test]
    fn table_matches_declared_edges() {
        let sm = machine();
        let declared: &[(Screen, Screen)] = &[
            (Screen::Home, Screen::Playing),
            (Screen::Home, Screen::Settings),
            (Screen::Home, Screen::Help),
            (Screen::Playing, Screen::Paused),
            (Screen::Playing, Screen::Result),
            (Screen::Playing, Screen::Home),
            (Screen::Paused, Screen::Playing),
            (Screen::Paused, Screen::Home),
            (Screen::Paused, Screen::Settings),
            (Screen::Paused, Screen::Result),
            (Screen::Result, Screen::Playing),
            (Screen::Result, Screen::Home),
            (Screen::Settings, Screen::Home),
            (Screen::Settings, Screen::Paused),
            (Screen::Help, Screen::Home),
            (Screen::Help, Screen::Playing),
        ];
        for from in Screen::ALL {
            for to in Screen::ALL {
                let expected = declared.contains(&(from, to));
                assert_eq!(sm.can_transition(from, to), expected, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn invalid_transition_is_a_no_op() {
        let mut sm = machine();
        let seen = Rc::new(RefCell::new(0));
        let seen_cb = seen.clone();
        sm.subscribe(move |_| *seen_cb.borrow_mut() += 1);

        assert!(!sm.transition(Screen::Result, Payload::None));
        assert_eq!(sm.state(), Screen::Home);
        assert_eq!(sm.previous_state(), None);
        assert!(sm.history().is_empty());
        assert_eq!(*seen.borrow(), 0);

        // same-state transition is refused too
        assert!(!sm.transition(Screen::Home, Payload::None));
    }

    #[test]
    fn valid_transition_updates_previous_and_notifies() {
        let mut sm = machine();
        let events = Rc::new(RefCell::new(Vec::new()));
        let ev = events.clone();
        sm.subscribe(move |e| ev.borrow_mut().push(e.clone()));

        assert!(sm.play(Some(GameId::Rail)));
        assert_eq!(sm.state(), Screen::Playing);
        assert_eq!(sm.previous_state(), Some(Screen::Home));
        assert_eq!(sm.current_game(), Some(GameId::Rail));

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], StateEvent::GameChange { old: None, new: Some(GameId::Rail) }));
        assert!(matches!(
            events[1],
            StateEvent::StateChange { old: Screen::Home, new: Screen::Playing, forced: false, .. }
        ));
    }

    #[test]
    fn history_is_capped() {
        let mut sm = machine();
        sm.play(Some(GameId::Rail));
        for _ in 0..8 {
            sm.pause();
            sm.resume();
        }
        let history = sm.history();
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.last().map(|r| r.to), Some(Screen::Playing));
        assert!(history.iter().all(|r| r.timestamp_ms == 1_000.0));
    }

    #[test]
    fn force_state_skips_table_and_history() {
        let mut sm = machine();
        let forced = Rc::new(RefCell::new(false));
        let f = forced.clone();
        sm.subscribe(move |e| {
            if let StateEvent::StateChange { forced, .. } = e {
                *f.borrow_mut() = *forced;
            }
        });
        sm.force_state(Screen::Result, Payload::None);
        assert_eq!(sm.state(), Screen::Result);
        assert!(*forced.borrow());
        assert!(sm.history().is_empty());
    }

    #[test]
    fn state_subscribers_only_see_their_target() {
        let mut sm = machine();
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        let id = sm.subscribe_to_state(Screen::Paused, move |_| *h.borrow_mut() += 1);

        sm.play(Some(GameId::ReadLine));
        sm.pause();
        sm.resume();
        assert_eq!(*hits.borrow(), 1);

        sm.unsubscribe_from_state(Screen::Paused, id);
        sm.pause();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut sm = machine();
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        let id = sm.subscribe(move |_| *h.borrow_mut() += 1);
        sm.open_help();
        sm.unsubscribe(id);
        sm.go_home();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn resume_only_from_paused_and_go_back() {
        let mut sm = machine();
        assert!(!sm.resume());
        sm.open_settings();
        assert!(sm.go_back());
        assert_eq!(sm.state(), Screen::Home);

        sm.play(Some(GameId::PredictSaccade));
        sm.pause();
        sm.open_settings();
        assert_eq!(sm.previous_state(), Some(Screen::Paused));
        assert!(sm.go_back());
        assert_eq!(sm.state(), Screen::Paused);
    }

    #[test]
    fn reset_returns_home() {
        let mut sm = machine();
        sm.play(Some(GameId::Rail));
        sm.reset();
        assert_eq!(sm.state(), Screen::Home);
        assert_eq!(sm.current_game(), None);
        assert!(sm.history().is_empty());
        assert!(sm.is_any(&[Screen::Home, Screen::Help]));
    }
}
