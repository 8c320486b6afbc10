use std::cell::RefCell;
use std::rc::Rc;

use log::{info, warn};
use yew::prelude::*;

use super::error_banner::ErrorBanner;
use super::help_screen::HelpScreen;
use super::home_screen::HomeScreen;
use super::play_view::PlayView;
use super::result_screen::ResultScreen;
use super::settings_screen::SettingsScreen;
use crate::engine::storage::LocalStorage;
use crate::engine::{
    GentleAudio, Payload, Screen, SessionData, Settings, Sound, StateEvent, StateMachine, Store,
    Theme,
};
use crate::games::{GameId, GameResult};
use crate::util;

/// Shared services, handed to every screen through a context provider.
#[derive(Clone)]
pub struct AppContext {
    pub machine: Rc<RefCell<StateMachine>>,
    pub store: Rc<RefCell<Store>>,
    pub audio: Rc<RefCell<GentleAudio>>,
    pub settings: Settings,
    pub theme: Theme,
    pub show_error: Callback<String>,
    /// Persists and applies new settings.
    pub apply_settings: Callback<Settings>,
}

impl PartialEq for AppContext {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.machine, &other.machine)
            && Rc::ptr_eq(&self.store, &other.store)
            && Rc::ptr_eq(&self.audio, &other.audio)
            && self.settings == other.settings
            && self.theme == other.theme
            && self.show_error == other.show_error
            && self.apply_settings == other.apply_settings
    }
}

impl AppContext {
    pub fn play_sound(&self, sound: Sound) {
        self.audio.borrow_mut().play(sound);
    }

    /// Runs `f` against the state machine with a click sound.
    pub fn navigate(&self, f: impl FnOnce(&mut StateMachine) -> bool) {
        self.play_sound(Sound::Click);
        let moved = f(&mut self.machine.borrow_mut());
        if !moved {
            info!("navigation ignored in {}", self.machine.borrow().state());
        }
    }
}

/// Stores a finished session and fills in the best score.
fn record_result(store: &RefCell<Store>, result: &GameResult) -> GameResult {
    let mut result = result.clone();
    let Some(today) = util::today() else {
        warn!("no calendar date, session not recorded");
        return result;
    };
    let session = SessionData {
        score: Some(result.score),
        accuracy: Some(result.accuracy),
        time_secs: Some(result.elapsed_secs as u32),
        interrupted: false,
    };
    let record = store.borrow_mut().record_session(result.game, session, today);
    result.best_score = record.best_score;
    result
}

#[function_component(App)]
pub fn app() -> Html {
    let machine = use_mut_ref(StateMachine::new);
    let store = use_mut_ref(|| Store::load(LocalStorage));
    let audio = use_mut_ref(GentleAudio::new);
    let settings = {
        let store = store.clone();
        use_state(move || store.borrow().settings().clone())
    };
    let screen = use_state(|| Screen::Home);
    let settings_from = use_state(|| Screen::Home);
    let game = use_state(|| None::<GameId>);
    let result = use_state(|| None::<GameResult>);
    let session_seq = use_mut_ref(|| 0_u32);
    let session = use_state(|| 0_u32);
    let error = use_state(|| None::<String>);

    let theme = Theme::from_settings(&settings);

    // Apply theme whenever it changes
    use_effect_with(theme, move |theme| {
        if let Err(e) = theme.apply() {
            warn!("theme not applied: {}", e);
        }
        || ()
    });
    {
        let audio = audio.clone();
        use_effect_with(settings.sound, move |on| {
            audio.borrow_mut().apply_from_settings(*on);
            || ()
        });
    }

    // Follow the state machine
    {
        let machine = machine.clone();
        let store = store.clone();
        let screen = screen.clone();
        let settings_from = settings_from.clone();
        let game = game.clone();
        let result = result.clone();
        let session = session.clone();
        use_effect_with((), move |_| {
            let id = machine.borrow_mut().subscribe(move |ev: &StateEvent| match ev {
                StateEvent::StateChange {
                    old, new, payload, ..
                } => {
                    info!("screen {} -> {}", old, new);
                    if *new == Screen::Playing && *old != Screen::Paused {
                        let mut seq = session_seq.borrow_mut();
                        *seq += 1;
                        session.set(*seq);
                    }
                    if *new == Screen::Settings {
                        settings_from.set(*old);
                    }
                    if let Payload::Result(r) = payload {
                        result.set(Some(record_result(&store, r)));
                    }
                    screen.set(*new);
                }
                StateEvent::GameChange { new, .. } => game.set(*new),
            });
            move || machine.borrow_mut().unsubscribe(id)
        });
    }

    let show_error = {
        let error = error.clone();
        Callback::from(move |msg: String| error.set(Some(msg)))
    };
    let close_error = {
        let error = error.clone();
        Callback::from(move |_| error.set(None))
    };
    let apply_settings = {
        let store = store.clone();
        let settings = settings.clone();
        Callback::from(move |next: Settings| {
            store.borrow_mut().set_settings(next.clone());
            settings.set(next);
        })
    };

    let ctx = AppContext {
        machine,
        store,
        audio,
        settings: (*settings).clone(),
        theme,
        show_error,
        apply_settings,
    };

    let current = *screen;
    let in_session = matches!(current, Screen::Playing | Screen::Paused)
        || (current == Screen::Settings && *settings_from == Screen::Paused);
    let play_view = match *game {
        Some(id) if in_session => html! {
            <PlayView
                key={*session}
                game={id}
                paused={current != Screen::Playing}
                hidden={current == Screen::Settings}
            />
        },
        _ => html! {},
    };
    let overlay = match current {
        Screen::Home => html! { <HomeScreen /> },
        Screen::Help => html! { <HelpScreen /> },
        Screen::Settings => html! { <SettingsScreen return_to={*settings_from} /> },
        Screen::Result => match &*result {
            Some(r) => html! { <ResultScreen result={r.clone()} /> },
            None => html! {},
        },
        Screen::Playing | Screen::Paused => html! {},
    };

    html! {
        <ContextProvider<AppContext> context={ctx}>
            <div class="app">
                { play_view }
                { overlay }
                <ErrorBanner message={(*error).clone()} on_close={close_error} />
            </div>
        </ContextProvider<AppContext>>
    }
}
