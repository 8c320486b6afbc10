use std::cell::RefCell;
use std::rc::Rc;

use log::{error, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlElement, VisibilityState};
use yew::prelude::*;

use super::app::AppContext;
use super::hud::Hud;
use super::{DomListener, defer};
use crate::engine::game_loop::DEFAULT_FPS;
use crate::engine::{
    CanvasScaling, GameLoop, InputKind, InputRouter, InputSource, LOGICAL_HEIGHT, LOGICAL_WIDTH,
    Palette, Screen, SessionData,
};
use crate::error::{AppError, Result};
use crate::games::{GameId, HudInfo, MiniGame, create_game};
use crate::util;

const PAUSE_SHADE: &str = "rgba(0, 0, 0, 0.5)";

type SharedGame = Rc<RefCell<Box<dyn MiniGame>>>;

/// Everything that lives exactly as long as one play session.
struct Session {
    game: SharedGame,
    game_loop: GameLoop,
    scaling: Rc<CanvasScaling>,
    _router: InputRouter,
    _listeners: Vec<DomListener>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.game_loop.stop();
        self.game.borrow_mut().destroy();
    }
}

/// State the frame callbacks read on every tick.
#[derive(Clone)]
struct Shared {
    paused: Rc<RefCell<bool>>,
    palette: Rc<RefCell<&'static Palette>>,
    last_hud: Rc<RefCell<HudInfo>>,
    hud: UseStateHandle<HudInfo>,
}

/// HUD values rounded to what is shown, so the DOM only updates on change.
fn shown(info: HudInfo) -> HudInfo {
    HudInfo {
        remaining_secs: info.remaining_secs.map(f64::ceil),
        elapsed_secs: info.elapsed_secs.floor(),
        ..info
    }
}

fn wire_game_input(router: &InputRouter, game: &SharedGame, app: &AppContext) {
    for kind in [InputKind::PointerDown, InputKind::Action] {
        let game = game.clone();
        let machine = app.machine.clone();
        router.on(kind, move |ev| {
            if machine.borrow().is(Screen::Playing) {
                game.borrow_mut().handle_input(ev);
            }
        });
    }
}

fn wire_shortcuts(router: &InputRouter, app: &AppContext) {
    {
        let app = app.clone();
        router.on(InputKind::Escape, move |_| {
            let state = app.machine.borrow().state();
            match state {
                Screen::Playing => app.navigate(|m| m.pause()),
                Screen::Paused => app.navigate(|m| m.go_home()),
                _ => {}
            }
        });
    }
    {
        let app = app.clone();
        router.on(InputKind::Action, move |ev| {
            if ev.source == InputSource::Keyboard && app.machine.borrow().is(Screen::Paused) {
                app.navigate(|m| m.resume());
            }
        });
    }
    {
        let app = app.clone();
        router.on(InputKind::KeyDown, move |ev| {
            if ev.code() != Some("KeyP") {
                return;
            }
            let state = app.machine.borrow().state();
            match state {
                Screen::Playing => app.navigate(|m| m.pause()),
                Screen::Paused => app.navigate(|m| m.resume()),
                _ => {}
            }
        });
    }
}

fn page_listeners(game: &SharedGame, app: &AppContext) -> Result<Vec<DomListener>> {
    let window = web_sys::window().ok_or(AppError::Missing("window"))?;
    let document = window.document().ok_or(AppError::Missing("document"))?;

    let hidden = {
        let machine = app.machine.clone();
        let doc = document.clone();
        DomListener::new(&document, "visibilitychange", move |_| {
            if doc.visibility_state() == VisibilityState::Hidden {
                let mut m = machine.borrow_mut();
                if m.is(Screen::Playing) {
                    info!("tab hidden, pausing");
                    m.pause();
                }
            }
        })?
    };
    let unload = {
        let machine = app.machine.clone();
        let store = app.store.clone();
        let game = game.clone();
        DomListener::new(&window, "beforeunload", move |_| {
            if !machine.borrow().is_any(&[Screen::Playing, Screen::Paused]) {
                return;
            }
            let Some(today) = util::today() else {
                return;
            };
            let g = game.borrow();
            let session = SessionData {
                time_secs: Some(g.hud().elapsed_secs as u32),
                interrupted: true,
                ..SessionData::default()
            };
            store.borrow_mut().record_session(g.id(), session, today);
        })?
    };
    Ok(vec![hidden, unload])
}

fn start_session(
    canvas: HtmlCanvasElement,
    id: GameId,
    app: &AppContext,
    shared: Shared,
) -> Result<Session> {
    let scaling = Rc::new(CanvasScaling::new(canvas.clone(), true)?);
    let settings = app.store.borrow().settings().clone();
    let game: SharedGame = Rc::new(RefCell::new(create_game(id, &settings, util::random_seed())));
    {
        let mut g = game.borrow_mut();
        g.init();
        g.start();
    }

    let element: HtmlElement = canvas.unchecked_into();
    let router = {
        let scaling = scaling.clone();
        InputRouter::attach(element, move |x, y| scaling.logical_position(x, y))?
    };
    wire_game_input(&router, &game, app);
    wire_shortcuts(&router, app);
    let listeners = page_listeners(&game, app)?;

    let game_loop = GameLoop::new(DEFAULT_FPS);
    let update = {
        let game = game.clone();
        let app = app.clone();
        let reported = Rc::new(RefCell::new(false));
        move |dt: f64| {
            let mut g = game.borrow_mut();
            g.update(dt);
            for cue in g.take_cues() {
                app.play_sound(cue);
            }
            if g.is_finished() && !*reported.borrow() {
                *reported.borrow_mut() = true;
                let result = g.result();
                info!("{} finished with score {}", result.game.name(), result.score);
                let machine = app.machine.clone();
                // the loop is torn down by the screen change, never inside its own frame
                defer(move || {
                    machine.borrow_mut().show_result(result);
                });
            }
        }
    };
    let render = {
        let game = game.clone();
        let scaling = scaling.clone();
        move || {
            let ctx = scaling.context();
            let palette = *shared.palette.borrow();
            scaling.clear(Some(palette.background));
            let g = game.borrow();
            g.render(ctx, palette);
            if *shared.paused.borrow() {
                ctx.set_fill_style_str(PAUSE_SHADE);
                ctx.fill_rect(0.0, 0.0, LOGICAL_WIDTH, LOGICAL_HEIGHT);
            }
            let info = shown(g.hud());
            if *shared.last_hud.borrow() != info {
                *shared.last_hud.borrow_mut() = info.clone();
                shared.hud.set(info);
            }
        }
    };
    game_loop.start(update, render)?;
    info!("started {}", id.name());

    Ok(Session {
        game,
        game_loop,
        scaling,
        _router: router,
        _listeners: listeners,
    })
}

#[derive(Properties, PartialEq, Clone)]
pub struct PlayViewProps {
    pub game: GameId,
    pub paused: bool,
    /// Kept alive but not shown, while settings are open over a paused game.
    pub hidden: bool,
}

#[function_component(PlayView)]
pub fn play_view(props: &PlayViewProps) -> Html {
    let app = use_context::<AppContext>();
    let canvas_ref = use_node_ref();
    let session = use_mut_ref(|| None::<Session>);
    let paused = use_mut_ref(|| props.paused);
    let palette = {
        let initial = app.as_ref().map(|a| a.theme.palette()).unwrap_or(&crate::engine::theme::WHITE);
        use_mut_ref(move || initial)
    };
    let last_hud = use_mut_ref(HudInfo::default);
    let hud = use_state(HudInfo::default);

    // Session setup and teardown
    {
        let app = app.clone();
        let canvas_ref = canvas_ref.clone();
        let session = session.clone();
        let shared = Shared {
            paused: paused.clone(),
            palette: palette.clone(),
            last_hud,
            hud: hud.clone(),
        };
        let id = props.game;
        use_effect_with((), move |_| {
            if let Some(app) = app {
                let started = canvas_ref
                    .cast::<HtmlCanvasElement>()
                    .ok_or(AppError::Missing("canvas"))
                    .and_then(|canvas| start_session(canvas, id, &app, shared));
                match started {
                    Ok(s) => *session.borrow_mut() = Some(s),
                    Err(e) => {
                        error!("could not start {}: {}", id.name(), e);
                        app.show_error.emit("The game could not start. Let's try again later.".into());
                        let machine = app.machine.clone();
                        defer(move || {
                            machine.borrow_mut().go_home();
                        });
                    }
                }
            }
            move || {
                session.borrow_mut().take();
            }
        });
    }
    // Pause state
    {
        let session = session.clone();
        let paused = paused.clone();
        use_effect_with(props.paused, move |&now| {
            *paused.borrow_mut() = now;
            if let Some(s) = session.borrow().as_ref() {
                let mut g = s.game.borrow_mut();
                if now {
                    s.game_loop.pause();
                    g.pause();
                } else {
                    s.game_loop.resume();
                    g.resume();
                }
            }
            || ()
        });
    }
    // Canvas colours follow the theme
    {
        let palette = palette.clone();
        let theme = app.as_ref().map(|a| a.theme).unwrap_or_default();
        use_effect_with(theme, move |t| {
            *palette.borrow_mut() = t.palette();
            || ()
        });
    }
    // The container has no size while hidden
    {
        let session = session.clone();
        use_effect_with(props.hidden, move |&hidden| {
            if !hidden {
                if let Some(s) = session.borrow().as_ref() {
                    s.scaling.resize();
                }
            }
            || ()
        });
    }

    let Some(app) = app else {
        warn!("play view rendered without app context");
        return html! {};
    };
    let on_pause = {
        let app = app.clone();
        Callback::from(move |_| app.navigate(|m| m.pause()))
    };
    let on_resume = {
        let app = app.clone();
        Callback::from(move |_| app.navigate(|m| m.resume()))
    };
    let on_settings = {
        let app = app.clone();
        Callback::from(move |_| app.navigate(|m| m.open_settings()))
    };
    let on_quit = {
        let app = app.clone();
        Callback::from(move |_| app.navigate(|m| m.go_home()))
    };

    let style = if props.hidden { "display:none;" } else { "" };
    html! {
        <div class="play-view" style={style}>
            <div class="canvas-container">
                <canvas ref={canvas_ref} class="game-canvas"></canvas>
            </div>
            <Hud
                game={props.game}
                info={(*hud).clone()}
                paused={props.paused}
                {on_pause}
                {on_resume}
                {on_settings}
                {on_quit}
            />
        </div>
    }
}
