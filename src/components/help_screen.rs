use yew::prelude::*;

use super::app::AppContext;
use super::{DomListener, keep};
use crate::games::GameId;

fn rules(game: GameId) -> &'static [&'static str] {
    match game {
        GameId::Rail => &[
            "A dot moves along a line. Follow it with your eyes.",
            "Press Space or tap when the dot is in the bright middle part.",
            "Each press in the middle part scores a point.",
        ],
        GameId::ReadLine => &[
            "Shapes are lined up in rows.",
            "Tap them from left to right, one row at a time.",
            "If you skip ahead, a soft glow shows where to go next.",
        ],
        GameId::PredictSaccade => &[
            "A faint circle shows where the next one will appear.",
            "Get your eyes ready. When it fills in, press Space or tap.",
            "There is no rush. Take the time you need.",
        ],
    }
}

const KEYS: [(&str, &str); 5] = [
    ("Space", "Action, continue"),
    ("P", "Pause or continue"),
    ("R", "Play again (results)"),
    ("Esc", "Pause, then go home"),
    ("Arrow keys", "Move between games"),
];

const NOTES: [&str; 4] = [
    "Take a rest when you feel tired.",
    "Stop right away if your eyes hurt.",
    "Play in a well lit room.",
    "Up to 15 minutes a day is plenty.",
];

#[function_component(HelpScreen)]
pub fn help_screen() -> Html {
    let app = use_context::<AppContext>();

    {
        let app = app.clone();
        use_effect_with((), move |_| {
            let listener = app.and_then(|app| {
                keep(DomListener::keydown(move |e| {
                    if e.key() == "Escape" {
                        e.prevent_default();
                        app.navigate(|m| m.go_home());
                    }
                }))
            });
            move || drop(listener)
        });
    }

    let close = {
        let app = app.clone();
        Callback::from(move |_| {
            if let Some(app) = &app {
                app.navigate(|m| m.go_home());
            }
        })
    };

    html! {
        <div class="screen help-screen" role="main" aria-label="Help">
            <h1 class="help-title">{"Help"}</h1>
            <section class="help-section">
                <h2>{"About"}</h2>
                <p>{"Small games that exercise eye movement. Play at your own pace."}</p>
            </section>
            { for GameId::ALL.iter().map(|&id| html! {
                <section class="help-section">
                    <h2>{ format!("{} {}", id.icon(), id.name()) }</h2>
                    <ul>{ for rules(id).iter().map(|r| html! { <li>{ *r }</li> }) }</ul>
                </section>
            }) }
            <section class="help-section">
                <h2>{"Keys"}</h2>
                <dl class="help-keys">
                    { for KEYS.iter().map(|(key, action)| html! {
                        <>
                            <dt><kbd>{ *key }</kbd></dt>
                            <dd>{ *action }</dd>
                        </>
                    }) }
                </dl>
            </section>
            <section class="help-section">
                <h2>{"Take care"}</h2>
                <ul>{ for NOTES.iter().map(|n| html! { <li>{ *n }</li> }) }</ul>
            </section>
            <button class="btn btn-primary" onclick={close}>{"Close"}</button>
        </div>
    }
}
