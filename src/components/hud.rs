use yew::prelude::*;

use crate::games::{GameId, HudInfo};
use crate::util::format_clock;

#[derive(Properties, PartialEq, Clone)]
pub struct HudProps {
    pub game: GameId,
    pub info: HudInfo,
    pub paused: bool,
    pub on_pause: Callback<()>,
    pub on_resume: Callback<()>,
    pub on_settings: Callback<()>,
    pub on_quit: Callback<()>,
}

/// Clock text: time left when the game has a limit, time played otherwise.
pub fn clock_text(info: &HudInfo) -> String {
    match info.remaining_secs {
        Some(left) => format!("Left {}", format_clock(left.max(0.0) as u32)),
        None => format_clock(info.elapsed_secs.max(0.0) as u32),
    }
}

#[function_component(Hud)]
pub fn hud(props: &HudProps) -> Html {
    let pause_cb = {
        let cb = props.on_pause.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let resume_cb = {
        let cb = props.on_resume.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let settings_cb = {
        let cb = props.on_settings.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let quit_cb = {
        let cb = props.on_quit.clone();
        Callback::from(move |_| cb.emit(()))
    };

    let round = props
        .info
        .round
        .map(|(n, total)| html! { <span class="hud-round">{ format!("{} / {}", n, total) }</span> });

    let overlay = if props.paused {
        html! {
            <div class="pause-overlay" role="dialog" aria-label="Paused">
                <div class="pause-panel">
                    <h2>{"Taking a break"}</h2>
                    <p class="pause-hint">{"Space to continue, Esc to go home"}</p>
                    <button class="btn btn-primary" onclick={resume_cb}>{"Continue"}</button>
                    <button class="btn" onclick={settings_cb}>{"Settings"}</button>
                    <button class="btn" onclick={quit_cb}>{"Home"}</button>
                </div>
            </div>
        }
    } else {
        html! {}
    };

    html! {
        <>
            <div class="hud">
                <span class="hud-game">{ format!("{} {}", props.game.icon(), props.game.name()) }</span>
                <span class="hud-time">{ clock_text(&props.info) }</span>
                { for round }
                <span class="hud-score">{ format!("Score {}", props.info.score) }</span>
                <button class="hud-pause" onclick={pause_cb} disabled={props.paused} aria-label="Pause">{"❚❚"}</button>
            </div>
            { overlay }
        </>
    }
}
