use log::warn;
use yew::prelude::*;

use super::app::AppContext;
use super::{DomListener, keep};
use crate::engine::storage::{
    Contrast, Difficulty, FontSize, Pattern, RailType, Speed, ThemeName, TimeLimit,
};
use crate::engine::{Payload, Screen, Settings, Theme};

const ROUND_CHOICES: [u32; 4] = [5, 10, 15, 20];

fn on_off(v: bool) -> &'static str {
    if v { "On" } else { "Off" }
}

/// One labelled row of option buttons.
fn choice<T: Copy + PartialEq + 'static>(
    key: &'static str,
    title: &'static str,
    options: &[T],
    label: impl Fn(T) -> String,
    current: T,
    draft: &UseStateHandle<Settings>,
    apply: fn(&mut Settings, T),
) -> Html {
    let buttons = options.iter().map(|&opt| {
        let draft = draft.clone();
        let onclick = Callback::from(move |_| {
            let mut next = (*draft).clone();
            apply(&mut next, opt);
            draft.set(next);
        });
        let selected = opt == current;
        html! {
            <button
                class={classes!("option-btn", selected.then_some("selected"))}
                aria-pressed={selected.to_string()}
                {onclick}
            >{ label(opt) }</button>
        }
    });
    html! {
        <div class="setting-group">
            <span class="setting-label" id={format!("label-{}", key)}>{ title }</span>
            <div class="setting-options" role="group" aria-labelledby={format!("label-{}", key)}>
                { for buttons }
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq, Clone)]
pub struct SettingsScreenProps {
    /// Screen to go back to; `Paused` when opened over a running game.
    pub return_to: Screen,
}

#[function_component(SettingsScreen)]
pub fn settings_screen(props: &SettingsScreenProps) -> Html {
    let app = use_context::<AppContext>();
    let draft = {
        let initial = app.as_ref().map(|a| a.settings.clone()).unwrap_or_default();
        use_state(move || initial)
    };

    // Live preview of the look
    {
        let preview = Theme::from_settings(&draft);
        use_effect_with(preview, move |t| {
            if let Err(e) = t.apply() {
                warn!("theme preview failed: {}", e);
            }
            || ()
        });
    }

    let back = {
        let app = app.clone();
        let to = props.return_to;
        Callback::from(move |_: ()| {
            if let Some(app) = &app {
                // drop the preview
                if let Err(e) = app.theme.apply() {
                    warn!("theme restore failed: {}", e);
                }
                app.navigate(|m| m.transition(to, Payload::None));
            }
        })
    };
    {
        let back = back.clone();
        use_effect_with((), move |_| {
            let listener = keep(DomListener::keydown(move |e| {
                if e.key() == "Escape" {
                    e.prevent_default();
                    back.emit(());
                }
            }));
            move || drop(listener)
        });
    }

    let Some(app) = app else {
        return html! {};
    };
    let save = {
        let app = app.clone();
        let draft = draft.clone();
        let to = props.return_to;
        Callback::from(move |_| {
            app.apply_settings.emit((*draft).clone());
            app.navigate(|m| m.transition(to, Payload::None));
        })
    };
    let defaults = {
        let draft = draft.clone();
        Callback::from(move |_| draft.set(Settings::default()))
    };
    let clear_records = {
        let app = app.clone();
        Callback::from(move |_| {
            let confirmed = web_sys::window()
                .map(|w| {
                    w.confirm_with_message("Clear all play records? Settings are kept.")
                        .unwrap_or(false)
                })
                .unwrap_or(false);
            if confirmed {
                app.store.borrow_mut().reset_records();
            }
        })
    };
    let back_click = Callback::from(move |_| back.emit(()));

    let s = (*draft).clone();
    html! {
        <div class="screen settings-screen" role="main" aria-label="Settings">
            <h1 class="settings-title">{"Settings"}</h1>
            <section class="settings-section">
                <h2>{"Look and sound"}</h2>
                { choice("theme", "Background", &ThemeName::ALL, |v| v.label().into(), s.theme, &draft, |s, v| s.theme = v) }
                { choice("contrast", "Contrast", &Contrast::ALL, |v| v.label().into(), s.contrast, &draft, |s, v| s.contrast = v) }
                { choice("font", "Text size", &FontSize::ALL, |v| v.label().into(), s.font_size, &draft, |s, v| s.font_size = v) }
                { choice("sound", "Sound", &[true, false], |v| on_off(v).into(), s.sound, &draft, |s, v| s.sound = v) }
                { choice("guide", "Guide", &[true, false], |v| on_off(v).into(), s.guide, &draft, |s, v| s.guide = v) }
            </section>
            <section class="settings-section">
                <h2>{"Games"}</h2>
                { choice("speed", "Speed", &Speed::ALL, |v| v.label().into(), s.speed, &draft, |s, v| s.speed = v) }
                { choice("time", "Time", &TimeLimit::ALL, |v| v.label().into(), s.time_limit, &draft, |s, v| s.time_limit = v) }
                { choice("rail", "Rail shape", &RailType::ALL, |v| v.label().into(), s.rail_type, &draft, |s, v| s.rail_type = v) }
                { choice("difficulty", "Grid size", &Difficulty::ALL, |v| v.label().into(), s.difficulty, &draft, |s, v| s.difficulty = v) }
                { choice("pattern", "Jump pattern", &Pattern::ALL, |v| v.label().into(), s.pattern, &draft, |s, v| s.pattern = v) }
                { choice("rounds", "Rounds", &ROUND_CHOICES, |v| v.to_string(), s.rounds, &draft, |s, v| s.rounds = v) }
            </section>
            <div class="settings-buttons">
                <button class="btn" onclick={back_click}>{"Back"}</button>
                <button class="btn" onclick={defaults}>{"Defaults"}</button>
                <button class="btn btn-primary" onclick={save}>{"Save"}</button>
            </div>
            <button class="btn btn-quiet" onclick={clear_records}>{"Clear play records"}</button>
        </div>
    }
}
