use yew::prelude::*;

use super::app::AppContext;
use super::{DomListener, keep};
use crate::games::GameResult;
use crate::util::format_clock;

/// Star count and message for a finished session.
pub fn encouragement(score: u32, accuracy: u32) -> (usize, &'static str) {
    if score >= 80 || accuracy >= 90 {
        (3, "Amazing!")
    } else if score >= 50 || accuracy >= 70 {
        (2, "Nice work!")
    } else {
        (1, "Let's try again next time!")
    }
}

#[derive(Properties, PartialEq, Clone)]
pub struct ResultScreenProps {
    pub result: GameResult,
}

#[function_component(ResultScreen)]
pub fn result_screen(props: &ResultScreenProps) -> Html {
    let app = use_context::<AppContext>();
    let game = props.result.game;

    // R plays again, Esc goes home
    {
        let app = app.clone();
        use_effect_with(game, move |&game| {
            let listener = app.and_then(|app| {
                keep(DomListener::keydown(move |e| match e.key().as_str() {
                    "r" | "R" => {
                        e.prevent_default();
                        app.navigate(|m| m.play(Some(game)));
                    }
                    "Escape" => {
                        e.prevent_default();
                        app.navigate(|m| m.go_home());
                    }
                    _ => {}
                }))
            });
            move || drop(listener)
        });
    }

    let Some(app) = app else {
        return html! {};
    };
    let retry = {
        let app = app.clone();
        Callback::from(move |_| app.navigate(|m| m.play(Some(game))))
    };
    let home = {
        let app = app.clone();
        Callback::from(move |_| app.navigate(|m| m.go_home()))
    };

    let r = &props.result;
    let (stars, message) = encouragement(r.score, r.accuracy);
    let star_text = star_row(stars);
    let best = r
        .best_score
        .map(|b| b.to_string())
        .unwrap_or_else(|| "-".to_string());

    html! {
        <div class="screen result-screen" role="main" aria-label="Results">
            <h1 class="result-title">{ format!("{} {}", game.icon(), game.name()) }</h1>
            <p class="result-encouragement">
                { message }{" "}<span class="result-stars" aria-label={format!("{} stars", stars)}>{ star_text }</span>
            </p>
            <dl class="result-stats">
                <dt>{"Score"}</dt><dd>{ r.score }</dd>
                <dt>{"Time"}</dt><dd>{ format_clock(r.elapsed_secs as u32) }</dd>
                <dt>{"Correct"}</dt><dd>{ r.correct_count() }</dd>
                <dt>{"Accuracy"}</dt><dd>{ format!("{}%", r.accuracy) }</dd>
                <dt>{"Best"}</dt><dd>{ best }</dd>
            </dl>
            <div class="result-buttons">
                <button class="btn btn-primary" onclick={retry}>{"Play again (R)"}</button>
                <button class="btn" onclick={home}>{"Home (Esc)"}</button>
            </div>
        </div>
    }
}

fn star_row(stars: usize) -> String {
    "⭐".repeat(stars)
}
