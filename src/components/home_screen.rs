use web_sys::HtmlElement;
use yew::prelude::*;

use super::app::AppContext;
use super::{DomListener, defer_by, keep};
use crate::games::GameId;

const FOCUS_DELAY_MS: i32 = 100;

/// Card that takes focus when the screen opens.
pub fn initial_focus(count: usize) -> Option<usize> {
    (count > 0).then_some(0)
}

/// Next card index for an arrow key, wrapping around.
pub fn step_focus(current: usize, key: &str, count: usize) -> Option<usize> {
    if count == 0 {
        return None;
    }
    match key {
        "ArrowRight" | "ArrowDown" => Some((current + 1) % count),
        "ArrowLeft" | "ArrowUp" => Some((current + count - 1) % count),
        _ => None,
    }
}

#[function_component(HomeScreen)]
pub fn home_screen() -> Html {
    let app = use_context::<AppContext>();
    let cards = use_memo((), |_| GameId::ALL.map(|_| NodeRef::default()));
    let focused = use_mut_ref(|| 0_usize);

    // First card is focused once the screen has settled
    {
        let cards = cards.clone();
        let focused = focused.clone();
        use_effect_with((), move |_| {
            if let Some(first) = initial_focus(cards.len()) {
                *focused.borrow_mut() = first;
                defer_by(FOCUS_DELAY_MS, move || {
                    if let Some(el) = cards[first].cast::<HtmlElement>() {
                        let _ = el.focus();
                    }
                });
            }
            || ()
        });
    }

    // Arrow keys move between cards; Enter and Space press the focused one
    {
        let cards = cards.clone();
        let focused = focused.clone();
        use_effect_with((), move |_| {
            let listener = keep(DomListener::keydown(move |e| {
                let current = *focused.borrow();
                let Some(next) = step_focus(current, &e.key(), cards.len()) else {
                    return;
                };
                e.prevent_default();
                *focused.borrow_mut() = next;
                if let Some(el) = cards[next].cast::<HtmlElement>() {
                    let _ = el.focus();
                }
            }));
            move || drop(listener)
        });
    }

    let Some(app) = app else {
        return html! {};
    };
    let records = app.store.borrow().records().clone();

    let open_settings = {
        let app = app.clone();
        Callback::from(move |_| app.navigate(|m| m.open_settings()))
    };
    let open_help = {
        let app = app.clone();
        Callback::from(move |_| app.navigate(|m| m.open_help()))
    };

    let card = |(i, &id): (usize, &GameId)| {
        let start = {
            let app = app.clone();
            Callback::from(move |_| app.navigate(|m| m.play(Some(id))))
        };
        let on_focus = {
            let focused = focused.clone();
            Callback::from(move |_| *focused.borrow_mut() = i)
        };
        let record = records.game_records.get(&id);
        let best = record
            .and_then(|r| r.best_score)
            .map(|b| format!("Best {}", b))
            .unwrap_or_else(|| "Not played yet".to_string());
        html! {
            <button
                ref={cards[i].clone()}
                class={classes!("game-card", format!("game-card-{}", i))}
                onclick={start}
                onfocus={on_focus}
                aria-label={id.name()}
            >
                <span class="card-icon" aria-hidden="true">{ id.icon() }</span>
                <span class="card-title">{ id.name() }</span>
                <span class="card-desc">{ id.description() }</span>
                <span class="card-record">{ best }</span>
            </button>
        }
    };

    let streak = if records.consecutive_days > 1 {
        html! { <p class="home-streak">{ format!("{} days in a row. Nice and steady!", records.consecutive_days) }</p> }
    } else {
        html! {}
    };

    html! {
        <div class="screen home-screen" role="main" aria-label="Home">
            <header class="home-header">
                <div>
                    <h1 class="home-title">{"Eye Training"}</h1>
                    <p class="home-subtitle">{"Gentle games for moving your eyes"}</p>
                </div>
                <div class="header-buttons">
                    <button class="header-btn" onclick={open_settings} aria-label="Settings">{"⚙ Settings"}</button>
                    <button class="header-btn" onclick={open_help} aria-label="Help">{"? Help"}</button>
                </div>
            </header>
            <main class="game-cards">
                { for GameId::ALL.iter().enumerate().map(card) }
            </main>
            { streak }
            <footer class="home-footer">
                <p>{"Rest your eyes for a moment between games."}</p>
            </footer>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_wrap_around_the_cards() {
        assert_eq!(step_focus(0, "ArrowRight", 3), Some(1));
        assert_eq!(step_focus(2, "ArrowDown", 3), Some(0));
        assert_eq!(step_focus(0, "ArrowLeft", 3), Some(2));
        assert_eq!(step_focus(1, "ArrowUp", 3), Some(0));
        assert_eq!(step_focus(1, "Enter", 3), None);
        assert_eq!(step_focus(0, "ArrowRight", 0), None);
    }

    #[test]
    fn first_card_is_focused_on_open() {
        assert_eq!(initial_focus(GameId::ALL.len()), Some(0));
        assert_eq!(initial_focus(0), None);
        let first = initial_focus(3).unwrap_or_default();
        assert_eq!(step_focus(first, "ArrowRight", 3), Some(1));
    }
}
