use log::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use yew::prelude::*;

use crate::error::AppError;

pub const AUTO_DISMISS_MS: i32 = 5000;

#[derive(Properties, PartialEq, Clone)]
pub struct ErrorBannerProps {
    pub message: Option<String>,
    pub on_close: Callback<()>,
}

#[function_component(ErrorBanner)]
pub fn error_banner(props: &ErrorBannerProps) -> Html {
    {
        let on_close = props.on_close.clone();
        use_effect_with(props.message.clone(), move |message| {
            let mut pending = None;
            if message.is_some() {
                if let Some(win) = web_sys::window() {
                    let cb = Closure::once(move || on_close.emit(()));
                    match win.set_timeout_with_callback_and_timeout_and_arguments_0(
                        cb.as_ref().unchecked_ref(),
                        AUTO_DISMISS_MS,
                    ) {
                        Ok(id) => pending = Some((win, id, cb)),
                        Err(e) => warn!("banner timer not set: {}", AppError::from(e)),
                    }
                }
            }
            move || {
                if let Some((win, id, _cb)) = pending {
                    win.clear_timeout_with_handle(id);
                }
            }
        });
    }

    let Some(message) = props.message.clone() else {
        return html! {};
    };
    let close = {
        let cb = props.on_close.clone();
        Callback::from(move |_| cb.emit(()))
    };
    html! {
        <div class="error-notification" role="alert" aria-live="assertive">
            <span class="error-icon" aria-hidden="true">{"⚠️"}</span>
            <span class="error-message">{ message }</span>
            <button class="error-close" aria-label="Close" onclick={close}>{"×"}</button>
        </div>
    }
}
