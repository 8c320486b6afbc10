mod components;
mod engine;
mod error;
mod games;
mod util;

use log::Level;

fn main() {
    console_error_panic_hook::set_once();
    let level = if cfg!(debug_assertions) {
        Level::Debug
    } else {
        Level::Info
    };
    if let Err(e) = console_log::init_with_level(level) {
        web_sys::console::warn_1(&format!("logger already set: {}", e).into());
    }
    log::info!("eye training starting");
    yew::Renderer::<components::app::App>::new().render();
}
