pub mod audio;
pub mod canvas;
pub mod game_loop;
pub mod input;
pub mod state;
pub mod storage;
pub mod theme;

pub use audio::{GentleAudio, Sound};
pub use canvas::{CanvasScaling, LOGICAL_HEIGHT, LOGICAL_WIDTH, Point};
pub use game_loop::GameLoop;
pub use input::{InputEvent, InputKind, InputRouter, InputSource};
pub use state::{Payload, Screen, StateEvent, StateMachine};
pub use storage::{SessionData, Settings, Store};
pub use theme::{Palette, Theme};
