use wasm_bindgen::JsValue;

/// Result alias carrying [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors surfaced by the engine and the UI glue.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A browser API call threw.
    #[error("javascript error: {0}")]
    Js(String),
    /// A browser object we depend on is not available (window, document, 2d context...).
    #[error("{0} is not available")]
    Missing(&'static str),
    #[error("invalid saved data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("audio unavailable: {0}")]
    Audio(String),
}

impl From<JsValue> for AppError {
    fn from(value: JsValue) -> Self {
        Self::Js(
            value
                .as_string()
                .unwrap_or_else(|| format!("{:?}", value)),
        )
    }
}
