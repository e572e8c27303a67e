use cardview_core::{ConfigError, HdrError, ModelError, NormalizeError};
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("container #{0} not found")]
    ContainerMissing(String),
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("cannot normalize asset: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("environment map: {0}")]
    Environment(#[from] HdrError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("WebGL: {0}")]
    Gl(String),
    #[error("JavaScript error: {0}")]
    Js(String),
}

impl ViewerError {
    pub fn fetch(url: &str, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<JsValue> for ViewerError {
    fn from(value: JsValue) -> Self {
        Self::Js(describe(&value))
    }
}

impl From<ViewerError> for JsValue {
    fn from(error: ViewerError) -> Self {
        js_sys::Error::new(&error.to_string()).into()
    }
}

/// Best-effort text for a thrown JavaScript value
pub fn describe(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}
