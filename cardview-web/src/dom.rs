/// Thin wrappers over the page the viewers live in
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Document, Element, Event, EventTarget, HtmlElement, Window};

use crate::error::ViewerError;

pub fn window() -> Result<Window, ViewerError> {
    web_sys::window().ok_or_else(|| ViewerError::Js("no global window".to_string()))
}

pub fn document() -> Result<Document, ViewerError> {
    window()?
        .document()
        .ok_or_else(|| ViewerError::Js("window has no document".to_string()))
}

pub fn container(id: &str) -> Result<Element, ViewerError> {
    document()?
        .get_element_by_id(id)
        .ok_or_else(|| ViewerError::ContainerMissing(id.to_string()))
}

fn html_element(id: &str) -> Option<HtmlElement> {
    document()
        .ok()?
        .get_element_by_id(id)?
        .dyn_into::<HtmlElement>()
        .ok()
}

pub fn is_loading() -> bool {
    document().map_or(false, |doc| doc.ready_state() == "loading")
}

/// Inner size of the browser window in CSS pixels
pub fn window_size() -> (u32, u32) {
    let Ok(window) = window() else {
        return (1, 1);
    };
    let dimension = |value: Result<wasm_bindgen::JsValue, wasm_bindgen::JsValue>| {
        value.ok().and_then(|v| v.as_f64()).unwrap_or(1.0) as u32
    };
    (dimension(window.inner_width()), dimension(window.inner_height()))
}

pub fn device_pixel_ratio() -> f64 {
    let ratio = window().map_or(1.0, |window| window.device_pixel_ratio());
    if ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

/// Vertical page scroll in pixels
pub fn scroll_offset() -> f32 {
    let Ok(window) = window() else {
        return 0.0;
    };
    match window.page_y_offset() {
        Ok(offset) if offset != 0.0 => offset as f32,
        _ => window
            .document()
            .and_then(|doc| doc.document_element())
            .map_or(0.0, |root| root.scroll_top() as f32),
    }
}

pub fn set_cursor_pointer(pointer: bool) {
    let Some(body) = document().ok().and_then(|doc| doc.body()) else {
        return;
    };
    let result = if pointer {
        body.style().set_property("cursor", "pointer")
    } else {
        body.style().remove_property("cursor").map(|_| ())
    };
    if let Err(err) = result {
        tracing::debug!(error = %crate::error::describe(&err), "failed to set cursor");
    }
}

pub fn open_in_new_tab(url: &str) {
    let opened = window().and_then(|window| {
        window
            .open_with_url_and_target(url, "_blank")
            .map_err(ViewerError::from)
    });
    match opened {
        Ok(_) => tracing::info!(url, "opened link"),
        Err(err) => tracing::warn!(url, error = %err, "failed to open link"),
    }
}

/// Register `handler` for the lifetime of the page
pub fn listen(
    target: &EventTarget,
    event: &str,
    handler: impl FnMut(Event) + 'static,
) -> Result<(), ViewerError> {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

/// Like [`listen`], for events that fire once
pub fn listen_once(
    target: &EventTarget,
    event: &str,
    handler: impl FnOnce() + 'static,
) -> Result<(), ViewerError> {
    let callback = Closure::once_into_js(handler);
    target.add_event_listener_with_callback(event, callback.unchecked_ref())?;
    Ok(())
}

/// Run `f` once after `millis`
pub fn set_timeout(millis: i32, f: impl FnOnce() + 'static) {
    let callback = Closure::once_into_js(f);
    let scheduled = window().and_then(|window| {
        window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis)
            .map_err(ViewerError::from)
    });
    if let Err(err) = scheduled {
        tracing::warn!(error = %err, "failed to schedule timeout");
    }
}

fn set_style(element: &HtmlElement, property: &str, value: &str) {
    if let Err(err) = element.style().set_property(property, value) {
        tracing::debug!(property, error = %crate::error::describe(&err), "failed to set style");
    }
}

/// The loading text and preload overlay of the card page. Both are optional.
pub struct StatusIndicator {
    loading: Option<HtmlElement>,
    preload: Option<HtmlElement>,
}

impl StatusIndicator {
    pub const PRELOAD_HIDE_MS: i32 = 700;
    pub const LOADING_FADE_MS: i32 = 1000;
    pub const LOADING_HIDE_MS: i32 = 500;

    pub fn new(loading_id: &str, preload_id: &str) -> Self {
        Self {
            loading: html_element(loading_id),
            preload: html_element(preload_id),
        }
    }

    pub fn set(&self, message: &str) {
        if let Some(loading) = &self.loading {
            loading.set_text_content(Some(message));
            tracing::info!("Status: {message}");
        }
    }

    /// Fade both elements out once the card is in the scene
    pub fn finish(&self) {
        if let Some(preload) = self.preload.clone() {
            set_style(&preload, "opacity", "0");
            set_timeout(Self::PRELOAD_HIDE_MS, move || {
                set_style(&preload, "display", "none");
            });
        }

        if let Some(loading) = self.loading.clone() {
            set_timeout(Self::LOADING_FADE_MS, move || {
                set_style(&loading, "opacity", "0");
                set_timeout(Self::LOADING_HIDE_MS, move || {
                    set_style(&loading, "display", "none");
                });
            });
        }
    }
}
