/// Asset download with progress reporting
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{ReadableStreamDefaultReader, Response};

use crate::dom;
use crate::error::{describe, ViewerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl Progress {
    /// Percentage complete, when the total is known
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(self.loaded as f64 / total as f64 * 100.0),
            _ => None,
        }
    }
}

/// GET `url` and collect the body.
///
/// `progress` is called after every received chunk while `Content-Length` is known.
pub async fn fetch_bytes(
    url: &str,
    progress: Option<&dyn Fn(Progress)>,
) -> Result<Vec<u8>, ViewerError> {
    let js_err = |err: JsValue| ViewerError::fetch(url, describe(&err));

    let response = JsFuture::from(dom::window()?.fetch_with_str(url))
        .await
        .map_err(js_err)?;
    let response: Response = response.dyn_into().map_err(js_err)?;
    if !response.ok() {
        return Err(ViewerError::fetch(
            url,
            format!("HTTP {} {}", response.status(), response.status_text()),
        ));
    }

    let total = response
        .headers()
        .get("content-length")
        .ok()
        .flatten()
        .and_then(|length| length.trim().parse::<u64>().ok());
    tracing::debug!(url, ?total, "response received");

    let Some(body) = response.body() else {
        // No streaming support: one buffer, one progress report
        let buffer = JsFuture::from(response.array_buffer().map_err(js_err)?)
            .await
            .map_err(js_err)?;
        let bytes = Uint8Array::new(&buffer).to_vec();
        report(progress, bytes.len() as u64, total);
        return Ok(bytes);
    };

    let reader: ReadableStreamDefaultReader = body
        .get_reader()
        .dyn_into()
        .map_err(|reader| js_err(reader.into()))?;
    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    loop {
        let chunk = JsFuture::from(reader.read()).await.map_err(js_err)?;
        let done = Reflect::get(&chunk, &JsValue::from_str("done"))
            .map_err(js_err)?
            .as_bool()
            .unwrap_or(true);
        if done {
            break;
        }

        let value = Reflect::get(&chunk, &JsValue::from_str("value")).map_err(js_err)?;
        let value: Uint8Array = value.dyn_into().map_err(js_err)?;
        let start = bytes.len();
        bytes.resize(start + value.length() as usize, 0);
        value.copy_to(&mut bytes[start..]);
        report(progress, bytes.len() as u64, total);
    }

    tracing::debug!(url, bytes = bytes.len(), "download complete");
    Ok(bytes)
}

fn report(progress: Option<&dyn Fn(Progress)>, loaded: u64, total: Option<u64>) {
    if let (Some(progress), Some(_)) = (progress, total) {
        progress(Progress { loaded, total });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        let progress = Progress {
            loaded: 512,
            total: Some(2048),
        };
        assert_eq!(progress.percent(), Some(25.0));
        assert_eq!(format!("{:.1}", progress.percent().unwrap()), "25.0");

        let unknown = Progress {
            loaded: 512,
            total: None,
        };
        assert_eq!(unknown.percent(), None);
        let empty = Progress {
            loaded: 0,
            total: Some(0),
        };
        assert_eq!(empty.percent(), None);
    }
}
