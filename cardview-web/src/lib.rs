/// Cardview Web - WebAssembly front end for the card and gallery viewers
///
/// Both viewers render with WebGL2 into canvases appended to page containers.
/// Failures while loading degrade the scene and are logged to the console;
/// only a malformed JSON configuration is reported back to JavaScript.
use cardview_core::{CardConfig, GalleryConfig};
use wasm_bindgen::prelude::*;

pub mod card;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod gallery;
pub mod logging;
pub mod renderer;
mod shaders;
pub mod viewport;

pub use error::ViewerError;

#[wasm_bindgen(start)]
pub fn main() {
    logging::init_logger();
}

/// Start the business card viewer. `config` is optional JSON overriding the defaults.
#[wasm_bindgen]
pub fn start_card_viewer(config: Option<String>) -> Result<(), JsValue> {
    let config = match config {
        Some(json) => CardConfig::from_json(&json).map_err(ViewerError::from)?,
        None => CardConfig::default(),
    };
    card::start(config);
    Ok(())
}

/// Start the model gallery. `config` is optional JSON overriding the defaults.
#[wasm_bindgen]
pub fn start_gallery(config: Option<String>) -> Result<(), JsValue> {
    let config = match config {
        Some(json) => GalleryConfig::from_json(&json).map_err(ViewerError::from)?,
        None => GalleryConfig::default(),
    };
    if let Err(err) = gallery::start(config) {
        tracing::error!(error = %err, "failed to start gallery");
    }
    Ok(())
}
