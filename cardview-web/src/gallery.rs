/// Gallery of independently spinning models, one per container
use std::cell::RefCell;
use std::rc::Rc;

use cardview_core::{GalleryConfig, Motion, ViewportConfig};

use crate::dom;
use crate::error::ViewerError;
use crate::viewport::{self, FrameLoop, Viewport};

/// Load every entry, after `DOMContentLoaded` if the page is still parsing
pub fn start(config: GalleryConfig) -> Result<(), ViewerError> {
    if dom::is_loading() {
        tracing::debug!("waiting for DOMContentLoaded");
        dom::listen_once(&*dom::document()?, "DOMContentLoaded", move || load_all(config))
    } else {
        load_all(config);
        Ok(())
    }
}

fn load_all(config: GalleryConfig) {
    for entry in config.entries {
        load_entry(entry);
    }
}

/// Failures stay local to this entry's container
fn load_entry(entry: ViewportConfig) {
    let viewport = match Viewport::mount(&entry) {
        Ok(viewport) => Rc::new(RefCell::new(viewport)),
        Err(ViewerError::ContainerMissing(id)) => {
            tracing::error!("Container with id \"{id}\" not found!");
            return;
        }
        Err(err) => {
            tracing::error!(container = %entry.container_id, error = %err, "failed to mount viewport");
            return;
        }
    };

    if let Some(url) = entry.lighting.environment_url.clone() {
        viewport::request_environment(&viewport, url);
    }

    let mut motion = Motion::new(&entry.behavior);
    if let Err(err) = motion.begin_loading() {
        tracing::warn!(error = %err, "unexpected phase");
    }

    wasm_bindgen_futures::spawn_local(async move {
        if let Err(err) = show(&viewport, &entry, motion).await {
            tracing::error!(error = %err, "Error loading {}", entry.asset_path);
        }
    });
}

async fn show(
    viewport: &Rc<RefCell<Viewport>>,
    entry: &ViewportConfig,
    mut motion: Motion,
) -> Result<(), ViewerError> {
    let mut object = viewport::load_asset(&entry.asset_path, None).await?;
    viewport::prepare_object(&mut object, entry)?;
    if let Err(err) = motion.place(&mut object.pose, false) {
        tracing::warn!(error = %err, "unexpected phase");
    }
    viewport.borrow_mut().set_object(object)?;
    tracing::debug!(path = %entry.asset_path, "model ready");

    let frame = Rc::clone(viewport);
    FrameLoop::start(move || {
        let mut viewport = frame.borrow_mut();
        if let Some(object) = viewport.object_mut() {
            motion.tick(&mut object.pose);
        }
        viewport.render();
    })?;

    let resize = Rc::clone(viewport);
    dom::listen(&*dom::window()?, "resize", move |_| resize.borrow_mut().resize())
}
