/// Business card viewer: rises into view, tilts with the page scroll and links out on click
use std::cell::RefCell;
use std::rc::Rc;

use cardview_core::{fallback, CardConfig, Motion};
use wasm_bindgen::JsCast;
use web_sys::{Event, MouseEvent};

use crate::dom::{self, StatusIndicator};
use crate::error::ViewerError;
use crate::fetch::Progress;
use crate::viewport::{self, FrameLoop, Viewport};

struct CardViewer {
    viewport: RefCell<Viewport>,
    motion: RefCell<Motion>,
    link_url: String,
    status: StatusIndicator,
}

impl CardViewer {
    fn tick(&self) {
        let mut viewport = self.viewport.borrow_mut();
        if let Some(object) = viewport.object_mut() {
            self.motion.borrow_mut().tick(&mut object.pose);
        }
        viewport.render();
    }

    fn hit(&self, event: &Event) -> Option<bool> {
        let event = event.dyn_ref::<MouseEvent>()?;
        let viewport = self.viewport.borrow();
        if !viewport.has_object() {
            return None;
        }
        Some(
            viewport
                .pick(event.client_x() as f32, event.client_y() as f32)
                .is_some(),
        )
    }

    fn on_click(&self, event: &Event) {
        if self.hit(event) == Some(true) {
            dom::open_in_new_tab(&self.link_url);
        }
    }

    fn on_hover(&self, event: &Event) {
        if let Some(hit) = self.hit(event) {
            dom::set_cursor_pointer(hit);
        }
    }
}

pub fn start(config: CardConfig) {
    let status = StatusIndicator::new(&config.loading_text_id, &config.preload_text_id);

    let viewport = match Viewport::mount(&config.viewport) {
        Ok(viewport) => viewport,
        Err(ViewerError::ContainerMissing(id)) => {
            tracing::error!(container = %id, "Container element not found!");
            status.set("Error: Container not found");
            return;
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to create card viewer");
            return;
        }
    };

    let viewer = Rc::new(CardViewer {
        viewport: RefCell::new(viewport),
        motion: RefCell::new(Motion::new(&config.viewport.behavior)),
        link_url: config.link_url.clone(),
        status,
    });

    if let Err(err) = install(&viewer) {
        tracing::error!(error = %err, "failed to start card viewer");
        return;
    }

    spawn_load(viewer, config);
}

/// Page listeners and the frame loop, registered once
fn install(viewer: &Rc<CardViewer>) -> Result<(), ViewerError> {
    let window = dom::window()?;

    let resize = Rc::clone(viewer);
    dom::listen(&window, "resize", move |_| resize.viewport.borrow_mut().resize())?;

    let scroll = Rc::clone(viewer);
    dom::listen(&window, "scroll", move |_| {
        scroll.motion.borrow_mut().on_scroll(dom::scroll_offset());
    })?;

    let click = Rc::clone(viewer);
    dom::listen(&window, "click", move |event| click.on_click(&event))?;

    let hover = Rc::clone(viewer);
    dom::listen(&window, "mousemove", move |event| hover.on_hover(&event))?;

    let frame = Rc::clone(viewer);
    FrameLoop::start(move || frame.tick())
}

fn spawn_load(viewer: Rc<CardViewer>, config: CardConfig) {
    let config = config.viewport;
    let name = config.asset_name().to_string();

    if let Err(err) = viewer.motion.borrow_mut().begin_loading() {
        tracing::warn!(error = %err, "unexpected card phase");
    }
    viewer.status.set(&format!("Loading {name}..."));

    wasm_bindgen_futures::spawn_local(async move {
        let progress = |progress: Progress| {
            if let Some(percent) = progress.percent() {
                viewer.status.set(&format!("Loading {name}... {percent:.1}%"));
            }
        };

        let loaded = match viewport::load_asset(&config.asset_path, Some(&progress)).await {
            Ok(mut object) => viewport::prepare_object(&mut object, &config).map(|()| object),
            Err(err) => Err(err),
        };

        let (mut object, is_fallback) = match loaded {
            Ok(object) => {
                tracing::info!("{name} loaded successfully!");
                viewer.status.set("Card loaded successfully!");
                (object, false)
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to load {name}");
                viewer
                    .status
                    .set(&format!("Failed to load {name}, creating fallback..."));
                (fallback::business_card(), true)
            }
        };

        if let Err(err) = viewer.motion.borrow_mut().place(&mut object.pose, is_fallback) {
            tracing::warn!(error = %err, "unexpected card phase");
        }
        if let Err(err) = viewer.viewport.borrow_mut().set_object(object) {
            tracing::error!(error = %err, "failed to show card");
            return;
        }

        if is_fallback {
            tracing::info!("Fallback business card created!");
            viewer.status.set("Fallback card created successfully!");
        }
        viewer.status.finish();
    });
}
