/// One canvas, camera and renderer inside a page container
use std::cell::RefCell;
use std::rc::Rc;

use cardview_core::lighting::EnvironmentLight;
use cardview_core::{hdr, model, Camera, DisplayedObject, Hit, Pointer, Sizing, ViewportConfig};
use nalgebra::Matrix4;
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Element, HtmlCanvasElement};

use crate::dom;
use crate::error::ViewerError;
use crate::fetch::{fetch_bytes, Progress};
use crate::renderer::Renderer;

pub struct Viewport {
    container: Element,
    canvas: HtmlCanvasElement,
    camera: Camera,
    renderer: Renderer,
    sizing: Sizing,
    object: Option<DisplayedObject>,
}

impl Viewport {
    /// Attach a fresh canvas to the configured container
    pub fn mount(config: &ViewportConfig) -> Result<Self, ViewerError> {
        let container = dom::container(&config.container_id)?;
        let canvas: HtmlCanvasElement = dom::document()?
            .create_element("canvas")?
            .dyn_into()
            .map_err(|_| ViewerError::Js("created element is not a canvas".to_string()))?;
        canvas.style().set_property("display", "block")?;
        container.append_child(&canvas)?;

        let renderer = Renderer::new(&canvas, config.lighting.clone())?;
        let mut viewport = Self {
            container,
            canvas,
            camera: Camera::page(1, 1),
            renderer,
            sizing: config.sizing,
            object: None,
        };
        viewport.resize();

        tracing::debug!(
            container = %config.container_id,
            width = viewport.canvas.width(),
            height = viewport.canvas.height(),
            "viewport mounted"
        );
        Ok(viewport)
    }

    /// Size in CSS pixels the drawing surface should cover
    fn css_size(&self) -> (u32, u32) {
        let (width, height) = match self.sizing {
            Sizing::Window => dom::window_size(),
            Sizing::Container { .. } => (
                self.container.client_width().max(0) as u32,
                self.container.client_height().max(0) as u32,
            ),
        };
        self.sizing.resolve(width, height)
    }

    /// Match the current window or container size. Only the aspect ratio of the camera changes.
    pub fn resize(&mut self) {
        let (width, height) = self.css_size();
        self.camera.set_viewport(width, height);

        let ratio = dom::device_pixel_ratio();
        let device_width = ((f64::from(width) * ratio).round() as u32).max(1);
        let device_height = ((f64::from(height) * ratio).round() as u32).max(1);
        self.canvas.set_width(device_width);
        self.canvas.set_height(device_height);

        let style = self.canvas.style();
        let css = style
            .set_property("width", &format!("{width}px"))
            .and_then(|_| style.set_property("height", &format!("{height}px")));
        if let Err(err) = css {
            tracing::debug!(error = %crate::error::describe(&err), "failed to size canvas");
        }

        self.renderer.resize(device_width, device_height);
    }

    pub fn has_object(&self) -> bool {
        self.object.is_some()
    }

    pub fn object_mut(&mut self) -> Option<&mut DisplayedObject> {
        self.object.as_mut()
    }

    /// Show `object`, replacing the previous one
    pub fn set_object(&mut self, object: DisplayedObject) -> Result<(), ViewerError> {
        self.renderer.upload(&object)?;
        self.object = Some(object);
        Ok(())
    }

    pub fn set_environment(&mut self, environment: EnvironmentLight) {
        self.renderer.set_environment(environment);
    }

    pub fn render(&self) {
        let model = self
            .object
            .as_ref()
            .map_or_else(Matrix4::identity, DisplayedObject::model_matrix);
        self.renderer.render(&self.camera, &model);
    }

    /// Nearest part of the object under a pointer given in client coordinates
    pub fn pick(&self, client_x: f32, client_y: f32) -> Option<Hit> {
        let object = self.object.as_ref()?;
        let rect = self.canvas.get_bounding_client_rect();
        let ndc = Pointer::from_client(
            client_x - rect.left() as f32,
            client_y - rect.top() as f32,
            rect.width() as f32,
            rect.height() as f32,
        );
        self.camera.ray_through(&ndc)?.intersect_object(object)
    }
}

/// Surface pass, then normalization, as configured
pub fn prepare_object(
    object: &mut DisplayedObject,
    config: &ViewportConfig,
) -> Result<(), ViewerError> {
    if let Some(policy) = &config.surfaces {
        object.prepare_surfaces(policy);
    }
    object.normalize(config.target_size)?;
    Ok(())
}

pub async fn load_asset(
    path: &str,
    progress: Option<&dyn Fn(Progress)>,
) -> Result<DisplayedObject, ViewerError> {
    let bytes = fetch_bytes(path, progress).await?;
    Ok(model::load_model(&bytes)?)
}

/// Fetch and decode an environment map in the background.
///
/// The scene renders without it until it arrives; failure is not an error.
pub fn request_environment(viewport: &Rc<RefCell<Viewport>>, url: String) {
    let viewport = Rc::clone(viewport);
    wasm_bindgen_futures::spawn_local(async move {
        let environment = async {
            let bytes = fetch_bytes(&url, None).await?;
            let image = hdr::decode(&bytes)?;
            Ok::<_, ViewerError>(EnvironmentLight::from_equirect(&image))
        };
        match environment.await {
            Ok(environment) => {
                tracing::debug!(url, sky = ?environment.sky, ground = ?environment.ground, "environment ready");
                viewport.borrow_mut().set_environment(environment);
            }
            Err(err) => tracing::debug!(url, error = %err, "environment map unavailable"),
        }
    });
}

/// Self-rescheduling `requestAnimationFrame` callback.
///
/// The closure holds a handle to itself, so the loop runs for the life of the page.
pub struct FrameLoop;

impl FrameLoop {
    pub fn start(mut tick: impl FnMut() + 'static) -> Result<(), ViewerError> {
        let f: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
        let g = f.clone();

        *g.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            tick();

            if let Some(callback) = f.borrow().as_ref() {
                if let Err(err) = request_frame(callback) {
                    tracing::error!(error = %err, "frame loop stopped");
                }
            }
        }) as Box<dyn FnMut()>));

        let started = match g.borrow().as_ref() {
            Some(callback) => request_frame(callback),
            None => Ok(()),
        };
        started
    }
}

fn request_frame(callback: &Closure<dyn FnMut()>) -> Result<(), ViewerError> {
    dom::window()?.request_animation_frame(callback.as_ref().unchecked_ref())?;
    Ok(())
}
