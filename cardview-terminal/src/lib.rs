/// Terminal preview of the card and gallery viewers
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use std::io::{self, stdout, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use cardview_core::{
    model, Camera, DisplayedObject, LightingProfile, ModelError, Motion, NormalizeError, PostLoad,
    ViewportConfig,
};
use thiserror::Error;

pub mod renderer;

pub use renderer::AsciiRenderer;
use renderer::CELL_ASPECT;

/// Pixels of page scroll per arrow key press
pub const SCROLL_STEP: f32 = 40.0;

static SCREEN_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Log sink that goes quiet while the alternate screen is up
pub fn log_writer() -> Box<dyn Write> {
    if SCREEN_ACTIVE.load(Ordering::Relaxed) {
        Box::new(io::sink())
    } else {
        Box::new(io::stderr())
    }
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("cannot read asset: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Read, decode and prepare an asset the way the page viewer would
pub fn load_asset(path: &Path, config: &ViewportConfig) -> Result<DisplayedObject, PreviewError> {
    let data = std::fs::read(path)?;
    let mut object = model::load_model(&data)?;
    if let Some(policy) = &config.surfaces {
        object.prepare_surfaces(policy);
    }
    object.normalize(config.target_size)?;
    Ok(object)
}

/// Main application struct for terminal rendering
pub struct TerminalApp {
    object: DisplayedObject,
    motion: Motion,
    lighting: LightingProfile,
    camera: Camera,
    renderer: AsciiRenderer,
    scroll: f32,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(
        mut object: DisplayedObject,
        behavior: &PostLoad,
        lighting: LightingProfile,
        is_fallback: bool,
    ) -> io::Result<Self> {
        let (width, height) = terminal::size()?;

        let mut motion = Motion::new(behavior);
        motion
            .begin_loading()
            .and_then(|()| motion.place(&mut object.pose, is_fallback))
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

        Ok(Self {
            object,
            motion,
            lighting,
            camera: Camera::page(u32::from(width), u32::from(height) * CELL_ASPECT),
            renderer: AsciiRenderer::new(usize::from(width), usize::from(height)),
            scroll: 0.0,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;
        SCREEN_ACTIVE.store(true, Ordering::Relaxed);

        let result = self.main_loop();

        // Cleanup
        SCREEN_ACTIVE.store(false, Ordering::Relaxed);
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 60);

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }

            self.motion.tick(&mut self.object.pose);
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => match code {
                KeyCode::Char('q') | KeyCode::Esc => self.running = false,
                KeyCode::Up => self.scroll_by(-SCROLL_STEP),
                KeyCode::Down => self.scroll_by(SCROLL_STEP),
                _ => {}
            },
            Event::Resize(width, height) => {
                self.camera
                    .set_viewport(u32::from(width), u32::from(height) * CELL_ASPECT);
                self.renderer.resize(usize::from(width), usize::from(height));
            }
            _ => {}
        }
    }

    /// Page scroll never goes above the top
    fn scroll_by(&mut self, delta: f32) {
        self.scroll = (self.scroll + delta).max(0.0);
        self.motion.on_scroll(self.scroll);
    }

    fn render(&mut self) -> io::Result<()> {
        self.renderer.clear();
        self.renderer
            .render_object(&self.object, &self.camera, &self.lighting);

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        let phase = match &self.motion {
            Motion::Card(card) => format!("{:?}", card.phase()),
            Motion::Spin { .. } => "Spinning".to_string(),
        };
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "Cardview | FPS: {:.1} | {phase} | scroll {}px | Up/Down=Scroll Q=Quit",
                self.fps, self.scroll
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardview_core::CardConfig;

    #[test]
    fn test_load_ascii_stl_asset() {
        let path = std::env::temp_dir().join(format!("cardview-{}.stl", std::process::id()));
        std::fs::write(
            &path,
            "solid plate
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 4 0 0
      vertex 0 2 0
    endloop
  endfacet
endsolid plate
",
        )
        .unwrap();

        let config = CardConfig::default().viewport;
        let object = load_asset(&path, &config);
        std::fs::remove_file(&path).unwrap();

        let object = object.unwrap();
        assert!((object.content_bounds().max_dimension() - config.target_size).abs() < 1e-4);
        // The card surface pass assigns a material to bare STL meshes
        assert!(object.parts[0].material.is_some());
    }

    #[test]
    fn test_missing_asset() {
        let config = CardConfig::default().viewport;
        let result = load_asset(Path::new("/nonexistent/card.glb"), &config);
        assert!(matches!(result, Err(PreviewError::Io(_))));
    }
}
