/// Cardview Terminal - preview the business card or a gallery model as ASCII art
///
/// Usage: cardview-terminal [--spin] [<asset>]
///
/// Without an asset (or when it fails to load) the procedural business card is shown.
/// Controls:
///   - Up/Down: Scroll the page (card mode)
///   - Q/ESC: Quit
use std::env;
use std::io;
use std::path::PathBuf;

use cardview_core::{fallback, CardConfig, ViewportConfig};
use cardview_terminal::{load_asset, log_writer, TerminalApp};
use tracing_subscriber::EnvFilter;

struct Args {
    spin: bool,
    asset: Option<PathBuf>,
}

impl Args {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Self {
            spin: false,
            asset: None,
        };
        for arg in args {
            match arg.as_str() {
                "--spin" => parsed.spin = true,
                flag if flag.starts_with('-') => return Err(format!("unknown option {flag}")),
                path if parsed.asset.is_none() => parsed.asset = Some(PathBuf::from(path)),
                extra => return Err(format!("unexpected argument {extra}")),
            }
        }
        Ok(parsed)
    }
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(log_writer)
        .init();

    let args = match Args::parse(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}\nUsage: cardview-terminal [--spin] [<asset>]");
            std::process::exit(2);
        }
    };

    let config = if args.spin {
        let path = args.asset.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
        ViewportConfig::gallery_entry("terminal", &path)
    } else {
        CardConfig::default().viewport
    };

    let loaded = args.asset.as_deref().map(|path| {
        tracing::info!(path = %path.display(), "loading asset");
        load_asset(path, &config)
    });
    let (object, is_fallback) = match loaded {
        Some(Ok(object)) => (object, false),
        Some(Err(err)) => {
            tracing::error!(error = %err, "failed to load asset, using the fallback card");
            (fallback::business_card(), true)
        }
        None => (fallback::business_card(), true),
    };
    tracing::info!(
        meshes = object.mesh_count(),
        triangles = object.triangle_count(),
        "starting preview (press Q to quit)"
    );

    let mut app = TerminalApp::new(object, &config.behavior, config.lighting.clone(), is_fallback)?;
    app.run()
}
