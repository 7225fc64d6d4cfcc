//! Streaming video player with theater, mini and floating display modes.
//! Built with Rust + egui (eframe) + GStreamer.

#![windows_subsystem = "windows"]

mod app;
mod config;
mod drag_resize;
mod gst_backend;
mod media;
mod mode;
mod persistence;
mod pip;
mod playback;
mod timer;
mod ui;

use std::path::Path;

use eframe::egui;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use app::PlayerApp;
use config::Config;
use gst_backend::GstMediaElement;
use media::{MediaElement, MediaFactory};
use mode::OpenRequest;
use persistence::{MemoryPositionStore, PositionStore, RedbPositionStore};

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let Some(request) = parse_args() else {
        eprintln!("usage: rust-stream-player <url-or-file> [--title <title>] [--poster <path>] [--description <text>]");
        std::process::exit(2);
    };

    if let Err(e) = gstreamer::init() {
        eprintln!("failed to initialize gstreamer: {e}");
        std::process::exit(1);
    }

    let config = Config::load();

    let store: Box<dyn PositionStore> = match RedbPositionStore::open(&Config::placement_db_path())
    {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("placement store unavailable, running without persistence: {e}");
            Box::new(MemoryPositionStore::new())
        }
    };

    let factory: MediaFactory = Box::new(|uri| {
        GstMediaElement::new(uri).map(|element| Box::new(element) as Box<dyn MediaElement>)
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(&request.title)
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([480.0, 270.0])
            .with_icon(build_app_icon()),
        ..Default::default()
    };

    eframe::run_native(
        "Stream Player",
        options,
        Box::new(move |cc| Ok(Box::new(PlayerApp::new(cc, request, factory, store, config)))),
    )
}

/// Positional source plus optional metadata flags.
fn parse_args() -> Option<OpenRequest> {
    let mut source = None;
    let mut title = None;
    let mut poster = None;
    let mut description = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--title" => title = args.next(),
            "--poster" => poster = args.next(),
            "--description" => description = args.next(),
            _ if source.is_none() => source = Some(arg),
            _ => return None,
        }
    }

    let source = source?;
    let source_url = to_uri(&source);
    let title = title.unwrap_or_else(|| {
        Path::new(&source)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone())
    });

    Some(OpenRequest {
        source_url,
        title,
        poster_url: poster,
        description,
    })
}

/// Local paths become file URIs; anything with a scheme passes through.
fn to_uri(source: &str) -> String {
    if source.contains("://") {
        return source.to_string();
    }
    let path = Path::new(source);
    let absolute = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    gstreamer::glib::filename_to_uri(&absolute, None)
        .map(|uri| uri.to_string())
        .unwrap_or_else(|_| format!("file://{}", absolute.display()))
}

fn build_app_icon() -> egui::IconData {
    let w: usize = 64;
    let h: usize = 64;
    let mut rgba = vec![0u8; w * h * 4];

    // Simple play-triangle glyph on a transparent background.
    for y in 0..h {
        for x in 0..w {
            let fx = x as f32;
            let fy = y as f32;
            let left = 20.0;
            let right = 48.0;
            let mid = h as f32 / 2.0;
            // Triangle: apex on the right, base on the left.
            let progress = ((fx - left) / (right - left)).clamp(0.0, 1.0);
            let half_height = 16.0 * (1.0 - progress);
            if fx >= left && fx <= right && (fy - mid).abs() <= half_height {
                let idx = (y * w + x) * 4;
                rgba[idx] = 255;
                rgba[idx + 1] = 255;
                rgba[idx + 2] = 255;
                rgba[idx + 3] = 235;
            }
        }
    }

    egui::IconData {
        rgba,
        width: w as u32,
        height: h as u32,
    }
}
