//! screenserve demo binary.
//!
//! Serves a looping slideshow of JPEG files as the "screen" so the full
//! lifecycle can be exercised without a capture pipeline:
//!
//! ```text
//! screenserve [frames-dir] [settings.json]
//! ```

use bytes::Bytes;
use screenserve::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const FRAME_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let frames_dir = args.next().unwrap_or_else(|| "frames".to_string());
    let settings = match args.next() {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => StreamSettings::new().background_color(0x212121),
    };

    let source = Arc::new(BroadcastFrameSource::new(8));
    spawn_slideshow(source.clone(), frames_dir);

    let server = StreamServer::with_defaults(source, Arc::new(LogReporter));
    server.configure(settings);
    server.start(BindAddress::any(8080));

    tracing::info!("open http://localhost:8080 - press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    server.stop();
    server.destroy();
    Ok(())
}

/// Publish the JPEG files found in `dir`, in name order, over and over.
fn spawn_slideshow(source: Arc<BroadcastFrameSource>, dir: String) {
    tokio::spawn(async move {
        let frames = load_jpegs(Path::new(&dir));
        if frames.is_empty() {
            tracing::warn!("no .jpg files in '{}', the stream will stay empty", dir);
            return;
        }
        tracing::info!("streaming {} frames from '{}'", frames.len(), dir);

        let mut ticker = tokio::time::interval(FRAME_INTERVAL);
        loop {
            for frame in &frames {
                ticker.tick().await;
                source.publish(frame.clone());
            }
        }
    });
}

fn load_jpegs(dir: &Path) -> Vec<Bytes> {
    let mut paths: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("jpg") | Some("jpeg")
                )
            })
            .collect(),
        Err(e) => {
            tracing::warn!("cannot read '{}': {}", dir.display(), e);
            return Vec::new();
        }
    };
    paths.sort();

    paths
        .iter()
        .filter_map(|path| match std::fs::read(path) {
            Ok(bytes) => Some(Bytes::from(bytes)),
            Err(e) => {
                tracing::warn!("skipping '{}': {}", path.display(), e);
                None
            }
        })
        .collect()
}
