//! Encodes the newest camera frame into the vision feed.

use std::sync::Arc;

use dronegpt_sdk::RawFrame;
use tokio::sync::{broadcast, watch};

use crate::state::VisionFeed;

/// Start the vision ingest loop. Frames that arrive while one is being
/// encoded are skipped; only the newest is ever encoded.
pub async fn run_vision_loop(
    feed: Arc<VisionFeed>,
    mut frames: watch::Receiver<Option<RawFrame>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Vision loop shutting down");
                break;
            }
            changed = frames.changed() => {
                if changed.is_err() {
                    tracing::warn!("Camera closed its frame stream");
                    break;
                }
                let Some(frame) = frames.borrow_and_update().clone() else {
                    continue;
                };

                let feed = feed.clone();
                match tokio::task::spawn_blocking(move || feed.update_frame(&frame)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => tracing::warn!("Dropped camera frame: {}", err),
                    Err(err) => tracing::warn!("Frame encoder task failed: {}", err),
                }
            }
        }
    }
}
