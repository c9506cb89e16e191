//! Follows the flight controller's change stream into the telemetry store.

use std::sync::Arc;

use dronegpt_sdk::KeyUpdate;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::state::TelemetryStore;

/// Start the telemetry ingest loop.
pub async fn run_telemetry_loop(
    store: Arc<TelemetryStore>,
    mut updates: broadcast::Receiver<KeyUpdate>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Telemetry loop shutting down");
                break;
            }
            update = updates.recv() => match update {
                Ok(update) => {
                    if let Some(sample) = update.value.to_sample() {
                        store.update(&sample);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Telemetry loop lagged, skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => {
                    tracing::warn!("Flight controller closed its update stream");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dronegpt_sdk::{FlightControllerKey, KeyValue, Velocity3D};

    #[tokio::test]
    async fn test_updates_reach_store() {
        let store = Arc::new(TelemetryStore::new());
        let (tx, rx) = broadcast::channel(8);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(run_telemetry_loop(store.clone(), rx, shutdown_rx));

        tx.send(KeyUpdate {
            key: FlightControllerKey::AircraftVelocity,
            value: KeyValue::Velocity3D(Velocity3D { x: 2.0, y: 0.5, z: 0.0 }),
        })
        .unwrap();
        tx.send(KeyUpdate {
            key: FlightControllerKey::CompassHeading,
            value: KeyValue::Heading(135.0),
        })
        .unwrap();
        drop(tx);
        task.await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.x_velocity, Some(2.0));
        assert_eq!(state.compass_heading, Some(135.0));
        drop(shutdown_tx);
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let store = Arc::new(TelemetryStore::new());
        let (_tx, rx) = broadcast::channel::<KeyUpdate>(8);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(run_telemetry_loop(store, rx, shutdown_rx));

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }
}
