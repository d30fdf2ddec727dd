mod attempt_tracker;
mod config;
mod models;
mod mqtt_service;
mod service_utils;

use crate::attempt_tracker::SharedState;
use crate::config::Config;
use crate::mqtt_service::MqttService;
use crate::service_utils::{handle_shutdown, start_probe_service};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Error loading configuration: {:?}", e);
            return;
        }
    };

    // Shared state for attempt tracking
    let state: SharedState = Arc::new(Mutex::new(Vec::new()));

    let service = MqttService::new(state.clone(), config);

    let mut probe_task = start_probe_service(service.clone());

    tokio::select! {
        result = &mut probe_task => match result {
            Ok(summary) => info!("Probe finished: {:?}", summary),
            Err(e) => error!("Probe task failed: {:?}", e),
        },
        _ = handle_shutdown(service.clone()) => {
            match probe_task.await {
                Ok(summary) => info!("Probe stopped: {:?}", summary),
                Err(e) => error!("Probe task failed: {:?}", e),
            }
        }
    }

    info!("Probe shut down successfully.");
}
