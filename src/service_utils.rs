use crate::models::ProbeSummary;
use crate::mqtt_service::MqttService;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Start the probe service
pub fn start_probe_service(service: Arc<MqttService>) -> JoinHandle<ProbeSummary> {
    tokio::spawn(async move { service.run().await })
}

/// Wait for a termination signal and stop the probe
pub async fn handle_shutdown(service: Arc<MqttService>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to handle termination signal: {:?}", e);
    }

    info!("Termination signal received, stopping the probe...");
    service.shutdown();
}
