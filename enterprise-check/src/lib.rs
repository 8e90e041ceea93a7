pub mod classification;
pub mod config;
pub mod directory;
pub mod errors;
pub mod metrics_defs;
pub mod service;

#[cfg(test)]
mod testutils;

use errors::EnterpriseCheckError;
use service::{EnterpriseCheck, EnterpriseCheckService};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

pub async fn run(config: config::Config) -> Result<(), EnterpriseCheckError> {
    let check = Arc::new(EnterpriseCheck::from_config(&config)?);

    let ready_check = check.clone();
    let admin_service =
        AdminService::<_, EnterpriseCheckError>::new(move || ready_check.has_credential());
    let check_service = EnterpriseCheckService::new(check, config.path.clone());

    tracing::info!(path = %config.path, "starting enterprise check");

    let check_task = run_http_service(&config.listener.host, config.listener.port, check_service);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(check_task, admin_task)?;
    Ok(())
}
