use super::error::CliError;
use crate::config::ManagerConfig;
use crate::k8s::client::AsyncK8sClient;
use crate::storage_migration::StorageVersionMigrator;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runs the storage version migration against the cluster. Ctrl-C cancels it between retries.
pub async fn migrate(config: &ManagerConfig) -> Result<(), CliError> {
    let client = AsyncK8sClient::try_new(&config.k8s).await?;
    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, canceling storage version migration");
                token.cancel();
            }
        }
    });

    StorageVersionMigrator::new(client)
        .migrate_if_needed(token)
        .await?;
    info!("storage version migration finished");
    Ok(())
}
