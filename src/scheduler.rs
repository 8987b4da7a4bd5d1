use std::sync::Arc;

use anyhow::Context as _;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::global::Global;

#[tracing::instrument(name = "Scheduler", skip_all)]
pub async fn run(global: Arc<Global>) -> anyhow::Result<()> {
    let config = &global.config.subscriptions;

    if !config.enabled {
        tracing::info!("scheduled subscription refresh is disabled");
        // Park forever so tokio::select doesn't exit
        std::future::pending::<()>().await;
        return Ok(());
    }

    let sched = JobScheduler::new()
        .await
        .context("failed to create job scheduler")?;

    let service = global.subscriptions.clone();
    let job = Job::new_async(config.refresh_cron.as_str(), move |_, _| {
        let service = service.clone();
        Box::pin(async move {
            tracing::info!("running scheduled subscription refresh");
            match service.update_subscription_data().await {
                Ok(summary) => tracing::info!(
                    matched = summary.games_matched,
                    total = summary.games_processed,
                    degraded = summary.degraded.len(),
                    "scheduled subscription refresh complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduled subscription refresh failed"),
            }
        })
    })
    .with_context(|| format!("invalid refresh cron {:?}", config.refresh_cron))?;

    sched.add(job).await.context("failed to add refresh job")?;
    sched.start().await.context("failed to start job scheduler")?;

    tracing::info!(cron = %config.refresh_cron, "subscription refresh scheduled");

    std::future::pending::<()>().await;
    Ok(())
}
