//! remit background worker
//!
//! Handles scheduled jobs including:
//! - Pending invoice settlement on the billing cadence (per-customer fan-out)
//! - Stale payment fence reclaim (hourly)
//! - Health check heartbeat (every 5 minutes)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use remit_billing::{Billing, BillingConfig, HttpPaymentProvider};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    info!("Starting remit worker");

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let provider_url =
        std::env::var("PAYMENT_PROVIDER_URL").context("PAYMENT_PROVIDER_URL must be set")?;

    let pool = remit_shared::create_pool(&database_url).await?;
    remit_shared::run_migrations(&pool).await?;

    let config = BillingConfig::from_env();
    let cron = config.cron.clone();
    let fence_reclaim_after = config.fence_reclaim_after;

    let provider = Arc::new(HttpPaymentProvider::new(&provider_url)?);
    let billing = Arc::new(Billing::from_pool(pool, provider, config));

    // Create scheduler
    let scheduler = JobScheduler::new().await?;

    // Job 1: settle pending invoices on the billing cadence
    let payments = billing.scheduler.clone();
    scheduler
        .add(Job::new_async(cron.as_str(), move |_uuid, _l| {
            let payments = payments.clone();
            Box::pin(async move {
                payments.run_cycle().await;
            })
        })?)
        .await?;
    info!(cron = %cron, "Scheduled: pending invoice settlement");

    // Job 2: release stale payment fences (hourly)
    // A fence left behind by a crashed attempt would block its invoice
    // forever; the reclaim age must exceed the longest possible attempt.
    let invoices = billing.invoices.clone();
    scheduler
        .add(Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let invoices = invoices.clone();
            Box::pin(async move {
                match invoices.release_stale_fences(fence_reclaim_after).await {
                    Ok(released) => info!(released = released, "Stale fence reclaim complete"),
                    Err(e) => error!(error = %e, "Stale fence reclaim failed"),
                }
            })
        })?)
        .await?;
    info!("Scheduled: stale fence reclaim (hourly)");

    // Job 3: Health check heartbeat (every 5 minutes)
    scheduler
        .add(Job::new_async("0 */5 * * * *", |_uuid, _l| {
            Box::pin(async move {
                info!("Worker heartbeat - all systems operational");
            })
        })?)
        .await?;
    info!("Scheduled: heartbeat (every 5 minutes)");

    // Start the scheduler
    info!("Starting job scheduler");
    scheduler.start().await?;

    info!("remit worker started successfully with 3 scheduled jobs");

    // Keep the main task running
    // The scheduler runs jobs in background tasks
    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}
