//! Cron-driven payment fan-out.
//!
//! Each cycle enumerates all customers and settles every customer's
//! `PENDING` invoices in an independent task; a task failure is logged at
//! the task boundary and never cancels siblings or the schedule itself.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::customers::CustomerService;
use crate::engine::BillingEngine;
use crate::error::BillingResult;

#[derive(Clone)]
pub struct PaymentScheduler {
    engine: BillingEngine,
    customers: CustomerService,
}

/// A running schedule; dropping it does not stop the jobs, call
/// [`ScheduleHandle::shutdown`] to stop them.
pub struct ScheduleHandle {
    scheduler: JobScheduler,
}

impl ScheduleHandle {
    pub async fn shutdown(mut self) -> BillingResult<()> {
        self.scheduler.shutdown().await?;
        Ok(())
    }
}

impl PaymentScheduler {
    pub fn new(engine: BillingEngine, customers: CustomerService) -> Self {
        Self { engine, customers }
    }

    /// Start the fan-out on a six-field cron cadence.
    ///
    /// With `recurring` the schedule fires until shut down; without it the
    /// schedule fires at the next cron match once and then stops itself.
    pub async fn schedule(&self, cron: &str, recurring: bool) -> BillingResult<ScheduleHandle> {
        let scheduler = JobScheduler::new().await?;
        let fired = Arc::new(Notify::new());

        let this = self.clone();
        let notify = fired.clone();
        let job = Job::new_async(cron, move |_uuid, _lock| {
            let this = this.clone();
            let notify = notify.clone();
            Box::pin(async move {
                this.run_cycle().await;
                notify.notify_one();
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;
        tracing::info!(cron = cron, recurring = recurring, "Payment schedule started");

        if !recurring {
            let mut one_shot = scheduler.clone();
            tokio::spawn(async move {
                fired.notified().await;
                if let Err(e) = one_shot.shutdown().await {
                    tracing::error!(error = %e, "Failed to stop one-shot payment schedule");
                }
            });
        }

        Ok(ScheduleHandle { scheduler })
    }

    /// Run one fan-out cycle now
    pub async fn run_cycle(&self) {
        tracing::info!("Start processing payment task");

        let customers = match self.customers.fetch_all().await {
            Ok(customers) => customers,
            Err(e) => {
                tracing::error!(error = %e, "Failed to enumerate customers for the billing cycle");
                return;
            }
        };

        let mut tasks = JoinSet::new();
        for customer in customers {
            let engine = self.engine.clone();
            tasks.spawn(async move {
                match engine
                    .process_invoices_by_customer(customer.id, None, None)
                    .await
                {
                    Ok(result) => tracing::info!(
                        customer_id = customer.id,
                        result = result,
                        "Processed invoices for customer"
                    ),
                    Err(e) => tracing::error!(
                        customer_id = customer.id,
                        error = %e,
                        "Error executing payments for customer"
                    ),
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Customer billing task aborted");
            }
        }

        tracing::info!("End processing payment task");
    }
}
