use crate::client::ApiClient;
use crate::config::{Entry, Manifest};
use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::store::ApiStore;
use crate::wait::PollConfig;
use tokio::time::{Duration, MissedTickBehavior};

/// Applies a manifest against the API, once or periodically.
pub struct Operator {
    client: ApiClient,
    manifest: Manifest,
    poll: PollConfig,
    interval: Option<Duration>,
}

impl Operator {
    pub fn new(
        client: ApiClient,
        manifest: Manifest,
        poll: PollConfig,
        interval: Option<Duration>,
    ) -> Self {
        Self {
            client,
            manifest,
            poll,
            interval,
        }
    }

    async fn reconcile_entry(&self, entry: &Entry) -> Result<()> {
        let store = ApiStore::new(self.client.clone(), entry.kind).embed(entry.embed.iter().cloned());
        let reconciler = Reconciler::new(store, entry.policy()).with_poll(self.poll.clone());

        let created = reconciler
            .reconcile(&entry.items, entry.purge, entry.wait)
            .await?;
        log::info!("Reconciled {}: created {}", entry.kind.plural(), created.len());
        Ok(())
    }

    /// Reconcile every entry in manifest order, stopping at the first failure.
    pub async fn reconcile_all(&self) -> Result<()> {
        for entry in &self.manifest.resources {
            log::info!("Handle {} ({} items)", entry.kind.plural(), entry.items.len());
            self.reconcile_entry(entry).await?;
        }

        Ok(())
    }

    pub async fn run(&self) -> Result<()> {
        let period = match self.interval {
            Some(period) => period,
            None => return self.reconcile_all().await,
        };

        log::info!(
            "Reconciling resources with interval {}",
            humantime::format_duration(period)
        );
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            if let Err(err) = self.reconcile_all().await {
                log::warn!("Periodic reconcile failed: {err}");
            }
        }
    }
}
