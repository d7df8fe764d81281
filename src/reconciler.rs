use crate::error::Result;
use crate::planner::{self, Plan};
use crate::policy::ResourcePolicy;
use crate::record::Record;
use crate::store::BackingStore;
use crate::wait::PollConfig;

/// Drives a backing store towards a desired list of records.
///
/// Every call lists the live state first, nothing is cached between calls.
/// Calls against the same store must not overlap.
pub struct Reconciler<S, P> {
    store: S,
    policy: P,
    poll: PollConfig,
}

impl<S, P> Reconciler<S, P>
where
    S: BackingStore,
    P: ResourcePolicy,
{
    pub fn new(store: S, policy: P) -> Self {
        Self {
            store,
            policy,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Plan against the live state, without changing anything.
    pub async fn check(&self, needed: &[Record], purge: bool) -> Result<Plan> {
        let existing = self.store.list_all().await?;
        planner::plan(&existing, needed, &self.policy, purge)
    }

    /// Ensure the needed records exist, waiting for them to become ready.
    pub async fn ensure(&self, needed: &[Record]) -> Result<Vec<Record>> {
        self.reconcile(needed, false, true).await
    }

    /// Delete and create until the store holds what `needed` asks for.
    ///
    /// Existing records may be deleted and replaced. Returns the created
    /// records. Nothing is rolled back on failure; calling again with the
    /// same records picks up where the failed call stopped.
    pub async fn reconcile(&self, needed: &[Record], purge: bool, wait: bool) -> Result<Vec<Record>> {
        let plan = self.check(needed, purge).await?;

        log::info!(
            "Reconciling {}: retain {}, delete {}, create {}",
            self.store.kind(),
            plan.retain.len(),
            plan.delete.len(),
            plan.create.len()
        );

        // removal always settles first, leftovers could obstruct the new records
        self.delete(&plan.delete, true).await?;
        self.create(&plan.create, wait).await
    }

    pub async fn create(&self, records: &[Record], wait: bool) -> Result<Vec<Record>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let created = self.store.batch_create(records).await?;
        if wait && !self.store.is_instantaneous() {
            let keys = self.store.keys(&created)?;
            self.store.wait_until_ready(&keys, &self.poll).await?;
        }
        Ok(created)
    }

    pub async fn delete(&self, records: &[Record], wait: bool) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let keys = self.store.keys(records)?;
        self.store.batch_delete(records).await?;
        if wait && !self.store.is_instantaneous() {
            self.store.wait_until_deleted(&keys, &self.poll).await?;
        }
        Ok(())
    }
}
