use crate::client::ApiClient;
use crate::error::{EnsureError, Result};
use crate::kind::ResourceKind;
use crate::record::{self, Record};
use crate::wait::PollConfig;
use async_trait::async_trait;

/// Where the resources of one kind live.
#[async_trait]
pub trait BackingStore {
    /// Name used in logs and errors.
    fn kind(&self) -> &str;

    /// Field carrying the identifier assigned by the store.
    fn primary_key(&self) -> &str;

    /// Whether create and delete settle immediately.
    fn is_instantaneous(&self) -> bool;

    async fn list_all(&self) -> Result<Vec<Record>>;

    /// Create the records, returning them in creation order with keys
    /// assigned.
    async fn batch_create(&self, records: &[Record]) -> Result<Vec<Record>>;

    async fn batch_delete(&self, records: &[Record]) -> Result<()>;

    async fn wait_until_ready(&self, keys: &[String], poll: &PollConfig) -> Result<()>;

    async fn wait_until_deleted(&self, keys: &[String], poll: &PollConfig) -> Result<()>;

    /// Primary keys of the records, failing on a record without one.
    fn keys(&self, records: &[Record]) -> Result<Vec<String>> {
        records
            .iter()
            .map(|r| {
                record::key(r, self.primary_key()).ok_or_else(|| EnsureError::MissingKey {
                    kind: self.kind().to_string(),
                    key: self.primary_key().to_string(),
                })
            })
            .collect()
    }
}

/// The API's resources of one kind.
#[derive(Clone, Debug)]
pub struct ApiStore {
    client: ApiClient,
    kind: ResourceKind,
    embed: Vec<String>,
}

impl ApiStore {
    pub fn new(client: ApiClient, kind: ResourceKind) -> Self {
        Self {
            client,
            kind,
            embed: Vec::new(),
        }
    }

    /// Expand these references when listing, so policies can compare
    /// nested fields.
    pub fn embed<I, S>(mut self, embed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.embed = embed.into_iter().map(Into::into).collect();
        self
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.kind
    }
}

#[async_trait]
impl BackingStore for ApiStore {
    fn kind(&self) -> &str {
        self.kind.model_name()
    }

    fn primary_key(&self) -> &str {
        self.kind.primary_key()
    }

    fn is_instantaneous(&self) -> bool {
        self.kind.is_instantaneous()
    }

    async fn list_all(&self) -> Result<Vec<Record>> {
        let embed: Vec<&str> = self.embed.iter().map(String::as_str).collect();
        Ok(self.client.list(self.kind, &embed).await?)
    }

    async fn batch_create(&self, records: &[Record]) -> Result<Vec<Record>> {
        Ok(self.client.create(self.kind, records).await?)
    }

    async fn batch_delete(&self, records: &[Record]) -> Result<()> {
        // fail before sending anything if a key is missing
        self.keys(records)?;
        Ok(self.client.delete(self.kind, records).await?)
    }

    async fn wait_until_ready(&self, keys: &[String], poll: &PollConfig) -> Result<()> {
        self.client.wait_ready(self.kind, keys, poll).await
    }

    async fn wait_until_deleted(&self, keys: &[String], poll: &PollConfig) -> Result<()> {
        self.client.wait_deleted(self.kind, keys, poll).await
    }
}
