pub mod client;
pub mod config;
pub mod error;
pub mod kind;
pub mod planner;
pub mod policy;
pub mod record;
pub mod reconciler;
pub mod set;
pub mod store;
pub mod wait;

mod operator;

pub use client::{ApiClient, ApiClientBuilder};
pub use error::{ClientError, EnsureError};
pub use kind::ResourceKind;
pub use operator::*;
pub use planner::{plan, Plan};
pub use policy::{FieldPolicy, FnPolicy, ResourcePolicy};
pub use reconciler::Reconciler;
pub use record::Record;
pub use store::{ApiStore, BackingStore};
pub use wait::PollConfig;

use crate::config::Secret;
use anyhow::Context;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Config {
    api: ApiConfig,
    operator: OperatorConfig,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// API URL, the public endpoint by default
    #[serde(default)]
    url: Option<Url>,

    /// Token for authenticating to the API
    token: Secret,

    /// Timeout of a single request
    #[serde(default, with = "humantime_serde")]
    timeout: Option<Duration>,

    /// Polling for ready and deleted resources
    #[serde(default)]
    poll: PollConfig,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorConfig {
    /// Path to the manifest of desired resources, relative to the config file
    manifest: PathBuf,

    /// Interval reconciling resources, reconciles once if missing
    #[serde(default, with = "humantime_serde")]
    interval: Option<Duration>,
}

impl Config {
    /// Load the configuration, resolving the manifest path against the
    /// config file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("open config {}", path.display()))?;
        let mut config: Config = serde_yaml::from_reader(file)
            .with_context(|| format!("parse config {}", path.display()))?;

        if config.operator.manifest.is_relative() {
            if let Some(dir) = path.parent() {
                config.operator.manifest = dir.join(&config.operator.manifest);
            }
        }

        Ok(config)
    }
}

impl ApiConfig {
    pub fn client(&self) -> anyhow::Result<ApiClient> {
        let url = match &self.url {
            Some(url) => url.clone(),
            None => Url::parse(client::API_URL)?,
        };
        Ok(ApiClientBuilder::from_url(url)
            .token(self.token.expose())
            .timeout(self.timeout)
            .build()?)
    }
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    log::info!("Config: {config:#?}");

    let client = config.api.client().context("Failed to create API client")?;
    let manifest = config::load(&config.operator.manifest)?;

    log::info!("Starting operator");

    let operator = Operator::new(
        client,
        manifest,
        config.api.poll.clone(),
        config.operator.interval,
    );

    operator.run().await?;

    Ok(())
}
