use crate::error::{ClientError, EnsureError};
use crate::kind::ResourceKind;
use crate::record::{self, Record};
use crate::wait::{wait_for, PollConfig, TerminalState};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{IntoUrl, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Duration;
use tracing::instrument;
use url::Url;

pub const API_URL: &str = "https://my.opalstack.com/api/v1";

#[derive(Clone, Debug)]
pub struct ApiClientBuilder {
    api: Url,
    token: Option<String>,
    timeout: Option<Duration>,
}

impl ApiClientBuilder {
    #[allow(unused)]
    pub fn new<U>(api: U) -> Result<Self, reqwest::Error>
    where
        U: IntoUrl,
    {
        Ok(Self::from_url(api.into_url()?))
    }

    pub fn from_url(api: Url) -> Self {
        Self {
            api,
            token: None,
            timeout: None,
        }
    }

    pub fn token<T: Into<String>>(mut self, token: T) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ApiClient, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Token {token}"))
                .map_err(|err| ClientError::Request(format!("invalid token: {err}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut client = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }

        Ok(ApiClient::new(client.build()?, self.api))
    }
}

/// Client for the hosting API.
///
/// Holds its own credentials; there is no process-wide client state.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    api: Url,
}

impl ApiClient {
    pub fn new(client: reqwest::Client, api: Url) -> Self {
        Self { client, api }
    }

    async fn request<R, F, FR, ResFut>(
        &self,
        method: Method,
        url: Url,
        request_handler: F,
        response_handler: FR,
    ) -> Result<R, ClientError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
        FR: FnOnce(Response) -> ResFut,
        ResFut: Future<Output = Result<R, ClientError>>,
    {
        log::debug!("Performing {method} {url}");
        let request = request_handler(self.client.request(method, url));
        let response = request.send().await?;

        response_handler(response).await
    }

    fn url(&self, path: &[&str], embed: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.api.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Request("Failed to build path".to_string()))?
            .pop_if_empty()
            .extend(path);
        if !embed.is_empty() {
            url.query_pairs_mut().append_pair("embed", &embed.join(","));
        }
        Ok(url)
    }

    async fn post<S, R>(&self, path: &[&str], payload: S) -> Result<R, ClientError>
    where
        S: Serialize,
        R: DeserializeOwned,
    {
        self.request(
            Method::POST,
            self.url(path, &[])?,
            json(payload),
            ok_response,
        )
        .await
    }

    /// List every resource of a kind.
    ///
    /// Some models list their resources grouped by role, those groups are
    /// flattened into a single sequence. Anything but a list in a group
    /// fails the listing.
    #[instrument(skip_all, err, fields(kind = %kind))]
    pub async fn list(&self, kind: ResourceKind, embed: &[&str]) -> Result<Vec<Record>, ClientError> {
        let listing: Value = self
            .request(
                Method::GET,
                self.url(&[kind.model_name(), "list", ""], embed)?,
                empty,
                ok_response,
            )
            .await?;
        flatten_listing(listing)
    }

    #[instrument(skip_all, err, fields(kind = %kind, id = id))]
    pub async fn read(
        &self,
        kind: ResourceKind,
        id: &str,
        embed: &[&str],
    ) -> Result<Option<Record>, ClientError> {
        self.request(
            Method::GET,
            self.url(&[kind.model_name(), "read", id], embed)?,
            empty,
            read_response,
        )
        .await
    }

    #[instrument(skip_all, err, fields(kind = %kind, count = records.len()))]
    pub async fn create(
        &self,
        kind: ResourceKind,
        records: &[Record],
    ) -> Result<Vec<Record>, ClientError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        log::info!("Creating {}: {:?}", kind.plural(), records);
        self.post(&[kind.model_name(), "create", ""], records).await
    }

    #[instrument(skip_all, err, fields(kind = %kind, count = records.len()))]
    pub async fn update(
        &self,
        kind: ResourceKind,
        records: &[Record],
    ) -> Result<Vec<Record>, ClientError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        log::info!("Updating {}: {:?}", kind.plural(), records);
        self.post(&[kind.model_name(), "update", ""], records).await
    }

    /// Request removal of the records, by primary key only.
    #[instrument(skip_all, err, fields(kind = %kind, count = records.len()))]
    pub async fn delete(&self, kind: ResourceKind, records: &[Record]) -> Result<(), ClientError> {
        if records.is_empty() {
            return Ok(());
        }
        log::info!("Deleting {}: {:?}", kind.plural(), records);
        let pk = kind.primary_key();
        let keys = records
            .iter()
            .map(|record| -> Result<Map<String, Value>, ClientError> {
                let value = record.get(pk).cloned().ok_or_else(|| {
                    ClientError::Request(format!("{kind} record without '{pk}'"))
                })?;
                let mut key = Map::new();
                key.insert(pk.to_string(), value);
                Ok(key)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.request(
            Method::POST,
            self.url(&[kind.model_name(), "delete", ""], &[])?,
            json(keys),
            discard_response,
        )
        .await
    }

    /// Latest web usage of the account's sites.
    #[instrument(skip_all, err)]
    pub async fn web_usage_latest(&self, embed: &[&str]) -> Result<Value, ClientError> {
        self.usage_latest("web", embed).await
    }

    /// Latest mail usage of the account's mailboxes.
    #[instrument(skip_all, err)]
    pub async fn mail_usage_latest(&self, embed: &[&str]) -> Result<Value, ClientError> {
        self.usage_latest("mail", embed).await
    }

    async fn usage_latest(&self, area: &str, embed: &[&str]) -> Result<Value, ClientError> {
        self.request(
            Method::GET,
            self.url(&["usage", area, "latest", ""], embed)?,
            empty,
            ok_response,
        )
        .await
    }

    /// Block until every key reports `ready`.
    pub async fn wait_ready(
        &self,
        kind: ResourceKind,
        keys: &[String],
        poll: &PollConfig,
    ) -> Result<(), EnsureError> {
        wait_for(kind.model_name(), TerminalState::Ready, keys, poll, |key| {
            self.is_ready(kind, key)
        })
        .await
    }

    /// Block until every key reads as not found.
    pub async fn wait_deleted(
        &self,
        kind: ResourceKind,
        keys: &[String],
        poll: &PollConfig,
    ) -> Result<(), EnsureError> {
        wait_for(kind.model_name(), TerminalState::Deleted, keys, poll, |key| {
            self.is_deleted(kind, key)
        })
        .await
    }

    async fn is_ready(&self, kind: ResourceKind, key: String) -> Result<bool, EnsureError> {
        let record = self
            .read(kind, &key, &[])
            .await?
            .ok_or(ClientError::Response(StatusCode::NOT_FOUND))?;
        match record.get("ready") {
            Some(Value::Bool(ready)) => Ok(*ready),
            other => Err(ClientError::Payload(format!(
                "{kind} {key}: expected boolean 'ready', got {other:?}"
            ))
            .into()),
        }
    }

    async fn is_deleted(&self, kind: ResourceKind, key: String) -> Result<bool, EnsureError> {
        Ok(self.read(kind, &key, &[]).await?.is_none())
    }
}

fn flatten_listing(listing: Value) -> Result<Vec<Record>, ClientError> {
    let items = match listing {
        Value::Array(items) => items,
        Value::Object(groups) => groups
            .into_iter()
            .map(|(name, group)| match group {
                Value::Array(items) => Ok(items),
                other => Err(ClientError::Payload(format!(
                    "expected a list of records in '{name}', got {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect(),
        other => {
            return Err(ClientError::Payload(format!(
                "expected a list of records, got {other}"
            )))
        }
    };

    items
        .into_iter()
        .map(|item| {
            record::from_value(item)
                .ok_or_else(|| ClientError::Payload("listed item is not an object".to_string()))
        })
        .collect()
}

#[inline]
fn empty(request: RequestBuilder) -> RequestBuilder {
    request
}

fn json<S: Serialize>(payload: S) -> impl FnOnce(RequestBuilder) -> RequestBuilder {
    move |r| r.json(&payload)
}

async fn ok_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    log::debug!("Eval response: {:#?}", response);
    match response.status() {
        StatusCode::OK => Ok(response.json().await?),
        _ => default_response(response).await,
    }
}

async fn read_response<T: DeserializeOwned>(response: Response) -> Result<Option<T>, ClientError> {
    log::debug!("Eval get response: {:#?}", response);
    match response.status() {
        StatusCode::OK => Ok(Some(response.json().await?)),
        StatusCode::NOT_FOUND => Ok(None),
        _ => default_response(response).await,
    }
}

async fn discard_response(response: Response) -> Result<(), ClientError> {
    log::debug!("Eval delete response: {:#?}", response);
    match response.status() {
        StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
        _ => default_response(response).await,
    }
}

async fn default_response<T>(response: Response) -> Result<T, ClientError> {
    let code = response.status();
    match response.json::<Value>().await {
        Ok(body) => Err(ClientError::Service { code, body }),
        Err(_) => Err(ClientError::Response(code)),
    }
}
