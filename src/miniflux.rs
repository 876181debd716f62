use crate::types::{Entry, EntryStatus, Feed, FilterError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// The feed-reader operations the filter job consumes. Split out as a trait
/// so the orchestrator can be driven by any backend (or a test double).
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// All entries currently marked unread.
    async fn unread_entries(&self) -> Result<Vec<Entry>>;

    /// All subscribed feeds.
    async fn feeds(&self) -> Result<Vec<Feed>>;

    /// Batched status transition to read for the given entry ids.
    async fn mark_entries_read(&self, ids: &[i64]) -> Result<()>;
}

#[derive(Debug, Clone)]
enum Auth {
    ApiKey(String),
    Basic { username: String, password: String },
}

/// Client for the Miniflux v1 REST API.
pub struct MinifluxClient {
    http: Client,
    endpoint: Url,
    auth: Auth,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct EntriesResponse {
    #[allow(dead_code)]
    total: i64,
    entries: Vec<Entry>,
}

#[derive(Debug, Serialize)]
struct UpdateEntriesRequest<'a> {
    entry_ids: &'a [i64],
    status: EntryStatus,
}

impl MinifluxClient {
    pub fn with_api_key(endpoint: &str, api_key: impl Into<String>) -> Result<Self> {
        Self::new(endpoint, Auth::ApiKey(api_key.into()))
    }

    pub fn with_password(
        endpoint: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            endpoint,
            Auth::Basic {
                username: username.into(),
                password: password.into(),
            },
        )
    }

    fn new(endpoint: &str, auth: Auth) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            endpoint,
            auth,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint.join(path)?;
        let builder = self.http.request(method, url);
        let builder = match &self.auth {
            Auth::ApiKey(key) => builder.header("X-Auth-Token", key),
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
        };
        Ok(builder)
    }

    /// The authenticated user, used as a login check at startup.
    pub async fn me(&self) -> Result<User> {
        let response = self.request(Method::GET, "/v1/me")?.send().await?;
        let response = check_status(response).await?;
        let user = response.json::<User>().await?;
        Ok(user)
    }
}

#[async_trait]
impl FeedSource for MinifluxClient {
    async fn unread_entries(&self) -> Result<Vec<Entry>> {
        let response = self
            .request(Method::GET, "/v1/entries")?
            .query(&[("status", "unread")])
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.json::<EntriesResponse>().await?;
        debug!("Listed {} unread entries", body.entries.len());
        Ok(body.entries)
    }

    async fn feeds(&self) -> Result<Vec<Feed>> {
        let response = self.request(Method::GET, "/v1/feeds")?.send().await?;
        let response = check_status(response).await?;
        let feeds = response.json::<Vec<Feed>>().await?;
        debug!("Listed {} feeds", feeds.len());
        Ok(feeds)
    }

    async fn mark_entries_read(&self, ids: &[i64]) -> Result<()> {
        let request = UpdateEntriesRequest {
            entry_ids: ids,
            status: EntryStatus::Read,
        };
        let response = self
            .request(Method::PUT, "/v1/entries")?
            .json(&request)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(FilterError::Api {
        status: status.as_u16(),
        body,
    })
}
