use super::{ApiError, FeedApi, ListQuery, NotificationPatch, ProjectApi, ProjectMeta};
use crate::config::Config;
use crate::feed::{FeedPage, NotificationEntity, NotificationId, NotificationPayload, PageMeta};
use crate::identity::CurrentUser;
use crate::util::{validate_api_base, UrlError};
use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use url::Url;

const MAX_RESPONSE_SIZE: usize = 2 * 1024 * 1024; // 2MB
const ACCEPT: &str = "application/vnd.api+json; version=1";

// ============================================================================
// Wire Format
// ============================================================================

/// Ids arrive as strings from most endpoints but as numbers from some.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(u64),
}

impl From<WireId> for NotificationId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => NotificationId(s),
            WireId::Number(n) => NotificationId(n.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NotificationRecord {
    id: WireId,
    #[serde(default)]
    delivered: bool,
    #[serde(flatten)]
    payload: NotificationPayload,
}

impl NotificationRecord {
    fn into_entity(self, source_page: u32) -> NotificationEntity {
        NotificationEntity {
            id: self.id.into(),
            delivered: self.delivered,
            source_page,
            payload: self.payload,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WireMeta {
    page: Option<u32>,
    page_size: Option<u32>,
    count: Option<u64>,
    page_count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct MetaEnvelope {
    notifications: Option<WireMeta>,
}

#[derive(Debug, Deserialize)]
struct NotificationsEnvelope {
    #[serde(default)]
    notifications: Vec<NotificationRecord>,
    #[serde(default)]
    meta: Option<MetaEnvelope>,
}

#[derive(Debug, Deserialize)]
struct ProjectRecord {
    display_name: String,
    #[serde(default)]
    avatar_src: Option<String>,
    #[serde(default)]
    slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectsEnvelope {
    #[serde(default)]
    projects: Vec<ProjectRecord>,
}

// ============================================================================
// Client
// ============================================================================

/// Feed and project API over HTTP.
///
/// `list` and `get_project` retry transient failures with exponential backoff
/// (1s, 2s, ...). `update` is sent exactly once.
#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    feed_url: Url,
    project_url: Url,
    user: CurrentUser,
    timeout: Duration,
    max_retries: u32,
}

impl HttpApi {
    pub fn new(
        client: reqwest::Client,
        feed_url: &str,
        project_url: &str,
    ) -> Result<Self, UrlError> {
        Ok(Self {
            client,
            feed_url: validate_api_base(feed_url)?,
            project_url: validate_api_base(project_url)?,
            user: CurrentUser::default(),
            timeout: Duration::from_secs(20),
            max_retries: 2,
        })
    }

    pub fn from_config(
        client: reqwest::Client,
        config: &Config,
        user: CurrentUser,
    ) -> Result<Self, UrlError> {
        Ok(Self::new(client, &config.feed_api_url, &config.project_api_url)?
            .with_user(user)
            .with_timeout(Duration::from_secs(config.request_timeout_secs))
            .with_max_retries(config.max_retries))
    }

    /// Read the bearer token from `user` on every request.
    pub fn with_user(mut self, user: CurrentUser) -> Self {
        self.user = user;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Network(format!("Base URL cannot hold a path: {base}")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request = request.header(reqwest::header::ACCEPT, ACCEPT);
        if let Some(identity) = self.user.get() {
            request = request.header(reqwest::header::AUTHORIZATION, identity.bearer());
        }
        request
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = tokio::time::timeout(self.timeout, self.authorize(request).send())
            .await
            .map_err(|_| ApiError::Timeout)??;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status.as_u16()));
        }

        let body = read_limited_body(response, MAX_RESPONSE_SIZE).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut retry_count = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retry_count < self.max_retries => {
                    let delay = 1u64 << retry_count; // 1s, 2s, 4s
                    tracing::debug!(
                        request = what,
                        error = %e,
                        retry = retry_count + 1,
                        delay_secs = delay,
                        "Retrying after transient error"
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    retry_count += 1;
                }
                Err(e) => {
                    tracing::warn!(request = what, error = %e, "Request failed");
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl FeedApi for HttpApi {
    async fn list(&self, query: ListQuery) -> Result<FeedPage, ApiError> {
        let mut url = Self::endpoint(&self.feed_url, &["notifications"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("page", &query.page.to_string())
                .append_pair("page_size", &query.page_size.to_string())
                .append_pair("section", query.section.as_str());
            if let Some(delivered) = query.delivered {
                pairs.append_pair("delivered", if delivered { "true" } else { "false" });
            }
        }

        let envelope: NotificationsEnvelope = self
            .with_retry("list notifications", || self.send(self.client.get(url.clone())))
            .await?;

        let wire = envelope
            .meta
            .and_then(|m| m.notifications)
            .unwrap_or_default();
        let mut meta = PageMeta::synthesized(
            wire.page.unwrap_or(query.page),
            wire.page_size.unwrap_or(query.page_size),
        );
        meta.count = wire.count.unwrap_or(0);
        meta.page_count = wire.page_count.unwrap_or(0);

        let entities: Vec<NotificationEntity> = envelope
            .notifications
            .into_iter()
            .map(|record| record.into_entity(meta.page))
            .collect();
        meta.notification_ids = entities.iter().map(|e| e.id.clone()).collect();

        tracing::debug!(
            section = %query.section,
            page = meta.page,
            items = entities.len(),
            count = meta.count,
            "Fetched notification page"
        );
        Ok(FeedPage { entities, meta })
    }

    async fn update(
        &self,
        id: &NotificationId,
        patch: NotificationPatch,
    ) -> Result<NotificationEntity, ApiError> {
        let url = Self::endpoint(&self.feed_url, &["notifications", id.as_str()])?;
        let body = serde_json::to_vec(&serde_json::json!({
            "notifications": { "delivered": patch.delivered }
        }))?;

        let request = self
            .client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        let envelope: NotificationsEnvelope = self.send(request).await?;

        envelope
            .notifications
            .into_iter()
            .next()
            .map(|record| record.into_entity(0))
            .ok_or_else(|| ApiError::NotFound(format!("notification {id}")))
    }
}

#[async_trait]
impl ProjectApi for HttpApi {
    async fn get_project(&self, project_id: &str) -> Result<ProjectMeta, ApiError> {
        let mut url = Self::endpoint(&self.project_url, &["projects", project_id])?;
        url.query_pairs_mut().append_pair("cards", "true");

        let envelope: ProjectsEnvelope = self
            .with_retry("get project", || self.send(self.client.get(url.clone())))
            .await?;

        envelope
            .projects
            .into_iter()
            .next()
            .map(|p| ProjectMeta {
                display_name: p.display_name,
                avatar_src: p.avatar_src,
                slug: p.slug,
            })
            .ok_or_else(|| ApiError::NotFound(format!("project {project_id}")))
    }
}

async fn read_limited_body(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
